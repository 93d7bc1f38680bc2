use crawlscope_client::NewJob;
use crawlscope_client::model::CRAWL_SCOPES;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use url::Url;

pub const MIN_DEPTH: u32 = 1;
pub const MAX_DEPTH: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Url,
    Depth,
    Scope,
    Robots,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            FormField::Url => FormField::Depth,
            FormField::Depth => FormField::Scope,
            FormField::Scope => FormField::Robots,
            FormField::Robots => FormField::Url,
        }
    }

    fn previous(self) -> Self {
        match self {
            FormField::Url => FormField::Robots,
            FormField::Depth => FormField::Url,
            FormField::Scope => FormField::Depth,
            FormField::Robots => FormField::Scope,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum FormOutcome {
    Editing,
    Cancelled,
    Submitted(NewJob),
}

/// "New crawl job" dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct JobForm {
    pub url: String,
    pub depth: u32,
    pub scope: usize,
    pub respect_robots: bool,
    pub field: FormField,
    pub error: Option<String>,
}

impl Default for JobForm {
    fn default() -> Self {
        Self {
            url: String::new(),
            depth: 2,
            scope: 0,
            respect_robots: true,
            field: FormField::Url,
            error: None,
        }
    }
}

impl JobForm {
    pub fn handle_key(&mut self, key: KeyEvent) -> FormOutcome {
        match key.code {
            KeyCode::Esc => return FormOutcome::Cancelled,
            KeyCode::Enter => {
                return match self.to_new_job() {
                    Ok(job) => FormOutcome::Submitted(job),
                    Err(e) => {
                        self.error = Some(e);
                        FormOutcome::Editing
                    }
                };
            }
            KeyCode::Tab | KeyCode::Down => self.field = self.field.next(),
            KeyCode::BackTab | KeyCode::Up => self.field = self.field.previous(),
            code => self.edit(code),
        }
        FormOutcome::Editing
    }

    fn edit(&mut self, code: KeyCode) {
        match (self.field, code) {
            (FormField::Url, KeyCode::Char(c)) => {
                self.url.push(c);
                self.error = None;
            }
            (FormField::Url, KeyCode::Backspace) => {
                self.url.pop();
            }
            (FormField::Depth, KeyCode::Left | KeyCode::Char('-')) => {
                self.depth = self.depth.saturating_sub(1).max(MIN_DEPTH);
            }
            (FormField::Depth, KeyCode::Right | KeyCode::Char('+')) => {
                self.depth = (self.depth + 1).min(MAX_DEPTH);
            }
            (FormField::Depth, KeyCode::Char(c)) if c.is_ascii_digit() => {
                let digit = c.to_digit(10).unwrap_or(0);
                self.depth = digit.clamp(MIN_DEPTH, MAX_DEPTH);
            }
            (FormField::Scope, KeyCode::Left) => {
                self.scope = (self.scope + CRAWL_SCOPES.len() - 1) % CRAWL_SCOPES.len();
            }
            (FormField::Scope, KeyCode::Right | KeyCode::Char(' ')) => {
                self.scope = (self.scope + 1) % CRAWL_SCOPES.len();
            }
            (FormField::Robots, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')) => {
                self.respect_robots = !self.respect_robots;
            }
            _ => {}
        }
    }

    pub fn scope(&self) -> &'static str {
        CRAWL_SCOPES[self.scope % CRAWL_SCOPES.len()]
    }

    /// Validate the inputs into a request body.
    pub fn to_new_job(&self) -> Result<NewJob, String> {
        let raw = self.url.trim();
        if raw.is_empty() {
            return Err("Start URL is required".to_string());
        }
        let url = Url::parse(raw).map_err(|e| format!("Invalid URL: {}", e))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(format!("Unsupported scheme: {}", url.scheme()));
        }
        Ok(NewJob {
            start_url: raw.to_string(),
            max_depth: self.depth,
            crawl_scope: self.scope().to_string(),
            respect_robots_txt: self.respect_robots,
        })
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" New Crawl Job ")
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);
        f.render_widget(Clear, area);
        f.render_widget(block, area);

        let row = |field: FormField, label: &'static str, value: String| {
            let focused = self.field == field;
            let label_style = if focused {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let marker = if focused { "> " } else { "  " };
            Line::from(vec![
                Span::styled(format!("{}{:<16}", marker, label), label_style),
                Span::styled(value, Style::default().fg(Color::White)),
            ])
        };

        let cursor = if self.field == FormField::Url { "_" } else { "" };
        let mut lines = vec![
            row(FormField::Url, "Start URL", format!("{}{}", self.url, cursor)),
            row(FormField::Depth, "Max depth", format!("< {} >", self.depth)),
            row(FormField::Scope, "Crawl scope", format!("< {} >", self.scope())),
            row(
                FormField::Robots,
                "Respect robots",
                if self.respect_robots { "[x]" } else { "[ ]" }.to_string(),
            ),
            Line::from(""),
        ];
        if let Some(error) = &self.error {
            lines.push(Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red))));
        }
        lines.push(Line::from(Span::styled(
            "Tab next field  Enter create  Esc cancel",
            Style::default().fg(Color::DarkGray),
        )));

        f.render_widget(Paragraph::new(lines), inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(form: &mut JobForm, code: KeyCode) -> FormOutcome {
        form.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(form: &mut JobForm, text: &str) {
        for c in text.chars() {
            press(form, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_submit_builds_request_body() {
        let mut form = JobForm::default();
        type_str(&mut form, "https://example.com");
        let outcome = press(&mut form, KeyCode::Enter);
        assert_eq!(
            outcome,
            FormOutcome::Submitted(NewJob {
                start_url: "https://example.com".to_string(),
                max_depth: 2,
                crawl_scope: "DOMAIN".to_string(),
                respect_robots_txt: true,
            })
        );
    }

    #[test]
    fn test_empty_or_bad_url_is_rejected() {
        let mut form = JobForm::default();
        assert_eq!(press(&mut form, KeyCode::Enter), FormOutcome::Editing);
        assert_eq!(form.error.as_deref(), Some("Start URL is required"));

        type_str(&mut form, "ftp://example.com");
        press(&mut form, KeyCode::Enter);
        assert!(form.error.as_deref().unwrap().contains("ftp"));
    }

    #[test]
    fn test_depth_is_clamped() {
        let mut form = JobForm::default();
        press(&mut form, KeyCode::Tab);
        for _ in 0..20 {
            press(&mut form, KeyCode::Right);
        }
        assert_eq!(form.depth, MAX_DEPTH);
        for _ in 0..20 {
            press(&mut form, KeyCode::Left);
        }
        assert_eq!(form.depth, MIN_DEPTH);
    }

    #[test]
    fn test_scope_cycles_and_robots_toggle() {
        let mut form = JobForm::default();
        press(&mut form, KeyCode::Tab);
        press(&mut form, KeyCode::Tab);
        press(&mut form, KeyCode::Left);
        assert_eq!(form.scope(), "ALL");
        press(&mut form, KeyCode::Tab);
        press(&mut form, KeyCode::Char(' '));
        assert!(!form.respect_robots);
        assert_eq!(press(&mut form, KeyCode::Esc), FormOutcome::Cancelled);
    }
}
