use crate::form::{FormOutcome, JobForm};
use crate::graph_view::{self, CellMapping};
use crawlscope_client::{ApiClient, Job, JobId, JobStatus, NewJob, Page};
use crawlscope_core::export::save_artifact;
use crawlscope_core::session::{FilterTicket, JobDetail, LoadTicket, fetch_detail, fetch_filtered};
use crawlscope_core::view::{self, DetailView, JobAction, JobCard, JobList, PageItem, PageList};
use crawlscope_core::{CategoryTable, Config, ExportFormat, LayoutConfig, Notice, NoticeLevel, Session};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const NOTICE_TTL: Duration = Duration::from_secs(3);
const START_RELOAD_DELAY: Duration = Duration::from_secs(1);
const ZOOM_STEP: f64 = 1.2;
const PAN_CELLS: i32 = 4;

/// Settings the dashboard takes from the loaded configuration.
#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub refresh: Option<Duration>,
    pub download_dir: PathBuf,
    pub table: CategoryTable,
    pub layout: LayoutConfig,
}

impl DashboardOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            refresh: config.refresh_interval(),
            download_dir: config.download_dir(),
            table: config.category_table(),
            layout: config.layout_config(),
        }
    }
}

/// Results of backend tasks, delivered to the event loop.
#[derive(Debug)]
pub enum DashboardMessage {
    JobsLoaded(Result<Vec<Job>, String>),
    JobCreated(Result<Job, String>),
    JobStarted { job_id: JobId, result: Result<(), String> },
    JobRefreshed { job_id: JobId, result: Result<Job, String> },
    ClassifyRequested { job_id: JobId, result: Result<(), String> },
    DetailLoaded {
        ticket: LoadTicket,
        result: crawlscope_core::error::Result<JobDetail>,
    },
    FilterLoaded {
        ticket: FilterTicket,
        result: crawlscope_core::error::Result<Vec<Page>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PointerDrag {
    Pressed { origin: (u16, u16), node: Option<usize> },
    Node,
    Pan { last: (u16, u16) },
}

pub struct Dashboard {
    client: ApiClient,
    runtime: Handle,
    tx: mpsc::UnboundedSender<DashboardMessage>,
    rx: mpsc::UnboundedReceiver<DashboardMessage>,
    options: DashboardOptions,

    jobs: Vec<Job>,
    selected_job: usize,
    jobs_loaded: bool,
    loading_jobs: bool,
    last_refresh: Instant,

    session: Session,
    chip_cursor: Option<usize>,
    page_scroll: usize,
    graph_mapping: CellMapping,
    hover: Option<usize>,
    pointer: Option<(u16, u16)>,
    drag: Option<PointerDrag>,

    form: Option<JobForm>,
    notices: VecDeque<(Notice, Instant)>,
    pub should_quit: bool,
}

impl Dashboard {
    pub fn new(client: ApiClient, runtime: Handle, options: DashboardOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::new(options.table.clone(), options.layout);
        Self {
            client,
            runtime,
            tx,
            rx,
            options,
            jobs: Vec::new(),
            selected_job: 0,
            jobs_loaded: false,
            loading_jobs: false,
            last_refresh: Instant::now(),
            session,
            chip_cursor: None,
            page_scroll: 0,
            graph_mapping: CellMapping::default(),
            hover: None,
            pointer: None,
            drag: None,
            form: None,
            notices: VecDeque::new(),
            should_quit: false,
        }
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn selected_job(&self) -> Option<&Job> {
        self.jobs.get(self.selected_job)
    }

    /// Notices that have not expired yet, oldest first.
    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter().map(|(notice, _)| notice)
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = DashboardMessage> + Send + 'static,
    {
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            // The receiver is gone once the dashboard exits.
            let _ = tx.send(task.await);
        });
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let notice = Notice::new(level, message);
        match level {
            NoticeLevel::Error => warn!("{}", notice),
            _ => debug!("{}", notice),
        }
        self.notices.push_back((notice, Instant::now()));
    }

    // ------------------------------------------------------------------
    // Backend requests
    // ------------------------------------------------------------------

    pub fn reload_jobs(&mut self, delay: Duration) {
        self.loading_jobs = true;
        self.last_refresh = Instant::now();
        let client = self.client.clone();
        self.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            DashboardMessage::JobsLoaded(client.list_jobs(None).await.map_err(|e| e.to_string()))
        });
    }

    fn create_job(&mut self, job: NewJob) {
        info!("Creating crawl job for {}", job.start_url);
        let client = self.client.clone();
        self.spawn(async move { DashboardMessage::JobCreated(client.create_job(&job).await.map_err(|e| e.to_string())) });
    }

    fn start_job(&mut self, job_id: JobId) {
        let client = self.client.clone();
        self.spawn(async move {
            let result = client.start_job(job_id).await.map_err(|e| e.to_string());
            DashboardMessage::JobStarted { job_id, result }
        });
    }

    fn refresh_job(&mut self, job_id: JobId) {
        let client = self.client.clone();
        self.spawn(async move {
            let result = client.get_job(job_id).await.map_err(|e| e.to_string());
            DashboardMessage::JobRefreshed { job_id, result }
        });
    }

    fn classify_job(&mut self, job_id: JobId) {
        let client = self.client.clone();
        self.spawn(async move {
            let result = client.classify_job(job_id).await.map_err(|e| e.to_string());
            DashboardMessage::ClassifyRequested { job_id, result }
        });
    }

    pub fn open_job(&mut self, job_id: JobId) {
        self.reset_detail_state();
        let ticket = self.session.begin_load(job_id);
        let client = self.client.clone();
        self.spawn(async move {
            let result = fetch_detail(&client, job_id).await;
            DashboardMessage::DetailLoaded { ticket, result }
        });
    }

    fn select_category(&mut self, category: String) {
        let Some(ticket) = self.session.begin_filter(&category) else {
            return;
        };
        self.page_scroll = 0;
        let client = self.client.clone();
        let job_id = ticket.job_id;
        self.spawn(async move {
            let result = fetch_filtered(&client, job_id, &category).await;
            DashboardMessage::FilterLoaded { ticket, result }
        });
    }

    fn reset_detail_state(&mut self) {
        self.chip_cursor = None;
        self.page_scroll = 0;
        self.hover = None;
        self.drag = None;
        self.graph_mapping = CellMapping::default();
    }

    // ------------------------------------------------------------------
    // Event loop hooks
    // ------------------------------------------------------------------

    /// Apply every pending backend result without blocking.
    pub fn process_messages(&mut self) {
        while let Ok(message) = self.rx.try_recv() {
            self.apply(message);
        }
        for notice in self.session.take_notices() {
            self.notify(notice.level, notice.message);
        }
    }

    pub fn apply(&mut self, message: DashboardMessage) {
        match message {
            DashboardMessage::JobsLoaded(result) => {
                self.loading_jobs = false;
                match result {
                    Ok(jobs) => self.replace_jobs(jobs),
                    Err(e) => self.notify(NoticeLevel::Error, format!("Failed to load jobs: {}", e)),
                }
            }
            DashboardMessage::JobCreated(Ok(job)) => {
                self.notify(NoticeLevel::Success, format!("Crawl job #{} created", job.id));
                self.reload_jobs(Duration::ZERO);
            }
            DashboardMessage::JobCreated(Err(e)) => {
                self.notify(NoticeLevel::Error, format!("Failed to create job: {}", e));
            }
            DashboardMessage::JobStarted { job_id, result: Ok(()) } => {
                self.notify(NoticeLevel::Success, format!("Crawl job #{} started", job_id));
                self.reload_jobs(START_RELOAD_DELAY);
            }
            DashboardMessage::JobStarted { job_id, result: Err(e) } => {
                self.notify(NoticeLevel::Error, format!("Failed to start job #{}: {}", job_id, e));
            }
            DashboardMessage::JobRefreshed { job_id, result } => match result {
                Ok(job) => {
                    if let Some(slot) = self.jobs.iter_mut().find(|j| j.id == job.id) {
                        *slot = job;
                    }
                    self.notify(NoticeLevel::Info, format!("Job #{} refreshed", job_id));
                }
                Err(e) => self.notify(NoticeLevel::Error, format!("Failed to refresh job #{}: {}", job_id, e)),
            },
            DashboardMessage::ClassifyRequested { job_id, result } => match result {
                Ok(()) => self.notify(NoticeLevel::Success, format!("Classification started for job #{}", job_id)),
                Err(e) => self.notify(NoticeLevel::Error, format!("Failed to classify job #{}: {}", job_id, e)),
            },
            DashboardMessage::DetailLoaded { ticket, result } => {
                if self.session.apply_detail(ticket, result) {
                    self.reset_detail_state();
                }
            }
            DashboardMessage::FilterLoaded { ticket, result } => {
                self.session.apply_filter(ticket, result);
            }
        }
    }

    fn replace_jobs(&mut self, jobs: Vec<Job>) {
        let selected_id = self.selected_job().map(|j| j.id);
        self.jobs = jobs;
        self.jobs_loaded = true;
        self.selected_job = selected_id
            .and_then(|id| self.jobs.iter().position(|j| j.id == id))
            .unwrap_or(0);
    }

    /// Advance animation, expire notices and fire the refresh timer.
    pub fn on_tick(&mut self) {
        if let Some(graph) = self.session.rendered_mut() {
            graph.tick();
        }
        while let Some((_, shown)) = self.notices.front() {
            if shown.elapsed() < NOTICE_TTL {
                break;
            }
            self.notices.pop_front();
        }
        if let Some(interval) = self.options.refresh
            && !self.loading_jobs
            && self.last_refresh.elapsed() >= interval
        {
            debug!("Auto-refreshing job list");
            self.reload_jobs(Duration::ZERO);
        }
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        if let Some(form) = self.form.as_mut() {
            match form.handle_key(key) {
                FormOutcome::Editing => {}
                FormOutcome::Cancelled => self.form = None,
                FormOutcome::Submitted(job) => {
                    self.form = None;
                    self.create_job(job);
                }
            }
            return;
        }
        if self.session.is_open() {
            self.handle_detail_key(key);
        } else {
            self.handle_jobs_key(key);
        }
    }

    fn handle_jobs_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.selected_job = self.selected_job.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if !self.jobs.is_empty() {
                    self.selected_job = (self.selected_job + 1).min(self.jobs.len() - 1);
                }
            }
            KeyCode::Home => self.selected_job = 0,
            KeyCode::End => self.selected_job = self.jobs.len().saturating_sub(1),
            KeyCode::Char('n') => self.form = Some(JobForm::default()),
            KeyCode::Char('R') | KeyCode::F(5) => self.reload_jobs(Duration::ZERO),
            KeyCode::Char('s') => self.run_action(JobAction::Start),
            KeyCode::Char('r') => self.run_action(JobAction::Refresh),
            KeyCode::Enter | KeyCode::Char('v') => self.run_action(JobAction::ViewResults),
            KeyCode::Char('c') => {
                if let Some(job) = self.selected_job() {
                    if job.status == JobStatus::Completed {
                        let id = job.id;
                        self.classify_job(id);
                    } else {
                        self.notify(NoticeLevel::Warning, "Only completed jobs can be classified");
                    }
                }
            }
            _ => {}
        }
    }

    /// Run one of the actions the selected job's card offers.
    fn run_action(&mut self, action: JobAction) {
        let Some(job) = self.selected_job() else {
            return;
        };
        let card = view::job_card(job);
        if !card.actions.contains(&action) {
            self.notify(
                NoticeLevel::Warning,
                format!("{} is not available for a {} job", action.label(), card.status),
            );
            return;
        }
        match action {
            JobAction::Start => self.start_job(card.id),
            JobAction::Refresh => self.refresh_job(card.id),
            JobAction::ViewResults => self.open_job(card.id),
        }
    }

    fn handle_detail_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.session.close();
                self.reset_detail_state();
            }
            KeyCode::Tab | KeyCode::Char('v') => {
                let mode = self.session.view_mode().toggled();
                self.session.set_view_mode(mode);
                self.hover = None;
                self.drag = None;
            }
            KeyCode::Char('f') => self.cycle_category(1),
            KeyCode::Char('F') => self.cycle_category(-1),
            KeyCode::Char('x') => {
                self.chip_cursor = None;
                self.page_scroll = 0;
                self.session.clear_filter();
            }
            KeyCode::Char('s') => self.export(ExportFormat::Svg),
            KeyCode::Char('p') => self.export(ExportFormat::Png),
            KeyCode::Char('j') => self.export(ExportFormat::Jpeg),
            KeyCode::PageDown => {
                let total = self.session.displayed_pages().len();
                self.page_scroll = (self.page_scroll + 5).min(total.saturating_sub(1));
            }
            KeyCode::PageUp => self.page_scroll = self.page_scroll.saturating_sub(5),
            KeyCode::Char('+') | KeyCode::Char('=') => self.zoom_center(ZOOM_STEP),
            KeyCode::Char('-') => self.zoom_center(1.0 / ZOOM_STEP),
            KeyCode::Char('0') => {
                if let Some(graph) = self.session.rendered_mut() {
                    graph.reset_view();
                }
            }
            KeyCode::Left => self.pan_cells(PAN_CELLS, 0),
            KeyCode::Right => self.pan_cells(-PAN_CELLS, 0),
            KeyCode::Up => self.pan_cells(0, PAN_CELLS),
            KeyCode::Down => self.pan_cells(0, -PAN_CELLS),
            _ => {}
        }
    }

    fn cycle_category(&mut self, step: isize) {
        let Some(chips) = self.session.detail_view().and_then(|v| v.categories) else {
            self.notify(NoticeLevel::Info, "Classification stats are not available");
            return;
        };
        if chips.is_empty() {
            return;
        }
        let len = chips.len() as isize;
        let next = match self.chip_cursor {
            Some(i) => (i as isize + step).rem_euclid(len) as usize,
            None if step < 0 => chips.len() - 1,
            None => 0,
        };
        self.chip_cursor = Some(next);
        self.select_category(chips[next].category.clone());
    }

    fn export(&mut self, format: ExportFormat) {
        match self.session.export_current(format) {
            Ok(Some(artifact)) => match save_artifact(&artifact, &self.options.download_dir) {
                Ok(path) => self.notify(NoticeLevel::Success, format!("Saved {}", path.display())),
                Err(e) => self.notify(NoticeLevel::Error, format!("Export failed: {}", e)),
            },
            // The session queued its own notice.
            Ok(None) => {}
            Err(e) => self.notify(NoticeLevel::Error, format!("Export failed: {}", e)),
        }
    }

    fn zoom_center(&mut self, factor: f64) {
        if let Some(graph) = self.session.rendered_mut() {
            let (cx, cy) = (graph.width() / 2.0, graph.height() / 2.0);
            graph.viewport_mut().zoom_at(factor, cx, cy);
        }
    }

    fn pan_cells(&mut self, dcol: i32, drow: i32) {
        let (dx, dy) = self.graph_mapping.cell_delta(dcol, drow);
        if let Some(graph) = self.session.rendered_mut() {
            graph.viewport_mut().pan(dx, dy);
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.form.is_some() || !self.session.is_open() {
            return;
        }
        let cell = (mouse.column, mouse.row);
        let mapping = self.graph_mapping;
        let scene_point = mapping.to_scene(cell.0, cell.1);
        let slack = mapping.cell_width();
        let Some(graph) = self.session.rendered_mut() else {
            return;
        };

        let mut open_url = None;
        match mouse.kind {
            MouseEventKind::Moved => {
                self.pointer = Some(cell);
                self.hover = scene_point.and_then(|(sx, sy)| graph.node_at(sx, sy, slack));
            }
            MouseEventKind::ScrollUp | MouseEventKind::ScrollDown => {
                if let Some((sx, sy)) = scene_point {
                    let factor = if mouse.kind == MouseEventKind::ScrollUp {
                        ZOOM_STEP
                    } else {
                        1.0 / ZOOM_STEP
                    };
                    graph.viewport_mut().zoom_at(factor, sx, sy);
                }
            }
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some((sx, sy)) = scene_point {
                    self.drag = Some(PointerDrag::Pressed {
                        origin: cell,
                        node: graph.node_at(sx, sy, slack),
                    });
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                self.drag = match self.drag.take() {
                    Some(PointerDrag::Pressed { node: Some(index), origin }) => {
                        if graph.drag_start(index) {
                            if let Some((sx, sy)) = scene_point {
                                graph.drag_move(sx, sy);
                            }
                            Some(PointerDrag::Node)
                        } else {
                            pan_by(graph, &mapping, origin, cell);
                            Some(PointerDrag::Pan { last: cell })
                        }
                    }
                    Some(PointerDrag::Pressed { node: None, origin }) | Some(PointerDrag::Pan { last: origin }) => {
                        pan_by(graph, &mapping, origin, cell);
                        Some(PointerDrag::Pan { last: cell })
                    }
                    Some(PointerDrag::Node) => {
                        if let Some((sx, sy)) = scene_point {
                            graph.drag_move(sx, sy);
                        }
                        Some(PointerDrag::Node)
                    }
                    None => None,
                };
                self.hover = None;
            }
            MouseEventKind::Up(MouseButton::Left) => match self.drag.take() {
                Some(PointerDrag::Pressed { origin, node: Some(_) }) => {
                    if let Some((sx, sy)) = mapping.to_scene(origin.0, origin.1) {
                        open_url = graph.click(sx, sy, slack);
                    }
                }
                Some(PointerDrag::Node) => graph.drag_end(),
                _ => {}
            },
            _ => {}
        }

        if let Some(url) = open_url {
            self.open_url(&url);
        }
    }

    fn open_url(&mut self, url: &str) {
        info!("Opening {}", url);
        if let Err(e) = open::that(url) {
            self.notify(NoticeLevel::Error, format!("Could not open {}: {}", url, e));
        }
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    pub fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Header
                Constraint::Min(8),    // Body
                Constraint::Length(1), // Notice
                Constraint::Length(1), // Hints
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        if self.session.is_open() {
            self.render_detail(f, chunks[1]);
        } else {
            self.render_jobs(f, chunks[1]);
        }
        self.render_notice(f, chunks[2]);
        self.render_hints(f, chunks[3]);

        if let Some(form) = &self.form {
            let area = centered(f.area(), 64, 10);
            form.render(f, area);
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::styled(" crawlscope ", Style::default().fg(Color::Black).bg(Color::Cyan)),
            Span::raw(" "),
            Span::styled(self.client.base_url().to_string(), Style::default().fg(Color::DarkGray)),
        ];
        if self.loading_jobs {
            spans.push(Span::styled("  refreshing...", Style::default().fg(Color::Yellow)));
        }
        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_jobs(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(area);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" Crawl Jobs ({}) ", self.jobs.len()))
            .border_style(Style::default().fg(Color::Cyan));

        let cards = match view::job_list(&self.jobs) {
            JobList::Empty(message) => {
                let text = if self.jobs_loaded { message } else { "Loading jobs..." };
                let paragraph = Paragraph::new(text)
                    .style(Style::default().fg(Color::DarkGray))
                    .block(block);
                f.render_widget(paragraph, chunks[0]);
                return;
            }
            JobList::Jobs(cards) => cards,
        };

        let items: Vec<ListItem> = cards
            .iter()
            .map(|card| {
                ListItem::new(Line::from(vec![
                    Span::styled(format!("#{:<5}", card.id), Style::default().fg(Color::DarkGray)),
                    Span::styled(format!("{:<10}", card.status.as_str()), status_style(card.status)),
                    Span::raw(card.url.clone()),
                ]))
            })
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(self.selected_job));
        f.render_stateful_widget(list, chunks[0], &mut state);

        if let Some(card) = cards.get(self.selected_job) {
            render_job_card(f, chunks[1], card);
        }
    }

    fn render_detail(&mut self, f: &mut Frame, area: Rect) {
        let Some(detail) = self.session.detail_view() else {
            let job_id = self.session.current_job_id().unwrap_or_default();
            let block = Block::default()
                .borders(Borders::ALL)
                .title(format!(" Job #{} ", job_id))
                .border_style(Style::default().fg(Color::Yellow));
            f.render_widget(Paragraph::new("Loading results...").block(block), area);
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Summary
                Constraint::Min(6),    // Graph + pages
            ])
            .split(area);
        self.render_summary(f, chunks[0], &detail);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(chunks[1]);

        match self.session.rendered() {
            Some(graph) => {
                let title = format!(" {} view ({} nodes) ", self.session.view_mode().as_str(), graph.node_count());
                self.graph_mapping = graph_view::render_graph(f, body[0], graph, self.hover, title);
                if let (Some(index), Some(pointer)) = (self.hover, self.pointer)
                    && let Some(tooltip) = graph.tooltip(index)
                {
                    graph_view::render_tooltip(f, body[0], pointer, &tooltip);
                }
            }
            None => {
                self.graph_mapping = CellMapping::default();
                let block = Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {} view ", self.session.view_mode().as_str()))
                    .border_style(Style::default().fg(Color::DarkGray));
                f.render_widget(
                    Paragraph::new("No graph to display").style(Style::default().fg(Color::DarkGray)).block(block),
                    body[0],
                );
            }
        }

        self.render_pages(f, body[1], &detail.pages);
    }

    fn render_summary(&self, f: &mut Frame, area: Rect, detail: &DetailView) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", detail.title))
            .border_style(Style::default().fg(status_color(detail.status)));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let mut stats = vec![Span::styled(detail.start_url.clone(), Style::default().fg(Color::DarkGray)), Span::raw("  ")];
        for card in &detail.stats {
            stats.push(Span::styled(format!("{} ", card.label), Style::default().fg(Color::DarkGray)));
            stats.push(Span::styled(format!("{}  ", card.value), Style::default().fg(Color::White).add_modifier(Modifier::BOLD)));
        }

        let chips = match &detail.categories {
            None => Line::from(Span::styled("Category stats not available", Style::default().fg(Color::DarkGray))),
            Some(chips) => {
                let any_active = chips.iter().any(|c| c.active);
                let mut spans = vec![chip_span("All".to_string(), Color::Gray, !any_active), Span::raw(" ")];
                for chip in chips {
                    let text = format!("{} ({})", chip.label, chip.count);
                    spans.push(chip_span(text, graph_view::hex_color(&chip.color), chip.active));
                    spans.push(Span::raw(" "));
                }
                Line::from(spans)
            }
        };

        f.render_widget(Paragraph::new(vec![Line::from(stats), chips]), inner);
    }

    fn render_pages(&self, f: &mut Frame, area: Rect, pages: &PageList) {
        let title = match self.session.active_category() {
            Some(category) => format!(" Pages: {} ", category),
            None => " Pages ".to_string(),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(Color::Cyan));

        let items = match pages {
            PageList::NoResultsYet => {
                f.render_widget(Paragraph::new(view::NO_RESULTS_MESSAGE).block(block), area);
                return;
            }
            PageList::Empty => {
                f.render_widget(Paragraph::new("No pages found").block(block), area);
                return;
            }
            PageList::Pages(items) => items,
        };

        let lines: Vec<Line> = items.iter().skip(self.page_scroll).flat_map(page_lines).collect();
        let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    fn render_notice(&self, f: &mut Frame, area: Rect) {
        let Some((notice, _)) = self.notices.back() else {
            return;
        };
        let color = match notice.level {
            NoticeLevel::Info => Color::Cyan,
            NoticeLevel::Success => Color::Green,
            NoticeLevel::Warning => Color::Yellow,
            NoticeLevel::Error => Color::Red,
        };
        f.render_widget(
            Paragraph::new(Span::styled(format!(" {}", notice.message), Style::default().fg(color))),
            area,
        );
    }

    fn render_hints(&self, f: &mut Frame, area: Rect) {
        let keys: &[(&str, &str)] = if self.form.is_some() {
            &[(" Tab ", "Next field"), (" Enter ", "Create"), (" Esc ", "Cancel")]
        } else if self.session.is_open() {
            &[
                (" Esc ", "Close"),
                (" Tab ", "Network/Tree"),
                (" f/F ", "Category"),
                (" x ", "All"),
                (" s/p/j ", "SVG/PNG/JPEG"),
                (" +/-/0 ", "Zoom"),
                (" PgUp/PgDn ", "Pages"),
            ]
        } else {
            &[
                (" q ", "Quit"),
                (" ↑/↓ ", "Select"),
                (" n ", "New"),
                (" s ", "Start"),
                (" Enter ", "Results"),
                (" r ", "Refresh"),
                (" R ", "Reload"),
                (" c ", "Classify"),
            ]
        };
        let mut spans = Vec::with_capacity(keys.len() * 2);
        for (key, label) in keys {
            spans.push(Span::styled(*key, Style::default().fg(Color::Black).bg(Color::Gray)));
            spans.push(Span::raw(format!(" {}  ", label)));
        }
        let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black).fg(Color::Gray));
        f.render_widget(paragraph, area);
    }
}

fn pan_by(graph: &mut crawlscope_core::RenderedGraph, mapping: &CellMapping, from: (u16, u16), to: (u16, u16)) {
    let (dx, dy) = mapping.cell_delta(to.0 as i32 - from.0 as i32, to.1 as i32 - from.1 as i32);
    graph.viewport_mut().pan(dx, dy);
}

fn status_color(status: JobStatus) -> Color {
    match status {
        JobStatus::Pending => Color::Yellow,
        JobStatus::Running => Color::Cyan,
        JobStatus::Completed => Color::Green,
        JobStatus::Failed => Color::Red,
    }
}

fn status_style(status: JobStatus) -> Style {
    Style::default().fg(status_color(status)).add_modifier(Modifier::BOLD)
}

fn chip_span(text: String, color: Color, active: bool) -> Span<'static> {
    if active {
        Span::styled(format!(" {} ", text), Style::default().fg(Color::Black).bg(color))
    } else {
        Span::styled(format!(" {} ", text), Style::default().fg(color))
    }
}

fn render_job_card(f: &mut Frame, area: Rect, card: &JobCard) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", card.title))
        .border_style(Style::default().fg(status_color(card.status)));

    let mut lines = vec![
        Line::from(Span::styled(card.url.clone(), Style::default().fg(Color::White))),
        Line::from(Span::styled(card.status.as_str(), status_style(card.status))),
        Line::from(""),
    ];
    for item in &card.meta {
        lines.push(Line::from(vec![
            Span::styled(format!("{:<16}", item.label), Style::default().fg(Color::DarkGray)),
            Span::raw(item.value.clone()),
        ]));
    }
    if let Some(error) = &card.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red))));
    }
    lines.push(Line::from(""));
    let actions: Vec<Span> = card
        .actions
        .iter()
        .flat_map(|action| {
            [
                Span::styled(format!(" {} ", action.label()), Style::default().fg(Color::Black).bg(Color::Cyan)),
                Span::raw(" "),
            ]
        })
        .collect();
    lines.push(Line::from(actions));

    f.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}

fn page_lines(item: &PageItem) -> Vec<Line<'static>> {
    let (mark, color) = if item.successful { ("✓", Color::Green) } else { ("✗", Color::Red) };
    let meta = item
        .meta
        .iter()
        .map(|m| format!("{} {}", m.label, m.value))
        .collect::<Vec<_>>()
        .join(" · ");
    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!("{} ", mark), Style::default().fg(color)),
            Span::styled(item.title.clone(), Style::default().fg(Color::White)),
        ]),
        Line::from(Span::styled(format!("  {}", item.url), Style::default().fg(Color::DarkGray))),
        Line::from(Span::styled(format!("  {}", meta), Style::default().fg(Color::Gray))),
    ];
    if let Some(error) = &item.error {
        lines.push(Line::from(Span::styled(format!("  {}", error), Style::default().fg(Color::Red))));
    }
    lines
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{Terminal, backend::TestBackend};

    fn job(id: JobId, status: JobStatus) -> Job {
        Job {
            id,
            start_url: format!("https://site{}.example", id),
            max_depth: 2,
            crawl_scope: "DOMAIN".to_string(),
            respect_robots_txt: true,
            status,
            total_pages_found: Some(0),
            total_pages_crawled: Some(0),
            error_message: None,
            created_at: None,
        }
    }

    fn dashboard() -> Dashboard {
        let client = ApiClient::new("http://127.0.0.1:9/api").unwrap();
        let options = DashboardOptions::from_config(&Config::default());
        Dashboard::new(client, Handle::current(), options)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn screen(dashboard: &mut Dashboard) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| dashboard.render(f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test]
    async fn test_empty_list_shows_prompt() {
        let mut dashboard = dashboard();
        dashboard.apply(DashboardMessage::JobsLoaded(Ok(Vec::new())));
        assert!(screen(&mut dashboard).contains("No crawl jobs yet"));
    }

    #[tokio::test]
    async fn test_job_list_renders_cards() {
        let mut dashboard = dashboard();
        dashboard.apply(DashboardMessage::JobsLoaded(Ok(vec![
            job(1, JobStatus::Completed),
            job(2, JobStatus::Pending),
        ])));
        let text = screen(&mut dashboard);
        assert!(text.contains("site1.example"));
        assert!(text.contains("PENDING"));
        assert!(text.contains("Job #1"));
    }

    #[tokio::test]
    async fn test_selection_survives_reload() {
        let mut dashboard = dashboard();
        dashboard.apply(DashboardMessage::JobsLoaded(Ok(vec![job(1, JobStatus::Pending), job(2, JobStatus::Pending)])));
        dashboard.handle_key(key(KeyCode::Down));
        assert_eq!(dashboard.selected_job().map(|j| j.id), Some(2));

        dashboard.apply(DashboardMessage::JobsLoaded(Ok(vec![
            job(3, JobStatus::Pending),
            job(1, JobStatus::Running),
            job(2, JobStatus::Running),
        ])));
        assert_eq!(dashboard.selected_job().map(|j| j.id), Some(2));
    }

    #[tokio::test]
    async fn test_unavailable_action_warns() {
        let mut dashboard = dashboard();
        dashboard.apply(DashboardMessage::JobsLoaded(Ok(vec![job(1, JobStatus::Running)])));
        dashboard.handle_key(key(KeyCode::Char('s')));
        let notice = dashboard.notices().last().unwrap();
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert!(notice.message.contains("Start"));
    }

    #[tokio::test]
    async fn test_failed_load_becomes_error_notice() {
        let mut dashboard = dashboard();
        dashboard.apply(DashboardMessage::JobsLoaded(Err("connection refused".to_string())));
        let notice = dashboard.notices().last().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(screen(&mut dashboard).contains("connection refused"));
    }

    #[tokio::test]
    async fn test_form_opens_and_cancels() {
        let mut dashboard = dashboard();
        dashboard.handle_key(key(KeyCode::Char('n')));
        assert!(screen(&mut dashboard).contains("New Crawl Job"));
        dashboard.handle_key(key(KeyCode::Esc));
        assert!(!dashboard.should_quit);
        assert!(!screen(&mut dashboard).contains("New Crawl Job"));
        dashboard.handle_key(key(KeyCode::Esc));
        assert!(dashboard.should_quit);
    }

    #[tokio::test]
    async fn test_opening_job_shows_loading_modal() {
        let mut dashboard = dashboard();
        dashboard.apply(DashboardMessage::JobsLoaded(Ok(vec![job(4, JobStatus::Completed)])));
        dashboard.handle_key(key(KeyCode::Enter));
        assert!(dashboard.session().is_open());
        assert!(screen(&mut dashboard).contains("Loading results"));
        dashboard.handle_key(key(KeyCode::Esc));
        assert!(!dashboard.session().is_open());
    }
}
