// Terminal rendering of the view models

use colored::{ColoredString, Colorize};
use crawlscope_client::JobStatus;
use crawlscope_core::view::{CategoryChip, DetailView, JobCard, JobList, PageItem, PageList, StatCard};
use crawlscope_core::{Notice, NoticeLevel};
use std::fmt::Write;

pub fn divider() -> String {
    "═".repeat(60).bright_blue().bold().to_string()
}

pub fn status_label(status: JobStatus) -> ColoredString {
    let label = status.as_str();
    match status {
        JobStatus::Pending => label.yellow().bold(),
        JobStatus::Running => label.cyan().bold(),
        JobStatus::Completed => label.green().bold(),
        JobStatus::Failed => label.red().bold(),
    }
}

pub fn format_notice(notice: &Notice) -> String {
    match notice.level {
        NoticeLevel::Info => format!("{} {}", "ℹ".blue(), notice.message),
        NoticeLevel::Success => format!("{} {}", "✓".green().bold(), notice.message),
        NoticeLevel::Warning => format!("{} {}", "⚠".yellow().bold(), notice.message.yellow()),
        NoticeLevel::Error => format!("{} {}", "✗".red().bold(), notice.message.red()),
    }
}

pub fn format_job_list(list: &JobList) -> String {
    match list {
        JobList::Empty(message) => format!("{}\n", message.dimmed()),
        JobList::Jobs(cards) => {
            let mut out = String::new();
            for card in cards {
                let _ = writeln!(
                    out,
                    "{:>6}  {:<20}  {}",
                    format!("#{}", card.id).bright_white(),
                    status_label(card.status),
                    card.url
                );
            }
            out
        }
    }
}

pub fn format_job_card(card: &JobCard) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}  {}", card.title.bright_white().bold(), status_label(card.status));
    let _ = writeln!(out, "{} {}", "→".blue(), card.url);
    for item in &card.meta {
        let _ = writeln!(out, "  {:<14} {}", item.label.dimmed(), item.value);
    }
    if let Some(error) = &card.error {
        let _ = writeln!(out, "  {} {}", "✗".red().bold(), error.red());
    }
    if !card.actions.is_empty() {
        let labels: Vec<&str> = card.actions.iter().map(|a| a.label()).collect();
        let _ = writeln!(out, "  {} {}", "Actions:".dimmed(), labels.join(", "));
    }
    out
}

fn format_stats(stats: &[StatCard]) -> String {
    stats
        .iter()
        .map(|s| format!("{} {}", s.label.dimmed(), s.value.to_string().bright_white().bold()))
        .collect::<Vec<_>>()
        .join("   ")
}

fn format_chips(chips: &[CategoryChip]) -> String {
    chips
        .iter()
        .map(|chip| {
            let text = format!("{} ({})", chip.label, chip.count);
            if chip.active { text.reversed().to_string() } else { text }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn format_page(out: &mut String, item: &PageItem) {
    let mark = if item.successful { "✓".green().bold() } else { "✗".red().bold() };
    let _ = writeln!(out, "{} {}", mark, item.title.bright_white());
    let _ = writeln!(out, "    {}", item.url.dimmed());
    let meta: Vec<String> = item.meta.iter().map(|m| format!("{} {}", m.label, m.value)).collect();
    let _ = writeln!(out, "    {}", meta.join(" · "));
    if let Some(error) = &item.error {
        let _ = writeln!(out, "    {}", error.red());
    }
}

pub fn format_detail(view: &DetailView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", divider());
    let _ = writeln!(out, "  {}  {}", view.title.bright_white().bold(), status_label(view.status));
    let _ = writeln!(out, "  {} {}", "→".blue(), view.start_url);
    let _ = writeln!(out, "{}", divider());
    let _ = writeln!(out, "{}", format_stats(&view.stats));

    match &view.categories {
        Some(chips) if !chips.is_empty() => {
            let _ = writeln!(out, "{} {}", "Categories:".dimmed(), format_chips(chips));
        }
        Some(_) => {}
        None => {
            let _ = writeln!(out, "{}", "Category stats not available".dimmed());
        }
    }
    let _ = writeln!(out);

    match &view.pages {
        PageList::NoResultsYet => {
            let _ = writeln!(out, "{}", crawlscope_core::view::NO_RESULTS_MESSAGE.dimmed());
        }
        PageList::Empty => {
            let _ = writeln!(out, "{}", "No pages found".dimmed());
        }
        PageList::Pages(items) => {
            for item in items {
                format_page(&mut out, item);
            }
        }
    }
    out
}
