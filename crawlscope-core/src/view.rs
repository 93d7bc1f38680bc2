// Typed view models for jobs, pages, stats and category filters

use crate::category::{CategoryTable, category_key};
use chrono::{DateTime, Local, TimeZone};
use crawlscope_client::{CategoryStats, Job, JobStats, JobStatus, Page};
use serde::Serialize;
use std::fmt::Display;

pub const NO_JOBS_MESSAGE: &str = "No crawl jobs yet. Create one to get started!";
pub const NO_RESULTS_MESSAGE: &str = "No results yet";
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobAction {
    Start,
    ViewResults,
    Refresh,
}

impl JobAction {
    pub fn label(&self) -> &'static str {
        match self {
            JobAction::Start => "Start",
            JobAction::ViewResults => "View Results",
            JobAction::Refresh => "Refresh",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetaItem {
    pub label: &'static str,
    pub value: String,
}

impl MetaItem {
    fn new(label: &'static str, value: impl ToString) -> Self {
        Self {
            label,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobCard {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub status: JobStatus,
    pub meta: Vec<MetaItem>,
    pub actions: Vec<JobAction>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageItem {
    pub title: String,
    pub url: String,
    pub successful: bool,
    pub category: String,
    pub meta: Vec<MetaItem>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatCard {
    pub label: &'static str,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryChip {
    pub category: String,
    pub label: String,
    pub color: String,
    pub count: u64,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PageList {
    NoResultsYet,
    Empty,
    Pages(Vec<PageItem>),
}

/// Body of the job detail modal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailView {
    pub title: String,
    pub start_url: String,
    pub status: JobStatus,
    pub stats: Vec<StatCard>,
    /// `None` when classification stats could not be fetched.
    pub categories: Option<Vec<CategoryChip>>,
    pub pages: PageList,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum JobList {
    Empty(&'static str),
    Jobs(Vec<JobCard>),
}

/// Short month, day and 12-hour time, e.g. `Mar 5, 02:30 PM`.
pub fn format_date<Tz: TimeZone>(date: Option<DateTime<Tz>>) -> String
where
    Tz::Offset: Display,
{
    match date {
        Some(date) => date.format("%b %-d, %I:%M %p").to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn job_card(job: &Job) -> JobCard {
    let mut actions = Vec::new();
    if job.status == JobStatus::Pending {
        actions.push(JobAction::Start);
    }
    if job.has_results() {
        actions.push(JobAction::ViewResults);
    }
    actions.push(JobAction::Refresh);

    JobCard {
        id: job.id,
        title: format!("Job #{}", job.id),
        url: job.start_url.clone(),
        status: job.status,
        meta: vec![
            MetaItem::new("Max Depth", job.max_depth),
            MetaItem::new("Scope", &job.crawl_scope),
            MetaItem::new("Pages Found", job.total_pages_found.unwrap_or(0)),
            MetaItem::new("Pages Crawled", job.total_pages_crawled.unwrap_or(0)),
            MetaItem::new("Created", format_date(job.created().map(|d| d.with_timezone(&Local)))),
        ],
        actions,
        error: job.error_message.clone().filter(|e| !e.is_empty()),
    }
}

pub fn job_list(jobs: &[Job]) -> JobList {
    if jobs.is_empty() {
        JobList::Empty(NO_JOBS_MESSAGE)
    } else {
        JobList::Jobs(jobs.iter().map(job_card).collect())
    }
}

pub fn page_item(page: &Page) -> PageItem {
    let mut meta = vec![
        MetaItem::new("Level", page.hierarchy_level),
        MetaItem::new(
            "Status",
            page.http_status_code
                .map(|s| s.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        ),
        MetaItem::new("Links", page.outgoing_links_count),
    ];
    if let Some(content_type) = page.content_type.as_deref().filter(|c| !c.is_empty()) {
        meta.push(MetaItem::new("Type", content_type));
    }

    PageItem {
        title: page
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "No Title".to_string()),
        url: page.url.clone(),
        successful: page.is_successful,
        category: category_key(page.category.as_deref()),
        meta,
        error: page.error_message.clone().filter(|e| !e.is_empty()),
    }
}

pub fn stat_cards(stats: &JobStats) -> Vec<StatCard> {
    vec![
        StatCard {
            label: "Total Pages",
            value: stats.total_pages,
        },
        StatCard {
            label: "Successful",
            value: stats.successful_pages,
        },
        StatCard {
            label: "Failed",
            value: stats.failed_pages,
        },
    ]
}

/// Filter chips in descending count order, ties by name.
pub fn category_chips(stats: &CategoryStats, table: &CategoryTable, active: Option<&str>) -> Vec<CategoryChip> {
    let mut chips: Vec<CategoryChip> = stats
        .iter()
        .map(|(name, count)| CategoryChip {
            category: name.clone(),
            label: table.label(Some(name)).to_string(),
            color: table.color(Some(name)).to_string(),
            count: *count,
            active: active.is_some_and(|a| a.eq_ignore_ascii_case(name)),
        })
        .collect();
    chips.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    chips
}

pub fn detail_view(
    job: &Job,
    stats: &JobStats,
    pages: &[Page],
    classification: Option<&CategoryStats>,
    table: &CategoryTable,
    active_category: Option<&str>,
) -> DetailView {
    let pages = if !job.has_results() {
        PageList::NoResultsYet
    } else if pages.is_empty() {
        PageList::Empty
    } else {
        PageList::Pages(pages.iter().map(page_item).collect())
    };

    DetailView {
        title: format!("Job #{} Results", job.id),
        start_url: job.start_url.clone(),
        status: job.status,
        stats: stat_cards(stats),
        categories: classification.map(|c| category_chips(c, table, active_category)),
        pages,
    }
}
