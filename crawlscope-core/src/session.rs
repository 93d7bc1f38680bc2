// Job detail session: fetch -> map -> layout orchestration and UI state

use crate::category::CategoryTable;
use crate::error::Result;
use crate::export::{ExportArtifact, ExportFormat, export};
use crate::layout::{LayoutConfig, NetworkScene, RenderedGraph, TreeScene, ViewMode};
use crate::map::{IntegrityWarning, MappedGraph, build_tree, map_graph, map_pages};
use crate::view::{DetailView, detail_view};
use crawlscope_client::{
    ApiClient, CategoryStats, ClientError, Job, JobId, JobStats, Page, PageFilter, RawGraph, TreeData,
};
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Loading { job_id: JobId },
    Loaded,
    Filtered { category: String },
}

/// Identifies one detail load; results carrying an older ticket are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub job_id: JobId,
    generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterTicket {
    pub job_id: JobId,
    pub category: String,
    generation: u64,
    sequence: u64,
}

/// Everything fetched for one job's detail view.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDetail {
    pub job: Job,
    pub pages: Vec<Page>,
    pub stats: JobStats,
    pub graph: RawGraph,
    pub tree: Option<TreeData>,
    /// `None` when the backend could not provide classification stats.
    pub classification: Option<CategoryStats>,
}

/// Fetch job, pages, stats, graph, tree and classification stats concurrently.
///
/// Results of a job that has not completed are treated as empty rather than
/// failing; tree data and classification stats are best-effort.
pub async fn fetch_detail(client: &ApiClient, job_id: JobId) -> Result<JobDetail> {
    let (job, pages, stats, graph, tree, classification) = futures::join!(
        client.get_job(job_id),
        client.get_pages(job_id, &PageFilter::All),
        client.get_stats(job_id),
        client.get_graph_data(job_id),
        client.get_tree_data(job_id),
        client.get_classification_stats(job_id),
    );

    let job = job?;
    let classification = best_effort("classification stats", job_id, classification);
    let tree = best_effort("tree data", job_id, tree);

    if !job.has_results() {
        debug!("Job {} is {}, no results yet", job_id, job.status);
        return Ok(JobDetail {
            job,
            pages: Vec::new(),
            stats: JobStats::default(),
            graph: RawGraph::default(),
            tree: None,
            classification,
        });
    }

    Ok(JobDetail {
        job,
        pages: pages?,
        stats: stats?,
        graph: graph?,
        tree,
        classification,
    })
}

fn best_effort<T>(what: &str, job_id: JobId, result: std::result::Result<T, ClientError>) -> Option<T> {
    result
        .map_err(|e| warn!("{} unavailable for job {}: {}", what, job_id, e))
        .ok()
}

pub async fn fetch_filtered(client: &ApiClient, job_id: JobId, category: &str) -> Result<Vec<Page>> {
    Ok(client
        .get_pages(job_id, &PageFilter::Category(category.to_string()))
        .await?)
}

pub struct Session {
    state: SessionState,
    generation: u64,
    filter_sequence: u64,
    detail: Option<JobDetail>,
    mapped: MappedGraph,
    displayed_pages: Vec<Page>,
    view_mode: ViewMode,
    rendered: Option<RenderedGraph>,
    table: CategoryTable,
    layout: LayoutConfig,
    notices: Vec<Notice>,
}

impl Session {
    pub fn new(table: CategoryTable, layout: LayoutConfig) -> Self {
        Self {
            state: SessionState::Closed,
            generation: 0,
            filter_sequence: 0,
            detail: None,
            mapped: MappedGraph::default(),
            displayed_pages: Vec::new(),
            view_mode: ViewMode::default(),
            rendered: None,
            table,
            layout,
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != SessionState::Closed
    }

    pub fn current_job_id(&self) -> Option<JobId> {
        match &self.state {
            SessionState::Closed => None,
            SessionState::Loading { job_id } => Some(*job_id),
            _ => self.detail.as_ref().map(|d| d.job.id),
        }
    }

    pub fn detail(&self) -> Option<&JobDetail> {
        self.detail.as_ref()
    }

    pub fn displayed_pages(&self) -> &[Page] {
        &self.displayed_pages
    }

    pub fn active_category(&self) -> Option<&str> {
        match &self.state {
            SessionState::Filtered { category } => Some(category),
            _ => None,
        }
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn rendered(&self) -> Option<&RenderedGraph> {
        self.rendered.as_ref()
    }

    pub fn rendered_mut(&mut self) -> Option<&mut RenderedGraph> {
        self.rendered.as_mut()
    }

    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    pub fn integrity_warnings(&self) -> &[IntegrityWarning] {
        &self.mapped.warnings
    }

    pub fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice::new(level, message));
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Enter `Loading` for `job_id`, superseding any load in flight.
    pub fn begin_load(&mut self, job_id: JobId) -> LoadTicket {
        self.generation += 1;
        self.filter_sequence += 1;
        self.state = SessionState::Loading { job_id };
        self.detail = None;
        self.mapped = MappedGraph::default();
        self.displayed_pages.clear();
        self.rendered = None;
        info!("Loading job {} (generation {})", job_id, self.generation);
        LoadTicket {
            job_id,
            generation: self.generation,
        }
    }

    /// Apply a finished load. Returns false if the ticket was superseded.
    pub fn apply_detail(&mut self, ticket: LoadTicket, result: Result<JobDetail>) -> bool {
        if ticket.generation != self.generation
            || self.state != (SessionState::Loading { job_id: ticket.job_id })
        {
            debug!(
                "Discarding stale load of job {} (generation {}, current {})",
                ticket.job_id, ticket.generation, self.generation
            );
            return false;
        }

        match result {
            Ok(detail) => {
                self.mapped = if detail.graph.nodes.is_empty() {
                    map_pages(&detail.pages, &detail.graph.links)
                } else {
                    map_graph(&detail.graph)
                };
                if !self.mapped.warnings.is_empty() {
                    let message = format!(
                        "Graph data had {} integrity problem(s); affected links were dropped",
                        self.mapped.warnings.len()
                    );
                    self.notify(NoticeLevel::Warning, message);
                }
                self.displayed_pages = detail.pages.clone();
                self.detail = Some(detail);
                self.state = SessionState::Loaded;
                self.render();
            }
            Err(e) => {
                warn!("Failed to load job {}: {}", ticket.job_id, e);
                self.notify(NoticeLevel::Error, format!("Failed to load: {}", e));
                self.state = SessionState::Closed;
            }
        }
        true
    }

    /// Fetch and apply a job detail in one step.
    pub async fn load(&mut self, client: &ApiClient, job_id: JobId) -> bool {
        let ticket = self.begin_load(job_id);
        let result = fetch_detail(client, job_id).await;
        self.apply_detail(ticket, result)
    }

    /// Start filtering the page list by `category`. `None` unless a job is loaded.
    pub fn begin_filter(&mut self, category: &str) -> Option<FilterTicket> {
        if !matches!(self.state, SessionState::Loaded | SessionState::Filtered { .. }) {
            return None;
        }
        let job_id = self.detail.as_ref()?.job.id;
        self.filter_sequence += 1;
        Some(FilterTicket {
            job_id,
            category: category.to_string(),
            generation: self.generation,
            sequence: self.filter_sequence,
        })
    }

    /// Replace the displayed page list with a filter result, unless superseded.
    pub fn apply_filter(&mut self, ticket: FilterTicket, result: Result<Vec<Page>>) -> bool {
        if ticket.generation != self.generation || ticket.sequence != self.filter_sequence {
            debug!("Discarding stale {} filter for job {}", ticket.category, ticket.job_id);
            return false;
        }
        match result {
            Ok(pages) => {
                debug!("Filter {} matched {} pages", ticket.category, pages.len());
                self.displayed_pages = pages;
                self.state = SessionState::Filtered {
                    category: ticket.category,
                };
            }
            Err(e) => {
                warn!("Category filter failed: {}", e);
                self.notify(NoticeLevel::Error, format!("Failed to filter by {}: {}", ticket.category, e));
            }
        }
        true
    }

    pub async fn select_category(&mut self, client: &ApiClient, category: &str) -> bool {
        let Some(ticket) = self.begin_filter(category) else {
            return false;
        };
        let result = fetch_filtered(client, ticket.job_id, &ticket.category).await;
        self.apply_filter(ticket, result)
    }

    pub fn clear_filter(&mut self) {
        self.filter_sequence += 1;
        if let SessionState::Filtered { .. } = self.state {
            self.displayed_pages = self
                .detail
                .as_ref()
                .map(|d| d.pages.clone())
                .unwrap_or_default();
            self.state = SessionState::Loaded;
        }
    }

    pub fn close(&mut self) {
        self.generation += 1;
        self.filter_sequence += 1;
        self.state = SessionState::Closed;
        self.detail = None;
        self.mapped = MappedGraph::default();
        self.displayed_pages.clear();
        self.rendered = None;
    }

    /// Switch views, discarding the current scene before building the next one.
    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
        self.rendered = None;
        if self.detail.is_some() {
            self.render();
        }
    }

    fn render(&mut self) {
        let Some(detail) = self.detail.as_ref() else {
            return;
        };
        if !detail.job.has_results() {
            return;
        }

        self.rendered = match self.view_mode {
            ViewMode::Network => {
                if self.mapped.graph.is_empty() {
                    None
                } else {
                    Some(RenderedGraph::Network(NetworkScene::new(
                        &self.mapped.graph,
                        &self.table,
                        &self.layout,
                    )))
                }
            }
            ViewMode::Tree => detail
                .tree
                .clone()
                .filter(|t| !t.name.is_empty() || !t.children.is_empty())
                .or_else(|| build_tree(&detail.pages, &detail.graph.links, &detail.job.start_url))
                .map(|tree| RenderedGraph::Tree(TreeScene::new(&tree, &self.table, &self.layout))),
        };

        if self.rendered.is_none() {
            let message = match self.view_mode {
                ViewMode::Network => "No graph data available",
                ViewMode::Tree => "No tree data available",
            };
            self.notify(NoticeLevel::Info, message);
        }
    }

    pub fn detail_view(&self) -> Option<DetailView> {
        let detail = self.detail.as_ref()?;
        Some(detail_view(
            &detail.job,
            &detail.stats,
            &self.displayed_pages,
            detail.classification.as_ref(),
            &self.table,
            self.active_category(),
        ))
    }

    /// Export the current scene. Nothing rendered yields `Ok(None)` and a notice.
    pub fn export_current(&mut self, format: ExportFormat) -> Result<Option<ExportArtifact>> {
        let artifact = export(self.rendered.as_ref(), format)?;
        if artifact.is_none() {
            self.notify(NoticeLevel::Warning, "Nothing to export: no graph is rendered");
        }
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crawlscope_client::{JobStatus, PageId, RawLink, RawNode};

    fn detail(job_id: JobId, status: JobStatus) -> JobDetail {
        let node = |id| RawNode {
            id,
            url: format!("https://example.com/{}", id),
            title: None,
            category: Some("BLOG".to_string()),
            level: 0,
            value: None,
            outgoing_links_count: Some(1),
        };
        JobDetail {
            job: Job {
                id: job_id,
                start_url: "https://example.com".to_string(),
                max_depth: 2,
                crawl_scope: "DOMAIN".to_string(),
                respect_robots_txt: true,
                status,
                total_pages_found: Some(2),
                total_pages_crawled: Some(2),
                error_message: None,
                created_at: None,
            },
            pages: vec![page(1, 0), page(2, 1)],
            stats: JobStats::default(),
            graph: RawGraph {
                nodes: vec![node(1), node(2)],
                links: vec![RawLink { source: 1, target: 2 }, RawLink { source: 1, target: 99 }],
            },
            tree: None,
            classification: None,
        }
    }

    fn page(id: PageId, level: u32) -> Page {
        Page {
            id,
            url: format!("https://example.com/{}", id),
            title: Some(format!("Page {}", id)),
            http_status_code: Some(200),
            hierarchy_level: level,
            outgoing_links_count: 1,
            content_type: Some("text/html".to_string()),
            is_successful: true,
            category: Some("BLOG".to_string()),
            error_message: None,
        }
    }

    fn session() -> Session {
        Session::new(CategoryTable::default(), LayoutConfig::default())
    }

    #[test]
    fn test_stale_load_is_discarded() {
        let mut session = session();
        let first = session.begin_load(1);
        let second = session.begin_load(2);

        assert!(!session.apply_detail(first, Ok(detail(1, JobStatus::Completed))));
        assert_eq!(session.state(), &SessionState::Loading { job_id: 2 });

        assert!(session.apply_detail(second, Ok(detail(2, JobStatus::Completed))));
        assert_eq!(session.state(), &SessionState::Loaded);
        assert_eq!(session.current_job_id(), Some(2));
    }

    #[test]
    fn test_load_after_close_is_discarded() {
        let mut session = session();
        let ticket = session.begin_load(1);
        session.close();
        assert!(!session.apply_detail(ticket, Ok(detail(1, JobStatus::Completed))));
        assert_eq!(session.state(), &SessionState::Closed);
    }

    #[test]
    fn test_dangling_link_surfaces_notice() {
        let mut session = session();
        let ticket = session.begin_load(1);
        session.apply_detail(ticket, Ok(detail(1, JobStatus::Completed)));
        assert_eq!(session.integrity_warnings().len(), 1);
        let notices = session.take_notices();
        assert!(notices.iter().any(|n| n.level == NoticeLevel::Warning));
        match session.rendered() {
            Some(RenderedGraph::Network(scene)) => {
                assert_eq!(scene.nodes().len(), 2);
                assert_eq!(scene.links().len(), 1);
            }
            _ => panic!("expected a network scene"),
        }
    }

    #[test]
    fn test_view_switch_replaces_scene() {
        let mut session = session();
        let ticket = session.begin_load(1);
        session.apply_detail(ticket, Ok(detail(1, JobStatus::Completed)));
        session.set_view_mode(ViewMode::Tree);
        assert_eq!(session.rendered().map(RenderedGraph::mode), Some(ViewMode::Tree));
        session.set_view_mode(ViewMode::Network);
        assert_eq!(session.rendered().map(RenderedGraph::mode), Some(ViewMode::Network));
    }

    #[test]
    fn test_failed_load_closes_with_notice() {
        let mut session = session();
        let ticket = session.begin_load(5);
        let err = CoreError::Client(ClientError::Backend {
            status: 500,
            status_text: "Internal Server Error".to_string(),
        });
        assert!(session.apply_detail(ticket, Err(err)));
        assert_eq!(session.state(), &SessionState::Closed);
        let notices = session.take_notices();
        assert_eq!(notices[0].message, "Failed to load: HTTP 500: Internal Server Error");
    }

    #[test]
    fn test_filter_lifecycle_and_staleness() {
        let mut session = session();
        assert!(session.begin_filter("BLOG").is_none());

        let ticket = session.begin_load(1);
        let mut loaded = detail(1, JobStatus::Completed);
        loaded.pages = vec![];
        session.apply_detail(ticket, Ok(loaded));

        let old = session.begin_filter("BLOG").unwrap();
        let new = session.begin_filter("PRODUCT").unwrap();
        assert!(!session.apply_filter(old, Ok(vec![])));
        assert!(session.apply_filter(new, Ok(vec![])));
        assert_eq!(session.active_category(), Some("PRODUCT"));

        session.clear_filter();
        assert_eq!(session.state(), &SessionState::Loaded);
        assert_eq!(session.active_category(), None);
    }

    #[test]
    fn test_export_without_scene_notifies() {
        let mut session = session();
        assert!(session.export_current(ExportFormat::Png).unwrap().is_none());
        assert_eq!(session.take_notices().len(), 1);
    }

    #[test]
    fn test_unfinished_job_renders_nothing() {
        let mut session = session();
        let ticket = session.begin_load(3);
        let mut running = detail(3, JobStatus::Running);
        running.graph = RawGraph::default();
        session.apply_detail(ticket, Ok(running));
        assert!(session.rendered().is_none());
        assert_eq!(
            session.detail_view().unwrap().pages,
            crate::view::PageList::NoResultsYet
        );
    }
}
