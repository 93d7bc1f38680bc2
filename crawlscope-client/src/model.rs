use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type JobId = i64;
pub type PageId = i64;

/// Category label -> number of pages carrying it.
pub type CategoryStats = BTreeMap<String, u64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(JobStatus::Pending),
            "RUNNING" => Some(JobStatus::Running),
            "COMPLETED" => Some(JobStatus::Completed),
            "FAILED" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scopes the backend understands for `crawlScope`.
pub const CRAWL_SCOPES: &[&str] = &["DOMAIN", "SUBDOMAIN", "PATH", "ALL"];

/// Body of `POST /crawl-jobs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    pub start_url: String,
    pub max_depth: u32,
    pub crawl_scope: String,
    pub respect_robots_txt: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub start_url: String,
    pub max_depth: u32,
    pub crawl_scope: String,
    #[serde(default)]
    pub respect_robots_txt: bool,
    pub status: JobStatus,
    #[serde(default)]
    pub total_pages_found: Option<u64>,
    #[serde(default)]
    pub total_pages_crawled: Option<u64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Job {
    pub fn has_results(&self) -> bool {
        self.status == JobStatus::Completed
    }

    /// Creation time, accepting both offset and naive (server-local) timestamps.
    pub fn created(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_at.as_deref()?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: PageId,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub http_status_code: Option<u16>,
    #[serde(default)]
    pub hierarchy_level: u32,
    #[serde(default)]
    pub outgoing_links_count: u32,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub is_successful: bool,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStats {
    #[serde(default)]
    pub total_pages: u64,
    #[serde(default)]
    pub successful_pages: u64,
    #[serde(default)]
    pub failed_pages: u64,
}

/// Node of the backend `graph-data` payload, before mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    pub id: PageId,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub value: Option<u32>,
    #[serde(default)]
    pub outgoing_links_count: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLink {
    pub source: PageId,
    pub target: PageId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGraph {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub links: Vec<RawLink>,
}

/// Hierarchical page tree as served by `tree-data` or built locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u32>,
    #[serde(default)]
    pub children: Vec<TreeData>,
}

impl TreeData {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
            category: None,
            value: None,
            children: Vec::new(),
        }
    }

    /// Number of levels, counting the root as 1.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(TreeData::depth).max().unwrap_or(0)
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeData::node_count).sum::<usize>()
    }
}

/// Filter applied to `results/pages`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageFilter {
    #[default]
    All,
    Level(u32),
    Category(String),
}

/// Server-side export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendExport {
    GraphMl,
    Xml,
    Sitemap,
}

impl BackendExport {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "graphml" => Some(BackendExport::GraphMl),
            "xml" => Some(BackendExport::Xml),
            "sitemap" => Some(BackendExport::Sitemap),
            _ => None,
        }
    }

    pub fn path_segment(&self) -> &'static str {
        match self {
            BackendExport::GraphMl => "graphml",
            BackendExport::Xml => "xml",
            BackendExport::Sitemap => "sitemap",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            BackendExport::GraphMl => "graphml",
            BackendExport::Xml | BackendExport::Sitemap => "xml",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_decodes_camel_case_with_missing_counts() {
        let json = r#"{
            "id": 7,
            "startUrl": "https://example.com",
            "maxDepth": 2,
            "crawlScope": "DOMAIN",
            "respectRobotsTxt": true,
            "status": "PENDING",
            "createdAt": "2024-03-05T14:30:00"
        }"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert_eq!(job.id, 7);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.total_pages_found, None);
        assert!(job.created().is_some());
        assert!(!job.has_results());
    }

    #[test]
    fn test_job_created_accepts_offset_timestamps() {
        let job = Job {
            id: 1,
            start_url: "https://example.com".to_string(),
            max_depth: 1,
            crawl_scope: "DOMAIN".to_string(),
            respect_robots_txt: false,
            status: JobStatus::Completed,
            total_pages_found: Some(3),
            total_pages_crawled: Some(3),
            error_message: None,
            created_at: Some("2024-03-05T14:30:00+02:00".to_string()),
        };
        let created = job.created().unwrap();
        assert_eq!(created.to_rfc3339(), "2024-03-05T12:30:00+00:00");
    }

    #[test]
    fn test_tree_depth_counts_root() {
        let mut root = TreeData::leaf("root");
        root.children.push(TreeData::leaf("a"));
        root.children.push(TreeData::leaf("b"));
        assert_eq!(root.depth(), 2);
        assert_eq!(root.node_count(), 3);
    }

    #[test]
    fn test_job_status_parsing_is_case_insensitive() {
        assert_eq!(JobStatus::from_str("running"), Some(JobStatus::Running));
        assert_eq!(JobStatus::from_str("nope"), None);
    }
}
