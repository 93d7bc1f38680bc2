use crate::error::{ClientError, Result};
use crate::model::{
    BackendExport, CategoryStats, Job, JobId, JobStats, JobStatus, NewJob, Page, PageFilter,
    RawGraph, TreeData,
};
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRY_ELAPSED: Duration = Duration::from_secs(60);

/// Bounded exponential backoff for idempotent requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Doubling schedule starting at `base_delay`, without jitter.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.base_delay)
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(Some(MAX_RETRY_ELAPSED))
            .build()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

/// Client for the crawl-job REST backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = Client::builder()
            .user_agent(concat!("crawlscope/", env!("CARGO_PKG_VERSION")))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Per-request timeout. A timed-out request counts as a network error.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn create_job(&self, job: &NewJob) -> Result<Job> {
        info!("Creating crawl job for {}", job.start_url);
        self.send_json(Method::POST, "/crawl-jobs", &[], Some(job)).await
    }

    pub async fn start_job(&self, job_id: JobId) -> Result<()> {
        info!("Starting crawl job {}", job_id);
        self.execute::<()>(Method::POST, &format!("/crawl-jobs/{}/start", job_id), &[], None)
            .await
            .map(|_| ())
    }

    pub async fn list_jobs(&self, status: Option<JobStatus>) -> Result<Vec<Job>> {
        let query: Vec<(&str, String)> = status
            .map(|s| vec![("status", s.as_str().to_string())])
            .unwrap_or_default();
        self.get("/crawl-jobs", &query).await
    }

    pub async fn get_job(&self, job_id: JobId) -> Result<Job> {
        self.get(&format!("/crawl-jobs/{}", job_id), &[]).await
    }

    pub async fn get_pages(&self, job_id: JobId, filter: &PageFilter) -> Result<Vec<Page>> {
        let query = match filter {
            PageFilter::All => vec![],
            PageFilter::Level(level) => vec![("level", level.to_string())],
            PageFilter::Category(category) => vec![("category", category.clone())],
        };
        self.get(&format!("/crawl-jobs/{}/results/pages", job_id), &query)
            .await
    }

    pub async fn get_root_pages(&self, job_id: JobId) -> Result<Vec<Page>> {
        self.get(&format!("/crawl-jobs/{}/results/root-pages", job_id), &[])
            .await
    }

    pub async fn get_stats(&self, job_id: JobId) -> Result<JobStats> {
        self.get(&format!("/crawl-jobs/{}/results/stats", job_id), &[])
            .await
    }

    pub async fn get_graph_data(&self, job_id: JobId) -> Result<RawGraph> {
        self.get(&format!("/crawl-jobs/{}/results/graph-data", job_id), &[])
            .await
    }

    pub async fn get_tree_data(&self, job_id: JobId) -> Result<TreeData> {
        self.get(&format!("/crawl-jobs/{}/results/tree-data", job_id), &[])
            .await
    }

    pub async fn get_classification_stats(&self, job_id: JobId) -> Result<CategoryStats> {
        self.get(
            &format!("/crawl-jobs/{}/results/classification-stats", job_id),
            &[],
        )
        .await
    }

    pub async fn classify_job(&self, job_id: JobId) -> Result<()> {
        info!("Requesting classification of job {}", job_id);
        self.execute::<()>(Method::POST, &format!("/crawl-jobs/{}/classify", job_id), &[], None)
            .await
            .map(|_| ())
    }

    /// Fetch a server-rendered export. The body is returned verbatim.
    pub async fn export(&self, job_id: JobId, format: BackendExport) -> Result<String> {
        self.execute::<()>(
            Method::GET,
            &format!("/crawl-jobs/{}/export/{}", job_id, format.path_segment()),
            &[],
            None,
        )
        .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        self.send_json::<T, ()>(Method::GET, path, query, None).await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T> {
        let text = self.execute(method, path, query, body).await?;
        serde_json::from_str(&text).map_err(|e| ClientError::Decode {
            endpoint: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Issue a request, retrying transient failures of GETs only.
    async fn execute<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<String> {
        let url = self.endpoint(path, query)?;
        let result = if method == Method::GET {
            self.get_with_retry(&url, body).await
        } else {
            self.send_once(method.clone(), url.clone(), body).await
        };
        result.inspect_err(|e| warn!("API error on {} {}: {}", method, url, e))
    }

    async fn get_with_retry<B: Serialize>(&self, url: &Url, body: Option<&B>) -> Result<String> {
        let max_attempts = self.retry.max_attempts.max(1);
        let attempt = &AtomicU32::new(0);

        backoff::future::retry_notify(
            self.retry.backoff(),
            move || {
                let url = url.clone();
                async move {
                    let n = attempt.fetch_add(1, Ordering::Relaxed) + 1;
                    self.send_once(Method::GET, url, body).await.map_err(|e| {
                        if e.is_transient() && n < max_attempts {
                            backoff::Error::transient(e)
                        } else {
                            backoff::Error::permanent(e)
                        }
                    })
                }
            },
            |e: ClientError, delay: Duration| {
                warn!(
                    "GET {} failed (attempt {}/{}): {}; retrying in {:?}",
                    url,
                    attempt.load(Ordering::Relaxed),
                    max_attempts,
                    e,
                    delay
                );
            },
        )
        .await
    }

    async fn send_once<B: Serialize>(&self, method: Method, url: Url, body: Option<&B>) -> Result<String> {
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, url)
            .timeout(self.timeout)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Backend {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        Ok(response.text().await?)
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let raw = format!("{}{}", self.base_url, path);
        let mut url = Url::parse(&raw).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", raw, e)))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}
