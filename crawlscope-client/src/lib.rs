pub mod client;
pub mod error;
pub mod model;

pub use client::{ApiClient, DEFAULT_BASE_URL, RetryPolicy};
pub use error::ClientError;
pub use model::{
    BackendExport, CategoryStats, Job, JobId, JobStats, JobStatus, NewJob, Page, PageFilter,
    PageId, RawGraph, RawLink, RawNode, TreeData,
};
