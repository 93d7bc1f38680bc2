pub mod category;
pub mod config;
pub mod error;
pub mod export;
pub mod layout;
pub mod map;
pub mod session;
pub mod simulation;
pub mod svg;
pub mod view;
pub mod viewport;

pub use category::{CategoryStyle, CategoryTable};
pub use config::Config;
pub use error::CoreError;
pub use export::{ExportArtifact, ExportFormat};
pub use layout::{LayoutConfig, RenderedGraph, TreeOrientation, ViewMode};
pub use map::{GraphData, IntegrityWarning, MappedGraph};
pub use session::{JobDetail, Notice, NoticeLevel, Session, SessionState};
