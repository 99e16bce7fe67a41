pub mod analysis;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod table;
pub mod types;

pub use config::{Config, DataPaths, SpendRules};
pub use error::{PipelineError, Result};
pub use pipeline::cache::{ContentHash, InvalidationPolicy, LoadOnce, MaxAge, SnapshotCache};
pub use pipeline::{load, run, LoadReport, Snapshot};
