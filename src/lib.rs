pub mod config;
pub mod efficiency;
pub mod error;
pub mod http_client;
pub mod ingest;
pub mod logging;
pub mod merge;
pub mod model;
pub mod outcomes;
pub mod persist;
pub mod pipeline;
pub mod source;
pub mod table;
pub mod teams;

pub use error::{PipelineError, Result};
