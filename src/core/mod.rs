pub mod config;
pub mod error;
pub mod types;

pub use config::EngineConfig;
pub use error::{NacioError, Result};
pub use types::{Era, NationId, TimelineId, Turn};
