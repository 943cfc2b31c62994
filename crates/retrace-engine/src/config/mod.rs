pub mod loader;
pub mod schema;

pub use loader::{ConfigError, ConfigLoader, validate};
pub use schema::{AxTreeConfig, PipelineConfig, RetraceConfig, RetryConfig, StoreConfig};
