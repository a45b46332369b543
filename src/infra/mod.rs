//! Infrastructure: telemetry, persistence, HTTP.

pub mod error;
pub mod http;
pub mod store;
pub mod telemetry;

pub use error::InfraError;
pub use store::FsDatasetStore;
