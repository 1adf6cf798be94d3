//! MultiBoost fit service
//!
//! HTTP front end that accepts fit configurations, translates them into script
//! invocations and reports the captured run.

pub mod cli;
pub mod config;
pub mod datasets;
pub mod server;

pub use config::ServiceConfig;
pub use datasets::{DatasetCatalog, DatasetEntry};
pub use server::{build_router, start_server, ApiError, AppState, SharedState};

/// Service version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
