pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::adapters::{FixtureData, FixtureSource, PipedriveClient};
pub use crate::config::toml_config::SyncConfig;
pub use crate::core::{
    engine::{RunReport, SyncEngine},
    pagination::PaginatedFetcher,
    reconcile::{PassReport, ReconcileOptions, Reconciler, SkipReason},
};
pub use crate::utils::error::{Result, SyncError};
