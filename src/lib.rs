pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::http::ApiClient;
pub use adapters::table::LocalTableStore;
pub use config::registry::CollectRegistry;
pub use core::collector::{CollectCallbacks, Collector};
pub use core::migration::MigrationEngine;
pub use domain::model::{CollectSettings, MigrationResult, Record};
pub use utils::error::{HarvestError, Result};
