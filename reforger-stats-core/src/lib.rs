//! # reforger-stats-core
//!
//! Core library for reforger-stats - player statistics lookups for Arma
//! Reforger game servers.
//!
//! This library provides:
//! - Identifier resolution (player UID or partial name)
//! - Schema-adaptive stats queries over a read-only SQLite database
//! - Aggregation across servers and derived metrics
//! - A presentation-neutral [`Report`]
//! - Configuration management and logging infrastructure
//!
//! ## Lookup flow
//!
//! identifier → classify → schema → identity → query → rows → aggregate → report.
//! See [`pipeline`] for the state machine and [`service`] for the async entry point.
//!
//! ## Example
//!
//! ```rust,no_run
//! use reforger_stats_core::{Config, StatsService};
//!
//! # async fn run() -> reforger_stats_core::Result<()> {
//! let config = Config::load()?;
//! let service = StatsService::open(&config)?;
//!
//! let report = service.resolve_stats("smith", Some(1)).await?;
//! println!("K/D: {}", report.infantry.kd_ratio);
//!
//! service.close()?;
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use config::{Config, StatsSettings};
pub use db::{Database, StatsStore};
pub use error::{Error, ErrorKind, Result};
pub use pipeline::{resolve_stats, Stage, StatsLookup};
pub use report::Report;
pub use service::StatsService;
pub use types::*;

// Public modules
pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod service;
pub mod types;

#[cfg(test)]
mod test_support;
