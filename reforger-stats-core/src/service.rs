//! Async entry point for stats lookups.
//!
//! SQLite calls block, so each lookup runs on tokio's blocking pool and is
//! bounded by the configured query timeout. A lookup that times out or is
//! abandoned by its caller yields nothing: the report is only handed back
//! once every stage has completed.

use crate::config::{Config, StatsSettings};
use crate::db::{Database, SchemaCache};
use crate::error::{Error, Result};
use crate::pipeline::StatsLookup;
use crate::report::Report;
use std::sync::Arc;

/// Shared state for serving stats lookups.
///
/// Cloning is cheap; clones share the database handle and schema cache.
#[derive(Clone)]
pub struct StatsService {
    db: Arc<Database>,
    settings: Arc<StatsSettings>,
    schema_cache: Arc<SchemaCache>,
}

impl StatsService {
    pub fn new(db: Database, settings: StatsSettings) -> Self {
        Self {
            db: Arc::new(db),
            settings: Arc::new(settings),
            schema_cache: Arc::new(SchemaCache::new()),
        }
    }

    /// Validate `config` and open its stats database read-only.
    pub fn open(config: &Config) -> Result<Self> {
        let settings = config.settings()?;
        let db = Database::open(
            &config.resolved_database_path(),
            settings.query_timeout,
            config.database.pool_size,
        )?;
        Ok(Self::new(db, settings))
    }

    pub fn settings(&self) -> &StatsSettings {
        &self.settings
    }

    pub fn schema_cache(&self) -> &SchemaCache {
        &self.schema_cache
    }

    /// Look up the stats of `identifier` (a player UID or part of a name),
    /// optionally restricted to server `scope`.
    pub async fn resolve_stats(&self, identifier: &str, scope: Option<i64>) -> Result<Report> {
        let db = Arc::clone(&self.db);
        let settings = Arc::clone(&self.settings);
        let cache = Arc::clone(&self.schema_cache);
        let identifier = identifier.to_string();
        let timeout = self.settings.query_timeout;

        let task = tokio::task::spawn_blocking(move || {
            StatsLookup::new(db.as_ref(), &settings)
                .with_schema_cache(&cache)
                .run(&identifier, scope)
        });

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                tracing::error!(error = %join_err, "Stats lookup task failed");
                Err(Error::transient(join_err))
            }
            Err(_) => {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Stats lookup timed out");
                Err(Error::transient(format!(
                    "lookup exceeded {} ms",
                    timeout.as_millis()
                )))
            }
        }
    }

    /// Close the database.
    ///
    /// Fails with [`Error::Transient`] while other clones of this service, or
    /// lookups abandoned after a timeout, still hold the database; the
    /// database stays open until the last of them is dropped.
    pub fn close(self) -> Result<()> {
        match Arc::try_unwrap(self.db) {
            Ok(db) => db.close(),
            Err(db) => {
                let others = Arc::strong_count(&db) - 1;
                tracing::warn!(others, "Stats database still in use; not closed");
                Err(Error::transient(format!(
                    "stats database still held by {others} other handle(s)"
                )))
            }
        }
    }
}
