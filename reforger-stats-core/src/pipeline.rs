//! The stats lookup state machine.
//!
//! A lookup moves through
//! `Start → Classified → SchemaResolved → IdentityVerified → QueryBuilt → RowsFetched → Rendered`
//! and any stage may end in `Failed(kind)`. There are no retries at this layer.
//! A lookup returns either a complete [`Report`] or exactly one [`Error`].

use crate::aggregate::{reduce, DerivedMetrics};
use crate::config::StatsSettings;
use crate::db::{SchemaCache, SchemaDescriptor, StatsQuery, StatsStore};
use crate::error::{Error, ErrorKind, Result};
use crate::report::Report;
use crate::resolver::{Identifier, IdentifierResolver};
use crate::types::ServerScope;
use std::sync::Arc;

/// Lookup stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Classified,
    SchemaResolved,
    IdentityVerified,
    QueryBuilt,
    RowsFetched,
    Rendered,
    Failed(ErrorKind),
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Rendered | Stage::Failed(_))
    }
}

/// One stats lookup against a store.
pub struct StatsLookup<'a, S: StatsStore + ?Sized> {
    store: &'a S,
    settings: &'a StatsSettings,
    schema_cache: Option<&'a SchemaCache>,
    stage: Stage,
}

impl<'a, S: StatsStore + ?Sized> StatsLookup<'a, S> {
    pub fn new(store: &'a S, settings: &'a StatsSettings) -> Self {
        Self {
            store,
            settings,
            schema_cache: None,
            stage: Stage::Start,
        }
    }

    /// Reuse schema descriptors from `cache` instead of introspecting every time.
    pub fn with_schema_cache(mut self, cache: &'a SchemaCache) -> Self {
        self.schema_cache = Some(cache);
        self
    }

    /// Current stage
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Run the lookup for `identifier`, optionally restricted to server `scope`.
    ///
    /// An out-of-range scope fails before the store is touched.
    pub fn run(&mut self, identifier: &str, scope: Option<i64>) -> Result<Report> {
        debug_assert_eq!(self.stage, Stage::Start, "a lookup runs once");

        match self.execute(identifier, scope) {
            Ok(report) => {
                self.advance(Stage::Rendered);
                Ok(report)
            }
            Err(err) => {
                self.advance(Stage::Failed(err.kind()));
                log_failure(&err, identifier);
                Err(err)
            }
        }
    }

    fn execute(&mut self, raw: &str, scope: Option<i64>) -> Result<Report> {
        let scope = ServerScope::validate(scope, self.settings.servers)?;

        let identifier = Identifier::classify(raw);
        self.advance(Stage::Classified);

        let schema = self.resolve_schema()?;
        self.advance(Stage::SchemaResolved);

        let player = IdentifierResolver::new(self.store, &self.settings.registry_table)
            .resolve(&identifier, &schema, scope)?;
        self.advance(Stage::IdentityVerified);

        let query = StatsQuery::build(&player.uid, scope, &schema);
        self.advance(Stage::QueryBuilt);

        let record = reduce(self.store.fetch_stats(&query)?).ok_or_else(|| Error::NotFound {
            identifier: player.uid.clone(),
            server: scope.map(|s| s.get()),
        })?;
        self.advance(Stage::RowsFetched);

        let derived = DerivedMetrics::from_record(&record);
        Ok(Report::render(player, &record, derived, query.scope()))
    }

    fn resolve_schema(&self) -> Result<Arc<SchemaDescriptor>> {
        let (stats, registry) = (&self.settings.stats_table, &self.settings.registry_table);
        match self.schema_cache {
            Some(cache) => cache.get_or_introspect(self.store, stats, registry),
            None => crate::db::schema::introspect(self.store, stats, registry).map(Arc::new),
        }
    }

    fn advance(&mut self, next: Stage) {
        tracing::debug!(from = ?self.stage, to = ?next, "Stats lookup stage");
        self.stage = next;
    }
}

fn log_failure(err: &Error, identifier: &str) {
    match err {
        Error::Config(message) => {
            tracing::error!(identifier, %message, "Stats lookup misconfigured")
        }
        Error::Transient { detail } => {
            tracing::error!(identifier, %detail, "Stats lookup failed on database access")
        }
        other => tracing::info!(identifier, kind = %other.kind(), "Stats lookup rejected: {}", other),
    }
}

/// Run one lookup without a schema cache.
pub fn resolve_stats<S: StatsStore + ?Sized>(
    store: &S,
    settings: &StatsSettings,
    identifier: &str,
    scope: Option<i64>,
) -> Result<Report> {
    StatsLookup::new(store, settings).run(identifier, scope)
}
