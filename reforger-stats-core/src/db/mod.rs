//! Database layer for reforger-stats
//!
//! This module provides read-only access to a game server's stats database:
//! - A fixed column allow-list ([`catalog`])
//! - Schema introspection and caching ([`schema`])
//! - Stats query construction ([`query`])
//! - The SQLite-backed [`Database`] ([`repo`])
//!
//! Lookup stages talk to storage only through [`StatsStore`], so each stage
//! can be tested against fixtures or a counting wrapper.

pub mod catalog;
pub mod query;
pub mod repo;
pub mod schema;

pub use catalog::{StatColumn, TableName, CATALOG};
pub use query::{QueryParam, QueryShape, StatsQuery};
pub use repo::Database;
pub use schema::{SchemaCache, SchemaDescriptor};

use crate::error::Result;
use crate::types::{PlayerIdentity, ServerScope, StatsRecord};

/// Column names of a stats table and its registry, in declaration order.
///
/// A table that does not exist has no columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableColumns {
    pub stats: Vec<String>,
    pub registry: Vec<String>,
}

/// Read-only storage operations used by a stats lookup.
///
/// Each method is one round-trip to the database.
pub trait StatsStore {
    /// Column names of the stats and registry tables, in one round-trip
    fn table_columns(&self, stats: &TableName, registry: &TableName) -> Result<TableColumns>;

    /// Whether `uid` has stats rows (on `server`, if given) or a registry entry
    fn player_exists(
        &self,
        stats: &TableName,
        registry: &TableName,
        uid: &str,
        server: Option<ServerScope>,
    ) -> Result<bool>;

    /// Registry entry for `uid`, if any
    fn find_player(&self, registry: &TableName, uid: &str) -> Result<Option<PlayerIdentity>>;

    /// Registry entries whose name contains `fragment`, case-insensitively, in table order
    fn search_players(&self, registry: &TableName, fragment: &str)
        -> Result<Vec<PlayerIdentity>>;

    /// Run a stats query
    fn fetch_stats(&self, query: &StatsQuery) -> Result<Vec<StatsRecord>>;
}
