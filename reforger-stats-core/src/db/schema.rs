//! Schema introspection for the stats and registry tables.
//!
//! Deployments run different versions of the stats schema: moderation streak
//! columns were added late, and single-server setups have no `server_id`.
//! [`introspect`] reads the catalog once and reports which allow-listed
//! columns actually exist.

use super::catalog::{ColumnTier, StatColumn, TableName, PLAYER_NAME, PLAYER_UID, SERVER_ID};
use super::StatsStore;
use crate::error::{Error, Result};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

/// Catalog columns confirmed present on a stats table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    table: TableName,
    columns: BTreeSet<StatColumn>,
    server_partition: bool,
}

impl SchemaDescriptor {
    /// Build a descriptor from the column names reported by the database.
    ///
    /// Names outside the catalog are ignored. Fails if the table has no
    /// `playerUID` column, since nothing can be looked up without it.
    pub fn from_columns<I, S>(table: TableName, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut columns = BTreeSet::new();
        let mut has_uid = false;
        let mut server_partition = false;

        for name in names {
            let name = name.as_ref();
            if name.eq_ignore_ascii_case(PLAYER_UID) {
                has_uid = true;
            } else if name.eq_ignore_ascii_case(SERVER_ID) {
                server_partition = true;
            } else if let Some(column) = StatColumn::lookup(name) {
                columns.insert(column);
            }
        }

        if !has_uid {
            return Err(Error::Config(format!(
                "stats table {} has no {} column",
                table, PLAYER_UID
            )));
        }

        Ok(Self {
            table,
            columns,
            server_partition,
        })
    }

    /// The stats table this descriptor describes
    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn contains(&self, column: StatColumn) -> bool {
        self.columns.contains(&column)
    }

    /// Present catalog columns, in catalog order.
    pub fn columns(&self) -> impl Iterator<Item = StatColumn> + '_ {
        super::catalog::CATALOG
            .iter()
            .copied()
            .filter(|c| self.columns.contains(c))
    }

    /// Whether rows are partitioned by `server_id`
    pub fn has_server_partition(&self) -> bool {
        self.server_partition
    }

    /// Catalog columns of `tier` this deployment lacks.
    pub fn missing(&self, tier: ColumnTier) -> Vec<&'static str> {
        super::catalog::CATALOG
            .iter()
            .filter(|c| c.tier == tier && !self.columns.contains(c))
            .map(|c| c.name)
            .collect()
    }
}

/// Verify the stats and registry tables and describe the stats table's columns.
///
/// Reads both tables' columns in a single round-trip; a table without
/// columns does not exist.
pub fn introspect<S: StatsStore + ?Sized>(
    store: &S,
    stats: &TableName,
    registry: &TableName,
) -> Result<SchemaDescriptor> {
    let catalog = store.table_columns(stats, registry)?;
    let stats_exists = !catalog.stats.is_empty();
    let registry_exists = !catalog.registry.is_empty();
    if !stats_exists || !registry_exists {
        return Err(Error::Config(format!(
            "required tables are missing in the database (stats table {}: {}, registry table {}: {})",
            stats,
            presence(stats_exists),
            registry,
            presence(registry_exists)
        )));
    }

    for required in [PLAYER_UID, PLAYER_NAME] {
        if !catalog
            .registry
            .iter()
            .any(|c| c.eq_ignore_ascii_case(required))
        {
            return Err(Error::Config(format!(
                "registry table {} has no {} column",
                registry, required
            )));
        }
    }

    let descriptor = SchemaDescriptor::from_columns(stats.clone(), &catalog.stats)?;

    let missing_core = descriptor.missing(ColumnTier::Core);
    if !missing_core.is_empty() {
        tracing::debug!(
            table = %stats,
            missing = ?missing_core,
            "Stats table lacks core columns; they will read as absent"
        );
    }
    tracing::info!(
        table = %stats,
        columns = descriptor.columns.len(),
        server_partition = descriptor.server_partition,
        "Introspected stats schema"
    );

    Ok(descriptor)
}

fn presence(exists: bool) -> &'static str {
    if exists {
        "present"
    } else {
        "missing"
    }
}

/// Per-table cache of schema descriptors.
///
/// Introspection runs outside the lock, so concurrent misses for the same
/// table each compute an identical descriptor and the last insert wins.
/// Readers only ever hold the lock for a map lookup.
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<(TableName, TableName), Arc<SchemaDescriptor>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached descriptor for `stats`, introspecting on a miss.
    ///
    /// Failures are not cached.
    pub fn get_or_introspect<S: StatsStore + ?Sized>(
        &self,
        store: &S,
        stats: &TableName,
        registry: &TableName,
    ) -> Result<Arc<SchemaDescriptor>> {
        let key = (stats.clone(), registry.clone());

        if let Some(hit) = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&key)
        {
            return Ok(Arc::clone(hit));
        }

        let descriptor = Arc::new(introspect(store, stats, registry)?);
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key, Arc::clone(&descriptor));

        Ok(descriptor)
    }

    /// Drop the cached descriptor for `stats`, e.g. after a schema migration.
    pub fn invalidate(&self, stats: &TableName) {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .retain(|(table, _), _| table != stats);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
