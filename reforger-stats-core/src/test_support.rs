//! Fixtures shared by unit tests.

use crate::db::catalog::{quote_ident, TableName, CATALOG, SERVER_ID};
use crate::db::{Database, StatsQuery, StatsStore, TableColumns};
use crate::error::Result;
use crate::types::{PlayerIdentity, ServerScope, StatsRecord};
use rusqlite::types::Value;
use std::cell::Cell;

pub(crate) fn table(name: &str) -> TableName {
    TableName::new(name).unwrap()
}

/// Every catalog column plus `server_id`.
pub(crate) fn full_stats_columns() -> Vec<&'static str> {
    let mut names: Vec<_> = CATALOG.iter().map(|c| c.name).collect();
    names.push(SERVER_ID);
    names
}

/// In-memory database with a `players` registry and a `reforger_stats`
/// table carrying `playerUID` plus `columns`.
pub(crate) fn fixture_db(columns: &[&str]) -> Database {
    let db = Database::open_in_memory().unwrap();

    let mut defs = vec!["\"playerUID\" TEXT NOT NULL".to_string()];
    defs.extend(
        columns
            .iter()
            .map(|c| format!("{} INTEGER DEFAULT 0", quote_ident(c))),
    );

    db.connection()
        .unwrap()
        .execute_batch(&format!(
            "CREATE TABLE players (playerUID TEXT PRIMARY KEY, playerName TEXT);
             CREATE TABLE reforger_stats ({});",
            defs.join(", ")
        ))
        .unwrap();
    db
}

pub(crate) fn add_player(db: &Database, uid: &str, name: &str) {
    db.connection()
        .unwrap()
        .execute(
            "INSERT INTO players (playerUID, playerName) VALUES (?1, ?2)",
            [uid, name],
        )
        .unwrap();
}

pub(crate) fn add_stats(db: &Database, uid: &str, server: Option<i64>, values: &[(&str, f64)]) {
    let mut names = vec![quote_ident("playerUID")];
    let mut params = vec![Value::Text(uid.to_string())];
    if let Some(server) = server {
        names.push(quote_ident(SERVER_ID));
        params.push(Value::Integer(server));
    }
    for (name, value) in values {
        names.push(quote_ident(name));
        params.push(Value::Real(*value));
    }
    let placeholders: Vec<_> = (1..=params.len()).map(|i| format!("?{i}")).collect();

    db.connection()
        .unwrap()
        .execute(
            &format!(
                "INSERT INTO reforger_stats ({}) VALUES ({})",
                names.join(", "),
                placeholders.join(", ")
            ),
            rusqlite::params_from_iter(params),
        )
        .unwrap();
}

/// Store wrapper that counts round-trips.
pub(crate) struct CountingStore<'a> {
    inner: &'a Database,
    calls: Cell<usize>,
}

impl<'a> CountingStore<'a> {
    pub(crate) fn new(inner: &'a Database) -> Self {
        Self {
            inner,
            calls: Cell::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.get()
    }

    fn tick(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl StatsStore for CountingStore<'_> {
    fn table_columns(&self, stats: &TableName, registry: &TableName) -> Result<TableColumns> {
        self.tick();
        self.inner.table_columns(stats, registry)
    }

    fn player_exists(
        &self,
        stats: &TableName,
        registry: &TableName,
        uid: &str,
        server: Option<ServerScope>,
    ) -> Result<bool> {
        self.tick();
        self.inner.player_exists(stats, registry, uid, server)
    }

    fn find_player(&self, registry: &TableName, uid: &str) -> Result<Option<PlayerIdentity>> {
        self.tick();
        self.inner.find_player(registry, uid)
    }

    fn search_players(
        &self,
        registry: &TableName,
        fragment: &str,
    ) -> Result<Vec<PlayerIdentity>> {
        self.tick();
        self.inner.search_players(registry, fragment)
    }

    fn fetch_stats(&self, query: &StatsQuery) -> Result<Vec<StatsRecord>> {
        self.tick();
        self.inner.fetch_stats(query)
    }
}
