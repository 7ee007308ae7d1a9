//! SQLite-backed stats store
//!
//! Opens the game server's stats database read-only and implements
//! [`StatsStore`] on top of it.

use super::catalog::{quote_ident, TableName, PLAYER_NAME, PLAYER_UID, SERVER_ID};
use super::query::{QueryParam, StatsQuery};
use super::{StatsStore, TableColumns};
use crate::error::{Error, Result};
use crate::types::{PlayerIdentity, ServerScope, StatsRecord, UNKNOWN_PLAYER_NAME};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection, OpenFlags, OptionalExtension};
use std::path::Path;
use std::time::Duration;

/// Name of the SQL function that lowercases text with Unicode case folding.
const UNICODE_LOWER: &str = "unicode_lower";

/// Database handle (a small pool of read-only connections)
///
/// The handle is an explicit dependency: open it at service start, pass it
/// to the service, and [`close`](Database::close) it at shutdown. Each
/// lookup checks out its own connection, so a lookup stuck on a lock does
/// not hold up the others.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open an existing stats database read-only with up to `pool_size` connections.
    ///
    /// `busy_timeout` bounds how long a query waits on a writer's lock
    /// (the game server keeps writing while we read), and how long a lookup
    /// waits for a free connection.
    pub fn open(path: &Path, busy_timeout: Duration, pool_size: u32) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "stats database not found at {}",
                path.display()
            )));
        }
        if pool_size == 0 {
            return Err(Error::Config(
                "database.pool_size must be at least 1".to_string(),
            ));
        }
        if busy_timeout.is_zero() {
            return Err(Error::Config(
                "database busy timeout must be greater than 0".to_string(),
            ));
        }

        let manager = SqliteConnectionManager::file(path)
            .with_flags(
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX
                    | OpenFlags::SQLITE_OPEN_URI,
            )
            .with_init(move |conn| {
                conn.busy_timeout(busy_timeout)?;
                conn.pragma_update(None, "query_only", true)?;
                register_functions(conn)
            });

        let pool = Pool::builder()
            .max_size(pool_size)
            .connection_timeout(busy_timeout)
            .build(manager)
            .map_err(|e| {
                Error::Config(format!(
                    "failed to open stats database at {}: {}",
                    path.display(),
                    e
                ))
            })?;

        tracing::info!(path = %path.display(), pool_size, "Opened stats database");

        Ok(Self { pool })
    }

    /// Open a writable in-memory database (for testing)
    ///
    /// Every in-memory connection is its own database, so the pool holds
    /// exactly one connection and never recycles it.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| register_functions(conn));
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;
        Ok(Self { pool })
    }

    /// Check out a connection (for fixtures and advanced use)
    pub fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Close every pooled connection.
    pub fn close(self) -> Result<()> {
        let state = self.pool.state();
        drop(self.pool);
        tracing::info!(connections = state.connections, "Closed stats database");
        Ok(())
    }
}

fn register_functions(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        UNICODE_LOWER,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        unicode_lower,
    )
}

/// `unicode_lower(text)`: full Unicode lowercase; SQLite's own `lower` and
/// `LIKE` only fold ASCII.
fn unicode_lower(ctx: &Context<'_>) -> rusqlite::Result<Option<String>> {
    Ok(match ctx.get_raw(0) {
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).to_lowercase()),
        _ => None,
    })
}

/// Read a counter value. NULL counts as zero; counters are never negative.
fn read_number(value: ValueRef<'_>) -> f64 {
    let number = match value {
        ValueRef::Null | ValueRef::Blob(_) => 0.0,
        ValueRef::Integer(i) => i as f64,
        ValueRef::Real(r) => r,
        ValueRef::Text(t) => std::str::from_utf8(t)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0.0),
    };
    number.max(0.0)
}

fn read_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(r) => Some(r.to_string()),
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
    }
}

fn row_to_identity(row: &rusqlite::Row<'_>) -> rusqlite::Result<PlayerIdentity> {
    let uid = read_text(row.get_ref(0)?).unwrap_or_default();
    let name: Option<String> = row.get(1)?;
    Ok(PlayerIdentity {
        uid,
        name: name.unwrap_or_else(|| UNKNOWN_PLAYER_NAME.to_string()),
    })
}

impl StatsStore for Database {
    fn table_columns(&self, stats: &TableName, registry: &TableName) -> Result<TableColumns> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT 0 AS tbl, cid, name FROM pragma_table_info(?1) \
             UNION ALL \
             SELECT 1 AS tbl, cid, name FROM pragma_table_info(?2) \
             ORDER BY tbl, cid",
        )?;
        let mut rows = stmt.query([stats.as_str(), registry.as_str()])?;

        let mut columns = TableColumns::default();
        while let Some(row) = rows.next()? {
            let tbl: i64 = row.get(0)?;
            let name: String = row.get(2)?;
            if tbl == 0 {
                columns.stats.push(name);
            } else {
                columns.registry.push(name);
            }
        }
        Ok(columns)
    }

    fn player_exists(
        &self,
        stats: &TableName,
        registry: &TableName,
        uid: &str,
        server: Option<ServerScope>,
    ) -> Result<bool> {
        let uid_col = quote_ident(PLAYER_UID);
        let mut params = vec![QueryParam::Text(uid.to_string())];
        let server_filter = match server {
            Some(server) => {
                params.push(QueryParam::Integer(i64::from(server.get())));
                format!(" AND {} = ?2", quote_ident(SERVER_ID))
            }
            None => String::new(),
        };

        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {stats} WHERE {uid_col} = ?1 COLLATE NOCASE{server_filter}) \
             OR EXISTS (SELECT 1 FROM {registry} WHERE {uid_col} = ?1 COLLATE NOCASE)",
            stats = stats.quoted(),
            registry = registry.quoted(),
        );

        let conn = self.connection()?;
        let exists: bool = conn.query_row(&sql, params_from_iter(params.iter()), |r| r.get(0))?;
        Ok(exists)
    }

    fn find_player(&self, registry: &TableName, uid: &str) -> Result<Option<PlayerIdentity>> {
        let sql = format!(
            "SELECT {uid_col}, {name_col} FROM {registry} WHERE {uid_col} = ?1 COLLATE NOCASE LIMIT 1",
            uid_col = quote_ident(PLAYER_UID),
            name_col = quote_ident(PLAYER_NAME),
            registry = registry.quoted(),
        );

        let conn = self.connection()?;
        let player = conn
            .query_row(&sql, [uid], row_to_identity)
            .optional()?;
        Ok(player)
    }

    fn search_players(
        &self,
        registry: &TableName,
        fragment: &str,
    ) -> Result<Vec<PlayerIdentity>> {
        let sql = format!(
            "SELECT {uid_col}, {name_col} FROM {registry} \
             WHERE instr({lower}({name_col}), ?1) > 0",
            uid_col = quote_ident(PLAYER_UID),
            name_col = quote_ident(PLAYER_NAME),
            registry = registry.quoted(),
            lower = UNICODE_LOWER,
        );

        let conn = self.connection()?;
        let mut stmt = conn.prepare(&sql)?;
        let players = stmt
            .query_map([fragment.to_lowercase()], row_to_identity)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(players)
    }

    fn fetch_stats(&self, query: &StatsQuery) -> Result<Vec<StatsRecord>> {
        tracing::trace!(sql = %query.sql, "Fetching stats");

        let conn = self.connection()?;
        let mut stmt = conn.prepare(&query.sql)?;
        let records = stmt
            .query_map(params_from_iter(query.params.iter()), |row| {
                let mut record =
                    StatsRecord::new(read_text(row.get_ref(0)?).unwrap_or_default());
                for (i, column) in query.columns.iter().enumerate() {
                    record.values.insert(*column, read_number(row.get_ref(i + 1)?));
                }
                if query.collects_servers() {
                    record.servers = read_text(row.get_ref(query.columns.len() + 1)?);
                }
                Ok(record)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::catalog::columns;
    use crate::db::schema::introspect;
    use crate::test_support::{add_player, add_stats, fixture_db, full_stats_columns, table};

    const UID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

    fn scope(n: i64) -> Option<ServerScope> {
        ServerScope::validate(Some(n), 4).unwrap()
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let db = fixture_db(&["kills"]);
        add_player(&db, "u1", "John Smith");
        add_player(&db, "u2", "SMITHERS");
        add_player(&db, "u3", "Jones");
        add_player(&db, "u4", "Ölaf Ström");

        let found = db.search_players(&table("players"), "smith").unwrap();
        let names: Vec<_> = found.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["John Smith", "SMITHERS"]);

        // Case folding is not limited to ASCII letters
        for fragment in ["ölaf", "STRÖM", "Ölaf", "laf"] {
            let found = db.search_players(&table("players"), fragment).unwrap();
            assert_eq!(found.len(), 1, "{fragment:?}");
            assert_eq!(found[0].uid, "u4");
        }
    }

    #[test]
    fn test_search_wildcards_match_literally() {
        let db = fixture_db(&["kills"]);
        add_player(&db, "u1", "a_b");
        add_player(&db, "u2", "axb");
        add_player(&db, "u3", "100%");

        let underscore = db.search_players(&table("players"), "_").unwrap();
        assert_eq!(underscore.len(), 1);
        assert_eq!(underscore[0].uid, "u1");

        let percent = db.search_players(&table("players"), "%").unwrap();
        assert_eq!(percent.len(), 1);
        assert_eq!(percent[0].uid, "u3");
    }

    #[test]
    fn test_search_skips_null_names() {
        let db = fixture_db(&["kills"]);
        db.connection()
            .unwrap()
            .execute("INSERT INTO players (playerUID, playerName) VALUES ('u1', NULL)", [])
            .unwrap();

        assert!(db.search_players(&table("players"), "u").unwrap().is_empty());
    }

    #[test]
    fn test_table_columns_in_one_call() {
        let db = fixture_db(&["kills", "deaths"]);

        let columns = db
            .table_columns(&table("reforger_stats"), &table("players"))
            .unwrap();
        assert_eq!(columns.stats, vec!["playerUID", "kills", "deaths"]);
        assert_eq!(columns.registry, vec!["playerUID", "playerName"]);

        let missing = db
            .table_columns(&table("absent"), &table("players"))
            .unwrap();
        assert!(missing.stats.is_empty());
        assert_eq!(missing.registry.len(), 2);
    }

    #[test]
    fn test_player_exists_scoped() {
        let db = fixture_db(&full_stats_columns());
        add_stats(&db, UID, Some(1), &[("kills", 2.0)]);
        let (stats, registry) = (table("reforger_stats"), table("players"));

        assert!(db.player_exists(&stats, &registry, UID, None).unwrap());
        assert!(db.player_exists(&stats, &registry, UID, scope(1)).unwrap());
        assert!(!db.player_exists(&stats, &registry, UID, scope(2)).unwrap());

        // Registry entries satisfy the check regardless of scope
        add_player(&db, UID, "Medic");
        assert!(db.player_exists(&stats, &registry, UID, scope(2)).unwrap());
        assert!(db
            .player_exists(&stats, &registry, &UID.to_uppercase(), None)
            .unwrap());
    }

    #[test]
    fn test_find_player_null_name() {
        let db = fixture_db(&["kills"]);
        db.connection()
            .unwrap()
            .execute(
                "INSERT INTO players (playerUID, playerName) VALUES (?1, NULL)",
                [UID],
            )
            .unwrap();

        let player = db.find_player(&table("players"), UID).unwrap().unwrap();
        assert_eq!(player.name, UNKNOWN_PLAYER_NAME);
        assert!(db.find_player(&table("players"), "nobody").unwrap().is_none());
    }

    #[test]
    fn test_fetch_aggregate_sums_and_max() {
        let db = fixture_db(&full_stats_columns());
        add_stats(
            &db,
            UID,
            Some(1),
            &[("kills", 3.0), ("deaths", 1.0), ("level", 10.0)],
        );
        add_stats(
            &db,
            UID,
            Some(2),
            &[("kills", 5.0), ("deaths", 0.0), ("level", 15.0)],
        );
        let schema = introspect(&db, &table("reforger_stats"), &table("players")).unwrap();

        let query = StatsQuery::build(UID, None, &schema);
        let records = db.fetch_stats(&query).unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.count(columns::KILLS), 8);
        assert_eq!(record.count(columns::DEATHS), 1);
        assert_eq!(record.count(columns::LEVEL), 15);
        // Present but never written
        assert_eq!(record.get(columns::HEAVYBAN_STREAK), Some(0.0));

        let mut servers: Vec<_> = record
            .servers
            .as_deref()
            .unwrap()
            .split(',')
            .map(str::to_string)
            .collect();
        servers.sort();
        assert_eq!(servers, vec!["1", "2"]);
    }

    #[test]
    fn test_fetch_single_server() {
        let db = fixture_db(&full_stats_columns());
        add_stats(&db, UID, Some(1), &[("kills", 3.0)]);
        add_stats(&db, UID, Some(2), &[("kills", 5.0)]);
        let schema = introspect(&db, &table("reforger_stats"), &table("players")).unwrap();

        let records = db
            .fetch_stats(&StatsQuery::build(UID, scope(2), &schema))
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].count(columns::KILLS), 5);
        assert_eq!(records[0].servers, None);

        let none = db
            .fetch_stats(&StatsQuery::build(UID, scope(3), &schema))
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_open_missing_file_is_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = Database::open(&dir.path().join("nope.db"), Duration::from_secs(1), 2)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    fn file_db(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("stats.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE players (playerUID TEXT, playerName TEXT);")
            .unwrap();
        path
    }

    #[test]
    fn test_open_rejects_empty_pool() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = file_db(&dir);
        let err = Database::open(&path, Duration::from_secs(1), 0).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_pool_serves_concurrent_connections() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = file_db(&dir);
        let db = Database::open(&path, Duration::from_millis(200), 2).unwrap();

        // A lookup holding one connection does not block another
        let held = db.connection().unwrap();
        let found = db.find_player(&table("players"), "nobody").unwrap();
        assert!(found.is_none());

        // Both connections busy: checkout gives up after the timeout
        let second = db.connection().unwrap();
        let err = db.find_player(&table("players"), "nobody").unwrap_err();
        assert!(matches!(err, Error::Transient { .. }));

        drop((held, second));
        db.close().unwrap();
    }

    #[test]
    fn test_open_read_only() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = file_db(&dir);

        let db = Database::open(&path, Duration::from_secs(1), 2).unwrap();
        let columns = db.table_columns(&table("absent"), &table("players")).unwrap();
        assert_eq!(columns.registry, vec!["playerUID", "playerName"]);
        let write = db
            .connection()
            .unwrap()
            .execute("INSERT INTO players VALUES ('a', 'b')", []);
        assert!(write.is_err());
        db.close().unwrap();
    }
}
