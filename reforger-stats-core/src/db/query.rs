//! Stats query construction.
//!
//! Queries reference only columns present in a [`SchemaDescriptor`], all of
//! which come from the compile-time catalog. Player UIDs and server ids are
//! always bound parameters.

use super::catalog::{quote_ident, StatColumn, PLAYER_UID, SERVERS_ALIAS, SERVER_ID};
use super::schema::SchemaDescriptor;
use crate::types::ServerScope;

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParam {
    Text(String),
    Integer(i64),
}

impl rusqlite::ToSql for QueryParam {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        match self {
            QueryParam::Text(s) => s.to_sql(),
            QueryParam::Integer(i) => i.to_sql(),
        }
    }
}

/// Shape of a stats query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    /// Rows for one player on one server, no aggregation
    SingleServer(ServerScope),
    /// One row per player across all servers
    Aggregate {
        /// Whether the distinct server ids are selected as the last column
        collect_servers: bool,
    },
}

/// A ready-to-run stats query.
///
/// Result columns are, in order: `playerUID`, each of `columns`, then the
/// server list if the shape collects servers.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsQuery {
    pub sql: String,
    pub params: Vec<QueryParam>,
    pub columns: Vec<StatColumn>,
    pub shape: QueryShape,
}

impl StatsQuery {
    /// Build the stats query for `player_uid`.
    ///
    /// A scope only narrows the query when the table is partitioned by server;
    /// otherwise every row of the player is aggregated.
    pub fn build(
        player_uid: &str,
        scope: Option<ServerScope>,
        schema: &SchemaDescriptor,
    ) -> Self {
        let columns: Vec<StatColumn> = schema.columns().collect();
        let uid = quote_ident(PLAYER_UID);
        let table = schema.table().quoted();

        match scope.filter(|_| schema.has_server_partition()) {
            Some(server) => {
                let mut select = vec![uid.clone()];
                select.extend(columns.iter().map(|c| quote_ident(c.name)));

                let sql = format!(
                    "SELECT {} FROM {} WHERE {} = ?1 COLLATE NOCASE AND {} = ?2",
                    select.join(", "),
                    table,
                    uid,
                    quote_ident(SERVER_ID)
                );

                Self {
                    sql,
                    params: vec![
                        QueryParam::Text(player_uid.to_string()),
                        QueryParam::Integer(i64::from(server.get())),
                    ],
                    columns,
                    shape: QueryShape::SingleServer(server),
                }
            }
            None => {
                if let Some(server) = scope {
                    tracing::warn!(
                        table = %schema.table(),
                        server = server.get(),
                        "Stats table has no server_id column; ignoring server scope"
                    );
                }

                let collect_servers = schema.has_server_partition();
                let mut select = vec![uid.clone()];
                select.extend(columns.iter().map(|c| {
                    let name = quote_ident(c.name);
                    format!("{}({}) AS {}", c.reduction.sql_function(), name, name)
                }));
                if collect_servers {
                    select.push(format!(
                        "GROUP_CONCAT(DISTINCT {}) AS {}",
                        quote_ident(SERVER_ID),
                        quote_ident(SERVERS_ALIAS)
                    ));
                }

                let sql = format!(
                    "SELECT {} FROM {} WHERE {} = ?1 COLLATE NOCASE GROUP BY {}",
                    select.join(", "),
                    table,
                    uid,
                    uid
                );

                Self {
                    sql,
                    params: vec![QueryParam::Text(player_uid.to_string())],
                    columns,
                    shape: QueryShape::Aggregate { collect_servers },
                }
            }
        }
    }

    /// Server scope actually applied by this query.
    pub fn scope(&self) -> Option<ServerScope> {
        match self.shape {
            QueryShape::SingleServer(server) => Some(server),
            QueryShape::Aggregate { .. } => None,
        }
    }

    /// Whether the last result column is the distinct server list.
    pub fn collects_servers(&self) -> bool {
        matches!(
            self.shape,
            QueryShape::Aggregate {
                collect_servers: true
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::catalog::columns;
    use crate::test_support::table;

    const UID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

    fn schema(names: &[&str]) -> SchemaDescriptor {
        let mut all = vec!["playerUID"];
        all.extend_from_slice(names);
        SchemaDescriptor::from_columns(table("reforger_stats"), all).unwrap()
    }

    fn scope(n: i64) -> Option<ServerScope> {
        ServerScope::validate(Some(n), 4).unwrap()
    }

    #[test]
    fn test_single_server_query() {
        let schema = schema(&["kills", "level", "server_id"]);
        let query = StatsQuery::build(UID, scope(2), &schema);

        assert_eq!(
            query.sql,
            "SELECT \"playerUID\", \"level\", \"kills\" FROM \"reforger_stats\" \
             WHERE \"playerUID\" = ?1 COLLATE NOCASE AND \"server_id\" = ?2"
        );
        assert_eq!(
            query.params,
            vec![QueryParam::Text(UID.to_string()), QueryParam::Integer(2)]
        );
        assert_eq!(query.scope().map(|s| s.get()), Some(2));
        assert!(!query.collects_servers());
    }

    #[test]
    fn test_aggregate_query_reductions() {
        let schema = schema(&["kills", "deaths", "level", "server_id"]);
        let query = StatsQuery::build(UID, None, &schema);

        assert!(query.sql.contains("MAX(\"level\") AS \"level\""));
        assert!(query.sql.contains("SUM(\"kills\") AS \"kills\""));
        assert!(query.sql.contains("SUM(\"deaths\") AS \"deaths\""));
        assert!(!query.sql.contains("SUM(\"level\")"));
        assert!(query
            .sql
            .contains("GROUP_CONCAT(DISTINCT \"server_id\") AS \"servers\""));
        assert!(query.sql.ends_with("GROUP BY \"playerUID\""));
        assert_eq!(query.params, vec![QueryParam::Text(UID.to_string())]);
        assert!(query.collects_servers());
        assert_eq!(query.columns, vec![columns::LEVEL, columns::KILLS, columns::DEATHS]);
    }

    #[test]
    fn test_scope_without_partition_aggregates() {
        let schema = schema(&["kills"]);
        let query = StatsQuery::build(UID, scope(1), &schema);

        assert_eq!(
            query.shape,
            QueryShape::Aggregate {
                collect_servers: false
            }
        );
        assert!(!query.sql.contains("server_id"));
        assert_eq!(query.scope(), None);
    }

    #[test]
    fn test_only_present_columns_referenced() {
        let schema = schema(&["kills", "kick_streak"]);
        let query = StatsQuery::build(UID, None, &schema);

        assert!(query.sql.contains("\"kick_streak\""));
        assert!(!query.sql.contains("lightban_streak"));
        assert!(!query.sql.contains("deaths"));
    }

    #[test]
    fn test_uid_never_interpolated() {
        let hostile = "x' OR 1=1 --";
        let schema = schema(&["kills", "server_id"]);
        for query in [
            StatsQuery::build(hostile, None, &schema),
            StatsQuery::build(hostile, scope(3), &schema),
        ] {
            assert!(!query.sql.contains(hostile));
            assert_eq!(query.params[0], QueryParam::Text(hostile.to_string()));
        }
    }
}
