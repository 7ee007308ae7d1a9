//! Core domain types for reforger-stats
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Player UID** | Canonical player identifier, unique across all servers |
//! | **Registry** | The table mapping player UIDs to display names (`players`) |
//! | **Stats table** | Per-deployment table of gameplay counters, one row per player and server |
//! | **Server scope** | Optional restriction to one server's rows instead of the combined view |

use crate::db::catalog::StatColumn;
use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Display name used when a UID exists in the stats table but not in the registry.
pub const UNKNOWN_PLAYER_NAME: &str = "Unknown Player";

// ============================================
// Player identity
// ============================================

/// A resolved player, canonical across all servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerIdentity {
    /// Canonical player UID
    pub uid: String,
    /// Display name from the registry
    pub name: String,
}

impl PlayerIdentity {
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
        }
    }
}

// ============================================
// Server scope
// ============================================

/// A validated server number in `1..=servers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ServerScope(u32);

impl ServerScope {
    /// Validate a raw, caller-supplied server number against the configured server count.
    ///
    /// `None` means the combined cross-server view and is always valid.
    pub fn validate(raw: Option<i64>, servers: u32) -> Result<Option<Self>> {
        let Some(scope) = raw else {
            return Ok(None);
        };

        if scope < 1 || scope > i64::from(servers) {
            return Err(Error::InvalidScope { scope, servers });
        }

        // In range 1..=u32::MAX by the check above
        Ok(Some(Self(scope as u32)))
    }

    /// Server number as stored in the `server_id` column.
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ServerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================
// Stats records
// ============================================

/// One stats row, either per (player, server) or already aggregated per player.
///
/// Only columns confirmed by the schema descriptor are present in `values`.
/// A present column whose value was NULL reads as `0`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatsRecord {
    /// Player UID as stored in the stats table
    pub player_uid: String,
    /// Counter values keyed by catalog column
    pub values: BTreeMap<StatColumn, f64>,
    /// Comma-separated distinct server ids, when the query collected them
    pub servers: Option<String>,
}

impl StatsRecord {
    pub fn new(player_uid: impl Into<String>) -> Self {
        Self {
            player_uid: player_uid.into(),
            ..Default::default()
        }
    }

    /// Builder-style setter, mostly for tests and fixtures.
    pub fn with(mut self, column: StatColumn, value: f64) -> Self {
        self.values.insert(column, value);
        self
    }

    /// Raw value, or `None` if the column is absent from this deployment.
    pub fn get(&self, column: StatColumn) -> Option<f64> {
        self.values.get(&column).copied()
    }

    /// Raw value; absent columns count as zero.
    pub fn value(&self, column: StatColumn) -> f64 {
        self.get(column).unwrap_or(0.0)
    }

    /// Integral counter value; absent columns count as zero.
    pub fn count(&self, column: StatColumn) -> i64 {
        self.get(column).map(|v| v.round() as i64).unwrap_or(0)
    }

    /// Integral counter value, or `None` if the column is absent.
    pub fn count_opt(&self, column: StatColumn) -> Option<i64> {
        self.get(column).map(|v| v.round() as i64)
    }

    /// Whether `column` is present
    pub fn has(&self, column: StatColumn) -> bool {
        self.values.contains_key(&column)
    }
}
