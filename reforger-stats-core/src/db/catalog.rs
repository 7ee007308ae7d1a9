//! Fixed column allow-list for stats and registry tables.
//!
//! Every identifier that ends up in generated SQL comes from this module:
//! either a [`StatColumn`] constant from [`CATALOG`], one of the key column
//! constants, or a [`TableName`] validated at configuration time.

use crate::error::{Error, Result};
use std::fmt;

/// Player UID column, shared by the stats and registry tables.
pub const PLAYER_UID: &str = "playerUID";

/// Display name column on the registry table.
pub const PLAYER_NAME: &str = "playerName";

/// Server partition column on the stats table.
pub const SERVER_ID: &str = "server_id";

/// Alias for the distinct-collected server list in aggregate queries.
pub const SERVERS_ALIAS: &str = "servers";

/// How values of a column combine across a player's per-server rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reduction {
    /// Cumulative counter
    Sum,
    /// Snapshot or peak value (`level`)
    Max,
}

impl Reduction {
    /// SQL aggregate function implementing this reduction.
    pub fn sql_function(&self) -> &'static str {
        match self {
            Reduction::Sum => "SUM",
            Reduction::Max => "MAX",
        }
    }

    /// Combine two values the same way the SQL aggregate would.
    pub fn combine(&self, a: f64, b: f64) -> f64 {
        match self {
            Reduction::Sum => a + b,
            Reduction::Max => a.max(b),
        }
    }
}

/// Whether a column is expected on every deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnTier {
    /// Part of the standard stats schema
    Core,
    /// Added by later schema versions (moderation streaks); may be absent
    Optional,
}

/// A catalog column of the stats table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatColumn {
    pub name: &'static str,
    pub reduction: Reduction,
    pub tier: ColumnTier,
}

impl StatColumn {
    const fn sum(name: &'static str) -> Self {
        Self {
            name,
            reduction: Reduction::Sum,
            tier: ColumnTier::Core,
        }
    }

    const fn optional(name: &'static str) -> Self {
        Self {
            name,
            reduction: Reduction::Sum,
            tier: ColumnTier::Optional,
        }
    }

    /// Look up a catalog column by name (ASCII case-insensitive, as SQLite treats identifiers).
    pub fn lookup(name: &str) -> Option<Self> {
        CATALOG
            .iter()
            .copied()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for StatColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Named catalog columns.
pub mod columns {
    use super::{ColumnTier, Reduction, StatColumn};

    pub const LEVEL: StatColumn = StatColumn {
        name: "level",
        reduction: Reduction::Max,
        tier: ColumnTier::Core,
    };
    pub const LEVEL_EXPERIENCE: StatColumn = StatColumn::sum("level_experience");
    pub const SESSION_DURATION: StatColumn = StatColumn::sum("session_duration");

    // Per-role score points: infantry, logistics, medical
    pub const SPPOINTS0: StatColumn = StatColumn::sum("sppointss0");
    pub const SPPOINTS1: StatColumn = StatColumn::sum("sppointss1");
    pub const SPPOINTS2: StatColumn = StatColumn::sum("sppointss2");

    pub const WARCRIMES: StatColumn = StatColumn::sum("warcrimes");
    pub const DISTANCE_WALKED: StatColumn = StatColumn::sum("distance_walked");
    pub const KILLS: StatColumn = StatColumn::sum("kills");
    pub const AI_KILLS: StatColumn = StatColumn::sum("ai_kills");
    pub const SHOTS: StatColumn = StatColumn::sum("shots");
    pub const GRENADES_THROWN: StatColumn = StatColumn::sum("grenades_thrown");
    pub const FRIENDLY_KILLS: StatColumn = StatColumn::sum("friendly_kills");
    pub const FRIENDLY_AI_KILLS: StatColumn = StatColumn::sum("friendly_ai_kills");
    pub const DEATHS: StatColumn = StatColumn::sum("deaths");
    pub const DISTANCE_DRIVEN: StatColumn = StatColumn::sum("distance_driven");
    pub const POINTS_AS_DRIVER: StatColumn = StatColumn::sum("points_as_driver_of_players");
    pub const PLAYERS_DIED_IN_VEHICLE: StatColumn = StatColumn::sum("players_died_in_vehicle");
    pub const ROADKILLS: StatColumn = StatColumn::sum("roadkills");
    pub const FRIENDLY_ROADKILLS: StatColumn = StatColumn::sum("friendly_roadkills");
    pub const AI_ROADKILLS: StatColumn = StatColumn::sum("ai_roadkills");
    pub const FRIENDLY_AI_ROADKILLS: StatColumn = StatColumn::sum("friendly_ai_roadkills");
    pub const DISTANCE_AS_OCCUPANT: StatColumn = StatColumn::sum("distance_as_occupant");

    pub const BANDAGE_SELF: StatColumn = StatColumn::sum("bandage_self");
    pub const BANDAGE_FRIENDLIES: StatColumn = StatColumn::sum("bandage_friendlies");
    pub const TOURNIQUET_SELF: StatColumn = StatColumn::sum("tourniquet_self");
    pub const TOURNIQUET_FRIENDLIES: StatColumn = StatColumn::sum("tourniquet_friendlies");
    pub const SALINE_SELF: StatColumn = StatColumn::sum("saline_self");
    pub const SALINE_FRIENDLIES: StatColumn = StatColumn::sum("saline_friendlies");
    pub const MORPHINE_SELF: StatColumn = StatColumn::sum("morphine_self");
    pub const MORPHINE_FRIENDLIES: StatColumn = StatColumn::sum("morphine_friendlies");

    pub const WARCRIME_HARMING_FRIENDLIES: StatColumn =
        StatColumn::sum("warcrime_harming_friendlies");
    pub const CRIME_ACCELERATION: StatColumn = StatColumn::sum("crime_acceleration");
    pub const KICK_SESSION_DURATION: StatColumn = StatColumn::sum("kick_session_duration");
    pub const KICK_STREAK: StatColumn = StatColumn::sum("kick_streak");

    pub const LIGHTBAN_SESSION_DURATION: StatColumn =
        StatColumn::optional("lightban_session_duration");
    pub const LIGHTBAN_STREAK: StatColumn = StatColumn::optional("lightban_streak");
    pub const HEAVYBAN_KICK_SESSION_DURATION: StatColumn =
        StatColumn::optional("heavyban_kick_session_duration");
    pub const HEAVYBAN_STREAK: StatColumn = StatColumn::optional("heavyban_streak");
}

/// Every counter column the stats table may carry, in select order.
pub const CATALOG: &[StatColumn] = &[
    columns::LEVEL,
    columns::LEVEL_EXPERIENCE,
    columns::SESSION_DURATION,
    columns::SPPOINTS0,
    columns::SPPOINTS1,
    columns::SPPOINTS2,
    columns::WARCRIMES,
    columns::DISTANCE_WALKED,
    columns::KILLS,
    columns::AI_KILLS,
    columns::SHOTS,
    columns::GRENADES_THROWN,
    columns::FRIENDLY_KILLS,
    columns::FRIENDLY_AI_KILLS,
    columns::DEATHS,
    columns::DISTANCE_DRIVEN,
    columns::POINTS_AS_DRIVER,
    columns::PLAYERS_DIED_IN_VEHICLE,
    columns::ROADKILLS,
    columns::FRIENDLY_ROADKILLS,
    columns::AI_ROADKILLS,
    columns::FRIENDLY_AI_ROADKILLS,
    columns::DISTANCE_AS_OCCUPANT,
    columns::BANDAGE_SELF,
    columns::BANDAGE_FRIENDLIES,
    columns::TOURNIQUET_SELF,
    columns::TOURNIQUET_FRIENDLIES,
    columns::SALINE_SELF,
    columns::SALINE_FRIENDLIES,
    columns::MORPHINE_SELF,
    columns::MORPHINE_FRIENDLIES,
    columns::WARCRIME_HARMING_FRIENDLIES,
    columns::CRIME_ACCELERATION,
    columns::KICK_SESSION_DURATION,
    columns::KICK_STREAK,
    columns::LIGHTBAN_SESSION_DURATION,
    columns::LIGHTBAN_STREAK,
    columns::HEAVYBAN_KICK_SESSION_DURATION,
    columns::HEAVYBAN_STREAK,
];

/// Quote an allow-listed identifier for SQL.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// A table name checked to be a plain SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    /// Accepts `[A-Za-z_][A-Za-z0-9_]*`.
    pub fn new(name: &str) -> Result<Self> {
        let mut chars = name.chars();
        let valid = match chars.next() {
            Some(first) => {
                (first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            None => false,
        };

        if !valid {
            return Err(Error::Config(format!(
                "invalid table name {:?}: expected letters, digits and underscores",
                name
            )));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Quoted form for use in SQL identifier positions.
    pub fn quoted(&self) -> String {
        quote_ident(&self.0)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
