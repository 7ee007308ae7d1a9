//! Presentation-neutral player stats report.
//!
//! [`Report::render`] is a pure function of the resolved identity, the
//! aggregated record and its derived metrics; presenters (chat embeds, the
//! CLI) format the result however they like.

use crate::aggregate::{DerivedMetrics, KdRatio, Kilometers, Moderation};
use crate::db::catalog::columns;
use crate::types::{PlayerIdentity, ServerScope, StatsRecord};
use serde::Serialize;

/// Which servers a report covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerDisplay {
    /// Stats of a single server
    Single(ServerScope),
    /// Combined stats of the listed servers
    Combined(Vec<String>),
}

/// Level and playtime; each field is present only if its column exists.
///
/// Experience and playtime are reported as stored, fractions included.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Progression {
    pub level: Option<i64>,
    pub level_experience: Option<f64>,
    pub session_duration: Option<f64>,
}

/// Role points are reported as stored; the other counters are whole numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Infantry {
    pub points: f64,
    pub kills: i64,
    pub deaths: i64,
    pub kd_ratio: KdRatio,
    pub ai_kills: i64,
    pub shots: i64,
    pub grenades_thrown: i64,
    pub distance_walked_km: Kilometers,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Logistics {
    pub points: f64,
    pub roadkills: i64,
    pub ai_roadkills: i64,
    pub distance_driven_km: Kilometers,
    pub distance_as_passenger_km: Kilometers,
}

/// Medical aid applied, self and teammates combined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Medical {
    pub points: f64,
    pub bandages: i64,
    pub tourniquets: i64,
    pub saline: i64,
    pub morphine: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warcrimes {
    pub warcrime_value: i64,
    pub teamkills: i64,
    pub ai_teamkills: i64,
    pub friendly_roadkills: i64,
    pub friendly_ai_roadkills: i64,
}

/// A player's stats, grouped by category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub player: PlayerIdentity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<ServerDisplay>,
    pub progression: Progression,
    pub infantry: Infantry,
    pub logistics: Logistics,
    pub medical: Medical,
    pub warcrimes: Warcrimes,
    /// Present only when the player has any kick or ban history
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderation: Option<Moderation>,
}

impl Report {
    /// Build a report. `scope` is the server the record was restricted to, if any.
    pub fn render(
        player: PlayerIdentity,
        record: &StatsRecord,
        derived: DerivedMetrics,
        scope: Option<ServerScope>,
    ) -> Self {
        let servers = match scope {
            Some(server) => Some(ServerDisplay::Single(server)),
            None if !derived.servers.is_empty() => {
                Some(ServerDisplay::Combined(derived.servers))
            }
            None => None,
        };

        Self {
            player,
            servers,
            progression: Progression {
                level: record.count_opt(columns::LEVEL),
                level_experience: record.get(columns::LEVEL_EXPERIENCE),
                session_duration: record.get(columns::SESSION_DURATION),
            },
            infantry: Infantry {
                points: record.value(columns::SPPOINTS0),
                kills: record.count(columns::KILLS),
                deaths: record.count(columns::DEATHS),
                kd_ratio: derived.kd_ratio,
                ai_kills: record.count(columns::AI_KILLS),
                shots: record.count(columns::SHOTS),
                grenades_thrown: record.count(columns::GRENADES_THROWN),
                distance_walked_km: derived.distance_walked,
            },
            logistics: Logistics {
                points: record.value(columns::SPPOINTS1),
                roadkills: record.count(columns::ROADKILLS),
                ai_roadkills: record.count(columns::AI_ROADKILLS),
                distance_driven_km: derived.distance_driven,
                distance_as_passenger_km: derived.distance_as_occupant,
            },
            medical: Medical {
                points: record.value(columns::SPPOINTS2),
                bandages: derived.bandages,
                tourniquets: derived.tourniquets,
                saline: derived.saline,
                morphine: derived.morphine,
            },
            warcrimes: Warcrimes {
                warcrime_value: record.count(columns::WARCRIME_HARMING_FRIENDLIES),
                teamkills: record.count(columns::FRIENDLY_KILLS),
                ai_teamkills: record.count(columns::FRIENDLY_AI_KILLS),
                friendly_roadkills: record.count(columns::FRIENDLY_ROADKILLS),
                friendly_ai_roadkills: record.count(columns::FRIENDLY_AI_ROADKILLS),
            },
            moderation: derived.moderation,
        }
    }
}
