//! Stats aggregation and derived metrics.
//!
//! Per-server rows are combined with each column's [`Reduction`]: counters
//! are summed and `level` keeps its peak. Derived metrics (K/D, kilometers,
//! combined medical counters, moderation visibility) are computed from the
//! aggregated record without mutating it.
//!
//! [`Reduction`]: crate::db::catalog::Reduction

use crate::db::catalog::columns;
use crate::format::{format_hundredths, meters_to_km_hundredths, round_hundredths};
use crate::types::StatsRecord;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// Combine rows for one player into a single record.
///
/// Returns `None` for an empty input. Columns missing from some rows are
/// taken from the rows that have them; server lists are concatenated.
pub fn reduce(records: impl IntoIterator<Item = StatsRecord>) -> Option<StatsRecord> {
    let mut records = records.into_iter();
    let mut merged = records.next()?;

    for record in records {
        for (column, value) in record.values {
            merged
                .values
                .entry(column)
                .and_modify(|current| *current = column.reduction.combine(*current, value))
                .or_insert(value);
        }
        merged.servers = match (merged.servers.take(), record.servers) {
            (Some(a), Some(b)) => Some(format!("{a},{b}")),
            (a, b) => a.or(b),
        };
    }

    Some(merged)
}

/// Kill/death ratio as presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdRatio {
    /// kills / deaths in hundredths, when deaths > 0
    Ratio(i64),
    /// Raw kill count, when the player never died
    Kills(i64),
}

impl KdRatio {
    pub fn new(kills: i64, deaths: i64) -> Self {
        if deaths > 0 {
            KdRatio::Ratio(round_hundredths(kills as f64 / deaths as f64))
        } else {
            KdRatio::Kills(kills)
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            KdRatio::Ratio(hundredths) => *hundredths as f64 / 100.0,
            KdRatio::Kills(kills) => *kills as f64,
        }
    }
}

impl fmt::Display for KdRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KdRatio::Ratio(hundredths) => f.write_str(&format_hundredths(*hundredths)),
            KdRatio::Kills(kills) => write!(f, "{kills}"),
        }
    }
}

impl Serialize for KdRatio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A distance in kilometers, rounded to hundredths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Kilometers(i64);

impl Kilometers {
    pub fn from_meters(meters: f64) -> Self {
        Self(meters_to_km_hundredths(meters))
    }

    pub fn hundredths(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Kilometers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_hundredths(self.0))
    }
}

impl Serialize for Kilometers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Moderation history; each count is present only when greater than zero.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Moderation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kicks: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_bans: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heavy_bans: Option<i64>,
}

impl Moderation {
    /// Moderation history of `record`, or `None` if it has none to show.
    ///
    /// Ban streak columns are optional; an absent column counts as no history.
    pub fn from_record(record: &StatsRecord) -> Option<Self> {
        let positive = |v: i64| (v > 0).then_some(v);
        let moderation = Self {
            kicks: positive(record.count(columns::KICK_STREAK)),
            light_bans: record.count_opt(columns::LIGHTBAN_STREAK).and_then(positive),
            heavy_bans: record.count_opt(columns::HEAVYBAN_STREAK).and_then(positive),
        };

        if moderation == Self::default() {
            None
        } else {
            Some(moderation)
        }
    }
}

/// Split a distinct-collected server list into ordered, unique entries.
///
/// Numeric ids sort numerically and before anything else.
pub fn server_list(raw: &str) -> Vec<String> {
    let unique: BTreeSet<(u8, u64, String)> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<u64>() {
            Ok(n) => (0, n, n.to_string()),
            Err(_) => (1, 0, s.to_string()),
        })
        .collect();

    unique.into_iter().map(|(_, _, s)| s).collect()
}

/// Metrics computed from an aggregated record.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedMetrics {
    pub kd_ratio: KdRatio,
    pub distance_walked: Kilometers,
    pub distance_driven: Kilometers,
    pub distance_as_occupant: Kilometers,
    pub bandages: i64,
    pub tourniquets: i64,
    pub saline: i64,
    pub morphine: i64,
    pub moderation: Option<Moderation>,
    /// Contributing servers, when the record carries a collected list
    pub servers: Vec<String>,
}

impl DerivedMetrics {
    pub fn from_record(record: &StatsRecord) -> Self {
        let pair = |a, b| record.count(a) + record.count(b);
        let km = |c| Kilometers::from_meters(record.get(c).unwrap_or(0.0));

        Self {
            kd_ratio: KdRatio::new(record.count(columns::KILLS), record.count(columns::DEATHS)),
            distance_walked: km(columns::DISTANCE_WALKED),
            distance_driven: km(columns::DISTANCE_DRIVEN),
            distance_as_occupant: km(columns::DISTANCE_AS_OCCUPANT),
            bandages: pair(columns::BANDAGE_SELF, columns::BANDAGE_FRIENDLIES),
            tourniquets: pair(columns::TOURNIQUET_SELF, columns::TOURNIQUET_FRIENDLIES),
            saline: pair(columns::SALINE_SELF, columns::SALINE_FRIENDLIES),
            morphine: pair(columns::MORPHINE_SELF, columns::MORPHINE_FRIENDLIES),
            moderation: Moderation::from_record(record),
            servers: record.servers.as_deref().map(server_list).unwrap_or_default(),
        }
    }
}
