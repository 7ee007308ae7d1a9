//! Error types for reforger-stats-core
//!
//! Every failure of a stats lookup maps to exactly one [`Error`] variant.

use crate::types::PlayerIdentity;
use std::fmt;
use thiserror::Error;

/// Main error type for the reforger-stats-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Required table or column catalog missing, or invalid configuration.
    /// Fatal; the message is meant for the operator as-is.
    #[error("configuration error: {0}")]
    Config(String),

    /// Server scope outside `1..=servers`
    #[error(
        "invalid server ID {scope}: enter a server number between 1 and {servers}, \
         or leave it empty for combined stats"
    )]
    InvalidScope { scope: i64, servers: u32 },

    /// No matching identity, or no stats rows for the requested scope
    #[error("{}", not_found_message(.identifier, .server))]
    NotFound {
        identifier: String,
        server: Option<u32>,
    },

    /// More than one registry entry matched a name fragment
    #[error("found {} players matching \"{fragment}\"", .candidates.len() + .additional)]
    Ambiguous {
        fragment: String,
        /// At most [`crate::resolver::MAX_CANDIDATES`] entries, in discovery order
        candidates: Vec<PlayerIdentity>,
        /// Whether matches exist beyond `candidates`
        truncated: bool,
        /// Number of matches not listed in `candidates`
        additional: usize,
    },

    /// Database unreachable, busy, or timed out. The detail is logged, not shown.
    #[error("database temporarily unavailable")]
    Transient { detail: String },
}

fn not_found_message(identifier: &str, server: &Option<u32>) -> String {
    if identifier.is_empty() {
        return "no player given: enter a player UUID or part of a name".to_string();
    }
    match server {
        Some(server) => format!("no player or stats found for {identifier} on server {server}"),
        None => format!("no player or stats found for {identifier}"),
    }
}

impl Error {
    /// Build a [`Error::Transient`] from anything displayable.
    pub fn transient(detail: impl fmt::Display) -> Self {
        Error::Transient {
            detail: detail.to_string(),
        }
    }

    /// Returns the taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Configuration,
            Error::InvalidScope { .. } => ErrorKind::InvalidScope,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Ambiguous { .. } => ErrorKind::Ambiguous,
            Error::Transient { .. } => ErrorKind::Transient,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::transient(err)
    }
}

impl From<r2d2::Error> for Error {
    fn from(err: r2d2::Error) -> Self {
        Error::transient(err)
    }
}

/// Discriminant of [`Error`], used by the lookup state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    InvalidScope,
    NotFound,
    Ambiguous,
    Transient,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::InvalidScope => "invalid_scope",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Ambiguous => "ambiguous",
            ErrorKind::Transient => "transient",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for reforger-stats-core
pub type Result<T> = std::result::Result<T, Error>;
