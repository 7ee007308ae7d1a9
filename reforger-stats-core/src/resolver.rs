//! Player identifier resolution.
//!
//! An identifier is either a player UID (canonical 8-4-4-4-12 hex UUID) or a
//! fragment of a player name. UIDs are checked for existence in the stats
//! table or the registry; fragments are searched in the registry and must
//! match exactly one player.

use crate::db::{SchemaDescriptor, StatsStore, TableName};
use crate::error::{Error, Result};
use crate::types::{PlayerIdentity, ServerScope, UNKNOWN_PLAYER_NAME};
use uuid::Uuid;

/// Maximum number of candidates reported for an ambiguous name.
pub const MAX_CANDIDATES: usize = 3;

/// Length of a hyphenated UUID (`8-4-4-4-12`).
const HYPHENATED_UUID_LEN: usize = 36;

/// How an identifier will be looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// A player UID
    Uid(String),
    /// A case-insensitive substring of a player name
    NameFragment(String),
}

impl Identifier {
    /// Classify raw input. Surrounding whitespace is ignored.
    ///
    /// Only the hyphenated form counts as a UID; braced, URN and simple
    /// (unhyphenated) forms are treated as name fragments.
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.len() == HYPHENATED_UUID_LEN && Uuid::parse_str(trimmed).is_ok() {
            Identifier::Uid(trimmed.to_string())
        } else {
            Identifier::NameFragment(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Identifier::Uid(s) | Identifier::NameFragment(s) => s,
        }
    }

    pub fn is_uid(&self) -> bool {
        matches!(self, Identifier::Uid(_))
    }
}

/// Resolves identifiers against the registry of one deployment.
pub struct IdentifierResolver<'a, S: StatsStore + ?Sized> {
    store: &'a S,
    registry: &'a TableName,
}

impl<'a, S: StatsStore + ?Sized> IdentifierResolver<'a, S> {
    pub fn new(store: &'a S, registry: &'a TableName) -> Self {
        Self { store, registry }
    }

    /// Resolve `identifier` to a single player.
    ///
    /// `scope` only narrows the UID existence check, and only when the stats
    /// table is partitioned by server.
    pub fn resolve(
        &self,
        identifier: &Identifier,
        schema: &SchemaDescriptor,
        scope: Option<ServerScope>,
    ) -> Result<PlayerIdentity> {
        match identifier {
            Identifier::Uid(uid) => self.resolve_uid(uid, schema, scope),
            Identifier::NameFragment(fragment) => self.resolve_name(fragment, scope),
        }
    }

    fn resolve_uid(
        &self,
        uid: &str,
        schema: &SchemaDescriptor,
        scope: Option<ServerScope>,
    ) -> Result<PlayerIdentity> {
        let server = scope.filter(|_| schema.has_server_partition());
        if !self
            .store
            .player_exists(schema.table(), self.registry, uid, server)?
        {
            return Err(Error::NotFound {
                identifier: uid.to_string(),
                server: scope.map(|s| s.get()),
            });
        }

        match self.store.find_player(self.registry, uid)? {
            Some(player) => Ok(player),
            None => {
                tracing::debug!(uid, "Player has stats but no registry entry");
                Ok(PlayerIdentity::new(uid, UNKNOWN_PLAYER_NAME))
            }
        }
    }

    fn resolve_name(&self, fragment: &str, scope: Option<ServerScope>) -> Result<PlayerIdentity> {
        // An empty fragment would match every player
        if fragment.is_empty() {
            return Err(Error::NotFound {
                identifier: String::new(),
                server: scope.map(|s| s.get()),
            });
        }

        let mut matches = self.store.search_players(self.registry, fragment)?;
        match matches.len() {
            0 => Err(Error::NotFound {
                identifier: fragment.to_string(),
                server: scope.map(|s| s.get()),
            }),
            1 => Ok(matches.remove(0)),
            total => {
                matches.truncate(MAX_CANDIDATES);
                let additional = total - matches.len();
                Err(Error::Ambiguous {
                    fragment: fragment.to_string(),
                    candidates: matches,
                    truncated: additional > 0,
                    additional,
                })
            }
        }
    }
}
