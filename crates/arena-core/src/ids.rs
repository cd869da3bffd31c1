//! Strongly typed identifier wrappers.
//!
//! World entities are keyed by opaque string ids: agents choose (or are
//! minted) theirs at registration, battles and alliances get server-minted
//! ones.  The string newtypes wrap `Arc<str>` so cloning an id into per-tick
//! event lists is a refcount bump, not an allocation.  Observer connections
//! are process-local and keyed by a plain integer.

use std::fmt;
use std::sync::Arc;

/// Generate a typed string-id wrapper around `Arc<str>`.
macro_rules! typed_str_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[derive(serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        $vis struct $name(Arc<str>);

        impl $name {
            pub fn new(id: impl Into<Arc<str>>) -> Self {
                Self(id.into())
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(Arc::from(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(Arc::from(s))
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

typed_str_id! {
    /// Opaque agent identifier.  Caller-chosen at `register`, server-minted
    /// at `auto-connect`.
    pub struct AgentId;
}

typed_str_id! {
    /// Server-minted identifier of one active duel.
    pub struct BattleId;
}

typed_str_id! {
    /// Server-minted identifier of one alliance.
    pub struct AllianceId;
}

impl AgentId {
    /// The reserved actor id for server-originated events (phase changes,
    /// zone damage, round settlement).
    pub fn system() -> AgentId {
        AgentId::from("system")
    }

    /// Basic shape check applied at the validation boundary: non-empty,
    /// at most 64 bytes, no whitespace or control characters.
    pub fn is_well_formed(s: &str) -> bool {
        !s.is_empty()
            && s.len() <= 64
            && s.chars().all(|c| !c.is_whitespace() && !c.is_control())
    }
}

// ── ObserverId ────────────────────────────────────────────────────────────────

/// Process-local identifier of one observer connection.
///
/// Minted sequentially by the observer bridge; never serialized to agents.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
pub struct ObserverId(pub u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer({})", self.0)
    }
}
