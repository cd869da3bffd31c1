//! The `WorldMessage` sum type — every event that flows through the command
//! queue, the world state, the observer fan-out, and the external relay.
//!
//! # Wire shape
//!
//! Messages serialize as a tagged JSON object: the `worldType` field carries
//! the variant name (`position`, `chat`, `battle`, …) and the remaining
//! fields are flattened camelCase, matching the agent/observer protocol.
//! Every variant carries the acting `agentId` and a server-assigned
//! `timestamp` (monotonic Unix-ms).
//!
//! Switching on the variant drives both state application (`arena-world`)
//! and observer delivery (the [`Delivery`] class).  There is no dispatch
//! table beyond this one enum.

use crate::combat::BattleUpdate;
use crate::ids::{AgentId, AllianceId};
use crate::round::GamePhase;
use crate::time::TimeMs;

// ── Supporting records ────────────────────────────────────────────────────────

/// One advertised agent skill.
#[derive(Clone, Debug, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillSpec {
    pub skill_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// The closed set of world animations an agent can perform.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentAction {
    Walk,
    Idle,
    Wave,
    Pinch,
    Talk,
    Dance,
    Backflip,
    Spin,
}

impl AgentAction {
    pub fn label(self) -> &'static str {
        match self {
            AgentAction::Walk     => "walk",
            AgentAction::Idle     => "idle",
            AgentAction::Wave     => "wave",
            AgentAction::Pinch    => "pinch",
            AgentAction::Talk     => "talk",
            AgentAction::Dance    => "dance",
            AgentAction::Backflip => "backflip",
            AgentAction::Spin     => "spin",
        }
    }
}

/// The closed set of emotes.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentEmote {
    Happy,
    Thinking,
    Surprised,
    Laugh,
}

/// What an `alliance` message announces.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllianceAction {
    Formed,
    Joined,
    Left,
    Disbanded,
    Trimmed,
}

// ── Delivery classification ───────────────────────────────────────────────────

/// How the observer bridge routes a message.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Delivery {
    /// Sent to every connected observer.
    Global,
    /// Sent only to observers whose AOI set contains the actor.
    Spatial,
    /// Sent only to observers within `CHAT_RANGE + AOI_RADIUS` of the actor.
    ChatRange,
    /// Never broadcast (whispers).
    Never,
}

// ── WorldMessage ──────────────────────────────────────────────────────────────

/// One world event.  See the module docs for the wire shape.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(tag = "worldType", rename_all = "snake_case")]
pub enum WorldMessage {
    #[serde(rename_all = "camelCase")]
    Position {
        agent_id: AgentId,
        x: f64,
        y: f64,
        z: f64,
        rotation: f64,
        timestamp: TimeMs,
    },

    #[serde(rename_all = "camelCase")]
    Action {
        agent_id: AgentId,
        action: AgentAction,
        timestamp: TimeMs,
    },

    #[serde(rename_all = "camelCase")]
    Emote {
        agent_id: AgentId,
        emote: AgentEmote,
        timestamp: TimeMs,
    },

    #[serde(rename_all = "camelCase")]
    Chat {
        agent_id: AgentId,
        text: String,
        timestamp: TimeMs,
    },

    /// Agent enters the world.  Spawn coordinates are always present by the
    /// time the message is enqueued — the registration path resolves them.
    #[serde(rename_all = "camelCase")]
    Join {
        agent_id: AgentId,
        name: String,
        color: String,
        x: f64,
        z: f64,
        rotation: f64,
        timestamp: TimeMs,
    },

    #[serde(rename_all = "camelCase")]
    Leave {
        agent_id: AgentId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        timestamp: TimeMs,
    },

    /// Profile mutation (name/color/bio/capabilities/skills).
    #[serde(rename_all = "camelCase")]
    Profile {
        agent_id: AgentId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bio: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        capabilities: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        skills: Option<Vec<SkillSpec>>,
        timestamp: TimeMs,
    },

    #[serde(rename_all = "camelCase")]
    Battle {
        agent_id: AgentId,
        update: BattleUpdate,
        timestamp: TimeMs,
    },

    #[serde(rename_all = "camelCase")]
    Alliance {
        agent_id: AgentId,
        alliance_id: AllianceId,
        action: AllianceAction,
        members: Vec<AgentId>,
        timestamp: TimeMs,
    },

    #[serde(rename_all = "camelCase")]
    Phase {
        agent_id: AgentId,
        phase: GamePhase,
        round_number: u32,
        safe_zone_radius: f64,
        ends_at: TimeMs,
        timestamp: TimeMs,
    },

    /// Agent-to-agent private message.  Stored in history, never broadcast.
    #[serde(rename_all = "camelCase")]
    Whisper {
        agent_id: AgentId,
        to_agent_id: AgentId,
        text: String,
        timestamp: TimeMs,
    },

    /// A spectator bet accepted for relay/persistence.
    #[serde(rename_all = "camelCase")]
    Bet {
        agent_id: AgentId,
        amount_usd: f64,
        tx_hash: String,
        wallet_address: String,
        timestamp: TimeMs,
    },

    /// Territory claim marker (relayed verbatim; no server-side mechanics).
    #[serde(rename_all = "camelCase")]
    Territory {
        agent_id: AgentId,
        x: f64,
        z: f64,
        radius: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        timestamp: TimeMs,
    },

    /// Damage attributed to the shrinking safe zone.
    #[serde(rename_all = "camelCase")]
    ZoneDamage {
        agent_id: AgentId,
        amount: i32,
        timestamp: TimeMs,
    },
}

impl WorldMessage {
    /// The acting agent.
    pub fn agent_id(&self) -> &AgentId {
        match self {
            WorldMessage::Position { agent_id, .. }
            | WorldMessage::Action { agent_id, .. }
            | WorldMessage::Emote { agent_id, .. }
            | WorldMessage::Chat { agent_id, .. }
            | WorldMessage::Join { agent_id, .. }
            | WorldMessage::Leave { agent_id, .. }
            | WorldMessage::Profile { agent_id, .. }
            | WorldMessage::Battle { agent_id, .. }
            | WorldMessage::Alliance { agent_id, .. }
            | WorldMessage::Phase { agent_id, .. }
            | WorldMessage::Whisper { agent_id, .. }
            | WorldMessage::Bet { agent_id, .. }
            | WorldMessage::Territory { agent_id, .. }
            | WorldMessage::ZoneDamage { agent_id, .. } => agent_id,
        }
    }

    /// The server-assigned stamp.
    pub fn timestamp(&self) -> TimeMs {
        match self {
            WorldMessage::Position { timestamp, .. }
            | WorldMessage::Action { timestamp, .. }
            | WorldMessage::Emote { timestamp, .. }
            | WorldMessage::Chat { timestamp, .. }
            | WorldMessage::Join { timestamp, .. }
            | WorldMessage::Leave { timestamp, .. }
            | WorldMessage::Profile { timestamp, .. }
            | WorldMessage::Battle { timestamp, .. }
            | WorldMessage::Alliance { timestamp, .. }
            | WorldMessage::Phase { timestamp, .. }
            | WorldMessage::Whisper { timestamp, .. }
            | WorldMessage::Bet { timestamp, .. }
            | WorldMessage::Territory { timestamp, .. }
            | WorldMessage::ZoneDamage { timestamp, .. } => *timestamp,
        }
    }

    /// The stable wire tag (`worldType` value).
    pub fn kind(&self) -> &'static str {
        match self {
            WorldMessage::Position { .. }   => "position",
            WorldMessage::Action { .. }     => "action",
            WorldMessage::Emote { .. }      => "emote",
            WorldMessage::Chat { .. }       => "chat",
            WorldMessage::Join { .. }       => "join",
            WorldMessage::Leave { .. }      => "leave",
            WorldMessage::Profile { .. }    => "profile",
            WorldMessage::Battle { .. }     => "battle",
            WorldMessage::Alliance { .. }   => "alliance",
            WorldMessage::Phase { .. }      => "phase",
            WorldMessage::Whisper { .. }    => "whisper",
            WorldMessage::Bet { .. }        => "bet",
            WorldMessage::Territory { .. }  => "territory",
            WorldMessage::ZoneDamage { .. } => "zone_damage",
        }
    }

    /// Position and action overwrite live state; everything else is history.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WorldMessage::Position { .. } | WorldMessage::Action { .. }
        )
    }

    /// How the observer bridge routes this message.
    pub fn delivery(&self) -> Delivery {
        match self {
            WorldMessage::Whisper { .. } => Delivery::Never,

            WorldMessage::Join { .. }
            | WorldMessage::Leave { .. }
            | WorldMessage::Profile { .. }
            | WorldMessage::Battle { .. }
            | WorldMessage::Alliance { .. }
            | WorldMessage::Phase { .. }
            | WorldMessage::Territory { .. }
            | WorldMessage::Bet { .. }
            | WorldMessage::ZoneDamage { .. } => Delivery::Global,

            WorldMessage::Chat { .. } | WorldMessage::Emote { .. } => Delivery::ChatRange,

            WorldMessage::Position { .. } | WorldMessage::Action { .. } => Delivery::Spatial,
        }
    }

    /// Rate limiting applies only to the four high-frequency agent verbs.
    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            WorldMessage::Position { .. }
                | WorldMessage::Action { .. }
                | WorldMessage::Chat { .. }
                | WorldMessage::Emote { .. }
        )
    }
}
