//! External verbs and their typed arguments.
//!
//! The HTTP layer parses `{command, args}` JSON into a [`WorldCommand`]
//! before anything reaches the simulation — unexpected shapes die at the
//! boundary with a specific reason, and the core never sees a generic map.

use arena_core::{
    AgentAction, AgentEmote, AgentId, AllianceId, BattleId, BattleIntent, SkillSpec, TimeMs,
};

/// Reply payload for a successful command.  The IPC layer wraps it in the
/// `{ok: true, ...}` envelope.
pub type Reply = serde_json::Value;

/// Registration arguments shared by `auto-connect` and `register`.
#[derive(Clone, Debug, Default)]
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterArgs {
    pub name: Option<String>,
    pub wallet_address: Option<String>,
    pub color: Option<String>,
    pub bio: Option<String>,
    pub capabilities: Vec<String>,
    pub skills: Vec<SkillSpec>,
    /// Optional explicit spawn request.
    pub x: Option<f64>,
    pub z: Option<f64>,
    pub rotation: Option<f64>,
}

/// One parsed external verb.
#[derive(Clone, Debug)]
pub enum WorldCommand {
    // ── Lifecycle ─────────────────────────────────────────────────────────
    /// Server mints the agent id.
    AutoConnect { args: RegisterArgs },
    /// Caller chooses the agent id.
    Register { agent_id: AgentId, args: RegisterArgs },
    Leave { agent_id: AgentId },

    // ── Movement & expression ─────────────────────────────────────────────
    Move { agent_id: AgentId, x: f64, y: f64, z: f64, rotation: f64 },
    Action { agent_id: AgentId, action: AgentAction },
    Chat { agent_id: AgentId, text: String },
    Emote { agent_id: AgentId, emote: AgentEmote },
    Whisper { agent_id: AgentId, to_agent_id: AgentId, text: String },
    Territory { agent_id: AgentId, x: f64, z: f64, radius: f64, label: Option<String> },

    // ── Combat ────────────────────────────────────────────────────────────
    BattleStart { agent_id: AgentId, target_agent_id: AgentId },
    BattleIntent { agent_id: AgentId, battle_id: BattleId, intent: BattleIntent },
    BattleSurrender { agent_id: AgentId },
    BattleTruce { agent_id: AgentId },

    // ── Alliances ─────────────────────────────────────────────────────────
    AllianceForm { agent_id: AgentId },
    AllianceJoin { agent_id: AgentId, alliance_id: AllianceId },
    AllianceLeave { agent_id: AgentId },

    // ── Survival & betting ────────────────────────────────────────────────
    SurvivalRefuse { agent_id: AgentId, refuse: bool },
    PlaceBet {
        agent_id: AgentId,
        amount_usd: f64,
        tx_hash: String,
        wallet_address: String,
    },

    // ── Queries ───────────────────────────────────────────────────────────
    WorldState,
    Battles,
    RoomInfo,
    RoomEvents { since: Option<TimeMs>, limit: Option<usize> },
    RoomSkills,
    SurvivalStatus,
    Profile { agent_id: AgentId },
    Profiles,
    Describe,

    // ── Admin ─────────────────────────────────────────────────────────────
    SurvivalStart { prize_pool_usd: f64, duration_ms: Option<u64> },
    SurvivalReset,
    AdminRevive { agent_id: AgentId },
}

impl WorldCommand {
    /// The acting agent, where the verb has one (queries and admin don't).
    pub fn agent_id(&self) -> Option<&AgentId> {
        use WorldCommand::*;
        match self {
            Register { agent_id, .. }
            | Leave { agent_id }
            | Move { agent_id, .. }
            | Action { agent_id, .. }
            | Chat { agent_id, .. }
            | Emote { agent_id, .. }
            | Whisper { agent_id, .. }
            | Territory { agent_id, .. }
            | BattleStart { agent_id, .. }
            | BattleIntent { agent_id, .. }
            | BattleSurrender { agent_id }
            | BattleTruce { agent_id }
            | AllianceForm { agent_id }
            | AllianceJoin { agent_id, .. }
            | AllianceLeave { agent_id }
            | SurvivalRefuse { agent_id, .. }
            | PlaceBet { agent_id, .. }
            | Profile { agent_id }
            | AdminRevive { agent_id } => Some(agent_id),
            _ => None,
        }
    }
}
