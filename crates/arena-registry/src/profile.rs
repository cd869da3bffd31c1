//! Profile and combat-stat records.

use arena_core::constants::{WALLET_MAX_LEN, WALLET_MIN_LEN};
use arena_core::{AgentId, Reject, RejectResult, SkillSpec, TimeMs};

// ── CombatStats ───────────────────────────────────────────────────────────────

/// Durable per-agent combat record.
///
/// `guilt` counts kills attributed to the agent this round and never goes
/// negative.  `permanently_dead` is terminal until a round reset or an admin
/// revive clears the whole struct.
#[derive(Clone, Debug, Default, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CombatStats {
    pub wins: u32,
    pub losses: u32,
    pub kills: u32,
    pub deaths: u32,
    pub guilt: u32,
    pub refused_prize: bool,
    pub permanently_dead: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub death_permanent_at: Option<TimeMs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_death_at: Option<TimeMs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_until: Option<TimeMs>,
}

impl CombatStats {
    /// Power multiplier derived from kills: `clamp(1 + 0.03·kills, 1.0, 1.5)`.
    pub fn power(&self) -> f64 {
        (1.0 + 0.03 * f64::from(self.kills)).clamp(1.0, 1.5)
    }

    /// True while a temporary death window is open at `now`.
    pub fn is_dead_at(&self, now: TimeMs) -> bool {
        self.dead_until.is_some_and(|until| now < until)
    }
}

// ── AgentProfile ──────────────────────────────────────────────────────────────

/// Identity and durable stats for one agent.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    pub agent_id: AgentId,
    pub name: String,
    pub wallet_address: String,
    pub color: String,
    pub bio: String,
    pub capabilities: Vec<String>,
    pub skills: Vec<SkillSpec>,
    pub joined_at: TimeMs,
    pub last_seen: TimeMs,
    #[serde(default)]
    pub combat: CombatStats,
}

impl AgentProfile {
    pub fn new(spec: RegisterSpec, now: TimeMs) -> Self {
        Self {
            name: spec.name.unwrap_or_else(|| spec.agent_id.as_str().to_owned()),
            agent_id: spec.agent_id,
            wallet_address: spec.wallet_address,
            color: spec.color.unwrap_or_else(|| "#e8e6e3".to_owned()),
            bio: spec.bio.unwrap_or_default(),
            capabilities: spec.capabilities,
            skills: spec.skills,
            joined_at: now,
            last_seen: now,
            combat: CombatStats::default(),
        }
    }

    /// Merge a re-registration: identity fields update, combat stats and
    /// `joined_at` survive, and the wallet binding is kept once set.
    pub fn merge(&mut self, spec: RegisterSpec, now: TimeMs) {
        if let Some(name) = spec.name {
            self.name = name;
        }
        if let Some(color) = spec.color {
            self.color = color;
        }
        if let Some(bio) = spec.bio {
            self.bio = bio;
        }
        if !spec.capabilities.is_empty() {
            self.capabilities = spec.capabilities;
        }
        if !spec.skills.is_empty() {
            self.skills = spec.skills;
        }
        if self.wallet_address.is_empty() {
            self.wallet_address = spec.wallet_address;
        }
        self.last_seen = now;
    }
}

// ── RegisterSpec ──────────────────────────────────────────────────────────────

/// Validated registration input.
#[derive(Clone, Debug)]
pub struct RegisterSpec {
    pub agent_id: AgentId,
    pub wallet_address: String,
    pub name: Option<String>,
    pub color: Option<String>,
    pub bio: Option<String>,
    pub capabilities: Vec<String>,
    pub skills: Vec<SkillSpec>,
}

/// Wallet shape check: 12–180 characters, no whitespace.
pub fn validate_wallet(wallet: &str) -> RejectResult<()> {
    if wallet.is_empty() {
        return Err(Reject::WalletAddressRequired);
    }
    if wallet.len() < WALLET_MIN_LEN
        || wallet.len() > WALLET_MAX_LEN
        || wallet.chars().any(char::is_whitespace)
    {
        return Err(Reject::InvalidWalletAddress);
    }
    Ok(())
}
