//! One active duel record.

use std::collections::{BTreeMap, BTreeSet};

use arena_core::{AgentId, BattleId, BattleIntent, TimeMs};

/// A submitted (possibly downgraded) intent for the current turn.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SubmittedIntent {
    pub intent: BattleIntent,
    /// True when the request was downgraded to guard for lack of stamina,
    /// or auto-assigned by the turn timeout.
    pub forced: bool,
}

/// Mutable state of one active duel.
///
/// Exactly two participants.  HP and stamina stay in `[0, 100]`; the per-side
/// power multiplier is fixed at start from the fighter's kill count.
pub struct BattleRecord {
    pub battle_id: BattleId,
    pub participants: [AgentId; 2],
    pub hp: BTreeMap<AgentId, i32>,
    pub stamina: BTreeMap<AgentId, i32>,
    pub power: BTreeMap<AgentId, f64>,
    /// 1-based turn counter.
    pub turn: u32,
    pub intents: BTreeMap<AgentId, SubmittedIntent>,
    /// Last turn's resolved intents, for the momentum read.
    pub prev_intents: BTreeMap<AgentId, BattleIntent>,
    /// Standing truce offers; persists across turns.
    pub truce_proposals: BTreeSet<AgentId>,
    pub turn_started_at: TimeMs,
    pub started_at: TimeMs,
    pub updated_at: TimeMs,
}

impl BattleRecord {
    pub fn is_participant(&self, id: &AgentId) -> bool {
        self.participants.iter().any(|p| p == id)
    }

    /// The other fighter.  Callers guarantee `id` is a participant.
    pub fn opponent_of(&self, id: &AgentId) -> &AgentId {
        if &self.participants[0] == id {
            &self.participants[1]
        } else {
            &self.participants[0]
        }
    }

    /// Read-only summary for IPC replies and the observer battle list.
    pub fn view(&self) -> BattleView {
        BattleView {
            battle_id:       self.battle_id.clone(),
            participants:    self.participants.clone(),
            hp:              self.hp.clone(),
            stamina:         self.stamina.clone(),
            power:           self.power.clone(),
            turn:            self.turn,
            waiting_on:      self
                .participants
                .iter()
                .filter(|p| !self.intents.contains_key(*p))
                .cloned()
                .collect(),
            truce_proposals: self.truce_proposals.iter().cloned().collect(),
            turn_started_at: self.turn_started_at,
            started_at:      self.started_at,
            updated_at:      self.updated_at,
        }
    }
}

/// Serializable battle summary.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleView {
    pub battle_id: BattleId,
    pub participants: [AgentId; 2],
    pub hp: BTreeMap<AgentId, i32>,
    pub stamina: BTreeMap<AgentId, i32>,
    pub power: BTreeMap<AgentId, f64>,
    pub turn: u32,
    pub waiting_on: Vec<AgentId>,
    pub truce_proposals: Vec<AgentId>,
    pub turn_started_at: TimeMs,
    pub started_at: TimeMs,
    pub updated_at: TimeMs,
}
