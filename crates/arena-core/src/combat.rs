//! Combat wire types: per-turn intents and the battle update payloads that
//! ride inside [`WorldMessage::Battle`][crate::WorldMessage::Battle].
//!
//! The battle *state machine* lives in `arena-battle`; only the shapes that
//! cross crate or wire boundaries are defined here, mirroring how the rest
//! of the workspace keeps shared enums in the core crate.

use std::collections::BTreeMap;
use std::fmt;

use crate::ids::{AgentId, BattleId};

// ── BattleIntent ──────────────────────────────────────────────────────────────

/// One combat action chosen per turn.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleIntent {
    Approach,
    Strike,
    Guard,
    Feint,
    Retreat,
}

impl BattleIntent {
    pub const ALL: [BattleIntent; 5] = [
        BattleIntent::Approach,
        BattleIntent::Strike,
        BattleIntent::Guard,
        BattleIntent::Feint,
        BattleIntent::Retreat,
    ];

    /// True for the intents a prize-refusing agent may not submit.
    #[inline]
    pub fn is_violent(self) -> bool {
        matches!(self, BattleIntent::Strike | BattleIntent::Feint)
    }

    pub fn parse(s: &str) -> Option<BattleIntent> {
        match s {
            "approach" => Some(BattleIntent::Approach),
            "strike"   => Some(BattleIntent::Strike),
            "guard"    => Some(BattleIntent::Guard),
            "feint"    => Some(BattleIntent::Feint),
            "retreat"  => Some(BattleIntent::Retreat),
            _          => None,
        }
    }
}

impl fmt::Display for BattleIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BattleIntent::Approach => "approach",
            BattleIntent::Strike   => "strike",
            BattleIntent::Guard    => "guard",
            BattleIntent::Feint    => "feint",
            BattleIntent::Retreat  => "retreat",
        };
        write!(f, "{s}")
    }
}

// ── EndReason ─────────────────────────────────────────────────────────────────

/// Why a battle terminated.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    /// One side's HP reached 0.
    Ko,
    /// Both retreated, or both HP reached 0 in the same turn.
    Draw,
    /// Exactly one side retreated and escaped.
    Flee,
    /// Both sides proposed truce.
    Truce,
    /// One side surrendered; the opponent wins.
    Surrender,
    /// A participant left the world mid-battle; the opponent wins.
    Disconnect,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EndReason::Ko         => "ko",
            EndReason::Draw       => "draw",
            EndReason::Flee       => "flee",
            EndReason::Truce      => "truce",
            EndReason::Surrender  => "surrender",
            EndReason::Disconnect => "disconnect",
        };
        write!(f, "{s}")
    }
}

// ── BattleUpdate ──────────────────────────────────────────────────────────────

/// One observable battle event, tagged by machine phase.
///
/// Per-participant maps use `BTreeMap` so JSON key order is stable.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum BattleUpdate {
    /// A duel was created.  Both sides start at HP 100, stamina 100.
    #[serde(rename_all = "camelCase")]
    Started {
        battle_id:    BattleId,
        participants: [AgentId; 2],
        hp:           BTreeMap<AgentId, i32>,
        stamina:      BTreeMap<AgentId, i32>,
        power:        BTreeMap<AgentId, f64>,
    },

    /// Intent-phase progress: who has submitted, who is still awaited,
    /// forced guard substitutions, timeout auto-guards, truce proposals.
    #[serde(rename_all = "camelCase")]
    Intent {
        battle_id:  BattleId,
        turn:       u32,
        submitted:  Vec<AgentId>,
        waiting_on: Vec<AgentId>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        forced_guard: Vec<AgentId>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        timed_out: Vec<AgentId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        truce_proposed_by: Option<AgentId>,
    },

    /// A turn resolved: damage applied, HP and stamina after the exchange.
    #[serde(rename_all = "camelCase")]
    Round {
        battle_id:  BattleId,
        turn:       u32,
        intents:    BTreeMap<AgentId, BattleIntent>,
        damage:     BTreeMap<AgentId, i32>,
        read_bonus: BTreeMap<AgentId, i32>,
        hp:         BTreeMap<AgentId, i32>,
        stamina:    BTreeMap<AgentId, i32>,
    },

    /// The duel terminated; the record is gone after this event.
    #[serde(rename_all = "camelCase")]
    Ended {
        battle_id: BattleId,
        reason:    EndReason,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        winner_id: Option<AgentId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        loser_id: Option<AgentId>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        defeated_ids: Vec<AgentId>,
        summary: String,
    },
}

impl BattleUpdate {
    pub fn battle_id(&self) -> &BattleId {
        match self {
            BattleUpdate::Started { battle_id, .. }
            | BattleUpdate::Intent { battle_id, .. }
            | BattleUpdate::Round { battle_id, .. }
            | BattleUpdate::Ended { battle_id, .. } => battle_id,
        }
    }

    /// Terminal updates carry the defeated list that drives permanent death.
    pub fn defeated(&self) -> &[AgentId] {
        match self {
            BattleUpdate::Ended { defeated_ids, .. } => defeated_ids,
            _ => &[],
        }
    }
}
