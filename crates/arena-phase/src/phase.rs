//! The phase timer.

use arena_core::constants::WORLD_HALF;
use arena_core::{GamePhase, TimeMs};

/// Phase durations; deployment-tunable, defaulting to 48 h / 72 h / 48 h.
#[derive(Copy, Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhaseTimings {
    pub lobby_ms: u64,
    pub battle_ms: u64,
    pub showdown_ms: u64,
}

impl Default for PhaseTimings {
    fn default() -> Self {
        const HOUR: u64 = 60 * 60 * 1_000;
        Self {
            lobby_ms:    48 * HOUR,
            battle_ms:   72 * HOUR,
            showdown_ms: 48 * HOUR,
        }
    }
}

impl PhaseTimings {
    fn duration_of(&self, phase: GamePhase) -> u64 {
        match phase {
            GamePhase::Lobby    => self.lobby_ms,
            GamePhase::Battle   => self.battle_ms,
            GamePhase::Showdown => self.showdown_ms,
        }
    }
}

/// Wire view of the current phase.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseState {
    pub phase: GamePhase,
    pub safe_zone_radius: f64,
    pub ends_at: TimeMs,
    pub round_number: u32,
}

/// Drives `lobby → battle → showdown` on a wall-clock timer.
///
/// Showdown is terminal: once reached it holds until the round is reset.
/// The alliance-size cap shrinks with each phase; the caller trims the book
/// on every transition.
pub struct PhaseManager {
    phase: GamePhase,
    ends_at: TimeMs,
    round_number: u32,
    timings: PhaseTimings,
}

impl PhaseManager {
    pub fn new(timings: PhaseTimings, now: TimeMs) -> Self {
        Self {
            phase: GamePhase::Lobby,
            ends_at: now.offset(timings.lobby_ms),
            round_number: 1,
            timings,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    /// Phase gate only — the survival contract gate is separate.
    pub fn combat_allowed(&self) -> bool {
        self.phase.allows_combat()
    }

    /// The safe zone spans the island until the showdown closes it in.
    pub fn safe_zone_radius(&self) -> f64 {
        match self.phase {
            GamePhase::Lobby | GamePhase::Battle => WORLD_HALF,
            GamePhase::Showdown                  => 60.0,
        }
    }

    /// Alliance size cap for the current phase.
    pub fn alliance_cap(&self) -> usize {
        match self.phase {
            GamePhase::Lobby    => 6,
            GamePhase::Battle   => 4,
            GamePhase::Showdown => 2,
        }
    }

    pub fn state(&self) -> PhaseState {
        PhaseState {
            phase:            self.phase,
            safe_zone_radius: self.safe_zone_radius(),
            ends_at:          self.ends_at,
            round_number:     self.round_number,
        }
    }

    /// Advance the timer.  Returns the new phase when a transition fired.
    pub fn tick(&mut self, now: TimeMs) -> Option<GamePhase> {
        if now < self.ends_at {
            return None;
        }
        let next = self.phase.next()?;
        self.phase = next;
        self.ends_at = now.offset(self.timings.duration_of(next));
        Some(next)
    }

    /// Round reset: back to lobby, next round number.
    pub fn advance_round(&mut self, now: TimeMs) {
        self.round_number += 1;
        self.phase = GamePhase::Lobby;
        self.ends_at = now.offset(self.timings.lobby_ms);
    }

    /// Admin override used by tests and operator tooling.
    pub fn force_phase(&mut self, phase: GamePhase, now: TimeMs) {
        self.phase = phase;
        self.ends_at = now.offset(self.timings.duration_of(phase));
    }
}
