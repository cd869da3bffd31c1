//! Round structure enums shared between the phase manager and the wire.

use std::fmt;

/// Coarse round segment.  Combat is only legal in `Battle` and `Showdown`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Lobby,
    Battle,
    Showdown,
}

impl GamePhase {
    /// Whether duels may start or resolve during this phase.
    #[inline]
    pub fn allows_combat(self) -> bool {
        matches!(self, GamePhase::Battle | GamePhase::Showdown)
    }

    /// The phase that follows this one, or `None` after `Showdown`.
    pub fn next(self) -> Option<GamePhase> {
        match self {
            GamePhase::Lobby    => Some(GamePhase::Battle),
            GamePhase::Battle   => Some(GamePhase::Showdown),
            GamePhase::Showdown => None,
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GamePhase::Lobby    => "lobby",
            GamePhase::Battle   => "battle",
            GamePhase::Showdown => "showdown",
        };
        write!(f, "{s}")
    }
}

/// Survival-contract settlement state.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurvivalStatus {
    /// Initial state: agents may register and move; combat is rejected.
    Waiting,
    /// Round underway; combat enabled subject to phase.
    Active,
    /// Exactly one living non-refuser remained; the pool pays them.
    Winner,
    /// Every living agent refused the prize; no payout.
    Refused,
    /// The round timer expired; living non-refusers split the pool.
    TimerEnded,
}

impl SurvivalStatus {
    /// True once the round has reached a terminal settlement.
    #[inline]
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            SurvivalStatus::Winner | SurvivalStatus::Refused | SurvivalStatus::TimerEnded
        )
    }
}

impl fmt::Display for SurvivalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SurvivalStatus::Waiting    => "waiting",
            SurvivalStatus::Active     => "active",
            SurvivalStatus::Winner     => "winner",
            SurvivalStatus::Refused    => "refused",
            SurvivalStatus::TimerEnded => "timer_ended",
        };
        write!(f, "{s}")
    }
}
