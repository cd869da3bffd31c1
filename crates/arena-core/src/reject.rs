//! The rejection taxonomy.
//!
//! Every way the server can refuse an agent command is one variant here,
//! with a stable wire token.  Higher crates return `Result<_, Reject>` from
//! their fallible operations; the IPC layer turns a `Reject` into the
//! `{ok: false, error, hint?, retryAfterMs?, permanent?}` envelope without
//! ever matching on message strings.

use thiserror::Error;

use crate::time::TimeMs;

/// Shorthand result for operations that fail with a wire-visible rejection.
pub type RejectResult<T> = Result<T, Reject>;

/// A structured command rejection.
///
/// `Display` is the human hint; [`token`][Reject::token] is the stable
/// machine-readable error code.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Reject {
    // ── Validation failures ───────────────────────────────────────────────
    #[error("agent id is missing or malformed")]
    InvalidAgentId,

    #[error("timestamp is missing or out of range")]
    InvalidTimestamp,

    #[error("rate limit exceeded; slow down")]
    RateLimited { retry_after_ms: u64 },

    #[error("position has a non-finite coordinate")]
    InvalidPosition,

    #[error("position is outside the island bounds")]
    OutOfBounds,

    #[error("position overlaps a static obstacle")]
    Collision,

    #[error("text payload is missing or empty")]
    InvalidText,

    #[error("text exceeds the maximum length")]
    TextTooLong,

    #[error("command queue is full; retry shortly")]
    QueueFull,

    #[error("wallet address is required")]
    WalletAddressRequired,

    #[error("wallet address must be 12-180 characters with no whitespace")]
    InvalidWalletAddress,

    #[error("invalid battle intent")]
    InvalidIntent,

    #[error("malformed command arguments: {0}")]
    BadArgs(String),

    #[error("unknown command")]
    UnknownCommand,

    // ── Policy failures ───────────────────────────────────────────────────
    #[error("agent is in an active battle")]
    AgentInBattle,

    #[error("the survival round is not accepting this action")]
    SurvivalRoundClosed,

    #[error("combat is not allowed in the current phase")]
    CombatPhaseLocked,

    #[error("cannot attack an ally")]
    CannotAttackAlly,

    #[error("target is too far away")]
    TooFar { distance: f64, max: f64 },

    #[error("agent has refused violence")]
    AgentRefusedViolence,

    #[error("agent is dead")]
    AgentDead { dead_until: Option<TimeMs> },

    #[error("agent is permanently dead this round")]
    AgentDeadPermanent,

    #[error("agent is banned")]
    AgentBanned,

    #[error("wallet belongs to a permanently dead agent")]
    WalletBelongsToDeadAgent,

    #[error("wallet is already bound to another agent")]
    WalletInUse,

    #[error("the room is at capacity")]
    RoomFull,

    #[error("an intent was already submitted this turn")]
    DuplicateIntent,

    #[error("agent is not a participant in this battle")]
    NotAParticipant,

    // ── Lifecycle failures ────────────────────────────────────────────────
    #[error("unknown agent")]
    UnknownAgent,

    #[error("unknown target agent")]
    UnknownTargetAgent,

    #[error("battle not found")]
    BattleNotFound,

    #[error("that transaction hash is already being processed")]
    DuplicateTxHashInFlight,
}

impl Reject {
    /// The stable wire token.  `Room is full` is kept verbatim for protocol
    /// compatibility; everything else is snake_case.
    pub fn token(&self) -> &'static str {
        match self {
            Reject::InvalidAgentId           => "invalid_agent_id",
            Reject::InvalidTimestamp         => "invalid_timestamp",
            Reject::RateLimited { .. }       => "rate_limited",
            Reject::InvalidPosition          => "invalid_position",
            Reject::OutOfBounds              => "out_of_bounds",
            Reject::Collision                => "collision",
            Reject::InvalidText              => "invalid_text",
            Reject::TextTooLong              => "text_too_long",
            Reject::QueueFull                => "queue_full",
            Reject::WalletAddressRequired    => "wallet_address_required",
            Reject::InvalidWalletAddress     => "invalid_wallet_address",
            Reject::InvalidIntent            => "invalid_intent",
            Reject::BadArgs(_)               => "bad_args",
            Reject::UnknownCommand           => "unknown_command",
            Reject::AgentInBattle            => "agent_in_battle",
            Reject::SurvivalRoundClosed      => "survival_round_closed",
            Reject::CombatPhaseLocked        => "combat_phase_locked",
            Reject::CannotAttackAlly         => "cannot_attack_ally",
            Reject::TooFar { .. }            => "too_far",
            Reject::AgentRefusedViolence     => "agent_refused_violence",
            Reject::AgentDead { .. }         => "agent_dead",
            Reject::AgentDeadPermanent       => "agent_dead_permanent",
            Reject::AgentBanned              => "agent_banned",
            Reject::WalletBelongsToDeadAgent => "wallet_belongs_to_dead_agent",
            Reject::WalletInUse              => "wallet_in_use",
            Reject::RoomFull                 => "Room is full",
            Reject::DuplicateIntent          => "duplicate_intent",
            Reject::NotAParticipant          => "not_a_participant",
            Reject::UnknownAgent             => "unknown_agent",
            Reject::UnknownTargetAgent       => "unknown_target_agent",
            Reject::BattleNotFound           => "battle_not_found",
            Reject::DuplicateTxHashInFlight  => "duplicate_txHash_in_flight",
        }
    }

    /// `retryAfterMs` envelope field, where the rejection is transient.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Reject::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            Reject::QueueFull                      => Some(250),
            _                                      => None,
        }
    }

    /// `deadUntil` envelope field for temporary death.
    pub fn dead_until(&self) -> Option<TimeMs> {
        match self {
            Reject::AgentDead { dead_until } => *dead_until,
            _                                => None,
        }
    }

    /// Whether the condition can never clear without admin intervention.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Reject::AgentDeadPermanent
                | Reject::AgentBanned
                | Reject::WalletBelongsToDeadAgent
        )
    }
}
