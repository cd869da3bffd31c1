//! Resolution tables: stamina costs and the damage matrix.

use arena_core::BattleIntent;

pub const HP_MAX: i32 = 100;
pub const STAMINA_MAX: i32 = 100;

/// Stamina recovered by a guarding agent.
pub const GUARD_RECOVERY: i32 = 10;

/// Flat bonus for reading a repeated opponent intent.
pub const MOMENTUM_BONUS: i32 = 5;

/// Stamina cost of submitting an intent.  An intent the agent cannot afford
/// is downgraded to guard at submission time.
pub fn stamina_cost(intent: BattleIntent) -> i32 {
    match intent {
        BattleIntent::Strike   => 20,
        BattleIntent::Feint    => 15,
        BattleIntent::Approach => 5,
        BattleIntent::Retreat  => 10,
        BattleIntent::Guard    => 0,
    }
}

/// Attacker's base damage against each defender choice, before the power
/// multiplier and momentum bonus.
pub fn base_damage(attacker: BattleIntent, defender: BattleIntent) -> i32 {
    use BattleIntent::*;
    match attacker {
        Strike => match defender {
            Guard    => 10,
            Strike   => 18,
            Feint    => 28,
            Retreat  => 30,
            Approach => 22,
        },
        Feint => match defender {
            Guard    => 10,
            Strike   => 14,
            Feint    => 14,
            Retreat  => 22,
            Approach => 14,
        },
        Approach => match defender {
            Retreat => 12,
            _       => 4,
        },
        Guard | Retreat => 0,
    }
}

/// Full outgoing damage: `round(base × power)`, floored at 1 whenever the
/// base is positive, plus the momentum bonus when the read connected.
pub fn scaled_damage(base: i32, power: f64, momentum: bool) -> i32 {
    if base <= 0 {
        return 0;
    }
    let scaled = (f64::from(base) * power).round() as i32;
    scaled.max(1) + if momentum { MOMENTUM_BONUS } else { 0 }
}
