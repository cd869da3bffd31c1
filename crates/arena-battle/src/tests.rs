//! Unit tests for arena-battle.

use arena_core::{AgentId, BattleId, BattleIntent, BattleUpdate, EndReason, Reject, TimeMs};

use crate::manager::{BattleManager, StartFacts};
use crate::resolve::{base_damage, scaled_damage, stamina_cost};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn a() -> AgentId {
    AgentId::from("alice")
}

fn b() -> AgentId {
    AgentId::from("bob")
}

fn facts() -> StartFacts {
    StartFacts {
        challenger:         a(),
        target:             b(),
        challenger_pos:     Some((0.0, 0.0)),
        target_pos:         Some((3.0, 4.0)), // distance 5
        challenger_power:   1.0,
        target_power:       1.0,
        combat_allowed:     true,
        challenger_refused: false,
        target_refused:     false,
        allied:             false,
    }
}

fn started_battle(mgr: &mut BattleManager) -> BattleId {
    let update = mgr.start(facts(), TimeMs(1_000)).unwrap();
    match update {
        BattleUpdate::Started { battle_id, hp, stamina, .. } => {
            assert!(hp.values().all(|&v| v == 100));
            assert!(stamina.values().all(|&v| v == 100));
            battle_id
        }
        other => panic!("expected Started, got {other:?}"),
    }
}

fn last_ended(updates: &[BattleUpdate]) -> &BattleUpdate {
    updates
        .iter()
        .rev()
        .find(|u| matches!(u, BattleUpdate::Ended { .. }))
        .expect("an ended event")
}

// ── Resolution tables ─────────────────────────────────────────────────────────

mod table_tests {
    use super::*;
    use BattleIntent::*;

    #[test]
    fn damage_matrix_matches_design() {
        assert_eq!(base_damage(Strike, Guard), 10);
        assert_eq!(base_damage(Strike, Strike), 18);
        assert_eq!(base_damage(Strike, Feint), 28);
        assert_eq!(base_damage(Strike, Retreat), 30);
        assert_eq!(base_damage(Strike, Approach), 22);
        assert_eq!(base_damage(Feint, Retreat), 22);
        assert_eq!(base_damage(Feint, Feint), 14);
        assert_eq!(base_damage(Approach, Retreat), 12);
        assert_eq!(base_damage(Approach, Guard), 4);
        for defender in BattleIntent::ALL {
            assert_eq!(base_damage(Guard, defender), 0);
            assert_eq!(base_damage(Retreat, defender), 0);
        }
    }

    #[test]
    fn stamina_costs() {
        assert_eq!(stamina_cost(Strike), 20);
        assert_eq!(stamina_cost(Feint), 15);
        assert_eq!(stamina_cost(Approach), 5);
        assert_eq!(stamina_cost(Retreat), 10);
        assert_eq!(stamina_cost(Guard), 0);
    }

    #[test]
    fn scaling_rounds_and_floors_at_one() {
        assert_eq!(scaled_damage(10, 1.5, false), 15);
        assert_eq!(scaled_damage(18, 1.03, false), 19); // 18.54 → 19
        assert_eq!(scaled_damage(1, 1.0, false), 1);
        assert_eq!(scaled_damage(0, 1.5, false), 0, "zero base stays zero");
        assert_eq!(scaled_damage(10, 1.0, true), 15, "momentum adds 5 flat");
    }
}

// ── Start preconditions ───────────────────────────────────────────────────────

mod start_tests {
    use super::*;

    #[test]
    fn start_emits_started_with_full_bars() {
        let mut mgr = BattleManager::new();
        started_battle(&mut mgr);
        assert_eq!(mgr.active_count(), 1);
        assert!(mgr.is_engaged(&a()));
        assert!(mgr.is_engaged(&b()));
    }

    #[test]
    fn out_of_range_is_rejected_without_side_effects() {
        let mut mgr = BattleManager::new();
        let mut f = facts();
        f.target_pos = Some((50.0, 50.0));
        let err = mgr.start(f, TimeMs(1_000)).unwrap_err();
        assert!(matches!(err, Reject::TooFar { .. }));
        assert!(err.to_string().contains("too far"));
        assert_eq!(mgr.active_count(), 0);
        assert!(!mgr.is_engaged(&a()));
    }

    #[test]
    fn range_boundary_is_inclusive() {
        let mut mgr = BattleManager::new();
        let mut f = facts();
        f.target_pos = Some((12.0, 0.0));
        assert!(mgr.start(f, TimeMs(1_000)).is_ok());
    }

    #[test]
    fn engaged_agents_cannot_start_again() {
        let mut mgr = BattleManager::new();
        started_battle(&mut mgr);
        let mut f = facts();
        f.target = AgentId::from("carol");
        f.target_pos = Some((1.0, 1.0));
        assert_eq!(mgr.start(f, TimeMs(2_000)).unwrap_err(), Reject::AgentInBattle);
    }

    #[test]
    fn phase_refusal_and_alliance_gates() {
        let mut mgr = BattleManager::new();

        let mut f = facts();
        f.combat_allowed = false;
        assert_eq!(mgr.start(f, TimeMs(1)).unwrap_err(), Reject::CombatPhaseLocked);

        let mut f = facts();
        f.target_refused = true;
        assert_eq!(mgr.start(f, TimeMs(1)).unwrap_err(), Reject::AgentRefusedViolence);

        let mut f = facts();
        f.allied = true;
        assert_eq!(mgr.start(f, TimeMs(1)).unwrap_err(), Reject::CannotAttackAlly);
    }

    #[test]
    fn self_battle_and_missing_positions_rejected() {
        let mut mgr = BattleManager::new();

        let mut f = facts();
        f.target = a();
        assert!(matches!(mgr.start(f, TimeMs(1)).unwrap_err(), Reject::BadArgs(_)));

        let mut f = facts();
        f.target_pos = None;
        assert_eq!(mgr.start(f, TimeMs(1)).unwrap_err(), Reject::UnknownTargetAgent);
    }

    #[test]
    fn power_is_clamped() {
        let mut mgr = BattleManager::new();
        let mut f = facts();
        f.challenger_power = 9.0;
        let update = mgr.start(f, TimeMs(1)).unwrap();
        let BattleUpdate::Started { power, .. } = update else {
            panic!("expected Started");
        };
        assert_eq!(power[&a()], 1.5);
    }
}

// ── Intent flow ───────────────────────────────────────────────────────────────

mod intent_tests {
    use super::*;

    #[test]
    fn first_intent_waits_second_resolves() {
        let mut mgr = BattleManager::new();
        let id = started_battle(&mut mgr);

        let updates = mgr
            .submit_intent(&a(), &id, BattleIntent::Strike, TimeMs(2_000))
            .unwrap();
        assert_eq!(updates.len(), 1);
        let BattleUpdate::Intent { submitted, waiting_on, .. } = &updates[0] else {
            panic!("expected Intent");
        };
        assert_eq!(submitted, &vec![a()]);
        assert_eq!(waiting_on, &vec![b()]);

        let updates = mgr
            .submit_intent(&b(), &id, BattleIntent::Feint, TimeMs(2_100))
            .unwrap();
        let BattleUpdate::Round { turn, damage, hp, .. } = &updates[0] else {
            panic!("expected Round, got {:?}", updates[0]);
        };
        assert_eq!(*turn, 1);
        assert_eq!(damage[&a()], 28, "strike vs feint");
        assert_eq!(damage[&b()], 14, "feint vs strike");
        assert_eq!(hp[&b()], 72);
        assert_eq!(hp[&a()], 86);
    }

    #[test]
    fn duplicate_and_foreign_submissions_fail() {
        let mut mgr = BattleManager::new();
        let id = started_battle(&mut mgr);

        mgr.submit_intent(&a(), &id, BattleIntent::Guard, TimeMs(2_000))
            .unwrap();
        assert_eq!(
            mgr.submit_intent(&a(), &id, BattleIntent::Strike, TimeMs(2_001))
                .unwrap_err(),
            Reject::DuplicateIntent
        );
        assert_eq!(
            mgr.submit_intent(&AgentId::from("mallory"), &id, BattleIntent::Strike, TimeMs(2_002))
                .unwrap_err(),
            Reject::NotAParticipant
        );
        assert_eq!(
            mgr.submit_intent(&a(), &BattleId::from("battle-999999"), BattleIntent::Guard, TimeMs(1))
                .unwrap_err(),
            Reject::BattleNotFound
        );
    }

    #[test]
    fn unaffordable_intent_downgrades_to_guard() {
        let mut mgr = BattleManager::new();
        let id = started_battle(&mut mgr);

        // Burn Alice down to 0 stamina with five strikes (Bob guards).
        for turn in 0..5 {
            let t = TimeMs(2_000 + turn * 100);
            mgr.submit_intent(&a(), &id, BattleIntent::Strike, t).unwrap();
            mgr.submit_intent(&b(), &id, BattleIntent::Guard, t).unwrap();
        }
        let view = mgr.get(&id).unwrap().view();
        assert_eq!(view.stamina[&a()], 0);

        // A sixth strike costs 20 > 0: forced guard, reported in the event.
        let updates = mgr
            .submit_intent(&a(), &id, BattleIntent::Strike, TimeMs(3_000))
            .unwrap();
        let BattleUpdate::Intent { forced_guard, .. } = &updates[0] else {
            panic!("expected Intent");
        };
        assert_eq!(forced_guard, &vec![a()]);

        let updates = mgr
            .submit_intent(&b(), &id, BattleIntent::Guard, TimeMs(3_100))
            .unwrap();
        let BattleUpdate::Round { intents, stamina, .. } = &updates[0] else {
            panic!("expected Round");
        };
        assert_eq!(intents[&a()], BattleIntent::Guard, "downgraded");
        assert_eq!(stamina[&a()], 10, "guarding recovers stamina");
    }

    #[test]
    fn momentum_read_rewards_repeats() {
        let mut mgr = BattleManager::new();
        let id = started_battle(&mut mgr);

        // Turn 1: no previous intents, no bonus.
        mgr.submit_intent(&a(), &id, BattleIntent::Strike, TimeMs(2_000)).unwrap();
        let updates = mgr
            .submit_intent(&b(), &id, BattleIntent::Feint, TimeMs(2_001))
            .unwrap();
        let BattleUpdate::Round { read_bonus, .. } = &updates[0] else {
            panic!("expected Round");
        };
        assert_eq!(read_bonus[&a()], 0);
        assert_eq!(read_bonus[&b()], 0);

        // Turn 2: both repeat, both read.
        mgr.submit_intent(&a(), &id, BattleIntent::Strike, TimeMs(2_100)).unwrap();
        let updates = mgr
            .submit_intent(&b(), &id, BattleIntent::Feint, TimeMs(2_101))
            .unwrap();
        let BattleUpdate::Round { read_bonus, damage, .. } = &updates[0] else {
            panic!("expected Round");
        };
        assert_eq!(read_bonus[&a()], 5);
        assert_eq!(read_bonus[&b()], 5);
        assert_eq!(damage[&a()], 33, "28 + 5 momentum");
        assert_eq!(damage[&b()], 19, "14 + 5 momentum");
    }

    #[test]
    fn retreat_reads_grant_nothing() {
        let mut mgr = BattleManager::new();
        let id = started_battle(&mut mgr);

        mgr.submit_intent(&a(), &id, BattleIntent::Guard, TimeMs(2_000)).unwrap();
        mgr.submit_intent(&b(), &id, BattleIntent::Approach, TimeMs(2_001)).unwrap();
        // Turn 2: Bob repeats approach; Alice guards again (base 0 → no bonus).
        mgr.submit_intent(&a(), &id, BattleIntent::Guard, TimeMs(2_100)).unwrap();
        let updates = mgr
            .submit_intent(&b(), &id, BattleIntent::Approach, TimeMs(2_101))
            .unwrap();
        let BattleUpdate::Round { read_bonus, damage, .. } = &updates[0] else {
            panic!("expected Round");
        };
        assert_eq!(read_bonus[&a()], 0, "guard base damage is 0: no momentum");
        assert_eq!(damage[&a()], 0);
        assert_eq!(read_bonus[&b()], 5, "approach vs guard has base 4 > 0");
    }
}

// ── Scenario: battle KO (spec walkthrough) ────────────────────────────────────

mod ko_tests {
    use super::*;

    #[test]
    fn strike_vs_feint_kills_in_four_turns() {
        let mut mgr = BattleManager::new();
        let id = started_battle(&mut mgr);

        let mut all = Vec::new();
        for turn in 0..4u64 {
            let t = TimeMs(2_000 + turn * 100);
            mgr.submit_intent(&a(), &id, BattleIntent::Strike, t).unwrap();
            all.extend(
                mgr.submit_intent(&b(), &id, BattleIntent::Feint, t.offset(1))
                    .unwrap(),
            );
        }

        // HP trace for Bob: 100 → 72 → 39 → 6 → 0 (momentum from turn 2 on).
        let BattleUpdate::Ended { reason, winner_id, defeated_ids, .. } = last_ended(&all) else {
            unreachable!()
        };
        assert_eq!(*reason, EndReason::Ko);
        assert_eq!(winner_id.as_ref(), Some(&a()));
        assert_eq!(defeated_ids, &vec![b()]);
        assert_eq!(mgr.active_count(), 0, "record removed after termination");
        assert!(!mgr.is_engaged(&a()));
    }

    #[test]
    fn double_ko_is_a_draw_with_both_defeated() {
        let mut mgr = BattleManager::new();
        let id = started_battle(&mut mgr);

        // Mutual strikes: 18 damage each turn, momentum +5 from turn 2.
        // HP: 100 → 82 → 59 → 36 → 13 → 0 for both sides (turn 5 overkill).
        let mut all = Vec::new();
        for turn in 0..5u64 {
            let t = TimeMs(2_000 + turn * 100);
            // Stamina runs out on turn 5 (5×20)... keep an eye: turn 6 would
            // downgrade, but HP reaches 0 on turn 5 exactly.
            mgr.submit_intent(&a(), &id, BattleIntent::Strike, t).unwrap();
            all.extend(
                mgr.submit_intent(&b(), &id, BattleIntent::Strike, t.offset(1))
                    .unwrap(),
            );
        }
        let BattleUpdate::Ended { reason, winner_id, defeated_ids, .. } = last_ended(&all) else {
            unreachable!()
        };
        assert_eq!(*reason, EndReason::Draw);
        assert!(winner_id.is_none());
        let mut defeated = defeated_ids.clone();
        defeated.sort();
        assert_eq!(defeated, vec![a(), b()]);
    }
}

// ── Retreat, truce, surrender, disconnect ─────────────────────────────────────

mod termination_tests {
    use super::*;

    #[test]
    fn lone_retreat_is_flee_and_still_takes_damage() {
        let mut mgr = BattleManager::new();
        let id = started_battle(&mut mgr);

        mgr.submit_intent(&a(), &id, BattleIntent::Strike, TimeMs(2_000)).unwrap();
        let updates = mgr
            .submit_intent(&b(), &id, BattleIntent::Retreat, TimeMs(2_001))
            .unwrap();

        let BattleUpdate::Round { hp, damage, .. } = &updates[0] else {
            panic!("expected Round");
        };
        assert_eq!(damage[&a()], 30, "strike vs retreat");
        assert_eq!(hp[&b()], 70, "the runner eats the parting blow");

        let BattleUpdate::Ended { reason, winner_id, defeated_ids, .. } = last_ended(&updates)
        else {
            unreachable!()
        };
        assert_eq!(*reason, EndReason::Flee);
        assert!(winner_id.is_none());
        assert!(defeated_ids.is_empty());
    }

    #[test]
    fn mutual_retreat_is_a_bloodless_draw() {
        let mut mgr = BattleManager::new();
        let id = started_battle(&mut mgr);

        mgr.submit_intent(&a(), &id, BattleIntent::Retreat, TimeMs(2_000)).unwrap();
        let updates = mgr
            .submit_intent(&b(), &id, BattleIntent::Retreat, TimeMs(2_001))
            .unwrap();
        let BattleUpdate::Ended { reason, winner_id, defeated_ids, .. } = last_ended(&updates)
        else {
            unreachable!()
        };
        assert_eq!(*reason, EndReason::Draw);
        assert!(winner_id.is_none());
        assert!(defeated_ids.is_empty());
    }

    #[test]
    fn truce_needs_both_and_persists_across_turns() {
        let mut mgr = BattleManager::new();
        let id = started_battle(&mut mgr);

        let (accepted, updates) = mgr.propose_truce(&a(), TimeMs(2_000)).unwrap();
        assert!(!accepted);
        assert!(matches!(
            updates[0],
            BattleUpdate::Intent { truce_proposed_by: Some(ref p), .. } if p == &a()
        ));

        // A full turn passes; the standing offer survives.
        mgr.submit_intent(&a(), &id, BattleIntent::Guard, TimeMs(3_000)).unwrap();
        mgr.submit_intent(&b(), &id, BattleIntent::Guard, TimeMs(3_001)).unwrap();

        let (accepted, updates) = mgr.propose_truce(&b(), TimeMs(4_000)).unwrap();
        assert!(accepted);
        let BattleUpdate::Ended { reason, winner_id, .. } = last_ended(&updates) else {
            unreachable!()
        };
        assert_eq!(*reason, EndReason::Truce);
        assert!(winner_id.is_none());
        assert_eq!(mgr.active_count(), 0);
    }

    #[test]
    fn surrender_crowns_the_opponent() {
        let mut mgr = BattleManager::new();
        started_battle(&mut mgr);

        let updates = mgr.surrender(&b(), TimeMs(2_000)).unwrap();
        let BattleUpdate::Ended { reason, winner_id, loser_id, defeated_ids, .. } =
            last_ended(&updates)
        else {
            unreachable!()
        };
        assert_eq!(*reason, EndReason::Surrender);
        assert_eq!(winner_id.as_ref(), Some(&a()));
        assert_eq!(loser_id.as_ref(), Some(&b()));
        assert!(defeated_ids.is_empty(), "surrender is not a death");
    }

    #[test]
    fn disconnect_forfeits() {
        let mut mgr = BattleManager::new();
        started_battle(&mut mgr);

        let update = mgr.handle_agent_leave(&a()).unwrap();
        let BattleUpdate::Ended { reason, winner_id, .. } = &update else {
            panic!("expected Ended");
        };
        assert_eq!(*reason, EndReason::Disconnect);
        assert_eq!(winner_id.as_ref(), Some(&b()));
        assert!(mgr.handle_agent_leave(&a()).is_none(), "already gone");
    }
}

// ── Timeouts ──────────────────────────────────────────────────────────────────

mod timeout_tests {
    use super::*;

    #[test]
    fn stale_turn_auto_guards_the_missing_side() {
        let mut mgr = BattleManager::new();
        let id = started_battle(&mut mgr); // turn started at t=1000

        mgr.submit_intent(&a(), &id, BattleIntent::Strike, TimeMs(2_000)).unwrap();

        assert!(mgr.check_timeouts(TimeMs(30_999)).is_empty(), "29.999 s: not yet");

        let updates = mgr.check_timeouts(TimeMs(31_001));
        let BattleUpdate::Intent { timed_out, forced_guard, .. } = &updates[0] else {
            panic!("expected the timeout intent event, got {:?}", updates[0]);
        };
        assert_eq!(timed_out, &vec![b()]);
        assert_eq!(forced_guard, &vec![b()]);

        let BattleUpdate::Round { intents, damage, hp, .. } = &updates[1] else {
            panic!("expected Round, got {:?}", updates[1]);
        };
        assert_eq!(intents[&b()], BattleIntent::Guard);
        assert_eq!(damage[&a()], 10, "strike vs guard");
        assert!(hp[&b()] >= 90);
    }

    #[test]
    fn timeout_with_no_intents_guards_both_and_continues() {
        let mut mgr = BattleManager::new();
        let id = started_battle(&mut mgr);

        let updates = mgr.check_timeouts(TimeMs(40_000));
        assert!(matches!(updates[0], BattleUpdate::Intent { .. }));
        assert!(matches!(updates[1], BattleUpdate::Round { .. }));
        assert_eq!(updates.len(), 2, "guard/guard does not end the battle");

        let view = mgr.get(&id).unwrap().view();
        assert_eq!(view.turn, 2);
        assert_eq!(view.turn_started_at, TimeMs(40_000), "turn clock reset");
    }
}
