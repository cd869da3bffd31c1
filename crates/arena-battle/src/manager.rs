//! The battle manager: start preconditions, intent flow, turn resolution,
//! truce/surrender/disconnect, and the timeout scan.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use arena_core::constants::{BATTLE_START_RANGE, TURN_TIMEOUT_MS};
use arena_core::geom;
use arena_core::{
    AgentId, BattleId, BattleIntent, BattleUpdate, EndReason, Reject, RejectResult, TimeMs,
};

use crate::battle::{BattleRecord, BattleView, SubmittedIntent};
use crate::resolve::{self, GUARD_RECOVERY, HP_MAX, STAMINA_MAX};

// ── StartFacts ────────────────────────────────────────────────────────────────

/// Everything the manager needs to judge a start request.  The caller
/// gathers positions, phase gating, refusal flags, and alliance state; the
/// manager owns the precedence of the checks.
pub struct StartFacts {
    pub challenger: AgentId,
    pub target: AgentId,
    pub challenger_pos: Option<(f64, f64)>,
    pub target_pos: Option<(f64, f64)>,
    pub challenger_power: f64,
    pub target_power: f64,
    /// Current phase permits combat.
    pub combat_allowed: bool,
    pub challenger_refused: bool,
    pub target_refused: bool,
    pub allied: bool,
}

// ── BattleManager ─────────────────────────────────────────────────────────────

/// Owner of every active [`BattleRecord`] and the agent→battle index.
#[derive(Default)]
pub struct BattleManager {
    battles: FxHashMap<BattleId, BattleRecord>,
    agent_to_battle: FxHashMap<AgentId, BattleId>,
    seq: u64,
}

impl BattleManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn is_engaged(&self, id: &AgentId) -> bool {
        self.agent_to_battle.contains_key(id)
    }

    pub fn battle_id_of(&self, id: &AgentId) -> Option<&BattleId> {
        self.agent_to_battle.get(id)
    }

    pub fn get(&self, battle_id: &BattleId) -> Option<&BattleRecord> {
        self.battles.get(battle_id)
    }

    pub fn active_count(&self) -> usize {
        self.battles.len()
    }

    /// Views of every active battle, ordered by id for stable output.
    pub fn views(&self) -> Vec<BattleView> {
        let mut views: Vec<BattleView> = self.battles.values().map(BattleRecord::view).collect();
        views.sort_by(|a, b| a.battle_id.cmp(&b.battle_id));
        views
    }

    // ── Start ─────────────────────────────────────────────────────────────

    /// Create a duel.  Check order: self-target, positions, engagement,
    /// range, phase, refusal, alliance — first failure wins.
    pub fn start(&mut self, facts: StartFacts, now: TimeMs) -> RejectResult<BattleUpdate> {
        if facts.challenger == facts.target {
            return Err(Reject::BadArgs("cannot battle yourself".into()));
        }
        let Some((cx, cz)) = facts.challenger_pos else {
            return Err(Reject::UnknownAgent);
        };
        let Some((tx, tz)) = facts.target_pos else {
            return Err(Reject::UnknownTargetAgent);
        };
        if self.is_engaged(&facts.challenger) || self.is_engaged(&facts.target) {
            return Err(Reject::AgentInBattle);
        }
        let distance = geom::dist(cx, cz, tx, tz);
        if distance > BATTLE_START_RANGE {
            return Err(Reject::TooFar { distance, max: BATTLE_START_RANGE });
        }
        if !facts.combat_allowed {
            return Err(Reject::CombatPhaseLocked);
        }
        if facts.challenger_refused || facts.target_refused {
            return Err(Reject::AgentRefusedViolence);
        }
        if facts.allied {
            return Err(Reject::CannotAttackAlly);
        }

        self.seq += 1;
        let battle_id = BattleId::from(format!("battle-{:06}", self.seq));
        let participants = [facts.challenger.clone(), facts.target.clone()];

        let pair = |a: f64, b: f64| -> BTreeMap<AgentId, f64> {
            BTreeMap::from([
                (facts.challenger.clone(), a),
                (facts.target.clone(), b),
            ])
        };
        let flat = |v: i32| -> BTreeMap<AgentId, i32> {
            BTreeMap::from([
                (facts.challenger.clone(), v),
                (facts.target.clone(), v),
            ])
        };

        let record = BattleRecord {
            battle_id:       battle_id.clone(),
            participants:    participants.clone(),
            hp:              flat(HP_MAX),
            stamina:         flat(STAMINA_MAX),
            power:           pair(
                facts.challenger_power.clamp(1.0, 1.5),
                facts.target_power.clamp(1.0, 1.5),
            ),
            turn:            1,
            intents:         BTreeMap::new(),
            prev_intents:    BTreeMap::new(),
            truce_proposals: Default::default(),
            turn_started_at: now,
            started_at:      now,
            updated_at:      now,
        };

        let started = BattleUpdate::Started {
            battle_id:    battle_id.clone(),
            participants: participants.clone(),
            hp:           record.hp.clone(),
            stamina:      record.stamina.clone(),
            power:        record.power.clone(),
        };

        for participant in &participants {
            self.agent_to_battle
                .insert(participant.clone(), battle_id.clone());
        }
        self.battles.insert(battle_id, record);
        Ok(started)
    }

    // ── Intent submission ─────────────────────────────────────────────────

    /// Submit one intent for the current turn.
    ///
    /// Unaffordable intents are silently downgraded to guard (the emitted
    /// event reports the substitution).  The turn resolves when both sides
    /// have submitted.
    pub fn submit_intent(
        &mut self,
        agent: &AgentId,
        battle_id: &BattleId,
        intent: BattleIntent,
        now: TimeMs,
    ) -> RejectResult<Vec<BattleUpdate>> {
        let record = self
            .battles
            .get_mut(battle_id)
            .ok_or(Reject::BattleNotFound)?;
        if !record.is_participant(agent) {
            return Err(Reject::NotAParticipant);
        }
        if record.intents.contains_key(agent) {
            return Err(Reject::DuplicateIntent);
        }

        let affordable = resolve::stamina_cost(intent) <= record.stamina[agent];
        let submitted = if affordable {
            SubmittedIntent { intent, forced: false }
        } else {
            SubmittedIntent { intent: BattleIntent::Guard, forced: true }
        };
        record.intents.insert(agent.clone(), submitted);
        record.updated_at = now;

        if record.intents.len() == 2 {
            return Ok(self.resolve_battle(battle_id, &[], now));
        }

        let record = &self.battles[battle_id];
        Ok(vec![BattleUpdate::Intent {
            battle_id:         battle_id.clone(),
            turn:              record.turn,
            submitted:         vec![agent.clone()],
            waiting_on:        vec![record.opponent_of(agent).clone()],
            forced_guard:      if submitted.forced { vec![agent.clone()] } else { vec![] },
            timed_out:         vec![],
            truce_proposed_by: None,
        }])
    }

    // ── Truce / surrender / disconnect ────────────────────────────────────

    /// Propose (or re-affirm) a truce.  Returns `(accepted, updates)`:
    /// accepted once both participants have proposed.
    pub fn propose_truce(
        &mut self,
        agent: &AgentId,
        now: TimeMs,
    ) -> RejectResult<(bool, Vec<BattleUpdate>)> {
        let battle_id = self
            .agent_to_battle
            .get(agent)
            .cloned()
            .ok_or(Reject::BattleNotFound)?;
        let record = self.battles.get_mut(&battle_id).ok_or(Reject::BattleNotFound)?;

        record.truce_proposals.insert(agent.clone());
        record.updated_at = now;

        let both_agreed = record
            .participants
            .iter()
            .all(|p| record.truce_proposals.contains(p));
        if both_agreed {
            let [a, b] = record.participants.clone();
            let summary = format!("{a} and {b} agreed to a truce");
            let ended = self.finish(&battle_id, EndReason::Truce, None, None, vec![], summary);
            return Ok((true, vec![ended]));
        }

        let record = &self.battles[&battle_id];
        Ok((
            false,
            vec![BattleUpdate::Intent {
                battle_id:         battle_id.clone(),
                turn:              record.turn,
                submitted:         record.intents.keys().cloned().collect(),
                waiting_on:        record
                    .participants
                    .iter()
                    .filter(|p| !record.intents.contains_key(*p))
                    .cloned()
                    .collect(),
                forced_guard:      vec![],
                timed_out:         vec![],
                truce_proposed_by: Some(agent.clone()),
            }],
        ))
    }

    /// Immediate loss; the opponent wins.  Not a defeat — no permanent death.
    pub fn surrender(&mut self, agent: &AgentId, _now: TimeMs) -> RejectResult<Vec<BattleUpdate>> {
        let battle_id = self
            .agent_to_battle
            .get(agent)
            .cloned()
            .ok_or(Reject::BattleNotFound)?;
        let winner = self.battles[&battle_id].opponent_of(agent).clone();
        let summary = format!("{agent} surrendered to {winner}");
        let ended = self.finish(
            &battle_id,
            EndReason::Surrender,
            Some(winner),
            Some(agent.clone()),
            vec![],
            summary,
        );
        Ok(vec![ended])
    }

    /// A participant left the world; the opponent wins by default.
    pub fn handle_agent_leave(&mut self, agent: &AgentId) -> Option<BattleUpdate> {
        let battle_id = self.agent_to_battle.get(agent).cloned()?;
        let winner = self.battles[&battle_id].opponent_of(agent).clone();
        let summary = format!("{agent} disconnected; {winner} wins by default");
        Some(self.finish(
            &battle_id,
            EndReason::Disconnect,
            Some(winner),
            Some(agent.clone()),
            vec![],
            summary,
        ))
    }

    // ── Timeouts ──────────────────────────────────────────────────────────

    /// Auto-guard participants that sat on a turn for 30 s, then resolve.
    pub fn check_timeouts(&mut self, now: TimeMs) -> Vec<BattleUpdate> {
        let expired: Vec<BattleId> = self
            .battles
            .values()
            .filter(|record| now.since(record.turn_started_at) >= TURN_TIMEOUT_MS)
            .map(|record| record.battle_id.clone())
            .collect();

        let mut updates = Vec::new();
        for battle_id in expired {
            let Some(record) = self.battles.get_mut(&battle_id) else {
                continue;
            };
            let timed_out: Vec<AgentId> = record
                .participants
                .iter()
                .filter(|p| !record.intents.contains_key(*p))
                .cloned()
                .collect();
            for agent in &timed_out {
                record.intents.insert(
                    agent.clone(),
                    SubmittedIntent { intent: BattleIntent::Guard, forced: true },
                );
            }
            updates.extend(self.resolve_battle(&battle_id, &timed_out, now));
        }
        updates
    }

    /// Round reset: drop every record without emitting events.
    pub fn clear(&mut self) {
        self.battles.clear();
        self.agent_to_battle.clear();
    }

    // ── Resolution ────────────────────────────────────────────────────────

    /// Resolve the current turn of `battle_id`.  Both intents are present.
    ///
    /// `timed_out` is non-empty only on the timeout path and is reported in
    /// a leading intent event.
    fn resolve_battle(
        &mut self,
        battle_id: &BattleId,
        timed_out: &[AgentId],
        now: TimeMs,
    ) -> Vec<BattleUpdate> {
        let mut updates = Vec::new();

        let Some(record) = self.battles.get_mut(battle_id) else {
            return updates;
        };
        debug_assert_eq!(record.intents.len(), 2);

        if !timed_out.is_empty() {
            updates.push(BattleUpdate::Intent {
                battle_id:         battle_id.clone(),
                turn:              record.turn,
                submitted:         record.intents.keys().cloned().collect(),
                waiting_on:        vec![],
                forced_guard:      timed_out.to_vec(),
                timed_out:         timed_out.to_vec(),
                truce_proposed_by: None,
            });
        }

        let [a, b] = record.participants.clone();
        let ia = record.intents[&a].intent;
        let ib = record.intents[&b].intent;

        // 1. Stamina: guard recovers, everything else costs.
        for (agent, intent) in [(&a, ia), (&b, ib)] {
            if let Some(stamina) = record.stamina.get_mut(agent) {
                *stamina = if intent == BattleIntent::Guard {
                    (*stamina + GUARD_RECOVERY).min(STAMINA_MAX)
                } else {
                    (*stamina - resolve::stamina_cost(intent)).max(0)
                };
            }
        }

        // 2.–3. Momentum read plus the damage matrix.
        let read_a = record.prev_intents.get(&b) == Some(&ib);
        let read_b = record.prev_intents.get(&a) == Some(&ia);
        let base_a = resolve::base_damage(ia, ib);
        let base_b = resolve::base_damage(ib, ia);
        let damage_a = resolve::scaled_damage(base_a, record.power[&a], read_a && base_a > 0);
        let damage_b = resolve::scaled_damage(base_b, record.power[&b], read_b && base_b > 0);

        // 4. Apply damage; remember this turn's intents for the next read.
        if let Some(hp) = record.hp.get_mut(&b) {
            *hp = (*hp - damage_a).max(0);
        }
        if let Some(hp) = record.hp.get_mut(&a) {
            *hp = (*hp - damage_b).max(0);
        }
        record.prev_intents = BTreeMap::from([(a.clone(), ia), (b.clone(), ib)]);
        record.updated_at = now;

        // 5. Round event.
        let turn = record.turn;
        updates.push(BattleUpdate::Round {
            battle_id:  battle_id.clone(),
            turn,
            intents:    BTreeMap::from([(a.clone(), ia), (b.clone(), ib)]),
            damage:     BTreeMap::from([(a.clone(), damage_a), (b.clone(), damage_b)]),
            read_bonus: BTreeMap::from([
                (a.clone(), if read_a && base_a > 0 { resolve::MOMENTUM_BONUS } else { 0 }),
                (b.clone(), if read_b && base_b > 0 { resolve::MOMENTUM_BONUS } else { 0 }),
            ]),
            hp:      record.hp.clone(),
            stamina: record.stamina.clone(),
        });

        // 6. End conditions, in precedence order.
        let hp_a = record.hp[&a];
        let hp_b = record.hp[&b];
        let retreat_a = ia == BattleIntent::Retreat;
        let retreat_b = ib == BattleIntent::Retreat;

        let ended = if retreat_a && retreat_b {
            Some((EndReason::Draw, None, None, vec![], format!("{a} and {b} both withdrew")))
        } else if retreat_a || retreat_b {
            let runner = if retreat_a { &a } else { &b };
            Some((EndReason::Flee, None, None, vec![], format!("{runner} fled the duel")))
        } else if hp_a <= 0 && hp_b <= 0 {
            Some((
                EndReason::Draw,
                None,
                None,
                vec![a.clone(), b.clone()],
                format!("{a} and {b} fell together"),
            ))
        } else if hp_b <= 0 {
            Some((
                EndReason::Ko,
                Some(a.clone()),
                Some(b.clone()),
                vec![b.clone()],
                format!("{a} knocked out {b}"),
            ))
        } else if hp_a <= 0 {
            Some((
                EndReason::Ko,
                Some(b.clone()),
                Some(a.clone()),
                vec![a.clone()],
                format!("{b} knocked out {a}"),
            ))
        } else {
            None
        };

        match ended {
            Some((reason, winner, loser, defeated, summary)) => {
                updates.push(self.finish(battle_id, reason, winner, loser, defeated, summary));
            }
            None => {
                record.turn += 1;
                record.intents.clear();
                record.turn_started_at = now;
            }
        }
        updates
    }

    /// Emit the `ended` event and drop the record and its index entries.
    fn finish(
        &mut self,
        battle_id: &BattleId,
        reason: EndReason,
        winner_id: Option<AgentId>,
        loser_id: Option<AgentId>,
        defeated_ids: Vec<AgentId>,
        summary: String,
    ) -> BattleUpdate {
        if let Some(record) = self.battles.remove(battle_id) {
            for participant in &record.participants {
                self.agent_to_battle.remove(participant);
            }
        }
        BattleUpdate::Ended {
            battle_id: battle_id.clone(),
            reason,
            winner_id,
            loser_id,
            defeated_ids,
            summary,
        }
    }
}
