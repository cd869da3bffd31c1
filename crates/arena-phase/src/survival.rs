//! The survival contract: round-level prize and settlement rules.
//!
//! The contract never looks at the world directly.  The simulation layer
//! hands it the current living / refusing sets after every event that can
//! settle a round (a death, a refusal, a departure, the timer), and the
//! contract decides whether the round is over and who gets paid.

use arena_core::{AgentId, Reject, RejectResult, SurvivalStatus, TimeMs};

/// Wire view of the contract.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurvivalState {
    pub status: SurvivalStatus,
    pub prize_pool_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_agent_id: Option<AgentId>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub winner_agent_ids: Vec<AgentId>,
    pub refusal_agent_ids: Vec<AgentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_started_at: Option<TimeMs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_ends_at: Option<TimeMs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<TimeMs>,
    pub summary: String,
}

/// Round settlement state machine.
pub struct SurvivalContract {
    status: SurvivalStatus,
    prize_pool_usd: f64,
    winner_agent_id: Option<AgentId>,
    winner_agent_ids: Vec<AgentId>,
    refusal_agent_ids: Vec<AgentId>,
    round_started_at: Option<TimeMs>,
    round_ends_at: Option<TimeMs>,
    round_duration_ms: Option<u64>,
    settled_at: Option<TimeMs>,
    summary: String,
}

impl SurvivalContract {
    pub fn new() -> Self {
        Self {
            status: SurvivalStatus::Waiting,
            prize_pool_usd: 0.0,
            winner_agent_id: None,
            winner_agent_ids: Vec::new(),
            refusal_agent_ids: Vec::new(),
            round_started_at: None,
            round_ends_at: None,
            round_duration_ms: None,
            settled_at: None,
            summary: "waiting for the round to start".to_owned(),
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn status(&self) -> SurvivalStatus {
        self.status
    }

    /// Combat gate: duels only run while the round is active.
    pub fn combat_open(&self) -> bool {
        self.status == SurvivalStatus::Active
    }

    /// Registration gate: settled rounds admit no new entrants.
    pub fn accepts_registration(&self) -> bool {
        !matches!(self.status, SurvivalStatus::Winner | SurvivalStatus::Refused)
    }

    /// Betting closes once the round settles.
    pub fn accepts_bets(&self) -> bool {
        !self.status.is_settled()
    }

    pub fn has_refused(&self, id: &AgentId) -> bool {
        self.refusal_agent_ids.contains(id)
    }

    pub fn state(&self) -> SurvivalState {
        SurvivalState {
            status:            self.status,
            prize_pool_usd:    self.prize_pool_usd,
            winner_agent_id:   self.winner_agent_id.clone(),
            winner_agent_ids:  self.winner_agent_ids.clone(),
            refusal_agent_ids: self.refusal_agent_ids.clone(),
            round_started_at:  self.round_started_at,
            round_ends_at:     self.round_ends_at,
            round_duration_ms: self.round_duration_ms,
            settled_at:        self.settled_at,
            summary:           self.summary.clone(),
        }
    }

    // ── Transitions ───────────────────────────────────────────────────────

    /// Admin start.  Only legal from `waiting`; a settled round must be
    /// reset first.
    pub fn start(
        &mut self,
        prize_pool_usd: f64,
        duration_ms: Option<u64>,
        now: TimeMs,
    ) -> RejectResult<()> {
        if self.status != SurvivalStatus::Waiting {
            return Err(Reject::SurvivalRoundClosed);
        }
        self.status = SurvivalStatus::Active;
        self.prize_pool_usd = prize_pool_usd;
        self.round_started_at = Some(now);
        self.round_duration_ms = duration_ms;
        self.round_ends_at = duration_ms.map(|d| now.offset(d));
        self.summary = format!("round active — ${prize_pool_usd:.2} pool");
        Ok(())
    }

    /// Bets grow the pool while the round is open.
    pub fn add_to_pool(&mut self, amount_usd: f64) {
        if self.accepts_bets() && amount_usd.is_finite() && amount_usd > 0.0 {
            self.prize_pool_usd += amount_usd;
        }
    }

    pub fn record_refusal(&mut self, id: &AgentId, refused: bool) {
        if refused {
            if !self.refusal_agent_ids.contains(id) {
                self.refusal_agent_ids.push(id.clone());
            }
        } else {
            self.refusal_agent_ids.retain(|r| r != id);
        }
    }

    /// Timer settlement: living non-refusers split the pool.
    ///
    /// Returns the terminal status when the timer fired.
    pub fn check_timer(&mut self, now: TimeMs, living: &[AgentId]) -> Option<SurvivalStatus> {
        if self.status != SurvivalStatus::Active {
            return None;
        }
        let ends_at = self.round_ends_at?;
        if now < ends_at {
            return None;
        }
        let survivors: Vec<AgentId> = living
            .iter()
            .filter(|id| !self.has_refused(id))
            .cloned()
            .collect();
        self.status = SurvivalStatus::TimerEnded;
        self.settled_at = Some(now);
        self.summary = match survivors.len() {
            0 => "round timer expired with no eligible survivors".to_owned(),
            n => format!(
                "round timer expired — {n} survivor(s) split ${:.2}",
                self.prize_pool_usd
            ),
        };
        self.winner_agent_ids = survivors;
        Some(SurvivalStatus::TimerEnded)
    }

    /// Event-driven settlement, run after deaths, refusals, and departures.
    ///
    /// - exactly one living non-refuser → `winner`
    /// - living agents exist but all refused (or nobody is left) → `refused`
    pub fn reevaluate(&mut self, living: &[AgentId], now: TimeMs) -> Option<SurvivalStatus> {
        if self.status != SurvivalStatus::Active {
            return None;
        }
        let non_refusers: Vec<&AgentId> =
            living.iter().filter(|id| !self.has_refused(id)).collect();

        if non_refusers.len() == 1 {
            let winner = non_refusers[0].clone();
            self.status = SurvivalStatus::Winner;
            self.settled_at = Some(now);
            self.summary = format!(
                "{winner} is the last one standing and claims ${:.2}",
                self.prize_pool_usd
            );
            self.winner_agent_id = Some(winner);
            return Some(SurvivalStatus::Winner);
        }
        if non_refusers.is_empty() {
            self.status = SurvivalStatus::Refused;
            self.settled_at = Some(now);
            self.summary = if living.is_empty() {
                "no survivors remained; the pool goes unclaimed".to_owned()
            } else {
                "every living agent refused the prize".to_owned()
            };
            return Some(SurvivalStatus::Refused);
        }
        None
    }

    /// Back to `waiting`; the caller revives profiles and ejects agents.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for SurvivalContract {
    fn default() -> Self {
        Self::new()
    }
}
