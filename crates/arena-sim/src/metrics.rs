//! Simulation counters surfaced through `room-info` and operator logs.

/// Rolling counters updated once per tick (plus rejection tallies from the
/// command path).  Plain fields — everything runs on the simulation task.
#[derive(Clone, Debug, Default)]
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimMetrics {
    /// Ticks completed since startup.
    pub ticks: u64,
    /// Ticks whose processing exceeded the nominal period.
    pub slow_ticks: u64,
    /// Duration of the most recent tick, milliseconds.
    pub last_tick_ms: f64,
    /// Commands applied to world state since startup.
    pub commands_applied: u64,
    /// Commands rejected at validation or policy gates since startup.
    pub commands_rejected: u64,
    /// Commands dropped because application panicked (bug-class failures).
    pub commands_faulted: u64,
    /// In-world agents at the last tick.
    pub active_agents: usize,
    /// Active battles at the last tick.
    pub active_battles: usize,
    /// Pending commands after the last drain (0 unless producers outpace
    /// the drain within a tick).
    pub queue_depth: usize,
    /// Connected observers, reported by the bridge.
    pub observer_count: usize,
}
