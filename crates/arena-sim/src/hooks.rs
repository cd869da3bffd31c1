//! Tick/event hook traits for observers of the simulation loop.

use std::panic::{self, AssertUnwindSafe};

use tracing::error;

use arena_core::{TickId, TimeMs, WorldMessage};
use arena_registry::AgentRegistry;

use crate::metrics::SimMetrics;

/// Callbacks invoked by [`Arena::tick`][crate::Arena::tick] at key points.
///
/// All methods have default no-op implementations, and all are infallible
/// from the loop's perspective — implementations hold their errors
/// internally (log, counter, dead-letter) rather than propagating.  As a
/// backstop, [`HookSet`] catches unwinds per hook call, so even a panicking
/// hook cannot stall the simulation or starve the hooks after it.
pub trait ArenaHooks {
    /// Called at the very start of each tick, before the timers run.
    fn on_tick_start(&mut self, _tick: TickId, _now: TimeMs) {}

    /// Called with the tick's applied event list, in enqueue order.
    /// Used by the relay publisher, the event-batch sink, and metrics.
    fn on_events(&mut self, _tick: TickId, _events: &[WorldMessage]) {}

    /// Called at the end of each tick with read access to the registry
    /// (for the debounced persistence flush) and the metrics counters.
    fn on_tick_end(&mut self, _tick: TickId, _registry: &AgentRegistry, _metrics: &SimMetrics) {}
}

/// An [`ArenaHooks`] that does nothing.  Use when driving ticks in tests.
pub struct NoopHooks;

impl ArenaHooks for NoopHooks {}

/// An ordered collection of boxed hooks, fanned out in registration order.
///
/// Each hook call runs under unwind isolation: a panic is logged with the
/// tick number and the remaining hooks still run.
#[derive(Default)]
pub struct HookSet {
    hooks: Vec<Box<dyn ArenaHooks + Send>>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hook: Box<dyn ArenaHooks + Send>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl ArenaHooks for HookSet {
    fn on_tick_start(&mut self, tick: TickId, now: TimeMs) {
        for hook in &mut self.hooks {
            if panic::catch_unwind(AssertUnwindSafe(|| hook.on_tick_start(tick, now))).is_err() {
                error!(tick = tick.0, "tick-start hook panicked; continuing");
            }
        }
    }

    fn on_events(&mut self, tick: TickId, events: &[WorldMessage]) {
        for hook in &mut self.hooks {
            if panic::catch_unwind(AssertUnwindSafe(|| hook.on_events(tick, events))).is_err() {
                error!(tick = tick.0, "event hook panicked; continuing");
            }
        }
    }

    fn on_tick_end(&mut self, tick: TickId, registry: &AgentRegistry, metrics: &SimMetrics) {
        for hook in &mut self.hooks {
            if panic::catch_unwind(AssertUnwindSafe(|| hook.on_tick_end(tick, registry, metrics)))
                .is_err()
            {
                error!(tick = tick.0, "tick-end hook panicked; continuing");
            }
        }
    }
}
