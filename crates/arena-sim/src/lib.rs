//! `arena-sim` — the simulation core.
//!
//! The [`Arena`] owns one of everything: registry, world state, spatial
//! grid, command queue, battle manager, phase manager, survival contract,
//! alliance book.  All mutation happens through two entry points, both
//! called from a single task:
//!
//! - [`Arena::execute`] — an external verb (HTTP IPC, observer bet), judged
//!   against current state and usually ending as an enqueued message.
//! - [`Arena::tick`] — one fixed-rate simulation step: timers, queue drain,
//!   state application, hook dispatch, grid rebuild.
//!
//! The tick is the serialization point; nothing here is `Sync` and nothing
//! needs to be.  Observer fan-out (steps 6–7 of the tick contract) lives in
//! the server crate, which reads the [`TickOutput`] and the public fields.

pub mod arena;
pub mod builder;
pub mod command;
pub mod hooks;
pub mod metrics;


pub use arena::{Arena, TickOutput};
pub use builder::{ArenaBuilder, ArenaConfig};
pub use command::{RegisterArgs, Reply, WorldCommand};
pub use hooks::{ArenaHooks, HookSet, NoopHooks};
pub use metrics::SimMetrics;
