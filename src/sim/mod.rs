//! Encounter simulation
//!
//! All gameplay logic lives here:
//! - Fixed timestep physics, variable-step logic
//! - Stable iteration order (by entity ID)
//! - Structural changes deferred to end of tick
//! - No rendering or platform dependencies

pub mod collision;
pub mod combat;
pub mod deferred;
pub mod progress;
pub mod schedule;
pub mod spatial;
pub mod spawn;
pub mod state;
pub mod steering;
pub mod tick;
pub mod wave;

pub use collision::{CollisionResult, circle_collision, circles_touch, resolve_penetration};
pub use combat::{CombatResolver, DamageOutcome, DeathOutcome};
pub use deferred::{DeferredQueue, Mutations};
pub use progress::{ProgressCounters, ProgressTracker, RunSummary};
pub use schedule::{Scheduler, Timed, TimerHandle};
pub use spatial::{SpatialQuery, WorldSnapshot};
pub use spawn::SpawnPlacer;
pub use state::{
    Agent, AgentKind, AgentRef, AgentState, Bullet, EntityId, EntityIds, GameEvent, GamePhase,
    Pickup, Player, PowerUpKind, Spawn, World,
};
pub use steering::{steer_direction, step_agent};
pub use tick::{Simulation, TickInput};
pub use wave::{WaveComposition, WaveDirector, WavePhase, base_count, difficulty, generate_composition};
