//! Malware Arena - encounter simulation core for a wave-based arena survival game
//!
//! Core modules:
//! - `sim`: Simulation (waves, steering, combat, progress)
//! - `tuning`: Data-driven game balance
//! - `presentation`: Notifications consumed by the HUD/menus
//! - `error`: Configuration errors and non-fatal simulation faults

pub mod error;
pub mod presentation;
pub mod sim;
pub mod tuning;

pub use error::{SimFault, TuningError};
pub use presentation::{LogSink, Notice, PresentationSink, RecordingSink};
pub use tuning::Tuning;

use glam::Vec2;
use rand::Rng;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz physics)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Arena half extents (arena is centered on the origin)
    pub const ARENA_HALF_WIDTH: f32 = 320.0;
    pub const ARENA_HALF_HEIGHT: f32 = 180.0;

    /// Player body
    pub const PLAYER_RADIUS: f32 = 10.0;
    /// Projectile body
    pub const BULLET_RADIUS: f32 = 4.0;
    /// Pickup body
    pub const PICKUP_RADIUS: f32 = 8.0;

    /// Delay between the last counting death and the next wave
    pub const POST_WAVE_DELAY: f32 = 1.5;
    /// Hostile hurt flash
    pub const AGENT_HURT_DURATION: f32 = 0.2;
    /// Player hurt window
    pub const PLAYER_HURT_DURATION: f32 = 0.3;

    /// Separation steering
    pub const SEPARATION_RADIUS: f32 = 16.0;
    pub const SEPARATION_WEIGHT: f32 = 0.8;
    /// Extra reach for contact attacks; penetration resolution leaves bodies
    /// touching only up to float error
    pub const CONTACT_SLOP: f32 = 0.5;

    /// Spawn placement
    pub const SPAWN_ATTEMPTS: u32 = 10;
    pub const SPAWN_JITTER: f32 = 24.0;
    /// Offspring scatter around a dead splitter
    pub const SPLIT_JITTER: f32 = 8.0;

    /// Damage dealt by one contact attack or one bullet
    pub const CONTACT_DAMAGE: u32 = 1;
    pub const BULLET_DAMAGE: u32 = 1;
}

/// Uniform random offset in `[-half_extent, +half_extent]` on each axis
#[inline]
pub fn random_offset<R: Rng>(rng: &mut R, half_extent: f32) -> Vec2 {
    if half_extent <= 0.0 {
        return Vec2::ZERO;
    }
    Vec2::new(
        rng.random_range(-half_extent..=half_extent),
        rng.random_range(-half_extent..=half_extent),
    )
}

/// Clamp a body of `radius` inside the arena rectangle
#[inline]
pub fn clamp_to_arena(pos: Vec2, radius: f32) -> Vec2 {
    use consts::{ARENA_HALF_HEIGHT, ARENA_HALF_WIDTH};
    let max = Vec2::new(
        (ARENA_HALF_WIDTH - radius).max(0.0),
        (ARENA_HALF_HEIGHT - radius).max(0.0),
    );
    pos.clamp(-max, max)
}

/// True if the point lies inside the arena rectangle
#[inline]
pub fn in_arena(pos: Vec2) -> bool {
    pos.x.abs() <= consts::ARENA_HALF_WIDTH && pos.y.abs() <= consts::ARENA_HALF_HEIGHT
}
