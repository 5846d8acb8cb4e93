//! Per-agent steering and contact attacks
//!
//! Straight-line chase toward the player plus local repulsion from same-kind
//! neighbors. No pathfinding.

use glam::Vec2;

use super::collision::{circles_touch, resolve_penetration};
use super::spatial::SpatialQuery;
use super::state::{Agent, AgentState};
use crate::clamp_to_arena;
use crate::consts::CONTACT_SLOP;
use crate::tuning::SteeringTuning;

/// Heading for `agent` this tick, or zero if chase and separation cancel out
pub fn steer_direction<Q: SpatialQuery + ?Sized>(
    agent: &Agent,
    target: Vec2,
    space: &Q,
    tuning: &SteeringTuning,
) -> Vec2 {
    let chase = (target - agent.pos).normalize_or_zero();

    let separation: Vec2 = space
        .query_nearby(agent.pos, tuning.separation_radius, Some(agent.kind))
        .into_iter()
        .filter(|other| other.id != agent.id)
        .map(|other| (agent.pos - other.pos).normalize_or_zero())
        .sum();

    (chase + separation * tuning.separation_weight).normalize_or_zero()
}

/// Advance one agent by a fixed tick
///
/// Moves toward `target`, keeps the agent out of the target's body and inside
/// the arena, and counts the attack cooldown down. Returns true when the agent
/// lands a contact attack this tick (the cooldown has already been reset).
pub fn step_agent<Q: SpatialQuery + ?Sized>(
    agent: &mut Agent,
    target: Vec2,
    target_radius: f32,
    space: &Q,
    tuning: &SteeringTuning,
    dt: f32,
) -> bool {
    if !agent.is_alive() {
        return false;
    }

    agent.tick_cooldown(dt);

    let direction = steer_direction(agent, target, space, tuning);
    agent.vel = direction * agent.speed;
    agent.pos += agent.vel * dt;
    agent.pos = resolve_penetration(agent.pos, agent.radius, target, target_radius);
    agent.pos = clamp_to_arena(agent.pos, agent.radius);

    // Hurt is left by its own timer, not by movement
    if agent.state != AgentState::Hurt {
        agent.state = if agent.vel == Vec2::ZERO {
            AgentState::Idle
        } else {
            AgentState::Moving
        };
    }

    let touching = circles_touch(agent.pos, agent.radius + CONTACT_SLOP, target, target_radius);
    if touching && agent.can_attack() {
        agent.attack_cooldown_remaining = agent.attack_cooldown;
        true
    } else {
        false
    }
}
