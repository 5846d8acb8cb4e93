//! Spatial queries
//!
//! The simulation only needs two questions answered about space: is this point
//! inside a body, and which agents are near this point. `WorldSnapshot` answers
//! both by brute force over a copy of the live bodies taken before a pass, so
//! queries made mid-pass see a stable picture.

use glam::Vec2;

use super::state::{AgentKind, AgentRef, World};

/// Occupancy and neighborhood queries
pub trait SpatialQuery {
    /// True if `point` lies inside any body
    fn query_occupied(&self, point: Vec2) -> bool;

    /// Agents whose centers lie within `radius` of `point`, optionally of one kind
    fn query_nearby(&self, point: Vec2, radius: f32, kind: Option<AgentKind>) -> Vec<AgentRef>;
}

#[derive(Debug, Clone)]
struct Body {
    pos: Vec2,
    radius: f32,
    agent: Option<AgentRef>,
}

/// Frozen copy of every solid body at one instant
#[derive(Debug, Clone, Default)]
pub struct WorldSnapshot {
    bodies: Vec<Body>,
}

impl WorldSnapshot {
    /// Capture the player and every living agent
    pub fn capture(world: &World) -> Self {
        let mut bodies = Vec::with_capacity(world.agents.len() + 1);
        if world.player.is_alive() {
            bodies.push(Body {
                pos: world.player.pos,
                radius: world.player.radius,
                agent: None,
            });
        }
        bodies.extend(world.living_agents().map(|agent| Body {
            pos: agent.pos,
            radius: agent.radius,
            agent: Some(agent.agent_ref()),
        }));
        Self { bodies }
    }

    /// Add agents that are not in the live set yet (queued spawns)
    pub fn include(&mut self, agents: impl IntoIterator<Item = (AgentRef, f32)>) {
        self.bodies.extend(agents.into_iter().map(|(agent, radius)| Body {
            pos: agent.pos,
            radius,
            agent: Some(agent),
        }));
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl SpatialQuery for WorldSnapshot {
    fn query_occupied(&self, point: Vec2) -> bool {
        self.bodies
            .iter()
            .any(|b| b.pos.distance_squared(point) <= b.radius * b.radius)
    }

    fn query_nearby(&self, point: Vec2, radius: f32, kind: Option<AgentKind>) -> Vec<AgentRef> {
        let radius_sq = radius * radius;
        self.bodies
            .iter()
            .filter_map(|b| b.agent)
            .filter(|a| kind.is_none_or(|k| a.kind == k))
            .filter(|a| a.pos.distance_squared(point) <= radius_sq)
            .collect()
    }
}
