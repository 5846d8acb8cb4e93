//! Entity types and the live entity set
//!
//! Everything a tick reads or writes about the arena lives here. Structural
//! changes (adding/removing entities) only happen through `World::apply_spawn`
//! and `World::remove`, which the simulation calls at end of tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::schedule::TimerHandle;
use crate::consts::*;
use crate::tuning::{KindProfile, PlayerTuning};

/// Identity shared by every entity in one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Monotonic entity id allocator
#[derive(Debug, Clone)]
pub struct EntityIds {
    next: u32,
}

impl Default for EntityIds {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl EntityIds {
    pub fn next(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }
}

/// Hostile agent kinds
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Basic chaser, the bulk of every wave
    Virus,
    /// Splitter: releases viruses when it dies
    Trojan,
    /// Heavy: slow and tough
    Adware,
}

impl AgentKind {
    pub const ALL: [AgentKind; 3] = [AgentKind::Virus, AgentKind::Trojan, AgentKind::Adware];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Virus => "virus",
            AgentKind::Trojan => "trojan",
            AgentKind::Adware => "adware",
        }
    }
}

/// Per-agent behavior state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentState {
    /// Alive, not moving this tick
    Idle,
    /// Alive, steering toward the player
    Moving,
    /// Alive, recently damaged (steering continues)
    Hurt,
    /// Lethal damage taken; waiting for end-of-tick removal
    Dying,
}

/// A hostile agent
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: EntityId,
    pub kind: AgentKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub speed: f32,
    pub health: u32,
    pub max_health: u32,
    /// Seconds between contact attacks
    pub attack_cooldown: f32,
    /// Counts down every fixed tick; attack allowed at zero
    pub attack_cooldown_remaining: f32,
    /// Whether this agent must die before the wave can clear
    pub counts_toward_wave: bool,
    pub state: AgentState,
    /// Pending hurt-exit callback, replaced on every non-lethal hit
    pub hurt_timer: Option<TimerHandle>,
}

impl Agent {
    pub fn new(id: EntityId, kind: AgentKind, profile: &KindProfile, pos: Vec2) -> Self {
        let max_health = profile.max_health.max(1);
        Self {
            id,
            kind,
            pos,
            vel: Vec2::ZERO,
            radius: profile.radius,
            speed: profile.speed,
            health: max_health,
            max_health,
            attack_cooldown: profile.attack_cooldown,
            attack_cooldown_remaining: 0.0,
            counts_toward_wave: true,
            state: AgentState::Idle,
            hurt_timer: None,
        }
    }

    /// Alive agents steer, attack and can be hit
    pub fn is_alive(&self) -> bool {
        self.state != AgentState::Dying
    }

    pub fn can_attack(&self) -> bool {
        self.attack_cooldown_remaining <= 0.0
    }

    /// Decrement the attack cooldown by one tick
    pub fn tick_cooldown(&mut self, dt: f32) {
        if self.attack_cooldown_remaining > 0.0 {
            self.attack_cooldown_remaining = (self.attack_cooldown_remaining - dt).max(0.0);
        }
    }

    pub fn agent_ref(&self) -> AgentRef {
        AgentRef {
            id: self.id,
            kind: self.kind,
            pos: self.pos,
            counts_toward_wave: self.counts_toward_wave,
        }
    }
}

/// Lightweight handle to an agent, safe to hold across ticks
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgentRef {
    pub id: EntityId,
    pub kind: AgentKind,
    pub pos: Vec2,
    pub counts_toward_wave: bool,
}

/// The player
#[derive(Debug, Clone)]
pub struct Player {
    pub pos: Vec2,
    pub radius: f32,
    pub speed: f32,
    pub health: u32,
    pub max_health: u32,
    /// Seconds between shots; only ever decreases during a run
    pub fire_rate: f32,
    pub min_fire_rate: f32,
    /// Counts down every logic pass; firing allowed at zero
    pub shoot_cooldown: f32,
    pub shield_active: bool,
    pub shield_remaining: f32,
    pub hurt: bool,
    pub hurt_timer: Option<TimerHandle>,
}

impl Player {
    pub fn new(tuning: &PlayerTuning) -> Self {
        let max_health = tuning.max_health.max(1);
        Self {
            pos: Vec2::ZERO,
            radius: PLAYER_RADIUS,
            speed: tuning.speed,
            health: max_health,
            max_health,
            fire_rate: tuning.fire_rate,
            min_fire_rate: tuning.min_fire_rate,
            shoot_cooldown: 0.0,
            shield_active: false,
            shield_remaining: 0.0,
            hurt: false,
            hurt_timer: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Difficulty step: shots get faster, never below the floor
    pub fn adjust_fire_rate(&mut self, factor: f32) {
        self.fire_rate = (self.fire_rate * factor).max(self.min_fire_rate);
    }

    pub fn activate_shield(&mut self, duration: f32) {
        self.shield_active = true;
        self.shield_remaining = duration;
    }

    /// Count the shield down, switching it off when it runs out
    pub fn tick_shield(&mut self, dt: f32) {
        if !self.shield_active {
            return;
        }
        self.shield_remaining -= dt;
        if self.shield_remaining <= 0.0 {
            self.shield_active = false;
            self.shield_remaining = 0.0;
        }
    }

    /// Heal by `amount`, optionally raising max health first (raises current too)
    pub fn update_health(&mut self, amount: u32, increase_max: Option<u32>) {
        if let Some(increase) = increase_max {
            self.max_health = self.max_health.saturating_add(increase);
            self.health = self.health.saturating_add(increase);
        }
        self.health = self.health.saturating_add(amount).min(self.max_health);
    }

    pub fn tick_shoot_cooldown(&mut self, dt: f32) {
        if self.shoot_cooldown > 0.0 {
            self.shoot_cooldown = (self.shoot_cooldown - dt).max(0.0);
        }
    }

    pub fn ready_to_fire(&self) -> bool {
        self.shoot_cooldown <= 0.0
    }
}

/// A player projectile
#[derive(Debug, Clone)]
pub struct Bullet {
    pub id: EntityId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Seconds left before the bullet expires
    pub ttl: f32,
    /// Set on first hit so one bullet never damages twice
    pub has_hit: bool,
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpKind {
    Heal,
    MaxHealth,
    Shield,
}

/// A power-up lying in the arena
#[derive(Debug, Clone)]
pub struct Pickup {
    pub id: EntityId,
    pub kind: PowerUpKind,
    pub pos: Vec2,
    pub radius: f32,
}

impl Pickup {
    pub fn new(id: EntityId, kind: PowerUpKind, pos: Vec2) -> Self {
        Self {
            id,
            kind,
            pos,
            radius: PICKUP_RADIUS,
        }
    }
}

/// Run-level phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Game is paused
    Paused,
    /// Player died; run ended
    GameOver,
}

/// Notifications produced during a tick and dispatched at end of tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    WaveStarted { index: u32, total: u32 },
    AgentDied(AgentRef),
    PowerUpCollected { kind: PowerUpKind },
    PlayerDied,
}

/// An entity waiting to be added at end of tick
#[derive(Debug, Clone)]
pub enum Spawn {
    Agent(Agent),
    Bullet(Bullet),
    Pickup(Pickup),
}

impl Spawn {
    pub fn id(&self) -> EntityId {
        match self {
            Spawn::Agent(agent) => agent.id,
            Spawn::Bullet(bullet) => bullet.id,
            Spawn::Pickup(pickup) => pickup.id,
        }
    }
}

/// The live entity set
#[derive(Debug, Clone)]
pub struct World {
    pub player: Player,
    /// Active agents (sorted by id)
    pub agents: Vec<Agent>,
    /// Active bullets (sorted by id)
    pub bullets: Vec<Bullet>,
    /// Active pickups (sorted by id)
    pub pickups: Vec<Pickup>,
    pub ids: EntityIds,
}

impl World {
    pub fn new(player: Player) -> Self {
        Self {
            player,
            agents: Vec::new(),
            bullets: Vec::new(),
            pickups: Vec::new(),
            ids: EntityIds::default(),
        }
    }

    pub fn agent(&self, id: EntityId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn agent_mut(&mut self, id: EntityId) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|a| a.id == id)
    }

    /// Agents that are alive (not dying)
    pub fn living_agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter().filter(|a| a.is_alive())
    }

    /// Insert a spawned entity; duplicate ids are ignored
    pub fn apply_spawn(&mut self, spawn: Spawn) -> bool {
        let id = spawn.id();
        if self.contains(id) {
            return false;
        }
        match spawn {
            Spawn::Agent(agent) => self.agents.push(agent),
            Spawn::Bullet(bullet) => self.bullets.push(bullet),
            Spawn::Pickup(pickup) => self.pickups.push(pickup),
        }
        true
    }

    /// Remove an entity by id; returns false if it was already gone
    pub fn remove(&mut self, id: EntityId) -> bool {
        let before = self.agents.len() + self.bullets.len() + self.pickups.len();
        self.agents.retain(|a| a.id != id);
        self.bullets.retain(|b| b.id != id);
        self.pickups.retain(|p| p.id != id);
        before != self.agents.len() + self.bullets.len() + self.pickups.len()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.agents.iter().any(|a| a.id == id)
            || self.bullets.iter().any(|b| b.id == id)
            || self.pickups.iter().any(|p| p.id == id)
    }

    /// Ensure entities are sorted by ID for stable iteration
    pub fn normalize_order(&mut self) {
        self.agents.sort_by_key(|a| a.id);
        self.bullets.sort_by_key(|b| b.id);
        self.pickups.sort_by_key(|p| p.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;

    fn virus(world: &mut World, tuning: &Tuning) -> Agent {
        let id = world.ids.next();
        Agent::new(id, AgentKind::Virus, tuning.profile(AgentKind::Virus), Vec2::ZERO)
    }

    #[test]
    fn test_ids_are_unique() {
        let mut ids = EntityIds::default();
        let a = ids.next();
        let b = ids.next();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn test_fire_rate_floor() {
        let tuning = Tuning::default();
        let mut player = Player::new(&tuning.player);
        for _ in 0..200 {
            player.adjust_fire_rate(0.92);
        }
        assert!((player.fire_rate - tuning.player.min_fire_rate).abs() < 1e-6);
    }

    #[test]
    fn test_update_health_clamps_and_raises_max() {
        let tuning = Tuning::default();
        let mut player = Player::new(&tuning.player);
        player.health = 1;
        player.update_health(100, None);
        assert_eq!(player.health, player.max_health);

        let old_max = player.max_health;
        player.health = 2;
        player.update_health(0, Some(3));
        assert_eq!(player.max_health, old_max + 3);
        assert_eq!(player.health, 5);
    }

    #[test]
    fn test_shield_expires() {
        let tuning = Tuning::default();
        let mut player = Player::new(&tuning.player);
        player.activate_shield(0.5);
        player.tick_shield(0.3);
        assert!(player.shield_active);
        player.tick_shield(0.3);
        assert!(!player.shield_active);
        assert_eq!(player.shield_remaining, 0.0);
    }

    #[test]
    fn test_world_spawn_and_remove_once() {
        let tuning = Tuning::default();
        let mut world = World::new(Player::new(&tuning.player));
        let agent = virus(&mut world, &tuning);
        let id = agent.id;

        assert!(world.apply_spawn(Spawn::Agent(agent.clone())));
        assert!(!world.apply_spawn(Spawn::Agent(agent)));
        assert_eq!(world.agents.len(), 1);

        assert!(world.remove(id));
        assert!(!world.remove(id));
        assert!(world.agents.is_empty());
    }

    #[test]
    fn test_cooldown_ticks_to_zero() {
        let tuning = Tuning::default();
        let mut world = World::new(Player::new(&tuning.player));
        let mut agent = virus(&mut world, &tuning);
        agent.attack_cooldown_remaining = 0.05;
        assert!(!agent.can_attack());
        agent.tick_cooldown(0.1);
        assert!(agent.can_attack());
        assert_eq!(agent.attack_cooldown_remaining, 0.0);
    }
}
