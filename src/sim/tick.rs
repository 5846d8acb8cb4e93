//! Frame tick
//!
//! One frame runs the fixed-step physics pass (movement, steering, contacts,
//! bullets, pickups) as many times as the accumulator allows, then one
//! variable-step logic pass (shooting, shield, scheduled callbacks). Events
//! raised during the frame are dispatched afterwards, and structural changes
//! are applied last.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::collision::circles_touch;
use super::combat::{CombatResolver, DamageOutcome};
use super::deferred::{DeferredQueue, Mutations};
use super::progress::{ProgressTracker, RunSummary};
use super::schedule::{Scheduler, Timed};
use super::spatial::WorldSnapshot;
use super::spawn::SpawnPlacer;
use super::state::{
    Agent, AgentRef, AgentState, Bullet, EntityId, GameEvent, GamePhase, Player, PowerUpKind,
    Spawn, World,
};
use super::steering::step_agent;
use super::wave::WaveDirector;
use crate::consts::*;
use crate::presentation::{LogSink, PresentationSink};
use crate::tuning::Tuning;
use crate::{clamp_to_arena, in_arena};

/// Longest frame the accumulator accepts (seconds)
const MAX_FRAME_DT: f32 = 0.1;

/// Autopilot backs away from anything closer than this
const KITE_DISTANCE: f32 = 90.0;

/// Input commands for one frame
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Movement direction (normalized internally; zero to stand still)
    pub move_dir: Vec2,
    /// Aim direction (normalized internally)
    pub aim_dir: Vec2,
    /// Hold to fire
    pub shoot: bool,
    /// Pause toggle
    pub pause: bool,
    /// Idle/demo mode - the player is steered automatically
    pub idle_mode: bool,
}

/// One run of the encounter simulation
pub struct Simulation<S: PresentationSink = LogSink> {
    tuning: Tuning,
    world: World,
    wave: WaveDirector,
    progress: ProgressTracker,
    resolver: CombatResolver,
    scheduler: Scheduler<Timed>,
    deferred: DeferredQueue<Spawn>,
    events: Vec<GameEvent>,
    rng: Pcg32,
    sink: S,
    phase: GamePhase,
    accumulator: f32,
    game_over_reported: bool,
}

impl<S: PresentationSink> Simulation<S> {
    /// Create a simulation seeded from OS entropy
    pub fn new(tuning: Tuning, sink: S) -> Self {
        Self::with_seed(tuning, sink, rand::random())
    }

    /// Create a simulation with a fixed seed
    ///
    /// A tuning that fails validation is replaced by the defaults.
    pub fn with_seed(tuning: Tuning, sink: S, seed: u64) -> Self {
        let tuning = match tuning.validate() {
            Ok(()) => tuning,
            Err(err) => {
                log::warn!("{err}; using default tuning");
                Tuning::default()
            }
        };
        let placer = SpawnPlacer::from_tuning(&tuning.spawning);
        Self {
            world: World::new(Player::new(&tuning.player)),
            wave: WaveDirector::new(placer, &tuning),
            progress: ProgressTracker::new(),
            resolver: CombatResolver::from_tuning(&tuning),
            scheduler: Scheduler::new(),
            deferred: DeferredQueue::new(),
            events: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            sink,
            phase: GamePhase::Playing,
            accumulator: 0.0,
            game_over_reported: false,
            tuning,
        }
    }

    /// Reset all run state and start wave 0
    pub fn start_run(&mut self) {
        let placer = SpawnPlacer::from_tuning(&self.tuning.spawning);
        self.world = World::new(Player::new(&self.tuning.player));
        self.wave = WaveDirector::new(placer, &self.tuning);
        self.progress = ProgressTracker::new();
        self.scheduler.clear();
        self.deferred.take();
        self.events.clear();
        self.phase = GamePhase::Playing;
        self.accumulator = 0.0;
        self.game_over_reported = false;

        log::info!("Run started");
        self.begin_wave();
        self.end_of_tick();
    }

    /// Advance the simulation by one frame of `dt` seconds
    pub fn tick(&mut self, input: &TickInput, dt: f32) {
        // Handle pause toggle
        if input.pause {
            match self.phase {
                GamePhase::Playing => {
                    self.phase = GamePhase::Paused;
                    return;
                }
                GamePhase::Paused => self.phase = GamePhase::Playing,
                GamePhase::GameOver => {}
            }
        }

        // Don't tick if paused or game over
        if self.phase != GamePhase::Playing {
            return;
        }

        let input = if input.idle_mode {
            self.autopilot(input)
        } else {
            input.clone()
        };

        let dt = if dt.is_finite() {
            dt.clamp(0.0, MAX_FRAME_DT)
        } else {
            0.0
        };
        self.accumulator += dt;
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.fixed_step(&input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;
            if !self.world.player.is_alive() {
                break;
            }
        }

        self.logic_step(&input, dt);
        self.end_of_tick();
    }

    // --- Exposed surface ---

    /// Kill a live agent from outside the frame and settle its death right away
    ///
    /// Loot, offspring and removal follow the same path as a fatal hit. Unknown
    /// or already dying agents are ignored.
    pub fn on_death_event(&mut self, agent: AgentRef) {
        if !self.world.agent(agent.id).is_some_and(Agent::is_alive) {
            log::trace!("Death of {:?} ignored, not a live agent", agent.id);
            return;
        }
        self.damage_agent(agent.id, u32::MAX);
        self.end_of_tick();
    }

    /// Apply a power-up to the player and count it
    pub fn on_power_up_collected(&mut self, kind: PowerUpKind) {
        self.apply_power_up(kind);
        self.dispatch(GameEvent::PowerUpCollected { kind });
    }

    pub fn current_wave_index(&self) -> u32 {
        self.wave.current_wave_index()
    }

    pub fn enemies_killed(&self) -> u32 {
        self.progress.enemies_killed()
    }

    pub fn power_ups_collected(&self) -> u32 {
        self.progress.power_ups_collected()
    }

    pub fn summary(&self) -> RunSummary {
        self.progress.summary()
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn wave(&self) -> &WaveDirector {
        &self.wave
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    // --- Passes ---

    fn fixed_step(&mut self, input: &TickInput, dt: f32) {
        // Player movement
        let player = &mut self.world.player;
        if player.is_alive() {
            let dir = input.move_dir.normalize_or_zero();
            player.pos = clamp_to_arena(player.pos + dir * player.speed * dt, player.radius);
        }

        // Steering and contact attacks, against a snapshot taken before anyone moves
        let snapshot = WorldSnapshot::capture(&self.world);
        let target = self.world.player.pos;
        let target_radius = self.world.player.radius;
        let mut contact_hits = 0;
        for agent in &mut self.world.agents {
            if step_agent(agent, target, target_radius, &snapshot, &self.tuning.steering, dt) {
                contact_hits += 1;
            }
        }
        for _ in 0..contact_hits {
            self.hit_player(CONTACT_DAMAGE);
        }

        // Bullets: move, expire, hit the first live agent they touch
        let mut bullet_hits: Vec<EntityId> = Vec::new();
        for bullet in &mut self.world.bullets {
            if bullet.has_hit || self.deferred.is_pending_removal(bullet.id) {
                continue;
            }
            bullet.pos += bullet.vel * dt;
            bullet.ttl -= dt;
            if bullet.ttl <= 0.0 || !in_arena(bullet.pos) {
                self.deferred.defer_remove(bullet.id);
                continue;
            }
            let hit = self
                .world
                .agents
                .iter()
                .find(|a| a.is_alive() && circles_touch(bullet.pos, bullet.radius, a.pos, a.radius));
            if let Some(agent) = hit {
                bullet.has_hit = true;
                bullet_hits.push(agent.id);
                self.deferred.defer_remove(bullet.id);
            }
        }
        for id in bullet_hits {
            self.damage_agent(id, BULLET_DAMAGE);
        }

        // Pickups
        let player = &self.world.player;
        let collected: Vec<(EntityId, PowerUpKind)> = self
            .world
            .pickups
            .iter()
            .filter(|p| !self.deferred.is_pending_removal(p.id))
            .filter(|p| player.is_alive() && circles_touch(p.pos, p.radius, player.pos, player.radius))
            .map(|p| (p.id, p.kind))
            .collect();
        for (id, kind) in collected {
            self.deferred.defer_remove(id);
            self.apply_power_up(kind);
            self.events.push(GameEvent::PowerUpCollected { kind });
        }
    }

    fn logic_step(&mut self, input: &TickInput, dt: f32) {
        let player = &mut self.world.player;
        player.tick_shoot_cooldown(dt);
        player.tick_shield(dt);

        let aim = input.aim_dir.normalize_or_zero();
        if input.shoot && aim != Vec2::ZERO && player.is_alive() && player.ready_to_fire() {
            player.shoot_cooldown = player.fire_rate;
            let bullet = Bullet {
                id: self.world.ids.next(),
                pos: player.pos + aim * (player.radius + BULLET_RADIUS),
                vel: aim * self.tuning.player.bullet_speed,
                radius: BULLET_RADIUS,
                ttl: self.tuning.player.bullet_lifetime,
                has_hit: false,
            };
            self.deferred.defer_add(Spawn::Bullet(bullet));
        }

        for action in self.scheduler.advance(dt) {
            self.run_timed(action);
        }
    }

    fn run_timed(&mut self, action: Timed) {
        match action {
            Timed::StartNextWave => {
                if self.phase == GamePhase::GameOver || !self.world.player.is_alive() {
                    log::trace!("Next wave ignored after game over");
                } else {
                    self.begin_wave();
                }
            }
            Timed::AgentHurtEnd(id) => match self.world.agent_mut(id) {
                Some(agent) => {
                    agent.hurt_timer = None;
                    if agent.state == AgentState::Hurt {
                        agent.state = AgentState::Idle;
                    }
                }
                None => log::trace!("Hurt timer for {id:?} outlived its agent"),
            },
            Timed::PlayerHurtEnd => {
                let player = &mut self.world.player;
                player.hurt = false;
                player.hurt_timer = None;
            }
        }
    }

    // --- Combat plumbing ---

    fn hit_player(&mut self, amount: u32) {
        let player = &mut self.world.player;
        match self.resolver.damage_player(player, amount) {
            DamageOutcome::Hurt => {
                if let Some(handle) = player.hurt_timer.take() {
                    self.scheduler.cancel(handle);
                }
                let handle = self
                    .scheduler
                    .after(self.tuning.player.hurt_duration, Timed::PlayerHurtEnd);
                player.hurt_timer = Some(handle);
                log::debug!("Player hit, health {}/{}", player.health, player.max_health);
            }
            DamageOutcome::Killed => {
                if let Some(handle) = player.hurt_timer.take() {
                    self.scheduler.cancel(handle);
                }
                self.events.push(GameEvent::PlayerDied);
            }
            DamageOutcome::Absorbed => log::trace!("Shield absorbed a hit"),
            DamageOutcome::Ignored => {}
        }
    }

    fn damage_agent(&mut self, id: EntityId, amount: u32) {
        let Some(agent) = self.world.agents.iter_mut().find(|a| a.id == id) else {
            return;
        };
        match self.resolver.damage_agent(agent, amount) {
            DamageOutcome::Hurt => {
                if let Some(handle) = agent.hurt_timer.take() {
                    self.scheduler.cancel(handle);
                }
                agent.hurt_timer = Some(
                    self.scheduler
                        .after(AGENT_HURT_DURATION, Timed::AgentHurtEnd(id)),
                );
            }
            DamageOutcome::Killed => {
                if let Some(handle) = agent.hurt_timer.take() {
                    self.scheduler.cancel(handle);
                }
                let dead = agent.clone();
                self.resolve_death(&dead);
            }
            DamageOutcome::Absorbed | DamageOutcome::Ignored => {}
        }
    }

    /// Death side effects; offspring are bound to the wave before the death is counted
    fn resolve_death(&mut self, agent: &Agent) {
        let outcome = self
            .resolver
            .resolve_death(agent, &mut self.world.ids, &mut self.rng);
        log::debug!("{} {:?} destroyed", agent.kind.as_str(), agent.id);

        for child in outcome.offspring {
            self.wave.register(&child.agent_ref());
            self.deferred.defer_add(Spawn::Agent(child));
        }
        if let Some(loot) = outcome.loot {
            log::debug!("Dropped {:?} at {:?}", loot.kind, loot.pos);
            self.deferred.defer_add(Spawn::Pickup(loot));
        }
        self.events.push(outcome.event);
        self.deferred.defer_remove(agent.id);
    }

    fn apply_power_up(&mut self, kind: PowerUpKind) {
        self.resolver.apply_power_up(&mut self.world.player, kind);
        log::debug!("Collected {kind:?}");
    }

    fn begin_wave(&mut self) {
        // Queued agents count as occupied even though they are not in the world yet
        let mut space = WorldSnapshot::capture(&self.world);
        space.include(self.deferred.pending_adds().iter().filter_map(|spawn| match spawn {
            Spawn::Agent(agent) => Some((agent.agent_ref(), agent.radius)),
            _ => None,
        }));

        let agents = self.wave.start_next_wave(
            &mut self.world.player,
            &mut self.world.ids,
            &mut space,
            &mut self.scheduler,
            &mut self.rng,
            &mut self.sink,
        );
        self.events.push(GameEvent::WaveStarted {
            index: self.wave.current_wave_index(),
            total: agents.len() as u32,
        });
        for agent in agents {
            self.deferred.defer_add(Spawn::Agent(agent));
        }
    }

    // --- End of tick ---

    fn end_of_tick(&mut self) {
        let events = std::mem::take(&mut self.events);
        let mut player_died = false;
        for event in events {
            player_died |= event == GameEvent::PlayerDied;
            self.dispatch(event);
        }
        if player_died {
            self.end_run();
        }
        self.apply_deferred();
    }

    fn dispatch(&mut self, event: GameEvent) {
        match &event {
            GameEvent::AgentDied(agent) => {
                // Only deaths the director still had bound count as kills
                if !self.wave.is_registered(agent.id) {
                    log::trace!("Duplicate death of {:?} not counted", agent.id);
                    return;
                }
                self.wave.on_death(agent, &mut self.scheduler);
            }
            GameEvent::WaveStarted { .. } | GameEvent::PowerUpCollected { .. } => {}
            // Handled once the whole batch is counted
            GameEvent::PlayerDied => {}
        }
        self.progress.observe(&event);
    }

    fn end_run(&mut self) {
        if self.game_over_reported {
            return;
        }
        self.game_over_reported = true;
        self.phase = GamePhase::GameOver;
        self.wave.halt();
        log::info!(
            "Player destroyed on wave {}",
            self.wave.current_wave_index() + 1
        );
        self.sink.show_game_over(
            self.wave.current_wave_index(),
            self.progress.enemies_killed(),
            self.progress.power_ups_collected(),
        );
    }

    fn apply_deferred(&mut self) {
        let Mutations { added, removed } = self.deferred.take();
        for id in removed {
            if !self.world.remove(id) {
                log::trace!("{id:?} was already gone");
            }
        }
        for spawn in added {
            let agent = match &spawn {
                Spawn::Agent(agent) => Some(agent.agent_ref()),
                _ => None,
            };
            if !self.world.apply_spawn(spawn) {
                continue;
            }
            if let Some(agent) = agent {
                if !self.wave.is_registered(agent.id) {
                    self.wave.register(&agent);
                }
            }
        }

        // Ensure deterministic ordering
        self.world.normalize_order();
    }

    // --- Autopilot ---

    /// Demo input: shoot the nearest agent, back off when crowded, otherwise
    /// go for the nearest pickup
    fn autopilot(&self, input: &TickInput) -> TickInput {
        let mut input = input.clone();
        let player = &self.world.player;

        let nearest = self.world.living_agents().min_by(|a, b| {
            a.pos
                .distance_squared(player.pos)
                .total_cmp(&b.pos.distance_squared(player.pos))
        });

        let mut threatened = false;
        if let Some(agent) = nearest {
            let to_agent = agent.pos - player.pos;
            input.aim_dir = to_agent.normalize_or_zero();
            input.shoot = true;
            if to_agent.length() < KITE_DISTANCE {
                threatened = true;
                // Retreat, biased toward the center so we don't get pinned on a wall
                let away = -to_agent.normalize_or_zero();
                let home = (-player.pos).normalize_or_zero() * 0.5;
                input.move_dir = (away + home).normalize_or_zero();
            }
        }

        if !threatened {
            let pickup = self.world.pickups.iter().min_by(|a, b| {
                a.pos
                    .distance_squared(player.pos)
                    .total_cmp(&b.pos.distance_squared(player.pos))
            });
            input.move_dir = match pickup {
                Some(p) => (p.pos - player.pos).normalize_or_zero(),
                None => Vec2::ZERO,
            };
        }
        input
    }
}
