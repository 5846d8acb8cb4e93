//! Wave composition and progression
//!
//! The director owns the wave state (index, composition, live count). It is
//! told about registrations and deaths, and schedules the next wave once the
//! last counting agent of the current one is gone.

use std::collections::{BTreeMap, HashMap};

use rand::Rng;
use serde::Serialize;

use super::schedule::{Scheduler, Timed};
use super::spatial::WorldSnapshot;
use super::spawn::SpawnPlacer;
use super::state::{Agent, AgentKind, AgentRef, EntityId, EntityIds, Player};
use crate::error::SimFault;
use crate::presentation::PresentationSink;
use crate::tuning::{Bestiary, KindCurve, Tuning, WaveTuning};

/// Director lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WavePhase {
    /// No wave started yet
    Idle,
    /// Composing and placing a wave
    Spawning,
    /// Counting agents alive
    Active,
    /// Arena clear; next wave scheduled
    Clearing,
    /// Player died; progression stopped
    Halted,
}

/// Agent count per kind for one wave
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WaveComposition {
    counts: BTreeMap<AgentKind, u32>,
}

impl WaveComposition {
    pub fn get(&self, kind: AgentKind) -> u32 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AgentKind, u32)> + '_ {
        self.counts.iter().map(|(&kind, &count)| (kind, count))
    }
}

/// Difficulty multiplier for 0-based wave `wave`
pub fn difficulty(wave: u32, step: f32) -> f32 {
    1.0 + wave as f32 * step
}

/// Center of the sampling range for one kind; 0 while the kind is locked
pub fn base_count(curve: &KindCurve, wave: u32, step: f32) -> i32 {
    if wave < curve.unlock_wave {
        return 0;
    }
    curve.base + (difficulty(wave, step) * curve.per_difficulty).floor() as i32
}

/// Sample a count for one kind; locked kinds are exactly 0 and consume no randomness
fn sample_count<R: Rng>(curve: &KindCurve, wave: u32, step: f32, rng: &mut R) -> u32 {
    if wave < curve.unlock_wave {
        return 0;
    }
    let base = base_count(curve, wave, step);
    let sampled = rng.random_range(base - curve.spread_below..=base + curve.spread_above);
    if sampled < 0 {
        SimFault::InvalidCount {
            wave,
            kind: curve.kind,
            sampled,
        }
        .report();
        return 0;
    }
    sampled as u32
}

/// Roll the composition of wave `wave`
pub fn generate_composition<R: Rng>(wave: u32, tuning: &WaveTuning, rng: &mut R) -> WaveComposition {
    let counts = tuning
        .curves
        .iter()
        .map(|curve| {
            let count = sample_count(curve, wave, tuning.difficulty_step, rng);
            (curve.kind, count)
        })
        .collect();
    WaveComposition { counts }
}

#[derive(Debug)]
pub struct WaveDirector {
    placer: SpawnPlacer,
    tuning: WaveTuning,
    bestiary: Bestiary,
    decay_factor: f32,
    wave_index: u32,
    started: bool,
    composition: WaveComposition,
    live_count: u32,
    /// Death bindings: id -> counts toward the wave
    registered: HashMap<EntityId, bool>,
    next_wave_scheduled: bool,
    phase: WavePhase,
}

impl WaveDirector {
    pub fn new(placer: SpawnPlacer, tuning: &Tuning) -> Self {
        Self {
            placer,
            tuning: tuning.waves.clone(),
            bestiary: tuning.bestiary.clone(),
            decay_factor: tuning.player.decay_factor,
            wave_index: 0,
            started: false,
            composition: WaveComposition::default(),
            live_count: 0,
            registered: HashMap::new(),
            next_wave_scheduled: false,
            phase: WavePhase::Idle,
        }
    }

    /// 0-based index of the current (or last) wave
    pub fn current_wave_index(&self) -> u32 {
        self.wave_index
    }

    pub fn live_count(&self) -> u32 {
        self.live_count
    }

    pub fn phase(&self) -> WavePhase {
        self.phase
    }

    pub fn composition(&self) -> &WaveComposition {
        &self.composition
    }

    pub fn next_wave_scheduled(&self) -> bool {
        self.next_wave_scheduled
    }

    pub fn is_registered(&self, id: EntityId) -> bool {
        self.registered.contains_key(&id)
    }

    /// Bind an agent's death to this director
    ///
    /// Binding the same id twice replaces the old binding, so the agent is
    /// still counted once and its death is handled once.
    pub fn register(&mut self, agent: &AgentRef) {
        if let Some(counted) = self.registered.remove(&agent.id) {
            SimFault::DoubleRegistration { id: agent.id }.report();
            if counted {
                self.live_count = self.live_count.saturating_sub(1);
            }
        }
        self.registered.insert(agent.id, agent.counts_toward_wave);
        if agent.counts_toward_wave {
            self.live_count += 1;
        }
        log::debug!(
            "Registered {} {:?} (live: {})",
            agent.kind.as_str(),
            agent.id,
            self.live_count
        );
    }

    /// Handle one death event
    ///
    /// Returns true if this death cleared the wave and the next one was scheduled.
    pub fn on_death(&mut self, agent: &AgentRef, scheduler: &mut Scheduler<Timed>) -> bool {
        let Some(counted) = self.registered.remove(&agent.id) else {
            log::trace!("Ignoring death of unregistered {:?}", agent.id);
            return false;
        };
        if !counted {
            return false;
        }

        self.live_count = self.live_count.saturating_sub(1);
        if self.live_count > 0 || self.next_wave_scheduled || self.phase == WavePhase::Halted {
            return false;
        }

        self.next_wave_scheduled = true;
        self.phase = WavePhase::Clearing;
        scheduler.after(self.tuning.post_wave_delay, Timed::StartNextWave);
        log::info!(
            "Wave {} cleared, next in {:.1}s",
            self.wave_index + 1,
            self.tuning.post_wave_delay
        );
        true
    }

    /// Enter the next wave: difficulty step, composition, announcement, placement
    ///
    /// Returns the agents to add to the world. They are not registered yet;
    /// registration happens when they actually enter the live set.
    pub fn start_next_wave<R: Rng, S: PresentationSink + ?Sized>(
        &mut self,
        player: &mut Player,
        ids: &mut EntityIds,
        space: &mut WorldSnapshot,
        scheduler: &mut Scheduler<Timed>,
        rng: &mut R,
        sink: &mut S,
    ) -> Vec<Agent> {
        if self.phase == WavePhase::Halted {
            return Vec::new();
        }

        self.next_wave_scheduled = false;
        self.phase = WavePhase::Spawning;
        if self.started {
            self.wave_index += 1;
        } else {
            self.started = true;
        }

        player.adjust_fire_rate(self.decay_factor);
        self.composition = generate_composition(self.wave_index, &self.tuning, rng);
        sink.announce_wave(self.wave_index);
        self.live_count = 0;
        self.registered.clear();

        let mut agents = Vec::with_capacity(self.composition.total() as usize);
        let mut skipped = 0;
        for (kind, count) in self.composition.iter() {
            let profile = self.bestiary.get(kind);
            for _ in 0..count {
                let Some(pos) = self.placer.place(rng, &*space) else {
                    skipped += 1;
                    continue;
                };
                let agent = Agent::new(ids.next(), kind, profile, pos);
                space.include([(agent.agent_ref(), agent.radius)]);
                agents.push(agent);
            }
        }
        if skipped > 0 {
            SimFault::MissingCollaborator {
                what: "spawn anchors",
            }
            .report();
        }

        log::info!(
            "Wave {} started: {} agents (fire rate {:.3}s)",
            self.wave_index + 1,
            agents.len(),
            player.fire_rate
        );

        if agents.is_empty() {
            // Nothing will ever die, so clear right away
            self.next_wave_scheduled = true;
            self.phase = WavePhase::Clearing;
            scheduler.after(self.tuning.post_wave_delay, Timed::StartNextWave);
        } else {
            self.phase = WavePhase::Active;
        }
        agents
    }

    /// Stop progression for good (player died)
    pub fn halt(&mut self) {
        self.phase = WavePhase::Halted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::RecordingSink;
    use glam::Vec2;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    struct Fixture {
        director: WaveDirector,
        player: Player,
        ids: EntityIds,
        scheduler: Scheduler<Timed>,
        rng: Pcg32,
        sink: RecordingSink,
    }

    impl Fixture {
        fn new(seed: u64) -> Self {
            Self::with_tuning(Tuning::default(), seed)
        }

        fn with_tuning(tuning: Tuning, seed: u64) -> Self {
            Self {
                director: WaveDirector::new(SpawnPlacer::from_tuning(&tuning.spawning), &tuning),
                player: Player::new(&tuning.player),
                ids: EntityIds::default(),
                scheduler: Scheduler::new(),
                rng: Pcg32::seed_from_u64(seed),
                sink: RecordingSink::default(),
            }
        }

        fn start(&mut self) -> Vec<Agent> {
            let mut space = WorldSnapshot::default();
            let agents = self.director.start_next_wave(
                &mut self.player,
                &mut self.ids,
                &mut space,
                &mut self.scheduler,
                &mut self.rng,
                &mut self.sink,
            );
            for agent in &agents {
                self.director.register(&agent.agent_ref());
            }
            agents
        }
    }

    fn counting(id: u32, kind: AgentKind) -> AgentRef {
        AgentRef {
            id: EntityId(id),
            kind,
            pos: Vec2::ZERO,
            counts_toward_wave: true,
        }
    }

    #[test]
    fn test_base_counts_follow_difficulty() {
        let tuning = WaveTuning::default();
        let virus = &tuning.curves[0];
        let trojan = &tuning.curves[1];
        let adware = &tuning.curves[2];

        assert_eq!(base_count(virus, 0, 0.25), 4);
        assert_eq!(base_count(virus, 4, 0.25), 6);
        assert_eq!(base_count(trojan, 1, 0.25), 0);
        assert_eq!(base_count(trojan, 2, 0.25), 1);
        assert_eq!(base_count(adware, 3, 0.25), 0);
        assert_eq!(base_count(adware, 8, 0.25), 1);
    }

    #[test]
    fn test_wave_zero_is_viruses_only() {
        let tuning = WaveTuning::default();
        let mut rng = Pcg32::seed_from_u64(21);
        for _ in 0..500 {
            let comp = generate_composition(0, &tuning, &mut rng);
            assert!((3..=6).contains(&comp.get(AgentKind::Virus)));
            assert_eq!(comp.get(AgentKind::Trojan), 0);
            assert_eq!(comp.get(AgentKind::Adware), 0);
        }
    }

    #[test]
    fn test_negative_samples_clamp_to_zero() {
        let mut tuning = WaveTuning::default();
        tuning.curves[1].unlock_wave = 0;
        tuning.curves[1].per_difficulty = 0.0;
        tuning.curves[1].spread_below = 5;
        let mut rng = Pcg32::seed_from_u64(22);
        // Samples land in -5..=1, mostly negative
        for _ in 0..200 {
            let comp = generate_composition(0, &tuning, &mut rng);
            assert!(comp.get(AgentKind::Trojan) <= 1);
        }
    }

    #[test]
    fn test_five_waves_of_fire_rate_decay() {
        let mut fx = Fixture::new(23);
        for _ in 0..5 {
            fx.start();
        }
        assert_eq!(fx.director.current_wave_index(), 4);
        assert!((fx.player.fire_rate - 0.2 * 0.965f32.powi(5)).abs() < 1e-5);
        assert!((fx.player.fire_rate - 0.167).abs() < 1e-3);
        assert_eq!(fx.sink.waves_announced(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_fire_rate_never_below_floor() {
        let mut fx = Fixture::new(24);
        for _ in 0..100 {
            fx.start();
            assert!(fx.player.fire_rate >= fx.player.min_fire_rate);
        }
        assert!((fx.player.fire_rate - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_wave_start_registers_every_agent() {
        let mut fx = Fixture::new(25);
        let agents = fx.start();
        assert_eq!(fx.director.phase(), WavePhase::Active);
        assert_eq!(fx.director.live_count() as usize, agents.len());
        assert_eq!(fx.director.composition().total() as usize, agents.len());

        let mut unique: Vec<_> = agents.iter().map(|a| a.id).collect();
        unique.dedup();
        assert_eq!(unique.len(), agents.len());
    }

    #[test]
    fn test_last_death_schedules_one_next_wave() {
        let mut fx = Fixture::new(26);
        let agents = fx.start();
        let refs: Vec<_> = agents.iter().map(Agent::agent_ref).collect();

        let (last, rest) = refs.split_last().unwrap();
        for agent in rest {
            assert!(!fx.director.on_death(agent, &mut fx.scheduler));
        }
        assert!(fx.scheduler.is_empty());
        assert!(fx.director.on_death(last, &mut fx.scheduler));
        assert_eq!(fx.director.phase(), WavePhase::Clearing);
        assert_eq!(fx.scheduler.len(), 1);

        // Repeated death events are ignored
        assert!(!fx.director.on_death(last, &mut fx.scheduler));
        assert_eq!(fx.director.live_count(), 0);

        assert!(fx.scheduler.advance(1.4).is_empty());
        assert_eq!(fx.scheduler.advance(0.2), vec![Timed::StartNextWave]);
    }

    #[test]
    fn test_guard_blocks_double_schedule_in_one_batch() {
        let mut fx = Fixture::new(27);
        fx.director.register(&counting(900, AgentKind::Virus));
        fx.director.register(&counting(901, AgentKind::Virus));

        // Batch: both die, a late offspring registers and dies too
        fx.director.on_death(&counting(900, AgentKind::Virus), &mut fx.scheduler);
        fx.director.on_death(&counting(901, AgentKind::Virus), &mut fx.scheduler);
        fx.director.register(&counting(902, AgentKind::Virus));
        fx.director.on_death(&counting(902, AgentKind::Virus), &mut fx.scheduler);

        assert_eq!(fx.scheduler.len(), 1);
        assert_eq!(fx.director.live_count(), 0);
    }

    #[test]
    fn test_offspring_register_before_splitter_decrement() {
        let mut fx = Fixture::new(28);
        let trojan = counting(50, AgentKind::Trojan);
        fx.director.register(&trojan);
        assert_eq!(fx.director.live_count(), 1);

        for (k, id) in [51, 52].into_iter().enumerate() {
            fx.director.register(&counting(id, AgentKind::Virus));
            assert_eq!(fx.director.live_count(), 2 + k as u32);
        }
        assert!(!fx.director.on_death(&trojan, &mut fx.scheduler));
        assert_eq!(fx.director.live_count(), 2);
        assert!(fx.scheduler.is_empty());
    }

    #[test]
    fn test_double_registration_counts_once() {
        let mut fx = Fixture::new(29);
        let virus = counting(7, AgentKind::Virus);
        fx.director.register(&virus);
        fx.director.register(&virus);
        assert_eq!(fx.director.live_count(), 1);
        assert!(fx.director.on_death(&virus, &mut fx.scheduler));
        assert!(!fx.director.on_death(&virus, &mut fx.scheduler));
    }

    #[test]
    fn test_non_counting_agents_do_not_hold_the_wave() {
        let mut fx = Fixture::new(30);
        let mut decoy = counting(8, AgentKind::Virus);
        decoy.counts_toward_wave = false;
        fx.director.register(&decoy);
        assert_eq!(fx.director.live_count(), 0);
        assert!(!fx.director.on_death(&decoy, &mut fx.scheduler));
        assert!(fx.scheduler.is_empty());
    }

    #[test]
    fn test_halted_director_stops_progression() {
        let mut fx = Fixture::new(31);
        let agents = fx.start();
        fx.director.halt();
        for agent in &agents {
            fx.director.on_death(&agent.agent_ref(), &mut fx.scheduler);
        }
        assert!(fx.scheduler.is_empty());
        assert!(fx.start().is_empty());
        assert_eq!(fx.director.current_wave_index(), 0);
    }

    #[test]
    fn test_empty_wave_schedules_next() {
        let mut tuning = Tuning::default();
        tuning.waves.curves.truncate(1);
        tuning.waves.curves[0].base = -10;
        let mut fx = Fixture::with_tuning(tuning, 32);
        assert!(fx.start().is_empty());
        assert_eq!(fx.director.phase(), WavePhase::Clearing);
        assert_eq!(fx.scheduler.len(), 1);
    }

    #[test]
    fn test_missing_anchors_skip_spawns() {
        let mut tuning = Tuning::default();
        tuning.spawning.anchors.clear();
        let mut fx = Fixture::with_tuning(tuning, 33);
        assert!(fx.start().is_empty());
        assert_eq!(fx.sink.waves_announced(), vec![0]);
    }

    proptest! {
        #[test]
        fn prop_counts_stay_in_range(wave in 0u32..200, seed in any::<u64>()) {
            let tuning = WaveTuning::default();
            let mut rng = Pcg32::seed_from_u64(seed);
            let comp = generate_composition(wave, &tuning, &mut rng);
            for curve in &tuning.curves {
                let base = base_count(curve, wave, tuning.difficulty_step);
                let count = comp.get(curve.kind) as i32;
                prop_assert!(count >= 0);
                prop_assert!(count <= (base + curve.spread_above).max(0));
                if wave < curve.unlock_wave {
                    prop_assert_eq!(count, 0);
                }
            }
        }

        #[test]
        fn prop_base_count_non_decreasing(wave in 0u32..1000) {
            for curve in &WaveTuning::default().curves {
                prop_assert!(base_count(curve, wave + 1, 0.25) >= base_count(curve, wave, 0.25));
            }
        }
    }
}
