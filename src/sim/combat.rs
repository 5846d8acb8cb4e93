//! Damage and death protocol
//!
//! All health changes go through `CombatResolver`. Kind-specific death side
//! effects (loot, offspring) come from the per-kind profile table rather than
//! from per-kind code.

use rand::Rng;

use super::state::{Agent, AgentState, EntityIds, GameEvent, Pickup, Player, PowerUpKind};
use crate::error::SimFault;
use crate::tuning::{Bestiary, PowerUpTuning, Tuning};
use crate::{clamp_to_arena, random_offset};

/// What a hit did to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Target was already dead/dying; nothing changed
    Ignored,
    /// Shield took the hit; health and state unchanged
    Absorbed,
    /// Health dropped, target survived and entered the hurt state
    Hurt,
    /// Health reached zero; death transition started
    Killed,
}

/// Side effects of one agent death, to be queued by the caller
#[derive(Debug, Clone)]
pub struct DeathOutcome {
    pub event: GameEvent,
    /// Replacement agents; already marked as counting toward the wave
    pub offspring: Vec<Agent>,
    pub loot: Option<Pickup>,
}

#[derive(Debug, Clone)]
pub struct CombatResolver {
    bestiary: Bestiary,
    power_ups: PowerUpTuning,
}

impl CombatResolver {
    pub fn new(bestiary: Bestiary, power_ups: PowerUpTuning) -> Self {
        Self {
            bestiary,
            power_ups,
        }
    }

    pub fn from_tuning(tuning: &Tuning) -> Self {
        Self::new(tuning.bestiary.clone(), tuning.power_ups.clone())
    }

    /// Apply `amount` damage to a hostile agent
    ///
    /// A dying agent ignores further hits, so the death transition runs once.
    pub fn damage_agent(&self, agent: &mut Agent, amount: u32) -> DamageOutcome {
        if !agent.is_alive() {
            return DamageOutcome::Ignored;
        }
        agent.health = agent.health.saturating_sub(amount);
        if agent.health == 0 {
            agent.state = AgentState::Dying;
            agent.vel = glam::Vec2::ZERO;
            DamageOutcome::Killed
        } else {
            agent.state = AgentState::Hurt;
            DamageOutcome::Hurt
        }
    }

    /// Apply `amount` damage to the player; an active shield absorbs all of it
    pub fn damage_player(&self, player: &mut Player, amount: u32) -> DamageOutcome {
        if !player.is_alive() {
            return DamageOutcome::Ignored;
        }
        if player.shield_active {
            return DamageOutcome::Absorbed;
        }
        player.health = player.health.saturating_sub(amount);
        player.hurt = true;
        if player.health == 0 {
            DamageOutcome::Killed
        } else {
            DamageOutcome::Hurt
        }
    }

    /// Roll loot and offspring for an agent that just died
    pub fn resolve_death<R: Rng>(
        &self,
        agent: &Agent,
        ids: &mut EntityIds,
        rng: &mut R,
    ) -> DeathOutcome {
        let profile = self.bestiary.get(agent.kind);

        let loot = if rng.random::<f32>() < profile.drop_chance {
            if profile.loot.is_empty() {
                SimFault::MissingCollaborator { what: "loot table" }.report();
                None
            } else {
                let kind = profile.loot[rng.random_range(0..profile.loot.len())];
                // Loot lands exactly where the agent died
                Some(Pickup::new(ids.next(), kind, agent.pos))
            }
        } else {
            None
        };

        let mut offspring = Vec::new();
        if let Some(split) = &profile.split {
            let count = rng.random_range(split.min..=split.max);
            let child_profile = self.bestiary.get(split.into);
            for _ in 0..count {
                let pos = clamp_to_arena(
                    agent.pos + random_offset(rng, split.jitter),
                    child_profile.radius,
                );
                let mut child = Agent::new(ids.next(), split.into, child_profile, pos);
                child.counts_toward_wave = true;
                offspring.push(child);
            }
            log::debug!(
                "{} {:?} split into {} {}",
                agent.kind.as_str(),
                agent.id,
                count,
                split.into.as_str()
            );
        }

        DeathOutcome {
            event: GameEvent::AgentDied(agent.agent_ref()),
            offspring,
            loot,
        }
    }

    /// Apply a collected power-up to the player
    pub fn apply_power_up(&self, player: &mut Player, kind: PowerUpKind) {
        match kind {
            PowerUpKind::Heal => player.update_health(self.power_ups.heal_amount, None),
            PowerUpKind::MaxHealth => {
                let increase = self.power_ups.max_health_increase;
                player.update_health(increase, Some(increase));
            }
            PowerUpKind::Shield => player.activate_shield(self.power_ups.shield_duration),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::AgentKind;
    use glam::Vec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn resolver_with(tuning: &Tuning) -> CombatResolver {
        CombatResolver::from_tuning(tuning)
    }

    fn spawn(kind: AgentKind, tuning: &Tuning, ids: &mut EntityIds) -> Agent {
        Agent::new(ids.next(), kind, tuning.profile(kind), Vec2::new(40.0, -20.0))
    }

    #[test]
    fn test_three_hits_kill_exactly_once() {
        let tuning = Tuning::default();
        let resolver = resolver_with(&tuning);
        let mut ids = EntityIds::default();
        let mut agent = spawn(AgentKind::Virus, &tuning, &mut ids);
        assert_eq!(agent.health, 3);

        assert_eq!(resolver.damage_agent(&mut agent, 1), DamageOutcome::Hurt);
        assert_eq!(agent.state, AgentState::Hurt);
        assert_eq!(resolver.damage_agent(&mut agent, 1), DamageOutcome::Hurt);
        assert_eq!(resolver.damage_agent(&mut agent, 1), DamageOutcome::Killed);
        assert_eq!(agent.state, AgentState::Dying);
        assert_eq!(resolver.damage_agent(&mut agent, 1), DamageOutcome::Ignored);
        assert_eq!(agent.health, 0);
    }

    #[test]
    fn test_overkill_does_not_underflow() {
        let tuning = Tuning::default();
        let resolver = resolver_with(&tuning);
        let mut ids = EntityIds::default();
        let mut agent = spawn(AgentKind::Adware, &tuning, &mut ids);
        assert_eq!(resolver.damage_agent(&mut agent, 100), DamageOutcome::Killed);
        assert_eq!(agent.health, 0);
    }

    #[test]
    fn test_shield_absorbs_player_damage() {
        let tuning = Tuning::default();
        let resolver = resolver_with(&tuning);
        let mut player = Player::new(&tuning.player);
        player.activate_shield(2.0);
        let health = player.health;

        assert_eq!(resolver.damage_player(&mut player, 1), DamageOutcome::Absorbed);
        assert_eq!(player.health, health);
        assert!(!player.hurt);
    }

    #[test]
    fn test_player_dies_at_zero() {
        let tuning = Tuning::default();
        let resolver = resolver_with(&tuning);
        let mut player = Player::new(&tuning.player);
        player.health = 1;
        assert_eq!(resolver.damage_player(&mut player, 1), DamageOutcome::Killed);
        assert!(!player.is_alive());
        assert_eq!(resolver.damage_player(&mut player, 1), DamageOutcome::Ignored);
    }

    #[test]
    fn test_splitter_releases_one_or_two_counting_viruses() {
        let tuning = Tuning::default();
        let resolver = resolver_with(&tuning);
        let mut rng = Pcg32::seed_from_u64(11);
        let mut ids = EntityIds::default();
        let mut seen = [false; 3];

        for _ in 0..100 {
            let trojan = spawn(AgentKind::Trojan, &tuning, &mut ids);
            let outcome = resolver.resolve_death(&trojan, &mut ids, &mut rng);
            let count = outcome.offspring.len();
            assert!((1..=2).contains(&count));
            seen[count] = true;
            for child in &outcome.offspring {
                assert_eq!(child.kind, AgentKind::Virus);
                assert!(child.counts_toward_wave);
                assert!((child.pos.x - trojan.pos.x).abs() <= 8.0);
                assert!((child.pos.y - trojan.pos.y).abs() <= 8.0);
                assert_ne!(child.id, trojan.id);
            }
            assert_eq!(outcome.event, GameEvent::AgentDied(trojan.agent_ref()));
        }
        assert!(seen[1] && seen[2]);
    }

    #[test]
    fn test_basic_kind_has_no_offspring() {
        let tuning = Tuning::default();
        let resolver = resolver_with(&tuning);
        let mut rng = Pcg32::seed_from_u64(12);
        let mut ids = EntityIds::default();
        let virus = spawn(AgentKind::Virus, &tuning, &mut ids);
        assert!(resolver.resolve_death(&virus, &mut ids, &mut rng).offspring.is_empty());
    }

    #[test]
    fn test_guaranteed_drop_lands_on_agent() {
        let mut tuning = Tuning::default();
        tuning.bestiary.virus.drop_chance = 1.0;
        let resolver = resolver_with(&tuning);
        let mut rng = Pcg32::seed_from_u64(13);
        let mut ids = EntityIds::default();
        let virus = spawn(AgentKind::Virus, &tuning, &mut ids);

        let loot = resolver.resolve_death(&virus, &mut ids, &mut rng).loot.unwrap();
        assert_eq!(loot.pos, virus.pos);
        assert!(tuning.bestiary.virus.loot.contains(&loot.kind));
    }

    #[test]
    fn test_drop_rate_roughly_matches_chance() {
        let tuning = Tuning::default();
        let resolver = resolver_with(&tuning);
        let mut rng = Pcg32::seed_from_u64(14);
        let mut ids = EntityIds::default();
        let virus = spawn(AgentKind::Virus, &tuning, &mut ids);

        let drops = (0..2000)
            .filter(|_| resolver.resolve_death(&virus, &mut ids, &mut rng).loot.is_some())
            .count();
        assert!((300..500).contains(&drops), "{drops} drops out of 2000");
    }

    #[test]
    fn test_empty_loot_table_skips_drop() {
        let mut tuning = Tuning::default();
        tuning.bestiary.virus.drop_chance = 1.0;
        tuning.bestiary.virus.loot.clear();
        let resolver = resolver_with(&tuning);
        let mut rng = Pcg32::seed_from_u64(15);
        let mut ids = EntityIds::default();
        let virus = spawn(AgentKind::Virus, &tuning, &mut ids);
        assert!(resolver.resolve_death(&virus, &mut ids, &mut rng).loot.is_none());
    }

    #[test]
    fn test_power_ups() {
        let tuning = Tuning::default();
        let resolver = resolver_with(&tuning);
        let mut player = Player::new(&tuning.player);

        player.health = 1;
        resolver.apply_power_up(&mut player, PowerUpKind::Heal);
        assert_eq!(player.health, player.max_health);

        resolver.apply_power_up(&mut player, PowerUpKind::MaxHealth);
        assert_eq!(player.max_health, 15);
        assert_eq!(player.health, 15);

        resolver.apply_power_up(&mut player, PowerUpKind::Shield);
        assert!(player.shield_active);
        assert!((player.shield_remaining - 2.0).abs() < 1e-6);
    }
}
