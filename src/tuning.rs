//! Data-driven game balance
//!
//! Every formula constant the simulation uses is a field here. Loaded from JSON;
//! any section or field missing from the file keeps its default.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::TuningError;
use crate::sim::state::{AgentKind, PowerUpKind};

/// Spawn-count curve for one agent kind
///
/// `base(w) = base + floor((1 + w * difficulty_step) * per_difficulty)` once
/// `w >= unlock_wave`, and the sampled count is uniform in
/// `[base - spread_below, base + spread_above]`, floored at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindCurve {
    pub kind: AgentKind,
    pub unlock_wave: u32,
    pub base: i32,
    pub per_difficulty: f32,
    pub spread_below: i32,
    pub spread_above: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveTuning {
    /// Seconds between a cleared wave and the next one
    pub post_wave_delay: f32,
    /// Difficulty added per wave index
    pub difficulty_step: f32,
    pub curves: Vec<KindCurve>,
}

impl Default for WaveTuning {
    fn default() -> Self {
        Self {
            post_wave_delay: POST_WAVE_DELAY,
            difficulty_step: 0.25,
            curves: vec![
                KindCurve {
                    kind: AgentKind::Virus,
                    unlock_wave: 0,
                    base: 2,
                    per_difficulty: 2.0,
                    spread_below: 1,
                    spread_above: 2,
                },
                KindCurve {
                    kind: AgentKind::Trojan,
                    unlock_wave: 2,
                    base: 0,
                    per_difficulty: 0.7,
                    spread_below: 1,
                    spread_above: 1,
                },
                KindCurve {
                    kind: AgentKind::Adware,
                    unlock_wave: 4,
                    base: 0,
                    per_difficulty: 0.4,
                    spread_below: 1,
                    spread_above: 1,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub max_health: u32,
    pub speed: f32,
    /// Seconds between shots at run start
    pub fire_rate: f32,
    pub min_fire_rate: f32,
    /// Fire-rate multiplier applied at the start of every wave
    pub decay_factor: f32,
    pub hurt_duration: f32,
    pub bullet_speed: f32,
    /// Seconds before an unhit bullet expires
    pub bullet_lifetime: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            max_health: 5,
            speed: 200.0,
            fire_rate: 0.2,
            min_fire_rate: 0.05,
            decay_factor: 0.965,
            hurt_duration: PLAYER_HURT_DURATION,
            bullet_speed: 500.0,
            bullet_lifetime: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnTuning {
    pub attempts: u32,
    /// Maximum offset from an anchor on each axis
    pub jitter: f32,
    pub anchors: Vec<Vec2>,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        let x = ARENA_HALF_WIDTH - 40.0;
        let y = ARENA_HALF_HEIGHT - 40.0;
        Self {
            attempts: SPAWN_ATTEMPTS,
            jitter: SPAWN_JITTER,
            anchors: vec![
                Vec2::new(-x, -y),
                Vec2::new(x, -y),
                Vec2::new(-x, y),
                Vec2::new(x, y),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringTuning {
    pub separation_radius: f32,
    pub separation_weight: f32,
}

impl Default for SteeringTuning {
    fn default() -> Self {
        Self {
            separation_radius: SEPARATION_RADIUS,
            separation_weight: SEPARATION_WEIGHT,
        }
    }
}

/// Offspring released by a splitter on death
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitProfile {
    pub into: AgentKind,
    pub min: u32,
    pub max: u32,
    pub jitter: f32,
}

/// Per-kind stats and death side effects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindProfile {
    pub max_health: u32,
    pub speed: f32,
    pub radius: f32,
    pub attack_cooldown: f32,
    pub drop_chance: f32,
    #[serde(default)]
    pub loot: Vec<PowerUpKind>,
    #[serde(default)]
    pub split: Option<SplitProfile>,
}

const DEFAULT_LOOT: [PowerUpKind; 3] = [PowerUpKind::Heal, PowerUpKind::MaxHealth, PowerUpKind::Shield];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Bestiary {
    pub virus: KindProfile,
    pub trojan: KindProfile,
    pub adware: KindProfile,
}

impl Default for Bestiary {
    fn default() -> Self {
        Self {
            virus: KindProfile {
                max_health: 3,
                speed: 100.0,
                radius: 10.0,
                attack_cooldown: 1.0,
                drop_chance: 0.2,
                loot: DEFAULT_LOOT.to_vec(),
                split: None,
            },
            trojan: KindProfile {
                max_health: 5,
                speed: 85.0,
                radius: 12.0,
                attack_cooldown: 1.0,
                drop_chance: 0.2,
                loot: DEFAULT_LOOT.to_vec(),
                split: Some(SplitProfile {
                    into: AgentKind::Virus,
                    min: 1,
                    max: 2,
                    jitter: SPLIT_JITTER,
                }),
            },
            adware: KindProfile {
                max_health: 8,
                speed: 70.0,
                radius: 14.0,
                attack_cooldown: 1.5,
                drop_chance: 0.2,
                loot: DEFAULT_LOOT.to_vec(),
                split: None,
            },
        }
    }
}

impl Bestiary {
    pub fn get(&self, kind: AgentKind) -> &KindProfile {
        match kind {
            AgentKind::Virus => &self.virus,
            AgentKind::Trojan => &self.trojan,
            AgentKind::Adware => &self.adware,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpTuning {
    pub heal_amount: u32,
    pub max_health_increase: u32,
    /// Seconds of full damage immunity
    pub shield_duration: f32,
}

impl Default for PowerUpTuning {
    fn default() -> Self {
        Self {
            heal_amount: 20,
            max_health_increase: 10,
            shield_duration: 2.0,
        }
    }
}

/// Complete balance table for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub waves: WaveTuning,
    pub player: PlayerTuning,
    pub spawning: SpawnTuning,
    pub steering: SteeringTuning,
    pub bestiary: Bestiary,
    pub power_ups: PowerUpTuning,
}

impl Tuning {
    pub fn profile(&self, kind: AgentKind) -> &KindProfile {
        self.bestiary.get(kind)
    }

    pub fn curve(&self, kind: AgentKind) -> Option<&KindCurve> {
        self.waves.curves.iter().find(|c| c.kind == kind)
    }

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load from a JSON file on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| TuningError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values that would break the simulation's invariants
    pub fn validate(&self) -> Result<(), TuningError> {
        let p = &self.player;
        if p.max_health == 0 {
            return Err(TuningError::invalid("player.max_health", "must be > 0"));
        }
        if p.fire_rate <= 0.0 {
            return Err(TuningError::invalid("player.fire_rate", "must be > 0"));
        }
        if p.min_fire_rate <= 0.0 {
            return Err(TuningError::invalid("player.min_fire_rate", "must be > 0"));
        }
        if p.min_fire_rate > p.fire_rate {
            return Err(TuningError::invalid(
                "player.min_fire_rate",
                format!("floor {} is above the starting fire rate {}", p.min_fire_rate, p.fire_rate),
            ));
        }
        if p.decay_factor <= 0.0 || p.decay_factor > 1.0 {
            return Err(TuningError::invalid(
                "player.decay_factor",
                format!("{} is outside (0, 1]", p.decay_factor),
            ));
        }
        if self.waves.post_wave_delay < 0.0 {
            return Err(TuningError::invalid("waves.post_wave_delay", "must be >= 0"));
        }
        if self.waves.difficulty_step < 0.0 {
            return Err(TuningError::invalid("waves.difficulty_step", "must be >= 0"));
        }
        if self.waves.curves.is_empty() {
            return Err(TuningError::invalid("waves.curves", "at least one kind must spawn"));
        }
        for curve in &self.waves.curves {
            if curve.spread_below < 0 || curve.spread_above < 0 {
                return Err(TuningError::invalid(
                    "waves.curves",
                    format!("{} spread must be non-negative", curve.kind.as_str()),
                ));
            }
        }
        if self.spawning.attempts == 0 {
            return Err(TuningError::invalid("spawning.attempts", "must be > 0"));
        }
        for kind in AgentKind::ALL {
            let profile = self.profile(kind);
            if profile.max_health == 0 {
                return Err(TuningError::invalid(
                    "bestiary.max_health",
                    format!("{} must have max_health > 0", kind.as_str()),
                ));
            }
            if !(0.0..=1.0).contains(&profile.drop_chance) {
                return Err(TuningError::invalid(
                    "bestiary.drop_chance",
                    format!("{} drop chance {} is outside [0, 1]", kind.as_str(), profile.drop_chance),
                ));
            }
            if let Some(split) = &profile.split {
                if split.min > split.max {
                    return Err(TuningError::invalid(
                        "bestiary.split",
                        format!("{} split range {}..={} is empty", kind.as_str(), split.min, split.max),
                    ));
                }
            }
        }
        Ok(())
    }
}
