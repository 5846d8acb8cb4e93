//! Run progress counters
//!
//! Passive observer of the event stream: counts kills and power-ups and keeps
//! the index of the wave in progress for the end-of-run report.

use serde::{Deserialize, Serialize};

use super::state::GameEvent;

/// Per-run counters; only ever increase, reset by starting a new run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressCounters {
    pub enemies_killed: u32,
    pub power_ups_collected: u32,
}

/// End-of-run report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// 0-based index of the wave the run ended on
    pub wave_index: u32,
    #[serde(flatten)]
    pub counters: ProgressCounters,
}

#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    counters: ProgressCounters,
    wave_index: u32,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the counters
    pub fn observe(&mut self, event: &GameEvent) {
        match event {
            // Every death counts, whatever the kind
            GameEvent::AgentDied(_) => self.counters.enemies_killed += 1,
            GameEvent::PowerUpCollected { .. } => self.counters.power_ups_collected += 1,
            GameEvent::WaveStarted { index, .. } => self.wave_index = *index,
            GameEvent::PlayerDied => {}
        }
    }

    pub fn enemies_killed(&self) -> u32 {
        self.counters.enemies_killed
    }

    pub fn power_ups_collected(&self) -> u32 {
        self.counters.power_ups_collected
    }

    pub fn wave_index(&self) -> u32 {
        self.wave_index
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            wave_index: self.wave_index,
            counters: self.counters,
        }
    }
}
