//! Presentation sink
//!
//! The simulation never talks to a HUD or menu directly. It is handed a sink at
//! construction and pushes the two notifications the UI cares about through it.

/// Receiver for player-facing notifications
pub trait PresentationSink {
    /// A wave just started (`index` is 0-based)
    fn announce_wave(&mut self, index: u32);

    /// The run ended; called exactly once per run
    fn show_game_over(&mut self, wave_index: u32, kills: u32, power_ups: u32);
}

/// Writes notifications to the log (headless runs)
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl PresentationSink for LogSink {
    fn announce_wave(&mut self, index: u32) {
        log::info!("Wave {}", index + 1);
    }

    fn show_game_over(&mut self, wave_index: u32, kills: u32, power_ups: u32) {
        log::info!(
            "Game over on wave {}: {} enemies killed, {} power-ups collected",
            wave_index + 1,
            kills,
            power_ups
        );
    }
}

/// One notification captured by `RecordingSink`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    WaveAnnounced(u32),
    GameOver {
        wave_index: u32,
        kills: u32,
        power_ups: u32,
    },
}

/// Keeps every notification in order
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub notices: Vec<Notice>,
}

impl RecordingSink {
    pub fn waves_announced(&self) -> Vec<u32> {
        self.notices
            .iter()
            .filter_map(|n| match n {
                Notice::WaveAnnounced(index) => Some(*index),
                _ => None,
            })
            .collect()
    }

    pub fn game_overs(&self) -> usize {
        self.notices
            .iter()
            .filter(|n| matches!(n, Notice::GameOver { .. }))
            .count()
    }
}

impl PresentationSink for RecordingSink {
    fn announce_wave(&mut self, index: u32) {
        self.notices.push(Notice::WaveAnnounced(index));
    }

    fn show_game_over(&mut self, wave_index: u32, kills: u32, power_ups: u32) {
        self.notices.push(Notice::GameOver {
            wave_index,
            kills,
            power_ups,
        });
    }
}
