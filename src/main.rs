//! Malware Arena headless runner
//!
//! Plays one run on autopilot and prints the run summary as JSON.
//!
//! Usage: `malware-arena [TUNING.json]`

use malware_arena::consts::SIM_DT;
use malware_arena::sim::{Simulation, TickInput};
use malware_arena::{LogSink, Tuning};

/// Give up after this much simulated time (seconds)
const MAX_RUN_SECONDS: f32 = 600.0;

fn main() {
    env_logger::init();
    log::info!("Malware Arena (headless) starting...");

    let tuning = match std::env::args().nth(1) {
        Some(path) => Tuning::load(&path).unwrap_or_else(|err| {
            log::error!("{err}; using default tuning");
            Tuning::default()
        }),
        None => Tuning::default(),
    };

    let mut sim = Simulation::new(tuning, LogSink);
    sim.start_run();

    let input = TickInput {
        idle_mode: true,
        ..Default::default()
    };
    let mut elapsed = 0.0;
    while !sim.is_over() && elapsed < MAX_RUN_SECONDS {
        sim.tick(&input, SIM_DT);
        elapsed += SIM_DT;
    }
    if !sim.is_over() {
        log::info!("Stopped after {MAX_RUN_SECONDS}s of simulated time");
    }

    match serde_json::to_string_pretty(&sim.summary()) {
        Ok(json) => println!("{json}"),
        Err(err) => log::error!("Failed to serialize run summary: {err}"),
    }
}
