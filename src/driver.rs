//! Runs the memory store and The Dreaming side by side.

use crate::dreaming::{Dreaming, TickerConfig, TickerError, TickerState};
use crate::memory::{MemoryStore, ReflectOutcome, RoomKind, StoreConfig};
use std::thread;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Episodic rooms seeded before the ticker starts
    pub seed_rooms: usize,
    /// Wait before reflecting
    pub warmup: Duration,
    /// Wait after reflecting, before stopping the ticker
    pub dream_after: Duration,
    pub store: StoreConfig,
    pub ticker: TickerConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            seed_rooms: 20,
            warmup: Duration::from_secs(5),
            dream_after: Duration::from_secs(7),
            store: StoreConfig::default(),
            ticker: TickerConfig::default(),
        }
    }
}

/// Final state of a run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: ReflectOutcome,
    pub final_level: u64,
    pub final_rooms: usize,
    pub top_room: Option<String>,
    pub ticker_state: TickerState,
}

pub fn run_together(config: DriverConfig) -> Result<RunReport, TickerError> {
    let mut martian = MemoryStore::new(config.store);
    for i in 0..config.seed_rooms {
        martian.add(
            format!("Episodic memory fragment {} — chaotic creative energy", i),
            RoomKind::Episodic,
            false,
        );
    }

    let mut dreaming = Dreaming::new(config.ticker);
    dreaming.start()?;

    println!("Starting concurrent run: The Martian + The Dreaming");
    println!("Initial Martian rooms: {}", martian.len());

    thread::sleep(config.warmup);

    println!("\nMartian wakes up to reflect...");
    let outcome = martian.reflect();
    match outcome {
        ReflectOutcome::Consolidated { .. } => {
            println!("Martian reflection: {}", outcome);
            println!("Current rooms: {}", martian.len());
        }
        _ => println!("Martian: {}", outcome),
    }

    thread::sleep(config.dream_after);

    let ticker_state = dreaming.stop();
    let final_level = dreaming.level();
    info!(?ticker_state, final_level, "run finished");

    println!("\nDreaming stopped.");
    println!("Final dream level: {}", final_level);
    println!("Final Martian rooms after consolidation: {}", martian.len());

    let top_room = martian.rooms().first().map(|room| room.excerpt(80));
    if let Some(text) = &top_room {
        println!("Top room: {}...", text);
    }

    Ok(RunReport {
        outcome,
        final_level,
        final_rooms: martian.len(),
        top_room,
        ticker_state,
    })
}
