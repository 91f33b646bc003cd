//! # Musical Chairs show controller
//!
//! Headless controller for the Musical Chairs exhibit. Listens for the audio
//! engine's playhead over OSC, reads the three seat sensors and fires lighting
//! and audio cues act by act. Restarts itself after the end of the show or
//! when the room has been idle too long.
//!
//! ## Usage
//! - `chairs_show` — installation defaults, sysfs GPIO seats
//! - `chairs_show --config show.toml --journal data/show_journal.csv`
//! - `chairs_show --simulate-seats --dry-run --listen 127.0.0.1:2010` — no hardware, cues only logged
//!
//! Log level via `RUST_LOG` (default `info`). Ctrl-C or SIGTERM stops the
//! current show cleanly: GPIO released, journal flushed.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use chairs_show::supervisor;
use chairs_show::utils::config::{SeatBackend, ShowConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Musical Chairs show controller", long_about = None)]
struct Args {
    /// TOML show configuration; missing keys keep the installation defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for pause duration and target seat draws
    #[arg(long)]
    seed: Option<u64>,

    /// OSC listen address, e.g. 0.0.0.0:2010
    #[arg(long)]
    listen: Option<String>,

    /// Append show events as CSV rows to this file
    #[arg(long)]
    journal: Option<PathBuf>,

    /// Run without GPIO; seats never report occupied
    #[arg(long)]
    simulate_seats: bool,

    /// Log cues instead of sending them
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn into_config(self) -> Result<ShowConfig> {
        let mut config = match &self.config {
            Some(path) => ShowConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ShowConfig::default(),
        };

        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(listen) = self.listen {
            config.listen_addr = listen;
        }
        if let Some(journal) = self.journal {
            config.journal_path = Some(journal);
        }
        if self.simulate_seats {
            config.seat_backend = SeatBackend::Simulated;
        }
        config.dry_run |= self.dry_run;

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config()?;
    info!("=== MUSICAL CHAIRS CONTROLLER START ===");
    info!(
        "console {} | audio {} | listen {} | seats {:?}",
        config.console_addr, config.audio_addr, config.listen_addr, config.seat_backend
    );

    supervisor::run(config).context("show controller stopped")?;
    info!("=== MUSICAL CHAIRS CONTROLLER STOP ===");
    Ok(())
}
