//! Command line arguments.
//!
//! Flags override values from the settings file, which in turn override the
//! built-in defaults.

use clap::Parser;
use std::path::PathBuf;

use twin_sync::{ConfigError, Settings};

/// Factory line digital twin viewer
#[derive(Parser, Debug, Clone)]
#[command(name = "viz")]
#[command(about = "Live viewer for the factory line simulation server")]
pub struct Args {
    /// Base URL of the simulation server
    #[arg(long)]
    pub server: Option<String>,

    /// TOML settings file
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Random seed sent on reset
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of jobs in the episode
    #[arg(long)]
    pub jobs: Option<u32>,

    /// Number of stations on the line
    #[arg(long)]
    pub stations: Option<usize>,

    /// Size of the repair crew
    #[arg(long)]
    pub workers: Option<usize>,

    /// Per-step station failure probability
    #[arg(long)]
    pub fail_rate: Option<f64>,

    /// Time units a repair takes
    #[arg(long)]
    pub repair_time: Option<f64>,

    /// Start stepping as soon as the window opens
    #[arg(long)]
    pub auto_start: bool,

    /// Follow the server state without stepping it
    #[arg(long)]
    pub passive: bool,

    /// Run without a window and log progress
    #[arg(long)]
    pub headless: bool,

    /// With --headless: run the episode to completion in one call
    #[arg(long, requires = "headless")]
    pub fast_forward: bool,
}

impl Args {
    /// Loads the settings file (or defaults) and applies the flag overrides.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let mut settings = match &self.settings {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };
        self.apply(&mut settings);
        settings.validate()?;
        Ok(settings)
    }

    fn apply(&self, settings: &mut Settings) {
        if let Some(server) = &self.server {
            settings.server.base_url = server.clone();
        }
        let episode = &mut settings.episode;
        if let Some(stations) = self.stations {
            *episode = episode.clone().with_stations(stations);
        }
        if let Some(seed) = self.seed {
            episode.seed = Some(seed);
        }
        if let Some(jobs) = self.jobs {
            episode.n_jobs = jobs;
        }
        if let Some(workers) = self.workers {
            episode.workers = workers;
        }
        if let Some(fail_rate) = self.fail_rate {
            episode.fail_rate = fail_rate;
        }
        if let Some(repair_time) = self.repair_time {
            episode.repair_time = repair_time;
        }
    }
}
