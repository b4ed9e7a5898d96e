#![deny(warnings)]

//! Backtest runtime: horizon building, playback and the interactive session.

use serde::{Deserialize, Serialize};

pub mod horizon;
pub mod playback;
pub mod session;

pub use horizon::{build_annual, build_history, build_history_seeded, rng_for};
pub use playback::{PlaybackController, PlaybackState, DEFAULT_SPEED_MS};
pub use session::{BacktestSession, Notice, Visible};

/// Runtime configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Seed for the growth jitter stream; entropy-seeded when absent.
    pub rng_seed: Option<u64>,
    /// Playback tick interval in milliseconds.
    pub speed_ms: u64,
    /// Preset store location.
    pub database_url: String,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            rng_seed: None,
            speed_ms: DEFAULT_SPEED_MS,
            database_url: persistence::default_sqlite_url().to_string(),
        }
    }
}
