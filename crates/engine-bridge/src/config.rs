//! Engine configuration from environment variables

use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Path to the UCI engine binary
    pub engine_path: String,

    /// How long to wait for the `uciok` handshake
    pub startup_timeout: Duration,

    /// How long a best-move search may run before it is stopped
    pub best_move_timeout: Duration,

    /// How long an evaluation search may run before the best score
    /// seen so far is returned
    pub eval_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine_path: "/usr/local/bin/stockfish".to_string(),
            startup_timeout: Duration::from_secs(30),
            best_move_timeout: Duration::from_secs(15),
            eval_timeout: Duration::from_secs(10),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = env::var("STOCKFISH_PATH") {
            config.engine_path = path;
        }
        config
    }

    /// Config pointing at a specific binary, with default timeouts.
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            engine_path: path.into(),
            ..Self::default()
        }
    }
}
