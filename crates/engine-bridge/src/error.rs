//! Engine bridge error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to spawn engine process: {0}")]
    SpawnFailed(String),

    #[error("engine handshake timed out")]
    StartupTimeout,

    #[error("engine process crashed")]
    Crashed,
}
