//! Bridge to an external UCI chess engine process.
//!
//! [`EngineChannel`] owns the process and its line protocol;
//! [`EngineFacade`] turns it into best-move / evaluation requests.

pub mod channel;
pub mod config;
pub mod error;
pub mod facade;

pub use channel::{ChannelStatus, EngineChannel, Listen};
pub use config::EngineConfig;
pub use error::EngineError;
pub use facade::{ChessEngine, EngineFacade};
