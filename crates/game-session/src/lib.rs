//! One live human-vs-engine game: turn handling, engine replies,
//! terminal-result persistence.

pub mod session;
pub mod store;

pub use session::{CapturedPieces, GameSession, MoveRecord, SessionError};
pub use store::{GameRecord, GameResult, GameStore, MemoryStore, NewGame, StoreError};
