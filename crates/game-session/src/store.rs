//! Persistence collaborator for finished games.
//!
//! Storage itself lives elsewhere; this module only fixes the contract
//! the session drives, plus an in-memory implementation used by tests
//! and local play.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("game not found: {0}")]
    NotFound(i64),
}

/// Outcome of a finished game from the human player's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    Win,
    Loss,
    Draw,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGame {
    pub user_id: i64,
    /// PGN movetext of the whole game.
    pub moves_pgn: String,
    /// Final position FEN.
    pub final_fen: String,
    pub result: GameResult,
    /// "white" or "black"
    pub user_color: String,
    pub opponent_label: String,
    pub opponent_rating: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: i64,
    #[serde(flatten)]
    pub game: NewGame,
    pub saved_at: DateTime<Utc>,
}

/// Contract the session persists through. Save failures are surfaced to
/// the caller and never roll back in-memory game state.
#[allow(async_fn_in_trait)]
pub trait GameStore {
    async fn save_game(&self, game: NewGame) -> Result<GameRecord, StoreError>;

    /// Page of a user's games, newest first, plus the total count.
    async fn list_games(
        &self,
        user_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<GameRecord>, usize), StoreError>;

    async fn get_game(&self, id: i64) -> Result<GameRecord, StoreError>;

    /// Returns whether a record was deleted.
    async fn delete_game(&self, id: i64) -> Result<bool, StoreError>;
}

impl<T: GameStore> GameStore for std::sync::Arc<T> {
    async fn save_game(&self, game: NewGame) -> Result<GameRecord, StoreError> {
        (**self).save_game(game).await
    }

    async fn list_games(
        &self,
        user_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<GameRecord>, usize), StoreError> {
        (**self).list_games(user_id, limit, offset).await
    }

    async fn get_game(&self, id: i64) -> Result<GameRecord, StoreError> {
        (**self).get_game(id).await
    }

    async fn delete_game(&self, id: i64) -> Result<bool, StoreError> {
        (**self).delete_game(id).await
    }
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    games: Mutex<Vec<GameRecord>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameStore for MemoryStore {
    async fn save_game(&self, game: NewGame) -> Result<GameRecord, StoreError> {
        let record = GameRecord {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            game,
            saved_at: Utc::now(),
        };
        self.games.lock().await.push(record.clone());
        Ok(record)
    }

    async fn list_games(
        &self,
        user_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<GameRecord>, usize), StoreError> {
        let games = self.games.lock().await;
        let mine: Vec<GameRecord> = games
            .iter()
            .rev()
            .filter(|r| r.game.user_id == user_id)
            .cloned()
            .collect();
        let total = mine.len();
        Ok((mine.into_iter().skip(offset).take(limit).collect(), total))
    }

    async fn get_game(&self, id: i64) -> Result<GameRecord, StoreError> {
        self.games
            .lock()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn delete_game(&self, id: i64) -> Result<bool, StoreError> {
        let mut games = self.games.lock().await;
        let before = games.len();
        games.retain(|r| r.id != id);
        Ok(games.len() < before)
    }
}
