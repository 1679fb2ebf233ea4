//! Controller for one live human-vs-engine game.

use serde::Serialize;
use shakmaty::{Chess, Color, Move, Position};
use tracing::{debug, error, info, warn};

use chess_core::{pgn, rules};
use engine_bridge::{ChessEngine, EngineError};

use crate::store::{GameResult, GameStore, NewGame};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("engine unavailable: {0}")]
    Engine(#[from] EngineError),
}

/// One move as played, for move lists and captured-piece displays.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub from: String,
    pub to: String,
    /// Moving piece, lowercase letter ('p', 'n', ...).
    pub piece: char,
    pub captured: Option<char>,
    pub promotion: Option<char>,
    pub san: String,
}

/// Pieces each side has lost, in capture order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CapturedPieces {
    pub white: Vec<char>,
    pub black: Vec<char>,
}

/// Drives one game between the human player and the engine. Human
/// moves come in as coordinates, engine replies are fetched through
/// the [`ChessEngine`] facade, and the finished game goes to the
/// [`GameStore`].
pub struct GameSession<E, S> {
    engine: E,
    store: S,
    user_id: i64,
    pos: Chess,
    player_color: Color,
    difficulty: u8,
    thinking: bool,
    moves: Vec<MoveRecord>,
    captured: CapturedPieces,
    /// Repetition keys of every position seen, starting position included.
    seen_positions: Vec<String>,
}

impl<E: ChessEngine, S: GameStore> GameSession<E, S> {
    pub fn new(engine: E, store: S, user_id: i64) -> Self {
        Self {
            engine,
            store,
            user_id,
            pos: rules::starting_position(),
            player_color: Color::White,
            difficulty: 5,
            thinking: false,
            moves: Vec::new(),
            captured: CapturedPieces::default(),
            seen_positions: vec![rules::repetition_key(&rules::starting_position())],
        }
    }

    /// Fresh game. Brings the engine up and applies the difficulty; if
    /// the human plays Black the engine moves first.
    pub async fn initialize(
        &mut self,
        player_color: Color,
        difficulty: u8,
    ) -> Result<(), SessionError> {
        self.reset();
        self.player_color = player_color;
        self.engine.ensure_ready().await?;
        self.difficulty = self.engine.set_difficulty(difficulty).await;
        info!(difficulty = self.difficulty, "game initialized");

        if player_color == Color::Black {
            self.make_engine_move().await;
        }
        Ok(())
    }

    /// Apply a human move given as board coordinates. Returns false
    /// without state change when the engine is thinking, it is not the
    /// human's turn, or the move is illegal. On acceptance the engine's
    /// reply (or, for a finished game, persistence) runs before return.
    pub async fn submit_move(&mut self, from: &str, to: &str, promotion: Option<char>) -> bool {
        if self.thinking {
            return false;
        }
        if self.pos.turn() != self.player_color {
            return false;
        }

        let uci = rules::coords_to_uci(from, to, promotion);
        let mv = match rules::parse_uci(&self.pos, &uci) {
            Ok(mv) => mv,
            Err(e) => {
                debug!(%e, "rejected player move");
                return false;
            }
        };
        self.apply_move(&mv);

        if self.is_game_over() {
            self.persist_result().await;
        } else {
            self.make_engine_move().await;
        }
        true
    }

    /// Ask the engine for its reply and play it. A missing or illegal
    /// reply is logged and leaves the position unchanged.
    async fn make_engine_move(&mut self) {
        if self.is_game_over() {
            return;
        }
        self.thinking = true;
        let fen = rules::fen_of(&self.pos);
        // The difficulty level doubles as the search depth, so weaker
        // settings also search shallower.
        let reply = self
            .engine
            .best_move(&fen, u32::from(self.difficulty))
            .await;
        match reply {
            Some(uci) => match rules::parse_uci(&self.pos, &uci) {
                Ok(mv) => self.apply_move(&mv),
                Err(e) => warn!(%uci, %e, "engine suggested an illegal move"),
            },
            None => warn!("engine returned no move"),
        }
        self.thinking = false;

        if self.is_game_over() {
            self.persist_result().await;
        }
    }

    fn apply_move(&mut self, mv: &Move) {
        let san = rules::san_of(&self.pos, mv);
        let uci = rules::uci_of(mv);
        let mover = self.pos.turn();

        if let Some(role) = mv.capture() {
            // Tally under the side that lost the piece.
            match mover {
                Color::White => self.captured.black.push(role.char()),
                Color::Black => self.captured.white.push(role.char()),
            }
        }

        self.moves.push(MoveRecord {
            from: uci[0..2].to_string(),
            to: uci[2..4].to_string(),
            piece: mv.role().char(),
            captured: mv.capture().map(|r| r.char()),
            promotion: mv.promotion().map(|r| r.char()),
            san,
        });

        self.pos.play_unchecked(*mv);
        self.seen_positions.push(rules::repetition_key(&self.pos));
    }

    fn is_threefold(&self) -> bool {
        let current = self.seen_positions.last();
        match current {
            Some(key) => self.seen_positions.iter().filter(|k| *k == key).count() >= 3,
            None => false,
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.pos.is_game_over() || self.pos.halfmoves() >= 100 || self.is_threefold()
    }

    /// checkmate -> the side to move has been mated; everything else
    /// that ends a game is a draw.
    fn result_for_player(&self) -> GameResult {
        if self.pos.is_checkmate() {
            let winner = !self.pos.turn();
            if winner == self.player_color {
                GameResult::Win
            } else {
                GameResult::Loss
            }
        } else {
            GameResult::Draw
        }
    }

    async fn persist_result(&mut self) {
        let result = self.result_for_player();
        let result_token = if self.pos.is_checkmate() {
            match !self.pos.turn() {
                Color::White => "1-0",
                Color::Black => "0-1",
            }
        } else {
            "1/2-1/2"
        };
        let sans: Vec<String> = self.moves.iter().map(|m| m.san.clone()).collect();
        let game = NewGame {
            user_id: self.user_id,
            moves_pgn: pgn::movetext(&sans, Some(result_token)),
            final_fen: rules::fen_of(&self.pos),
            result,
            user_color: match self.player_color {
                Color::White => "white".to_string(),
                Color::Black => "black".to_string(),
            },
            opponent_label: format!("Computer Level {}", self.difficulty),
            opponent_rating: None,
        };
        if let Err(e) = self.store.save_game(game).await {
            // In-memory state stays as it is; the UI layer alerts the user.
            error!(error = %e, "failed to save finished game");
        }
    }

    /// Back to a fresh starting position. The engine process is untouched.
    pub fn reset(&mut self) {
        self.pos = rules::starting_position();
        self.moves.clear();
        self.captured = CapturedPieces::default();
        self.thinking = false;
        self.seen_positions.clear();
        self.seen_positions
            .push(rules::repetition_key(&self.pos));
    }

    pub fn fen(&self) -> String {
        rules::fen_of(&self.pos)
    }

    pub fn turn(&self) -> Color {
        self.pos.turn()
    }

    pub fn player_color(&self) -> Color {
        self.player_color
    }

    pub fn is_thinking(&self) -> bool {
        self.thinking
    }

    pub fn is_check(&self) -> bool {
        self.pos.is_check()
    }

    pub fn is_checkmate(&self) -> bool {
        self.pos.is_checkmate()
    }

    pub fn moves(&self) -> &[MoveRecord] {
        &self.moves
    }

    pub fn captured_pieces(&self) -> &CapturedPieces {
        &self.captured
    }
}
