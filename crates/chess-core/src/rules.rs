//! Rules-engine capability over shakmaty: FEN/SAN/UCI conversions and
//! legal move application. Everything position-related the rest of the
//! workspace needs goes through here.

use shakmaty::{
    fen::Fen, san::San, uci::UciMove, CastlingMode, Chess, Color, EnPassantMode, Move, Position,
};

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("invalid FEN '{0}'")]
    InvalidFen(String),

    #[error("illegal move '{0}'")]
    IllegalMove(String),
}

/// Standard starting position.
pub fn starting_position() -> Chess {
    Chess::default()
}

pub fn position_from_fen(fen: &str) -> Result<Chess, RulesError> {
    let parsed: Fen = fen
        .parse()
        .map_err(|_| RulesError::InvalidFen(fen.to_string()))?;
    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|_| RulesError::InvalidFen(fen.to_string()))
}

pub fn fen_of(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

/// SAN for a move about to be played on `pos`.
pub fn san_of(pos: &Chess, mv: &Move) -> String {
    San::from_move(pos, *mv).to_string()
}

/// Position key for repetition detection: FEN without move counters.
pub fn repetition_key(pos: &Chess) -> String {
    let fen = fen_of(pos);
    fen.split_whitespace()
        .take(4)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse and apply one SAN move, returning the move that was played.
pub fn play_san(pos: &mut Chess, san: &str) -> Result<Move, RulesError> {
    let parsed: San = san
        .parse()
        .map_err(|_| RulesError::IllegalMove(san.to_string()))?;
    let mv = parsed
        .to_move(pos)
        .map_err(|_| RulesError::IllegalMove(san.to_string()))?;
    pos.play_unchecked(mv);
    Ok(mv)
}

/// Resolve a UCI move string (e.g. "e2e4", "e7e8q") against a position,
/// rejecting moves that are not legal there.
pub fn parse_uci(pos: &Chess, uci: &str) -> Result<Move, RulesError> {
    let parsed: UciMove = uci
        .parse()
        .map_err(|_| RulesError::IllegalMove(uci.to_string()))?;
    parsed
        .to_move(pos)
        .map_err(|_| RulesError::IllegalMove(uci.to_string()))
}

/// Build a UCI move string from coordinate input (board UI drag/drop).
pub fn coords_to_uci(from: &str, to: &str, promotion: Option<char>) -> String {
    match promotion {
        Some(p) => format!("{from}{to}{}", p.to_ascii_lowercase()),
        None => format!("{from}{to}"),
    }
}

/// UCI text of an already-resolved move.
pub fn uci_of(mv: &Move) -> String {
    mv.to_uci(CastlingMode::Standard).to_string()
}

pub fn side_to_move(pos: &Chess) -> Color {
    pos.turn()
}
