pub use shakmaty;

pub mod game_data;
pub mod pgn;
pub mod rules;
