//! Move quality tiers derived from evaluation drop.

use serde::{Deserialize, Serialize};

/// Quality tier of a single move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Brilliant,
    Great,
    Good,
    Inaccuracy,
    Mistake,
    Blunder,
    /// Reserved for opening-book detection; never assigned by
    /// [`classify_drop`].
    Book,
}

impl Classification {
    /// Tiers that count toward a side's accuracy percentage.
    pub fn is_accurate(self) -> bool {
        matches!(self, Self::Brilliant | Self::Great | Self::Good)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Brilliant => "brilliant",
            Self::Great => "great",
            Self::Good => "good",
            Self::Inaccuracy => "inaccuracy",
            Self::Mistake => "mistake",
            Self::Blunder => "blunder",
            Self::Book => "book",
        };
        write!(f, "{name}")
    }
}

/// Classify a move by how much the mover's own advantage shrank, in
/// pawn units. Positive drop means the position got worse for the
/// mover. Zero-or-negative drops are tested against the
/// brilliant/great thresholds first; a drop of exactly 0 is good.
pub fn classify_drop(eval_drop: f64) -> Classification {
    if eval_drop <= 0.0 {
        if eval_drop <= -0.5 {
            Classification::Brilliant
        } else if eval_drop <= -0.2 {
            Classification::Great
        } else {
            Classification::Good
        }
    } else if eval_drop >= 3.0 {
        Classification::Blunder
    } else if eval_drop >= 1.5 {
        Classification::Mistake
    } else if eval_drop >= 0.5 {
        Classification::Inaccuracy
    } else {
        Classification::Good
    }
}
