//! Evaluation scores as reported by analysis workers.

use serde::{Deserialize, Serialize};

/// An engine evaluation, signed from the perspective of the side to move in
/// the position it was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Score {
    /// Advantage in hundredths of a pawn.
    Cp(i32),
    /// Forced mate in N moves; negative means getting mated.
    Mate(i32),
}

impl Score {
    /// Centipawn value, if this is not a mate score.
    pub fn cp(&self) -> Option<i32> {
        match self {
            Score::Cp(cp) => Some(*cp),
            Score::Mate(_) => None,
        }
    }

    /// Moves to mate, if this is a mate score.
    pub fn mate(&self) -> Option<i32> {
        match self {
            Score::Cp(_) => None,
            Score::Mate(mate) => Some(*mate),
        }
    }
}
