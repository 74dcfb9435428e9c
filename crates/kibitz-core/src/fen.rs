//! Helpers over compact position encodings (FEN-like strings).
//!
//! Positions travel through the controller as opaque encoded strings; only
//! the board field and the side-to-move token are ever inspected here.

use serde::{Deserialize, Serialize};

/// The standard starting position.
pub const INITIAL_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Side of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// The side to move at the given ply (ply 0 is the initial position).
    pub fn to_move_at(ply: u32) -> Color {
        if ply % 2 == 0 {
            Color::White
        } else {
            Color::Black
        }
    }
}

/// Replace the side-to-move token with the opposite color, leaving every
/// other field untouched. Encodings without a recognizable token are
/// returned unchanged.
pub fn flip_turn(fen: &str) -> String {
    let mut fields: Vec<&str> = fen.split_whitespace().collect();
    match fields.get(1) {
        Some(&"w") => fields[1] = "b",
        Some(&"b") => fields[1] = "w",
        _ => return fen.to_string(),
    }
    fields.join(" ")
}

/// Number of non-pawn, non-king pieces in the board field. Used to filter
/// endgame positions out of throughput sampling, where searches run fast
/// enough to skew the estimate.
pub fn major_piece_count(fen: &str) -> usize {
    fen.split_whitespace()
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphabetic() && !matches!(c, 'p' | 'P' | 'k' | 'K'))
        .count()
}
