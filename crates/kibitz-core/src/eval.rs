//! Raw worker evaluations and candidate-line ordering.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::fen::Color;
use crate::score::Score;

/// One candidate line of play with its evaluation. Workers report lines from
/// a fixed absolute perspective; the output pipeline re-orients them for the
/// side the request was made for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pv {
    pub moves: SmallVec<[String; 8]>,
    pub score: Score,
}

/// A raw evaluation reported by the worker pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalResult {
    /// Search depth actually reached.
    pub depth: u32,
    /// Measured throughput, thousands of nodes per second.
    pub knps: u32,
    /// Score of the best line, from the mover's perspective.
    pub score: Score,
    /// Candidate lines, one per requested multi-PV slot.
    pub pvs: Vec<Pv>,
    /// Position encoding this evaluation was computed for.
    pub fen: String,
}

/// Win-probability in `[0, 1]` for `color` given a score. The conversion
/// itself is supplied by the embedder; ordering below is generic over it.
pub type PovChances = dyn Fn(Color, Score) -> f64 + Send + Sync;

/// Order candidate lines best-first for `color`.
pub fn sort_pvs(pvs: &mut [Pv], color: Color, chances: &PovChances) {
    pvs.sort_by(|a, b| {
        chances(color, b.score)
            .partial_cmp(&chances(color, a.score))
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn pv(score: Score) -> Pv {
        Pv { moves: smallvec!["e2e4".to_string()], score }
    }

    // Plain centipawn ordering, mate dominating, sign flipped for black.
    fn chances(color: Color, score: Score) -> f64 {
        let cp = match score {
            Score::Cp(cp) => cp as f64,
            Score::Mate(m) if m > 0 => 100_000.0 - m as f64,
            Score::Mate(m) => -100_000.0 - m as f64,
        };
        match color {
            Color::White => cp,
            Color::Black => -cp,
        }
    }

    #[test]
    fn sorts_descending_for_white() {
        let mut pvs = vec![pv(Score::Cp(-30)), pv(Score::Mate(2)), pv(Score::Cp(120))];
        sort_pvs(&mut pvs, Color::White, &chances);
        assert_eq!(
            pvs.iter().map(|p| p.score).collect::<Vec<_>>(),
            vec![Score::Mate(2), Score::Cp(120), Score::Cp(-30)]
        );
    }

    #[test]
    fn sorts_descending_for_black() {
        let mut pvs = vec![pv(Score::Cp(-30)), pv(Score::Mate(2)), pv(Score::Cp(120))];
        sort_pvs(&mut pvs, Color::Black, &chances);
        assert_eq!(
            pvs.iter().map(|p| p.score).collect::<Vec<_>>(),
            vec![Score::Cp(-30), Score::Cp(120), Score::Mate(2)]
        );
    }

    #[test]
    fn eval_result_round_trips_through_json() {
        let ev = EvalResult {
            depth: 21,
            knps: 1500,
            score: Score::Cp(34),
            pvs: vec![pv(Score::Cp(34))],
            fen: crate::fen::INITIAL_FEN.to_string(),
        };
        let json = serde_json::to_string(&ev).unwrap();
        let back: EvalResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ev);
    }
}
