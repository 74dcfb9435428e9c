//! Adaptive depth recommendation from observed search throughput.
//!
//! The estimator keeps a rolling window of knps samples taken from deep,
//! roughly balanced middlegame evaluations and maps the window's median to a
//! recommended depth ceiling. Shallow results, decided positions and
//! emptied-out boards are rejected as samples: they search unusually fast
//! and would bias the recommendation upward.

use std::collections::VecDeque;

use kibitz_core::{major_piece_count, EvalResult, Score};

/// Depth recommended before any sample has been accepted.
pub const DEFAULT_DEPTH: u32 = 18;

/// Depth ceiling meaning "search until stopped".
pub const MAX_DEPTH: u32 = 99;

const WINDOW: usize = 20;
const MIN_SAMPLES: usize = 5;
const MIN_SAMPLE_DEPTH: u32 = 16;
const BALANCED_CP: i32 = 500;
const MIN_MAJOR_PIECES: usize = 10;

/// Median knps → recommended depth. Thresholds are cumulative; the highest
/// exceeded threshold wins.
const DEPTH_STEPS: &[(u32, u32)] = &[
    (100, 19),
    (150, 20),
    (250, 21),
    (500, 22),
    (1000, 23),
    (2000, 24),
    (3500, 25),
    (5000, 26),
    (7000, 27),
];

pub struct DepthEstimator {
    samples: VecDeque<u32>,
    recommended: u32,
}

impl Default for DepthEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl DepthEstimator {
    pub fn new() -> Self {
        DepthEstimator { samples: VecDeque::with_capacity(WINDOW + 1), recommended: DEFAULT_DEPTH }
    }

    /// Current recommendation.
    pub fn recommended(&self) -> u32 {
        self.recommended
    }

    /// Feed one result. Returns the freshly computed recommendation when the
    /// sample was accepted and the window is large enough to trust.
    pub fn record(&mut self, eval: &EvalResult) -> Option<u32> {
        if !Self::applies(eval) {
            return None;
        }
        self.samples.push_back(eval.knps);
        while self.samples.len() > WINDOW {
            self.samples.pop_front();
        }
        if self.samples.len() < MIN_SAMPLES {
            return None;
        }
        self.recommended = depth_for(self.median());
        Some(self.recommended)
    }

    fn applies(eval: &EvalResult) -> bool {
        let balanced = matches!(eval.score, Score::Cp(cp) if cp.abs() < BALANCED_CP);
        eval.knps > 0
            && eval.depth >= MIN_SAMPLE_DEPTH
            && balanced
            && major_piece_count(&eval.fen) >= MIN_MAJOR_PIECES
    }

    fn median(&self) -> u32 {
        let mut sorted: Vec<u32> = self.samples.iter().copied().collect();
        sorted.sort_unstable();
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 1 {
            sorted[mid]
        } else {
            (sorted[mid - 1] + sorted[mid]) / 2
        }
    }
}

/// Step function over the threshold table.
pub(crate) fn depth_for(median_knps: u32) -> u32 {
    let mut depth = DEFAULT_DEPTH;
    for &(threshold, recommended) in DEPTH_STEPS {
        if median_knps > threshold {
            depth = recommended;
        }
    }
    depth
}
