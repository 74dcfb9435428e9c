//! Domain types and rules for the kibitz background-analysis controller.
//!
//! This crate is the pure half of the workspace: position-encoding helpers,
//! evaluation scores, principal variations, step histories and the
//! variant-specific move classification used to shape analysis requests.
//! It spawns no threads and performs no I/O; the controller half lives in
//! `kibitz-client`.

pub mod eval;
pub mod fen;
pub mod score;
pub mod step;
pub mod variant;

pub use eval::{sort_pvs, EvalResult, PovChances, Pv};
pub use fen::{flip_turn, major_piece_count, Color, INITIAL_FEN};
pub use score::Score;
pub use step::{Session, Step, TreePath};
pub use variant::{san_irreversible, Variant};
