//! Variant-specific move classification.

use std::fmt;

/// Game variants the controller can shape requests for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    #[default]
    Standard,
    Crazyhouse,
    ThreeCheck,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Variant::Standard => "standard",
            Variant::Crazyhouse => "crazyhouse",
            Variant::ThreeCheck => "three-check",
        };
        f.write_str(name)
    }
}

/// True when the move denoted by `san` makes earlier positions unreachable:
/// castling, any capture, a pawn move (rendered all-lowercase), or a checking
/// move in three-check. Crazyhouse drops are also rendered lowercase, so the
/// crazyhouse test sits before the case test.
///
/// Used to trim the move list carried by an analysis request: the base
/// position can be advanced past the last irreversible move without changing
/// what the worker searches.
pub fn san_irreversible(variant: Variant, san: &str) -> bool {
    if san.starts_with("O-O") {
        return true;
    }
    if san.contains('x') {
        return true;
    }
    if variant == Variant::Crazyhouse {
        return false;
    }
    if san.chars().all(|c| !c.is_ascii_uppercase()) {
        return true;
    }
    variant == Variant::ThreeCheck && san.contains('+')
}
