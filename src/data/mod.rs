//! Editable data models: matchup matrix, field distribution and ranked results.

pub mod classes;
pub mod field;
pub mod matchups;
pub mod results;

pub use field::{FieldDistribution, FieldEntry};
pub use matchups::MatchupMatrix;
pub use results::{LineupResult, Results};

/// Parse user-typed numeric input.
///
/// Anything that is not a finite number becomes `0.0`, so an edit can never leave a model
/// holding a value it cannot use.
pub fn coerce_number(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}
