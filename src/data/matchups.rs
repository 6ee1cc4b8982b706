use crate::data::coerce_number;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Value assumed for a cell that has no data when averaging.
pub const NEUTRAL_WIN_RATE: f64 = 50.0;

/// Square deck-by-deck win-rate table, in percent.
///
/// `values[i][j]` is the win rate of `deck_names[i]` against `deck_names[j]`. Cells are
/// addressed by position, so `deck_names` must never be reordered without re-deriving
/// `values`. Missing cells (JSON `null`) are held as NaN and reported as `None` by [`cell`].
///
/// The matrix is deliberately not forced to be anti-symmetric.
///
/// [`cell`]: MatchupMatrix::cell
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct MatchupMatrix {
    deck_names: Vec<String>,
    values: Vec<Vec<f64>>,
}

#[derive(Deserialize)]
struct RawMatrix {
    deck_names: Vec<String>,
    values: Vec<Vec<Option<f64>>>,
}

impl TryFrom<RawMatrix> for MatchupMatrix {
    type Error = ValidationError;

    fn try_from(raw: RawMatrix) -> Result<Self, Self::Error> {
        // Null stays missing; `new` clamps everything else.
        let values = raw
            .values
            .into_iter()
            .map(|row| row.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
            .collect();
        MatchupMatrix::new(raw.deck_names, values)
    }
}

/// A pair of decks whose two win rates do not add up to 100.
#[derive(Debug, Clone, PartialEq)]
pub struct AsymmetricPair {
    pub row: String,
    pub col: String,
    /// `values[row][col] + values[col][row] - 100`
    pub excess: f64,
}

impl MatchupMatrix {
    /// Validate the shape and deck names. Present cells are clamped to `[0, 100]`; NaN
    /// stays as a missing cell.
    pub fn new(deck_names: Vec<String>, mut values: Vec<Vec<f64>>) -> Result<Self, ValidationError> {
        let mut seen = HashSet::with_capacity(deck_names.len());
        for name in &deck_names {
            if !seen.insert(name.as_str()) {
                return Err(ValidationError::DuplicateDeck(name.clone()));
            }
        }
        let decks = deck_names.len();
        if values.len() != decks {
            return Err(ValidationError::RowCount {
                decks,
                rows: values.len(),
            });
        }
        if let Some((row, r)) = values.iter().enumerate().find(|(_, r)| r.len() != decks) {
            return Err(ValidationError::NotSquare {
                decks,
                row,
                len: r.len(),
            });
        }
        for v in values.iter_mut().flatten().filter(|v| !v.is_nan()) {
            *v = v.clamp(0.0, 100.0);
        }
        Ok(Self { deck_names, values })
    }

    pub fn len(&self) -> usize {
        self.deck_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deck_names.is_empty()
    }

    pub fn deck_names(&self) -> &[String] {
        &self.deck_names
    }

    pub fn index_of(&self, deck: &str) -> Option<usize> {
        self.deck_names.iter().position(|d| d == deck)
    }

    /// Value at `(row, col)`, or `None` when out of range or missing.
    pub fn cell(&self, row: usize, col: usize) -> Option<f64> {
        self.values
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .filter(|v| !v.is_nan())
    }

    /// Write one cell from raw user input.
    ///
    /// Unparsable input becomes 0 and the result is clamped to `[0, 100]`. Diagonal and
    /// out-of-range writes are ignored; returns whether a cell was written.
    pub fn set_cell(&mut self, row: usize, col: usize, raw: &str) -> bool {
        if row == col {
            return false;
        }
        let Some(slot) = self.values.get_mut(row).and_then(|r| r.get_mut(col)) else {
            return false;
        };
        *slot = coerce_number(raw).clamp(0.0, 100.0);
        true
    }

    /// Mean of the off-diagonal cells in `deck`'s row, missing cells counted as 50.
    pub fn average_for(&self, deck: &str) -> Option<f64> {
        self.index_of(deck).and_then(|row| self.average_at(row))
    }

    pub fn average_at(&self, row: usize) -> Option<f64> {
        let n = self.len();
        if row >= n || n < 2 {
            return None;
        }
        let sum: f64 = (0..n)
            .filter(|&col| col != row)
            .map(|col| self.cell(row, col).unwrap_or(NEUTRAL_WIN_RATE))
            .sum();
        Some(sum / (n - 1) as f64)
    }

    /// Decks with their row averages, best first. Display ordering only.
    pub fn ranked_by_average(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = (0..self.len())
            .filter_map(|row| Some((self.deck_names[row].as_str(), self.average_at(row)?)))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }

    /// Off-diagonal pairs where `values[i][j] + values[j][i]` differs from 100 by more than
    /// `tolerance`. Each unordered pair is reported once; missing cells are skipped.
    pub fn asymmetric_pairs(&self, tolerance: f64) -> Vec<AsymmetricPair> {
        let n = self.len();
        let mut out = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let (Some(a), Some(b)) = (self.cell(i, j), self.cell(j, i)) else {
                    continue;
                };
                let excess = a + b - 100.0;
                if excess.abs() > tolerance {
                    out.push(AsymmetricPair {
                        row: self.deck_names[i].clone(),
                        col: self.deck_names[j].clone(),
                        excess,
                    });
                }
            }
        }
        out
    }
}

/// Same dataset: identical deck order and identical cells, missing matching missing.
impl PartialEq for MatchupMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.deck_names == other.deck_names
            && (0..self.len())
                .all(|i| (0..self.len()).all(|j| self.cell(i, j) == other.cell(i, j)))
    }
}
