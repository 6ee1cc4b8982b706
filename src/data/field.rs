use crate::data::coerce_number;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Conventional total the normalisation helpers aim for (roughly one weight point per
/// lineup in a 400-lineup field).
pub const TARGET_TOTAL: f64 = 400.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub deck: String,
    /// Relative frequency; never negative.
    pub pct: f64,
}

/// Relative frequency of each deck in the expected field.
///
/// Entry order is kept as given so the editing view stays stable. Weights do not have to
/// sum to anything in particular.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDistribution {
    pub entries: Vec<FieldEntry>,
}

impl FieldDistribution {
    pub fn new(entries: Vec<FieldEntry>) -> Self {
        Self { entries }
    }

    /// Equal weight for every deck, `total / n` each.
    pub fn uniform(deck_names: &[String], total: f64) -> Self {
        let pct = if deck_names.is_empty() {
            0.0
        } else {
            total / deck_names.len() as f64
        };
        Self {
            entries: deck_names
                .iter()
                .map(|deck| FieldEntry {
                    deck: deck.clone(),
                    pct,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.pct).sum()
    }

    pub fn weight(&self, deck: &str) -> Option<f64> {
        self.entries.iter().find(|e| e.deck == deck).map(|e| e.pct)
    }

    /// Align entries with the matrix deck list: keep one entry per known deck (first wins),
    /// drop unknown decks, and append missing ones at weight 0.
    pub fn reconcile(&mut self, deck_names: &[String]) {
        let known: HashSet<&str> = deck_names.iter().map(String::as_str).collect();
        let mut seen: HashSet<String> = HashSet::with_capacity(deck_names.len());
        self.entries
            .retain(|e| known.contains(e.deck.as_str()) && seen.insert(e.deck.clone()));
        for deck in deck_names {
            if !seen.contains(deck) {
                seen.insert(deck.clone());
                self.entries.push(FieldEntry {
                    deck: deck.clone(),
                    pct: 0.0,
                });
            }
        }
    }

    /// Set a deck's weight from raw user input; unparsable input becomes 0 and negatives are
    /// raised to 0. Returns `false` when the deck has no entry.
    pub fn set_weight(&mut self, deck: &str, raw: &str) -> bool {
        match self.entries.iter_mut().find(|e| e.deck == deck) {
            Some(entry) => {
                entry.pct = coerce_number(raw).max(0.0);
                true
            }
            None => false,
        }
    }

    /// Rescale proportionally so the weights sum to `target`. Does nothing when the
    /// current sum is zero.
    pub fn normalize_to(&mut self, target: f64) {
        let total = self.total();
        if total <= 0.0 {
            return;
        }
        for entry in &mut self.entries {
            entry.pct = entry.pct / total * target;
        }
    }

    pub fn equal_distribution(&mut self, target: f64) {
        if self.entries.is_empty() {
            return;
        }
        let pct = target / self.entries.len() as f64;
        for entry in &mut self.entries {
            entry.pct = pct;
        }
    }

    /// The distribution actually submitted for computation: positive weights only.
    pub fn finalize(&self) -> Result<FieldDistribution, ValidationError> {
        let entries: Vec<FieldEntry> = self
            .entries
            .iter()
            .filter(|e| e.pct > 0.0)
            .cloned()
            .collect();
        if entries.is_empty() {
            return Err(ValidationError::EmptyField);
        }
        Ok(FieldDistribution { entries })
    }

    /// Entries heaviest first, for display.
    pub fn sorted_by_weight(&self) -> Vec<&FieldEntry> {
        let mut sorted: Vec<&FieldEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| b.pct.partial_cmp(&a.pct).unwrap_or(std::cmp::Ordering::Equal));
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(pairs: &[(&str, f64)]) -> FieldDistribution {
        FieldDistribution::new(
            pairs
                .iter()
                .map(|(deck, pct)| FieldEntry {
                    deck: deck.to_string(),
                    pct: *pct,
                })
                .collect(),
        )
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reconcile_adds_missing_and_drops_unknown() {
        let mut f = field(&[("A", 10.0), ("Gone", 5.0), ("B", 3.0)]);
        f.reconcile(&names(&["A", "B", "C"]));
        assert_eq!(f, field(&[("A", 10.0), ("B", 3.0), ("C", 0.0)]));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let deck_names = names(&["A", "B", "C"]);
        let mut once = field(&[("C", 1.0), ("A", 2.0), ("A", 9.0), ("Z", 4.0)]);
        once.reconcile(&deck_names);
        let mut twice = once.clone();
        twice.reconcile(&deck_names);
        assert_eq!(once, twice);
        assert_eq!(once.weight("A"), Some(2.0));
        assert_eq!(once.len(), 3);
    }

    #[test]
    fn set_weight_coerces_and_floors_at_zero() {
        let mut f = field(&[("A", 1.0)]);
        assert!(f.set_weight("A", "-5"));
        assert_eq!(f.weight("A"), Some(0.0));
        assert!(f.set_weight("A", "junk"));
        assert_eq!(f.weight("A"), Some(0.0));
        assert!(f.set_weight("A", "12000"));
        assert_eq!(f.weight("A"), Some(12000.0));
        assert!(!f.set_weight("B", "3"));
    }

    #[test]
    fn normalize_preserves_ratio() {
        let mut f = field(&[("A", 10.0), ("B", 30.0)]);
        f.normalize_to(TARGET_TOTAL);
        assert_eq!(f, field(&[("A", 100.0), ("B", 300.0)]));
    }

    #[test]
    fn normalize_of_all_zero_is_a_noop() {
        let mut f = field(&[("A", 0.0), ("B", 0.0)]);
        f.normalize_to(TARGET_TOTAL);
        assert_eq!(f, field(&[("A", 0.0), ("B", 0.0)]));
    }

    #[test]
    fn equal_distribution_splits_target() {
        let mut f = field(&[("A", 7.0), ("B", 0.0), ("C", 1.0), ("D", 2.0)]);
        f.equal_distribution(TARGET_TOTAL);
        assert!(f.entries.iter().all(|e| e.pct == 100.0));
    }

    #[test]
    fn finalize_rejects_all_zero() {
        let f = field(&[("A", 0.0), ("B", 0.0)]);
        assert_eq!(f.finalize(), Err(ValidationError::EmptyField));
    }

    #[test]
    fn finalize_keeps_positive_entries_unchanged() {
        let f = field(&[("A", 0.0), ("B", 25.0), ("C", 75.0)]);
        let finalized = f.finalize().unwrap();
        assert_eq!(finalized, field(&[("B", 25.0), ("C", 75.0)]));
    }

    #[test]
    fn uniform_default_splits_total() {
        let f = FieldDistribution::uniform(&names(&["A", "B", "C", "D"]), 100.0);
        assert_eq!(f.total(), 100.0);
        assert_eq!(f.weight("C"), Some(25.0));
    }

    #[test]
    fn sorted_view_does_not_reorder_entries() {
        let f = field(&[("A", 1.0), ("B", 3.0), ("C", 2.0)]);
        let order: Vec<&str> = f.sorted_by_weight().iter().map(|e| e.deck.as_str()).collect();
        assert_eq!(order, ["B", "C", "A"]);
        assert_eq!(f.entries[0].deck, "A");
    }
}
