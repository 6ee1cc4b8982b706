use crate::metrics;
use serde::{Deserialize, Serialize};

/// Header row used by every flat export of a result list.
pub const EXPORT_HEADER: [&str; 5] = ["Deck 1", "Deck 2", "Deck 3", "Deck 4", "Win Rate"];

/// Page sizes offered by the results view.
pub const TOP_PRESETS: [usize; 4] = [10, 20, 50, 100];

/// One ranked lineup as delivered by the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupResult {
    /// Four decks, one per class, in display order.
    pub decks: [String; 4],
    /// Expected win rate against the field, in `[0, 1]`.
    pub win_rate: f64,
}

impl LineupResult {
    pub fn mentions(&self, needle_lower: &str) -> bool {
        self.decks
            .iter()
            .any(|d| d.to_lowercase().contains(needle_lower))
    }
}

/// A lineup paired with its position in the solver's ranking (0 = best).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedLineup<'a> {
    pub rank: usize,
    pub lineup: &'a LineupResult,
}

/// A flat row for CSV or spreadsheet export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub decks: [String; 4],
    pub win_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResultsStats {
    pub count: usize,
    pub best_win_rate: Option<f64>,
    pub top10_average: Option<f64>,
}

/// Solver output, best lineup first.
///
/// Received as one batch and never mutated afterwards; filtering and paging produce views
/// that borrow from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Results {
    lineups: Vec<LineupResult>,
}

impl Results {
    pub fn new(lineups: Vec<LineupResult>) -> Self {
        Self { lineups }
    }

    pub fn len(&self) -> usize {
        self.lineups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lineups.is_empty()
    }

    pub fn lineups(&self) -> &[LineupResult] {
        &self.lineups
    }

    pub fn best(&self) -> Option<&LineupResult> {
        self.lineups.first()
    }

    /// Lineups containing a deck whose name includes `needle`, case-insensitively.
    /// An empty needle keeps everything.
    pub fn filter_by_name(&self, needle: &str) -> Vec<RankedLineup<'_>> {
        let needle = needle.to_lowercase();
        self.lineups
            .iter()
            .enumerate()
            .filter(|(_, l)| needle.is_empty() || l.mentions(&needle))
            .map(|(rank, lineup)| RankedLineup { rank, lineup })
            .collect()
    }

    /// First `n` of the filtered list, rank order untouched.
    pub fn top_n<'a>(filtered: &[RankedLineup<'a>], n: usize) -> Vec<RankedLineup<'a>> {
        filtered.iter().take(n).copied().collect()
    }

    /// Filter then page in one step, the way the results view asks for it.
    pub fn view(&self, needle: &str, n: usize) -> Vec<RankedLineup<'_>> {
        Self::top_n(&self.filter_by_name(needle), n)
    }

    /// The complete list in rank order, independent of any view settings.
    pub fn export_rows(&self) -> Vec<ExportRow> {
        self.lineups
            .iter()
            .map(|l| ExportRow {
                decks: l.decks.clone(),
                win_rate: l.win_rate,
            })
            .collect()
    }

    pub fn stats(&self) -> ResultsStats {
        let top: Vec<f64> = self.lineups.iter().take(10).map(|l| l.win_rate).collect();
        ResultsStats {
            count: self.lineups.len(),
            best_win_rate: self.best().map(|l| l.win_rate),
            top10_average: metrics::mean(&top),
        }
    }
}
