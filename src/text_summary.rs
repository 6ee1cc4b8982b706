//! Text summary builder for CLI output.
//!
//! Formats progress lines, a summary of the confirmed data and the ranked lineup table.

use crate::data::{FieldDistribution, MatchupMatrix, Results};
use crate::metrics;
use crate::model::ProgressEvent;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// One progress event as a single status line.
pub(crate) fn progress_line(event: &ProgressEvent) -> String {
    let pct = (event.progress.clamp(0.0, 1.0) * 100.0).round();
    if event.message.is_empty() {
        format!("[{}] {pct:>3}%", event.phase.label())
    } else {
        format!("[{}] {pct:>3}% {}", event.phase.label(), event.message)
    }
}

/// Overview of the data about to be submitted for computation.
pub(crate) fn build_data_summary(matchups: &MatchupMatrix, field: &FieldDistribution) -> TextSummary {
    let mut lines = vec![format!(
        "Matchups: {} decks, field: {} decks (total weight {:.1})",
        matchups.len(),
        field.len(),
        field.total()
    )];

    let ranked = matchups.ranked_by_average();
    if let Some((deck, avg)) = ranked.first() {
        lines.push(format!("Strongest on average: {deck} ({avg:.1}%)"));
    }

    let shares: Vec<String> = field
        .sorted_by_weight()
        .into_iter()
        .take(5)
        .map(|e| format!("{} {:.1}", e.deck, e.pct))
        .collect();
    if !shares.is_empty() {
        lines.push(format!("Most played: {}", shares.join(", ")));
    }

    let positive = field.entries.iter().filter(|e| e.pct > 0.0).count();
    lines.push(format!(
        "Estimated calculation time: ~{}s",
        metrics::estimate_calculation_secs(matchups.len(), positive)
    ));
    TextSummary { lines }
}

/// Stats plus the top `top` lineups that mention `filter`.
pub(crate) fn build_text_summary(results: &Results, filter: &str, top: usize) -> TextSummary {
    let mut lines = Vec::new();
    let stats = results.stats();
    lines.push(format!("Lineups evaluated: {}", stats.count));
    if let Some(best) = stats.best_win_rate {
        lines.push(format!("Best win rate: {:.2}%", best * 100.0));
    }
    if let Some(avg) = stats.top10_average {
        lines.push(format!("Average of top 10: {:.2}%", avg * 100.0));
    }

    let win_rates: Vec<f64> = results.lineups().iter().map(|l| l.win_rate * 100.0).collect();
    if let Some((mean, median, p25, p75)) = metrics::compute_metrics(&win_rates) {
        lines.push(format!(
            "Win rate: avg {mean:.2} med {median:.2} p25 {p25:.2} p75 {p75:.2} %"
        ));
    }

    let filtered = results.filter_by_name(filter);
    if !filter.is_empty() {
        lines.push(format!("Matching \"{filter}\": {}", filtered.len()));
    }
    for row in Results::top_n(&filtered, top) {
        lines.push(format!(
            "{:>4}. {:>6.2}%  {}",
            row.rank + 1,
            row.lineup.win_rate * 100.0,
            row.lineup.decks.join(" / ")
        ));
    }
    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LineupResult;
    use crate::model::Phase;

    fn results() -> Results {
        Results::new(vec![
            LineupResult {
                decks: ["Control Warrior", "Aggro Paladin", "Big Priest", "Tempo Mage"]
                    .map(String::from),
                win_rate: 0.6,
            },
            LineupResult {
                decks: ["Control Warrior", "Aggro Paladin", "Big Priest", "Zoo Warlock"]
                    .map(String::from),
                win_rate: 0.55,
            },
            LineupResult {
                decks: ["Odd Rogue", "Aggro Paladin", "Big Priest", "Zoo Warlock"]
                    .map(String::from),
                win_rate: 0.5,
            },
        ])
    }

    #[test]
    fn progress_line_uses_phase_label() {
        let line = progress_line(&ProgressEvent {
            phase: Phase::GeneratingLineups,
            progress: 0.456,
            message: "Generating lineups...".into(),
            completed: false,
        });
        assert_eq!(line, "[Generating Lineups]  46% Generating lineups...");
    }

    #[test]
    fn filtered_rows_keep_global_rank() {
        let summary = build_text_summary(&results(), "warlock", 1);
        assert!(summary.lines.contains(&"Best win rate: 60.00%".to_string()));
        assert!(summary.lines.contains(&"Matching \"warlock\": 2".to_string()));
        let table: Vec<&String> = summary.lines.iter().filter(|l| l.contains(" / ")).collect();
        assert_eq!(table.len(), 1);
        assert!(table[0].trim_start().starts_with("2."));
        assert!(table[0].ends_with("Zoo Warlock"));
    }

    #[test]
    fn data_summary_includes_estimate() {
        let matrix = MatchupMatrix::new(
            vec!["X".into(), "Y".into()],
            vec![vec![50.0, 60.0], vec![40.0, 50.0]],
        )
        .unwrap();
        let field = FieldDistribution::uniform(matrix.deck_names(), 100.0);
        let summary = build_data_summary(&matrix, &field);
        assert!(summary.lines[1].starts_with("Strongest on average: X"));
        assert_eq!(summary.lines.last().unwrap(), "Estimated calculation time: ~1s");
    }
}
