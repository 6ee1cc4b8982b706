//! Files written by the planner: result exports and saved sessions.

use crate::data::results::{ExportRow, EXPORT_HEADER};
use crate::data::Results;
use crate::orchestrator::WorkflowState;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_EXPORT_NAME: &str = "lineup_results.csv";

/// A workflow state as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub saved_at_utc: String,
    pub state: WorkflowState,
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}

/// Where saved sessions live: `<data dir>/lineup-planner/sessions`.
pub fn sessions_dir() -> Result<PathBuf> {
    let base = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .context("no data directory available")?;
    Ok(base.join("lineup-planner").join("sessions"))
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render export rows as CSV text, header first.
pub fn rows_to_csv(rows: &[ExportRow]) -> String {
    let mut out = EXPORT_HEADER.join(",");
    out.push('\n');
    for row in rows {
        let mut cells: Vec<String> = row.decks.iter().map(|d| csv_field(d)).collect();
        cells.push(format!("{:.4}", row.win_rate));
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

/// Write every result, in rank order, as CSV.
pub fn export_csv(path: &Path, results: &Results) -> Result<()> {
    write_file(path, rows_to_csv(&results.export_rows()).as_bytes())
}

/// Write every result, in rank order, as a JSON array.
pub fn export_json(path: &Path, results: &Results) -> Result<()> {
    let json = serde_json::to_vec_pretty(results).context("serialize results")?;
    write_file(path, &json)
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

/// Save a workflow state into `dir`, named after the current time.
pub fn save_session(dir: &Path, state: &WorkflowState) -> Result<PathBuf> {
    let snapshot = SessionSnapshot {
        saved_at_utc: now_rfc3339(),
        state: state.clone(),
    };
    let name = format!(
        "session-{}.json",
        snapshot.saved_at_utc.replace(':', "-").replace('T', "_")
    );
    let path = dir.join(name);
    let json = serde_json::to_vec_pretty(&snapshot).context("serialize session")?;
    write_file(&path, &json)?;
    Ok(path)
}

pub fn load_session(path: &Path) -> Result<SessionSnapshot> {
    let data = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("parse session {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LineupResult;
    use crate::orchestrator::Stage;
    use rand::RngCore;

    fn scratch_dir() -> PathBuf {
        let mut b = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut b);
        std::env::temp_dir().join(format!("lineup-planner-test-{}", u64::from_le_bytes(b)))
    }

    fn results() -> Results {
        Results::new(vec![
            LineupResult {
                decks: ["Control Warrior", "Aggro Paladin", "Big Priest", "Tempo Mage"]
                    .map(String::from),
                win_rate: 0.612345,
            },
            LineupResult {
                decks: ["Quest, Warrior", "Aggro Paladin", "Big Priest", "Tempo Mage"]
                    .map(String::from),
                win_rate: 0.5,
            },
        ])
    }

    #[test]
    fn csv_has_fixed_header_and_four_decimals() {
        let csv = rows_to_csv(&results().export_rows());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Deck 1,Deck 2,Deck 3,Deck 4,Win Rate");
        assert_eq!(
            lines[1],
            "Control Warrior,Aggro Paladin,Big Priest,Tempo Mage,0.6123"
        );
        assert_eq!(
            lines[2],
            "\"Quest, Warrior\",Aggro Paladin,Big Priest,Tempo Mage,0.5000"
        );
    }

    #[test]
    fn exports_and_sessions_round_trip_on_disk() {
        let dir = scratch_dir();
        let csv_path = dir.join(DEFAULT_EXPORT_NAME);
        export_csv(&csv_path, &results()).unwrap();
        assert_eq!(std::fs::read_to_string(&csv_path).unwrap().lines().count(), 3);

        let json_path = dir.join("results.json");
        export_json(&json_path, &results()).unwrap();
        let back: Results =
            serde_json::from_slice(&std::fs::read(&json_path).unwrap()).unwrap();
        assert_eq!(back, results());

        let state = WorkflowState {
            stage: Stage::Results,
            results: Some(results()),
            ..Default::default()
        };
        let saved = save_session(&dir, &state).unwrap();
        let snapshot = load_session(&saved).unwrap();
        assert_eq!(snapshot.state, state);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
