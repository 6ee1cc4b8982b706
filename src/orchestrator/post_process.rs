//! Post-results processing: exports and session save after the results stage is reached.

use crate::orchestrator::WorkflowState;
use crate::storage;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Where the finished plan should be written.
#[derive(Debug, Clone, Default)]
pub(crate) struct OutputTargets<'a> {
    pub export_csv: Option<&'a Path>,
    pub export_json: Option<&'a Path>,
    /// Directory to save the session into; `None` skips the save.
    pub session_dir: Option<&'a Path>,
}

/// Result of post-results processing, ready for presentation.
pub(crate) struct ProcessedResults {
    pub export_messages: Vec<String>,
    pub saved_session_path: Option<PathBuf>,
}

/// Export the results held by `state` and save the state itself. Failures are reported as
/// messages and never abort the remaining steps.
pub(crate) fn process_results(targets: &OutputTargets<'_>, state: &WorkflowState) -> ProcessedResults {
    let mut export_messages = Vec::new();

    match state.results.as_ref() {
        Some(results) => {
            if let Some(path) = targets.export_csv {
                match storage::export_csv(path, results) {
                    Ok(()) => export_messages.push(format!("Exported CSV: {}", path.display())),
                    Err(e) => export_messages.push(format!("Export CSV failed: {e:#}")),
                }
            }
            if let Some(path) = targets.export_json {
                match storage::export_json(path, results) {
                    Ok(()) => export_messages.push(format!("Exported JSON: {}", path.display())),
                    Err(e) => export_messages.push(format!("Export JSON failed: {e:#}")),
                }
            }
        }
        None if targets.export_csv.is_some() || targets.export_json.is_some() => {
            export_messages.push("Nothing to export: no results yet".to_string());
        }
        None => {}
    }

    let saved_session_path = targets.session_dir.and_then(|dir| {
        storage::save_session(dir, state)
            .map_err(|e| warn!(error = %format!("{e:#}"), "session save failed"))
            .ok()
    });

    ProcessedResults {
        export_messages,
        saved_session_path,
    }
}
