//! The five-stage planning workflow as a plain state machine.
//!
//! Nothing here knows about channels or presentation; the state is serialisable so a session
//! can be saved and restored, and every transition is a synchronous call.

use crate::data::{FieldDistribution, MatchupMatrix, Results};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    #[default]
    DataSource,
    Matchups,
    Field,
    Calculate,
    Results,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::DataSource,
        Stage::Matchups,
        Stage::Field,
        Stage::Calculate,
        Stage::Results,
    ];

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::DataSource => Some(Stage::Matchups),
            Stage::Matchups => Some(Stage::Field),
            Stage::Field => Some(Stage::Calculate),
            Stage::Calculate => Some(Stage::Results),
            Stage::Results => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::DataSource => "DATA_SOURCE",
            Stage::Matchups => "MATCHUPS",
            Stage::Field => "FIELD",
            Stage::Calculate => "CALCULATE",
            Stage::Results => "RESULTS",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::DataSource => "Data Source",
            Stage::Matchups => "Matchups",
            Stage::Field => "Field",
            Stage::Calculate => "Calculate",
            Stage::Results => "Results",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = String;

    /// Accepts the stage name in any case, with `-` or `_` as separator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_ascii_uppercase();
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name() == wanted)
            .ok_or_else(|| format!("unknown stage {s:?}"))
    }
}

/// Everything the workflow has captured so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub stage: Stage,
    pub matchups: Option<MatchupMatrix>,
    pub field: Option<FieldDistribution>,
    pub results: Option<Results>,
    /// Last validation or operation error, kept for display.
    #[serde(default)]
    pub notice: Option<String>,
}

/// Whether `stage` has produced the datum it is responsible for.
pub fn can_advance(stage: Stage, state: &WorkflowState) -> bool {
    match stage {
        Stage::DataSource | Stage::Matchups => state.matchups.is_some(),
        Stage::Field => state.field.is_some(),
        Stage::Calculate => state.results.is_some(),
        Stage::Results => true,
    }
}

/// Payload of a stage's confirm action.
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmation {
    DataSource {
        matchups: MatchupMatrix,
        field: FieldDistribution,
    },
    Matchups(MatchupMatrix),
    Field(FieldDistribution),
    Calculate(Results),
}

impl Confirmation {
    pub fn stage(&self) -> Stage {
        match self {
            Confirmation::DataSource { .. } => Stage::DataSource,
            Confirmation::Matchups(_) => Stage::Matchups,
            Confirmation::Field(_) => Stage::Field,
            Confirmation::Calculate(_) => Stage::Calculate,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Workflow {
    state: WorkflowState,
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: WorkflowState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    pub fn can_advance(&self) -> bool {
        can_advance(self.state.stage, &self.state)
    }

    /// Navigate to `target`. Backward (or staying put) always works and keeps captured data;
    /// forward works one stage at a time and only when the current stage can advance.
    /// Anything else is ignored. Returns whether the stage changed or was already `target`.
    pub fn go_to(&mut self, target: Stage) -> bool {
        let current = self.state.stage;
        let allowed = target <= current || (Some(target) == current.next() && self.can_advance());
        if allowed {
            debug!(from = %current, to = %target, "stage change");
            self.state.stage = target;
        }
        allowed
    }

    /// Store a stage's output and move to the following stage. Only the stage currently
    /// shown can be confirmed.
    pub fn confirm(&mut self, confirmation: Confirmation) -> Result<Stage, ValidationError> {
        let stage = confirmation.stage();
        if stage != self.state.stage {
            return Err(ValidationError::WrongStage(stage.name()));
        }
        match confirmation {
            Confirmation::DataSource { matchups, field } => {
                self.state.matchups = Some(matchups);
                self.state.field = Some(field);
            }
            Confirmation::Matchups(matchups) => self.state.matchups = Some(matchups),
            Confirmation::Field(field) => self.state.field = Some(field),
            Confirmation::Calculate(results) => self.state.results = Some(results),
        }
        // Every confirmable stage has a successor.
        let next = stage.next().unwrap_or(Stage::Results);
        self.state.stage = next;
        self.state.notice = None;
        debug!(from = %stage, to = %next, "stage confirmed");
        Ok(next)
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.state.notice = Some(notice.into());
    }

    pub fn clear_notice(&mut self) {
        self.state.notice = None;
    }

    /// Drop all captured data and return to the first stage.
    pub fn reset(&mut self) {
        self.state = WorkflowState::default();
    }
}
