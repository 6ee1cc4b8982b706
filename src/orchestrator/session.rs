//! Binds the workflow to the operation controller.
//!
//! The session is the single owner of both. Every failure is recorded as the workflow's
//! `notice` instead of being returned, so the state is always consistent and navigable.

use crate::data::classes::{distinct_classes, LINEUP_SIZE};
use crate::data::{FieldDistribution, MatchupMatrix};
use crate::engine::{OperationController, OperationStatus, OperationUpdate};
use crate::error::{OperationError, ValidationError};
use crate::model::{
    ComputeRequest, CrawlConfig, OperationKind, OperationOutput, OperationRequest, ProgressEvent,
};
use crate::orchestrator::workflow::{Confirmation, Stage, Workflow, WorkflowState};
use tracing::{info, warn};

/// How far, in percentage points, two opposing cells may miss a sum of 100 before the
/// pair is reported as asymmetric.
const ASYMMETRY_TOLERANCE: f64 = 0.5;

/// Total weight of the field that is synthesised when only a matrix is supplied.
const DEFAULT_FIELD_TOTAL: f64 = 100.0;

/// `field` restricted to the decks of `matchups`: unknown decks are dropped and missing
/// ones are added at weight 0.
fn aligned_field(mut field: FieldDistribution, matchups: &MatchupMatrix) -> FieldDistribution {
    field.reconcile(matchups.deck_names());
    field
}

/// What happened as a result of one controller update.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Progress(ProgressEvent),
    /// The data source stage was confirmed with crawled data.
    Acquired,
    /// The calculate stage was confirmed with fresh results.
    Computed,
    /// The operation failed; the message is also the workflow notice.
    Failed(String),
}

pub struct Session {
    workflow: Workflow,
    controller: OperationController,
}

impl Session {
    pub fn new(controller: OperationController) -> Self {
        Self::with_state(controller, WorkflowState::default())
    }

    pub fn with_state(controller: OperationController, state: WorkflowState) -> Self {
        Self {
            workflow: Workflow::from_state(state),
            controller,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        self.workflow.state()
    }

    pub fn stage(&self) -> Stage {
        self.workflow.stage()
    }

    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    pub fn operation_status(&self) -> Option<&OperationStatus> {
        self.controller.status()
    }

    /// Forward navigation stays closed while an operation is in flight.
    pub fn can_advance(&self) -> bool {
        !self.controller.is_busy() && self.workflow.can_advance()
    }

    /// Navigate like [`Workflow::go_to`]. Leaving the stage that owns the operation in
    /// flight cancels it; moving forward while one is in flight is ignored.
    pub fn go_to(&mut self, target: Stage) -> bool {
        let current = self.workflow.stage();
        if self.controller.is_busy() && target != current {
            if target > current {
                return false;
            }
            self.cancel();
        }
        self.workflow.go_to(target)
    }

    /// Start crawling matchup data. Only available on the data source stage.
    pub fn start_acquire(&mut self, cfg: CrawlConfig) -> bool {
        if let Err(e) = self.require_stage(Stage::DataSource).and_then(|_| cfg.validate()) {
            return self.reject(e);
        }
        self.start(OperationRequest::Acquire(cfg))
    }

    /// Use uploaded data instead of crawling. Without a field, every deck gets an equal
    /// share of 100.
    pub fn load_manual(&mut self, matchups: MatchupMatrix, field: Option<FieldDistribution>) -> bool {
        if self.controller.is_busy() {
            return self.reject_operation(OperationError::Busy);
        }
        let field = match field {
            Some(field) => aligned_field(field, &matchups),
            None => FieldDistribution::uniform(matchups.deck_names(), DEFAULT_FIELD_TOTAL),
        };
        self.confirm(Confirmation::DataSource { matchups, field })
    }

    pub fn confirm_matchups(&mut self, matchups: MatchupMatrix) -> bool {
        let asymmetric = matchups.asymmetric_pairs(ASYMMETRY_TOLERANCE);
        if !asymmetric.is_empty() {
            warn!(
                pairs = asymmetric.len(),
                first = %format!("{} vs {}", asymmetric[0].row, asymmetric[0].col),
                "matchup matrix is not symmetric; keeping values as entered"
            );
        }
        self.confirm(Confirmation::Matchups(matchups))
    }

    /// The field as it should be presented for editing: one entry per matrix deck.
    pub fn field_for_editing(&self) -> Option<FieldDistribution> {
        let state = self.workflow.state();
        let deck_names = state.matchups.as_ref()?.deck_names();
        let mut field = state.field.clone().unwrap_or_default();
        field.reconcile(deck_names);
        Some(field)
    }

    /// Confirm the edited field. Decks outside the matrix and zero-weight decks are
    /// dropped; an all-zero field is rejected.
    pub fn confirm_field(&mut self, field: FieldDistribution) -> bool {
        let field = match self.workflow.state().matchups.as_ref() {
            Some(matchups) => aligned_field(field, matchups),
            None => return self.reject(ValidationError::Missing("matchup")),
        };
        match field.finalize() {
            Ok(finalized) => self.confirm(Confirmation::Field(finalized)),
            Err(e) => self.reject(e),
        }
    }

    /// Submit copies of the confirmed matrix and field for computation.
    pub fn start_compute(&mut self) -> bool {
        let request = match self.compute_request() {
            Ok(request) => request,
            Err(e) => return self.reject(e),
        };
        self.start(OperationRequest::Compute(request))
    }

    fn compute_request(&self) -> Result<ComputeRequest, ValidationError> {
        self.require_stage(Stage::Calculate)?;
        let state = self.workflow.state();
        let matchups = state
            .matchups
            .clone()
            .ok_or(ValidationError::Missing("matchup"))?;
        let field = state
            .field
            .clone()
            .map(|field| aligned_field(field, &matchups))
            .ok_or(ValidationError::Missing("field"))?
            .finalize()?;
        let classes = distinct_classes(matchups.deck_names().iter().map(String::as_str));
        if classes < LINEUP_SIZE {
            return Err(ValidationError::InsufficientClasses(classes));
        }
        Ok(ComputeRequest { matchups, field })
    }

    /// Wait for the next update of the operation in flight and apply it. Pends forever
    /// while idle.
    pub async fn next_event(&mut self) -> SessionEvent {
        let kind = self.controller.active_kind();
        match self.controller.next_update().await {
            OperationUpdate::Progress(event) => SessionEvent::Progress(event),
            OperationUpdate::Finished(Ok(output)) => self.apply_output(output),
            OperationUpdate::Finished(Err(e)) => {
                let msg = e.user_message();
                warn!(kind = ?kind, error = %e, "operation failed");
                self.workflow.set_notice(msg.clone());
                SessionEvent::Failed(msg)
            }
        }
    }

    fn apply_output(&mut self, output: OperationOutput) -> SessionEvent {
        let (confirmation, event) = match output {
            OperationOutput::Acquired { matchups, field } => {
                info!(decks = matchups.len(), "matchup data acquired");
                let field = aligned_field(field, &matchups);
                (
                    Confirmation::DataSource { matchups, field },
                    SessionEvent::Acquired,
                )
            }
            OperationOutput::Computed(results) => {
                info!(lineups = results.len(), "lineups computed");
                (Confirmation::Calculate(results), SessionEvent::Computed)
            }
        };
        match self.workflow.confirm(confirmation) {
            Ok(_) => event,
            Err(e) => {
                let msg = e.to_string();
                self.workflow.set_notice(msg.clone());
                SessionEvent::Failed(msg)
            }
        }
    }

    /// Cancel the operation in flight; the workflow state is left as it was.
    pub fn cancel(&mut self) -> bool {
        self.controller.cancel()
    }

    /// Cancel anything in flight and start over.
    pub fn reset(&mut self) {
        self.controller.cancel();
        self.workflow.reset();
        info!("session reset");
    }

    fn start(&mut self, request: OperationRequest) -> bool {
        let kind: OperationKind = request.kind();
        match self.controller.start(request) {
            Ok(id) => {
                info!(op_id = id, %kind, stage = %self.workflow.stage(), "submitted");
                self.workflow.clear_notice();
                true
            }
            Err(e) => self.reject_operation(e),
        }
    }

    fn confirm(&mut self, confirmation: Confirmation) -> bool {
        match self.workflow.confirm(confirmation) {
            Ok(_) => true,
            Err(e) => self.reject(e),
        }
    }

    fn require_stage(&self, stage: Stage) -> Result<(), ValidationError> {
        if self.workflow.stage() == stage {
            Ok(())
        } else {
            Err(ValidationError::WrongStage(stage.name()))
        }
    }

    fn reject(&mut self, e: ValidationError) -> bool {
        warn!(stage = %self.workflow.stage(), error = %e, "rejected");
        self.workflow.set_notice(e.to_string());
        false
    }

    fn reject_operation(&mut self, e: OperationError) -> bool {
        self.workflow.set_notice(e.user_message());
        false
    }
}
