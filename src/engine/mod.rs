//! Long-running remote operations.
//!
//! [`OperationController`] keeps at most one acquisition or computation in flight. The
//! channel itself runs on a spawned task; its progress and its single resolution come back
//! tagged with the operation id, and anything not tagged with the live id is discarded on
//! read. That is what makes [`OperationController::cancel`] final: once it returns, no
//! update for the cancelled operation can reach the caller, even one already queued.

pub mod api;
mod channel;

use crate::error::OperationError;
use crate::model::{OperationKind, OperationOutcome, OperationRequest, Phase, ProgressEvent, SessionConfig};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub type OperationId = u64;

/// What the controller hands back to its caller, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationUpdate {
    Progress(ProgressEvent),
    /// Exactly one per started operation unless it was cancelled.
    Finished(OperationOutcome),
}

/// Latest progress of the operation in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationStatus {
    pub id: OperationId,
    pub kind: OperationKind,
    pub phase: Phase,
    pub progress: f64,
    pub message: String,
}

struct Envelope {
    id: OperationId,
    update: OperationUpdate,
}

struct ActiveOperation {
    id: OperationId,
    kind: OperationKind,
    handle: JoinHandle<()>,
}

pub struct OperationController {
    cfg: SessionConfig,
    tx: mpsc::UnboundedSender<Envelope>,
    rx: mpsc::UnboundedReceiver<Envelope>,
    active: Option<ActiveOperation>,
    status: Option<OperationStatus>,
    next_id: OperationId,
}

impl OperationController {
    pub fn new(cfg: SessionConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            cfg,
            tx,
            rx,
            active: None,
            status: None,
            next_id: 0,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_kind(&self) -> Option<OperationKind> {
        self.active.as_ref().map(|a| a.kind)
    }

    pub fn status(&self) -> Option<&OperationStatus> {
        self.status.as_ref()
    }

    /// Open a channel for `request`. Fails at once with [`OperationError::Busy`] when
    /// another operation has not been resolved or cancelled yet.
    pub fn start(&mut self, request: OperationRequest) -> Result<OperationId, OperationError> {
        if self.active.is_some() {
            return Err(OperationError::Busy);
        }
        self.next_id += 1;
        let id = self.next_id;
        let kind = request.kind();
        let url = self.cfg.endpoint(kind).to_string();
        let connect_timeout = self.cfg.connect_timeout;
        let tx = self.tx.clone();

        let handle = tokio::spawn(async move {
            let progress_tx = tx.clone();
            let outcome = channel::drive(&url, connect_timeout, &request, |event| {
                let _ = progress_tx.send(Envelope {
                    id,
                    update: OperationUpdate::Progress(event),
                });
            })
            .await;
            let _ = tx.send(Envelope {
                id,
                update: OperationUpdate::Finished(outcome),
            });
        });

        info!(op_id = id, %kind, "operation started");
        self.active = Some(ActiveOperation { id, kind, handle });
        self.status = Some(OperationStatus {
            id,
            kind,
            phase: kind.phases()[0].clone(),
            progress: 0.0,
            message: String::new(),
        });
        Ok(id)
    }

    /// Force-close the channel in flight. Returns whether there was one.
    pub fn cancel(&mut self) -> bool {
        let Some(op) = self.active.take() else {
            return false;
        };
        // Aborting drops the socket; anything it already queued is filtered out by id.
        op.handle.abort();
        self.status = None;
        info!(op_id = op.id, kind = %op.kind, "operation cancelled");
        true
    }

    /// Next update for the live operation. Never resolves while idle, so it can sit in a
    /// `tokio::select!` next to other sources.
    pub async fn next_update(&mut self) -> OperationUpdate {
        loop {
            let Some(live) = self.active.as_ref().map(|a| a.id) else {
                while self.rx.try_recv().is_ok() {}
                return futures::future::pending().await;
            };
            // The controller holds a sender, so the queue never reports closed.
            let Some(envelope) = self.rx.recv().await else {
                return futures::future::pending().await;
            };
            if envelope.id != live {
                debug!(op_id = envelope.id, "dropping update from cancelled operation");
                continue;
            }
            match &envelope.update {
                OperationUpdate::Progress(event) => {
                    if let Some(status) = self.status.as_mut() {
                        status.phase = event.phase.clone();
                        status.progress = event.progress;
                        status.message = event.message.clone();
                    }
                }
                OperationUpdate::Finished(outcome) => {
                    match outcome {
                        Ok(_) => info!(op_id = live, "operation finished"),
                        Err(e) => info!(op_id = live, error = %e, "operation failed"),
                    }
                    self.active = None;
                    self.status = None;
                }
            }
            return envelope.update;
        }
    }
}

impl Drop for OperationController {
    fn drop(&mut self) {
        self.cancel();
    }
}
