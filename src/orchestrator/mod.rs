//! Application-level orchestration.
//!
//! The workflow state machine, the session that binds it to the operation controller, and
//! the post-results processing (exports, session save) that the CLI runs once a plan is
//! complete.

mod post_process;
pub mod session;
pub mod workflow;

pub(crate) use post_process::{process_results, OutputTargets, ProcessedResults};
pub use session::{Session, SessionEvent};
pub use workflow::{Stage, WorkflowState};
