//! The chat session and the state machine that drives it.
//!
//! A [`Session`] is pure data. Every mutation goes through the
//! [`SessionOrchestrator`], which talks to the document service, persists
//! through the bridge and broadcasts [`SessionEvent`](crate::events::SessionEvent)s.

mod orchestrator;
#[cfg(test)]
mod proptest;
mod types;

pub use orchestrator::{SessionOrchestrator, SkipReason, TurnOutcome, UploadOutcome};
pub use types::{Message, Role, Session, SessionPhase};
