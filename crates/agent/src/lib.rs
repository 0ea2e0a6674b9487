//! Orchestration layer: the dispatch loop and the delegation router.
//!
//! The dispatch loop turns one user message into a reply by oscillating
//! between provider completions and tool execution under an iteration
//! budget. The router layers delegation on top: a primary agent that can
//! hand a task to one of a fixed catalog of specialists, each running its
//! own dispatch loop over its own session, with the primary synthesizing
//! the specialist's answer into the final reply.

pub mod catalog;
pub mod delegation;
pub mod dispatch;
pub mod router;
pub mod test_helpers;

pub use catalog::{primary_system_prompt, SpecialistDef, CATALOG};
pub use delegation::{parse_delegation, DelegationRequest};
pub use dispatch::{DispatchLoop, DispatchOutcome};
pub use router::{Orchestrator, SessionStatus, StatusReport, TurnResponse};
