//! # Switchboard Core
//!
//! Domain types, traits, and error definitions for the Switchboard
//! conversational-agent orchestration layer. This crate has **zero framework
//! dependencies** — it defines the contracts that all other crates implement
//! against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here: completion
//! providers, tools. Implementations live in their respective crates.
//! This enables:
//! - Swapping LLM backends without touching the dispatch loop
//! - Easy testing with scripted mock providers
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use event::{EventBus, OrchestratorEvent};
pub use message::{Message, Role, Session, SessionId};
pub use provider::{CompletionProvider, CompletionRequest, Outcome};
pub use tool::{Tool, ToolInvocation, ToolRegistry, ToolResult, ToolSchema};
