//! Completion provider implementations for Switchboard.
//!
//! All providers implement the `switchboard_core::CompletionProvider`
//! trait, translating their backend's native tool-call wire format into
//! the core `Outcome` contract. The primary and specialist tiers may be
//! configured with different concrete backends.

pub mod anthropic;
pub mod openai_compat;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;
