//! Generative text provider layer for market-review
//!
//! This crate provides provider-agnostic abstractions for calling hosted
//! text-generation models. It includes:
//!
//! - Message types for role-tagged prompts
//! - Completion request/response types
//! - Provider trait implemented by every backend
//! - Concrete providers (behind feature flags): Gemini and OpenAI-compatible

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::LLMProvider;

// Provider implementations (feature-gated)
#[cfg(any(feature = "gemini", feature = "openai"))]
pub mod providers;
