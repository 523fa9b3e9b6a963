//! # searchhop core
//!
//! Domain types, traits, and error definitions for the searchhop agent.
//! This crate defines the domain model that every other crate implements
//! against: the transcript, the model provider seam, and the tool seam.
//!
//! Keeping the seams as traits here means the agent loop can be driven by
//! stub providers and stub tools in tests.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use message::{Message, MessageToolCall, Role, Transcript};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
