//! LLM provider implementations for searchhop.
//!
//! All providers implement the `searchhop_core::Provider` trait.
//! [`router::build_from_config`] picks the one named in the configuration.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
