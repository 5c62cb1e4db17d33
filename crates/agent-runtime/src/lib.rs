//! # agent-runtime
//!
//! Runtime providers for the avatar chat backend.
//!
//! ## Providers
//!
//! - **Groq** (default): hosted Llama models over the OpenAI-compatible API
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::{GroqConfig, GroqFactory};
//!
//! let factory = GroqFactory::new(GroqConfig::default())?;
//! let provider = factory.create(&api_key)?;
//! ```

pub mod groq;

pub use groq::{GroqConfig, GroqFactory, GroqProvider};

// Re-export core types for convenience
pub use agent_core::{AgentError, LlmProvider, Message, ProviderFactory, Result, Role};
