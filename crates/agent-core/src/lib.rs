//! # agent-core
//!
//! Conversation state, provider-agnostic LLM abstraction and reply
//! normalization for the avatar chat backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         agent-core                            │
//! │  ┌──────────────┐  ┌──────────────┐  ┌─────────────────────┐  │
//! │  │ Conversation │  │  TaskGroup   │  │   LlmProvider       │  │
//! │  │    Store     │  │  (fan-out)   │  │   (Strategy)        │  │
//! │  └──────────────┘  └──────────────┘  └─────────────────────┘  │
//! │                 ┌──────────────────────┐                      │
//! │                 │  Reply normalizer    │                      │
//! │                 │  strict → recovery   │                      │
//! │                 └──────────────────────┘                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait lets the router and the primary model run on
//! any backend; `ProviderFactory` binds a provider to a per-request key.

pub mod error;
pub mod message;
pub mod provider;
pub mod reply;
pub mod session;
pub mod taskgroup;

pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role};
pub use provider::{GenerationOptions, LlmProvider, ProviderFactory};
pub use reply::{normalize_reply, AgentReply, Animation, FacialExpression, ReplySegment};
pub use session::{ConversationId, ConversationStore, StoreLimits};
pub use taskgroup::TaskGroup;
