//! Application State

use std::sync::Arc;

use agent_core::{ConversationStore, ProviderFactory};

use crate::pipeline::ChatPipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Chat turn orchestration
    pub pipeline: Arc<ChatPipeline>,

    /// Builds a model provider from the caller's API key
    pub providers: Arc<dyn ProviderFactory>,

    /// Conversation histories (also held by the pipeline)
    pub store: Arc<ConversationStore>,
}
