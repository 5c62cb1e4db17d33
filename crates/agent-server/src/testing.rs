//! Test doubles shared by the server's unit tests

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agent_core::{
    provider::{Completion, ProviderFactory},
    AgentError, ConversationStore, GenerationOptions, LlmProvider, Message, Result, StoreLimits,
};
use async_trait::async_trait;
use market_intel::{
    search::{RawHit, SearchRequest},
    SearchProvider, StaticPriceFeed, WebSearch,
};

use crate::pipeline::ChatPipeline;
use crate::prompt::PromptSource;
use crate::state::AppState;

pub const PROMPT_FILE: &str = "sui_tent_prompt.txt";

/// Scratch directory holding a primary prompt template
pub fn prompt_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(PROMPT_FILE), "You are Sofia.").unwrap();
    dir
}

/// Scripted provider: router prompts get `decision`, everything else `reply`
pub struct MockProvider {
    decision: String,
    reply: String,
    fail_router: bool,
    fail_primary: bool,
    primary_delay: Option<Duration>,
    router_calls: AtomicUsize,
    primary_calls: AtomicUsize,
    last_primary_len: AtomicUsize,
}

impl MockProvider {
    pub fn new(decision: &str, reply: &str) -> Self {
        Self {
            decision: decision.into(),
            reply: reply.into(),
            fail_router: false,
            fail_primary: false,
            primary_delay: None,
            router_calls: AtomicUsize::new(0),
            primary_calls: AtomicUsize::new(0),
            last_primary_len: AtomicUsize::new(0),
        }
    }

    pub fn failing_router(mut self) -> Self {
        self.fail_router = true;
        self
    }

    pub fn failing_primary(mut self) -> Self {
        self.fail_primary = true;
        self
    }

    /// Hold every primary call for `delay` before answering
    pub const fn with_primary_delay(mut self, delay: Duration) -> Self {
        self.primary_delay = Some(delay);
        self
    }

    pub fn router_calls(&self) -> usize {
        self.router_calls.load(Ordering::SeqCst)
    }

    pub fn primary_calls(&self) -> usize {
        self.primary_calls.load(Ordering::SeqCst)
    }

    pub fn last_primary_len(&self) -> usize {
        self.last_primary_len.load(Ordering::SeqCst)
    }

    fn completion(content: &str, model: &str) -> Completion {
        Completion {
            content: content.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, messages: &[Message], options: &GenerationOptions) -> Result<Completion> {
        let is_router = messages.len() == 1
            && messages[0].content.contains("Decision (LEARN/CHAT):");

        if is_router {
            self.router_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_router {
                return Err(AgentError::RateLimited("router".into()));
            }
            return Ok(Self::completion(&self.decision, &options.model));
        }

        self.primary_calls.fetch_add(1, Ordering::SeqCst);
        self.last_primary_len.store(messages.len(), Ordering::SeqCst);
        if let Some(delay) = self.primary_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_primary {
            return Err(AgentError::ProviderUnavailable("503 Service Unavailable".into()));
        }
        Ok(Self::completion(&self.reply, &options.model))
    }
}

/// Hands out one shared provider; `bad-key` is rejected
pub struct MockFactory {
    pub provider: Arc<MockProvider>,
    pub created: AtomicUsize,
}

impl MockFactory {
    pub fn new(provider: MockProvider) -> Self {
        Self {
            provider: Arc::new(provider),
            created: AtomicUsize::new(0),
        }
    }
}

impl ProviderFactory for MockFactory {
    fn create(&self, api_key: &str) -> Result<Arc<dyn LlmProvider>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        if api_key == "bad-key" {
            return Err(AgentError::Auth("invalid api key".into()));
        }
        Ok(self.provider.clone())
    }
}

/// Returns `hits` results for every category and records queries
pub struct FixedSearch {
    hits: usize,
    queries: Mutex<Vec<String>>,
}

impl FixedSearch {
    pub fn new(hits: usize) -> Self {
        Self {
            hits,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Queries received so far
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for FixedSearch {
    async fn search(&self, request: &SearchRequest) -> market_intel::Result<Vec<RawHit>> {
        self.queries.lock().unwrap().push(request.query.clone());
        Ok((0..self.hits)
            .map(|i| RawHit {
                title: format!("Result {i}"),
                url: format!("https://example.com/{i}"),
                body: Some("snippet".into()),
                thumbnail: None,
            })
            .collect())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Pipeline over `store`, static prices and `search`
pub fn pipeline_over(
    dir: &Path,
    store: Arc<ConversationStore>,
    search: Arc<FixedSearch>,
) -> ChatPipeline {
    ChatPipeline::new(
        store,
        Arc::new(StaticPriceFeed::new()),
        WebSearch::new(search),
        PromptSource::new(dir, PROMPT_FILE, "web3_prompt.txt"),
    )
}

/// Pipeline over a fresh store, static prices and `hits` search results
pub fn pipeline_with(dir: &Path, hits: usize) -> ChatPipeline {
    pipeline_over(
        dir,
        Arc::new(ConversationStore::new(StoreLimits::default())),
        Arc::new(FixedSearch::new(hits)),
    )
}

/// Application state wired to mocks
pub fn test_state(dir: &Path, factory: Arc<MockFactory>) -> AppState {
    let store = Arc::new(ConversationStore::new(StoreLimits::default()));
    let pipeline = pipeline_over(dir, Arc::clone(&store), Arc::new(FixedSearch::new(1)));
    AppState {
        pipeline: Arc::new(pipeline),
        providers: factory,
        store,
    }
}
