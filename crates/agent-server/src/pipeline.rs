//! Chat Pipeline
//!
//! One `/chat` turn after the intent fast path:
//!
//! ```text
//! query ─┬─ market keywords? ── PriceFeed ──────────────┐
//!        │                                              ▼
//!        ├─ TaskGroup(2) ─┬─ router model: LEARN | CHAT ─► augmentation
//!        │                └─ WebSearch (4 categories) ──┘
//!        ▼
//!  ConversationStore: seed system prompt, append human turn
//!        ▼
//!  primary model ─► append assistant turn ─► normalize_reply
//! ```
//!
//! Every failure ends in a speakable [`AgentReply`]; nothing here surfaces
//! as an HTTP error.

use std::sync::Arc;

use agent_core::{
    normalize_reply, AgentReply, ConversationId, ConversationStore, GenerationOptions,
    LlmProvider, Message, Result, TaskGroup,
};
use market_intel::{
    prices::{self, PriceFeed},
    SearchBundle, WebSearch,
};

use crate::prompt::PromptSource;

/// Injected when the router decides the turn is small talk
pub const CHAT_MODE_BLOCK: &str =
    "\n[MODE]: CASUAL CHAT. Do NOT generate any 'assets' for this response. Keep it empty [].";

/// Tokens the router model may spend on its one-word answer
const ROUTER_MAX_TOKENS: u32 = 16;

/// Router decision
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Enrich the turn with search results
    Research,
    /// Casual chat; suppress assets
    Chat,
}

impl Route {
    /// Parse router output. Anything containing `LEARN` means research.
    pub fn from_decision(output: &str) -> Self {
        if output.trim().to_uppercase().contains("LEARN") {
            Self::Research
        } else {
            Self::Chat
        }
    }
}

/// Result of one fan-out branch
enum Branch {
    Route(Route),
    Search(SearchBundle),
}

pub fn router_prompt(query: &str) -> String {
    format!(
        r#"Analyze user intent: "{query}"

CLASSIFICATION CRITERIA:
- Respond 'LEARN': If the query contains a SUBJECT (e.g., "Space", "Sui", "React", "Cooking", "DeFi", "News"). Any question starting with "What", "How", "Why", "Tell me about", or "Chat about [topic]" MUST be 'LEARN'.
- Respond 'CHAT': ONLY for social filler, greetings ("Hi", "Hello"), or basic wellness checks ("How are you?").

Decision (LEARN/CHAT):"#
    )
}

/// Render the search block, or `None` when every category is empty
pub fn search_context(bundle: &SearchBundle) -> Option<String> {
    if bundle.is_empty() {
        return None;
    }
    match serde_json::to_string_pretty(bundle) {
        Ok(json) => Some(format!(
            "\n[SEARCHED ASSETS - USE THESE REAL LINKS]:\n{json}\nIMPORTANT: Use the actual 'url' fields from these results."
        )),
        Err(e) => {
            tracing::warn!(error = %e, "Could not serialize search results");
            None
        }
    }
}

pub struct ChatPipeline {
    store: Arc<ConversationStore>,
    prices: Arc<dyn PriceFeed>,
    search: WebSearch,
    prompt: PromptSource,
    router_model: String,
    primary_model: String,
}

impl ChatPipeline {
    pub fn new(
        store: Arc<ConversationStore>,
        prices: Arc<dyn PriceFeed>,
        search: WebSearch,
        prompt: PromptSource,
    ) -> Self {
        Self {
            store,
            prices,
            search,
            prompt,
            router_model: "llama-3.1-8b-instant".into(),
            primary_model: "llama-3.3-70b-versatile".into(),
        }
    }

    pub fn with_models(mut self, router: impl Into<String>, primary: impl Into<String>) -> Self {
        self.router_model = router.into();
        self.primary_model = primary.into();
        self
    }

    /// Run one turn. Failures become [`AgentReply::fatal`].
    pub async fn reply(
        &self,
        provider: Arc<dyn LlmProvider>,
        id: &ConversationId,
        query: &str,
    ) -> AgentReply {
        match self.run(provider, id, query).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(conversation_id = %id, error = %e, "Chat turn failed");
                AgentReply::fatal(&e)
            }
        }
    }

    async fn run(
        &self,
        provider: Arc<dyn LlmProvider>,
        id: &ConversationId,
        query: &str,
    ) -> Result<AgentReply> {
        let market = self.market_block(query).await;
        let (route, bundle) = self.route_and_search(Arc::clone(&provider), query).await;
        tracing::info!(conversation_id = %id, ?route, results = bundle.total(), "Routed turn");

        let augmentation = match route {
            Route::Research => search_context(&bundle),
            Route::Chat => Some(CHAT_MODE_BLOCK.to_string()),
        };

        let mut turn = query.to_string();
        turn.extend(market);
        turn.extend(augmentation);

        let mut history = self.store.get_or_create(id, || self.prompt.load())?;
        let human = Message::human(turn);
        self.store.append(id, human.clone())?;
        history.push(human);

        let options = GenerationOptions::for_model(&self.primary_model);
        let completion = provider.complete(history.messages(), &options).await?;

        // Stored before parsing, so unparseable output stays in the history.
        // A conversation evicted mid-turn still gets its reply.
        if let Err(e) = self.store.append(id, Message::assistant(completion.content.as_str())) {
            tracing::warn!(conversation_id = %id, error = %e, "Assistant turn not stored");
        }

        Ok(normalize_reply(&completion.content))
    }

    async fn market_block(&self, query: &str) -> Option<String> {
        if !prices::is_market_query(query) {
            return None;
        }
        let board = prices::fetch_or_empty(self.prices.as_ref()).await;
        prices::market_context(&board)
    }

    /// Router classification and web search, concurrently.
    ///
    /// Search always runs to completion; its result is only used in
    /// research mode. A failed or panicked router branch means research.
    async fn route_and_search(
        &self,
        provider: Arc<dyn LlmProvider>,
        query: &str,
    ) -> (Route, SearchBundle) {
        let mut group = TaskGroup::new(2);

        let prompt = router_prompt(query);
        let options = GenerationOptions {
            max_tokens: ROUTER_MAX_TOKENS,
            ..GenerationOptions::for_model(&self.router_model)
        };
        group.spawn(async move {
            let route = classify_route(provider.as_ref(), prompt, &options).await;
            Branch::Route(route)
        });

        let search = self.search.clone();
        let query = query.to_string();
        group.spawn(async move { Branch::Search(search.search(&query).await) });

        let mut route = Route::Research;
        let mut bundle = SearchBundle::default();
        for joined in group.join_all().await {
            match joined {
                Ok(Branch::Route(r)) => route = r,
                Ok(Branch::Search(b)) => bundle = b,
                Err(e) => tracing::warn!(error = %e, "Fan-out branch failed"),
            }
        }
        (route, bundle)
    }
}

async fn classify_route(
    provider: &dyn LlmProvider,
    prompt: String,
    options: &GenerationOptions,
) -> Route {
    match provider.complete(&[Message::human(prompt)], options).await {
        Ok(completion) => Route::from_decision(&completion.content),
        Err(e) => {
            tracing::warn!(
                provider = provider.name(),
                error = %e,
                "Router failed, defaulting to research"
            );
            Route::Research
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::testing::{pipeline_over, pipeline_with, prompt_dir, FixedSearch, MockProvider};
    use agent_core::{Animation, FacialExpression, Role, StoreLimits};

    const GOOD_REPLY: &str = r#"{"messages":[{"text":"Sui is a layer one chain.","facialExpression":"smile","animation":"Talking_1"}],"suggestions":["What is Move?"]}"#;

    fn last_human(pipeline: &ChatPipeline, id: &ConversationId) -> String {
        let history = pipeline.store.history(id).unwrap().unwrap();
        history
            .messages()
            .iter()
            .rev()
            .find(|m| m.role == Role::Human)
            .map(|m| m.content.clone())
            .unwrap()
    }

    #[test]
    fn test_route_decision() {
        assert_eq!(Route::from_decision("  learn\n"), Route::Research);
        assert_eq!(Route::from_decision("Decision: LEARN"), Route::Research);
        assert_eq!(Route::from_decision("CHAT"), Route::Chat);
        assert_eq!(Route::from_decision(""), Route::Chat);
    }

    #[test]
    fn test_router_prompt_embeds_query() {
        let prompt = router_prompt("What is DeFi?");
        assert!(prompt.contains("Analyze user intent: \"What is DeFi?\""));
        assert!(prompt.ends_with("Decision (LEARN/CHAT):"));
    }

    #[tokio::test]
    async fn test_research_turn_injects_search_results() {
        let dir = prompt_dir();
        let pipeline = pipeline_with(dir.path(), 2);
        let provider = Arc::new(MockProvider::new("LEARN", GOOD_REPLY));
        let id = ConversationId::new();

        let reply = pipeline.reply(provider.clone(), &id, "Tell me about Move").await;
        assert_eq!(reply.messages[0].text, "Sui is a layer one chain.");
        assert_eq!(reply.messages[0].facial_expression, FacialExpression::Smile);
        assert_eq!(reply.suggestions, vec!["What is Move?".to_string()]);

        let human = last_human(&pipeline, &id);
        assert!(human.starts_with("Tell me about Move"));
        assert!(human.contains("[SEARCHED ASSETS - USE THESE REAL LINKS]"));
        assert!(human.contains("https://example.com/0"));
        assert!(!human.contains("[MODE]"));
        assert_eq!(provider.router_calls(), 1);
        assert_eq!(provider.primary_calls(), 1);
    }

    #[tokio::test]
    async fn test_chat_turn_suppresses_assets() {
        let dir = prompt_dir();
        let pipeline = pipeline_with(dir.path(), 2);
        let id = ConversationId::new();

        pipeline
            .reply(Arc::new(MockProvider::new("CHAT", GOOD_REPLY)), &id, "hello there")
            .await;

        let human = last_human(&pipeline, &id);
        assert_eq!(human, format!("hello there{CHAT_MODE_BLOCK}"));
    }

    #[tokio::test]
    async fn test_router_failure_defaults_to_research() {
        let dir = prompt_dir();
        let pipeline = pipeline_with(dir.path(), 2);
        let id = ConversationId::new();
        let provider = Arc::new(MockProvider::new("LEARN", GOOD_REPLY).failing_router());

        pipeline.reply(provider, &id, "hi").await;
        assert!(last_human(&pipeline, &id).contains("[SEARCHED ASSETS"));
    }

    #[tokio::test]
    async fn test_research_without_results_adds_nothing() {
        let dir = prompt_dir();
        let pipeline = pipeline_with(dir.path(), 0);
        let id = ConversationId::new();

        pipeline
            .reply(Arc::new(MockProvider::new("LEARN", GOOD_REPLY)), &id, "what is move")
            .await;
        assert_eq!(last_human(&pipeline, &id), "what is move");
    }

    #[tokio::test]
    async fn test_market_query_gets_price_block() {
        let dir = prompt_dir();
        let pipeline = pipeline_with(dir.path(), 0);
        let id = ConversationId::new();

        pipeline
            .reply(Arc::new(MockProvider::new("CHAT", GOOD_REPLY)), &id, "how is the market")
            .await;

        let human = last_human(&pipeline, &id);
        assert!(human.starts_with("how is the market\n[REAL-TIME MARKET DATA]: {"));
        assert!(human.contains("\"bitcoin\""));
        assert!(human.ends_with(CHAT_MODE_BLOCK));
    }

    #[tokio::test]
    async fn test_history_grows_per_turn() {
        let dir = prompt_dir();
        let pipeline = pipeline_with(dir.path(), 0);
        let id = ConversationId::new();
        let provider = Arc::new(MockProvider::new("CHAT", GOOD_REPLY));

        pipeline.reply(provider.clone(), &id, "hi").await;
        pipeline.reply(provider.clone(), &id, "how are you").await;

        let history = pipeline.store.history(&id).unwrap().unwrap();
        let roles: Vec<Role> = history.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::Human, Role::Assistant, Role::Human, Role::Assistant]
        );
        assert!(history.messages()[0].content.starts_with("You are Sofia."));
        // The primary model sees the whole history on the second turn.
        assert_eq!(provider.last_primary_len(), 4);
    }

    #[tokio::test]
    async fn test_unparseable_output_is_stored_and_wrapped() {
        let dir = prompt_dir();
        let pipeline = pipeline_with(dir.path(), 0);
        let id = ConversationId::new();

        let reply = pipeline
            .reply(Arc::new(MockProvider::new("CHAT", "just prose, no json")), &id, "hi")
            .await;

        assert_eq!(reply.error.as_deref(), Some("JSON Parse Error"));
        assert_eq!(reply.raw_response.as_deref(), Some("just prose, no json"));
        let history = pipeline.store.history(&id).unwrap().unwrap();
        assert_eq!(history.last().unwrap().content, "just prose, no json");
    }

    #[tokio::test]
    async fn test_primary_failure_is_fatal_payload() {
        let dir = prompt_dir();
        let pipeline = pipeline_with(dir.path(), 0);
        let id = ConversationId::new();
        let provider = Arc::new(MockProvider::new("CHAT", GOOD_REPLY).failing_primary());

        let reply = pipeline.reply(provider, &id, "hi").await;
        assert_eq!(reply.messages.len(), 1);
        assert!(reply.messages[0].text.starts_with("Error: "));
        assert_eq!(reply.messages[0].animation, Animation::Talking0);
        assert!(reply.suggestions.is_empty());

        // Human turn is kept, no assistant turn was added.
        let history = pipeline.store.history(&id).unwrap().unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_prompt_is_fatal_payload() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(dir.path(), 0);
        let id = ConversationId::new();

        let reply = pipeline
            .reply(Arc::new(MockProvider::new("CHAT", GOOD_REPLY)), &id, "hi")
            .await;
        assert!(reply.messages[0].text.contains("no system prompt template found"));
        assert!(pipeline.store.history(&id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_receives_scoped_queries() {
        let dir = prompt_dir();
        let search = Arc::new(FixedSearch::new(1));
        let store = Arc::new(ConversationStore::default());
        let pipeline = pipeline_over(dir.path(), store, Arc::clone(&search));

        pipeline
            .reply(Arc::new(MockProvider::new("LEARN", GOOD_REPLY)), &ConversationId::new(), "sui move")
            .await;

        let queries = search.queries();
        assert_eq!(queries.len(), 4);
        assert!(queries.contains(&"site:youtube.com sui move".to_string()));
        assert!(queries.contains(&"sui move".to_string()));
        assert!(queries.iter().any(|q| q.ends_with("sui move documentation")));
    }

    #[tokio::test]
    async fn test_eviction_during_primary_call_keeps_reply() {
        let dir = prompt_dir();
        let store = Arc::new(ConversationStore::new(StoreLimits {
            max_conversations: 1,
            ..StoreLimits::default()
        }));
        let pipeline = pipeline_over(dir.path(), Arc::clone(&store), Arc::new(FixedSearch::new(0)));

        let slow = Arc::new(
            MockProvider::new("CHAT", GOOD_REPLY).with_primary_delay(Duration::from_millis(300)),
        );
        let fast = Arc::new(MockProvider::new("CHAT", GOOD_REPLY));
        let first = ConversationId::new();
        let second = ConversationId::new();

        // The second conversation arrives while the first waits on its
        // primary call and pushes it out of the single-slot store.
        let (slow_reply, fast_reply) = tokio::join!(
            pipeline.reply(slow, &first, "hi"),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                pipeline.reply(fast, &second, "hello").await
            }
        );

        assert!(slow_reply.error.is_none());
        assert_eq!(slow_reply.messages[0].text, "Sui is a layer one chain.");
        assert_eq!(fast_reply.messages[0].text, "Sui is a layer one chain.");
        assert!(store.history(&first).unwrap().is_none());
        assert_eq!(store.history(&second).unwrap().unwrap().len(), 3);
    }
}
