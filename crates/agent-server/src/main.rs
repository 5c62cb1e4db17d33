//! Sofia Agent HTTP Server
//!
//! Axum server for the animated avatar frontend: `/chat` runs the intent
//! fast path or the research/chat pipeline, `/quote` returns a placeholder
//! swap quote.

mod config;
mod handlers;
mod pipeline;
mod prompt;
mod state;
#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::ConversationStore;
use agent_runtime::GroqFactory;
use market_intel::{
    CoinGeckoFeed, DuckDuckGo, DuckDuckGoConfig, PriceFeed, StaticPriceFeed, WebSearch,
};

use crate::config::{PriceFeedKind, ServerConfig};
use crate::handlers::{chat_handler, health_check, quote_handler};
use crate::pipeline::ChatPipeline;
use crate::prompt::PromptSource;
use crate::state::AppState;

/// Assemble the routes and middleware
pub fn build_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/chat", get(chat_handler))
        .route("/quote", get(quote_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Periodically drop conversations idle past their TTL
fn spawn_sweeper(store: Arc<ConversationStore>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match store.evict_expired() {
                Ok(0) => {}
                Ok(evicted) => {
                    tracing::info!(evicted, remaining = store.len(), "Expired conversations evicted");
                }
                Err(e) => tracing::warn!(error = %e, "Conversation sweep failed"),
            }
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();

    // Price feed
    let prices: Arc<dyn PriceFeed> = match config.price_feed {
        PriceFeedKind::CoinGecko => Arc::new(CoinGeckoFeed::new(config.coingecko.clone())?),
        PriceFeedKind::Static => Arc::new(StaticPriceFeed::new()),
    };
    tracing::info!("✓ Price feed: {}", prices.name());

    // Web search
    let search = WebSearch::new(Arc::new(DuckDuckGo::new(DuckDuckGoConfig::default())?));
    tracing::info!("✓ Web search: {}", search.provider_name());

    // System prompt
    let prompt = PromptSource::new(&config.prompt_dir, &config.prompt_primary, &config.prompt_fallback);
    match prompt.resolve() {
        Some(path) => tracing::info!("✓ System prompt: {}", path.display()),
        None => {
            tracing::warn!("⚠ No system prompt template in {}", config.prompt_dir.display());
            tracing::warn!(
                "  Expected {} or {}; chat turns will fail until one exists",
                config.prompt_primary,
                config.prompt_fallback
            );
        }
    }

    // Conversation store + sweeper
    let store = Arc::new(ConversationStore::new(config.store));
    let _sweeper = spawn_sweeper(Arc::clone(&store), config.sweep_interval);

    let pipeline = ChatPipeline::new(Arc::clone(&store), prices, search, prompt)
        .with_models(&config.router_model, &config.primary_model);

    // Build application state
    let state = AppState {
        pipeline: Arc::new(pipeline),
        providers: Arc::new(GroqFactory::new(config.groq.clone())?),
        store,
    };

    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 Sofia agent server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("  Router model:  {}", config.router_model);
    tracing::info!("  Primary model: {}", config.primary_model);
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health - Health check");
    tracing::info!("  GET  /chat   - Chat turn (?query=&conversation_id=&api_key=)");
    tracing::info!("  GET  /quote  - Swap quote (?token_in=&token_out=&amount_in=)");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
