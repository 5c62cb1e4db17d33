//! Web Search Aggregator
//!
//! Four category searches (videos, articles, docs, images) run concurrently
//! against one [`SearchProvider`]. Each category is scoped with site filters
//! and capped at its own maximum. A failing category yields an empty list
//! and never affects its siblings.

mod duckduckgo;

pub use duckduckgo::{DuckDuckGo, DuckDuckGoConfig};

use std::sync::Arc;

use agent_core::TaskGroup;
use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// Provider search verticals
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchKind {
    Text,
    Videos,
    Images,
}

/// One provider query
#[derive(Clone, Debug)]
pub struct SearchRequest {
    pub kind: SearchKind,
    pub query: String,
    pub max_results: usize,
    pub safe_search: bool,
}

/// A provider result before category shaping
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawHit {
    pub title: String,
    pub url: String,
    pub body: Option<String>,
    pub thumbnail: Option<String>,
}

/// Search provider trait (Strategy pattern)
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Results in the provider's relevance order
    async fn search(&self, request: &SearchRequest) -> Result<Vec<RawHit>>;

    /// Provider name
    fn name(&self) -> &str;
}

/// A result as exposed to the primary model
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Results per category; any list may be empty
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SearchBundle {
    pub videos: Vec<SearchHit>,
    pub articles: Vec<SearchHit>,
    pub docs: Vec<SearchHit>,
    pub images: Vec<SearchHit>,
}

impl SearchBundle {
    /// True when no category returned anything
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        self.videos.len() + self.articles.len() + self.docs.len() + self.images.len()
    }

    fn slot(&mut self, category: SearchCategory) -> &mut Vec<SearchHit> {
        match category {
            SearchCategory::Videos => &mut self.videos,
            SearchCategory::Articles => &mut self.articles,
            SearchCategory::Docs => &mut self.docs,
            SearchCategory::Images => &mut self.images,
        }
    }
}

/// Search categories and their scoping
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchCategory {
    Videos,
    Articles,
    Docs,
    Images,
}

impl SearchCategory {
    pub const ALL: [Self; 4] = [Self::Videos, Self::Articles, Self::Docs, Self::Images];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Videos => "videos",
            Self::Articles => "articles",
            Self::Docs => "docs",
            Self::Images => "images",
        }
    }

    /// Maximum results kept for this category
    pub const fn limit(self) -> usize {
        match self {
            Self::Videos | Self::Docs => 2,
            Self::Articles => 3,
            Self::Images => 4,
        }
    }

    /// Provider request for a user query
    pub fn request(self, query: &str) -> SearchRequest {
        let (kind, query) = match self {
            Self::Videos => (SearchKind::Videos, format!("site:youtube.com {query}")),
            Self::Articles => (
                SearchKind::Text,
                format!(
                    "(site:medium.com OR site:geeksforgeeks.org OR site:hashnode.com OR site:dev.to) {query}"
                ),
            ),
            Self::Docs => (
                SearchKind::Text,
                format!("(site:docs.* OR site:*.gitbook.io OR filetype:pdf) {query} documentation"),
            ),
            Self::Images => (SearchKind::Images, query.to_string()),
        };
        SearchRequest {
            kind,
            query,
            max_results: self.limit(),
            safe_search: matches!(self, Self::Images),
        }
    }

    fn shape(self, hit: RawHit) -> SearchHit {
        let (snippet, thumbnail) = match self {
            Self::Articles | Self::Docs => (hit.body, None),
            Self::Videos | Self::Images => (None, hit.thumbnail),
        };
        SearchHit {
            title: hit.title,
            url: hit.url,
            snippet,
            thumbnail,
            source: matches!(self, Self::Articles).then(|| "blog".to_string()),
        }
    }

    async fn run(self, provider: &dyn SearchProvider, query: &str) -> Result<Vec<SearchHit>> {
        let hits = provider.search(&self.request(query)).await?;
        Ok(hits
            .into_iter()
            .filter(|h| !h.url.is_empty())
            .take(self.limit())
            .map(|h| self.shape(h))
            .collect())
    }
}

/// Parallel category search over one provider
#[derive(Clone)]
pub struct WebSearch {
    provider: Arc<dyn SearchProvider>,
}

impl WebSearch {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run every category concurrently and merge the results.
    ///
    /// Never fails: a category that errors contributes an empty list.
    pub async fn search(&self, query: &str) -> SearchBundle {
        let mut group = TaskGroup::new(SearchCategory::ALL.len());
        for category in SearchCategory::ALL {
            let provider = Arc::clone(&self.provider);
            let query = query.to_string();
            group.spawn(async move { category.run(provider.as_ref(), &query).await });
        }

        let mut bundle = SearchBundle::default();
        for (category, joined) in SearchCategory::ALL.into_iter().zip(group.join_all().await) {
            let hits = match joined {
                Ok(Ok(hits)) => hits,
                Ok(Err(e)) => {
                    tracing::warn!(category = category.name(), error = %e, "Search category failed");
                    Vec::new()
                }
                Err(e) => {
                    tracing::warn!(category = category.name(), error = %e, "Search task aborted");
                    Vec::new()
                }
            };
            *bundle.slot(category) = hits;
        }

        tracing::debug!(results = bundle.total(), "Web search complete");
        bundle
    }
}
