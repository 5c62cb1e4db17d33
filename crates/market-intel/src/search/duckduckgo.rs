//! DuckDuckGo Search Provider
//!
//! Talks to the same endpoints the DuckDuckGo web UI uses. Every query first
//! obtains a `vqd` token from the landing page; text results come from the
//! `d.js` script payload, videos and images from the JSON endpoints.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{RawHit, SearchKind, SearchProvider, SearchRequest};
use crate::error::{IntelError, Result};

static VQD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"vqd=["']?([\d-]+)["']?"#).expect("vqd regex is valid"));

static TEXT_PAYLOAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)DDG\.pageLayout\.load\('d',\s*(\[.*?\])\s*\);")
        .expect("text payload regex is valid")
});

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("html tag regex is valid"));

/// DuckDuckGo client configuration
#[derive(Clone, Debug)]
pub struct DuckDuckGoConfig {
    /// Landing page (vqd token and JSON endpoints)
    pub base_url: String,

    /// Text results host
    pub links_url: String,

    /// Region code
    pub region: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DuckDuckGoConfig {
    fn default() -> Self {
        Self {
            base_url: "https://duckduckgo.com".into(),
            links_url: "https://links.duckduckgo.com".into(),
            region: "wt-wt".into(),
            timeout_secs: 10,
        }
    }
}

/// DuckDuckGo search client
pub struct DuckDuckGo {
    client: reqwest::Client,
    config: DuckDuckGoConfig,
}

#[derive(Deserialize)]
struct TextItem {
    #[serde(default)]
    t: Option<String>,
    #[serde(default)]
    u: Option<String>,
    #[serde(default)]
    a: Option<String>,
}

/// `results` may be absent on an empty page
#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct JsonPage<T> {
    #[serde(default)]
    results: Vec<T>,
}

#[derive(Deserialize)]
struct VideoItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    images: Option<VideoImages>,
}

#[derive(Deserialize)]
struct VideoImages {
    #[serde(default)]
    large: Option<String>,
    #[serde(default)]
    medium: Option<String>,
    #[serde(default)]
    small: Option<String>,
}

#[derive(Deserialize)]
struct ImageItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
}

impl DuckDuckGo {
    pub fn new(config: DuckDuckGoConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("sofia-agent/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    async fn get_text(&self, url: &str, params: &[(&str, &str)]) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::REFERER, format!("{}/", self.config.base_url))
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IntelError::Search(format!("DuckDuckGo returned {status}")));
        }
        Ok(response.text().await?)
    }

    async fn vqd(&self, query: &str) -> Result<String> {
        let page = self.get_text(&self.config.base_url, &[("q", query)]).await?;
        extract_vqd(&page).ok_or_else(|| IntelError::Search("vqd token not found".into()))
    }

    async fn text(&self, request: &SearchRequest, vqd: &str) -> Result<Vec<RawHit>> {
        let url = format!("{}/d.js", self.config.links_url);
        let safe = if request.safe_search { "1" } else { "-1" };
        let body = self
            .get_text(
                &url,
                &[
                    ("q", request.query.as_str()),
                    ("vqd", vqd),
                    ("kl", self.config.region.as_str()),
                    ("l", self.config.region.as_str()),
                    ("kp", safe),
                    ("s", "0"),
                    ("ex", "-1"),
                ],
            )
            .await?;
        parse_text_results(&body)
    }

    async fn json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: &SearchRequest,
        vqd: &str,
    ) -> Result<Vec<T>> {
        let url = format!("{}/{endpoint}", self.config.base_url);
        let safe = if request.safe_search { "1" } else { "-1" };
        let body = self
            .get_text(
                &url,
                &[
                    ("q", request.query.as_str()),
                    ("vqd", vqd),
                    ("l", self.config.region.as_str()),
                    ("o", "json"),
                    ("p", safe),
                ],
            )
            .await?;
        let page: JsonPage<T> = serde_json::from_str(&body)?;
        Ok(page.results)
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGo {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<RawHit>> {
        let vqd = self.vqd(&request.query).await?;
        let mut hits = match request.kind {
            SearchKind::Text => self.text(request, &vqd).await?,
            SearchKind::Videos => self
                .json::<VideoItem>("v.js", request, &vqd)
                .await?
                .into_iter()
                .map(video_hit)
                .collect(),
            SearchKind::Images => self
                .json::<ImageItem>("i.js", request, &vqd)
                .await?
                .into_iter()
                .map(image_hit)
                .collect(),
        };
        hits.truncate(request.max_results);
        tracing::debug!(kind = ?request.kind, results = hits.len(), "DuckDuckGo search");
        Ok(hits)
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}

fn extract_vqd(page: &str) -> Option<String> {
    VQD.captures(page)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Pull result items out of the `d.js` script body.
///
/// Items without a URL (pagination markers, ads) are skipped.
fn parse_text_results(body: &str) -> Result<Vec<RawHit>> {
    let Some(payload) = TEXT_PAYLOAD.captures(body).and_then(|c| c.get(1)) else {
        return Ok(Vec::new());
    };
    let items: Vec<TextItem> = serde_json::from_str(payload.as_str())?;
    Ok(items
        .into_iter()
        .filter_map(|item| {
            let url = item.u.filter(|u| u.starts_with("http"))?;
            Some(RawHit {
                title: strip_html(&item.t.unwrap_or_default()),
                url,
                body: item.a.map(|a| strip_html(&a)),
                thumbnail: None,
            })
        })
        .collect())
}

fn video_hit(item: VideoItem) -> RawHit {
    let thumbnail = item
        .images
        .and_then(|i| i.large.or(i.medium).or(i.small));
    RawHit {
        title: item.title.unwrap_or_default(),
        url: item.content.unwrap_or_default(),
        body: None,
        thumbnail,
    }
}

fn image_hit(item: ImageItem) -> RawHit {
    RawHit {
        title: item.title.unwrap_or_default(),
        url: item.image.unwrap_or_default(),
        body: None,
        thumbnail: item.thumbnail,
    }
}

fn strip_html(text: &str) -> String {
    HTML_TAG
        .replace_all(text, "")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .trim()
        .to_string()
}
