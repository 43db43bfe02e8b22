//! External media URL resolution.
//!
//! Raw media URLs from the content service point at signed object storage and
//! expire. Recognized storage hosts are rewritten into the service's
//! signed-delivery indirection, which re-signs on demand, and every stable
//! URL is then wrapped behind the same-origin proxy so the page never talks
//! to third-party hosts directly.

use serde::Serialize;
use url::{Url, form_urlencoded};

const CONTENT_IMAGE_HOST: &str = "www.notion.so";
const CONTENT_IMAGE_PATH: &str = "/image/";
const STORAGE_HOST_SUFFIX: &str = "amazonaws.com";
const STORAGE_HOST_MARKER: &str = "notion-static.com";

/// All addressable forms of one external resource, recomputed per render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedAsset {
    pub raw_url: String,
    pub stable_url: String,
    pub proxied_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Rewrites raw resource URLs into stable and proxied forms.
#[derive(Debug, Clone)]
pub struct ResourceResolver {
    proxy_path: String,
}

impl ResourceResolver {
    pub fn new(proxy_path: impl Into<String>) -> Self {
        Self {
            proxy_path: proxy_path.into(),
        }
    }

    pub fn resolve(&self, raw_url: &str, owner_id: &str) -> ResolvedAsset {
        let stable_url = stabilize(raw_url, owner_id);
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("src", &stable_url)
            .finish();
        let proxied_url = format!("{}?{}", self.proxy_path, query);
        let (width, height) = dimension_hints(raw_url);
        ResolvedAsset {
            raw_url: raw_url.to_string(),
            stable_url,
            proxied_url,
            width,
            height,
        }
    }
}

/// Rewrite object-storage URLs into the signed-delivery indirection form.
/// URLs already in that form, unparseable URLs, and unrecognized hosts pass
/// through untouched. The raw URL is embedded whole, expired signature and
/// all; the indirection re-signs on fetch.
fn stabilize(raw_url: &str, owner_id: &str) -> String {
    let Ok(parsed) = Url::parse(raw_url) else {
        return raw_url.to_string();
    };
    let host = parsed.host_str().unwrap_or("");

    if host == CONTENT_IMAGE_HOST && parsed.path().starts_with(CONTENT_IMAGE_PATH) {
        return raw_url.to_string();
    }
    let is_storage = host.ends_with(STORAGE_HOST_SUFFIX) || host.contains(STORAGE_HOST_MARKER);
    if !is_storage {
        return raw_url.to_string();
    }

    let encoded: String = form_urlencoded::byte_serialize(raw_url.as_bytes()).collect();

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer
        .append_pair("table", "block")
        .append_pair("id", owner_id)
        .append_pair("cache", "v2");
    for (key, value) in parsed.query_pairs() {
        if key == "width" || key == "spaceId" {
            serializer.append_pair(&key, &value);
        }
    }
    let query = serializer.finish();

    format!("https://{CONTENT_IMAGE_HOST}{CONTENT_IMAGE_PATH}{encoded}?{query}")
}

/// Best-effort intrinsic dimensions from `width`/`height` query parameters.
fn dimension_hints(raw_url: &str) -> (Option<u32>, Option<u32>) {
    let Ok(parsed) = Url::parse(raw_url) else {
        return (None, None);
    };
    let mut width = None;
    let mut height = None;
    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "width" => width = value.parse::<u32>().ok().or(width),
            "height" => height = value.parse::<u32>().ok().or(height),
            _ => {}
        }
    }
    (width, height)
}

/// Where the client is in the load-failure ladder for one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackRung {
    Stable,
    Raw,
    Exhausted,
}

/// Load-failure contract for one asset: try the proxied stable URL, then the
/// raw URL once, then give up. Each rung is visited at most once and failure
/// never produces an error of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackLadder {
    rung: FallbackRung,
}

impl Default for FallbackLadder {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackLadder {
    pub fn new() -> Self {
        Self {
            rung: FallbackRung::Stable,
        }
    }

    pub fn rung(&self) -> FallbackRung {
        self.rung
    }

    /// The URL to attempt at the current rung, or `None` once exhausted.
    pub fn current_url<'a>(&self, asset: &'a ResolvedAsset) -> Option<&'a str> {
        match self.rung {
            FallbackRung::Stable => Some(&asset.proxied_url),
            FallbackRung::Raw => Some(&asset.raw_url),
            FallbackRung::Exhausted => None,
        }
    }

    /// Record a load failure at the current rung and move down the ladder.
    pub fn fail(&mut self) -> FallbackRung {
        self.rung = match self.rung {
            FallbackRung::Stable => FallbackRung::Raw,
            FallbackRung::Raw | FallbackRung::Exhausted => FallbackRung::Exhausted,
        };
        self.rung
    }
}
