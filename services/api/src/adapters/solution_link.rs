//! services/api/src/adapters/solution_link.rs
//!
//! Best-effort lookup of a worked solution for a quiz question.
//!
//! `WebSolutionLinkFinder` scrapes the first result of a DuckDuckGo HTML search;
//! `CachedLinkFinder` wraps any finder with a time-to-live cache keyed by the exact
//! question text. Neither ever fails: every problem degrades to `None`.

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};
use std::time::{Duration, Instant};
use study_buddy_core::SolutionLinkFinder;
use tracing::{debug, warn};
use url::Url;

const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = concat!("study-buddy/", env!("CARGO_PKG_VERSION"));

static RESULT_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a\s[^>]*class="[^"]*\bresult__a\b[^"]*"[^>]*>"#).expect("valid anchor regex")
});
static HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]+)""#).expect("valid href regex"));

//=========================================================================================
// Web Search Finder
//=========================================================================================

#[derive(Clone)]
pub struct WebSolutionLinkFinder {
    client: reqwest::Client,
    exam_name: String,
}

impl WebSolutionLinkFinder {
    pub fn new(timeout: Duration, exam_name: String) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, exam_name })
    }

    async fn search(&self, question_text: &str) -> Result<String, reqwest::Error> {
        let query = format!("{} {} solution", self.exam_name, question_text);
        self.client
            .get(SEARCH_ENDPOINT)
            .query(&[("q", query.as_str())])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

/// Pulls the target of the first search result out of a DuckDuckGo results page.
pub fn first_result_link(html: &str) -> Option<String> {
    let anchor = RESULT_ANCHOR.find(html)?;
    let href = HREF.captures(anchor.as_str())?.get(1)?.as_str();
    let href = html_escape::decode_html_entities(href);

    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.into_owned()
    };
    let url = Url::parse(&absolute).ok()?;

    // Results are wrapped in a redirect that carries the real target in `uddg`.
    let is_redirect = url
        .host_str()
        .is_some_and(|host| host.ends_with("duckduckgo.com"))
        && url.path().starts_with("/l/");
    if is_redirect {
        return url
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, target)| target.into_owned());
    }

    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

#[async_trait]
impl SolutionLinkFinder for WebSolutionLinkFinder {
    async fn find_link(&self, question_text: &str) -> Option<String> {
        match self.search(question_text).await {
            Ok(html) => {
                let link = first_result_link(&html);
                debug!(found = link.is_some(), "Solution search finished");
                link
            }
            Err(e) => {
                warn!("Solution search failed: {}", e);
                None
            }
        }
    }
}

//=========================================================================================
// TTL Cache
//=========================================================================================

/// Caches successful lookups for `ttl`. Misses are never cached.
pub struct CachedLinkFinder<F> {
    inner: F,
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, String)>>,
}

impl<F> CachedLinkFinder<F> {
    pub fn new(inner: F, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, question_text: &str) -> Option<String> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(question_text) {
            Some((stored_at, link)) if stored_at.elapsed() < self.ttl => Some(link.clone()),
            Some(_) => {
                entries.remove(question_text);
                None
            }
            None => None,
        }
    }

    /// Inserts a fresh entry and drops every expired one.
    fn store(&self, question_text: &str, link: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|_, (stored_at, _)| stored_at.elapsed() < self.ttl);
            entries.insert(question_text.to_string(), (Instant::now(), link.to_string()));
        }
    }
}

#[async_trait]
impl<F: SolutionLinkFinder> SolutionLinkFinder for CachedLinkFinder<F> {
    async fn find_link(&self, question_text: &str) -> Option<String> {
        if let Some(link) = self.cached(question_text) {
            debug!("Solution link served from cache");
            return Some(link);
        }
        let link = self.inner.find_link(question_text).await?;
        self.store(question_text, &link);
        Some(link)
    }
}
