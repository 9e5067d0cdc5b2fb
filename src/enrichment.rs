//! Optional web-lookup enrichment for candidate options
//!
//! When an option looks like a venue or product name, the engine may ask
//! an enrichment service for a free-form fact sheet before round 1.
//! Lookups are strictly best-effort: failure or absence never blocks a
//! round.

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Free-form facts collected for one option
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactSheet {
    /// The option the facts describe
    pub option: String,
    /// Short description assembled from search snippets
    pub description: String,
    /// Price information, when detected
    pub price_range: Option<String>,
    /// Rating, when detected
    pub rating: Option<String>,
    /// Opening hours, when detected
    pub hours: Option<String>,
    /// Number of search results consulted
    pub result_count: usize,
}

impl FactSheet {
    /// Render the sheet as prompt context
    pub fn as_context(&self) -> String {
        let mut context = format!("{}: {}", self.option, self.description);
        if let Some(price) = &self.price_range {
            context.push_str(&format!(" Price: {price}."));
        }
        if let Some(rating) = &self.rating {
            context.push_str(&format!(" Rating: {rating}."));
        }
        if let Some(hours) = &self.hours {
            context.push_str(&format!(" Hours: {hours}."));
        }
        context
    }
}

/// Enrichment capability boundary
#[async_trait]
pub trait Enrichment: Send + Sync {
    /// Look up facts for one option; `Ok(None)` means nothing found
    async fn lookup(&self, option: &str) -> Result<Option<FactSheet>>;
}

/// Heuristic filter for options worth looking up
///
/// Plain labels ("A", "yes") are skipped; options that look like proper
/// nouns or venue names are kept.
pub fn detect_lookup_candidates(options: &[String]) -> Vec<String> {
    const VENUE_MARKERS: [&str; 8] = [
        "restaurant", "cafe", "bar", "hotel", "shop", "store", "house", "kitchen",
    ];

    options
        .iter()
        .filter(|option| {
            let trimmed = option.trim();
            if trimmed.chars().count() <= 2 {
                return false;
            }
            let lower = trimmed.to_lowercase();
            let has_marker = VENUE_MARKERS.iter().any(|marker| lower.contains(marker));
            let looks_proper = trimmed.chars().next().is_some_and(char::is_uppercase)
                && trimmed.contains(' ');
            has_marker || looks_proper
        })
        .cloned()
        .collect()
}

fn price_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[$€£¥]\s?\d[\d,.]*(?:\s?[-–]\s?[$€£¥]?\d[\d,.]*)?").expect("valid price regex")
    })
}

fn rating_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d(?:\.\d)?)\s?(?:/\s?5|stars?|★)").expect("valid rating regex")
    })
}

fn hours_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\d{1,2}(?::\d{2})?\s?(?:am|pm)?\s?[-–]\s?\d{1,2}(?::\d{2})?\s?(?:am|pm)")
            .expect("valid hours regex")
    })
}

/// Pull structured details out of a free-form snippet
pub fn extract_facts(option: &str, snippet: &str) -> FactSheet {
    let description = if snippet.chars().count() > 200 {
        let cut = snippet
            .char_indices()
            .nth(200)
            .map(|(idx, _)| idx)
            .unwrap_or(snippet.len());
        format!("{}...", &snippet[..cut])
    } else {
        snippet.to_string()
    };

    FactSheet {
        option: option.to_string(),
        description,
        price_range: price_pattern()
            .find(snippet)
            .map(|m| m.as_str().to_string()),
        rating: rating_pattern()
            .captures(snippet)
            .map(|c| c[1].to_string()),
        hours: hours_pattern().find(snippet).map(|m| m.as_str().to_string()),
        result_count: 1,
    }
}

/// Web search enrichment over the DuckDuckGo HTML endpoint
pub struct WebLookup {
    client: Client,
    base_url: Url,
}

impl WebLookup {
    /// Create a lookup client with the default search endpoint
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(
            Url::parse("https://html.duckduckgo.com/html/").expect("valid search URL"),
            timeout,
        )
    }

    /// Create a lookup client against a custom endpoint
    pub fn with_base_url(base_url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (compatible; council/0.1)")
            .build()?;

        Ok(Self { client, base_url })
    }

    fn snippet_pattern() -> &'static Regex {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        PATTERN.get_or_init(|| {
            Regex::new(r#"class="result__snippet"[^>]*>(?s)(.*?)</a>"#).expect("valid snippet regex")
        })
    }

    fn strip_tags(html: &str) -> String {
        static TAGS: OnceLock<Regex> = OnceLock::new();
        let tags = TAGS.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
        let text = tags.replace_all(html, "");
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[async_trait]
impl Enrichment for WebLookup {
    async fn lookup(&self, option: &str) -> Result<Option<FactSheet>> {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair("q", option);

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(option, error = %e, "enrichment lookup failed");
                return Ok(None);
            }
        };

        if !response.status().is_success() {
            warn!(option, status = %response.status(), "enrichment lookup rejected");
            return Ok(None);
        }

        let body = response.text().await.unwrap_or_default();
        let snippets: Vec<String> = Self::snippet_pattern()
            .captures_iter(&body)
            .take(3)
            .map(|capture| Self::strip_tags(&capture[1]))
            .filter(|snippet| snippet.chars().count() > 20)
            .collect();

        if snippets.is_empty() {
            info!(option, "no enrichment facts found");
            return Ok(None);
        }

        let mut sheet = extract_facts(option, &snippets.join(" "));
        sheet.result_count = snippets.len();
        Ok(Some(sheet))
    }
}
