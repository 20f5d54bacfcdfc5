//! Public news feeds used to answer questions and spot trends.
//!
//! Two sources are searched for every query: Google News (RSS) and Reddit
//! (JSON search listing). Only the first few entries of each are kept. A
//! source that fails is logged and skipped; the other one still answers.

use std::io::Cursor;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::text::{clean_text, strip_html, SUMMARY_LIMIT};
use crate::trends::{extract_trends, Trend};

/// Google News search endpoint; the query is appended URL-encoded.
const GOOGLE_NEWS_SEARCH_URL: &str = "https://news.google.com/rss/search?q=";

/// Reddit search endpoint; the query is appended URL-encoded.
const REDDIT_SEARCH_URL: &str = "https://www.reddit.com/search.json?q=";

/// Entries kept from each source.
pub const ENTRIES_PER_SOURCE: usize = 3;

/// Request timeout for a single feed.
const FEED_TIMEOUT_SECS: u64 = 10;

const USER_AGENT: &str = concat!("eyebot/", env!("CARGO_PKG_VERSION"));

/// Reply used when no source produced anything usable.
pub const NO_RESULTS_REPLY: &str = "I couldn't find recent reliable information on that topic.";

/// Topics sampled by `/trending`.
pub const DEFAULT_TRENDING_TOPICS: [&str; 3] =
    ["football news", "celebrity news", "technology trends"];

/// Errors from fetching or parsing a feed.
#[derive(Error, Debug)]
pub enum FeedError {
    /// HTTP request failed or returned an error status.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// RSS document could not be parsed.
    #[error("invalid RSS: {0}")]
    Rss(#[from] rss::Error),

    /// JSON listing could not be parsed.
    #[error("invalid listing: {0}")]
    Listing(#[from] serde_json::Error),
}

/// One headline pulled from a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    /// Plain-text body, HTML already stripped. May be empty.
    pub summary: String,
}

#[derive(Deserialize)]
struct RedditListing {
    data: RedditListingData,
}

#[derive(Deserialize)]
struct RedditListingData {
    #[serde(default)]
    children: Vec<RedditChild>,
}

#[derive(Deserialize)]
struct RedditChild {
    data: RedditPost,
}

#[derive(Deserialize)]
struct RedditPost {
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
}

/// What `/trending` reports: ranked terms plus one summary per topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrendingReport {
    pub trends: Vec<Trend>,
    pub summaries: Vec<(String, String)>,
}

/// Parses an RSS document and keeps the first `limit` items.
pub fn parse_rss(xml: &[u8], limit: usize) -> Result<Vec<FeedEntry>, FeedError> {
    let channel = rss::Channel::read_from(Cursor::new(xml))?;
    Ok(channel
        .items()
        .iter()
        .take(limit)
        .map(|item| FeedEntry {
            title: clean_text(&strip_html(item.title().unwrap_or_default()), SUMMARY_LIMIT),
            summary: clean_text(
                &strip_html(item.description().unwrap_or_default()),
                SUMMARY_LIMIT,
            ),
        })
        .collect())
}

/// Parses a Reddit search listing and keeps the first `limit` posts.
pub fn parse_reddit(json: &str, limit: usize) -> Result<Vec<FeedEntry>, FeedError> {
    let listing: RedditListing = serde_json::from_str(json)?;
    Ok(listing
        .data
        .children
        .into_iter()
        .take(limit)
        .map(|child| FeedEntry {
            title: clean_text(&child.data.title, SUMMARY_LIMIT),
            summary: clean_text(&strip_html(&child.data.selftext), SUMMARY_LIMIT),
        })
        .collect())
}

/// Builds a short plain-text answer from feed entries.
///
/// Uses each entry's summary, or its title when the summary is empty, and
/// caps the result at [`SUMMARY_LIMIT`] characters.
pub fn web_summary(entries: &[FeedEntry]) -> String {
    let collected: Vec<&str> = entries
        .iter()
        .map(|e| if e.summary.is_empty() { e.title.as_str() } else { e.summary.as_str() })
        .filter(|s| !s.is_empty())
        .collect();

    if collected.is_empty() {
        return NO_RESULTS_REPLY.to_string();
    }
    clean_text(&collected.join(" "), SUMMARY_LIMIT)
}

/// HTTP client for the feed sources.
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: reqwest::Client,
    google_news_url: String,
    reddit_url: String,
}

impl FeedClient {
    /// Creates a client against the public endpoints.
    pub fn new() -> Result<Self, FeedError> {
        Self::with_endpoints(GOOGLE_NEWS_SEARCH_URL, REDDIT_SEARCH_URL)
    }

    /// Creates a client against custom search URL prefixes.
    pub fn with_endpoints(
        google_news_url: impl Into<String>,
        reddit_url: impl Into<String>,
    ) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FEED_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            google_news_url: google_news_url.into(),
            reddit_url: reddit_url.into(),
        })
    }

    /// Searches every source for `query`.
    ///
    /// Never fails: a source that errors contributes nothing.
    pub async fn search(&self, query: &str) -> Vec<FeedEntry> {
        let (news, reddit) = tokio::join!(self.google_news(query), self.reddit(query));

        let mut entries = Vec::new();
        for (source, result) in [("google_news", news), ("reddit", reddit)] {
            match result {
                Ok(found) => {
                    debug!(source, query, count = found.len(), "Feed search done");
                    entries.extend(found);
                }
                Err(e) => warn!(source, query, error = %e, "Feed search failed"),
            }
        }
        entries
    }

    /// Searches for `query` and returns a plain-text summary.
    pub async fn summary(&self, query: &str) -> String {
        web_summary(&self.search(query).await)
    }

    /// Summarizes every topic and ranks terms across all their headlines.
    pub async fn trending(&self, topics: &[&str], top_n: usize) -> TrendingReport {
        let mut titles = Vec::new();
        let mut summaries = Vec::with_capacity(topics.len());
        for topic in topics {
            let entries = self.search(topic).await;
            summaries.push((topic.to_string(), web_summary(&entries)));
            titles.extend(entries.into_iter().map(|e| e.title));
        }
        TrendingReport {
            trends: extract_trends(titles, top_n),
            summaries,
        }
    }

    async fn google_news(&self, query: &str) -> Result<Vec<FeedEntry>, FeedError> {
        let url = format!("{}{}", self.google_news_url, urlencoding::encode(query));
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        parse_rss(&body, ENTRIES_PER_SOURCE)
    }

    async fn reddit(&self, query: &str) -> Result<Vec<FeedEntry>, FeedError> {
        let url = format!("{}{}", self.reddit_url, urlencoding::encode(query));
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_reddit(&body, ENTRIES_PER_SOURCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Search results</title>
    <link>https://news.example.com</link>
    <description>results</description>
    <item>
      <title>Super Eagles qualify</title>
      <description>&lt;a href="x"&gt;Super Eagles&lt;/a&gt; book a place   at the finals</description>
    </item>
    <item>
      <title>Transfer window opens</title>
      <description></description>
    </item>
    <item><title>Third</title></item>
    <item><title>Fourth</title></item>
  </channel>
</rss>"#;

    const REDDIT_FIXTURE: &str = r#"{
      "kind": "Listing",
      "data": {
        "children": [
          {"kind": "t3", "data": {"title": "Phones in 2026", "selftext": "Folding   screens are back"}},
          {"kind": "t3", "data": {"title": "Link post", "selftext": ""}}
        ]
      }
    }"#;

    #[test]
    fn test_parse_rss_limits_and_strips() {
        let entries = parse_rss(RSS_FIXTURE.as_bytes(), ENTRIES_PER_SOURCE).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].title, "Super Eagles qualify");
        assert_eq!(entries[0].summary, "Super Eagles book a place at the finals");
        assert_eq!(entries[1].summary, "");
    }

    #[test]
    fn test_parse_rss_rejects_garbage() {
        assert!(parse_rss(b"not xml at all", 3).is_err());
    }

    #[test]
    fn test_parse_reddit() {
        let entries = parse_reddit(REDDIT_FIXTURE, ENTRIES_PER_SOURCE).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].summary, "Folding screens are back");
        assert_eq!(entries[1].title, "Link post");
    }

    #[test]
    fn test_web_summary_prefers_summary_then_title() {
        let entries = vec![
            FeedEntry { title: "T1".into(), summary: "first body".into() },
            FeedEntry { title: "T2".into(), summary: String::new() },
        ];
        assert_eq!(web_summary(&entries), "first body T2");
    }

    #[test]
    fn test_web_summary_caps_length() {
        let entries = vec![FeedEntry { title: String::new(), summary: "word ".repeat(300) }];
        assert_eq!(web_summary(&entries).chars().count(), SUMMARY_LIMIT);
    }

    #[test]
    fn test_web_summary_empty() {
        assert_eq!(web_summary(&[]), NO_RESULTS_REPLY);
    }

    #[tokio::test]
    async fn test_unreachable_sources_yield_nothing() {
        let client =
            FeedClient::with_endpoints("http://127.0.0.1:9/rss?q=", "http://127.0.0.1:9/r?q=")
                .unwrap();

        assert!(client.search("anything").await.is_empty());
        assert_eq!(client.summary("anything").await, NO_RESULTS_REPLY);

        let report = client.trending(&["a", "b"], 5).await;
        assert!(report.trends.is_empty());
        assert_eq!(
            report.summaries,
            vec![
                ("a".to_string(), NO_RESULTS_REPLY.to_string()),
                ("b".to_string(), NO_RESULTS_REPLY.to_string()),
            ]
        );
    }
}
