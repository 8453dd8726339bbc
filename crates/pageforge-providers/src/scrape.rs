//! Page scraping for "recreate from URL"

use serde_json::{json, Value};

use pageforge_core::prelude::*;
use pageforge_core::Provider;

use crate::endpoints::join;
use crate::http::{error_message, transport_error};

/// Fetches the text content of a public page.
#[trait_variant::make(PageScraper: Send)]
pub trait LocalPageScraper {
    async fn scrape(&self, api_key: &str, url: &str) -> Result<String>;
}

/// Firecrawl `/scrape` client.
#[derive(Debug, Clone)]
pub struct FirecrawlScraper {
    http: reqwest::Client,
    base_url: String,
}

impl FirecrawlScraper {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

impl PageScraper for FirecrawlScraper {
    async fn scrape(&self, api_key: &str, url: &str) -> Result<String> {
        let response = self
            .http
            .post(join(&self.base_url, "scrape"))
            .bearer_auth(api_key)
            .json(&json!({ "url": url }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if status.as_u16() == 401 {
            return Err(Error::auth(Provider::Firecrawl));
        }
        if !status.is_success() {
            return Err(Error::scrape(error_message(status, &body)));
        }
        page_content(&body)
    }
}

/// Pick the page text out of a scrape response, preferring markdown.
fn page_content(body: &str) -> Result<String> {
    let value: Value = serde_json::from_str(body)?;
    let data = value
        .get("data")
        .ok_or_else(|| Error::scrape("response has no data"))?;
    ["markdown", "content"]
        .iter()
        .find_map(|field| data.get(*field).and_then(Value::as_str))
        .map(str::to_string)
        .ok_or_else(|| Error::scrape("response has no page content"))
}

/// Offline stand-in that returns a fixed description of the URL.
///
/// Selected with `[scrape] mode = "placeholder"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderScraper;

impl PageScraper for PlaceholderScraper {
    async fn scrape(&self, _api_key: &str, url: &str) -> Result<String> {
        Ok(format!("Scraped content for {}", url))
    }
}

/// Scraper chosen at runtime from configuration.
#[derive(Debug, Clone)]
pub enum Scraper {
    Firecrawl(FirecrawlScraper),
    Placeholder(PlaceholderScraper),
}

impl PageScraper for Scraper {
    async fn scrape(&self, api_key: &str, url: &str) -> Result<String> {
        match self {
            Scraper::Firecrawl(s) => PageScraper::scrape(s, api_key, url).await,
            Scraper::Placeholder(s) => PageScraper::scrape(s, api_key, url).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_content_prefers_markdown() {
        let body = r##"{"success":true,"data":{"content":"plain","markdown":"# Title"}}"##;
        assert_eq!(page_content(body).unwrap(), "# Title");
    }

    #[test]
    fn test_page_content_falls_back_to_content() {
        let body = r#"{"success":true,"data":{"content":"plain"}}"#;
        assert_eq!(page_content(body).unwrap(), "plain");
    }

    #[test]
    fn test_page_content_missing_data_is_scrape_error() {
        assert!(matches!(page_content(r#"{"success":false}"#), Err(Error::Scrape { .. })));
    }

    #[tokio::test]
    async fn test_placeholder_describes_url() {
        let text = PageScraper::scrape(&PlaceholderScraper, "", "https://example.com")
            .await
            .unwrap();
        assert_eq!(text, "Scraped content for https://example.com");
    }
}
