use crate::extract;
use crate::headers::HeaderSet;
use crate::http_client::PageFetcher;
use crate::models::{ListingDetails, ListingRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait that every listing source implements.
///
/// Sources provide the site-specific parsing of search pages and listing
/// pages; fetching and the per-page operations are shared. Parsing is kept
/// synchronous because parsed documents must not live across an `.await`.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Returns the name of the scraper/website
    fn name(&self) -> &str;

    /// Prefix for site-relative links, without trailing slash
    fn base_url(&self) -> &str;

    fn fetcher(&self) -> &dyn PageFetcher;

    /// Fresh headers for one request
    fn headers(&self) -> HeaderSet;

    /// URL of results page `page` (1-based) for a search
    fn page_url(&self, search_url: &str, page: u32) -> String {
        format!("{}/page-{}", extract::search_base(search_url), page)
    }

    /// Listing URLs on a results page, in document order
    fn parse_listing_urls(&self, markup: &str) -> Result<Vec<String>>;

    /// Total number of results pages
    fn parse_page_count(&self, markup: &str) -> Result<u32>;

    fn parse_record(&self, markup: &str, listing_url: &str) -> Result<ListingRecord>;

    fn parse_details(&self, markup: &str, listing_url: &str) -> Result<ListingDetails>;

    async fn fetch_document(&self, url: &str) -> Result<String> {
        let headers = self.headers();
        self.fetcher().fetch(url, &headers).await
    }

    /// URLs of the listings on one results page; an empty page is not an error
    async fn list_urls(&self, page_url: &str) -> Result<Vec<String>> {
        let markup = self.fetch_document(page_url).await?;
        let urls = self.parse_listing_urls(&markup)?;
        tracing::debug!("Found {} listing URLs on {}", urls.len(), page_url);
        Ok(urls)
    }

    async fn page_count(&self, search_url: &str) -> Result<u32> {
        let markup = self.fetch_document(search_url).await?;
        self.parse_page_count(&markup)
            .with_context(|| format!("Could not determine page count of {}", search_url))
    }

    async fn get_record(&self, listing_url: &str) -> Result<ListingRecord> {
        let url = extract::absolute_url(self.base_url(), listing_url);
        let markup = self.fetch_document(&url).await?;
        self.parse_record(&markup, &url)
            .with_context(|| format!("Failed to parse listing {}", url))
    }
}

/// Registry to manage all scrapers
pub struct ScraperRegistry {
    scrapers: Vec<Arc<dyn Scraper>>,
}

impl ScraperRegistry {
    pub fn new() -> Self {
        Self {
            scrapers: Vec::new(),
        }
    }

    pub fn register(&mut self, scraper: Arc<dyn Scraper>) {
        self.scrapers.push(scraper);
    }

    /// Case-insensitive lookup by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn Scraper>> {
        self.scrapers
            .iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
            .cloned()
            .with_context(|| {
                format!(
                    "Unknown scraper '{}' (available: {})",
                    name,
                    self.list_scrapers().join(", ")
                )
            })
    }

    pub fn list_scrapers(&self) -> Vec<String> {
        self.scrapers.iter()
            .map(|s| s.name().to_string())
            .collect()
    }
}

impl Default for ScraperRegistry {
    fn default() -> Self {
        Self::new()
    }
}
