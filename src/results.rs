use crate::models::ListingRecord;
use crate::scraper_trait::Scraper;
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Walks every results page of one search and scrapes the listings found.
///
/// Requests are issued one at a time with a fixed pause between results
/// pages, so the traffic stays human-paced.
pub struct ResultsScraper {
    scraper: Arc<dyn Scraper>,
    search_url: String,
    page_delay: Duration,
    number_of_pages: OnceCell<u32>,
}

impl ResultsScraper {
    pub fn new(scraper: Arc<dyn Scraper>, search_url: impl Into<String>, page_delay: Duration) -> Self {
        Self {
            scraper,
            search_url: search_url.into(),
            page_delay,
            number_of_pages: OnceCell::new(),
        }
    }

    /// Fetched from the first results page once, then reused
    pub async fn number_of_pages(&self) -> Result<u32> {
        self.number_of_pages
            .get_or_try_init(|| self.scraper.page_count(&self.search_url))
            .await
            .copied()
    }

    /// Listing URLs of all results pages, in page order
    pub async fn discover_all_listing_urls(&self) -> Result<Vec<String>> {
        let total_pages = self.number_of_pages().await?;
        tracing::info!("{} search has {} result pages", self.scraper.name(), total_pages);

        let mut all_listing_urls = Vec::new();
        for page in 1..=total_pages {
            let page_url = self.scraper.page_url(&self.search_url, page);
            let mut urls = self.scraper.list_urls(&page_url).await?;
            tracing::debug!("Page {}/{}: {} listings", page, total_pages, urls.len());
            all_listing_urls.append(&mut urls);

            if page < total_pages {
                tokio::time::sleep(self.page_delay).await;
            }
        }

        tracing::info!("Number of listings to scrape: {}", all_listing_urls.len());
        Ok(all_listing_urls)
    }

    /// Scrape every discovered listing.
    ///
    /// A listing that fails for any reason is logged and left out; the batch
    /// carries on. Only discovery errors abort the run.
    pub async fn scrape_all(&self) -> Result<Vec<ListingRecord>> {
        let listing_urls = self.discover_all_listing_urls().await?;
        tracing::info!("Scraping all listings...");

        let progress = ProgressBar::new(listing_urls.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
                .progress_chars("=> "),
        );

        let mut records = Vec::with_capacity(listing_urls.len());
        let mut failed = 0;

        for url in &listing_urls {
            match self.scraper.get_record(url).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping listing {}: {:#}", url, e);
                    failed += 1;
                }
            }
            progress.inc(1);
        }

        progress.finish_and_clear();
        tracing::info!(
            "All listings scraped: {} succeeded, {} skipped",
            records.len(),
            failed
        );
        Ok(records)
    }
}
