pub mod funda;
pub mod pararius;

pub use funda::FundaScraper;
pub use pararius::ParariusScraper;

use crate::headers::PooledHeaders;
use crate::http_client::PageFetcher;
use crate::scraper_trait::ScraperRegistry;
use anyhow::Result;
use std::sync::Arc;

/// Registry with every supported source, sharing one fetcher.
///
/// The header pool is loaded once by the caller and shared read-only.
pub fn default_registry(
    fetcher: Arc<dyn PageFetcher>,
    header_pool: Arc<PooledHeaders>,
) -> Result<ScraperRegistry> {
    let mut registry = ScraperRegistry::new();
    registry.register(Arc::new(ParariusScraper::new(fetcher.clone())));
    registry.register(Arc::new(FundaScraper::new(fetcher, header_pool)?));
    Ok(registry)
}
