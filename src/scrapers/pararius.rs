use crate::extract::{self, FeatureSelectors};
use crate::headers::{HeaderSet, HeaderSource, RandomUserAgent};
use crate::http_client::PageFetcher;
use crate::models::{ListingDetails, ListingRecord};
use crate::scraper_trait::Scraper;
use anyhow::Result;
use scraper::{Html, Selector};
use std::sync::Arc;

pub const BASE_URL: &str = "https://pararius.com";

const TITLE: &str = "h1.listing-detail-summary__title";
const TITLE_PREFIX: &str = "For rent: ";
const TITLE_CITY_SUFFIX: &str = " in Amsterdam";
const PHOTO: &str = "img.picture__image";
const AGENT_NAME: &str = "a.agent-summary__title-link";
const AGENT_LOGO: &str = "div.picture--agent-detail-logo";
const AGENT_LOGO_LINK: &str = "a.agent-summary__logo-link";
const DESCRIPTION: &str = "div.listing-detail-description__additional";
const SEARCH_RESULT_TITLE: &str = "h2.listing-search-item__title";
const PAGINATION_LABEL: &str = "a.pagination__link";

const FEATURES: FeatureSelectors = FeatureSelectors {
    list: "dl.listing-features__list",
    term: "dt.listing-features__term",
    nested_value: ".listing-features__main-description",
};

/// pararius.com: plain markup, a random User-Agent is enough
pub struct ParariusScraper {
    fetcher: Arc<dyn PageFetcher>,
    headers: Arc<dyn HeaderSource>,
}

impl ParariusScraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_headers(fetcher, Arc::new(RandomUserAgent))
    }

    pub fn with_headers(fetcher: Arc<dyn PageFetcher>, headers: Arc<dyn HeaderSource>) -> Self {
        Self { fetcher, headers }
    }

    /// The page is not a listing when it has no title
    fn title(document: &Html) -> Result<String> {
        let title = extract::require_element(document, TITLE)?;
        Ok(extract::strip_title(
            &extract::element_text(title),
            TITLE_PREFIX,
            TITLE_CITY_SUFFIX,
        ))
    }

    fn photo_src(document: &Html) -> Option<String> {
        extract::first_attr(document, PHOTO, "src")
    }

    fn agent_name(document: &Html) -> Option<String> {
        extract::first_text(document, AGENT_NAME)
    }

    fn agent_image_src(document: &Html) -> Option<String> {
        let logo = extract::first_element(document, AGENT_LOGO)?;
        let image = Selector::parse("picture img.picture__image").ok()?;
        logo.select(&image)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(|src| src.to_string())
    }

    /// Fails for listings without an agent
    fn agent_link(document: &Html) -> Result<String> {
        let href = extract::require_href(document, AGENT_LOGO_LINK)?;
        Ok(format!("{}{}", BASE_URL, href))
    }

    /// Present but empty containers give an empty string
    fn description_text(document: &Html) -> Option<String> {
        extract::first_element(document, DESCRIPTION).map(extract::element_text)
    }
}

impl Scraper for ParariusScraper {
    fn name(&self) -> &str {
        "Pararius"
    }

    fn base_url(&self) -> &str {
        BASE_URL
    }

    fn fetcher(&self) -> &dyn PageFetcher {
        self.fetcher.as_ref()
    }

    fn headers(&self) -> HeaderSet {
        self.headers.produce()
    }

    fn parse_listing_urls(&self, markup: &str) -> Result<Vec<String>> {
        let document = Html::parse_document(markup);
        extract::link_targets(&document, SEARCH_RESULT_TITLE)
    }

    fn parse_page_count(&self, markup: &str) -> Result<u32> {
        let document = Html::parse_document(markup);
        Ok(extract::max_page_number(&document, PAGINATION_LABEL)?)
    }

    fn parse_record(&self, markup: &str, listing_url: &str) -> Result<ListingRecord> {
        let document = Html::parse_document(markup);

        // Not every page is a listing; bail before collecting anything
        Self::title(&document)?;

        let mut record = ListingRecord::from(extract::parse_features(&document, &FEATURES)?);
        record.insert("description", Self::description_text(&document));
        record.insert("postal_code", extract::postal_code_from_json_ld(&document)?);
        record.insert("scraped_timestamp", Some(extract::scraped_timestamp()));
        record.insert("agent", Self::agent_name(&document));
        record.insert("url", Some(extract::absolute_url(BASE_URL, listing_url)));

        Ok(record)
    }

    fn parse_details(&self, markup: &str, _listing_url: &str) -> Result<ListingDetails> {
        let document = Html::parse_document(markup);

        Ok(ListingDetails {
            title: Self::title(&document)?,
            photo_src: Self::photo_src(&document),
            agent_name: Self::agent_name(&document),
            agent_image_src: Self::agent_image_src(&document),
            agent_link: extract::absent_if_missing(Self::agent_link(&document))?,
            description: Self::description_text(&document),
        })
    }
}
