use crate::extract::{self, FeatureSelectors};
use crate::headers::{HeaderSet, HeaderSource};
use crate::http_client::PageFetcher;
use crate::models::{ListingDetails, ListingRecord};
use crate::scraper_trait::Scraper;
use anyhow::Result;
use scraper::Html;
use std::sync::Arc;

pub const BASE_URL: &str = "https://www.funda.nl";

const TITLE: &str = ".object-header__title";
const TITLE_PREFIX: &str = "Te huur: ";
const SUBTITLE: &str = ".object-header__subtitle";
const PHOTO: &str = "img.media-viewer-overview__section-image";
const AGENT_LINK: &str = "a.object-contact-aanbieder-link";
const AGENT_LOGO: &str = "img.object-contact-aanbieder-logo";
const DESCRIPTION: &str = ".object-description-body";
const SEARCH_RESULT_TITLE: &str = ".search-result__header-title-col";
const PAGINATION_LABEL: &str = ".pagination-pages a";

const FEATURES: FeatureSelectors = FeatureSelectors {
    list: "dl.object-kenmerken-list",
    term: "dt",
    nested_value: ".kenmerken-highlighted__value",
};

/// funda.nl: fingerprints clients, so every request uses a full header set
/// drawn from the recorded pool
pub struct FundaScraper {
    fetcher: Arc<dyn PageFetcher>,
    headers: Arc<dyn HeaderSource>,
    postal_code_pattern: regex::Regex,
}

impl FundaScraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>, headers: Arc<dyn HeaderSource>) -> Result<Self> {
        Ok(Self {
            fetcher,
            headers,
            postal_code_pattern: regex::Regex::new(r"\b(\d{4})\s?([A-Z]{2})\b")?,
        })
    }

    fn title(document: &Html) -> Result<String> {
        let title = extract::require_element(document, TITLE)?;
        Ok(extract::strip_title(&extract::element_text(title), TITLE_PREFIX, ""))
    }

    fn photo_src(document: &Html) -> Option<String> {
        extract::first_attr(document, PHOTO, "src")
    }

    fn agent_name(document: &Html) -> Option<String> {
        extract::first_text(document, AGENT_LINK)
    }

    fn agent_image_src(document: &Html) -> Option<String> {
        extract::first_attr(document, AGENT_LOGO, "src")
    }

    fn agent_link(document: &Html) -> Result<String> {
        let href = extract::require_href(document, AGENT_LINK)?;
        Ok(extract::absolute_url(BASE_URL, &href))
    }

    fn description_text(document: &Html) -> Option<String> {
        extract::first_element(document, DESCRIPTION).map(extract::element_text)
    }

    /// JSON-LD address first, then the "1057 CN Amsterdam" header subtitle
    fn postal_code(&self, document: &Html) -> Result<Option<String>> {
        if let Some(code) = extract::postal_code_from_json_ld(document)? {
            return Ok(Some(code));
        }

        Ok(extract::first_text(document, SUBTITLE).and_then(|subtitle| {
            self.postal_code_pattern
                .captures(&subtitle)
                .map(|caps| format!("{}{}", &caps[1], &caps[2]))
        }))
    }
}

impl Scraper for FundaScraper {
    fn name(&self) -> &str {
        "Funda"
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

    fn page_url(&self, search_url: &str, page: u32) -> String {
        format!("{}/p{}/", extract::search_base(search_url), page)
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
        Self::title(&document)?;

        let mut record = ListingRecord::from(extract::parse_features(&document, &FEATURES)?);
        record.insert("description", Self::description_text(&document));
        record.insert("postal_code", self.postal_code(&document)?);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::PooledHeaders;
    use crate::http_client::testing::FixtureFetcher;

    const LISTING_HTML: &str = include_str!("../../tests/fixtures/funda_listing.html");
    const RESULTS_HTML: &str = include_str!("../../tests/fixtures/funda_results.html");
    const LISTING_URL: &str = "https://www.funda.nl/huur/amsterdam/appartement-42811234-hoofdweg-147-b/";

    fn scraper_with(fetcher: Arc<FixtureFetcher>) -> FundaScraper {
        let pool = PooledHeaders::builtin().unwrap();
        FundaScraper::new(fetcher, Arc::new(pool)).unwrap()
    }

    #[test]
    fn test_parse_record() {
        let scraper = scraper_with(Arc::new(FixtureFetcher::new()));
        let record = scraper.parse_record(LISTING_HTML, LISTING_URL).unwrap();

        let mut keys: Vec<&str> = record.keys().collect();
        keys.sort_unstable();
        let mut expected_keys = vec![
            "rental_price",
            "listed_since",
            "status",
            "acceptance",
            "kind_of_house",
            "building_type",
            "construction_period",
            "living_area",
            "number_of_rooms",
            "number_of_bathrooms",
            "energy_label",
            "located_at",
            "description",
            "postal_code",
            "scraped_timestamp",
            "agent",
            "url",
        ];
        expected_keys.sort_unstable();
        assert_eq!(keys, expected_keys);
        assert!(record.iter().all(|(_, value)| value.is_some()));

        assert_eq!(record.get("rental_price"), Some("€ 1.950 per maand"));
        assert_eq!(record.get("energy_label"), Some("C"));
        assert_eq!(record.get("kind_of_house"), Some("Bovenwoning, Appartement"));
        assert_eq!(record.get("agent"), Some("Van Huis Uit Makelaars"));
        assert!(record.get("description").unwrap().starts_with("Lichte driekamerwoning"));
    }

    #[test]
    fn test_postal_code_from_subtitle() {
        let scraper = scraper_with(Arc::new(FixtureFetcher::new()));
        let document = Html::parse_document(LISTING_HTML);
        assert_eq!(scraper.postal_code(&document).unwrap().as_deref(), Some("1057CN"));

        let no_code = Html::parse_document(r#"<span class="object-header__subtitle">Amsterdam</span>"#);
        assert_eq!(scraper.postal_code(&no_code).unwrap(), None);
    }

    #[test]
    fn test_parse_details() {
        let scraper = scraper_with(Arc::new(FixtureFetcher::new()));
        let details = scraper.parse_details(LISTING_HTML, LISTING_URL).unwrap();

        assert_eq!(details.title, "Hoofdweg 147 B");
        assert_eq!(
            details.photo_src.as_deref(),
            Some("https://cloud.funda.nl/valentina_media/142/811/234_720x480.jpg")
        );
        assert_eq!(
            details.agent_link.as_deref(),
            Some("https://www.funda.nl/makelaars/amsterdam/24591-van-huis-uit-makelaars/")
        );
        assert_eq!(
            details.agent_image_src.as_deref(),
            Some("https://cloud.funda.nl/valentina_media/makelaars/24591_180x120.png")
        );
    }

    #[test]
    fn test_parse_details_without_agent() {
        let scraper = scraper_with(Arc::new(FixtureFetcher::new()));
        let html = r#"<h1 class="object-header__title">Te huur: Kinkerstraat 1</h1>
            <a class="object-contact-aanbieder-link">Particulier</a>"#;

        let details = scraper.parse_details(html, LISTING_URL).unwrap();
        assert_eq!(details.title, "Kinkerstraat 1");
        assert_eq!(details.agent_name.as_deref(), Some("Particulier"));
        assert_eq!(details.agent_link, None);
    }

    #[test]
    fn test_parse_listing_urls_and_page_count() {
        let scraper = scraper_with(Arc::new(FixtureFetcher::new()));

        assert_eq!(
            scraper.parse_listing_urls(RESULTS_HTML).unwrap(),
            vec![
                "/huur/amsterdam/appartement-42811234-hoofdweg-147-b/",
                "/huur/amsterdam/appartement-42809876-admiraal-de-ruijterweg-301-ii/",
            ]
        );
        assert_eq!(scraper.parse_page_count(RESULTS_HTML).unwrap(), 7);
    }

    #[test]
    fn test_page_url() {
        let scraper = scraper_with(Arc::new(FixtureFetcher::new()));
        assert_eq!(
            scraper.page_url("https://www.funda.nl/huur/amsterdam/?selected_area=%5B%22amsterdam%22%5D", 2),
            "https://www.funda.nl/huur/amsterdam/p2/"
        );
    }

    #[tokio::test]
    async fn test_requests_use_pooled_header_sets() {
        let fetcher = Arc::new(FixtureFetcher::new().with_page(LISTING_URL, LISTING_HTML));
        let scraper = scraper_with(fetcher.clone());

        scraper.get_record("/huur/amsterdam/appartement-42811234-hoofdweg-147-b/").await.unwrap();

        let pool = PooledHeaders::builtin().unwrap();
        let sent = fetcher.requested_headers();
        assert_eq!(fetcher.requested_urls(), vec![LISTING_URL]);
        assert!(pool.sets().contains(&sent[0]));
    }
}
