use thiserror::Error;

/// Structural failures: the fetched markup does not have the shape a scraper
/// needs. These travel inside `anyhow::Error` and can be recovered with
/// `downcast_ref::<ScrapeError>()`.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A required element is missing, so the page is not a usable listing
    #[error("expected element `{selector}` not found")]
    MissingElement { selector: String },

    /// Results page without a single numeric pagination label
    #[error("no numeric page labels found in pagination `{selector}`")]
    NoPageNumbers { selector: String },

    #[error("invalid CSS selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("header pool is empty")]
    EmptyHeaderPool,
}
