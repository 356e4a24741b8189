//! Error types for catalog scraping.
//!
//! Every failure of the discovery/detail scrapers ends up here:
//! - transport failures (connection refused, timeout)
//! - non-success HTTP statuses
//! - structural failures (the page parsed but the expected markup was absent)
//!
//! The tool executor turns any of these into a `TOOL_FAILED` envelope, so the
//! `Display` text is what a caller eventually sees.

use thiserror::Error;

/// Errors that can occur while fetching or scraping catalog pages
///
/// `#[derive(Error)]` gives us `std::error::Error` and a `Display` built from
/// the `#[error(...)]` attributes.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The request never produced a response (DNS, refused, timeout...)
    #[error("Request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    /// The HTTP client could not be built
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),

    /// The site answered with a non-2xx status
    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// A URL could not be built from the configured base
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The genre filter control had no usable entries
    #[error("Scraping failed: no genres found on the {content_type} discovery page")]
    NoGenres { content_type: String },

    /// Every discovery page came back without result cards
    #[error("Scraping failed: no results on discovery ({source_url})")]
    NoResults { source_url: String },

    /// A detail page did not contain a title
    #[error("Scraping failed: no title on detail page {url}")]
    MissingTitle { url: String },

    /// A CSS selector failed to compile
    #[error("Invalid selector {selector}: {reason}")]
    Selector { selector: String, reason: String },
}

impl CatalogError {
    /// Wrap a `reqwest` failure with the URL that was being fetched.
    pub fn network(url: impl Into<String>, err: reqwest::Error) -> Self {
        CatalogError::Network {
            url: url.into(),
            reason: err.to_string(),
        }
    }
}

/// Convenience type alias for Results in the catalog crates
pub type Result<T> = std::result::Result<T, CatalogError>;
