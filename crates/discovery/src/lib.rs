//! # Discovery Crate
//!
//! Live scraping of the public catalog site.
//!
//! ## Components
//!
//! ### RateLimiter / PageFetcher
//! One process-wide gate spaces every outbound fetch; the fetcher attaches
//! the headers the site expects and fails on non-success statuses.
//!
//! ### GenreResolver
//! Scrapes each content type's genre filter once, then maps free-text genre
//! phrases ("SC", "comédie", "sci-fi") to the site's numeric ids.
//!
//! ### DiscoveryScraper
//! Filtered, paginated walk over the discovery listing.
//!
//! ### DetailScraper
//! Structured fields from one title page.
//!
//! ## Example Usage
//!
//! ```ignore
//! use discovery::{Scrapers, ScraperConfig};
//! use catalog::{ContentType, Period, SearchQuery};
//!
//! let scrapers = Scrapers::build(&ScraperConfig::default())?;
//! let query = SearchQuery::new(ContentType::Movie, Period::Recent).with_genre("sf");
//! let result = scrapers.discovery.search(&query).await?;
//! let details = scrapers.details.details(result.items[0].url.as_deref().unwrap()).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use catalog::Result;
use url::Url;

// Public modules
pub mod details;
pub mod fetcher;
pub mod genres;
pub mod rate_limiter;
pub mod search;

mod html;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-export commonly used types
pub use details::DetailScraper;
pub use fetcher::{PageFetcher, PageSource};
pub use genres::{GenreMap, GenreResolver};
pub use rate_limiter::RateLimiter;
pub use search::DiscoveryScraper;

/// Public site the scrapers target by default
pub const DEFAULT_BASE_URL: &str = "https://www.themoviedb.org";

/// Settings for the scraping stack
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: String,
    /// Minimum spacing between two fetches
    pub min_interval: Duration,
    /// Timeout of a single fetch
    pub fetch_timeout: Duration,
    /// Optional lifetime of cached genre lists
    pub genre_ttl: Option<Duration>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            min_interval: rate_limiter::DEFAULT_MIN_INTERVAL,
            fetch_timeout: fetcher::DEFAULT_FETCH_TIMEOUT,
            genre_ttl: None,
        }
    }
}

/// The scraping stack wired around one shared page source
#[derive(Clone)]
pub struct Scrapers {
    pub genres: Arc<GenreResolver>,
    pub discovery: Arc<DiscoveryScraper>,
    pub details: Arc<DetailScraper>,
}

impl Scrapers {
    /// Build the real stack: one rate limiter, one fetcher, shared by all scrapers
    pub fn build(config: &ScraperConfig) -> Result<Self> {
        let limiter = Arc::new(RateLimiter::new(config.min_interval));
        let fetcher: Arc<dyn PageSource> = Arc::new(PageFetcher::new(limiter, config.fetch_timeout)?);
        let base_url = Url::parse(&config.base_url)?;

        let mut resolver = GenreResolver::new(fetcher.clone(), base_url.clone());
        if let Some(ttl) = config.genre_ttl {
            resolver = resolver.with_ttl(ttl);
        }

        Ok(Self::with_source(fetcher, base_url, resolver))
    }

    /// Wire the scrapers over an arbitrary page source
    pub fn with_source(pages: Arc<dyn PageSource>, base_url: Url, resolver: GenreResolver) -> Self {
        let genres = Arc::new(resolver);
        Self {
            discovery: Arc::new(DiscoveryScraper::new(pages.clone(), genres.clone(), base_url)),
            details: Arc::new(DetailScraper::new(pages)),
            genres,
        }
    }
}
