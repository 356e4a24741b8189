//! Core domain types for the scraped catalog.
//!
//! These are the values that flow between the scrapers, the tool layer and
//! the dialog orchestrator. All of them serialize to the JSON shapes exposed
//! in tool outcomes, so field names are part of the external contract.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Type Aliases
// =============================================================================

/// Numeric genre identifier used by the site's discovery filter
pub type GenreId = u32;

// =============================================================================
// Query Dimensions
// =============================================================================

/// Kind of content the user is looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Movie,
    Series,
}

impl ContentType {
    /// Path segment used by the site (`/discover/movie`, `/discover/tv`)
    pub fn path_segment(self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Series => "tv",
        }
    }

    /// Name of the date field the site filters and sorts releases on
    pub fn release_date_field(self) -> &'static str {
        match self {
            ContentType::Movie => "primary_release_date",
            ContentType::Series => "first_air_date",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Series => "series",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    /// Accepts the canonical names plus the site's own `tv` spelling
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movie" => Ok(ContentType::Movie),
            "series" | "tv" | "show" => Ok(ContentType::Series),
            other => Err(format!("unknown content type: {other}")),
        }
    }
}

/// Whether the user wants what is popular now or what came out last
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Popular,
    Recent,
}

impl Period {
    pub fn as_str(self) -> &'static str {
        match self {
            Period::Popular => "popular",
            Period::Recent => "recent",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "popular" => Ok(Period::Popular),
            "recent" => Ok(Period::Recent),
            other => Err(format!("unknown period: {other}")),
        }
    }
}

// =============================================================================
// Scraped Records
// =============================================================================

/// One result card from a discovery page.
///
/// Identity is the `url` when present; cards without a link are still kept
/// so list numbering matches what the site showed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    /// Release year pulled from the card's date text
    pub year: Option<u16>,
    /// User score as the site's percentage (0-100)
    pub rating: Option<f32>,
    pub url: Option<String>,
}

/// Structured fields extracted from a single title page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub title: String,
    pub summary: Option<String>,
    pub runtime: Option<String>,
    pub genres: Vec<String>,
    /// The page these details were read from
    pub source: String,
}

// =============================================================================
// Discovery Query / Result
// =============================================================================

/// Default page budget for one discovery walk
pub const DEFAULT_MAX_PAGES: u32 = 60;

/// Hard ceiling on the page budget
pub const MAX_PAGES_CEILING: u32 = 300;

/// Parameters of one discovery search.
///
/// Built with method chaining:
/// ```ignore
/// let query = SearchQuery::new(ContentType::Movie, Period::Recent)
///     .with_genre("science-fiction")
///     .with_years(Some(2020), None)
///     .with_max_pages(2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub content_type: ContentType,
    pub period: Period,
    /// Free-text genre as the user wrote it (empty means no genre filter)
    pub genre: String,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    /// Stop once this many items are collected (`None` walks the page budget)
    pub limit: Option<usize>,
    pub max_pages: u32,
}

impl SearchQuery {
    pub fn new(content_type: ContentType, period: Period) -> Self {
        Self {
            content_type,
            period,
            genre: String::new(),
            year_min: None,
            year_max: None,
            limit: None,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = genre.into();
        self
    }

    pub fn with_years(mut self, year_min: Option<i32>, year_max: Option<i32>) -> Self {
        self.year_min = year_min;
        self.year_max = year_max;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Page budget clamped into `[1, MAX_PAGES_CEILING]`
    pub fn effective_max_pages(&self) -> u32 {
        self.max_pages.clamp(1, MAX_PAGES_CEILING)
    }
}

/// Filters as they were actually applied after resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedFilters {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub period: Period,
    /// The literal genre text that was submitted
    pub genre_query: String,
    pub genre_id: Option<GenreId>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub max_pages: u32,
    pub limit: Option<usize>,
}

/// Output of a discovery search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub items: Vec<Item>,
    /// URL of the first page queried
    pub source: String,
    pub applied_filters: AppliedFilters,
}
