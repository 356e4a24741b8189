//! # Catalog Crate
//!
//! Shared domain vocabulary for the CineAgent workspace.
//!
//! ## Main Components
//!
//! - **types**: content type / period enums, scraped records (Item, DetailRecord),
//!   the discovery query and its result
//! - **error**: the error enum every scraping operation returns
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalog::{ContentType, Period, SearchQuery};
//!
//! let query = SearchQuery::new(ContentType::Series, Period::Recent)
//!     .with_genre("sf")
//!     .with_limit(Some(20));
//! ```

// Public modules
pub mod error;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{CatalogError, Result};
pub use types::{
    // Type aliases
    GenreId,
    // Query dimensions
    ContentType,
    Period,
    // Records
    Item,
    DetailRecord,
    // Discovery
    SearchQuery,
    SearchResult,
    AppliedFilters,
    DEFAULT_MAX_PAGES,
    MAX_PAGES_CEILING,
};
