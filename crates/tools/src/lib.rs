//! Tool layer between the dialog orchestrator and the scrapers.
//!
//! This crate provides:
//! - The `Tool` trait: typed args with a derived JSON schema, validation, async call
//! - `ToolRegistry`: invoke-by-name returning a `ToolOutcome` envelope
//! - The two catalog tools, `search_titles` and `get_title_details`
//!
//! ## Architecture
//! Execution never raises. Each call resolves to exactly one of:
//! 1. `{result, error: null}` on success
//! 2. `UNKNOWN_TOOL` for an unregistered name
//! 3. `INVALID_ARGS` when arguments do not deserialize or fail validation
//! 4. `TOOL_FAILED` for scraper errors and panics
//!
//! ## Example Usage
//! ```ignore
//! use tools::default_registry;
//! use serde_json::json;
//!
//! let registry = default_registry(&scrapers);
//! let outcome = registry
//!     .execute("search_titles", json!({"type": "movie", "period": "recent", "genre": "sf"}))
//!     .await;
//! ```

pub mod envelope;
pub mod error;
pub mod registry;
pub mod search_titles;
pub mod title_details;
pub mod traits;

// Re-export main types
pub use envelope::{ErrorCode, ToolCallRecord, ToolErrorBody, ToolOutcome};
pub use error::{Result, ToolError};
pub use registry::{ToolRegistry, ToolSpec};
pub use search_titles::{SearchTitles, SearchTitlesArgs};
pub use title_details::{TitleDetails, TitleDetailsArgs};
pub use traits::{ErasedTool, Tool};

use discovery::Scrapers;

/// Registry holding the catalog tools wired to `scrapers`
pub fn default_registry(scrapers: &Scrapers) -> ToolRegistry {
    ToolRegistry::new()
        .register(SearchTitles::new(scrapers.discovery.clone()))
        .register(TitleDetails::new(scrapers.details.clone()))
}
