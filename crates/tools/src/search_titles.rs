//! `search_titles`: discovery search exposed as a tool.

use std::sync::Arc;

use async_trait::async_trait;
use catalog::{ContentType, DEFAULT_MAX_PAGES, MAX_PAGES_CEILING, Period, SearchQuery, SearchResult};
use discovery::DiscoveryScraper;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolError};
use crate::traits::Tool;

/// Earliest year accepted as a filter bound
pub const MIN_YEAR: i32 = 1900;

/// Latest year accepted as a filter bound
pub const MAX_YEAR: i32 = 2100;

/// Arguments of `search_titles`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchTitlesArgs {
    /// movie or series
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// popular or recent
    pub period: Period,
    /// Free-text genre, e.g. "science-fiction" or "SF"
    #[serde(default)]
    pub genre: Option<String>,
    #[schemars(range(min = 1900, max = 2100))]
    #[serde(default)]
    pub year_min: Option<i32>,
    #[schemars(range(min = 1900, max = 2100))]
    #[serde(default)]
    pub year_max: Option<i32>,
    /// Stop after this many items
    #[schemars(range(min = 1))]
    #[serde(default)]
    pub limit: Option<u64>,
    /// Page budget (default 60)
    #[schemars(range(min = 1, max = 300))]
    #[serde(default)]
    pub max_pages: Option<u32>,
}

impl SearchTitlesArgs {
    pub fn new(content_type: ContentType, period: Period) -> Self {
        Self {
            content_type,
            period,
            genre: None,
            year_min: None,
            year_max: None,
            limit: None,
            max_pages: None,
        }
    }

    pub fn to_query(&self) -> SearchQuery {
        SearchQuery::new(self.content_type, self.period)
            .with_genre(self.genre.clone().unwrap_or_default())
            .with_years(self.year_min, self.year_max)
            .with_limit(self.limit.map(|limit| limit as usize))
            .with_max_pages(self.max_pages.unwrap_or(DEFAULT_MAX_PAGES))
    }
}

fn check_year(field: &str, year: Option<i32>) -> Result<()> {
    match year {
        Some(year) if !(MIN_YEAR..=MAX_YEAR).contains(&year) => Err(ToolError::invalid_args(format!(
            "{field} must be between {MIN_YEAR} and {MAX_YEAR} (got {year})"
        ))),
        _ => Ok(()),
    }
}

pub struct SearchTitles {
    scraper: Arc<DiscoveryScraper>,
}

impl SearchTitles {
    pub fn new(scraper: Arc<DiscoveryScraper>) -> Self {
        Self { scraper }
    }
}

#[async_trait]
impl Tool for SearchTitles {
    const NAME: &'static str = "search_titles";
    type Args = SearchTitlesArgs;
    type Output = SearchResult;

    fn description(&self) -> &str {
        "Search movies/series from a public website (live scraping)."
    }

    fn validate(&self, args: &SearchTitlesArgs) -> Result<()> {
        check_year("year_min", args.year_min)?;
        check_year("year_max", args.year_max)?;

        if args.limit == Some(0) {
            return Err(ToolError::invalid_args("limit must be at least 1"));
        }

        if let Some(pages) = args.max_pages {
            if !(1..=MAX_PAGES_CEILING).contains(&pages) {
                return Err(ToolError::invalid_args(format!(
                    "max_pages must be between 1 and {MAX_PAGES_CEILING} (got {pages})"
                )));
            }
        }

        Ok(())
    }

    async fn call(&self, args: SearchTitlesArgs) -> Result<SearchResult> {
        Ok(self.scraper.search(&args.to_query()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> SearchTitlesArgs {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_args_accept_nulls_and_missing_fields() {
        let args = parse(json!({
            "type": "series",
            "period": "recent",
            "genre": "",
            "year_min": null,
            "limit": null,
            "max_pages": 60
        }));

        assert_eq!(args.content_type, ContentType::Series);
        assert_eq!(args.year_max, None);

        let query = args.to_query();
        assert_eq!(query.genre, "");
        assert_eq!(query.max_pages, 60);
        assert_eq!(query.limit, None);
    }

    #[test]
    fn test_type_and_period_are_required() {
        let missing_type = serde_json::from_value::<SearchTitlesArgs>(json!({"period": "popular"}));
        let bad_period = serde_json::from_value::<SearchTitlesArgs>(json!({"type": "movie", "period": "old"}));

        assert!(missing_type.is_err());
        assert!(bad_period.is_err());
    }

    #[test]
    fn test_schema_ranges() {
        let schema = crate::traits::input_schema::<SearchTitlesArgs>();
        let properties = &schema["properties"];

        assert!(properties.get("type").is_some());
        let max_pages = properties["max_pages"].to_string();
        assert!(max_pages.contains("300"));
        let year_min = properties["year_min"].to_string();
        assert!(year_min.contains("1900"));
        assert!(year_min.contains("2100"));

        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(required, vec!["period", "type"]);
    }

    #[test]
    fn test_check_year_bounds() {
        assert!(check_year("year_min", Some(1900)).is_ok());
        assert!(check_year("year_min", Some(2100)).is_ok());
        assert!(check_year("year_min", None).is_ok());
        assert!(check_year("year_min", Some(1899)).is_err());
        assert!(check_year("year_max", Some(2101)).is_err());
    }
}
