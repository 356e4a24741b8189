//! `get_title_details`: one title page as a tool.

use std::sync::Arc;

use async_trait::async_trait;
use catalog::DetailRecord;
use discovery::DetailScraper;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, ToolError};
use crate::traits::Tool;

/// Arguments of `get_title_details`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TitleDetailsArgs {
    /// Absolute URL of a title page, as returned by search_titles
    pub url: String,
}

pub struct TitleDetails {
    scraper: Arc<DetailScraper>,
}

impl TitleDetails {
    pub fn new(scraper: Arc<DetailScraper>) -> Self {
        Self { scraper }
    }
}

#[async_trait]
impl Tool for TitleDetails {
    const NAME: &'static str = "get_title_details";
    type Args = TitleDetailsArgs;
    type Output = DetailRecord;

    fn description(&self) -> &str {
        "Get details of a specific title (synopsis, genres, etc.) from its URL."
    }

    fn validate(&self, args: &TitleDetailsArgs) -> Result<()> {
        let parsed = Url::parse(args.url.trim())
            .map_err(|e| ToolError::invalid_args(format!("url is not a valid URL: {e}")))?;

        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ToolError::invalid_args(format!("url must be http(s), got {other}"))),
        }
    }

    async fn call(&self, args: TitleDetailsArgs) -> Result<DetailRecord> {
        Ok(self.scraper.details(args.url.trim()).await?)
    }
}
