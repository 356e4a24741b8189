//! Detail scraping for a single title page.

use std::sync::Arc;

use catalog::{CatalogError, DetailRecord, Result};
use scraper::Html;
use tracing::debug;

use crate::fetcher::PageSource;
use crate::html::{optional_text, selector, text_content};

/// Extract the detail fields from a title page.
///
/// A page without a title is a structural failure, not a "not found".
pub fn parse_detail_page(html: &str, url: &str) -> Result<DetailRecord> {
    let document = Html::parse_document(html);

    let title = optional_text(document.select(&selector("h2 a")?).next()).ok_or_else(|| {
        CatalogError::MissingTitle {
            url: url.to_string(),
        }
    })?;
    let summary = optional_text(document.select(&selector("div.overview p")?).next());
    let runtime = optional_text(document.select(&selector("span.runtime")?).next());
    let genres = document
        .select(&selector("span.genres a")?)
        .map(|genre| text_content(&genre))
        .filter(|genre| !genre.is_empty())
        .collect();

    Ok(DetailRecord {
        title,
        summary,
        runtime,
        genres,
        source: url.to_string(),
    })
}

/// Fetches and parses title pages
pub struct DetailScraper {
    pages: Arc<dyn PageSource>,
}

impl DetailScraper {
    pub fn new(pages: Arc<dyn PageSource>) -> Self {
        Self { pages }
    }

    pub async fn details(&self, url: &str) -> Result<DetailRecord> {
        let html = self.pages.fetch(url).await?;
        let record = parse_detail_page(&html, url)?;
        debug!("Scraped details for {:?} ({} genres)", record.title, record.genres.len());
        Ok(record)
    }
}
