//! Discovery scraping: filtered, paginated walks over the catalog listing.
//!
//! ## Algorithm
//! 1. Pick the sort order from (content type, period)
//! 2. Resolve the genre phrase to an id (only when one was given)
//! 3. Fetch pages 1, 2, ... sequentially, extracting result cards
//! 4. Stop on an empty page, once `limit` items are collected, or when the
//!    page budget is spent
//!
//! A walk that collects nothing at all is an error: the markup probably
//! changed, or the filters exclude everything.

use std::sync::{Arc, LazyLock};
use std::time::Instant;

use catalog::{
    AppliedFilters, CatalogError, ContentType, GenreId, Item, Period, Result, SearchQuery,
    SearchResult,
};
use regex::Regex;
use scraper::Html;
use tracing::{debug, info, instrument};
use url::Url;

use crate::fetcher::PageSource;
use crate::genres::GenreResolver;
use crate::html::{selector, spaced_text, text_content};

static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("year pattern is valid"));

/// Sort parameter for the discovery listing
pub fn sort_order(content_type: ContentType, period: Period) -> String {
    match period {
        Period::Popular => "popularity.desc".to_string(),
        Period::Recent => format!("{}.desc", content_type.release_date_field()),
    }
}

/// Cards found on one listing page
#[derive(Debug, Default)]
pub struct PageCards {
    /// Number of card containers, including ones without a usable title
    pub card_count: usize,
    pub items: Vec<Item>,
}

/// Extract result cards from a discovery listing page.
///
/// Relative links are resolved against `base_url`.
pub fn parse_listing_page(html: &str, base_url: &Url) -> Result<PageCards> {
    let document = Html::parse_document(html);

    let styled_cards = selector("div.card.style_1")?;
    let any_card = selector("div.card")?;
    let title_link = selector("h2 a")?;
    let score_chart = selector("div.user_score_chart")?;
    let release_date = selector("span.release_date")?;

    let mut cards: Vec<_> = document.select(&styled_cards).collect();
    if cards.is_empty() {
        cards = document.select(&any_card).collect();
    }

    let mut page = PageCards {
        card_count: cards.len(),
        items: Vec::with_capacity(cards.len()),
    };

    for card in cards {
        let Some(link) = card.select(&title_link).next() else {
            continue;
        };

        let url = link
            .value()
            .attr("href")
            .and_then(|href| base_url.join(href).ok())
            .map(String::from);

        let rating = card
            .select(&score_chart)
            .next()
            .and_then(|chart| chart.value().attr("data-percent"))
            .and_then(|percent| percent.trim().parse::<f32>().ok());

        let year = card
            .select(&release_date)
            .next()
            .map(|date| spaced_text(&date))
            .and_then(|text| {
                YEAR_PATTERN
                    .captures(&text)
                    .and_then(|caps| caps[1].parse::<u16>().ok())
            });

        page.items.push(Item {
            title: text_content(&link),
            year,
            rating,
            url,
        });
    }

    Ok(page)
}

/// Walks the discovery listing for one query
pub struct DiscoveryScraper {
    pages: Arc<dyn PageSource>,
    genres: Arc<GenreResolver>,
    base_url: Url,
}

impl DiscoveryScraper {
    pub fn new(pages: Arc<dyn PageSource>, genres: Arc<GenreResolver>, base_url: Url) -> Self {
        Self {
            pages,
            genres,
            base_url,
        }
    }

    /// URL of one listing page for the given filters
    pub fn page_url(
        &self,
        query: &SearchQuery,
        genre_id: Option<GenreId>,
        page: u32,
    ) -> Result<Url> {
        let content_type = query.content_type;
        let mut url = self
            .base_url
            .join(&format!("/discover/{}", content_type.path_segment()))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("language", "fr-FR");
            pairs.append_pair("sort_by", &sort_order(content_type, query.period));
            pairs.append_pair("page", &page.to_string());

            if let Some(id) = genre_id {
                pairs.append_pair("with_genres", &id.to_string());
            }

            let date_field = content_type.release_date_field();
            if let Some(year) = query.year_min {
                pairs.append_pair(&format!("{date_field}.gte"), &format!("{year}-01-01"));
            }
            if let Some(year) = query.year_max {
                pairs.append_pair(&format!("{date_field}.lte"), &format!("{year}-12-31"));
            }
        }

        Ok(url)
    }

    /// Run a discovery search
    #[instrument(skip(self), fields(content_type = %query.content_type, period = %query.period))]
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResult> {
        let start_time = Instant::now();
        let max_pages = query.effective_max_pages();

        let genre_text = query.genre.trim();
        let genre_id = if genre_text.is_empty() {
            None
        } else {
            self.genres.resolve(query.content_type, genre_text).await?
        };

        let source = self.page_url(query, genre_id, 1)?.to_string();
        let mut items: Vec<Item> = Vec::new();

        for page in 1..=max_pages {
            let url = self.page_url(query, genre_id, page)?;
            let html = self.pages.fetch(url.as_str()).await?;
            let cards = parse_listing_page(&html, &self.base_url)?;

            debug!(
                "Page {} yielded {} cards ({} items)",
                page,
                cards.card_count,
                cards.items.len()
            );

            if cards.card_count == 0 {
                break;
            }

            items.extend(cards.items);

            if let Some(limit) = query.limit {
                if items.len() >= limit {
                    items.truncate(limit);
                    break;
                }
            }
        }

        if items.is_empty() {
            return Err(CatalogError::NoResults { source_url: source });
        }

        info!(
            "Discovery collected {} items in {:.2?}",
            items.len(),
            start_time.elapsed()
        );

        Ok(SearchResult {
            items,
            source,
            applied_filters: AppliedFilters {
                content_type: query.content_type,
                period: query.period,
                genre_query: query.genre.clone(),
                genre_id,
                year_min: query.year_min,
                year_max: query.year_max,
                max_pages,
                limit: query.limit,
            },
        })
    }
}
