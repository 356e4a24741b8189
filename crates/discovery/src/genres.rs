//! Genre resolution: free-text genre phrase → the site's numeric genre id.
//!
//! ## Algorithm
//! The genre vocabulary is not hardcoded. The first time a content type is
//! resolved, the discovery page's genre filter (`ul#with_genres`) is scraped
//! into a `GenreMap` and cached. A phrase is then matched against the cached
//! names in tiers, first hit wins:
//! 1. exact match of the normalized phrase
//! 2. containment in either direction
//! 3. science-fiction heuristic ("SC", "sf", "sci fi"...)
//! 4. largest word overlap (ties go to the first genre seen)

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use catalog::{CatalogError, ContentType, GenreId, Result};
use dashmap::DashMap;
use scraper::Html;
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;
use url::Url;

use crate::fetcher::PageSource;
use crate::html::{selector, text_content};

/// Abbreviations people use for science fiction
const SCIFI_ABBREVIATIONS: [&str; 5] = ["sf", "sc", "scifi", "sci fi", "sci"];

// =============================================================================
// Normalization
// =============================================================================

/// Normalize a genre phrase for matching.
///
/// "Science-Fiction & Fantastique" → "science fiction fantastique",
/// "Comédie" → "comedie", "sci_fi" → "sci fi".
pub fn normalize(text: &str) -> String {
    let lowered = text.trim().to_lowercase();

    let mut cleaned = String::with_capacity(lowered.len());
    for c in lowered.nfkd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
            cleaned.push(c);
        } else {
            // '&', '_', '/', '-' and any other symbol become separators
            cleaned.push(' ');
        }
    }

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether an already-normalized phrase reads as "science fiction"
fn looks_like_scifi(normalized: &str) -> bool {
    SCIFI_ABBREVIATIONS.contains(&normalized)
        || normalized.contains("science fiction")
        || normalized.contains("sciencefiction")
}

// =============================================================================
// GenreMap
// =============================================================================

/// Ordered mapping of normalized genre name → genre id.
///
/// Order is the order genres appeared on the page; containment and overlap
/// ties resolve to the earliest entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenreMap {
    entries: Vec<(String, GenreId)>,
}

impl GenreMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a display name; re-inserting a name updates its id in place.
    pub fn insert(&mut self, name: &str, id: GenreId) {
        let key = normalize(name);
        if key.is_empty() {
            return;
        }

        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = id,
            None => self.entries.push((key, id)),
        }
    }

    /// Look up an already-normalized name
    pub fn get(&self, normalized: &str) -> Option<GenreId> {
        self.entries
            .iter()
            .find(|(name, _)| name == normalized)
            .map(|(_, id)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, GenreId)> {
        self.entries.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Match a free-text genre phrase against this map.
    ///
    /// Returns `None` for an empty phrase or when no tier produces a hit.
    pub fn best_match(&self, free_text: &str) -> Option<GenreId> {
        let wanted = normalize(free_text);
        if wanted.is_empty() {
            return None;
        }

        // 1) exact
        if let Some(id) = self.get(&wanted) {
            return Some(id);
        }

        // 2) containment, either direction
        if let Some((_, id)) = self
            .iter()
            .find(|(name, _)| name.contains(wanted.as_str()) || wanted.contains(name))
        {
            return Some(id);
        }

        // 3) science fiction; TV catalogs merge it into "Science-Fiction & Fantastique"
        if looks_like_scifi(&wanted) {
            let scifi = self
                .iter()
                .find(|(name, _)| name.contains("science fiction"))
                .or_else(|| self.iter().find(|(name, _)| name.contains("fantastique")));
            if let Some((_, id)) = scifi {
                return Some(id);
            }
        }

        // 4) word overlap
        let wanted_words: HashSet<&str> = wanted.split(' ').collect();
        let mut best: Option<(usize, GenreId)> = None;
        for (name, id) in self.iter() {
            let shared = name
                .split(' ')
                .collect::<HashSet<_>>()
                .intersection(&wanted_words)
                .count();
            if shared > best.map_or(0, |(score, _)| score) {
                best = Some((shared, id));
            }
        }

        best.map(|(_, id)| id)
    }
}

impl<S: AsRef<str>> FromIterator<(S, GenreId)> for GenreMap {
    fn from_iter<I: IntoIterator<Item = (S, GenreId)>>(iter: I) -> Self {
        let mut map = GenreMap::new();
        for (name, id) in iter {
            map.insert(name.as_ref(), id);
        }
        map
    }
}

/// Parse the genre filter control of a discovery page.
///
/// Entries whose `data-value` is missing or not an integer are skipped.
pub fn parse_genre_filter(html: &str) -> Result<GenreMap> {
    let document = Html::parse_document(html);
    let list_selector = selector("ul#with_genres")?;
    let entry_selector = selector("li[data-value]")?;
    let link_selector = selector("a")?;

    let mut map = GenreMap::new();
    let Some(list) = document.select(&list_selector).next() else {
        return Ok(map);
    };

    for entry in list.select(&entry_selector) {
        let Some(id) = entry
            .value()
            .attr("data-value")
            .and_then(|raw| raw.trim().parse::<GenreId>().ok())
        else {
            continue;
        };

        let name = match entry.select(&link_selector).next() {
            Some(link) => text_content(&link),
            None => text_content(&entry),
        };
        if !name.is_empty() {
            map.insert(&name, id);
        }
    }

    Ok(map)
}

// =============================================================================
// GenreResolver
// =============================================================================

struct CachedGenres {
    map: Arc<GenreMap>,
    fetched_at: Instant,
}

/// Resolves genre phrases, scraping each content type's genre list once.
///
/// The cache is shared state but needs no coordination: two concurrent first
/// lookups may both scrape, and the last one to finish wins.
pub struct GenreResolver {
    pages: Arc<dyn PageSource>,
    base_url: Url,
    cache: DashMap<ContentType, CachedGenres>,
    /// Entries older than this are scraped again (`None`: never)
    ttl: Option<Duration>,
}

impl GenreResolver {
    pub fn new(pages: Arc<dyn PageSource>, base_url: Url) -> Self {
        Self {
            pages,
            base_url,
            cache: DashMap::new(),
            ttl: None,
        }
    }

    /// Configure a time-to-live for cached genre lists (default: forever)
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Seed the cache, e.g. with a list scraped earlier
    pub fn preload(&self, content_type: ContentType, map: GenreMap) {
        self.cache.insert(
            content_type,
            CachedGenres {
                map: Arc::new(map),
                fetched_at: Instant::now(),
            },
        );
    }

    /// URL of the page whose filter control lists the genres
    pub fn genre_page_url(&self, content_type: ContentType) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("/discover/{}", content_type.path_segment()))?;
        url.query_pairs_mut().append_pair("language", "fr-FR");
        Ok(url)
    }

    /// Genre list for a content type, scraping it on first use
    pub async fn genres(&self, content_type: ContentType) -> Result<Arc<GenreMap>> {
        let cached = self
            .cache
            .get(&content_type)
            .filter(|entry| self.is_fresh(entry.fetched_at))
            .map(|entry| entry.map.clone());
        if let Some(map) = cached {
            return Ok(map);
        }

        let url = self.genre_page_url(content_type)?;
        let html = self.pages.fetch(url.as_str()).await?;
        let map = parse_genre_filter(&html)?;

        if map.is_empty() {
            return Err(CatalogError::NoGenres {
                content_type: content_type.to_string(),
            });
        }

        info!("Scraped {} {} genres", map.len(), content_type);
        let map = Arc::new(map);
        self.cache.insert(
            content_type,
            CachedGenres {
                map: map.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(map)
    }

    /// Resolve a free-text genre phrase to an id.
    ///
    /// An empty phrase resolves to `None` without touching the network.
    pub async fn resolve(&self, content_type: ContentType, free_text: &str) -> Result<Option<GenreId>> {
        if normalize(free_text).is_empty() {
            return Ok(None);
        }

        let map = self.genres(content_type).await?;
        let resolved = map.best_match(free_text);
        debug!("Resolved genre {:?} for {} to {:?}", free_text, content_type, resolved);
        Ok(resolved)
    }

    fn is_fresh(&self, fetched_at: Instant) -> bool {
        self.ttl.is_none_or(|ttl| fetched_at.elapsed() < ttl)
    }
}
