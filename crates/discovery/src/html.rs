//! Small helpers over the `scraper` crate shared by the extractors.

use catalog::{CatalogError, Result};
use scraper::{ElementRef, Selector};

/// Compile a CSS selector, mapping failures into the crate error
pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| CatalogError::Selector {
        selector: css.to_string(),
        reason: format!("{e:?}"),
    })
}

/// All text below an element, trimmed
pub(crate) fn text_content(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text below an element with text nodes joined by single spaces
pub(crate) fn spaced_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trimmed text, or `None` when the element is absent or blank
pub(crate) fn optional_text(element: Option<ElementRef<'_>>) -> Option<String> {
    element.map(|e| text_content(&e)).filter(|s| !s.is_empty())
}
