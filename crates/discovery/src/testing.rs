//! In-memory `PageSource` for tests.
//!
//! Enabled inside this crate's tests and for downstream crates through the
//! `test-util` feature.

use std::sync::Mutex;

use async_trait::async_trait;
use catalog::{CatalogError, Result};
use url::Url;

use crate::fetcher::PageSource;

type Responder = dyn Fn(&Url) -> Option<String> + Send + Sync;

/// Serves pages from a closure and records every URL requested.
///
/// A `None` from the closure is reported as an HTTP 404.
pub struct StaticPages {
    responder: Box<Responder>,
    requests: Mutex<Vec<String>>,
}

impl StaticPages {
    pub fn from_fn(responder: impl Fn(&Url) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// URLs fetched so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

/// Value of the `page` query parameter, if any
pub fn page_number(url: &Url) -> Option<u32> {
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

/// Value of an arbitrary query parameter, if any
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

#[async_trait]
impl PageSource for StaticPages {
    async fn fetch(&self, url: &str) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }

        let parsed = Url::parse(url)?;
        (self.responder)(&parsed).ok_or_else(|| CatalogError::HttpStatus {
            url: url.to_string(),
            status: 404,
        })
    }
}
