//! Agent configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use discovery::ScraperConfig;
use dotenvy::dotenv;

/// Runtime settings for the agent
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub ollama_url: String,
    pub ollama_model: String,
    pub catalog_base_url: String,
    /// Minimum spacing between two catalog fetches
    pub fetch_interval: Duration,
    pub fetch_timeout: Duration,
    pub chat_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            ollama_url: llm_client::DEFAULT_BASE_URL.to_string(),
            ollama_model: llm_client::DEFAULT_MODEL.to_string(),
            catalog_base_url: discovery::DEFAULT_BASE_URL.to_string(),
            fetch_interval: Duration::from_millis(1000),
            fetch_timeout: Duration::from_secs(10),
            chat_timeout: Duration::from_secs(60),
        }
    }
}

impl AgentConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key lookup, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            ollama_url: lookup("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            ollama_model: lookup("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
            catalog_base_url: lookup("CATALOG_BASE_URL").unwrap_or(defaults.catalog_base_url),
            fetch_interval: match lookup("FETCH_INTERVAL_MS") {
                Some(raw) => Duration::from_millis(
                    raw.trim()
                        .parse()
                        .context("FETCH_INTERVAL_MS must be a whole number of milliseconds")?,
                ),
                None => defaults.fetch_interval,
            },
            fetch_timeout: match lookup("FETCH_TIMEOUT_SECS") {
                Some(raw) => Duration::from_secs(
                    raw.trim()
                        .parse()
                        .context("FETCH_TIMEOUT_SECS must be a whole number of seconds")?,
                ),
                None => defaults.fetch_timeout,
            },
            chat_timeout: match lookup("CHAT_TIMEOUT_SECS") {
                Some(raw) => Duration::from_secs(
                    raw.trim()
                        .parse()
                        .context("CHAT_TIMEOUT_SECS must be a whole number of seconds")?,
                ),
                None => defaults.chat_timeout,
            },
        })
    }

    /// Settings for the scraping stack
    pub fn scraper_config(&self) -> ScraperConfig {
        ScraperConfig {
            base_url: self.catalog_base_url.clone(),
            min_interval: self.fetch_interval,
            fetch_timeout: self.fetch_timeout,
            genre_ttl: None,
        }
    }
}
