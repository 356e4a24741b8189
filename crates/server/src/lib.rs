//! Server crate for the CineAgent conversational recommender.
//!
//! This crate contains the dialog orchestrator and everything a turn needs:
//! sessions, preference extraction, intent routing, answer drafting, and the
//! configuration that wires them to the live scrapers and the chat service.

pub mod compose;
pub mod config;
pub mod orchestrator;
pub mod phrases;
pub mod preferences;
pub mod prompts;
pub mod router;
pub mod session;

use std::sync::Arc;

use anyhow::{Context, Result};
use discovery::Scrapers;
use llm_client::OllamaClient;
use tools::{ToolRegistry, default_registry};
use tracing::info;

pub use compose::{Composer, Drafted};
pub use config::AgentConfig;
pub use orchestrator::{ChatResponse, DialogOrchestrator};
pub use phrases::{FixedPhrase, PhraseProvider, RandomPhrases};
pub use router::{Intent, IntentRouter, RouteDecision, RouteFailure, RouteResult};
pub use session::{InMemorySessions, Session, SessionHandle, SessionRepository};

/// Fully wired agent
#[derive(Clone)]
pub struct Agent {
    pub orchestrator: Arc<DialogOrchestrator>,
    pub sessions: Arc<InMemorySessions>,
    pub tools: Arc<ToolRegistry>,
    pub llm: Arc<OllamaClient>,
    pub scrapers: Scrapers,
}

/// Build every component from `config`: one rate-limited fetcher shared by
/// all scrapers, the tool registry, the Ollama client and the orchestrator.
pub fn build_agent(config: &AgentConfig) -> Result<Agent> {
    let scrapers = Scrapers::build(&config.scraper_config())
        .context("Failed to build catalog scrapers")?;
    let tools = Arc::new(default_registry(&scrapers));

    let llm = Arc::new(
        OllamaClient::new(&config.ollama_url, &config.ollama_model, config.chat_timeout)
            .context("Failed to build chat client")?,
    );
    let sessions = Arc::new(InMemorySessions::new());

    let orchestrator = Arc::new(DialogOrchestrator::new(
        sessions.clone(),
        tools.clone(),
        llm.clone(),
        Arc::new(RandomPhrases),
    ));

    info!(
        "Agent ready (model {} at {}, catalog {})",
        config.ollama_model, config.ollama_url, config.catalog_base_url
    );

    Ok(Agent {
        orchestrator,
        sessions,
        tools,
        llm,
        scrapers,
    })
}
