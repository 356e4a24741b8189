//! Simple test harness for the dialog orchestrator.
//!
//! This binary plays a short scripted conversation end to end: a
//! recommendation request, then a details request on the second result.
//! It needs network access to the catalog site and, for drafted answers, a
//! running Ollama; without Ollama the template answers are shown.

use anyhow::Result;
use tracing::info;

use server::{AgentConfig, SessionRepository, build_agent};

const SCRIPT: [&str; 2] = ["je veux un film récent de science-fiction", "détails 2"];

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("info,server=debug,discovery=debug,tools=debug")
                }),
        )
        .init();

    info!("Starting CineAgent orchestrator test harness");

    let config = AgentConfig::from_env()?;
    let agent = build_agent(&config)?;

    if agent.llm.warm_up().await.is_err() {
        info!("Chat service unavailable, answers will use templates");
    }

    let session_id = agent.sessions.create();
    info!("Session {}", session_id);

    for message in SCRIPT {
        info!(">>> {}", message);
        let response = agent.orchestrator.handle_message(&session_id, message).await;

        info!("<<< {}", response.answer);
        for call in &response.tool_calls {
            let status = call
                .outcome
                .error
                .as_ref()
                .map_or_else(|| "ok".to_string(), |e| e.code.to_string());
            info!("    tool {} [{}] args {}", call.tool, status, call.args);
        }
        for source in &response.sources {
            info!("    source {}", source);
        }
    }

    Ok(())
}
