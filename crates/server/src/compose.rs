//! Answer drafting: LLM first, deterministic template on any failure.

use std::sync::Arc;

use catalog::{DetailRecord, Item};
use llm_client::{ChatMessage, ChatService};
use tracing::warn;

use crate::phrases::PhraseProvider;
use crate::prompts::{ANSWER_SYSTEM, details_request, recommendation_request};
use crate::session::Preferences;

const ANSWER_TEMPERATURE: f32 = 0.2;

const NOT_AVAILABLE: &str = "N/A";

/// A drafted answer and where its text came from
#[derive(Debug, Clone, PartialEq)]
pub enum Drafted {
    /// Written by the model
    Llm(String),
    /// Template text used because the model call failed
    Fallback { text: String, reason: String },
}

impl Drafted {
    pub fn text(&self) -> &str {
        match self {
            Drafted::Llm(text) | Drafted::Fallback { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Drafted::Llm(text) | Drafted::Fallback { text, .. } => text,
        }
    }

    /// Short label for logs
    pub fn tag(&self) -> &'static str {
        match self {
            Drafted::Llm(_) => "llm",
            Drafted::Fallback { .. } => "fallback",
        }
    }
}

/// Numbered list with one follow-up line
pub fn recommendation_template(items: &[Item], follow_up: &str) -> String {
    let mut lines = Vec::with_capacity(items.len() + 2);
    lines.push("Voilà ce que j’ai trouvé :".to_string());

    for (position, item) in items.iter().enumerate() {
        let year = item
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let rating = item
            .rating
            .map(|r| r.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        lines.push(format!("{}. {} ({}) — note: {}", position + 1, item.title, year, rating));
    }

    lines.push(follow_up.to_string());
    lines.join("\n")
}

/// Bulleted details card
pub fn details_template(details: &DetailRecord) -> String {
    let genres = if details.genres.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        details.genres.join(", ")
    };

    format!(
        "**{}**\n- Genres: {}\n- Durée: {}\n- Synopsis: {}\n\nTu veux que je te propose autre chose ?",
        details.title,
        genres,
        details.runtime.as_deref().unwrap_or(NOT_AVAILABLE),
        details.summary.as_deref().unwrap_or(NOT_AVAILABLE),
    )
}

/// Drafts user-facing answers from tool results
#[derive(Clone)]
pub struct Composer {
    chat: Arc<dyn ChatService>,
    phrases: Arc<dyn PhraseProvider>,
}

impl Composer {
    pub fn new(chat: Arc<dyn ChatService>, phrases: Arc<dyn PhraseProvider>) -> Self {
        Self { chat, phrases }
    }

    async fn draft(&self, request: String, fallback: impl FnOnce() -> String) -> Drafted {
        let messages = [ChatMessage::system(ANSWER_SYSTEM), ChatMessage::user(request)];

        let reason = match self.chat.chat(&messages, ANSWER_TEMPERATURE).await {
            Ok(text) if !text.trim().is_empty() => return Drafted::Llm(text.trim().to_string()),
            Ok(_) => "empty reply".to_string(),
            Err(e) => e.to_string(),
        };

        warn!("Answer drafting fell back to template: {}", reason);
        Drafted::Fallback {
            text: fallback(),
            reason,
        }
    }

    /// Present a list of suggestions
    pub async fn recommendation(&self, prefs: &Preferences, message: &str, items: &[Item]) -> Drafted {
        let follow_up = self.phrases.follow_up();
        let request = recommendation_request(prefs, message, items, &follow_up);
        self.draft(request, || recommendation_template(items, &follow_up))
            .await
    }

    /// Present one title
    pub async fn details(&self, message: &str, details: &DetailRecord) -> Drafted {
        self.draft(details_request(message, details), || details_template(details))
            .await
    }
}
