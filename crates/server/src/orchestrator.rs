//! # Dialog Orchestrator
//!
//! Runs one conversational turn:
//! 1. Lock the session for the whole turn
//! 2. Update genre preferences from the message
//! 3. Route the message (LLM, with a safe default)
//! 4. Backfill type/period for recommendations, resolve the detail index
//! 5. Dispatch to the recommend, details or other branch
//! 6. Record every tool call in the session log and draft the answer
//!
//! Upstream faults never surface as errors: each failure path resolves to a
//! fixed French message.

use std::sync::{Arc, LazyLock};
use std::time::Instant;

use catalog::{ContentType, DetailRecord, Period, SearchResult};
use llm_client::ChatService;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tools::{
    SearchTitles, SearchTitlesArgs, TitleDetails, TitleDetailsArgs, Tool, ToolCallRecord,
    ToolOutcome, ToolRegistry,
};
use tracing::{debug, info, instrument, warn};

use crate::compose::Composer;
use crate::phrases::PhraseProvider;
use crate::preferences::{fold_message, skips_genre, update_preferences};
use crate::router::{Intent, IntentRouter, RouteResult};
use crate::session::{Awaiting, Session, SessionRepository, Stage};

/// Number of search results shown to the user
pub const DISPLAY_LIMIT: usize = 10;

/// Page budget of a conversational search
pub const RECOMMEND_MAX_PAGES: u32 = 60;

const YEAR_RANGE: std::ops::RangeInclusive<i64> = 1900..=2100;

const DETAIL_TRIGGERS: [&str; 5] = ["détails", "details", "synopsis", "resume", "résume"];

static BARE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([0-9]+)\b").expect("number pattern is valid"));

// ===== Fixed replies =====

pub const SCRAPING_APOLOGY: &str = "Je n’ai pas réussi à récupérer des données live (scraping).";
pub const NO_RECENT_LIST: &str = "Je n’ai pas de liste récente. Demande-moi une recommandation d’abord 🙂";
pub const MISSING_URL: &str = "Je n’ai pas l’URL de cet élément. Relance une recommandation.";
pub const DETAILS_FAILED: &str = "Impossible de récupérer les détails (scraping).";
pub const CLARIFYING_PROMPT: &str =
    "Dis-moi ce que tu as envie de regarder (film ou série), et si tu veux plutôt récent ou populaire 🙂";

/// Reply to one message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    /// Tool calls made during this turn
    pub tool_calls: Vec<ToolCallRecord>,
    pub sources: Vec<String>,
}

impl ChatResponse {
    fn reply(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            tool_calls: Vec::new(),
            sources: Vec::new(),
        }
    }
}

// ===== Turn helpers =====

/// Content type and period for a recommendation when the router left them unset
pub fn backfill(route: &RouteResult, lowered: &str) -> (ContentType, Period) {
    let content_type = route.content_type.unwrap_or(
        if lowered.contains("série") || lowered.contains("serie") {
            ContentType::Series
        } else {
            ContentType::Movie
        },
    );
    let period = route.period.unwrap_or(
        if lowered.contains("récent") || lowered.contains("recent") {
            Period::Recent
        } else {
            Period::Popular
        },
    );
    (content_type, period)
}

/// Final intent and 1-based index.
///
/// A bare number together with a details keyword forces the details intent.
pub fn resolve_index(lowered: &str, intent: Intent, routed_index: Option<i64>) -> (Intent, usize) {
    let explicit = BARE_NUMBER
        .captures(lowered)
        // only ASCII digits are captured, so parsing fails on overflow alone
        .map(|caps| caps[1].parse::<i64>().unwrap_or(i64::MAX));
    let triggered = DETAIL_TRIGGERS.iter().any(|word| lowered.contains(word));

    let (intent, index) = match explicit {
        Some(number) if triggered => (Intent::Details, number),
        _ => (intent, routed_index.unwrap_or(1)),
    };

    (intent, usize::try_from(index.max(1)).unwrap_or(usize::MAX))
}

/// Router year, dropped when outside the accepted range
fn valid_year(year: Option<i64>) -> Option<i32> {
    year.filter(|y| YEAR_RANGE.contains(y))
        .and_then(|y| i32::try_from(y).ok())
}

fn record_call(
    session: &mut Session,
    turn_calls: &mut Vec<ToolCallRecord>,
    tool: &str,
    args: Value,
    outcome: ToolOutcome,
) {
    let record = ToolCallRecord {
        tool: tool.to_string(),
        args,
        outcome,
    };
    session.tool_calls.push(record.clone());
    turn_calls.push(record);
}

// ===== Orchestrator =====

/// Top-level dialog state machine
#[derive(Clone)]
pub struct DialogOrchestrator {
    sessions: Arc<dyn SessionRepository>,
    tools: Arc<ToolRegistry>,
    router: IntentRouter,
    composer: Composer,
}

impl DialogOrchestrator {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        tools: Arc<ToolRegistry>,
        chat: Arc<dyn ChatService>,
        phrases: Arc<dyn PhraseProvider>,
    ) -> Self {
        Self {
            sessions,
            tools,
            router: IntentRouter::new(chat.clone()),
            composer: Composer::new(chat, phrases),
        }
    }

    pub fn sessions(&self) -> &Arc<dyn SessionRepository> {
        &self.sessions
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Handle one user message for `session_id`.
    #[instrument(skip(self, message))]
    pub async fn handle_message(&self, session_id: &str, message: &str) -> ChatResponse {
        let start_time = Instant::now();

        let handle = self.sessions.get(session_id);
        let mut session = handle.lock().await;

        let message = message.trim();
        let lowered = fold_message(message);

        update_preferences(&mut session.prefs, message);
        if skips_genre(message) {
            session.dialog_state.genre_skipped = true;
        }

        let route = self.router.route(&session.prefs, message).await.into_route();
        let (intent, index) = resolve_index(&lowered, route.intent, route.index);
        info!("Session {} turn routed to {:?} (index {})", session_id, intent, index);

        let response = match intent {
            Intent::Recommend => self.recommend(&mut session, message, &lowered, &route).await,
            Intent::Details => self.details(&mut session, message, index).await,
            Intent::Other => Self::clarify(&mut session),
        };

        info!(
            "Session {} turn finished in {:.2?} ({} tool calls, {} sources)",
            session_id,
            start_time.elapsed(),
            response.tool_calls.len(),
            response.sources.len()
        );

        response
    }

    async fn recommend(
        &self,
        session: &mut Session,
        message: &str,
        lowered: &str,
        route: &RouteResult,
    ) -> ChatResponse {
        let (content_type, period) = backfill(route, lowered);
        let genre = route.genre.clone().unwrap_or_default();

        let args = SearchTitlesArgs {
            genre: Some(genre.clone()),
            year_min: valid_year(route.year_min),
            year_max: valid_year(route.year_max),
            limit: None,
            max_pages: Some(RECOMMEND_MAX_PAGES),
            ..SearchTitlesArgs::new(content_type, period)
        };

        let args_json = serde_json::to_value(&args).unwrap_or_default();
        let outcome = self.tools.execute(SearchTitles::NAME, args_json.clone()).await;
        let result = outcome.decode::<SearchResult>();

        let mut tool_calls = Vec::new();
        record_call(session, &mut tool_calls, SearchTitles::NAME, args_json, outcome);

        let Some(result) = result else {
            return ChatResponse {
                tool_calls,
                ..ChatResponse::reply(SCRAPING_APOLOGY)
            };
        };

        // a failed search leaves the dialog where it was
        session.slots.content_type = Some(content_type);
        session.slots.period = Some(period);
        session.slots.genre = (!genre.is_empty()).then_some(genre);
        session.slots.year_min = args.year_min;
        session.slots.year_max = args.year_max;
        session.dialog_state.stage = Stage::Recommending;
        session.dialog_state.awaiting = Awaiting::None;

        let shown = &result.items[..result.items.len().min(DISPLAY_LIMIT)];
        let sources = shown.iter().filter_map(|item| item.url.clone()).collect();
        debug!("Showing {} of {} items", shown.len(), result.items.len());

        let drafted = self.composer.recommendation(&session.prefs, message, shown).await;
        info!("Recommendation answer drafted by {}", drafted.tag());

        ChatResponse {
            answer: drafted.into_text(),
            tool_calls,
            sources,
        }
    }

    async fn details(
        &self,
        session: &mut Session,
        message: &str,
        index: usize,
    ) -> ChatResponse {
        session.dialog_state.stage = Stage::Detailing;

        let Some(items) = session.latest_search_items() else {
            return ChatResponse::reply(NO_RECENT_LIST);
        };

        let position = index.saturating_sub(1).min(items.len() - 1);
        let Some(url) = items[position].url.clone() else {
            warn!("Item {} has no url", position + 1);
            return ChatResponse::reply(MISSING_URL);
        };
        session.last_index = position + 1;

        let args_json = serde_json::to_value(TitleDetailsArgs { url: url.clone() }).unwrap_or_default();
        let outcome = self.tools.execute(TitleDetails::NAME, args_json.clone()).await;
        let details = outcome.decode::<DetailRecord>();

        let mut tool_calls = Vec::new();
        record_call(session, &mut tool_calls, TitleDetails::NAME, args_json, outcome);

        let Some(details) = details else {
            return ChatResponse {
                tool_calls,
                sources: vec![url],
                ..ChatResponse::reply(DETAILS_FAILED)
            };
        };

        let drafted = self.composer.details(message, &details).await;
        info!("Details answer drafted by {}", drafted.tag());

        ChatResponse {
            answer: drafted.into_text(),
            tool_calls,
            sources: vec![url],
        }
    }

    fn clarify(session: &mut Session) -> ChatResponse {
        let state = &mut session.dialog_state;
        state.stage = Stage::Collecting;
        state.awaiting = if session.slots.content_type.is_none() {
            Awaiting::Type
        } else if session.slots.period.is_none() {
            Awaiting::Period
        } else {
            Awaiting::None
        };

        ChatResponse::reply(CLARIFYING_PROMPT)
    }
}
