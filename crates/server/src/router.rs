//! LLM intent routing.
//!
//! The model is asked for a strict JSON object. Models drift: they wrap the
//! object in prose or code fences, rename keys, quote numbers. Parsing is
//! therefore lenient field by field, and anything that still fails becomes a
//! tagged `Fallback` instead of an error.

use std::fmt;
use std::sync::Arc;

use catalog::{ContentType, Period};
use llm_client::{ChatMessage, ChatService};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::prompts::{ROUTER_SYSTEM, router_user_content};
use crate::session::Preferences;

/// Routing is deterministic
const ROUTER_TEMPERATURE: f32 = 0.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Recommend,
    Details,
    #[default]
    Other,
}

/// What the router understood from one message
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteResult {
    pub intent: Intent,
    #[serde(rename = "type")]
    pub content_type: Option<ContentType>,
    pub period: Option<Period>,
    pub genre: Option<String>,
    pub year_min: Option<i64>,
    pub year_max: Option<i64>,
    pub index: Option<i64>,
    pub title: Option<String>,
}

/// Why the router fell back to the default route
#[derive(Debug, Clone, PartialEq)]
pub enum RouteFailure {
    /// The chat service could not be reached or answered with an error
    Transport(String),
    /// The reply contained no `{...}` block
    NoJson,
    /// The `{...}` block was not a JSON object
    Parse(String),
}

impl fmt::Display for RouteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteFailure::Transport(reason) => write!(f, "chat service unavailable: {reason}"),
            RouteFailure::NoJson => write!(f, "no JSON object in router reply"),
            RouteFailure::Parse(reason) => write!(f, "router reply is not valid JSON: {reason}"),
        }
    }
}

/// Outcome of one routing attempt
#[derive(Debug, Clone, PartialEq)]
pub enum RouteDecision {
    Parsed(RouteResult),
    Fallback(RouteFailure),
}

impl RouteDecision {
    /// The route to act on: parsed as-is, or the safe default (intent other, no fields)
    pub fn into_route(self) -> RouteResult {
        match self {
            RouteDecision::Parsed(route) => route,
            RouteDecision::Fallback(_) => RouteResult::default(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, RouteDecision::Fallback(_))
    }
}

// ===== Parsing =====

/// Widest `{...}` substring: first `{` to last `}`
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Raw reply shape; every field is taken as untyped JSON and converted leniently
#[derive(Deserialize)]
struct RawRoute {
    #[serde(default)]
    intent: Value,
    #[serde(default, rename = "type")]
    content_type: Value,
    #[serde(default)]
    period: Value,
    #[serde(default)]
    genre: Value,
    #[serde(default)]
    year_min: Value,
    #[serde(default)]
    year_max: Value,
    #[serde(default)]
    year_from: Value,
    #[serde(default)]
    year_to: Value,
    #[serde(default)]
    index: Value,
    #[serde(default)]
    title: Value,
}

fn text_field(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn int_field(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn intent_field(value: &Value) -> Intent {
    match value.as_str().map(|s| s.trim().to_lowercase()).as_deref() {
        Some("recommend") => Intent::Recommend,
        Some("details") => Intent::Details,
        _ => Intent::Other,
    }
}

impl From<RawRoute> for RouteResult {
    fn from(raw: RawRoute) -> Self {
        RouteResult {
            intent: intent_field(&raw.intent),
            content_type: raw.content_type.as_str().and_then(|s| s.parse().ok()),
            period: raw.period.as_str().and_then(|s| s.parse().ok()),
            genre: text_field(&raw.genre),
            year_min: int_field(&raw.year_min).or_else(|| int_field(&raw.year_from)),
            year_max: int_field(&raw.year_max).or_else(|| int_field(&raw.year_to)),
            index: int_field(&raw.index),
            title: text_field(&raw.title),
        }
    }
}

/// Interpret a router reply
pub fn parse_route(reply: &str) -> RouteDecision {
    let Some(object) = extract_json_object(reply) else {
        return RouteDecision::Fallback(RouteFailure::NoJson);
    };

    match serde_json::from_str::<RawRoute>(object) {
        Ok(raw) => RouteDecision::Parsed(raw.into()),
        Err(e) => RouteDecision::Fallback(RouteFailure::Parse(e.to_string())),
    }
}

// ===== Router =====

/// Asks the chat service what the user wants
#[derive(Clone)]
pub struct IntentRouter {
    chat: Arc<dyn ChatService>,
}

impl IntentRouter {
    pub fn new(chat: Arc<dyn ChatService>) -> Self {
        Self { chat }
    }

    /// Route one message. Never fails; see `RouteDecision::into_route`.
    pub async fn route(&self, prefs: &Preferences, message: &str) -> RouteDecision {
        let messages = [
            ChatMessage::system(ROUTER_SYSTEM),
            ChatMessage::user(router_user_content(prefs, message)),
        ];

        let decision = match self.chat.chat(&messages, ROUTER_TEMPERATURE).await {
            Ok(reply) => parse_route(&reply),
            Err(e) => RouteDecision::Fallback(RouteFailure::Transport(e.to_string())),
        };

        match &decision {
            RouteDecision::Parsed(route) => debug!("Routed message: {:?}", route),
            RouteDecision::Fallback(reason) => warn!("Router fell back to default route: {}", reason),
        }

        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(reply: &str) -> RouteResult {
        match parse_route(reply) {
            RouteDecision::Parsed(route) => route,
            RouteDecision::Fallback(reason) => panic!("unexpected fallback: {reason}"),
        }
    }

    #[test]
    fn test_extract_widest_object() {
        let reply = "Voici:\n```json\n{\"intent\": \"other\", \"x\": {\"y\": 1}}\n```";
        assert_eq!(
            extract_json_object(reply),
            Some("{\"intent\": \"other\", \"x\": {\"y\": 1}}")
        );
        assert_eq!(extract_json_object("} puis {"), None);
        assert_eq!(extract_json_object("rien"), None);
    }

    #[test]
    fn test_full_reply() {
        let route = parsed(
            r#"{"intent": "recommend", "type": "movie", "period": "recent", "genre": "science-fiction",
                "year_from": 2024, "year_to": 2026, "index": null, "title": null}"#,
        );

        assert_eq!(route.intent, Intent::Recommend);
        assert_eq!(route.content_type, Some(ContentType::Movie));
        assert_eq!(route.period, Some(Period::Recent));
        assert_eq!(route.genre.as_deref(), Some("science-fiction"));
        assert_eq!(route.year_min, Some(2024));
        assert_eq!(route.year_max, Some(2026));
        assert_eq!(route.index, None);
    }

    #[test]
    fn test_lenient_fields() {
        let route = parsed(
            r#"Bien sûr ! {"intent": "DETAILS", "type": "documentary", "period": "ancien",
                "genre": "  ", "year_min": "2020", "index": "3", "title": "Fallout"}"#,
        );

        assert_eq!(route.intent, Intent::Details);
        assert_eq!(route.content_type, None);
        assert_eq!(route.period, None);
        assert_eq!(route.genre, None);
        assert_eq!(route.year_min, Some(2020));
        assert_eq!(route.index, Some(3));
        assert_eq!(route.title.as_deref(), Some("Fallout"));
    }

    #[test]
    fn test_unknown_intent_is_other() {
        assert_eq!(parsed(r#"{"intent": "chitchat"}"#).intent, Intent::Other);
        assert_eq!(parsed("{}"), RouteResult::default());
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(parse_route("je ne sais pas"), RouteDecision::Fallback(RouteFailure::NoJson));
        assert!(matches!(
            parse_route("{intent: recommend}"),
            RouteDecision::Fallback(RouteFailure::Parse(_))
        ));
    }

    #[test]
    fn test_into_route_defaults_on_fallback() {
        let route = RouteDecision::Fallback(RouteFailure::Transport("refused".into())).into_route();
        assert_eq!(route, RouteResult::default());
        assert_eq!(route.intent, Intent::Other);
    }
}
