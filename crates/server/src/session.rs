//! Per-conversation state and the repository that owns it.
//!
//! A session exists as soon as it is referenced: looking up an unknown id
//! creates it. Each session sits behind its own async mutex, and a turn holds
//! that lock from start to finish, so two messages for the same session are
//! handled one after the other while different sessions never contend.

use std::sync::Arc;

use catalog::{ContentType, Item, Period, SearchResult};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tools::{SearchTitles, Tool, ToolCallRecord};
use tracing::debug;
use uuid::Uuid;

// ===== Preferences =====

/// Insertion-ordered set of strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderedSet(Vec<String>);

impl OrderedSet {
    /// Add `value` unless already present. Returns whether it was added.
    pub fn insert(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.contains(&value) {
            return false;
        }
        self.0.push(value);
        true
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|existing| existing == value)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Genre preferences gathered from the conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub likes: OrderedSet,
    pub dislikes: OrderedSet,
    pub fav_genres: OrderedSet,
}

// ===== Dialog state =====

/// What the user asked for so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slots {
    #[serde(rename = "type")]
    pub content_type: Option<ContentType>,
    pub period: Option<Period>,
    pub genre: Option<String>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Collecting,
    Recommending,
    Detailing,
}

/// Slot the agent is waiting for the user to fill
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Awaiting {
    #[default]
    None,
    Type,
    Period,
    Genre,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogState {
    pub stage: Stage,
    pub awaiting: Awaiting,
    /// The user said any genre will do
    pub genre_skipped: bool,
}

// ===== Session =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub slots: Slots,
    pub prefs: Preferences,
    pub dialog_state: DialogState,
    /// Every tool invocation of the conversation, oldest first
    pub tool_calls: Vec<ToolCallRecord>,
    /// Last detail index shown, 1-based
    pub last_index: usize,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            slots: Slots::default(),
            prefs: Preferences::default(),
            dialog_state: DialogState::default(),
            tool_calls: Vec::new(),
            last_index: 1,
        }
    }

    /// Items of the most recent successful `search_titles` call.
    ///
    /// Failed searches are skipped; an empty list counts as no list.
    pub fn latest_search_items(&self) -> Option<Vec<Item>> {
        self.tool_calls
            .iter()
            .rev()
            .filter(|call| call.tool == SearchTitles::NAME && call.outcome.is_success())
            .find_map(|call| call.outcome.decode::<SearchResult>())
            .map(|result| result.items)
            .filter(|items| !items.is_empty())
    }
}

/// Shared, lockable session
pub type SessionHandle = Arc<Mutex<Session>>;

// ===== Repository =====

/// Owner of every live session.
pub trait SessionRepository: Send + Sync {
    /// Start a fresh session and return its id
    fn create(&self) -> String;

    /// Handle for `session_id`, creating a default session if unknown
    fn get(&self, session_id: &str) -> SessionHandle;
}

/// Process-local session store
#[derive(Default)]
pub struct InMemorySessions {
    sessions: DashMap<String, SessionHandle>,
}

impl InMemorySessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionRepository for InMemorySessions {
    fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions
            .insert(id.clone(), Arc::new(Mutex::new(Session::new(id.clone()))));
        debug!("Created session {}", id);
        id
    }

    fn get(&self, session_id: &str) -> SessionHandle {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!("Session {} referenced for the first time", session_id);
                Arc::new(Mutex::new(Session::new(session_id)))
            })
            .clone()
    }
}
