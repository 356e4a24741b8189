//! End-to-end dialog tests.
//!
//! The real orchestrator, tool registry and scrapers run against an in-memory
//! catalog site and a scripted chat service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use discovery::testing::{StaticPages, page_number, query_param};
use discovery::{GenreResolver, Scrapers};
use llm_client::{ChatMessage, ChatService, LlmClientError, Role};
use serde_json::json;
use server::orchestrator::{
    CLARIFYING_PROMPT, DETAILS_FAILED, MISSING_URL, NO_RECENT_LIST, SCRAPING_APOLOGY,
};
use server::session::{Awaiting, Stage};
use server::{DialogOrchestrator, FixedPhrase, InMemorySessions, SessionRepository};
use tools::{ErrorCode, default_registry};
use url::Url;

const BASE: &str = "https://catalog.test";
const FOLLOW_UP: &str = "Laquelle te tente le plus ? Donne-moi le numéro ou le nom.";

// ===== In-memory catalog site =====

const GENRE_PAGE: &str = r#"
    <ul id="with_genres">
        <li data-value="28"><a>Action</a></li>
        <li data-value="14"><a>Fantastique</a></li>
        <li data-value="878"><a>Science-Fiction</a></li>
    </ul>
"#;

#[derive(Clone, Copy)]
struct Site {
    pages: u32,
    per_page: u32,
    /// Cards carry no link
    without_links: bool,
    /// Title pages answer 404
    broken_details: bool,
}

impl Site {
    fn new(pages: u32, per_page: u32) -> Self {
        Self {
            pages,
            per_page,
            without_links: false,
            broken_details: false,
        }
    }

    fn listing(&self, url: &Url) -> String {
        let page = page_number(url).unwrap_or(1);
        // a lower year bound empties the listing
        if page > self.pages || query_param(url, "primary_release_date.gte").is_some() {
            return "<html><body><p>Aucun résultat</p></body></html>".to_string();
        }

        let cards: String = (0..self.per_page)
            .map(|i| {
                let id = (page - 1) * self.per_page + i + 1;
                let link = if self.without_links {
                    format!("<a>Film {id}</a>")
                } else {
                    format!(r#"<a href="/movie/{id}">Film {id}</a>"#)
                };
                format!(
                    r#"<div class="card style_1">
                        <div class="user_score_chart" data-percent="70"></div>
                        <h2>{link}</h2>
                        <span class="release_date">3 févr. 2025</span>
                    </div>"#
                )
            })
            .collect();
        format!("<html><body>{cards}</body></html>")
    }

    fn title(&self, id: &str) -> Option<String> {
        if self.broken_details {
            return None;
        }
        Some(format!(
            r#"<h2><a href="/movie/{id}">Film {id}</a></h2>
               <span class="genres"><a>Science-Fiction</a></span>
               <span class="runtime">1h 50m</span>
               <div class="overview"><p>Synopsis du film {id}.</p></div>"#
        ))
    }

    fn serve(self) -> Arc<StaticPages> {
        Arc::new(StaticPages::from_fn(move |url| {
            let path = url.path();
            if let Some(id) = path.strip_prefix("/movie/") {
                return self.title(id);
            }
            if path.starts_with("/discover/") {
                return Some(match page_number(url) {
                    None => GENRE_PAGE.to_string(),
                    Some(_) => self.listing(url),
                });
            }
            None
        }))
    }
}

// ===== Scripted chat service =====

type RouteScript = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Answers router calls from a script and drafting calls with a fixed reply.
///
/// A `None` from the script, or a missing drafting reply, is a connection error.
struct ScriptedChat {
    route: RouteScript,
    answer: Option<String>,
    delay: Option<Duration>,
    user_contents: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedChat {
    fn new(route: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            route: Box::new(route),
            answer: None,
            delay: None,
            user_contents: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Router that always answers `reply`
    fn routing(reply: serde_json::Value) -> Self {
        let reply = reply.to_string();
        Self::new(move |_| Some(reply.clone()))
    }

    fn down() -> Self {
        Self::new(|_| None)
    }

    fn with_answer(mut self, answer: &str) -> Self {
        self.answer = Some(answer.to_string());
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn user_contents(&self) -> Vec<String> {
        self.user_contents.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatService for ScriptedChat {
    async fn chat(&self, messages: &[ChatMessage], _temperature: f32) -> Result<String, LlmClientError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let system = messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let user = messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.user_contents.lock().unwrap().push(user.clone());

        let reply = if system.contains("routeur") {
            let message = user.rsplit("Message: ").next().unwrap_or_default();
            (self.route)(message)
        } else {
            self.answer.clone()
        };

        reply.ok_or_else(|| LlmClientError::Connection("connection refused".to_string()))
    }
}

// ===== Harness =====

struct Harness {
    orchestrator: DialogOrchestrator,
    sessions: Arc<InMemorySessions>,
    pages: Arc<StaticPages>,
    chat: Arc<ScriptedChat>,
}

fn harness(site: Site, chat: ScriptedChat) -> Harness {
    let pages = site.serve();
    let base = Url::parse(BASE).unwrap();
    let resolver = GenreResolver::new(pages.clone(), base.clone());
    let scrapers = Scrapers::with_source(pages.clone(), base, resolver);
    let sessions = Arc::new(InMemorySessions::new());
    let chat = Arc::new(chat);

    let orchestrator = DialogOrchestrator::new(
        sessions.clone(),
        Arc::new(default_registry(&scrapers)),
        chat.clone(),
        Arc::new(FixedPhrase(FOLLOW_UP.to_string())),
    );

    Harness {
        orchestrator,
        sessions,
        pages,
        chat,
    }
}

fn recommend_scifi_route() -> serde_json::Value {
    json!({
        "intent": "recommend",
        "type": "movie",
        "period": "recent",
        "genre": "science-fiction",
        "year_from": null,
        "year_to": null,
        "index": null,
        "title": null
    })
}

/// Routes recommendation-looking messages, everything else to other
fn conversational_router() -> ScriptedChat {
    let recommend = recommend_scifi_route().to_string();
    ScriptedChat::new(move |message| {
        if message.contains("veux") {
            Some(recommend.clone())
        } else {
            Some(json!({"intent": "other"}).to_string())
        }
    })
}

// ===== Scenarios =====

#[tokio::test]
async fn test_recent_scifi_movie_recommendation() {
    let h = harness(Site::new(3, 20), conversational_router());

    let response = h
        .orchestrator
        .handle_message("s1", "je veux un film récent de science-fiction")
        .await;

    assert_eq!(response.tool_calls.len(), 1);
    let call = &response.tool_calls[0];
    assert_eq!(call.tool, "search_titles");
    assert_eq!(
        call.args,
        json!({
            "type": "movie",
            "period": "recent",
            "genre": "science-fiction",
            "year_min": null,
            "year_max": null,
            "limit": null,
            "max_pages": 60
        })
    );
    assert!(call.outcome.is_success());

    assert_eq!(response.sources.len(), 10);
    assert_eq!(response.sources[0], "https://catalog.test/movie/1");
    assert!(response.answer.starts_with("Voilà ce que j’ai trouvé :\n1. Film 1 (2025) — note: 70\n"));
    assert!(response.answer.contains("\n10. Film 10 (2025)"));
    assert!(!response.answer.contains("11. "));
    assert!(response.answer.ends_with(FOLLOW_UP));

    let requests = h.pages.requests();
    assert!(requests[0].contains("/discover/movie?language=fr-FR"));
    assert!(requests[1].contains("sort_by=primary_release_date.desc"));
    assert!(requests[1].contains("with_genres=878"));
    // three full pages, then the empty fourth stops the walk
    assert_eq!(requests.len(), 5);

    let session = h.sessions.get("s1");
    let session = session.lock().await;
    assert_eq!(session.tool_calls.len(), 1);
    assert_eq!(session.dialog_state.stage, Stage::Recommending);
    assert_eq!(session.slots.genre.as_deref(), Some("science-fiction"));
    assert_eq!(session.prefs.fav_genres.as_slice(), ["science-fiction"]);
}

#[tokio::test]
async fn test_details_by_number_after_recommendation() {
    let h = harness(Site::new(3, 20), conversational_router());

    h.orchestrator
        .handle_message("s1", "je veux un film récent de science-fiction")
        .await;
    let response = h.orchestrator.handle_message("s1", "détails 2").await;

    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].tool, "get_title_details");
    assert_eq!(response.tool_calls[0].args, json!({"url": "https://catalog.test/movie/2"}));
    assert_eq!(response.sources, vec!["https://catalog.test/movie/2"]);
    assert_eq!(
        response.answer,
        "**Film 2**\n- Genres: Science-Fiction\n- Durée: 1h 50m\n- Synopsis: Synopsis du film 2.\n\nTu veux que je te propose autre chose ?"
    );

    let session = h.sessions.get("s1");
    let session = session.lock().await;
    assert_eq!(session.tool_calls.len(), 2);
    assert_eq!(session.last_index, 2);
    assert_eq!(session.dialog_state.stage, Stage::Detailing);
}

#[tokio::test]
async fn test_details_index_is_clamped() {
    let h = harness(Site::new(1, 3), conversational_router());
    h.orchestrator.handle_message("s1", "je veux un film").await;

    let first = h.orchestrator.handle_message("s1", "détails 0").await;
    let last = h.orchestrator.handle_message("s1", "détails 4").await;
    let huge = h.orchestrator.handle_message("s1", "détails 99999999999999999999").await;

    assert_eq!(first.sources, vec!["https://catalog.test/movie/1"]);
    assert_eq!(last.sources, vec!["https://catalog.test/movie/3"]);
    assert_eq!(huge.sources, vec!["https://catalog.test/movie/3"]);
}

#[tokio::test]
async fn test_details_can_address_items_beyond_the_displayed_ten() {
    let h = harness(Site::new(2, 20), conversational_router());
    h.orchestrator.handle_message("s1", "je veux un film").await;

    let response = h.orchestrator.handle_message("s1", "synopsis du 15").await;

    assert_eq!(response.sources, vec!["https://catalog.test/movie/15"]);
}

#[tokio::test]
async fn test_empty_catalog_apologizes() {
    let h = harness(Site::new(0, 0), conversational_router());

    let response = h
        .orchestrator
        .handle_message("s1", "je veux un film récent de science-fiction")
        .await;

    assert_eq!(response.answer, SCRAPING_APOLOGY);
    assert!(response.sources.is_empty());
    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].outcome.error_code(), Some(ErrorCode::ToolFailed));

    // the failed attempt is logged, nothing else changes
    let session = h.sessions.get("s1");
    let session = session.lock().await;
    assert_eq!(session.tool_calls.len(), 1);
    assert_eq!(session.dialog_state.stage, Stage::Collecting);
    assert_eq!(session.slots.content_type, None);
}

#[tokio::test]
async fn test_chat_service_down_asks_for_preferences() {
    let h = harness(Site::new(1, 5), ScriptedChat::down());

    let response = h
        .orchestrator
        .handle_message("s1", "je veux un film récent de science-fiction")
        .await;

    assert_eq!(response.answer, CLARIFYING_PROMPT);
    assert!(response.tool_calls.is_empty());
    assert!(response.sources.is_empty());
    assert!(h.pages.requests().is_empty());

    let session = h.sessions.get("s1");
    let session = session.lock().await;
    assert_eq!(session.dialog_state.stage, Stage::Collecting);
    assert_eq!(session.dialog_state.awaiting, Awaiting::Type);
}

#[tokio::test]
async fn test_chat_service_down_still_serves_numbered_details() {
    let h = harness(Site::new(1, 5), ScriptedChat::down());

    // no list yet
    let response = h.orchestrator.handle_message("s1", "détails 2").await;

    assert_eq!(response.answer, NO_RECENT_LIST);
    assert!(response.tool_calls.is_empty());
}

#[tokio::test]
async fn test_item_without_url() {
    let site = Site {
        without_links: true,
        ..Site::new(1, 3)
    };
    let h = harness(site, conversational_router());
    h.orchestrator.handle_message("s1", "je veux un film").await;

    let response = h.orchestrator.handle_message("s1", "détails 1").await;

    assert_eq!(response.answer, MISSING_URL);
    assert!(response.tool_calls.is_empty());
    assert!(response.sources.is_empty());
}

#[tokio::test]
async fn test_detail_scrape_failure() {
    let site = Site {
        broken_details: true,
        ..Site::new(1, 3)
    };
    let h = harness(site, conversational_router());
    h.orchestrator.handle_message("s1", "je veux un film").await;

    let response = h.orchestrator.handle_message("s1", "détails 3").await;

    assert_eq!(response.answer, DETAILS_FAILED);
    assert_eq!(response.sources, vec!["https://catalog.test/movie/3"]);
    assert_eq!(response.tool_calls[0].outcome.error_code(), Some(ErrorCode::ToolFailed));
}

#[tokio::test]
async fn test_details_use_latest_successful_search() {
    let chat = ScriptedChat::new(|message| {
        let route = if message.contains("2024") {
            // the year bound makes the site return nothing
            json!({"intent": "recommend", "type": "movie", "period": "recent", "year_from": 2024})
        } else if message.contains("veux") {
            json!({"intent": "recommend", "type": "movie", "period": "popular"})
        } else {
            json!({"intent": "other"})
        };
        Some(route.to_string())
    });
    let h = harness(Site::new(1, 3), chat);

    h.orchestrator.handle_message("s1", "je veux un film").await;
    let failed = h.orchestrator.handle_message("s1", "je veux un film de 2024").await;
    let details = h.orchestrator.handle_message("s1", "détails 3").await;

    assert_eq!(failed.answer, SCRAPING_APOLOGY);
    assert_eq!(details.sources, vec!["https://catalog.test/movie/3"]);
}

#[tokio::test]
async fn test_out_of_range_router_years_are_dropped() {
    let chat = ScriptedChat::routing(json!({
        "intent": "recommend",
        "type": "series",
        "period": "popular",
        "genre": null,
        "year_min": 24,
        "year_max": "2025"
    }));
    let h = harness(Site::new(1, 2), chat);

    let response = h.orchestrator.handle_message("s1", "une série").await;

    let args = &response.tool_calls[0].args;
    assert_eq!(args["year_min"], json!(null));
    assert_eq!(args["year_max"], json!(2025));
    assert_eq!(args["genre"], json!(""));
    assert_eq!(response.tool_calls[0].outcome.error_code(), None);
}

#[tokio::test]
async fn test_drafted_answer_is_used_when_available() {
    let chat = ScriptedChat::routing(recommend_scifi_route()).with_answer("Voici ma sélection du moment !");
    let h = harness(Site::new(1, 4), chat);

    let response = h.orchestrator.handle_message("s1", "un film de SF récent").await;

    assert_eq!(response.answer, "Voici ma sélection du moment !");
    assert_eq!(response.sources.len(), 4);

    // router request, then drafting request carrying the follow-up line
    let contents = h.chat.user_contents();
    assert_eq!(contents.len(), 2);
    assert!(contents[0].starts_with("Préférences connues: "));
    assert!(contents[1].ends_with(&format!("Relance suggérée: {FOLLOW_UP}")));
}

#[tokio::test]
async fn test_router_sees_updated_preferences() {
    let h = harness(Site::new(1, 1), ScriptedChat::routing(json!({"intent": "other"})));

    h.orchestrator
        .handle_message("s1", "  je n'aime pas l'horreur  ")
        .await;

    let contents = h.chat.user_contents();
    assert_eq!(
        contents[0],
        "Préférences connues: {\"likes\":[],\"dislikes\":[\"horreur\"],\"fav_genres\":[\"horreur\"]}\n\nMessage: je n'aime pas l'horreur"
    );
}

#[tokio::test]
async fn test_genre_skip_is_remembered() {
    let h = harness(Site::new(1, 1), ScriptedChat::routing(json!({"intent": "other"})));

    h.orchestrator.handle_message("s1", "peu importe").await;

    let session = h.sessions.get("s1");
    assert!(session.lock().await.dialog_state.genre_skipped);
}

#[tokio::test]
async fn test_turns_of_one_session_are_serialized() {
    let chat = ScriptedChat::routing(json!({"intent": "other"})).with_delay(Duration::from_millis(30));
    let h = harness(Site::new(1, 1), chat);

    tokio::join!(
        h.orchestrator.handle_message("same", "bonjour"),
        h.orchestrator.handle_message("same", "salut"),
    );

    assert_eq!(h.chat.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_different_sessions_run_concurrently() {
    let chat = ScriptedChat::routing(json!({"intent": "other"})).with_delay(Duration::from_millis(30));
    let h = harness(Site::new(1, 1), chat);

    tokio::join!(
        h.orchestrator.handle_message("a", "bonjour"),
        h.orchestrator.handle_message("b", "salut"),
    );

    assert_eq!(h.chat.max_in_flight.load(Ordering::SeqCst), 2);
    assert_eq!(h.sessions.len(), 2);
}
