use std::io::Write;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use catalog::{ContentType, DetailRecord, Period, SearchResult};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use server::{Agent, AgentConfig, ChatResponse, SessionRepository, build_agent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tools::{SearchTitles, SearchTitlesArgs, TitleDetails, TitleDetailsArgs, Tool, ToolOutcome};
use tracing::debug;

/// CineAgent - conversational movie and series recommendations
#[derive(Parser)]
#[command(name = "cine-agent")]
#[command(about = "Conversational movie/series recommender backed by live catalog scraping", long_about = None)]
struct Cli {
    /// Ollama base URL
    #[arg(long, global = true, env = "OLLAMA_URL")]
    ollama_url: Option<String>,

    /// Model used for routing and drafting
    #[arg(long, global = true, env = "OLLAMA_MODEL")]
    model: Option<String>,

    /// Base URL of the catalog site
    #[arg(long, global = true, env = "CATALOG_BASE_URL")]
    catalog_url: Option<String>,

    /// Minimum delay between two catalog fetches, in milliseconds
    #[arg(long, global = true, env = "FETCH_INTERVAL_MS")]
    fetch_interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent interactively
    Chat {
        /// Resume (or name) a session instead of starting a new one
        #[arg(long)]
        session_id: Option<String>,
    },

    /// Create a session and print its id
    NewSession,

    /// List the available tools and their input schemas
    Tools,

    /// Execute a tool with JSON arguments
    Exec {
        /// Tool name, e.g. search_titles
        tool: String,

        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        args: String,
    },

    /// Search the catalog directly
    Search {
        /// movie or series
        #[arg(long = "type")]
        content_type: ContentType,

        /// popular or recent
        #[arg(long)]
        period: Period,

        /// Free-text genre ("sf", "comédie"...)
        #[arg(long)]
        genre: Option<String>,

        #[arg(long)]
        year_min: Option<i32>,

        #[arg(long)]
        year_max: Option<i32>,

        /// Stop after this many results
        #[arg(long, default_value = "20")]
        limit: u64,

        /// Page budget
        #[arg(long, default_value = "3")]
        max_pages: u32,
    },

    /// Show the details of one title page
    Details {
        /// Absolute URL of the title page
        url: String,
    },

    /// Check that the chat service is up and list its models
    Health,
}

impl Cli {
    /// Environment configuration with command-line overrides applied
    fn config(&self) -> Result<AgentConfig> {
        let mut config = AgentConfig::from_env()?;

        if let Some(url) = &self.ollama_url {
            config.ollama_url = url.clone();
        }
        if let Some(model) = &self.model {
            config.ollama_model = model.clone();
        }
        if let Some(url) = &self.catalog_url {
            config.catalog_base_url = url.clone();
        }
        if let Some(ms) = self.fetch_interval_ms {
            config.fetch_interval = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config()?;
    debug!("Configuration: {:?}", config);

    let agent = build_agent(&config).context("Failed to initialise the agent")?;

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Chat { session_id } => handle_chat(&agent, session_id).await?,
        Commands::NewSession => handle_new_session(&agent)?,
        Commands::Tools => handle_tools(&agent)?,
        Commands::Exec { tool, args } => handle_exec(&agent, &tool, &args).await?,
        Commands::Search {
            content_type,
            period,
            genre,
            year_min,
            year_max,
            limit,
            max_pages,
        } => {
            let args = SearchTitlesArgs {
                genre,
                year_min,
                year_max,
                limit: Some(limit),
                max_pages: Some(max_pages),
                ..SearchTitlesArgs::new(content_type, period)
            };
            handle_search(&agent, args).await?
        }
        Commands::Details { url } => handle_details(&agent, url).await?,
        Commands::Health => handle_health(&agent).await?,
    }

    Ok(())
}

/// Handle the 'chat' command
async fn handle_chat(agent: &Agent, session_id: Option<String>) -> Result<()> {
    print!("Préparation du modèle {}... ", agent.llm.model());
    std::io::stdout().flush()?;
    match agent.llm.warm_up().await {
        Ok(()) => println!("{}", "✓".green()),
        Err(e) => println!("{} ({})", "indisponible".yellow(), e),
    }

    let session_id = session_id.unwrap_or_else(|| agent.sessions.create());
    println!("Session {}", session_id.dimmed());
    println!("{}", "Tape 'quit' pour sortir.".dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "vous>".bold().cyan());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message, "quit" | "exit") {
            break;
        }

        let start = Instant::now();
        let response = agent.orchestrator.handle_message(&session_id, message).await;
        print_chat_response(&response, start.elapsed());
    }

    Ok(())
}

/// Handle the 'new-session' command
fn handle_new_session(agent: &Agent) -> Result<()> {
    let session_id = agent.sessions.create();
    println!("{}", serde_json::to_string_pretty(&json!({ "session_id": session_id }))?);
    Ok(())
}

/// Handle the 'tools' command
fn handle_tools(agent: &Agent) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&agent.tools.list())?);
    Ok(())
}

/// Handle the 'exec' command
async fn handle_exec(agent: &Agent, tool: &str, args: &str) -> Result<()> {
    let args: Value = serde_json::from_str(args).context("Tool arguments must be valid JSON")?;
    let outcome = agent.tools.execute(tool, args).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

/// Handle the 'search' command
async fn handle_search(agent: &Agent, args: SearchTitlesArgs) -> Result<()> {
    let start = Instant::now();
    let outcome = agent
        .tools
        .execute(SearchTitles::NAME, serde_json::to_value(&args)?)
        .await;
    let result: SearchResult = decode(&outcome)?;

    println!(
        "{} {} results in {:.2?}",
        "✓".green(),
        result.items.len(),
        start.elapsed()
    );
    println!("{}", result.source.dimmed());
    if let Some(genre_id) = result.applied_filters.genre_id {
        println!("genre {:?} → id {}", result.applied_filters.genre_query, genre_id);
    }

    for (position, item) in result.items.iter().enumerate() {
        println!(
            "{}. {} ({}) - {}",
            (position + 1).to_string().green(),
            item.title.bold(),
            item.year.map_or_else(|| "????".to_string(), |y| y.to_string()),
            item.rating.map_or_else(|| "N/A".to_string(), |r| format!("{r:.0}%")),
        );
        if let Some(url) = &item.url {
            println!("   {}", url.dimmed());
        }
    }

    Ok(())
}

/// Handle the 'details' command
async fn handle_details(agent: &Agent, url: String) -> Result<()> {
    let args = serde_json::to_value(TitleDetailsArgs { url })?;
    let outcome = agent.tools.execute(TitleDetails::NAME, args).await;
    let details: DetailRecord = decode(&outcome)?;

    println!("{}", details.title.bold().blue());
    if !details.genres.is_empty() {
        println!("Genres: {}", details.genres.join(", "));
    }
    println!("Durée: {}", details.runtime.as_deref().unwrap_or("N/A"));
    println!();
    println!("{}", details.summary.as_deref().unwrap_or("N/A"));
    println!();
    println!("{}", details.source.dimmed());

    Ok(())
}

/// Handle the 'health' command
async fn handle_health(agent: &Agent) -> Result<()> {
    match agent.llm.health().await {
        Ok(models) => {
            println!("{} {} is up", "✓".green(), agent.llm.base_url());
            for model in models {
                let marker = if model == agent.llm.model() { "*" } else { " " };
                println!(" {} {}", marker, model);
            }
        }
        Err(e) => println!("{} {}: {}", "✗".red(), agent.llm.base_url(), e),
    }
    Ok(())
}

/// Successful tool result, or the envelope's error as an `anyhow` error
fn decode<T: DeserializeOwned>(outcome: &ToolOutcome) -> Result<T> {
    if let Some(error) = &outcome.error {
        return Err(anyhow!("{}: {}", error.code, error.message));
    }
    outcome
        .decode()
        .ok_or_else(|| anyhow!("Unexpected tool output shape"))
}

/// Helper function to format and print one agent reply
fn print_chat_response(response: &ChatResponse, elapsed: Duration) {
    println!("{} {}", "agent>".bold().magenta(), response.answer);

    for call in &response.tool_calls {
        let status = match &call.outcome.error {
            None => "ok".green(),
            Some(error) => error.code.to_string().red(),
        };
        println!("   {} {} [{}]", "↳".dimmed(), call.tool.dimmed(), status);
    }
    for source in &response.sources {
        println!("   {}", source.dimmed());
    }
    println!("   {}", format!("{:.2?}", elapsed).dimmed());
}
