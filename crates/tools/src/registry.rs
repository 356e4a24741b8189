//! The ToolRegistry: invoke-by-name with a uniform envelope.
//!
//! ## Algorithm
//! 1. Look the name up; unknown → `UNKNOWN_TOOL`
//! 2. Run the erased call behind a panic boundary
//! 3. Map the outcome onto the envelope:
//!    - `Ok(value)` → success
//!    - `ToolError::InvalidArgs` → `INVALID_ARGS`
//!    - any other error, or a panic → `TOOL_FAILED`

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::envelope::{ErrorCode, ToolOutcome};
use crate::traits::{ErasedTool, Tool};

/// Listing entry for one tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub description: String,
    pub input_schema: Value,
}

/// Tools keyed by name.
///
/// ## Usage
/// ```ignore
/// let registry = ToolRegistry::new()
///     .register(SearchTitles::new(scrapers.discovery.clone()))
///     .register(TitleDetails::new(scrapers.details.clone()));
///
/// let outcome = registry.execute("search_titles", args).await;
/// ```
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn ErasedTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool (builder pattern). A tool with the same name is replaced.
    pub fn register(mut self, tool: impl Tool + 'static) -> Self {
        let tool: Arc<dyn ErasedTool> = Arc::new(tool);
        self.tools.insert(tool.name(), tool);
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.keys().copied().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Name → {description, input_schema} for every registered tool
    pub fn list(&self) -> BTreeMap<String, ToolSpec> {
        self.tools
            .iter()
            .map(|(name, tool)| {
                (
                    name.to_string(),
                    ToolSpec {
                        description: tool.description().to_string(),
                        input_schema: tool.input_schema(),
                    },
                )
            })
            .collect()
    }

    /// Run a tool by name. Never fails: every error lands in the envelope.
    pub async fn execute(&self, name: &str, args: Value) -> ToolOutcome {
        let Some(tool) = self.tools.get(name) else {
            warn!("Unknown tool requested: {}", name);
            return ToolOutcome::failure(ErrorCode::UnknownTool, name);
        };

        debug!("Executing tool {} with args {}", name, args);
        let start_time = Instant::now();

        let outcome = match AssertUnwindSafe(tool.call_json(args)).catch_unwind().await {
            Ok(Ok(value)) => ToolOutcome::success(value),
            Ok(Err(e)) => {
                warn!("Tool {} failed: {}", name, e);
                ToolOutcome::failure(e.code(), e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!("Tool {} panicked: {}", name, message);
                ToolOutcome::failure(ErrorCode::ToolFailed, message)
            }
        };

        info!(
            "Tool {} finished in {:.2?} ({})",
            name,
            start_time.elapsed(),
            outcome.error_code().map_or("ok", ErrorCode::as_str)
        );

        outcome
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "tool panicked".to_string()
    }
}
