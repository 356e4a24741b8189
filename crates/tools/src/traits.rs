//! Core traits for tools.
//!
//! `Tool` is what an implementor writes: typed arguments with a derived JSON
//! schema, typed output, optional validation. `ErasedTool` is what the
//! registry stores; every `Tool` gets it through a blanket impl that handles
//! the JSON boundary.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, ToolError};

/// A named operation with typed, schema-described arguments.
///
/// ## Design Note
/// - `Send + Sync` so one instance can serve concurrent sessions
/// - `validate` runs after deserialization and before `call`; range checks
///   that the schema advertises belong there
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry key
    const NAME: &'static str;

    type Args: DeserializeOwned + JsonSchema + Send;
    type Output: Serialize + Send;

    fn description(&self) -> &str;

    /// Reject arguments that deserialized but are out of range
    fn validate(&self, _args: &Self::Args) -> Result<()> {
        Ok(())
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output>;
}

/// JSON schema of a tool's argument type
pub fn input_schema<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema).unwrap_or_default()
}

/// Type-erased tool for storing heterogeneous tools in one registry.
#[async_trait]
pub trait ErasedTool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &str;

    fn input_schema(&self) -> Value;

    /// Deserialize, validate, call, serialize
    async fn call_json(&self, args: Value) -> Result<Value>;
}

#[async_trait]
impl<T: Tool> ErasedTool for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn description(&self) -> &str {
        Tool::description(self)
    }

    fn input_schema(&self) -> Value {
        input_schema::<T::Args>()
    }

    async fn call_json(&self, args: Value) -> Result<Value> {
        let args: T::Args =
            serde_json::from_value(args).map_err(|e| ToolError::invalid_args(e.to_string()))?;

        self.validate(&args)?;

        let output = self.call(args).await?;

        serde_json::to_value(output).map_err(|e| ToolError::Output(e.to_string()))
    }
}
