//! Dispatch façade: the single fault-isolation point between the agent host
//! and the tool handlers.
//!
//! `dispatch` never fails: unknown tools, invalid arguments, handler errors
//! and handler panics all come back as [`ToolResult::Failure`].

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use crate::tools::{ToolCatalog, ToolHandler};
use crate::types::{Error, ErrorKind};

/// A tool invocation as issued by the agent host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Call with an empty argument object.
    pub fn without_arguments(name: impl Into<String>) -> Self {
        Self::new(name, Value::Object(Map::new()))
    }
}

/// Structured failure reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for ToolError {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome of a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    Success { payload: Value },
    Failure { error: ToolError },
}

impl ToolResult {
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        ToolResult::Failure {
            error: ToolError {
                kind,
                message: message.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            ToolResult::Success { payload } => Some(payload),
            ToolResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ToolError> {
        match self {
            ToolResult::Success { .. } => None,
            ToolResult::Failure { error } => Some(error),
        }
    }

    /// Error kind, if this is a failure.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(|e| e.kind)
    }
}

impl From<Error> for ToolResult {
    fn from(err: Error) -> Self {
        ToolResult::Failure {
            error: ToolError::from(&err),
        }
    }
}

/// Routes tool calls to the handler after schema validation.
#[derive(Clone)]
pub struct Dispatcher {
    catalog: ToolCatalog,
    handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tools", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(handler: Arc<dyn ToolHandler>) -> Self {
        Self {
            catalog: ToolCatalog::new(),
            handler,
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Run a tool call to completion.
    pub async fn dispatch(&self, call: ToolCall) -> ToolResult {
        let span = tracing::info_span!("tool_call", tool = %call.name);
        self.dispatch_inner(call).instrument(span).await
    }

    async fn dispatch_inner(&self, call: ToolCall) -> ToolResult {
        let started = Instant::now();

        let Some(kind) = self.catalog.lookup(&call.name) else {
            tracing::warn!("unknown tool requested");
            return Error::schema(call.name).into();
        };

        let errors = self.catalog.validate_params(kind, &call.arguments);
        if !errors.is_empty() {
            tracing::warn!(errors = ?errors, "tool arguments rejected");
            return Error::validation(errors.join("; ")).into();
        }

        // Built inside the future so a panic while creating it is also caught.
        let arguments = call.arguments;
        let invocation =
            AssertUnwindSafe(async move { self.handler.invoke(kind, arguments).await })
                .catch_unwind();
        let result = match invocation.await {
            Ok(Ok(payload)) => ToolResult::Success { payload },
            Ok(Err(err)) => err.into(),
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(panic = %detail, "tool handler panicked");
                Error::internal(format!("tool handler panicked: {}", detail)).into()
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match result.error() {
            None => tracing::info!(elapsed_ms, "tool call succeeded"),
            Some(err) => tracing::warn!(
                elapsed_ms,
                kind = %err.kind,
                message = %err.message,
                "tool call failed"
            ),
        }
        result
    }
}
