//! Error taxonomy for the Instana MCP server
//!
//! Three layers:
//! - `ConfigError`: startup validation failures, fatal by design
//! - `ApiError`: failures of a single Instana REST call
//! - `ServerError`: per-request errors surfaced through the protocol
//!
//! Per-request errors never terminate the server process; they are mapped
//! into JSON-RPC error envelopes at the transport boundary.

use rmcp::model::{ErrorCode, ErrorData};
use thiserror::Error;

/// Startup configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Instana credentials are required for stdio mode but not provided. \
         Please set INSTANA_API_TOKEN and INSTANA_BASE_URL environment variables."
    )]
    MissingCredentials,
}

/// Errors from a single Instana REST API call
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Connection failures and timeouts are worth retrying; everything
    /// else (auth failures, bad requests, malformed bodies) is not.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Connection(_) | ApiError::Timeout(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err.to_string())
        } else if err.is_connect() {
            ApiError::Connection(err.to_string())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ApiError::Connection(err.to_string())
        }
    }
}

/// Per-request errors flowing through the middleware chain
#[derive(Error, Debug)]
pub enum ServerError {
    /// Token bucket exhausted; returned immediately, never retried
    #[error("rate limit exceeded, please slow down")]
    RateLimited,

    /// A tool invocation failed inside the Instana API call.
    /// The message carries both the tool name and the generated-client
    /// operation that failed so hosts can report meaningful errors.
    #[error("Error calling tool {tool}: Instana API call [{operation}] error: {source}")]
    Tool {
        tool: &'static str,
        operation: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("unknown prompt: {0}")]
    UnknownPrompt(String),
}

/// JSON-RPC error code for rate-limit rejections, distinct from the
/// standard codes so hosts can tell them apart from tool failures.
pub const RATE_LIMIT_ERROR_CODE: i32 = -32029;

impl ServerError {
    /// Whether the retry middleware should re-attempt the operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, ServerError::Tool { source, .. } if source.is_transient())
    }
}

impl From<ServerError> for ErrorData {
    fn from(err: ServerError) -> Self {
        match &err {
            ServerError::RateLimited => {
                ErrorData::new(ErrorCode(RATE_LIMIT_ERROR_CODE), err.to_string(), None)
            }
            ServerError::InvalidParams(_)
            | ServerError::UnknownTool(_)
            | ServerError::UnknownPrompt(_) => ErrorData::invalid_params(err.to_string(), None),
            ServerError::Tool { .. } => ErrorData::internal_error(err.to_string(), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_message_carries_tool_and_operation() {
        let err = ServerError::Tool {
            tool: "list_top_applications_by_performance",
            operation: "get_application_data_metrics_v2",
            source: ApiError::Status {
                status: 401,
                message: "unauthorized".to_string(),
            },
        };

        let message = err.to_string();
        assert!(message.contains("list_top_applications_by_performance"));
        assert!(message.contains("get_application_data_metrics_v2"));
        assert!(message.contains("unauthorized"));
    }

    #[test]
    fn test_transient_classification() {
        let transient = ServerError::Tool {
            tool: "get_events",
            operation: "get_events",
            source: ApiError::Timeout("deadline exceeded".to_string()),
        };
        assert!(transient.is_transient());

        let permanent = ServerError::Tool {
            tool: "get_events",
            operation: "get_events",
            source: ApiError::Status {
                status: 500,
                message: "boom".to_string(),
            },
        };
        assert!(!permanent.is_transient());
        assert!(!ServerError::RateLimited.is_transient());
    }
}
