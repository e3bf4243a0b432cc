//! Error types for the Taco Bell MCP Server
//!
//! This module defines the error hierarchy for all operations in the server.

use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Maximum number of characters of an upstream body kept in error messages
pub const SNIPPET_LIMIT: usize = 200;

/// Main error type for the Taco Bell MCP Server
#[derive(Error, Debug)]
pub enum TacoBellMcpError {
    /// Upstream transport or status errors
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Upstream body could not be understood
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// The caller cancelled the in-flight call
    #[error("Request cancelled: {reason}")]
    Cancelled { reason: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors talking to the upstream web services
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {message}")]
    Connection { url: String, message: String },

    #[error("API request failed with status {status}: {snippet}")]
    Status { status: u16, snippet: String },
}

impl UpstreamError {
    /// HTTP status returned by the upstream, if the request got that far
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());

        if err.is_timeout() {
            UpstreamError::Timeout { url }
        } else if let Some(status) = err.status() {
            UpstreamError::Status {
                status: status.as_u16(),
                snippet: err.to_string(),
            }
        } else {
            UpstreamError::Connection {
                url,
                message: err.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for TacoBellMcpError {
    fn from(err: reqwest::Error) -> Self {
        TacoBellMcpError::Upstream(UpstreamError::from(err))
    }
}

/// Upstream answered, but with something we cannot use
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("response is not valid JSON ({message}): {snippet}")]
    InvalidJson { message: String, snippet: String },

    #[error("unexpected response shape: {message}")]
    UnexpectedShape { message: String },
}

impl ParseError {
    pub fn shape(message: impl Into<String>) -> Self {
        ParseError::UnexpectedShape {
            message: message.into(),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {message}")]
    InvalidEnvVar { var: String, message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to build HTTP client: {message}")]
    HttpClient { message: String },
}

/// Validation errors
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid parameter: {name} - {message}")]
    InvalidParameter { name: String, message: String },

    #[error("{message}")]
    Unsupported { message: String },
}

impl ValidationError {
    pub fn missing(field: impl Into<String>) -> Self {
        ValidationError::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid(name: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<ValidationErrors> for ValidationError {
    /// Report the first failing field, in field-name order, descending into nested structs
    fn from(errors: ValidationErrors) -> Self {
        first_failure(&errors)
            .map(|(name, message)| ValidationError::InvalidParameter { name, message })
            .unwrap_or_else(|| ValidationError::invalid("arguments", errors.to_string()))
    }
}

impl From<ValidationErrors> for TacoBellMcpError {
    fn from(errors: ValidationErrors) -> Self {
        TacoBellMcpError::Validation(errors.into())
    }
}

fn first_failure(errors: &ValidationErrors) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let found = match kind {
            ValidationErrorsKind::Field(failures) => failures.first().map(|failure| {
                let message = failure
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| failure.code.to_string());
                (field.to_string(), message)
            }),
            ValidationErrorsKind::Struct(inner) => first_failure(inner),
            ValidationErrorsKind::List(items) => items.values().find_map(|inner| first_failure(inner)),
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },
}

/// Result type alias for Taco Bell MCP operations
pub type Result<T> = std::result::Result<T, TacoBellMcpError>;

/// Cut an upstream body down to something that fits in an error message
pub fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= SNIPPET_LIMIT {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(SNIPPET_LIMIT).collect();
    cut.push('…');
    cut
}
