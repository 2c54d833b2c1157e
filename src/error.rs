use http::StatusCode;
use std::fmt;
use thiserror::Error;

/// What went wrong while parsing a query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnknownOperator,
    UnknownField,
    UnterminatedQuote,
    EmptyValue,
    MissingField,
    MissingOperator,
    EmptyPropertyKey,
    MisplacedColon,
    EmptyClause,
    MixedLogicalOperators,
}

impl ParseErrorKind {
    /// Stable machine-readable code, used in error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            ParseErrorKind::UnknownOperator => "unknown_operator",
            ParseErrorKind::UnknownField => "unknown_field",
            ParseErrorKind::UnterminatedQuote => "unterminated_quote",
            ParseErrorKind::EmptyValue => "empty_value",
            ParseErrorKind::MissingField => "missing_field",
            ParseErrorKind::MissingOperator => "missing_operator",
            ParseErrorKind::EmptyPropertyKey => "empty_property_key",
            ParseErrorKind::MisplacedColon => "misplaced_colon",
            ParseErrorKind::EmptyClause => "empty_clause",
            ParseErrorKind::MixedLogicalOperators => "mixed_logical_operators",
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ParseErrorKind::UnknownOperator => "unknown operator",
            ParseErrorKind::UnknownField => "unknown field",
            ParseErrorKind::UnterminatedQuote => "unterminated quote",
            ParseErrorKind::EmptyValue => "empty value after operator",
            ParseErrorKind::MissingField => "missing field name before operator",
            ParseErrorKind::MissingOperator => "missing comparison operator",
            ParseErrorKind::EmptyPropertyKey => "empty property key",
            ParseErrorKind::MisplacedColon => "':' is only valid after Properties",
            ParseErrorKind::EmptyClause => "empty clause around AND/OR",
            ParseErrorKind::MixedLogicalOperators => {
                "AND and OR cannot be mixed in one query"
            }
        };
        f.write_str(text)
    }
}

/// A query the parser rejected, with the offending substring and its byte
/// offset in the original query string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at position {position}: '{token}'")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub token: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, token: impl Into<String>, position: usize) -> Self {
        ParseError {
            kind,
            token: token.into(),
            position,
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum ApiTrackError {
    #[error("Query parse error: {0}")]
    QueryParse(#[from] ParseError),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("Invalid deployment: {0}")]
    InvalidDeployment(String),

    #[error("API not found: {0}")]
    ApiNotFound(String),

    #[error("Deployment not found: {api}/{platform}/{environment}")]
    DeploymentNotFound {
        api: String,
        platform: String,
        environment: String,
    },

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ApiTrackError>;

impl From<std::io::Error> for ApiTrackError {
    fn from(e: std::io::Error) -> Self {
        ApiTrackError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for ApiTrackError {
    fn from(e: serde_json::Error) -> Self {
        ApiTrackError::Json(e.to_string())
    }
}

impl ApiTrackError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiTrackError::QueryParse(_) => StatusCode::BAD_REQUEST,
            ApiTrackError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ApiTrackError::InvalidPagination(_) => StatusCode::BAD_REQUEST,
            ApiTrackError::InvalidDeployment(_) => StatusCode::BAD_REQUEST,
            ApiTrackError::ApiNotFound(_) => StatusCode::NOT_FOUND,
            ApiTrackError::DeploymentNotFound { .. } => StatusCode::NOT_FOUND,
            ApiTrackError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiTrackError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiTrackError::Json(_) => StatusCode::BAD_REQUEST,
            ApiTrackError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Store failures are transient from the caller's point of view.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiTrackError::Store(_))
    }
}

// Axum IntoResponse implementation (feature-gated)
#[cfg(feature = "axum-support")]
use axum::response::{IntoResponse, Json, Response};
#[cfg(feature = "axum-support")]
use serde::Serialize;

#[cfg(feature = "axum-support")]
#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[cfg(feature = "axum-support")]
impl IntoResponse for ApiTrackError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error_code, message, suggestion) = match &self {
            ApiTrackError::QueryParse(e) => (
                e.kind.code().to_string(),
                e.to_string(),
                Some("Example: Platform = IP4 AND Environment = prd".to_string()),
            ),
            ApiTrackError::InvalidQuery(msg) => ("invalid_query".to_string(), msg.clone(), None),
            ApiTrackError::InvalidPagination(msg) => (
                "invalid_pagination".to_string(),
                msg.clone(),
                Some("page starts at 1; page_size must be within the configured maximum".to_string()),
            ),
            ApiTrackError::InvalidDeployment(msg) => {
                ("invalid_deployment".to_string(), msg.clone(), None)
            }
            ApiTrackError::ApiNotFound(name) => (
                "api_not_found".to_string(),
                format!("API '{}' does not exist", name),
                None,
            ),
            ApiTrackError::DeploymentNotFound {
                api,
                platform,
                environment,
            } => (
                "deployment_not_found".to_string(),
                format!(
                    "No deployment of '{}' on {}/{}",
                    api, platform, environment
                ),
                Some("Deploy it first with POST /api/deploy".to_string()),
            ),
            ApiTrackError::Store(e) => (
                "store_unavailable".to_string(),
                format!("Store error: {}", e),
                Some("Retry after a short delay".to_string()),
            ),
            ApiTrackError::Io(e) => ("io_error".to_string(), format!("IO error: {}", e), None),
            ApiTrackError::Json(e) => (
                "json_error".to_string(),
                format!("JSON error: {}", e),
                None,
            ),
            ApiTrackError::Config(e) => (
                "config_error".to_string(),
                format!("Configuration error: {}", e),
                None,
            ),
        };

        let (token, position) = match &self {
            ApiTrackError::QueryParse(e) => (Some(e.token.clone()), Some(e.position)),
            _ => (None, None),
        };

        let error_response = ErrorResponse {
            status: "error",
            error: error_code,
            message,
            token,
            position,
            request_id: format!("req_at_{}", uuid::Uuid::new_v4()),
            suggestion,
        };

        let mut response = (status, Json(error_response)).into_response();
        if self.is_retryable() {
            response
                .headers_mut()
                .insert(http::header::RETRY_AFTER, http::HeaderValue::from_static("5"));
        }
        response
    }
}
