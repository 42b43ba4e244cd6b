//! Error types for the relay.
//!
//! Every failure on the request path is a [`RelayError`]. It carries a stable
//! machine-readable code, the HTTP status the frontend sees, and renders
//! itself as an [`ErrorBody`] through axum's `IntoResponse`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::translate::frontend_types::ErrorBody;

/// Why an upstream call failed once a request was attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamFailure {
    /// The gateway answered with a non-2xx status.
    Http { status: u16, body: String },
    /// DNS, connect, timeout or body-read failure.
    Transport { message: String },
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RelayError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unexpected upstream response: {message}")]
    UpstreamShape { message: String },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("{}", describe_upstream(.0))]
    Upstream(UpstreamFailure),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

fn describe_upstream(failure: &UpstreamFailure) -> String {
    match failure {
        UpstreamFailure::Http { status, body } => {
            format!("upstream_status: {status}, body: {body}")
        }
        UpstreamFailure::Transport { message } => format!("Upstream unreachable: {message}"),
    }
}

impl RelayError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn upstream_shape(msg: impl Into<String>) -> Self {
        Self::UpstreamShape {
            message: msg.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    pub fn upstream_http(status: u16, body: impl Into<String>) -> Self {
        Self::Upstream(UpstreamFailure::Http {
            status,
            body: body.into(),
        })
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Upstream(UpstreamFailure::Transport {
            message: msg.into(),
        })
    }

    /// Stable error code exposed in the `error` field of failure bodies.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::Config { .. } | Self::Io(_) | Self::Toml(_) => "config_error",
            Self::UpstreamShape { .. } => "upstream_shape_error",
            Self::Parse { .. } => "parse_error",
            Self::Upstream(UpstreamFailure::Http { .. }) => "upstream_http_error",
            Self::Upstream(UpstreamFailure::Transport { .. }) => "transport_error",
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Config { .. } | Self::Io(_) | Self::Toml(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamShape { .. } | Self::Parse { .. } | Self::Upstream(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    /// Status code returned by the gateway, when the failure came from one.
    #[must_use]
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Upstream(UpstreamFailure::Http { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// Human-readable detail, without the variant prefix used by `Display`.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Validation { message }
            | Self::Config { message }
            | Self::UpstreamShape { message }
            | Self::Parse { message } => message.clone(),
            Self::Upstream(failure) => describe_upstream(failure),
            Self::Io(e) => e.to_string(),
            Self::Toml(e) => e.to_string(),
        }
    }

    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.code().to_string(),
            detail: Some(self.detail()),
            upstream_status: self.upstream_status(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.to_body())).into_response()
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
