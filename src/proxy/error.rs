//! Errors raised while proxying a single request.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// Failure of one request cycle. Every variant surfaces to the client as an
/// HTTP response; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The `destination` query parameter is absent or empty.
    #[error("missing destination query parameter")]
    MissingDestination,

    /// The destination is not an absolute http(s) URL.
    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    /// A query parameter cannot be expressed as a request header.
    #[error("query parameter '{name}' cannot be sent as a request header")]
    InvalidExtraHeader { name: String },

    /// The inbound body could not be read or exceeds the configured limit.
    #[error("failed to read request body: {0}")]
    RequestBody(#[source] axum::Error),

    /// The destination could not be reached.
    #[error("upstream request failed: {0}")]
    UpstreamFetch(#[source] reqwest::Error),

    /// The destination did not answer in time.
    #[error("upstream did not answer within {0:?}")]
    UpstreamTimeout(std::time::Duration),

    /// The upstream body could not be read in full.
    #[error("failed to read upstream body: {0}")]
    UpstreamBody(#[source] reqwest::Error),

    /// The outgoing response could not be assembled.
    #[error("failed to build response: {0}")]
    ResponseBuild(#[from] axum::http::Error),
}

impl ProxyError {
    /// Status code reported to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingDestination
            | ProxyError::InvalidDestination(_)
            | ProxyError::InvalidExtraHeader { .. }
            | ProxyError::RequestBody(_) => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamFetch(_) | ProxyError::UpstreamBody(_) => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::ResponseBuild(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        if self.status().is_client_error() {
            "rejected"
        } else {
            "error"
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.to_string()).into_response();
        // Browsers must be able to read the failure cross-origin.
        response.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        response
    }
}
