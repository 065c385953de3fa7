//! Request forwarding to the destination.
//!
//! # Responsibilities
//! - Derive the destination and extra headers from the query string
//! - Rebuild the inbound request against the destination and send it
//! - Pass non-manifest responses through with CORS headers
//! - Hand manifest responses to the playlist rewriter
//!
//! # Design Decisions
//! - One outbound call per request, no retries
//! - The upstream has `timeouts.request_secs` to answer (and, for manifests,
//!   to finish the body); past that the client gets 504
//! - The proxy's own `x-request-id` stays local and is not sent upstream
//! - Passthrough response bodies stream; manifests and request bodies are buffered
//! - A missing upstream Content-Type means passthrough

use std::time::Duration;

use tokio::time::{timeout_at, Instant};

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, Request},
    response::Response,
};
use reqwest::redirect::Policy;

use crate::config::ProxyConfig;
use crate::http::cors::apply_cors;
use crate::http::request::X_REQUEST_ID;
use crate::http::response::end_to_end_headers;
use crate::proxy::destination::DestinationSpec;
use crate::proxy::error::ProxyError;
use crate::proxy::playlist::{PlaylistKind, PlaylistRewriter};
use crate::proxy::urls::ProxyOrigin;

/// How a forwarded response was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Passthrough,
    Playlist(PlaylistKind),
}

impl Delivery {
    pub fn label(self) -> &'static str {
        match self {
            Delivery::Passthrough => "passthrough",
            Delivery::Playlist(_) => "playlist",
        }
    }
}

/// Sends inbound requests on to their destination.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    endpoint: String,
    public_origin: Option<String>,
    user_agent: Option<HeaderValue>,
    max_request_body_bytes: usize,
    upstream_timeout: Duration,
}

impl Forwarder {
    /// Build the outbound client from configuration.
    pub fn new(config: &ProxyConfig) -> Result<Self, reqwest::Error> {
        let redirect = match config.upstream.max_redirects {
            0 => Policy::none(),
            n => Policy::limited(n),
        };

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.upstream.connect_timeout_secs))
            .redirect(redirect)
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            endpoint: config.proxy.endpoint.clone(),
            public_origin: config.proxy.public_origin.clone(),
            user_agent: config
                .upstream
                .user_agent
                .as_deref()
                .and_then(|ua| HeaderValue::from_str(ua).ok()),
            max_request_body_bytes: config.upstream.max_request_body_bytes,
            upstream_timeout: Duration::from_secs(config.timeouts.request_secs),
        })
    }

    /// Forward one request and produce the response for the client.
    pub async fn forward(
        &self,
        request: Request<Body>,
        request_id: &str,
    ) -> Result<(Delivery, Response), ProxyError> {
        let (parts, body) = request.into_parts();

        let spec = DestinationSpec::from_query(parts.uri.query())?;
        let origin = ProxyOrigin::resolve(self.public_origin.as_deref(), &parts.uri, &parts.headers);
        let headers = self.outbound_headers(&parts.method, &parts.headers, &spec);

        tracing::debug!(
            request_id = %request_id,
            method = %parts.method,
            destination_host = spec.url().host_str().unwrap_or_default(),
            extra_headers = spec.extra_headers().len(),
            "Forwarding request"
        );

        let mut outbound = self
            .client
            .request(parts.method.clone(), spec.url().clone())
            .headers(headers);
        if carries_body(&parts.method) {
            let bytes = axum::body::to_bytes(body, self.max_request_body_bytes)
                .await
                .map_err(ProxyError::RequestBody)?;
            outbound = outbound.body(bytes);
        }

        let deadline = Instant::now() + self.upstream_timeout;
        let upstream = timeout_at(deadline, outbound.send())
            .await
            .map_err(|_| ProxyError::UpstreamTimeout(self.upstream_timeout))?
            .map_err(ProxyError::UpstreamFetch)?;

        let content_type = upstream
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());

        match PlaylistKind::detect(content_type) {
            Some(kind) => {
                let rewriter = PlaylistRewriter::new(
                    &origin,
                    &self.endpoint,
                    spec.as_str(),
                    spec.extra_headers(),
                );
                let response = timeout_at(
                    deadline,
                    rewrite_playlist(upstream, kind, &rewriter, request_id),
                )
                .await
                .map_err(|_| ProxyError::UpstreamTimeout(self.upstream_timeout))??;
                Ok((Delivery::Playlist(kind), response))
            }
            None => Ok((Delivery::Passthrough, passthrough(upstream))),
        }
    }

    /// Inbound headers minus connection-scoped ones, with extra headers on top.
    fn outbound_headers(
        &self,
        method: &Method,
        inbound: &HeaderMap,
        spec: &DestinationSpec,
    ) -> HeaderMap {
        let mut headers = end_to_end_headers(inbound);
        // The client derives Host from the destination.
        headers.remove(header::HOST);
        headers.remove(X_REQUEST_ID);
        if !carries_body(method) {
            // The inbound body is not forwarded, so its framing must not be either.
            headers.remove(header::CONTENT_LENGTH);
        }
        // Manifests are rewritten as text, so bodies must arrive uncompressed.
        headers.remove(header::ACCEPT_ENCODING);
        // Cookie is copied unchanged with the rest of the inbound headers.
        spec.extra_headers().apply(&mut headers);

        if let Some(user_agent) = &self.user_agent {
            if !headers.contains_key(header::USER_AGENT) {
                headers.insert(header::USER_AGENT, user_agent.clone());
            }
        }
        headers
    }
}

/// GET and HEAD are sent without a body.
fn carries_body(method: &Method) -> bool {
    method != Method::GET && method != Method::HEAD
}

/// Stream the upstream response back unchanged apart from CORS headers.
fn passthrough(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    // Set-Cookie values are carried over with the other headers.
    let headers = end_to_end_headers(upstream.headers());

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    apply_cors(response.headers_mut());
    response
}

/// Buffer a manifest, rewrite it and build a fresh response around it.
async fn rewrite_playlist(
    upstream: reqwest::Response,
    kind: PlaylistKind,
    rewriter: &PlaylistRewriter,
    request_id: &str,
) -> Result<Response, ProxyError> {
    let set_cookies: Vec<HeaderValue> = upstream
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .cloned()
        .collect();

    let body = upstream.bytes().await.map_err(ProxyError::UpstreamBody)?;
    let playlist = rewriter.rewrite_bytes(&body);

    tracing::debug!(
        request_id = %request_id,
        content_type = kind.content_type(),
        rewritten_lines = playlist.rewritten_lines,
        "Rewrote playlist"
    );
    crate::observability::metrics::record_playlist_rewrite(playlist.rewritten_lines);

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, kind.content_type())
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(header::VARY, "Origin");
    for cookie in set_cookies {
        builder = builder.header(header::SET_COOKIE, cookie);
    }

    Ok(builder.body(Body::from(playlist.text))?)
}
