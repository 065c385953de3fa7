//! Destination and extra-header extraction from the inbound query string.
//!
//! `?destination=<url>&<name>=<value>...` is split into the upstream URL and
//! an ordered set of headers to force onto the outbound request. Every
//! parameter other than `destination` is a header; a repeated name keeps its
//! first position and its last value.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use indexmap::IndexMap;
use url::Url;

use crate::proxy::error::ProxyError;
use crate::proxy::urls::encode_component;

/// Query parameter naming the upstream URL.
pub const DESTINATION_PARAM: &str = "destination";

/// A header supplied through the query string.
#[derive(Debug, Clone)]
struct ExtraHeader {
    name: HeaderName,
    value: HeaderValue,
    raw_value: String,
}

/// Ordered headers supplied through the query string, built once per request.
#[derive(Debug, Clone, Default)]
pub struct ExtraHeaders {
    entries: IndexMap<String, ExtraHeader>,
}

impl ExtraHeaders {
    /// Add a header, replacing the value of an earlier parameter with the same key.
    pub fn insert(&mut self, key: &str, value: &str) -> Result<(), ProxyError> {
        let invalid = || ProxyError::InvalidExtraHeader {
            name: key.to_string(),
        };
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| invalid())?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;

        self.entries.insert(
            key.to_string(),
            ExtraHeader {
                name,
                value: header_value,
                raw_value: value.to_string(),
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key/value pairs exactly as they appeared in the query string.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, header)| (key.as_str(), header.raw_value.as_str()))
    }

    /// Overwrite same-named headers in `headers` with these values.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for header in self.entries.values() {
            headers.insert(header.name.clone(), header.value.clone());
        }
    }

    /// Serialize as `&key=value` pairs, values percent-encoded.
    pub fn query_suffix(&self) -> String {
        self.iter()
            .map(|(key, value)| format!("&{}={}", key, encode_component(value)))
            .collect()
    }
}

/// Where to send the request, and what to add to it.
#[derive(Debug, Clone)]
pub struct DestinationSpec {
    raw: String,
    url: Url,
    extra_headers: ExtraHeaders,
}

impl DestinationSpec {
    /// Parse the inbound query string (without the leading `?`).
    pub fn from_query(query: Option<&str>) -> Result<Self, ProxyError> {
        let mut destination = None;
        let mut extra_headers = ExtraHeaders::default();

        for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            if key == DESTINATION_PARAM {
                // First occurrence wins, matching URLSearchParams::get.
                if destination.is_none() {
                    destination = Some(value.into_owned());
                }
            } else {
                extra_headers.insert(&key, &value)?;
            }
        }

        let raw = destination
            .filter(|d| !d.is_empty())
            .ok_or(ProxyError::MissingDestination)?;
        let url = Url::parse(&raw).map_err(|e| ProxyError::InvalidDestination(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProxyError::InvalidDestination(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        Ok(Self {
            raw,
            url,
            extra_headers,
        })
    }

    /// The destination exactly as the client sent it.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn extra_headers(&self) -> &ExtraHeaders {
        &self.extra_headers
    }
}
