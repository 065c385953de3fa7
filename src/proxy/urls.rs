//! URL helpers shared by the forwarder and the playlist rewriter.

use axum::http::{header, HeaderMap, Uri};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left alone by JavaScript's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a value for use inside a query parameter.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Scheme and authority this proxy is reachable at, e.g. `https://edge.example.com`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyOrigin(String);

impl ProxyOrigin {
    /// Derive the origin from the inbound request.
    ///
    /// A configured public origin wins. Otherwise the scheme comes from
    /// `X-Forwarded-Proto` (default `http`) and the host from the `Host`
    /// header or the request URI.
    pub fn resolve(configured: Option<&str>, uri: &Uri, headers: &HeaderMap) -> Self {
        if let Some(origin) = configured {
            return Self(origin.trim_end_matches('/').to_string());
        }

        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| uri.scheme_str())
            .unwrap_or("http");

        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| uri.authority().map(|a| a.as_str()))
            .unwrap_or("localhost");

        Self(format!("{}://{}", scheme, host))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProxyOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_encode_component_matches_browser_behaviour() {
        assert_eq!(
            encode_component("http://host/seg.ts"),
            "http%3A%2F%2Fhost%2Fseg.ts"
        );
        assert_eq!(encode_component("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(encode_component("-_.!~*'()"), "-_.!~*'()");
        assert_eq!(encode_component("é"), "%C3%A9");
    }

    #[test]
    fn test_origin_from_host_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("proxy.local:8080"));
        let uri: Uri = "/corsproxy/?destination=x".parse().unwrap();

        let origin = ProxyOrigin::resolve(None, &uri, &headers);
        assert_eq!(origin.as_str(), "http://proxy.local:8080");

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https, http"));
        let origin = ProxyOrigin::resolve(None, &uri, &headers);
        assert_eq!(origin.as_str(), "https://proxy.local:8080");
    }

    #[test]
    fn test_configured_origin_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("internal:8080"));
        let uri: Uri = "/corsproxy/".parse().unwrap();

        let origin = ProxyOrigin::resolve(Some("https://edge.example.com/"), &uri, &headers);
        assert_eq!(origin.to_string(), "https://edge.example.com");
    }
}
