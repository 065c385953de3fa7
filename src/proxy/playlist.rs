//! HLS / WebVTT manifest rewriting.
//!
//! Every URL-bearing line of a manifest is turned into a URL that points back
//! at this proxy, carrying the same extra headers, so that a player following
//! the manifest keeps going through the proxy. All other lines are kept
//! verbatim and the line count never changes.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::proxy::destination::{ExtraHeaders, DESTINATION_PARAM};
use crate::proxy::urls::{encode_component, ProxyOrigin};

/// Trailing `/list<name>.m3u8` file component of a destination.
static LIST_MANIFEST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/list[^/]+\.m3u8").expect("static regex"));

pub const HLS_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
pub const VTT_CONTENT_TYPE: &str = "text/vtt";

/// Kind of manifest, decided from the upstream Content-Type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistKind {
    Hls,
    WebVtt,
}

impl PlaylistKind {
    /// Detect a manifest from a Content-Type value. Missing means passthrough.
    pub fn detect(content_type: Option<&str>) -> Option<Self> {
        let content_type = content_type?;
        if content_type.contains(VTT_CONTENT_TYPE) {
            Some(PlaylistKind::WebVtt)
        } else if content_type.contains(HLS_CONTENT_TYPE) {
            Some(PlaylistKind::Hls)
        } else {
            None
        }
    }

    /// Content-Type of the rewritten response.
    pub fn content_type(self) -> &'static str {
        match self {
            PlaylistKind::Hls => HLS_CONTENT_TYPE,
            PlaylistKind::WebVtt => VTT_CONTENT_TYPE,
        }
    }
}

/// Directory of a destination, with a `/list*.m3u8` file name removed.
///
/// Only that naming convention is recognised; any other destination is
/// returned unchanged.
pub fn base_directory(destination: &str) -> Cow<'_, str> {
    LIST_MANIFEST.replace(destination, "")
}

/// Result of rewriting one manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenPlaylist {
    pub text: String,
    pub rewritten_lines: usize,
}

/// Rewrites manifest lines into proxy URLs for one destination.
#[derive(Debug, Clone)]
pub struct PlaylistRewriter {
    absolute_prefix: String,
    relative_prefix: String,
    header_suffix: String,
}

impl PlaylistRewriter {
    pub fn new(
        origin: &ProxyOrigin,
        endpoint: &str,
        destination: &str,
        extra_headers: &ExtraHeaders,
    ) -> Self {
        Self {
            absolute_prefix: format!("{}{}?{}=", origin, endpoint, DESTINATION_PARAM),
            relative_prefix: format!(
                "?{}={}/",
                DESTINATION_PARAM,
                encode_component(&base_directory(destination))
            ),
            header_suffix: extra_headers.query_suffix(),
        }
    }

    /// Rewrite a single line, or borrow it back untouched.
    pub fn rewrite_line<'a>(&self, line: &'a str) -> Cow<'a, str> {
        if line.starts_with("http") {
            Cow::Owned(format!(
                "{}{}{}",
                self.absolute_prefix,
                encode_component(line),
                self.header_suffix
            ))
        } else if line.ends_with("m3u8") {
            Cow::Owned(format!(
                "{}{}{}",
                self.relative_prefix,
                encode_component(line),
                self.header_suffix
            ))
        } else {
            Cow::Borrowed(line)
        }
    }

    /// Rewrite a whole manifest, splitting and joining on `\n` only.
    pub fn rewrite(&self, text: &str) -> RewrittenPlaylist {
        let mut rewritten_lines = 0;
        let lines: Vec<Cow<'_, str>> = text
            .split('\n')
            .map(|line| {
                let out = self.rewrite_line(line);
                if matches!(out, Cow::Owned(_)) {
                    rewritten_lines += 1;
                }
                out
            })
            .collect();

        RewrittenPlaylist {
            text: lines.join("\n"),
            rewritten_lines,
        }
    }

    /// Decode a raw body (lossy UTF-8, leading BOM dropped) and rewrite it.
    pub fn rewrite_bytes(&self, body: &[u8]) -> RewrittenPlaylist {
        let text = String::from_utf8_lossy(body);
        self.rewrite(text.strip_prefix('\u{FEFF}').unwrap_or(&text))
    }
}
