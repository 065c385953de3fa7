//! Proxy core.
//!
//! # Data Flow
//! ```text
//! GET|HEAD|POST {endpoint}?destination=<url>&<header>=<value>...
//!     → destination.rs (DestinationSpec: URL + ordered extra headers)
//!     → forwarder.rs (rebuild request, single outbound fetch)
//!     → Content-Type?
//!         manifest (HLS / WebVTT) → playlist.rs (rewrite URL lines)
//!         anything else / absent  → streamed passthrough + CORS headers
//! ```

pub mod destination;
pub mod error;
pub mod forwarder;
pub mod playlist;
pub mod urls;

pub use destination::{DestinationSpec, ExtraHeaders};
pub use error::ProxyError;
pub use forwarder::{Delivery, Forwarder};
pub use playlist::{PlaylistKind, PlaylistRewriter};
pub use urls::ProxyOrigin;
