//! Response body rewriting.
//!
//! # Data Flow
//! ```text
//! upstream HTML (decoded text)
//!     → html.rs (src/srcset → proxy URL)
//!     → client
//! ```
//!
//! # Design Decisions
//! - Pure string transforms, no I/O
//! - Pattern-based, never a DOM round trip, so untouched markup stays byte-identical

pub mod html;

pub use html::{encode_uri_component, rewrite_image_sources};

/// True when a `content-type` value describes an HTML document.
pub fn is_html(content_type: &str) -> bool {
    content_type.contains("text/html")
}
