//! Image source rewriting for HTML bodies.
//!
//! A narrow pattern scan, not an HTML parser: only double-quoted `src` and
//! `srcset` values holding an absolute `https://` URL are touched. Every
//! other byte of the document passes through as-is.

use std::sync::LazyLock;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::{Captures, Regex};

/// Characters left unescaped in a URI component: `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

static IMAGE_SOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"src(?:set)?="(https://[^"]+)""#).expect("image source pattern is valid")
});

/// Percent-encode `value` for use as a single query parameter value.
pub fn encode_uri_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Point every absolute HTTPS `src`/`srcset` attribute at the proxy.
///
/// Each matched attribute is replaced with `src="<prefix><encoded url>"`.
/// The attribute name is always emitted as `src`, so a `srcset` attribute
/// comes out renamed.
///
/// ```
/// use image_proxy::rewrite::rewrite_image_sources;
///
/// let html = r#"<img src="https://example.com/a.png">"#;
/// assert_eq!(
///     rewrite_image_sources(html, "http://proxy.test/?u="),
///     r#"<img src="http://proxy.test/?u=https%3A%2F%2Fexample.com%2Fa.png">"#,
/// );
/// ```
pub fn rewrite_image_sources(html: &str, prefix: &str) -> String {
    IMAGE_SOURCE
        .replace_all(html, |caps: &Captures<'_>| match caps.get(1) {
            Some(url) => format!(r#"src="{}{}""#, prefix, encode_uri_component(url.as_str())),
            None => caps[0].to_string(),
        })
        .into_owned()
}
