//! Image-rewriting HTTP forwarding proxy.
//!
//! `GET /?u=<url>` fetches `<url>` and relays the response. HTML bodies have
//! their absolute HTTPS `src`/`srcset` attributes pointed back at the proxy;
//! everything else is returned byte-for-byte.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rewrite;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
