//! Upstream fetch subsystem.
//!
//! One request per inbound call, no retries, no pooling policy beyond
//! what the client provides.

pub mod client;

pub use client::{decode_text, FetchError, UpstreamClient};
