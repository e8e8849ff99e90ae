//! Network layer for Mockwire
//!
//! Outbound calls go through a [`Transport`]; the stand-in server reuses the
//! body and response helpers in [`http`].

mod client;
pub mod http;

pub use client::{HttpTransport, OutboundRequest, Transport, UpstreamResponse};

/// Largest body buffered in either direction
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Connect timeout for upstream calls
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Idle timeout for pooled upstream connections
pub const POOL_IDLE_TIMEOUT_SECS: u64 = 90;
