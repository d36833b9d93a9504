//! Forwarding HTTP proxy with a reversible body transform.

pub mod codec;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use codec::TransformKey;
pub use config::ProxyConfig;
pub use http::ProxyServer;
pub use lifecycle::{RunningProxy, Shutdown};
