//! HTTP proxy subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted TCP connection
//!     → server.rs (initial read, dispatch)
//!     → frame.rs (head/body split)
//!     → request.rs (request line, target resolution)
//!     → tunnel.rs (CONNECT)  or  relay.rs (any other method)
//!     → forward.rs (chunked copy, body transform per chunk)
//! ```
//!
//! Only the request line and the head/body boundary are interpreted. Headers
//! pass through as opaque bytes.

pub mod error;
pub mod forward;
pub mod frame;
pub mod relay;
pub mod request;
pub mod server;
pub mod tunnel;

pub use error::{ProxyError, ProxyResult, Stage};
pub use request::{parse_request_line, resolve_connect_target, resolve_target, RequestLine, Target};
pub use server::{handle_client, Exchange, ForwardingContext, ProxyServer};
pub use tunnel::CONNECTION_ESTABLISHED;
