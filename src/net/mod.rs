//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind with backlog, accept)
//!     → connection.rs (connection id, live-connection tracking)
//!     → Hand off to the HTTP layer
//! ```
//!
//! # Design Decisions
//! - One task per accepted connection, no admission control
//! - Each connection tracked so shutdown can drain in-flight exchanges

pub mod connection;
pub mod listener;
