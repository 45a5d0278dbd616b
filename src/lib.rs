//! Federated activity core.
//!
//! Untrusted ActivityPub documents are decoded into typed graphs by
//! [`activity_pub::ActivityDecoder`], routed through a
//! [`activity_pub::DispatchRegistry`] and handled per type. The follow
//! handshake answers with Accepts queued on the persisted outbox, which the
//! [`supervisor::Supervisor`] drains in the background.

pub mod activity_pub;
pub mod config;
pub mod error;
pub mod supervisor;

pub use error::{Error, Result};
