#![deny(missing_docs)]

//! Peer to peer proxy of the LDN overlay.
//!
//! A node hosting a network runs a [ProxyServer]: joiners authenticate with
//! a token issued by the relay, get a virtual IPv4 address and exchange
//! proxied traffic through it. A node joining somebody else's proxy uses a
//! [ProxyClient]. Both send through a [Link], the session socket.

mod client;
mod error;
mod link;
mod message;
mod server;
mod session;

pub use client::ProxyClient;
pub use error::Error;
pub use link::Link;
#[cfg(any(test, feature = "mockall"))]
pub use link::MockLink;
pub use message::ProxyMessage;
pub use server::{ProxyServer, BROADCAST_SENTINEL, SUBNET_MASK};
pub use session::ProxySession;
