//! LDN emulation over a relay server.
//!
//! [MasterSession] is the entry point: it keeps the relay session, hosts
//! or joins the peer to peer proxy and reports network changes.

mod error;
mod master;
mod signal;
mod timeout;

pub use error::Error;
pub use master::{MasterSession, ProxyEvent, SessionState};

pub use ldn_model as model;
pub use ldn_proto as proto;
pub use ldn_proxy as proxy;
pub use ldn_sockets as sockets;
pub use ldn_task as task;
pub use ldn_utils as utils;
