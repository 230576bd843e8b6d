#![deny(missing_docs)]

//! Types shared between the LDN session, the proxy and their users.

pub mod config;
pub mod event;
mod passphrase;

pub use config::{validate_passphrase, Config, ConfigError, ServerConfig, Timeouts};
pub use event::{NetworkChange, ResultCode};
pub use passphrase::generate_passphrase;
