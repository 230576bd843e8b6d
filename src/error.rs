use std::io::Error as IoError;

use ldn_model::ConfigError;
use thiserror::Error as TError;

#[derive(Debug, TError)]
pub enum Error {
    #[error("Session not started.")]
    NotStarted,
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Transport failure: {0}")]
    Io(#[from] IoError),
    #[error(transparent)]
    Proxy(#[from] ldn_proxy::Error),
}
