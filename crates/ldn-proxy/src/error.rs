use ldn_proto::CodecError;

/// Proxy errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No issued token matched the joiner within the auth window.
    #[error("No matching proxy token")]
    NoMatchingToken,
    /// Session queue is closed or full.
    #[error("Proxy session closed")]
    SessionClosed,
    /// Peer stream is corrupt.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Sending failed.
    #[error("Link down: {0}")]
    LinkDown(#[from] std::io::Error),
}
