use std::io::{self, ErrorKind};

/// How a receive loop reacts to a socket error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorType {
    /// Transient, like an ICMP unreachable bounced back from a peer that left.
    #[error("Recoverable socket error")]
    RecoverableError,
    /// Socket is unusable, the owner has to start over.
    #[error("Unrecoverable socket error")]
    UnrecoverableError,
    /// This datagram is lost, the socket stays usable.
    #[error("Socket IO error")]
    SocketIOError,
}

impl From<&io::Error> for ErrorType {
    fn from(e: &io::Error) -> Self {
        match e.kind() {
            ErrorKind::BrokenPipe | ErrorKind::NotConnected => Self::UnrecoverableError,
            ErrorKind::PermissionDenied | ErrorKind::InvalidInput | ErrorKind::InvalidData => {
                Self::SocketIOError
            }
            _ => Self::RecoverableError,
        }
    }
}
