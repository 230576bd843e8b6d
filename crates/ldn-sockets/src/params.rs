use ldn_utils::{ldn_log_trace, ldn_log_warn};
use socket2::Socket;

/// Options applied to a session socket right after it is bound.
///
/// A hosted proxy receives every joined peer on the session socket, so a
/// larger receive buffer helps busy networks.
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpParams {
    /// SO_RCVBUF in bytes, `None` keeps the system default.
    pub recv_buffer: Option<usize>,
    /// SO_SNDBUF in bytes, `None` keeps the system default.
    pub send_buffer: Option<usize>,
}

impl UdpParams {
    /// Apply to `socket`. Failures are logged, the socket stays usable.
    pub fn apply(&self, socket: &Socket) {
        let addr = socket.local_addr().ok().and_then(|a| a.as_socket());

        if let Some(size) = self.recv_buffer {
            if let Err(e) = socket.set_recv_buffer_size(size) {
                ldn_log_warn!("Cannot set receive buffer of {:?} to {}: {}", addr, size, e);
            }
        }
        if let Some(size) = self.send_buffer {
            if let Err(e) = socket.set_send_buffer_size(size) {
                ldn_log_warn!("Cannot set send buffer of {:?} to {}: {}", addr, size, e);
            }
        }

        ldn_log_trace!(
            "Socket {:?} buffers: recv {:?}, send {:?}",
            addr,
            socket.recv_buffer_size(),
            socket.send_buffer_size()
        );
    }
}
