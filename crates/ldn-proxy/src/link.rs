use std::{io, net::SocketAddr};

use async_trait::async_trait;
use ldn_proto::Packet;

/// Outbound side of the session socket, shared by the relay link and peer links.
#[cfg_attr(any(test, feature = "mockall"), mockall::automock)]
#[async_trait]
pub trait Link: Send + Sync + 'static {
    /// Send `packet` to a peer.
    async fn send_to(&self, target: SocketAddr, packet: &Packet) -> io::Result<()>;
    /// Send `packet` to the relay server.
    async fn send_to_relay(&self, packet: &Packet) -> io::Result<()>;
}
