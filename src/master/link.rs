use std::{
    io,
    net::SocketAddr,
    sync::{Arc, Weak},
};

use async_trait::async_trait;

use ldn_proto::Packet;
use ldn_proxy::Link;

use super::Inner;

/// Proxy traffic leaves through the session's own socket.
pub(super) struct SessionLink(Weak<Inner>);

impl SessionLink {
    pub(super) fn new(session: Weak<Inner>) -> Self {
        Self(session)
    }

    fn session(&self) -> io::Result<Arc<Inner>> {
        self.0
            .upgrade()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))
    }
}

#[async_trait]
impl Link for SessionLink {
    async fn send_to(&self, target: SocketAddr, packet: &Packet) -> io::Result<()> {
        self.session()?.send(target, packet).await
    }

    async fn send_to_relay(&self, packet: &Packet) -> io::Result<()> {
        let session = self.session()?;
        session.send(session.relay, packet).await
    }
}
