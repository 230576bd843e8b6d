use std::{io, net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use socket2::Socket;
use tokio::net::{ToSocketAddrs, UdpSocket};

use ldn_utils::ldn_log_debug;

use crate::UdpParams;

/// Datagram socket shared by the relay link and every peer link.
#[cfg_attr(any(test, feature = "mockall"), mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send one datagram to `target`.
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;
    /// Receive one datagram.
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
    /// Address the socket is bound to.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl Transport for UdpSocket {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, target).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        UdpSocket::local_addr(self)
    }
}

/// Opens a fresh [Transport] every time a session (re)starts.
#[cfg_attr(any(test, feature = "mockall"), mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Bind a new transport.
    async fn connect(&self) -> io::Result<Arc<dyn Transport>>;
}

/// Bind a UDP socket and apply `params` to it.
pub async fn new_udp<A: ToSocketAddrs>(addr: A, params: Option<UdpParams>) -> io::Result<UdpSocket> {
    let s = UdpSocket::bind(addr).await?;
    let s = Socket::from(s.into_std()?);

    if let Some(params) = params {
        params.apply(&s);
    }

    UdpSocket::from_std(s.into())
}

/// [Connector] binding UDP sockets on a fixed local address.
#[derive(Debug, Clone)]
pub struct UdpConnector {
    bind: SocketAddr,
    params: UdpParams,
}

impl UdpConnector {
    /// Connector binding on `bind`, port 0 picks a free one.
    pub fn new(bind: SocketAddr, params: UdpParams) -> Self {
        Self { bind, params }
    }
}

#[async_trait]
impl Connector for UdpConnector {
    async fn connect(&self) -> io::Result<Arc<dyn Transport>> {
        let socket = new_udp(self.bind, Some(self.params)).await?;
        ldn_log_debug!("Bound udp socket on {:?}", socket.local_addr());
        Ok(Arc::new(socket))
    }
}
