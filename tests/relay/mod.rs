//! Scriptable stand-in for the relay server.

use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
    time::Duration,
};

use ldn::{
    model::{Config, ServerConfig, Timeouts},
    proto::{InitializeMessage, Packet, PacketId, WireCodec},
};
use tokio::net::UdpSocket;

pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

pub struct FakeRelay {
    socket: UdpSocket,
    codecs: HashMap<SocketAddr, WireCodec>,
    pending: VecDeque<(SocketAddr, Packet)>,
}

impl FakeRelay {
    pub async fn bind() -> Self {
        Self {
            socket: UdpSocket::bind("127.0.0.1:0").await.unwrap(),
            codecs: HashMap::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.socket.local_addr().unwrap()
    }

    pub fn config(&self) -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_owned(),
                port: self.addr().port(),
            },
            bind_address: "127.0.0.1:0".parse().unwrap(),
            timeouts: Timeouts::default(),
            ..Default::default()
        }
    }

    pub async fn recv(&mut self) -> (SocketAddr, Packet) {
        let mut buf = vec![0u8; 65536];
        loop {
            if let Some(next) = self.pending.pop_front() {
                return next;
            }

            let (len, from) = tokio::time::timeout(RECV_TIMEOUT, self.socket.recv_from(&mut buf))
                .await
                .expect("relay got nothing")
                .unwrap();
            let pending = &mut self.pending;
            self.codecs
                .entry(from)
                .or_default()
                .feed(&buf[..len], |frame| pending.push_back((from, frame.packet)))
                .unwrap();
        }
    }

    /// Next packet of kind `id`, skipping anything else.
    pub async fn expect(&mut self, id: PacketId) -> (SocketAddr, Packet) {
        loop {
            let (from, packet) = self.recv().await;
            if packet.packet_id() == id {
                return (from, packet);
            }
        }
    }

    /// Nothing arrives for `quiet`.
    pub async fn assert_silent(&mut self, quiet: Duration) {
        assert!(self.pending.is_empty(), "unexpected {:?}", self.pending);
        let mut buf = vec![0u8; 65536];
        let res = tokio::time::timeout(quiet, self.socket.recv_from(&mut buf)).await;
        assert!(res.is_err(), "relay received unexpected data");
    }

    pub async fn send(&self, to: SocketAddr, packet: Packet) {
        self.socket.send_to(&packet.encode().unwrap(), to).await.unwrap();
    }

    /// Answer the session's handshake, returns the session's address.
    pub async fn handshake(&mut self) -> SocketAddr {
        let (client, _) = self.expect(PacketId::Initialize).await;
        let reply = InitializeMessage {
            id: [0x11; 16],
            mac_address: [2, 0, 0, 0, 0, 1],
        };
        self.send(client, Packet::Initialize(reply)).await;
        client
    }
}
