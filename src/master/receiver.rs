use std::{
    collections::HashMap,
    io,
    net::SocketAddr,
    sync::{Arc, Weak},
};

use async_trait::async_trait;

use ldn_proto::{Packet, WireCodec, MAX_PACKET_SIZE};
use ldn_sockets::{ErrorType, Transport};
use ldn_task::{Runtime, RuntimeExt, WaitResponse};
use ldn_utils::{ldn_log_error, ldn_log_warn};

use super::Inner;

/// Receive loop of the session socket.
///
/// Datagrams from joined peers of a hosted proxy go straight to their
/// session, everything else is reassembled per sender and handled by the
/// session.
pub(super) struct Receiver {
    transport: Arc<dyn Transport>,
    session: Weak<Inner>,
    codecs: HashMap<SocketAddr, WireCodec>,
    buffer: Vec<u8>,
}

impl Receiver {
    pub(super) fn new(transport: Arc<dyn Transport>, session: Weak<Inner>) -> Self {
        Self {
            transport,
            session,
            codecs: HashMap::new(),
            buffer: vec![0; MAX_PACKET_SIZE],
        }
    }

    async fn on_datagram(&mut self, len: usize, from: SocketAddr) {
        let session = match self.session.upgrade() {
            Some(session) => session,
            None => return,
        };
        let data = &self.buffer[..len];

        if let Some(hosted) = session.hosted() {
            if hosted.receive_peer_packet(from, data) {
                return;
            }
        }

        for packet in reassemble(&mut self.codecs, from, data) {
            session.handle_packet(from, packet).await;
        }
    }
}

/// Feed a datagram of `from` to its stream, keeping the codec only while it
/// holds a partial packet.
fn reassemble(
    codecs: &mut HashMap<SocketAddr, WireCodec>,
    from: SocketAddr,
    data: &[u8],
) -> Vec<Packet> {
    let mut packets = Vec::new();
    let codec = codecs.entry(from).or_default();
    let res = codec.feed(data, |frame| packets.push(frame.packet));
    if let Err(e) = &res {
        ldn_log_warn!("Dropping corrupt stream from {}: {}", from, e);
    }
    if res.is_err() || codec.pending() == 0 {
        codecs.remove(&from);
    }
    packets
}

#[async_trait]
impl Runtime for Receiver {
    const NAME: &'static str = "MasterSession receiver";

    type Err = io::Error;

    async fn wait(&mut self) -> WaitResponse<'_, Self::Err> {
        match self.transport.recv_from(&mut self.buffer).await {
            Ok((len, from)) => Self::guard(async move {
                self.on_datagram(len, from).await;
                Ok(())
            }),
            Err(e) => match ErrorType::from(&e) {
                ErrorType::UnrecoverableError => {
                    ldn_log_error!("Session socket failed: {}", e);
                    Self::error(e)
                }
                _ => {
                    ldn_log_warn!("Session socket receive failed: {}", e);
                    if let Some(session) = self.session.upgrade() {
                        session.latches.error.set();
                    }
                    Self::next()
                }
            },
        }
    }

    async fn stop(self) {
        if let Some(session) = self.session.upgrade() {
            session.on_stopped();
        }
    }
}

#[cfg(test)]
mod tests {
    use ldn_proto::{PingMessage, HEADER_SIZE};
    use pretty_assertions::assert_eq;

    use super::*;

    fn ping(id: u8) -> Packet {
        Packet::Ping(PingMessage { requester: 0, id })
    }

    #[test]
    fn codec_is_kept_only_for_partial_packets() {
        let mut codecs = HashMap::new();
        let from: SocketAddr = ([10, 0, 0, 1], 30456).into();
        let bytes = ping(1).encode().unwrap();

        assert_eq!(reassemble(&mut codecs, from, &bytes), vec![ping(1)]);
        assert!(codecs.is_empty());

        assert!(reassemble(&mut codecs, from, &bytes[..HEADER_SIZE]).is_empty());
        assert_eq!(codecs.len(), 1);
        assert_eq!(reassemble(&mut codecs, from, &bytes[HEADER_SIZE..]), vec![ping(1)]);
        assert!(codecs.is_empty());
    }

    #[test]
    fn corrupt_stream_is_forgotten() {
        let mut codecs = HashMap::new();
        let from: SocketAddr = ([10, 0, 0, 1], 30456).into();
        let other: SocketAddr = ([10, 0, 0, 2], 30456).into();
        let bytes = ping(2).encode().unwrap();

        reassemble(&mut codecs, other, &bytes[..4]);
        let mut corrupt = bytes.clone();
        corrupt[0] ^= 0xFF;
        assert!(reassemble(&mut codecs, from, &corrupt).is_empty());
        assert_eq!(codecs.keys().collect::<Vec<_>>(), vec![&other]);

        assert_eq!(reassemble(&mut codecs, from, &bytes), vec![ping(2)]);
        assert_eq!(reassemble(&mut codecs, other, &bytes[4..]), vec![ping(2)]);
        assert!(codecs.is_empty());
    }
}
