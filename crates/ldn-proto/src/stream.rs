use ldn_utils::{ldn_log_debug, ldn_log_warn};

use crate::codec::{Codec, Result as CodecResult};
use crate::header::{Header, HEADER_SIZE};
use crate::packet::{Packet, PacketId};

/// A complete packet pulled out of a byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Header as received.
    pub header: Header,
    /// Decoded packet.
    pub packet: Packet,
}

/// Reassembles packets from a byte stream.
///
/// Each stream (a relay connection, a peer) needs its own instance, partial
/// packets are kept between [WireCodec::feed] calls.
#[derive(Debug, Default)]
pub struct WireCodec {
    buffer: Vec<u8>,
}

impl WireCodec {
    /// Empty reassembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of a partial packet currently held.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial packet.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Consume a chunk of the stream, calling `handler` for every packet completed by it.
    ///
    /// A protocol error drops the partial packet and the rest of `data`; the
    /// stream it came from should be treated as corrupt. Packets of unknown
    /// type are skipped.
    pub fn feed<F>(&mut self, mut data: &[u8], mut handler: F) -> CodecResult<()>
    where
        F: FnMut(Frame),
    {
        while !data.is_empty() {
            if self.buffer.len() < HEADER_SIZE {
                let take = data.len().min(HEADER_SIZE - self.buffer.len());
                self.buffer.extend_from_slice(&data[..take]);
                data = &data[take..];
            }

            if self.buffer.len() < HEADER_SIZE {
                break;
            }

            let header = Header::decode(&self.buffer)?;
            if let Err(e) = header.validate() {
                ldn_log_warn!("Dropping stream: {}", e);
                self.reset();
                return Err(e);
            }

            let size = header.packet_size();
            let take = data.len().min(size - self.buffer.len());
            self.buffer.extend_from_slice(&data[..take]);
            data = &data[take..];

            if self.buffer.len() == size {
                let decoded = self.decode(header);
                self.reset();
                if let Some(packet) = decoded? {
                    handler(Frame { header, packet });
                }
            }
        }

        Ok(())
    }

    fn decode(&self, header: Header) -> CodecResult<Option<Packet>> {
        let payload = &self.buffer[HEADER_SIZE..];
        match PacketId::try_from(header.packet_type) {
            Ok(id) => Packet::decode(id, payload).map(Some).map_err(|e| {
                ldn_log_warn!("Failed to decode {} packet: {}", id, e);
                e
            }),
            Err(e) => {
                ldn_log_debug!("Skipping packet: {}", e);
                Ok(None)
            }
        }
    }

    /// Encode a packet ready to be written to a stream.
    pub fn encode(packet: &Packet) -> CodecResult<Vec<u8>> {
        packet.encode()
    }
}
