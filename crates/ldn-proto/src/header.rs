use bytes::{Buf, BufMut};

use crate::codec::{check_len, Codec, Error, Result};
use crate::PacketId;

/// `RLDN` packed as a little endian u32.
pub const MAGIC: u32 = u32::from_le_bytes(*b"RLDN");

/// Protocol version spoken by this implementation.
pub const PROTOCOL_VERSION: u8 = 1;

/// Size of the packed header.
pub const HEADER_SIZE: usize = 15;

/// Upper bound (exclusive) of header plus payload.
pub const MAX_PACKET_SIZE: usize = 131072;

/// Header preceding every packet.
///
/// | field | offset | size |
/// |---|---|---|
/// | magic | 0 | 4 |
/// | sequence | 4 | 4 |
/// | needs_ack | 8 | 1 |
/// | packet_type | 9 | 1 |
/// | version | 10 | 1 |
/// | data_size | 11 | 4 |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Always [MAGIC] on valid packets.
    pub magic: u32,
    /// Carried on the wire, not interpreted.
    pub sequence: u32,
    /// Carried on the wire, not interpreted.
    pub needs_ack: bool,
    /// Raw [PacketId].
    pub packet_type: u8,
    /// Always [PROTOCOL_VERSION] on valid packets.
    pub version: u8,
    /// Payload length following the header.
    pub data_size: u32,
}

impl Header {
    /// Header for a packet of `id` carrying `data_size` bytes of payload.
    pub fn new(id: PacketId, data_size: u32) -> Self {
        Self {
            magic: MAGIC,
            sequence: 0,
            needs_ack: false,
            packet_type: id as u8,
            version: PROTOCOL_VERSION,
            data_size,
        }
    }

    /// Total size of the packet this header announces.
    pub fn packet_size(&self) -> usize {
        HEADER_SIZE + self.data_size as usize
    }

    /// Check magic, version and size before the announced payload is trusted.
    pub fn validate(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(Error::InvalidMagic(self.magic));
        }
        if self.version != PROTOCOL_VERSION {
            return Err(Error::VersionMismatch(self.version));
        }
        if self.packet_size() >= MAX_PACKET_SIZE {
            return Err(Error::PacketTooLarge(self.packet_size()));
        }
        Ok(())
    }

    /// Decoded packet kind, `None` for ids outside of the protocol.
    pub fn packet_id(&self) -> Option<PacketId> {
        PacketId::from_repr(self.packet_type)
    }
}

impl Codec for Header {
    const SIZE: usize = HEADER_SIZE;

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, Self::SIZE)?;
        let mut buf = bytes;
        Ok(Self {
            magic: buf.get_u32_le(),
            sequence: buf.get_u32_le(),
            needs_ack: buf.get_u8() != 0,
            packet_type: buf.get_u8(),
            version: buf.get_u8(),
            data_size: buf.get_u32_le(),
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.magic);
        buf.put_u32_le(self.sequence);
        buf.put_u8(self.needs_ack as u8);
        buf.put_u8(self.packet_type);
        buf.put_u8(self.version);
        buf.put_u32_le(self.data_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn layout_matches_wire() {
        let header = Header::new(PacketId::Scan, 0x60);
        let bytes = header.to_bytes();
        assert_eq!(
            bytes,
            [b'R', b'L', b'D', b'N', 0, 0, 0, 0, 0, 10, 1, 0x60, 0, 0, 0]
        );
        assert_eq!(Header::decode(&bytes), Ok(header));
    }

    #[rstest]
    #[case(Header { magic: 0x4e444c53, ..Header::new(PacketId::Ping, 2) }, Error::InvalidMagic(0x4e444c53))]
    #[case(Header { version: 2, ..Header::new(PacketId::Ping, 2) }, Error::VersionMismatch(2))]
    #[case(Header::new(PacketId::ProxyData, (MAX_PACKET_SIZE - HEADER_SIZE) as u32), Error::PacketTooLarge(MAX_PACKET_SIZE))]
    fn rejects_invalid(#[case] header: Header, #[case] error: Error) {
        assert_eq!(header.validate(), Err(error));
    }

    #[test]
    fn largest_valid_packet() {
        let header = Header::new(PacketId::ProxyData, (MAX_PACKET_SIZE - HEADER_SIZE - 1) as u32);
        assert_eq!(header.validate(), Ok(()));
    }
}
