use bytes::BufMut;
use thiserror::Error as ThisError;

/// Possible protocol errors.
///
/// Any of these makes the byte stream they came from unusable, the
/// reassembly buffer is dropped when one is raised.
#[derive(ThisError, Debug, PartialEq, Eq, Clone)]
pub enum Error {
    /// Header does not start with the `RLDN` magic.
    #[error("Invalid magic number in received packet: {0:#010x}")]
    InvalidMagic(u32),
    /// Peer speaks another protocol version.
    #[error("Protocol version mismatch, received {0}")]
    VersionMismatch(u8),
    /// Header announced a packet which would not fit the reassembly buffer.
    #[error("Max packet size exceeded: {0} bytes")]
    PacketTooLarge(usize),
    /// Payload is shorter than the fixed layout of its message.
    #[error("Bytes is of invalid length, expected at least {expected}, got {actual}")]
    InvalidLength {
        /// Size of the fixed layout.
        expected: usize,
        /// Size actually received.
        actual: usize,
    },
    /// Packet id outside of the known range.
    #[error("Unknown packet type {0}")]
    UnknownPacket(u8),
}

/// Result wrapper for implementations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common trait for fixed layout message encoding/decoding.
///
/// All integers are little endian, structures are packed.
pub trait Codec {
    /// Size of the fixed on-wire layout.
    const SIZE: usize;

    /// Decode the fixed layout from the start of `bytes`.
    ///
    /// Trailing bytes are ignored, callers interested in a variable length
    /// tail slice it off at [Codec::SIZE].
    fn decode(bytes: &[u8]) -> Result<Self>
    where
        Self: Sized;

    /// Append the fixed layout to `buf`.
    fn encode<B: BufMut>(&self, buf: &mut B);

    /// Encode into a freshly allocated buffer.
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        self.encode(&mut bytes);
        bytes
    }
}

pub(crate) fn check_len(bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() < expected {
        return Err(Error::InvalidLength {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}
