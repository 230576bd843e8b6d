use bytes::{Buf, BufMut};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use ldn_utils::{to_fixed, trim_nul};

use crate::codec::{check_len, Codec, Result};

/// Length of the passphrase field.
pub const PASSPHRASE_SIZE: usize = 0x80;

/// Handshake identity. All zero when the relay has not assigned one yet,
/// the relay answers with the identity to reuse on reconnects.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InitializeMessage {
    /// Session id.
    pub id: [u8; 16],
    /// Virtual MAC address.
    pub mac_address: [u8; 6],
}

impl Codec for InitializeMessage {
    const SIZE: usize = 0x16;

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, Self::SIZE)?;
        let mut msg = Self::default();
        let mut buf = bytes;
        buf.copy_to_slice(&mut msg.id);
        buf.copy_to_slice(&mut msg.mac_address);
        Ok(msg)
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.id);
        buf.put_slice(&self.mac_address);
    }
}

/// Passphrase limiting which networks a client can see, UTF-8 zero padded.
#[derive(Clone, PartialEq, Eq)]
pub struct PassphraseMessage {
    /// Raw field contents.
    pub passphrase: [u8; PASSPHRASE_SIZE],
}

impl PassphraseMessage {
    /// Build from a string, anything past [PASSPHRASE_SIZE] bytes is cut at
    /// the last whole character.
    pub fn new(passphrase: &str) -> Self {
        let mut end = passphrase.len().min(PASSPHRASE_SIZE);
        while !passphrase.is_char_boundary(end) {
            end -= 1;
        }
        Self {
            passphrase: to_fixed(passphrase[..end].as_bytes()),
        }
    }

    /// Passphrase without the padding.
    pub fn as_str(&self) -> String {
        String::from_utf8_lossy(trim_nul(&self.passphrase)).into_owned()
    }
}

impl Default for PassphraseMessage {
    fn default() -> Self {
        Self::new("")
    }
}

impl std::fmt::Debug for PassphraseMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassphraseMessage")
            .field("passphrase", &ldn_utils::Hidden(self.as_str()))
            .finish()
    }
}

impl Codec for PassphraseMessage {
    const SIZE: usize = PASSPHRASE_SIZE;

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, Self::SIZE)?;
        Ok(Self {
            passphrase: to_fixed(&bytes[..Self::SIZE]),
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.passphrase);
    }
}

/// Errors reported by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum NetworkError {
    /// No error.
    None = 0,
    /// Relay could not reach the locally hosted proxy.
    PortUnreachable = 1,
    /// Network is full.
    TooManyPlayers = 2,
    /// Local game version is older than the host's.
    VersionTooLow = 3,
    /// Local game version is newer than the host's.
    VersionTooHigh = 4,
    /// Connection failed.
    ConnectFailure = 5,
    /// Network to connect to does not exist.
    ConnectNotFound = 6,
    /// No answer in time.
    ConnectTimeout = 7,
    /// Host rejected the connection.
    ConnectRejected = 8,
    /// Reject request failed.
    RejectFailed = 9,
    /// Anything else.
    Unknown = -1,
}

impl NetworkError {
    /// Map a wire value, unknown values become [NetworkError::Unknown].
    pub fn from_raw(value: i32) -> Self {
        Self::try_from(value).unwrap_or(Self::Unknown)
    }
}

impl Default for NetworkError {
    fn default() -> Self {
        Self::None
    }
}

/// Relay reported error.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NetworkErrorMessage {
    /// Reported error.
    pub error: NetworkError,
}

impl Codec for NetworkErrorMessage {
    const SIZE: usize = 4;

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, Self::SIZE)?;
        let mut buf = bytes;
        Ok(Self {
            error: NetworkError::from_raw(buf.get_i32_le()),
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_i32_le(self.error.into());
    }
}

/// Keepalive. `requester == 0` means the relay asked and expects an echo.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PingMessage {
    /// Who initiated the ping.
    pub requester: u8,
    /// Ping id.
    pub id: u8,
}

impl Codec for PingMessage {
    const SIZE: usize = 2;

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, Self::SIZE)?;
        Ok(Self {
            requester: bytes[0],
            id: bytes[1],
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.requester);
        buf.put_u8(self.id);
    }
}

/// Leave the current network.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectMessage {
    /// Address of the node leaving, 0 for self.
    pub disconnect_ip: u32,
}

impl Codec for DisconnectMessage {
    const SIZE: usize = 4;

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, Self::SIZE)?;
        let mut buf = bytes;
        Ok(Self {
            disconnect_ip: buf.get_u32_le(),
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.disconnect_ip);
    }
}

/// Why a node left a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum DisconnectReason {
    /// Unspecified.
    None = 0,
    /// Left on its own.
    User = 1,
    /// Asked by the system.
    SystemRequest = 2,
    /// Host destroyed the network.
    DestroyedByUser = 3,
    /// System destroyed the network.
    DestroyedBySystemRequest = 4,
    /// Kicked by the host.
    Admin = 5,
    /// Link lost.
    SignalLost = 6,
}

impl DisconnectReason {
    /// Map a wire value, unknown values become [DisconnectReason::None].
    pub fn from_raw(value: u32) -> Self {
        Self::try_from(value).unwrap_or(Self::None)
    }
}

impl Default for DisconnectReason {
    fn default() -> Self {
        Self::None
    }
}

/// Ask the relay to kick a node from the hosted network.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RejectRequest {
    /// Node to kick.
    pub node_id: u32,
    /// Reason reported to the node.
    pub disconnect_reason: DisconnectReason,
}

impl Codec for RejectRequest {
    const SIZE: usize = 8;

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, Self::SIZE)?;
        let mut buf = bytes;
        Ok(Self {
            node_id: buf.get_u32_le(),
            disconnect_reason: DisconnectReason::from_raw(buf.get_u32_le()),
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.node_id);
        buf.put_u32_le(self.disconnect_reason.into());
    }
}

/// Which stations may join a hosted network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum AcceptPolicy {
    /// Everyone.
    AcceptAll = 0,
    /// No one.
    RejectAll = 1,
    /// Everyone not blacklisted.
    BlackList = 2,
    /// Only whitelisted.
    WhiteList = 3,
}

impl Default for AcceptPolicy {
    fn default() -> Self {
        Self::AcceptAll
    }
}

/// Change the station accept policy of the hosted network.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SetAcceptPolicyRequest {
    /// New policy.
    pub station_accept_policy: AcceptPolicy,
}

impl Codec for SetAcceptPolicyRequest {
    const SIZE: usize = 1;

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, Self::SIZE)?;
        Ok(Self {
            station_accept_policy: AcceptPolicy::try_from(bytes[0]).unwrap_or_default(),
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.station_accept_policy.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn passphrase_is_padded_and_truncated() {
        let msg = PassphraseMessage::new("Ryujinx-0badcafe");
        let bytes = msg.to_bytes();
        assert_eq!(bytes.len(), PASSPHRASE_SIZE);
        assert_eq!(&bytes[..16], b"Ryujinx-0badcafe");
        assert!(bytes[16..].iter().all(|b| *b == 0));
        assert_eq!(PassphraseMessage::decode(&bytes).unwrap().as_str(), "Ryujinx-0badcafe");

        let long = "x".repeat(200);
        assert_eq!(PassphraseMessage::new(&long).as_str().len(), PASSPHRASE_SIZE);

        let wide = "\u{20ac}".repeat(43);
        assert_eq!(PassphraseMessage::new(&wide).as_str(), "\u{20ac}".repeat(42));
    }

    #[rstest]
    #[case(&[1, 0, 0, 0], NetworkError::PortUnreachable)]
    #[case(&[7, 0, 0, 0], NetworkError::ConnectTimeout)]
    #[case(&[0xff, 0xff, 0xff, 0xff], NetworkError::Unknown)]
    #[case(&[42, 0, 0, 0], NetworkError::Unknown)]
    fn network_error_values(#[case] bytes: &[u8], #[case] error: NetworkError) {
        assert_eq!(NetworkErrorMessage::decode(bytes).unwrap().error, error);
    }

    #[test]
    fn reject_layout() {
        let msg = RejectRequest {
            node_id: 3,
            disconnect_reason: DisconnectReason::Admin,
        };
        assert_eq!(msg.to_bytes(), [3, 0, 0, 0, 5, 0, 0, 0]);
    }

    #[test]
    fn short_payload_is_rejected() {
        assert_eq!(
            InitializeMessage::decode(&[0; 10]),
            Err(crate::CodecError::InvalidLength {
                expected: 0x16,
                actual: 10
            })
        );
    }
}
