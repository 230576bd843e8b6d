use bytes::BufMut;

use crate::codec::{Codec, Result as CodecResult};
use crate::header::{Header, HEADER_SIZE, MAX_PACKET_SIZE};
use crate::message::*;

#[repr(u8)]
#[derive(Debug, Hash, PartialEq, Eq, Copy, Clone, strum::EnumIter, strum::FromRepr, strum::Display)]
/// Byte encoding of [Packet] types.
pub enum PacketId {
    /// Handshake, both directions.
    Initialize = 0,
    /// Client passphrase.
    Passphrase = 1,
    /// Host a public network.
    CreateAccessPoint = 2,
    /// Host a private network.
    CreateAccessPointPrivate = 3,
    /// Joiner is pointed to, or authenticates with, a proxy host.
    ExternalProxy = 4,
    /// Relay issued proxy token.
    ExternalProxyToken = 5,
    /// Proxy connection state change.
    ExternalProxyState = 6,
    /// Network description update.
    SyncNetwork = 7,
    /// Kick a node.
    Reject = 8,
    /// Kick acknowledged.
    RejectReply = 9,
    /// Look for networks.
    Scan = 10,
    /// One scan result.
    ScanReply = 11,
    /// End of scan results.
    ScanReplyEnd = 12,
    /// Join a public network.
    Connect = 13,
    /// Join a private network.
    ConnectPrivate = 14,
    /// Joined a network.
    Connected = 15,
    /// Left a network.
    Disconnect = 16,
    /// Overlay address assignment.
    ProxyConfig = 17,
    /// Proxied connection request.
    ProxyConnect = 18,
    /// Proxied connection reply.
    ProxyConnectReply = 19,
    /// Proxied data.
    ProxyData = 20,
    /// Proxied connection closed.
    ProxyDisconnect = 21,
    /// Station accept policy.
    SetAcceptPolicy = 22,
    /// Advertise data update.
    SetAdvertiseData = 23,
    /// Keepalive.
    Ping = 253,
    /// Reachability probe.
    TestPing = 254,
    /// Relay reported error.
    NetworkError = 255,
}

/// Every packet of the protocol, decoded.
///
/// Packets carrying a variable length tail keep it next to the fixed part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// [PacketId::Initialize]
    Initialize(InitializeMessage),
    /// [PacketId::Passphrase]
    Passphrase(PassphraseMessage),
    /// [PacketId::CreateAccessPoint], with advertise data.
    CreateAccessPoint(CreateAccessPointRequest, Vec<u8>),
    /// [PacketId::CreateAccessPointPrivate], with advertise data.
    CreateAccessPointPrivate(CreateAccessPointPrivateRequest, Vec<u8>),
    /// [PacketId::ExternalProxy]
    ExternalProxy(ExternalProxyConfig),
    /// [PacketId::ExternalProxyToken]
    ExternalProxyToken(ExternalProxyToken),
    /// [PacketId::ExternalProxyState]
    ExternalProxyState(ExternalProxyConnectionState),
    /// [PacketId::SyncNetwork]
    SyncNetwork(NetworkInfo),
    /// [PacketId::Reject]
    Reject(RejectRequest),
    /// [PacketId::RejectReply]
    RejectReply,
    /// [PacketId::Scan]
    Scan(ScanFilter),
    /// [PacketId::ScanReply]
    ScanReply(NetworkInfo),
    /// [PacketId::ScanReplyEnd]
    ScanReplyEnd,
    /// [PacketId::Connect]
    Connect(ConnectRequest),
    /// [PacketId::ConnectPrivate]
    ConnectPrivate(ConnectPrivateRequest),
    /// [PacketId::Connected]
    Connected(NetworkInfo),
    /// [PacketId::Disconnect]
    Disconnect(DisconnectMessage),
    /// [PacketId::ProxyConfig]
    ProxyConfig(ProxyConfig),
    /// [PacketId::ProxyConnect]
    ProxyConnect(ProxyConnectRequest),
    /// [PacketId::ProxyConnectReply]
    ProxyConnectReply(ProxyConnectResponse),
    /// [PacketId::ProxyData], with the proxied payload.
    ProxyData(ProxyDataHeader, Vec<u8>),
    /// [PacketId::ProxyDisconnect]
    ProxyDisconnect(ProxyDisconnectMessage),
    /// [PacketId::SetAcceptPolicy]
    SetAcceptPolicy(SetAcceptPolicyRequest),
    /// [PacketId::SetAdvertiseData]
    SetAdvertiseData(Vec<u8>),
    /// [PacketId::Ping]
    Ping(PingMessage),
    /// [PacketId::TestPing]
    TestPing(PingMessage),
    /// [PacketId::NetworkError]
    NetworkError(NetworkErrorMessage),
}

impl TryFrom<u8> for PacketId {
    type Error = crate::CodecError;

    fn try_from(value: u8) -> CodecResult<Self> {
        Self::from_repr(value).ok_or(crate::CodecError::UnknownPacket(value))
    }
}

fn with_tail<T: Codec>(payload: &[u8]) -> CodecResult<(T, Vec<u8>)> {
    let fixed = T::decode(payload)?;
    Ok((fixed, payload[T::SIZE..].to_vec()))
}

impl Packet {
    /// Decode the payload of a packet of type `id`.
    pub fn decode(id: PacketId, payload: &[u8]) -> CodecResult<Self> {
        use PacketId as Id;

        Ok(match id {
            Id::Initialize => Self::Initialize(Codec::decode(payload)?),
            Id::Passphrase => Self::Passphrase(Codec::decode(payload)?),
            Id::CreateAccessPoint => {
                let (req, tail) = with_tail(payload)?;
                Self::CreateAccessPoint(req, tail)
            }
            Id::CreateAccessPointPrivate => {
                let (req, tail) = with_tail(payload)?;
                Self::CreateAccessPointPrivate(req, tail)
            }
            Id::ExternalProxy => Self::ExternalProxy(Codec::decode(payload)?),
            Id::ExternalProxyToken => Self::ExternalProxyToken(Codec::decode(payload)?),
            Id::ExternalProxyState => Self::ExternalProxyState(Codec::decode(payload)?),
            Id::SyncNetwork => Self::SyncNetwork(Codec::decode(payload)?),
            Id::Reject => Self::Reject(Codec::decode(payload)?),
            Id::RejectReply => Self::RejectReply,
            Id::Scan => Self::Scan(Codec::decode(payload)?),
            Id::ScanReply => Self::ScanReply(Codec::decode(payload)?),
            Id::ScanReplyEnd => Self::ScanReplyEnd,
            Id::Connect => Self::Connect(Codec::decode(payload)?),
            Id::ConnectPrivate => Self::ConnectPrivate(Codec::decode(payload)?),
            Id::Connected => Self::Connected(Codec::decode(payload)?),
            Id::Disconnect => Self::Disconnect(Codec::decode(payload)?),
            Id::ProxyConfig => Self::ProxyConfig(Codec::decode(payload)?),
            Id::ProxyConnect => Self::ProxyConnect(Codec::decode(payload)?),
            Id::ProxyConnectReply => Self::ProxyConnectReply(Codec::decode(payload)?),
            Id::ProxyData => {
                let (header, tail) = with_tail(payload)?;
                Self::ProxyData(header, tail)
            }
            Id::ProxyDisconnect => Self::ProxyDisconnect(Codec::decode(payload)?),
            Id::SetAcceptPolicy => Self::SetAcceptPolicy(Codec::decode(payload)?),
            Id::SetAdvertiseData => Self::SetAdvertiseData(payload.to_vec()),
            Id::Ping => Self::Ping(Codec::decode(payload)?),
            Id::TestPing => Self::TestPing(Codec::decode(payload)?),
            Id::NetworkError => Self::NetworkError(Codec::decode(payload)?),
        })
    }

    /// Type of this packet.
    pub fn packet_id(&self) -> PacketId {
        use PacketId as Id;

        match self {
            Self::Initialize(_) => Id::Initialize,
            Self::Passphrase(_) => Id::Passphrase,
            Self::CreateAccessPoint(..) => Id::CreateAccessPoint,
            Self::CreateAccessPointPrivate(..) => Id::CreateAccessPointPrivate,
            Self::ExternalProxy(_) => Id::ExternalProxy,
            Self::ExternalProxyToken(_) => Id::ExternalProxyToken,
            Self::ExternalProxyState(_) => Id::ExternalProxyState,
            Self::SyncNetwork(_) => Id::SyncNetwork,
            Self::Reject(_) => Id::Reject,
            Self::RejectReply => Id::RejectReply,
            Self::Scan(_) => Id::Scan,
            Self::ScanReply(_) => Id::ScanReply,
            Self::ScanReplyEnd => Id::ScanReplyEnd,
            Self::Connect(_) => Id::Connect,
            Self::ConnectPrivate(_) => Id::ConnectPrivate,
            Self::Connected(_) => Id::Connected,
            Self::Disconnect(_) => Id::Disconnect,
            Self::ProxyConfig(_) => Id::ProxyConfig,
            Self::ProxyConnect(_) => Id::ProxyConnect,
            Self::ProxyConnectReply(_) => Id::ProxyConnectReply,
            Self::ProxyData(..) => Id::ProxyData,
            Self::ProxyDisconnect(_) => Id::ProxyDisconnect,
            Self::SetAcceptPolicy(_) => Id::SetAcceptPolicy,
            Self::SetAdvertiseData(_) => Id::SetAdvertiseData,
            Self::Ping(_) => Id::Ping,
            Self::TestPing(_) => Id::TestPing,
            Self::NetworkError(_) => Id::NetworkError,
        }
    }

    fn encode_payload<B: BufMut>(&self, buf: &mut B) {
        match self {
            Self::Initialize(msg) => msg.encode(buf),
            Self::Passphrase(msg) => msg.encode(buf),
            Self::CreateAccessPoint(req, tail) => {
                req.encode(buf);
                buf.put_slice(tail);
            }
            Self::CreateAccessPointPrivate(req, tail) => {
                req.encode(buf);
                buf.put_slice(tail);
            }
            Self::ExternalProxy(msg) => msg.encode(buf),
            Self::ExternalProxyToken(msg) => msg.encode(buf),
            Self::ExternalProxyState(msg) => msg.encode(buf),
            Self::SyncNetwork(msg) | Self::ScanReply(msg) | Self::Connected(msg) => msg.encode(buf),
            Self::Reject(msg) => msg.encode(buf),
            Self::RejectReply | Self::ScanReplyEnd => {}
            Self::Scan(msg) => msg.encode(buf),
            Self::Connect(msg) => msg.encode(buf),
            Self::ConnectPrivate(msg) => msg.encode(buf),
            Self::Disconnect(msg) => msg.encode(buf),
            Self::ProxyConfig(msg) => msg.encode(buf),
            Self::ProxyConnect(msg) => msg.encode(buf),
            Self::ProxyConnectReply(msg) => msg.encode(buf),
            Self::ProxyData(header, tail) => {
                header.encode(buf);
                buf.put_slice(tail);
            }
            Self::ProxyDisconnect(msg) => msg.encode(buf),
            Self::SetAcceptPolicy(msg) => msg.encode(buf),
            Self::SetAdvertiseData(data) => buf.put_slice(data),
            Self::Ping(msg) | Self::TestPing(msg) => msg.encode(buf),
            Self::NetworkError(msg) => msg.encode(buf),
        }
    }

    /// Encode header and payload, ready to be sent.
    ///
    /// Packets the receiving side would refuse in [Header::validate] fail with
    /// [crate::CodecError::PacketTooLarge].
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut payload = Vec::new();
        self.encode_payload(&mut payload);

        let size = HEADER_SIZE + payload.len();
        if size >= MAX_PACKET_SIZE {
            return Err(crate::CodecError::PacketTooLarge(size));
        }

        let mut bytes = Vec::with_capacity(size);
        Header::new(self.packet_id(), payload.len() as u32).encode(&mut bytes);
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }
}

/// Downcast packet to a more concrete type
pub trait DowncastPacket<Packet> {
    /// Downcast packet into inner type or return enum on failure.
    fn downcast(packet: Packet) -> std::result::Result<Self, Packet>
    where
        Self: Sized;
}

macro_rules! packet_from {
    ($($msg:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$msg> for Packet {
                fn from(other: $msg) -> Self {
                    Self::$variant(other)
                }
            }
        )*
    };
}

packet_from! {
    InitializeMessage => Initialize,
    PassphraseMessage => Passphrase,
    ExternalProxyConfig => ExternalProxy,
    ExternalProxyToken => ExternalProxyToken,
    ExternalProxyConnectionState => ExternalProxyState,
    RejectRequest => Reject,
    ScanFilter => Scan,
    ConnectRequest => Connect,
    ConnectPrivateRequest => ConnectPrivate,
    DisconnectMessage => Disconnect,
    ProxyConfig => ProxyConfig,
    ProxyConnectRequest => ProxyConnect,
    ProxyConnectResponse => ProxyConnectReply,
    ProxyDisconnectMessage => ProxyDisconnect,
    SetAcceptPolicyRequest => SetAcceptPolicy,
    PingMessage => Ping,
    NetworkErrorMessage => NetworkError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use strum::IntoEnumIterator;

    fn decode_framed(bytes: &[u8]) -> Packet {
        let header = Header::decode(bytes).unwrap();
        header.validate().unwrap();
        assert_eq!(header.packet_size(), bytes.len());
        Packet::decode(header.packet_id().unwrap(), &bytes[HEADER_SIZE..]).unwrap()
    }

    #[test]
    fn packet_ids_are_stable() {
        let ids: Vec<u8> = PacketId::iter().map(|id| id as u8).collect();
        let mut expected: Vec<u8> = (0..=23).collect();
        expected.extend([253, 254, 255]);
        assert_eq!(ids, expected);
        assert_eq!(PacketId::from_repr(24), None);
    }

    #[test]
    fn empty_packets() {
        for packet in [Packet::RejectReply, Packet::ScanReplyEnd] {
            let bytes = packet.encode().unwrap();
            assert_eq!(bytes.len(), HEADER_SIZE);
            assert_eq!(decode_framed(&bytes), packet);
        }
    }

    #[test]
    fn oversized_packet_is_not_encoded() {
        let largest = MAX_PACKET_SIZE - HEADER_SIZE - 1;
        let packet = Packet::SetAdvertiseData(vec![0xAB; largest]);
        assert_eq!(decode_framed(&packet.encode().unwrap()), packet);

        let packet = Packet::SetAdvertiseData(vec![0xAB; largest + 1]);
        assert_eq!(
            packet.encode(),
            Err(crate::CodecError::PacketTooLarge(MAX_PACKET_SIZE))
        );
    }

    fn arb_info() -> impl Strategy<Value = ProxyInfo> {
        (any::<u32>(), any::<u16>(), any::<u32>(), any::<u16>(), any::<i32>()).prop_map(
            |(source_ipv4, source_port, dest_ipv4, dest_port, protocol)| ProxyInfo {
                source_ipv4,
                source_port,
                dest_ipv4,
                dest_port,
                protocol: ProtocolType(protocol),
            },
        )
    }

    fn arb_family() -> impl Strategy<Value = AddressFamily> {
        prop_oneof![
            Just(AddressFamily::Unspecified),
            Just(AddressFamily::InterNetwork),
            Just(AddressFamily::InterNetworkV6),
        ]
    }

    fn arb_network_config() -> impl Strategy<Value = RyuNetworkConfig> {
        (
            any::<[u8; 16]>(),
            any::<[u8; 16]>(),
            arb_family(),
            any::<u16>(),
            any::<u16>(),
        )
            .prop_map(|(game_version, private_ip, address_family, ext, int)| RyuNetworkConfig {
                game_version,
                private_ip,
                address_family,
                external_proxy_port: ext,
                internal_proxy_port: int,
            })
    }

    fn arb_opaque<T: Codec + std::fmt::Debug>() -> impl Strategy<Value = T> {
        proptest::collection::vec(any::<u8>(), T::SIZE).prop_map(|b| T::decode(&b).unwrap())
    }

    fn arb_ping() -> impl Strategy<Value = PingMessage> {
        (any::<u8>(), any::<u8>()).prop_map(|(requester, id)| PingMessage { requester, id })
    }

    /// Packets exchanged with the relay while hosting or joining.
    fn arb_session_packet() -> impl Strategy<Value = Packet> {
        prop_oneof![
            (any::<[u8; 16]>(), any::<[u8; 6]>()).prop_map(|(id, mac_address)| {
                Packet::Initialize(InitializeMessage { id, mac_address })
            }),
            "[a-zA-Z0-9-]{0,128}".prop_map(|p| Packet::Passphrase(PassphraseMessage::new(&p))),
            (
                arb_opaque::<AccessPointConfig>(),
                arb_network_config(),
                proptest::collection::vec(any::<u8>(), 0..384),
            )
                .prop_map(|(config, network, tail)| {
                    Packet::CreateAccessPoint(CreateAccessPointRequest { config, network }, tail)
                }),
            (
                arb_opaque::<PrivateAccessPointConfig>(),
                arb_network_config(),
                proptest::collection::vec(any::<u8>(), 0..64),
            )
                .prop_map(|(config, network, tail)| {
                    Packet::CreateAccessPointPrivate(
                        CreateAccessPointPrivateRequest { config, network },
                        tail,
                    )
                }),
            arb_opaque::<NetworkInfo>().prop_map(Packet::SyncNetwork),
            (any::<u32>(), 0u32..=6).prop_map(|(node_id, reason)| {
                Packet::Reject(RejectRequest {
                    node_id,
                    disconnect_reason: DisconnectReason::from_raw(reason),
                })
            }),
            arb_opaque::<ScanFilter>().prop_map(Packet::Scan),
            arb_opaque::<NetworkInfo>().prop_map(Packet::ScanReply),
            arb_opaque::<ConnectRequest>().prop_map(Packet::Connect),
            arb_opaque::<ConnectPrivateRequest>().prop_map(Packet::ConnectPrivate),
            arb_opaque::<NetworkInfo>().prop_map(Packet::Connected),
            any::<u32>()
                .prop_map(|disconnect_ip| Packet::Disconnect(DisconnectMessage { disconnect_ip })),
            (0u8..=3).prop_map(|p| Packet::SetAcceptPolicy(SetAcceptPolicyRequest {
                station_accept_policy: AcceptPolicy::try_from(p).unwrap(),
            })),
            proptest::collection::vec(any::<u8>(), 0..384).prop_map(Packet::SetAdvertiseData),
            arb_ping().prop_map(Packet::Ping),
            arb_ping().prop_map(Packet::TestPing),
            (-1i32..=9).prop_map(|e| Packet::NetworkError(NetworkErrorMessage {
                error: NetworkError::from_raw(e),
            })),
        ]
    }

    /// Packets of the external and in-band proxies.
    fn arb_proxy_packet() -> impl Strategy<Value = Packet> {
        prop_oneof![
            (any::<[u8; 16]>(), arb_family(), any::<u16>(), any::<[u8; 16]>()).prop_map(
                |(proxy_ip, address_family, proxy_port, token)| {
                    Packet::ExternalProxy(ExternalProxyConfig {
                        proxy_ip,
                        address_family,
                        proxy_port,
                        token: token.into(),
                    })
                }
            ),
            (any::<u32>(), any::<[u8; 16]>(), any::<[u8; 16]>(), arb_family()).prop_map(
                |(virtual_ip, token, physical_ip, address_family)| {
                    Packet::ExternalProxyToken(ExternalProxyToken {
                        virtual_ip,
                        token: token.into(),
                        physical_ip,
                        address_family,
                    })
                }
            ),
            (any::<u32>(), any::<bool>()).prop_map(|(ip_address, connected)| {
                Packet::ExternalProxyState(ExternalProxyConnectionState {
                    ip_address,
                    connected,
                })
            }),
            (any::<u32>(), any::<u32>()).prop_map(|(proxy_ip, proxy_subnet_mask)| {
                Packet::ProxyConfig(ProxyConfig {
                    proxy_ip,
                    proxy_subnet_mask,
                })
            }),
            arb_info().prop_map(|info| Packet::ProxyConnect(ProxyConnectRequest { info })),
            arb_info().prop_map(|info| Packet::ProxyConnectReply(ProxyConnectResponse { info })),
            (arb_info(), proptest::collection::vec(any::<u8>(), 0..1500)).prop_map(
                |(info, data)| {
                    Packet::ProxyData(
                        ProxyDataHeader {
                            info,
                            data_length: data.len() as u32,
                        },
                        data,
                    )
                }
            ),
            (arb_info(), any::<i32>()).prop_map(|(info, disconnect_reason)| {
                Packet::ProxyDisconnect(ProxyDisconnectMessage {
                    info,
                    disconnect_reason,
                })
            }),
        ]
    }

    fn arb_packet() -> impl Strategy<Value = Packet> {
        prop_oneof![
            arb_session_packet(),
            arb_proxy_packet(),
            Just(Packet::RejectReply),
            Just(Packet::ScanReplyEnd),
        ]
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(packet in arb_packet()) {
            prop_assert_eq!(decode_framed(&packet.encode().unwrap()), packet);
        }
    }
}
