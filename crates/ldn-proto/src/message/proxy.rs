use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bytes::{Buf, BufMut};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use ldn_utils::Hidden;

use crate::codec::{check_len, Codec, Result};

/// Address family values as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum AddressFamily {
    /// No address.
    Unspecified = 0,
    /// IPv4.
    InterNetwork = 2,
    /// IPv6.
    InterNetworkV6 = 23,
}

impl AddressFamily {
    /// Map a wire value, unknown values become [AddressFamily::Unspecified].
    pub fn from_raw(value: i32) -> Self {
        Self::try_from(value).unwrap_or(Self::Unspecified)
    }

    /// Number of meaningful bytes in a 16 byte address field.
    pub fn address_len(self) -> usize {
        match self {
            Self::Unspecified => 0,
            Self::InterNetwork => 4,
            Self::InterNetworkV6 => 16,
        }
    }
}

impl Default for AddressFamily {
    fn default() -> Self {
        Self::Unspecified
    }
}

/// Store `ip` in a zeroed 16 byte field.
///
/// IPv4 mapped IPv6 addresses are stored as plain IPv4.
pub fn address_to_bytes(ip: IpAddr) -> ([u8; 16], AddressFamily) {
    let mut bytes = [0u8; 16];
    match ip.to_canonical() {
        IpAddr::V4(v4) => {
            bytes[..4].copy_from_slice(&v4.octets());
            (bytes, AddressFamily::InterNetwork)
        }
        IpAddr::V6(v6) => {
            bytes.copy_from_slice(&v6.octets());
            (bytes, AddressFamily::InterNetworkV6)
        }
    }
}

/// Read an address back from a 16 byte field.
pub fn address_from_bytes(bytes: &[u8; 16], family: AddressFamily) -> Option<IpAddr> {
    match family {
        AddressFamily::InterNetwork => Some(IpAddr::V4(Ipv4Addr::new(
            bytes[0], bytes[1], bytes[2], bytes[3],
        ))),
        AddressFamily::InterNetworkV6 => Some(IpAddr::V6(Ipv6Addr::from(*bytes))),
        AddressFamily::Unspecified => None,
    }
}

/// Points a joining node to an externally hosted proxy.
///
/// The joining node forwards the same message to the proxy host, which
/// matches its token against the ones issued by the relay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExternalProxyConfig {
    /// Proxy host address.
    pub proxy_ip: [u8; 16],
    /// Family of `proxy_ip`.
    pub address_family: AddressFamily,
    /// Proxy host port.
    pub proxy_port: u16,
    /// Auth token.
    pub token: Hidden<[u8; 16]>,
}

impl ExternalProxyConfig {
    /// Proxy host address, `None` for an unknown family.
    pub fn proxy_addr(&self) -> Option<IpAddr> {
        address_from_bytes(&self.proxy_ip, self.address_family)
    }
}

impl Codec for ExternalProxyConfig {
    const SIZE: usize = 0x26;

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, Self::SIZE)?;
        let mut msg = Self::default();
        let mut buf = bytes;
        buf.copy_to_slice(&mut msg.proxy_ip);
        msg.address_family = AddressFamily::from_raw(buf.get_i32_le());
        msg.proxy_port = buf.get_u16_le();
        buf.copy_to_slice(&mut msg.token.0);
        Ok(msg)
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.proxy_ip);
        buf.put_i32_le(self.address_family.into());
        buf.put_u16_le(self.proxy_port);
        buf.put_slice(&self.token.0);
    }
}

/// Issued by the relay to a proxy host: who may join and as which virtual IP.
///
/// An all zero `physical_ip` accepts any physical address.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExternalProxyToken {
    /// Virtual IP to assign.
    pub virtual_ip: u32,
    /// Auth token.
    pub token: Hidden<[u8; 16]>,
    /// Expected physical address of the joining node.
    pub physical_ip: [u8; 16],
    /// Family of `physical_ip`.
    pub address_family: AddressFamily,
}

impl ExternalProxyToken {
    /// Token accepts a joiner from any address.
    pub fn is_wildcard(&self) -> bool {
        self.physical_ip == [0u8; 16]
    }
}

impl Codec for ExternalProxyToken {
    const SIZE: usize = 0x28;

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, Self::SIZE)?;
        let mut msg = Self::default();
        let mut buf = bytes;
        msg.virtual_ip = buf.get_u32_le();
        buf.copy_to_slice(&mut msg.token.0);
        buf.copy_to_slice(&mut msg.physical_ip);
        msg.address_family = AddressFamily::from_raw(buf.get_i32_le());
        Ok(msg)
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.virtual_ip);
        buf.put_slice(&self.token.0);
        buf.put_slice(&self.physical_ip);
        buf.put_i32_le(self.address_family.into());
    }
}

/// A virtual IP (dis)connected from an externally hosted proxy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExternalProxyConnectionState {
    /// Virtual IP of the node.
    pub ip_address: u32,
    /// New state.
    pub connected: bool,
}

impl Codec for ExternalProxyConnectionState {
    const SIZE: usize = 8;

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, Self::SIZE)?;
        let mut buf = bytes;
        Ok(Self {
            ip_address: buf.get_u32_le(),
            connected: buf.get_u8() != 0,
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.ip_address);
        buf.put_u8(self.connected as u8);
        buf.put_bytes(0, 3);
    }
}

/// Virtual IP and subnet assigned to a node in the proxy overlay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Assigned virtual IP.
    pub proxy_ip: u32,
    /// Overlay subnet mask.
    pub proxy_subnet_mask: u32,
}

impl ProxyConfig {
    /// Directed broadcast address of the overlay.
    pub fn broadcast_address(&self) -> u32 {
        self.proxy_ip | !self.proxy_subnet_mask
    }
}

impl Codec for ProxyConfig {
    const SIZE: usize = 8;

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, Self::SIZE)?;
        let mut buf = bytes;
        Ok(Self {
            proxy_ip: buf.get_u32_le(),
            proxy_subnet_mask: buf.get_u32_le(),
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.proxy_ip);
        buf.put_u32_le(self.proxy_subnet_mask);
    }
}

/// Transport protocol of proxied traffic, relayed as the raw socket value.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolType(pub i32);

/// Addressing shared by every proxied packet.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProxyInfo {
    /// Virtual source address, 0 when the sender socket is bound to any.
    pub source_ipv4: u32,
    /// Source port.
    pub source_port: u16,
    /// Virtual destination address.
    pub dest_ipv4: u32,
    /// Destination port.
    pub dest_port: u16,
    /// Transport protocol.
    pub protocol: ProtocolType,
}

impl Codec for ProxyInfo {
    const SIZE: usize = 0x10;

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, Self::SIZE)?;
        let mut buf = bytes;
        Ok(Self {
            source_ipv4: buf.get_u32_le(),
            source_port: buf.get_u16_le(),
            dest_ipv4: buf.get_u32_le(),
            dest_port: buf.get_u16_le(),
            protocol: ProtocolType(buf.get_i32_le()),
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.source_ipv4);
        buf.put_u16_le(self.source_port);
        buf.put_u32_le(self.dest_ipv4);
        buf.put_u16_le(self.dest_port);
        buf.put_i32_le(self.protocol.0);
    }
}

/// Open a proxied connection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProxyConnectRequest {
    /// Addressing.
    pub info: ProxyInfo,
}

/// Answer to [ProxyConnectRequest].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProxyConnectResponse {
    /// Addressing.
    pub info: ProxyInfo,
}

macro_rules! info_only {
    ($name:ident) => {
        impl Codec for $name {
            const SIZE: usize = ProxyInfo::SIZE;

            fn decode(bytes: &[u8]) -> Result<Self> {
                Ok(Self {
                    info: ProxyInfo::decode(bytes)?,
                })
            }

            fn encode<B: BufMut>(&self, buf: &mut B) {
                self.info.encode(buf);
            }
        }
    };
}

info_only!(ProxyConnectRequest);
info_only!(ProxyConnectResponse);

/// Header of proxied data, the payload travels as the packet tail.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProxyDataHeader {
    /// Addressing.
    pub info: ProxyInfo,
    /// Length of the payload.
    pub data_length: u32,
}

impl Codec for ProxyDataHeader {
    const SIZE: usize = 0x14;

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, Self::SIZE)?;
        let info = ProxyInfo::decode(bytes)?;
        let mut buf = &bytes[ProxyInfo::SIZE..];
        Ok(Self {
            info,
            data_length: buf.get_u32_le(),
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        self.info.encode(buf);
        buf.put_u32_le(self.data_length);
    }
}

/// Close a proxied connection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProxyDisconnectMessage {
    /// Addressing.
    pub info: ProxyInfo,
    /// Raw socket level reason.
    pub disconnect_reason: i32,
}

impl Codec for ProxyDisconnectMessage {
    const SIZE: usize = 0x14;

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, Self::SIZE)?;
        let info = ProxyInfo::decode(bytes)?;
        let mut buf = &bytes[ProxyInfo::SIZE..];
        Ok(Self {
            info,
            disconnect_reason: buf.get_i32_le(),
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        self.info.encode(buf);
        buf.put_i32_le(self.disconnect_reason);
    }
}
