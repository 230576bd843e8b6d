use bytes::{Buf, BufMut};

use super::{opaque_message, AddressFamily};
use crate::codec::{check_len, Codec, Result};

opaque_message!(
    /// Description of a hosted network as reported by the relay.
    NetworkInfo,
    0x480
);

opaque_message!(
    /// Filter narrowing down which networks a scan reports.
    ScanFilter,
    0x60
);

opaque_message!(
    /// Security, user and network configuration of a public access point.
    AccessPointConfig,
    0x94
);

opaque_message!(
    /// Security parameter, security, user, address and network configuration
    /// of a private access point.
    PrivateAccessPointConfig,
    0x114
);

opaque_message!(
    /// Join a public network.
    ConnectRequest,
    0x4FC
);

opaque_message!(
    /// Join a private network.
    ConnectPrivateRequest,
    0xBC
);

/// Relay specific part of an access point request.
///
/// Proxy fields stay zero unless this node hosts a peer to peer proxy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RyuNetworkConfig {
    /// Zero padded game version string.
    pub game_version: [u8; 16],
    /// Private address of the hosting node, used by joiners on the same LAN.
    pub private_ip: [u8; 16],
    /// Family of `private_ip`.
    pub address_family: AddressFamily,
    /// Publicly mapped proxy port.
    pub external_proxy_port: u16,
    /// Local proxy port.
    pub internal_proxy_port: u16,
}

impl Codec for RyuNetworkConfig {
    const SIZE: usize = 0x28;

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, Self::SIZE)?;
        let mut msg = Self::default();
        let mut buf = bytes;
        buf.copy_to_slice(&mut msg.game_version);
        buf.copy_to_slice(&mut msg.private_ip);
        msg.address_family = AddressFamily::from_raw(buf.get_i32_le());
        msg.external_proxy_port = buf.get_u16_le();
        msg.internal_proxy_port = buf.get_u16_le();
        Ok(msg)
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.game_version);
        buf.put_slice(&self.private_ip);
        buf.put_i32_le(self.address_family.into());
        buf.put_u16_le(self.external_proxy_port);
        buf.put_u16_le(self.internal_proxy_port);
    }
}

/// Host a public network. Advertise data travels as the packet tail.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CreateAccessPointRequest {
    /// Network parameters, relayed as is.
    pub config: AccessPointConfig,
    /// Relay specific parameters.
    pub network: RyuNetworkConfig,
}

impl Codec for CreateAccessPointRequest {
    const SIZE: usize = AccessPointConfig::SIZE + RyuNetworkConfig::SIZE;

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, Self::SIZE)?;
        Ok(Self {
            config: AccessPointConfig::decode(bytes)?,
            network: RyuNetworkConfig::decode(&bytes[AccessPointConfig::SIZE..])?,
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        self.config.encode(buf);
        self.network.encode(buf);
    }
}

/// Host a private network. Advertise data travels as the packet tail.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CreateAccessPointPrivateRequest {
    /// Network parameters, relayed as is.
    pub config: PrivateAccessPointConfig,
    /// Relay specific parameters.
    pub network: RyuNetworkConfig,
}

impl Codec for CreateAccessPointPrivateRequest {
    const SIZE: usize = PrivateAccessPointConfig::SIZE + RyuNetworkConfig::SIZE;

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, Self::SIZE)?;
        Ok(Self {
            config: PrivateAccessPointConfig::decode(bytes)?,
            network: RyuNetworkConfig::decode(&bytes[PrivateAccessPointConfig::SIZE..])?,
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        self.config.encode(buf);
        self.network.encode(buf);
    }
}
