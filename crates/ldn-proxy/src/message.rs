use ldn_proto::{
    DowncastPacket, Packet, ProxyConnectRequest, ProxyConnectResponse, ProxyDataHeader,
    ProxyDisconnectMessage, ProxyInfo,
};

/// Proxied traffic routed through the overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyMessage {
    /// Connection request.
    Connect(ProxyConnectRequest),
    /// Connection reply.
    ConnectReply(ProxyConnectResponse),
    /// Data with its payload.
    Data(ProxyDataHeader, Vec<u8>),
    /// Connection closed.
    Disconnect(ProxyDisconnectMessage),
}

impl ProxyMessage {
    /// Addressing of the message.
    pub fn info(&self) -> &ProxyInfo {
        match self {
            Self::Connect(m) => &m.info,
            Self::ConnectReply(m) => &m.info,
            Self::Data(h, _) => &h.info,
            Self::Disconnect(m) => &m.info,
        }
    }

    /// Mutable addressing of the message.
    pub fn info_mut(&mut self) -> &mut ProxyInfo {
        match self {
            Self::Connect(m) => &mut m.info,
            Self::ConnectReply(m) => &mut m.info,
            Self::Data(h, _) => &mut h.info,
            Self::Disconnect(m) => &mut m.info,
        }
    }
}

impl DowncastPacket<Packet> for ProxyMessage {
    fn downcast(packet: Packet) -> Result<Self, Packet> {
        match packet {
            Packet::ProxyConnect(m) => Ok(Self::Connect(m)),
            Packet::ProxyConnectReply(m) => Ok(Self::ConnectReply(m)),
            Packet::ProxyData(h, data) => Ok(Self::Data(h, data)),
            Packet::ProxyDisconnect(m) => Ok(Self::Disconnect(m)),
            other => Err(other),
        }
    }
}

impl From<ProxyMessage> for Packet {
    fn from(other: ProxyMessage) -> Self {
        match other {
            ProxyMessage::Connect(m) => Packet::ProxyConnect(m),
            ProxyMessage::ConnectReply(m) => Packet::ProxyConnectReply(m),
            ProxyMessage::Data(h, data) => Packet::ProxyData(h, data),
            ProxyMessage::Disconnect(m) => Packet::ProxyDisconnect(m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldn_proto::RejectRequest;

    #[test]
    fn downcast_only_proxy_traffic() {
        let msg = ProxyMessage::Data(ProxyDataHeader::default(), vec![1, 2]);
        let packet: Packet = msg.clone().into();
        assert_eq!(ProxyMessage::downcast(packet), Ok(msg));

        let other = Packet::Reject(RejectRequest::default());
        assert_eq!(ProxyMessage::downcast(other.clone()), Err(other));
    }
}
