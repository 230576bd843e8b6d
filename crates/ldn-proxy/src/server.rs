use std::{
    net::SocketAddr,
    sync::{Arc, Weak},
    time::Duration,
};

use parking_lot::RwLock;
use tokio::{
    sync::Notify,
    time::{timeout_at, Instant},
};

use ldn_proto::{
    address_to_bytes, ExternalProxyConfig, ExternalProxyConnectionState, ExternalProxyToken,
    Packet, ProxyConfig,
};
use ldn_utils::{ldn_log_debug, ldn_log_info, ldn_log_trace, ldn_log_warn};

use crate::{Error, Link, ProxyMessage, ProxySession};

/// Subnet mask of every overlay.
pub const SUBNET_MASK: u32 = 0xFFFF_0000;

/// Destination games use for broadcasts regardless of the overlay, 192.168.0.255.
pub const BROADCAST_SENTINEL: u32 = 0xC0A8_00FF;

#[derive(Default)]
struct Registry {
    sessions: Vec<Arc<ProxySession>>,
    tokens: Vec<ExternalProxyToken>,
    overlay: Option<ProxyConfig>,
}

/// Proxy hosted by the node owning the network.
///
/// Holds the tokens issued by the relay and the joined peers. Peers are
/// routed by virtual IP, broadcasts reach every peer including the sender.
pub struct ProxyServer {
    link: Arc<dyn Link>,
    auth_wait: Duration,
    registry: RwLock<Registry>,
    token_arrived: Notify,
}

impl ProxyServer {
    /// Create a server sending through `link`, waiting up to `auth_wait` for a joiner's token.
    pub fn new(link: Arc<dyn Link>, auth_wait: Duration) -> Arc<Self> {
        Arc::new(Self {
            link,
            auth_wait,
            registry: RwLock::new(Registry::default()),
            token_arrived: Notify::new(),
        })
    }

    /// Store a token issued by the relay and wake registrations waiting for it.
    pub fn register_token(&self, token: ExternalProxyToken) {
        ldn_log_debug!("Proxy token for virtual ip {:#010x}", token.virtual_ip);
        self.registry.write().tokens.push(token);
        self.token_arrived.notify_waiters();
    }

    /// Apply a relay notification about a virtual IP.
    ///
    /// A disconnect drops the tokens and peers for the IP without telling the relay back.
    pub fn handle_state_change(&self, state: ExternalProxyConnectionState) {
        if state.connected {
            return;
        }

        let removed: Vec<_> = {
            let mut registry = self.registry.write();
            registry.tokens.retain(|t| t.virtual_ip != state.ip_address);
            let (removed, kept) = registry
                .sessions
                .drain(..)
                .partition(|s| s.virtual_ip() == state.ip_address);
            registry.sessions = kept;
            removed
        };

        for session in removed {
            ldn_log_info!("Proxy peer {} left", session.endpoint());
            session.close();
        }
    }

    /// Authenticate a peer that sent `config`, waiting for a matching token up to the auth window.
    ///
    /// On success the peer gets its virtual IP and subnet in a `ProxyConfig` reply.
    pub async fn try_register_peer(
        self: &Arc<Self>,
        endpoint: SocketAddr,
        config: ExternalProxyConfig,
    ) -> Result<ProxyConfig, Error> {
        let deadline = Instant::now() + self.auth_wait;

        loop {
            let notified = self.token_arrived.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(reply) = self.claim_token(endpoint, &config) {
                ldn_log_info!(
                    "Proxy peer {} joined as {:#010x}",
                    endpoint,
                    reply.proxy_ip
                );
                self.link
                    .send_to(endpoint, &Packet::ProxyConfig(reply))
                    .await?;
                return Ok(reply);
            }

            if Instant::now() >= deadline {
                ldn_log_warn!("No proxy token for peer {}", endpoint);
                return Err(Error::NoMatchingToken);
            }

            // Timing out just leads to the final check above.
            let _ = timeout_at(deadline, notified).await;
        }
    }

    fn claim_token(
        self: &Arc<Self>,
        endpoint: SocketAddr,
        config: &ExternalProxyConfig,
    ) -> Option<ProxyConfig> {
        let (physical_ip, family) = address_to_bytes(endpoint.ip());

        let mut registry = self.registry.write();
        let index = registry.tokens.iter().position(|t| {
            t.token == config.token
                && (t.is_wildcard() || (t.address_family == family && t.physical_ip == physical_ip))
        })?;
        let token = registry.tokens.remove(index);

        let reply = ProxyConfig {
            proxy_ip: token.virtual_ip,
            proxy_subnet_mask: SUBNET_MASK,
        };

        if registry.sessions.is_empty() {
            registry.overlay = Some(reply);
        }

        if let Some(index) = registry.sessions.iter().position(|s| s.endpoint() == endpoint) {
            registry.sessions.remove(index).close();
        }

        let session = ProxySession::start(endpoint, token.virtual_ip, Arc::downgrade(self));
        registry.sessions.push(session);

        Some(reply)
    }

    /// Hand a datagram to the peer session it came from.
    ///
    /// Returns false when `endpoint` is not a joined peer.
    pub fn receive_peer_packet(&self, endpoint: SocketAddr, data: &[u8]) -> bool {
        let session = self
            .registry
            .read()
            .sessions
            .iter()
            .find(|s| s.endpoint() == endpoint)
            .cloned();

        match session {
            Some(session) => {
                if let Err(e) = session.enqueue(data.to_vec()) {
                    ldn_log_debug!("Dropping datagram from {}: {}", endpoint, e);
                }
                true
            }
            None => false,
        }
    }

    /// Deliver a message sent by the peer with virtual IP `sender_ip`.
    ///
    /// An unset source is stamped with the sender's IP, any other source
    /// must match it.
    pub async fn route(&self, sender_ip: u32, mut message: ProxyMessage) {
        let info = message.info_mut();
        if info.source_ipv4 == 0 {
            info.source_ipv4 = sender_ip;
        } else if info.source_ipv4 != sender_ip {
            ldn_log_trace!(
                "Dropping spoofed message {:#010x} from {:#010x}",
                info.source_ipv4,
                sender_ip
            );
            return;
        }

        let targets: Vec<SocketAddr> = {
            let registry = self.registry.read();
            let broadcast = registry.overlay.map(|o| o.broadcast_address());

            let mut dest = message.info().dest_ipv4;
            if dest == BROADCAST_SENTINEL {
                dest = broadcast.unwrap_or_default();
            }

            if Some(dest) == broadcast {
                registry.sessions.iter().map(|s| s.endpoint()).collect()
            } else {
                registry
                    .sessions
                    .iter()
                    .find(|s| s.virtual_ip() == dest)
                    .map(|s| s.endpoint())
                    .into_iter()
                    .collect()
            }
        };

        let packet = Packet::from(message);
        for target in targets {
            if let Err(e) = self.link.send_to(target, &packet).await {
                ldn_log_debug!("Failed to forward to {}: {}", target, e);
            }
        }
    }

    /// Drop the peer at `endpoint` and tell the relay its virtual IP is gone.
    pub async fn unregister_peer(&self, endpoint: SocketAddr) -> bool {
        self.remove_session(|s| s.endpoint() == endpoint).await
    }

    /// Drop `session` unless a rejoin of its endpoint already replaced it.
    pub(crate) async fn unregister_session(&self, session: &Weak<ProxySession>) -> bool {
        self.remove_session(|s| std::ptr::eq(Arc::as_ptr(s), session.as_ptr()))
            .await
    }

    async fn remove_session<F>(&self, is_target: F) -> bool
    where
        F: Fn(&Arc<ProxySession>) -> bool,
    {
        let removed = {
            let mut registry = self.registry.write();
            registry
                .sessions
                .iter()
                .position(is_target)
                .map(|index| registry.sessions.remove(index))
        };

        let session = match removed {
            Some(session) => session,
            None => return false,
        };
        session.close();

        let state = ExternalProxyConnectionState {
            ip_address: session.virtual_ip(),
            connected: false,
        };
        if let Err(e) = self
            .link
            .send_to_relay(&Packet::ExternalProxyState(state))
            .await
        {
            ldn_log_warn!("Failed to report proxy peer disconnect: {}", e);
        }
        true
    }

    /// Overlay subnet, known once the first peer joined.
    pub fn overlay(&self) -> Option<ProxyConfig> {
        self.registry.read().overlay
    }

    /// Joined peers as (endpoint, virtual IP).
    pub fn peers(&self) -> Vec<(SocketAddr, u32)> {
        self.registry
            .read()
            .sessions
            .iter()
            .map(|s| (s.endpoint(), s.virtual_ip()))
            .collect()
    }

    /// Stop every session and forget pending tokens.
    pub fn shutdown(&self) {
        let sessions = {
            let mut registry = self.registry.write();
            registry.tokens.clear();
            std::mem::take(&mut registry.sessions)
        };
        for session in sessions {
            session.close();
        }
    }
}
