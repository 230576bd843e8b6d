use std::{net::SocketAddr, sync::Arc, time::Duration};

use tokio::sync::watch;

use ldn_proto::{ExternalProxyConfig, Packet, ProxyConfig};
use ldn_utils::{ldn_log_debug, ldn_log_warn};

use crate::{Error, Link, ProxyMessage};

/// Connection to a proxy hosted by another node.
pub struct ProxyClient {
    link: Arc<dyn Link>,
    endpoint: SocketAddr,
    config: watch::Sender<Option<ProxyConfig>>,
}

impl ProxyClient {
    /// Client for the proxy host at `endpoint`.
    pub fn new(link: Arc<dyn Link>, endpoint: SocketAddr) -> Self {
        Self {
            link,
            endpoint,
            config: watch::channel(None).0,
        }
    }

    /// Proxy host address.
    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    /// Present the relay issued token to the host.
    pub async fn perform_auth(&self, config: ExternalProxyConfig) -> Result<(), Error> {
        ldn_log_debug!("Authenticating with proxy {}", self.endpoint);
        self.link
            .send_to(self.endpoint, &Packet::ExternalProxy(config))
            .await?;
        Ok(())
    }

    /// Accept the virtual IP assigned by the host and confirm it back.
    pub async fn handle_proxy_config(&self, config: ProxyConfig) -> Result<(), Error> {
        self.config.send_replace(Some(config));
        self.link
            .send_to(self.endpoint, &Packet::ProxyConfig(config))
            .await?;
        Ok(())
    }

    /// Assigned overlay address, if authenticated.
    pub fn proxy_config(&self) -> Option<ProxyConfig> {
        *self.config.borrow()
    }

    /// Wait up to `timeout` for the host to assign an address.
    pub async fn ensure_ready(&self, timeout: Duration) -> Option<ProxyConfig> {
        let mut rx = self.config.subscribe();
        let config = match tokio::time::timeout(timeout, rx.wait_for(Option::is_some)).await {
            Ok(Ok(config)) => *config,
            _ => None,
        };
        if config.is_none() {
            ldn_log_warn!("Proxy {} did not assign an address in time", self.endpoint);
        }
        config
    }

    /// Send proxied traffic to the host.
    pub async fn send(&self, message: ProxyMessage) -> Result<(), Error> {
        self.link.send_to(self.endpoint, &message.into()).await?;
        Ok(())
    }
}
