//! Client side of the relay session.

mod link;
mod receiver;

use std::{
    io,
    net::SocketAddr,
    sync::Arc,
};

use parking_lot::Mutex;

use ldn_model::{validate_passphrase, Config, NetworkChange, ResultCode, Timeouts};
use ldn_proto::{
    address_to_bytes, AcceptPolicy, ConnectPrivateRequest, ConnectRequest,
    CreateAccessPointPrivateRequest, CreateAccessPointRequest, DisconnectMessage,
    DisconnectReason, DowncastPacket, ExternalProxyConfig, InitializeMessage, NetworkError, NetworkInfo, Packet,
    PassphraseMessage, ProxyConfig, RejectRequest, RyuNetworkConfig, ScanFilter,
    SetAcceptPolicyRequest,
};
use ldn_proxy::{Link, ProxyClient, ProxyMessage, ProxyServer};
use ldn_sockets::{
    local_interface, Connector, GetIfAddrs, SystemGetIfAddrs, Transport, UdpConnector, UdpParams,
};
use ldn_task::{
    io::{mc_chan, McChan},
    Task,
};
use ldn_utils::{
    ldn_log_debug, ldn_log_info, ldn_log_trace, ldn_log_warn, to_fixed, Hidden,
};

use crate::{
    signal::{wait_any, Latch},
    timeout::IdleTimeout,
    Error,
};

use self::{link::SessionLink, receiver::Receiver};

/// Lifecycle of the relay link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport.
    Idle,
    /// Transport open, waiting for the relay's handshake.
    Connecting,
    /// Handshake done.
    Connected,
}

/// Proxy events published to the game traffic layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyEvent {
    /// Relay assigned the overlay address, traffic goes through the relay.
    Configured(ProxyConfig),
    /// Proxied traffic addressed to this node.
    Message(ProxyMessage),
}

/// Connection to the LDN relay server.
///
/// Turns the asynchronous relay protocol into awaitable operations bounded
/// by the configured timeouts. Depending on the network the node either
/// hosts a [ProxyServer] for joining peers, or joins a peer hosted proxy
/// through a [ProxyClient].
///
/// Call [MasterSession::disconnect_and_stop] when done with it.
#[derive(Clone)]
pub struct MasterSession {
    inner: Arc<Inner>,
}

struct Inner {
    relay: SocketAddr,
    timeouts: Timeouts,
    connector: Arc<dyn Connector>,
    interfaces: Box<dyn GetIfAddrs>,
    transport: Mutex<Option<Arc<dyn Transport>>>,
    receiver: Mutex<Option<Task<Receiver>>>,
    state: Mutex<State>,
    latches: Latches,
    idle: IdleTimeout,
    network_changes: mc_chan::Tx<NetworkChange>,
    proxy_events: mc_chan::Tx<ProxyEvent>,
}

struct Latches {
    connected: Latch,
    error: Latch,
    scan: Latch,
    reject: Latch,
    ap_connected: Latch,
}

impl Default for Latches {
    fn default() -> Self {
        Self {
            connected: Latch::manual(),
            error: Latch::manual(),
            scan: Latch::manual(),
            reject: Latch::manual(),
            ap_connected: Latch::auto(),
        }
    }
}

struct State {
    phase: SessionState,
    // Handshake reply, replayed on reconnect so the relay keeps our identity.
    initialize: InitializeMessage,
    passphrase: Hidden<String>,
    passphrase_sent: Option<Hidden<String>>,
    use_p2p: bool,
    last_error: NetworkError,
    networks: Vec<NetworkInfo>,
    disconnect_reason: DisconnectReason,
    hosted: Option<Arc<ProxyServer>>,
    joined: Option<Arc<ProxyClient>>,
    network_connected: bool,
    proxy_config: Option<ProxyConfig>,
    game_version: [u8; 16],
}

impl State {
    fn new(config: &Config) -> Self {
        Self {
            phase: SessionState::Idle,
            initialize: InitializeMessage::default(),
            passphrase: config.passphrase.clone(),
            passphrase_sent: None,
            use_p2p: !config.disable_p2p,
            last_error: NetworkError::None,
            networks: Vec::new(),
            disconnect_reason: DisconnectReason::None,
            hosted: None,
            joined: None,
            network_connected: false,
            proxy_config: None,
            game_version: [0; 16],
        }
    }
}

impl MasterSession {
    /// Session for `config` using a UDP socket on the configured bind address.
    pub fn new(config: Config) -> Result<Self, Error> {
        let connector = Arc::new(UdpConnector::new(
            config.bind_address,
            UdpParams::default(),
        ));
        Self::with_connector(config, connector, Box::new(SystemGetIfAddrs))
    }

    /// Session opening its transports through `connector`.
    pub fn with_connector(
        config: Config,
        connector: Arc<dyn Connector>,
        interfaces: Box<dyn GetIfAddrs>,
    ) -> Result<Self, Error> {
        let relay = config.server.resolve()?;

        Ok(Self {
            inner: Arc::new(Inner {
                relay,
                timeouts: config.timeouts,
                connector,
                interfaces,
                transport: Mutex::new(None),
                receiver: Mutex::new(None),
                state: Mutex::new(State::new(&config)),
                latches: Latches::default(),
                idle: IdleTimeout::new(config.timeouts.inactive),
                network_changes: McChan::default().tx,
                proxy_events: McChan::default().tx,
            }),
        })
    }

    /// Current link state.
    pub fn state(&self) -> SessionState {
        self.inner.state.lock().phase
    }

    /// Overlay address once a network is joined through a proxy.
    pub fn proxy_config(&self) -> Option<ProxyConfig> {
        self.inner.state.lock().proxy_config
    }

    /// Relay endpoint.
    pub fn relay(&self) -> SocketAddr {
        self.inner.relay
    }

    /// Local address of the open transport.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner
            .transport
            .lock()
            .as_ref()
            .and_then(|t| t.local_addr().ok())
    }

    /// Notifications about the joined or hosted network.
    pub fn subscribe_network_changes(&self) -> mc_chan::Rx<NetworkChange> {
        self.inner.network_changes.subscribe()
    }

    /// Proxied traffic and relay proxy configuration.
    pub fn subscribe_proxy(&self) -> mc_chan::Rx<ProxyEvent> {
        self.inner.proxy_events.subscribe()
    }

    /// Passphrase used from the next relay round trip on.
    ///
    /// Passphrases longer than the wire field are refused and the previous
    /// one stays in use.
    pub fn set_passphrase(&self, passphrase: &str) -> Result<(), Error> {
        validate_passphrase(passphrase)?;
        self.inner.state.lock().passphrase = Hidden(passphrase.to_owned());
        Ok(())
    }

    /// Version string advertised in create requests, zero padded to 16 bytes.
    pub fn set_game_version(&self, version: &[u8]) {
        self.inner.state.lock().game_version = to_fixed(version);
    }

    /// Host a public network.
    ///
    /// Returns false when the relay did not confirm it within the failure timeout.
    pub async fn create_network(
        &self,
        mut request: CreateAccessPointRequest,
        advertise_data: &[u8],
    ) -> bool {
        let inner = &self.inner;
        inner.idle.disable();
        inner.configure_access_point();

        if !inner.ensure_connected().await {
            inner.dispose_hosted_proxy();
            return false;
        }

        inner.advertise(&mut request.network);
        inner
            .send_to_relay(&Packet::CreateAccessPoint(request, advertise_data.to_vec()))
            .await;
        inner.update_passphrase_if_needed().await;

        inner.create_network_common().await
    }

    /// Host a private network.
    pub async fn create_network_private(
        &self,
        mut request: CreateAccessPointPrivateRequest,
        advertise_data: &[u8],
    ) -> bool {
        let inner = &self.inner;
        inner.idle.disable();
        inner.configure_access_point();

        if !inner.ensure_connected().await {
            inner.dispose_hosted_proxy();
            return false;
        }

        inner.update_passphrase_if_needed().await;
        inner.advertise(&mut request.network);
        inner
            .send_to_relay(&Packet::CreateAccessPointPrivate(
                request,
                advertise_data.to_vec(),
            ))
            .await;

        inner.create_network_common().await
    }

    /// Networks visible to this node, empty on timeout or relay error.
    pub async fn scan(&self, channel: u16, filter: ScanFilter) -> Vec<NetworkInfo> {
        let inner = &self.inner;
        if !inner.network_connected() {
            inner.refresh_idle();
        }

        inner.state.lock().networks.clear();

        let mut index = None;
        if inner.ensure_connected().await {
            inner.update_passphrase_if_needed().await;

            inner.latches.scan.reset();
            inner.latches.error.reset();
            ldn_log_debug!("Scanning channel {}", channel);
            inner.send_to_relay(&Packet::Scan(filter)).await;

            index = wait_any(
                &[&inner.latches.scan, &inner.latches.error],
                inner.timeouts.scan,
            )
            .await;
        }

        let error = inner.consume_error();
        match index {
            Some(0) if error == NetworkError::None => inner.state.lock().networks.clone(),
            _ => {
                if error != NetworkError::None {
                    ldn_log_debug!("Scan failed: {:?}", error);
                }
                Vec::new()
            }
        }
    }

    /// Join a public network.
    pub async fn connect(&self, request: ConnectRequest) -> NetworkError {
        self.inner.idle.disable();
        if !self.inner.ensure_connected().await {
            return NetworkError::Unknown;
        }

        self.inner.latches.error.reset();
        self.inner.send_to_relay(&Packet::Connect(request)).await;

        self.inner.connect_common().await
    }

    /// Join a private network.
    pub async fn connect_private(&self, request: ConnectPrivateRequest) -> NetworkError {
        self.inner.idle.disable();
        if !self.inner.ensure_connected().await {
            return NetworkError::Unknown;
        }

        self.inner.latches.error.reset();
        self.inner
            .send_to_relay(&Packet::ConnectPrivate(request))
            .await;

        self.inner.connect_common().await
    }

    /// Remove a station from the hosted network.
    pub async fn reject(&self, reason: DisconnectReason, node_id: u32) -> ResultCode {
        let inner = &self.inner;
        if !inner.network_connected() {
            return ResultCode::InvalidState;
        }

        inner.latches.reject.reset();
        inner.latches.error.reset();
        inner
            .send_to_relay(&Packet::Reject(RejectRequest {
                node_id,
                disconnect_reason: reason,
            }))
            .await;

        let index = wait_any(
            &[&inner.latches.reject, &inner.latches.error],
            inner.timeouts.inactive,
        )
        .await;

        match (index, inner.consume_error()) {
            (Some(0), NetworkError::None) => ResultCode::Success,
            _ => ResultCode::InvalidState,
        }
    }

    /// Replace the advertise data of the hosted network.
    pub async fn set_advertise_data(&self, data: &[u8]) {
        if self.inner.network_connected() {
            self.inner
                .send_to_relay(&Packet::SetAdvertiseData(data.to_vec()))
                .await;
        }
    }

    /// Change who may join the hosted network.
    pub async fn set_station_accept_policy(&self, policy: AcceptPolicy) {
        if self.inner.network_connected() {
            self.inner
                .send_to_relay(&Packet::SetAcceptPolicy(SetAcceptPolicyRequest {
                    station_accept_policy: policy,
                }))
                .await;
        }
    }

    /// Leave the current network.
    pub async fn disconnect_network(&self) {
        if self.inner.network_connected() {
            self.inner
                .send_to_relay(&Packet::Disconnect(DisconnectMessage::default()))
                .await;
            self.inner.disconnect_internal();
        }
    }

    /// Send game traffic to the joined proxy host, or to the relay.
    pub async fn send_proxy(&self, message: ProxyMessage) -> Result<(), Error> {
        let joined = {
            let state = self.inner.state.lock();
            if state.phase == SessionState::Idle {
                return Err(Error::NotStarted);
            }
            state.joined.clone()
        };

        match joined {
            Some(client) => client.send(message).await?,
            None => {
                self.inner
                    .send(self.inner.relay, &message.into())
                    .await?
            }
        }
        Ok(())
    }

    /// Close the transport, leaving any network.
    pub async fn stop(&self) {
        self.inner.stop().await;
    }

    /// Cancel the idle timeout and stop.
    pub async fn disconnect_and_stop(&self) {
        self.inner.idle.disable();
        self.inner.stop().await;
    }
}

impl Inner {
    fn link(self: &Arc<Self>) -> Arc<dyn Link> {
        Arc::new(SessionLink::new(Arc::downgrade(self)))
    }

    fn network_connected(&self) -> bool {
        self.state.lock().network_connected
    }

    fn hosted(&self) -> Option<Arc<ProxyServer>> {
        self.state.lock().hosted.clone()
    }

    fn joined(&self) -> Option<Arc<ProxyClient>> {
        self.state.lock().joined.clone()
    }

    fn consume_error(&self) -> NetworkError {
        std::mem::take(&mut self.state.lock().last_error)
    }

    async fn send(&self, target: SocketAddr, packet: &Packet) -> io::Result<()> {
        let transport = self
            .transport
            .lock()
            .clone()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        let bytes = packet
            .encode()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        transport.send_to(&bytes, target).await?;
        Ok(())
    }

    async fn send_to_relay(&self, packet: &Packet) -> bool {
        match self.send(self.relay, packet).await {
            Ok(()) => true,
            Err(e) => {
                ldn_log_warn!("Failed to send {} to relay: {}", packet.packet_id(), e);
                false
            }
        }
    }

    fn refresh_idle(self: &Arc<Self>) {
        let session = Arc::downgrade(self);
        self.idle.refresh(async move {
            if let Some(session) = session.upgrade() {
                ldn_log_info!("Relay session idle, stopping");
                session.stop().await;
            }
        });
    }

    async fn ensure_connected(self: &Arc<Self>) -> bool {
        if self.state.lock().phase != SessionState::Idle {
            return true;
        }

        if let Err(e) = self.start().await {
            ldn_log_warn!("Failed to open relay session: {}", e);
            return false;
        }

        let index = wait_any(
            &[&self.latches.connected, &self.latches.error],
            self.timeouts.failure,
        )
        .await;

        if self.state.lock().phase != SessionState::Idle && index == Some(0) {
            self.update_passphrase_if_needed().await;
            return true;
        }

        let error = self.consume_error();
        ldn_log_warn!("Relay handshake failed: {:?}", error);
        false
    }

    async fn start(self: &Arc<Self>) -> Result<(), Error> {
        let previous = self.receiver.lock().take();
        if let Some(previous) = previous {
            previous.stop().await;
        }

        let transport = self.connector.connect().await?;
        ldn_log_info!(
            "Relay session to {} opened on {:?}",
            self.relay,
            transport.local_addr()
        );

        self.latches.connected.reset();
        self.latches.error.reset();
        let initialize = {
            let mut state = self.state.lock();
            state.phase = SessionState::Connecting;
            state.initialize
        };

        *self.transport.lock() = Some(transport.clone());
        *self.receiver.lock() = Some(Task::start(Receiver::new(
            transport,
            Arc::downgrade(self),
        )));

        self.send_to_relay(&Packet::Initialize(initialize)).await;
        Ok(())
    }

    async fn stop(&self) {
        let receiver = self.receiver.lock().take();
        if let Some(receiver) = receiver {
            receiver.stop().await;
        }
    }

    /// Receive loop ended, the transport is gone.
    fn on_stopped(&self) {
        ldn_log_info!("Relay session to {} closed", self.relay);
        {
            let mut state = self.state.lock();
            state.phase = SessionState::Idle;
            state.passphrase_sent = None;
        }
        *self.transport.lock() = None;

        self.disconnect_internal();
    }

    async fn update_passphrase_if_needed(&self) {
        let passphrase = {
            let mut state = self.state.lock();
            if state.passphrase_sent.as_ref() == Some(&state.passphrase) {
                None
            } else {
                state.passphrase_sent = Some(state.passphrase.clone());
                Some(state.passphrase.clone())
            }
        };

        if let Some(passphrase) = passphrase {
            ldn_log_debug!("Updating passphrase to {}", passphrase);
            self.send_to_relay(&Packet::Passphrase(PassphraseMessage::new(&passphrase)))
                .await;
        }
    }

    fn configure_access_point(self: &Arc<Self>) {
        let previous = {
            let mut state = self.state.lock();
            if !state.use_p2p {
                return;
            }
            let server = ProxyServer::new(self.link(), self.timeouts.auth_wait);
            state.hosted.replace(server)
        };

        if let Some(previous) = previous {
            previous.shutdown();
        }
    }

    fn dispose_hosted_proxy(&self) {
        let hosted = self.state.lock().hosted.take();
        if let Some(hosted) = hosted {
            hosted.shutdown();
        }
    }

    fn advertise(&self, network: &mut RyuNetworkConfig) {
        let (game_version, hosting) = {
            let state = self.state.lock();
            (state.game_version, state.hosted.is_some())
        };
        network.game_version = game_version;

        if !hosting {
            return;
        }

        let port = match self.transport.lock().as_ref().map(|t| t.local_addr()) {
            Some(Ok(addr)) => addr.port(),
            _ => return,
        };

        match local_interface(self.interfaces.as_ref()) {
            Ok(Some(ip)) => {
                let (private_ip, address_family) = address_to_bytes(ip);
                network.private_ip = private_ip;
                network.address_family = address_family;
                network.internal_proxy_port = port;
                network.external_proxy_port = 0;
                ldn_log_info!("Hosting proxy on {}:{}", ip, port);
            }
            Ok(None) => ldn_log_warn!("No LAN interface to host a proxy on"),
            Err(e) => ldn_log_warn!("Failed to read local interfaces: {}", e),
        }
    }

    async fn create_network_common(&self) -> bool {
        let signalled = wait_any(&[&self.latches.ap_connected], self.timeouts.failure)
            .await
            .is_some();
        ldn_log_debug!("Create network confirmed: {}", signalled);

        let (use_p2p, hosting, joined) = {
            let state = self.state.lock();
            (state.use_p2p, state.hosted.is_some(), state.joined.clone())
        };

        if !use_p2p && hosting {
            ldn_log_warn!(
                "Hosted proxy is not reachable from outside, proxying through the relay instead"
            );
            self.dispose_hosted_proxy();
        }

        match (signalled, joined) {
            (true, Some(client)) => self.finalize_proxy(&client).await,
            (true, None) => (),
            (false, _) => self.dispose_hosted_proxy(),
        }

        signalled
    }

    async fn connect_common(&self) -> NetworkError {
        let index = wait_any(
            &[&self.latches.ap_connected, &self.latches.error],
            self.timeouts.failure,
        )
        .await;

        let error = self.consume_error();
        if error != NetworkError::None {
            return error;
        }

        if index != Some(0) {
            return NetworkError::ConnectTimeout;
        }

        if let Some(client) = self.joined() {
            self.finalize_proxy(&client).await;
        }

        NetworkError::None
    }

    async fn finalize_proxy(&self, client: &ProxyClient) {
        let config = client.ensure_ready(self.timeouts.failure).await;
        self.state.lock().proxy_config = config;
    }

    fn disconnect_internal(&self) {
        let (hosted, reason) = {
            let mut state = self.state.lock();
            if !state.network_connected {
                return;
            }
            state.network_connected = false;
            state.joined = None;
            state.proxy_config = None;
            (state.hosted.take(), state.disconnect_reason)
        };

        if let Some(hosted) = hosted {
            hosted.shutdown();
        }
        self.latches.ap_connected.reset();

        ldn_log_info!("Left network: {:?}", reason);
        let _ = self
            .network_changes
            .send(NetworkChange::disconnected(reason));
    }

    async fn handle_packet(self: &Arc<Self>, from: SocketAddr, packet: Packet) {
        ldn_log_trace!("Received {} from {}", packet.packet_id(), from);

        match packet {
            Packet::Initialize(message) => self.handle_initialize(message),
            Packet::Connected(info) => self.handle_connected(info),
            Packet::SyncNetwork(info) => {
                self.send_to_relay(&Packet::SyncNetwork(info.clone())).await;
                let _ = self.network_changes.send(NetworkChange::connected(info));
            }
            Packet::Reject(request) => {
                // We are being removed, the relay disconnects us shortly.
                self.state.lock().disconnect_reason = request.disconnect_reason;
            }
            Packet::RejectReply => self.latches.reject.set(),
            Packet::Disconnect(_) => self.disconnect_internal(),
            Packet::ScanReply(info) => {
                self.state.lock().networks.push(info);
            }
            Packet::ScanReplyEnd => self.latches.scan.set(),
            Packet::ExternalProxy(config) => self.handle_external_proxy(from, config).await,
            Packet::ExternalProxyToken(token) => match self.hosted() {
                Some(hosted) => hosted.register_token(token),
                None => ldn_log_debug!("Proxy token without a hosted proxy"),
            },
            Packet::ExternalProxyState(state) => {
                if let Some(hosted) = self.hosted() {
                    hosted.handle_state_change(state);
                }
            }
            Packet::ProxyConfig(config) => self.handle_proxy_config(config).await,
            Packet::Ping(ping) => {
                if ping.requester == 0 {
                    self.send_to_relay(&Packet::Ping(ping)).await;
                }
            }
            Packet::TestPing(ping) => ldn_log_debug!("Test ping {} from {}", ping.id, from),
            Packet::NetworkError(message) => self.handle_network_error(message.error),
            other => match ProxyMessage::downcast(other) {
                Ok(message) => {
                    let _ = self.proxy_events.send(ProxyEvent::Message(message));
                }
                Err(other) => {
                    ldn_log_debug!("Unexpected {} from {}", other.packet_id(), from)
                }
            },
        }
    }

    fn handle_initialize(&self, message: InitializeMessage) {
        {
            let mut state = self.state.lock();
            state.initialize = message;
            state.phase = SessionState::Connected;
        }
        self.latches.connected.set();
    }

    fn handle_connected(&self, info: NetworkInfo) {
        {
            let mut state = self.state.lock();
            state.network_connected = true;
            state.disconnect_reason = DisconnectReason::None;
        }
        self.latches.ap_connected.set();

        ldn_log_info!("Joined network");
        let _ = self.network_changes.send(NetworkChange::connected(info));
    }

    async fn handle_external_proxy(self: &Arc<Self>, from: SocketAddr, config: ExternalProxyConfig) {
        if from != self.relay {
            match self.hosted() {
                Some(hosted) => {
                    tokio::spawn(async move {
                        if let Err(e) = hosted.try_register_peer(from, config).await {
                            ldn_log_debug!("Proxy peer {} not admitted: {}", from, e);
                        }
                    });
                }
                None => ldn_log_debug!("Proxy auth from {} without a hosted proxy", from),
            }
            return;
        }

        let host = match config.proxy_addr() {
            Some(ip) => SocketAddr::new(ip, config.proxy_port),
            None => {
                ldn_log_warn!("Relay sent an invalid external proxy");
                return;
            }
        };

        let client = Arc::new(ProxyClient::new(self.link(), host));
        self.state.lock().joined = Some(client.clone());

        if let Err(e) = client.perform_auth(config).await {
            ldn_log_warn!("Proxy auth with {} failed: {}", host, e);
            self.disconnect_internal();
        }
    }

    async fn handle_proxy_config(&self, config: ProxyConfig) {
        if let Some(client) = self.joined() {
            if let Err(e) = client.handle_proxy_config(config).await {
                ldn_log_warn!("Failed to confirm proxy config: {}", e);
            }
            return;
        }

        ldn_log_info!("Relay assigned overlay address {:#010x}", config.proxy_ip);
        self.state.lock().proxy_config = Some(config);
        self.send_to_relay(&Packet::ProxyConfig(config)).await;
        let _ = self.proxy_events.send(ProxyEvent::Configured(config));
    }

    fn handle_network_error(&self, error: NetworkError) {
        if error == NetworkError::PortUnreachable {
            ldn_log_warn!("Relay can't reach our proxy, falling back to relayed traffic");
            self.state.lock().use_p2p = false;
            return;
        }

        ldn_log_debug!("Relay reported {:?}", error);
        self.state.lock().last_error = error;
        self.latches.error.set();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use ldn_proto::{AddressFamily, CreateAccessPointRequest};
    use ldn_sockets::{MockConnector, MockGetIfAddrs, MockTransport};

    use super::*;

    fn config() -> Config {
        let mut config = Config::default();
        config.timeouts.failure = Duration::from_millis(200);
        config.timeouts.scan = Duration::from_millis(200);
        config
    }

    fn session(config: Config, interfaces: MockGetIfAddrs) -> MasterSession {
        let mut connector = MockConnector::new();
        connector
            .expect_connect()
            .returning(|| Err(io::Error::from(io::ErrorKind::AddrNotAvailable)));
        MasterSession::with_connector(config, Arc::new(connector), Box::new(interfaces)).unwrap()
    }

    fn attach_transport(session: &MasterSession, port: u16) {
        let mut transport = MockTransport::new();
        transport
            .expect_local_addr()
            .returning(move || Ok(SocketAddr::from(([0, 0, 0, 0], port))));
        *session.inner.transport.lock() = Some(Arc::new(transport));
    }

    #[tokio::test]
    async fn operations_fail_when_transport_cannot_open() {
        let session = session(config(), MockGetIfAddrs::new());

        assert!(
            !session
                .create_network(CreateAccessPointRequest::default(), &[])
                .await
        );
        assert!(session.inner.hosted().is_none());
        assert!(session.scan(1, ScanFilter::default()).await.is_empty());
        assert_eq!(
            session.connect(ConnectRequest::default()).await,
            NetworkError::Unknown
        );
        assert_eq!(session.state(), SessionState::Idle);

        session.disconnect_and_stop().await;
    }

    #[tokio::test]
    async fn proxy_traffic_needs_a_started_session() {
        let session = session(config(), MockGetIfAddrs::new());
        let message = ProxyMessage::Data(Default::default(), vec![1, 2, 3]);

        assert!(matches!(
            session.send_proxy(message).await,
            Err(Error::NotStarted)
        ));
    }

    #[tokio::test]
    async fn reject_outside_a_network_is_invalid() {
        let session = session(config(), MockGetIfAddrs::new());
        assert_eq!(
            session.reject(DisconnectReason::Admin, 1).await,
            ResultCode::InvalidState
        );
    }

    #[rstest]
    #[case(NetworkError::PortUnreachable, false)]
    #[case(NetworkError::ConnectTimeout, true)]
    #[case(NetworkError::TooManyPlayers, true)]
    fn relay_errors(#[case] error: NetworkError, #[case] reported: bool) {
        let session = session(config(), MockGetIfAddrs::new());
        session.inner.handle_network_error(error);

        assert_eq!(session.inner.latches.error.is_set(), reported);
        assert_eq!(session.inner.state.lock().use_p2p, reported);
        let expected = if reported { error } else { NetworkError::None };
        assert_eq!(session.inner.consume_error(), expected);
    }

    #[tokio::test]
    async fn advertise_without_hosting_only_stamps_version() {
        let mut config = config();
        config.disable_p2p = true;
        // No interface lookups expected.
        let session = session(config, MockGetIfAddrs::new());
        session.set_game_version(b"1.0.2");
        attach_transport(&session, 30500);

        session.inner.configure_access_point();
        let mut network = RyuNetworkConfig::default();
        session.inner.advertise(&mut network);

        assert_eq!(&network.game_version[..6], b"1.0.2\0");
        assert_eq!(network.internal_proxy_port, 0);
        assert_eq!(network.address_family, AddressFamily::Unspecified);
    }

    #[tokio::test]
    async fn advertise_while_hosting_without_lan_leaves_proxy_empty() {
        let mut interfaces = MockGetIfAddrs::new();
        interfaces.expect_get().once().returning(|| Ok(Vec::new()));
        let session = session(config(), interfaces);
        attach_transport(&session, 30500);

        session.inner.configure_access_point();
        assert!(session.inner.hosted().is_some());

        let mut network = RyuNetworkConfig::default();
        session.inner.advertise(&mut network);
        assert_eq!(network.internal_proxy_port, 0);
        assert_eq!(network.private_ip, [0; 16]);

        session.inner.dispose_hosted_proxy();
        assert!(session.inner.hosted().is_none());
    }
}
