use std::{
    net::SocketAddr,
    sync::{Arc, Weak},
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::error::TrySendError;

use ldn_proto::{DowncastPacket, WireCodec};
use ldn_task::{
    io::{chan, Chan},
    Runtime, RuntimeExt, StopResult, Task, WaitResponse,
};
use ldn_utils::{ldn_log_debug, ldn_log_trace, ldn_log_warn};

use crate::{Error, ProxyMessage, ProxyServer};

/// A joined peer of a hosted proxy.
///
/// Datagrams from the peer are queued and decoded on the session's own
/// worker, so one slow or broken peer does not hold up the receive loop.
pub struct ProxySession {
    endpoint: SocketAddr,
    virtual_ip: u32,
    tx: chan::Tx<Vec<u8>>,
    task: Mutex<Option<Task<SessionWorker>>>,
}

struct SessionWorker {
    session: Weak<ProxySession>,
    endpoint: SocketAddr,
    virtual_ip: u32,
    rx: chan::Rx<Vec<u8>>,
    codec: WireCodec,
    server: Weak<ProxyServer>,
}

impl ProxySession {
    pub(crate) fn start(endpoint: SocketAddr, virtual_ip: u32, server: Weak<ProxyServer>) -> Arc<Self> {
        Arc::new_cyclic(|session| {
            let Chan { rx, tx } = Chan::default();
            let task = Task::start(SessionWorker {
                session: session.clone(),
                endpoint,
                virtual_ip,
                rx,
                codec: WireCodec::new(),
                server,
            });

            Self {
                endpoint,
                virtual_ip,
                tx,
                task: Mutex::new(Some(task)),
            }
        })
    }

    /// Physical endpoint of the peer.
    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    /// Virtual IPv4 assigned to the peer.
    pub fn virtual_ip(&self) -> u32 {
        self.virtual_ip
    }

    /// Queue a datagram received from the peer.
    pub fn enqueue(&self, data: Vec<u8>) -> Result<(), Error> {
        match self.tx.try_send(data) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                ldn_log_warn!("Proxy session {} queue full, dropping datagram", self.endpoint);
                Err(Error::SessionClosed)
            }
            Err(TrySendError::Closed(_)) => Err(Error::SessionClosed),
        }
    }

    /// Stop the worker. Does not wait for it, may be called from the worker itself.
    pub(crate) fn close(&self) {
        if let Some(task) = self.task.lock().take() {
            let endpoint = self.endpoint;
            tokio::spawn(async move {
                match task.stop().await {
                    StopResult::Err(e) => {
                        ldn_log_debug!("Proxy session {} ended with: {}", endpoint, e)
                    }
                    StopResult::Panic(_) => ldn_log_warn!("Proxy session {} panicked", endpoint),
                    StopResult::Ok => (),
                }
            });
        }
    }
}

impl SessionWorker {
    async fn handle(&mut self, data: Vec<u8>) -> Result<(), Error> {
        let server = self.server.upgrade().ok_or(Error::SessionClosed)?;

        let mut packets = Vec::new();
        let res = self.codec.feed(&data, |frame| packets.push(frame.packet));

        for packet in packets {
            match ProxyMessage::downcast(packet) {
                Ok(message) => server.route(self.virtual_ip, message).await,
                Err(other) => {
                    ldn_log_trace!("Ignoring {} from proxy peer {}", other.packet_id(), self.endpoint)
                }
            }
        }

        if let Err(e) = res {
            ldn_log_warn!("Proxy peer {} sent corrupt data: {}", self.endpoint, e);
            server.unregister_session(&self.session).await;
            return Err(e.into());
        }

        Ok(())
    }
}

#[async_trait]
impl Runtime for SessionWorker {
    const NAME: &'static str = "ProxySession";

    type Err = Error;

    async fn wait(&mut self) -> WaitResponse<'_, Self::Err> {
        match self.rx.recv().await {
            Some(data) => Self::guard(async move { self.handle(data).await }),
            None => Self::error(Error::SessionClosed),
        }
    }
}
