//! Notifications and results surfaced to the service layer.

use ldn_proto::{DisconnectReason, NetworkInfo};

/// The network this node takes part in changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkChange {
    /// Current network description, empty after a disconnect.
    pub info: NetworkInfo,
    /// Still part of the network.
    pub connected: bool,
    /// Why the network was left, [DisconnectReason::None] while connected.
    pub disconnect_reason: DisconnectReason,
}

impl NetworkChange {
    /// Network joined or updated.
    pub fn connected(info: NetworkInfo) -> Self {
        Self {
            info,
            connected: true,
            disconnect_reason: DisconnectReason::None,
        }
    }

    /// Network left.
    pub fn disconnected(disconnect_reason: DisconnectReason) -> Self {
        Self {
            info: NetworkInfo::default(),
            connected: false,
            disconnect_reason,
        }
    }
}

/// Outcome of operations reported as a service result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    /// Done.
    Success,
    /// Not possible in the current state, or refused by the relay.
    InvalidState,
}
