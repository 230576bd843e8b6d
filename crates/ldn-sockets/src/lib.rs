#![deny(missing_docs)]

//! Datagram transport used to talk to the relay and to peers.

mod error;
mod interfaces;
mod params;
mod transport;

pub use error::ErrorType;
pub use interfaces::{local_interface, GetIfAddrs, SystemGetIfAddrs};
#[cfg(any(test, feature = "mockall"))]
pub use interfaces::MockGetIfAddrs;
pub use params::UdpParams;
pub use transport::{new_udp, Connector, Transport, UdpConnector};
#[cfg(any(test, feature = "mockall"))]
pub use transport::{MockConnector, MockTransport};
