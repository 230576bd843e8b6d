#![deny(unsafe_code)]
#![deny(missing_docs)]

//! LDN relay protocol crate.
//!
//! Defines every packet exchanged between a client, the relay server and
//! peer hosted proxies, how they are encoded and decoded, and a stream
//! reassembler turning arbitrary byte chunks back into packets.

mod codec;
mod header;
mod message;
mod packet;
mod stream;

pub use codec::{Codec, Error as CodecError, Result as CodecResult};
pub use header::{Header, HEADER_SIZE, MAGIC, MAX_PACKET_SIZE, PROTOCOL_VERSION};
pub use message::*;
pub use packet::*;
pub use stream::{Frame, WireCodec};
