//! Fixed layout payloads carried by [crate::Packet].

mod network;
mod proxy;
mod session;

pub use network::*;
pub use proxy::*;
pub use session::*;

/// Declares a message whose contents are relayed without being interpreted.
macro_rules! opaque_message {
    ($(#[$meta:meta])* $name:ident, $size:expr) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash)]
        pub struct $name(Vec<u8>);

        impl $name {
            /// Wrap the first `SIZE` bytes of `bytes`.
            pub fn from_bytes(bytes: &[u8]) -> $crate::CodecResult<Self> {
                <Self as $crate::Codec>::decode(bytes)
            }

            /// Raw contents.
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self(vec![0; $size])
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let used = self.0.iter().filter(|b| **b != 0).count();
                write!(f, "{}({} bytes, {} set)", stringify!($name), $size, used)
            }
        }

        impl $crate::Codec for $name {
            const SIZE: usize = $size;

            fn decode(bytes: &[u8]) -> $crate::CodecResult<Self> {
                $crate::codec::check_len(bytes, $size)?;
                Ok(Self(bytes[..$size].to_vec()))
            }

            fn encode<B: bytes::BufMut>(&self, buf: &mut B) {
                buf.put_slice(&self.0);
            }
        }
    };
}

pub(crate) use opaque_message;
