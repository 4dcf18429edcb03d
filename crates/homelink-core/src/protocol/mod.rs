//! Serial Protocol Communication
//!
//! Implements the single-byte register protocol spoken by the HomeLink boards.
//!
//! GET queries are a bare register id answered by one untagged magnitude byte.
//! SET commands are a tagged fraction byte (`10xxxxxx`) followed by a tagged
//! integer byte (`11xxxxxx`).

pub mod codec;
mod error;
mod link;
pub mod serial;
pub mod stream;

pub use codec::{decode_get, encode_raw_magnitude, encode_set, SetCommand};
pub use error::ProtocolError;
pub use link::{
    ConnectionState, HealthStatus, Link, LinkHealth, ReadOutcome, SendOutcome, TCP_SCHEME,
};
pub use serial::open_port;
pub use stream::{ByteChannel, SerialChannel, TcpChannel};

/// Default baud rate of both boards
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default wait for a single reply byte in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Default pause between the two bytes of a SET command in milliseconds
pub const DEFAULT_INTER_BYTE_DELAY_MS: u64 = 20;
