//! Wire protocol for Memomatch.
//!
//! - **Types** ([`Envelope`], [`SystemMessage`], [`GameMessage`]) — what
//!   travels between the browser and the server.
//! - **Codec** ([`Codec`], [`JsonCodec`]) — how those messages become bytes.
//! - **Codes** ([`codes`]) — status codes for error replies.
//! - **Errors** ([`ProtocolError`]) — encode/decode failures.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Game session / score store
//! ```

mod codec;
pub mod codes;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{Envelope, GameMessage, Payload, SystemMessage};

/// Protocol version clients must send in their handshake.
pub const PROTOCOL_VERSION: u32 = 1;
