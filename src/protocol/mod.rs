//! Protocol module - Defines the wire protocol spoken with a LucidMQ broker
//!
//! Every request and every response travels as one frame:
//! - 2 bytes payload length (little-endian, unsigned)
//! - Variable length payload: one bincode-encoded `Envelope`

mod codec;
mod framing;
mod message;
mod response;

pub use codec::*;
pub use framing::*;
pub use message::*;
pub use response::*;

/// Default broker port
pub const DEFAULT_PORT: u16 = 6969;

/// Largest payload a single frame can carry
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Topic name sent with an `All` topic request; the broker ignores it
pub const ALL_TOPICS_PLACEHOLDER: &str = "placeholder";
