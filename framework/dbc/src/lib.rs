#![deny(unsafe_code)]

pub mod codec;
pub mod database;
pub mod error;
pub mod message;
pub mod parser;
pub mod signal;

pub use codec::{DecodedMessage, DecodedSignal};
pub use database::Database;
pub use error::{Error, Result};
pub use message::{MessageDef, SendType};
pub use parser::Parser;
pub use signal::{ByteOrder, SignalDef};

/// Mask selecting the canonical 29-bit identifier out of a textual DBC id.
pub const CANONICAL_ID_MASK: u32 = 0x1FFF_FFFF;

/// Bit 31 of a textual DBC id flags the message as extended.
pub const EXTENDED_FLAG: u32 = 0x8000_0000;
