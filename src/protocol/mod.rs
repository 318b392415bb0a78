//! Kafka v0 wire protocol.
//!
//! Covers the seven request kinds the mock broker understands and their
//! responses. Messages use the legacy (magic 0) message-set format.

mod codec;
mod frame;
mod message;
mod request;
mod response;

pub use frame::{read_request, read_response, MAX_FRAME_SIZE};
pub use message::{KafkaCode, Message};
pub use request::*;
pub use response::*;

use crate::error::EncodeError;
use bytes::Bytes;

/// Wildcard kind used to register the fallback handler.
pub const ANY_REQUEST: i16 = -1;
pub const PRODUCE_REQUEST: i16 = 0;
pub const FETCH_REQUEST: i16 = 1;
pub const OFFSET_REQUEST: i16 = 2;
pub const METADATA_REQUEST: i16 = 3;
pub const OFFSET_COMMIT_REQUEST: i16 = 8;
pub const OFFSET_FETCH_REQUEST: i16 = 9;
pub const CONSUMER_METADATA_REQUEST: i16 = 10;

/// Whether frames of `kind` can be decoded and dispatched.
pub fn is_known_kind(kind: i16) -> bool {
    matches!(
        kind,
        PRODUCE_REQUEST
            | FETCH_REQUEST
            | OFFSET_REQUEST
            | METADATA_REQUEST
            | OFFSET_COMMIT_REQUEST
            | OFFSET_FETCH_REQUEST
            | CONSUMER_METADATA_REQUEST
    )
}

/// Anything that can be written to the wire as a complete frame.
pub trait Serializable {
    /// Encode as a size-prefixed frame.
    fn bytes(&self) -> Result<Bytes, EncodeError>;
}
