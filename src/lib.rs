//! kafkatest: a scriptable mock Kafka broker for client tests.
//!
//! A [`Server`] accepts TCP connections, decodes each request frame and
//! answers it with the handler registered for its kind. Kinds without a
//! handler fall back to a default responder:
//! - Fetch and Produce answer every partition with `UnknownTopicOrPartition`
//! - Metadata advertises the server itself as the only broker
//! - Offset, ConsumerMetadata, OffsetCommit and OffsetFetch are refused
//!
//! Failures that would indicate a broken test (malformed frames,
//! unserializable responses, unhandled kinds) end the offending connection
//! and are collected by [`Server::failures`].

mod connection;
mod crc;
mod error;
pub mod protocol;
mod registry;
mod responder;
mod server;

pub use crc::compute_crc;
pub use error::{DecodeError, DispatchError, EncodeError, ServerError};
pub use protocol::{
    Request, Response, Serializable, ANY_REQUEST, CONSUMER_METADATA_REQUEST, FETCH_REQUEST,
    METADATA_REQUEST, OFFSET_COMMIT_REQUEST, OFFSET_FETCH_REQUEST, OFFSET_REQUEST, PRODUCE_REQUEST,
};
pub use registry::{HandlerResult, RequestHandler};
pub use responder::DefaultResponder;
pub use server::{Server, DEFAULT_LISTEN};
