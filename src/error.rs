//! Error types for the mock broker.
//!
//! Two families exist. `ServerError` covers lifecycle problems raised at the
//! call that caused them (binding, double start). `DispatchError` covers the
//! conditions that end a connection's dispatch loop: malformed frames,
//! unserializable responses and request kinds the default responder refuses
//! to answer. Both are meant to fail a test loudly.

use thiserror::Error;

/// Failure to decode a wire value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input ended before the value was complete.
    #[error("input is truncated")]
    Truncated,

    /// A length or count prefix was negative (and not the null marker).
    #[error("invalid length value: {0}")]
    InvalidLength(i32),

    /// A string field was not valid UTF-8.
    #[error("invalid UTF-8 string")]
    InvalidString,

    /// A non-nullable string was encoded as null.
    #[error("unexpected null string")]
    NullString,

    /// The frame header names a different request kind than expected.
    #[error("expected request kind {expected}, found {found}")]
    KindMismatch { expected: i16, found: i16 },

    /// Bytes were left over after the last field of a frame.
    #[error("{0} trailing bytes after the frame body")]
    TrailingBytes(usize),

    /// A message in a message set failed its checksum.
    #[error("message crc mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    CrcMismatch { stored: u32, computed: u32 },
}

/// Failure to encode a wire value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// A string does not fit the 16-bit length prefix.
    #[error("string of {0} bytes exceeds the int16 length prefix")]
    StringTooLong(usize),

    /// A byte field does not fit the 32-bit length prefix.
    #[error("byte field of {0} bytes exceeds the int32 length prefix")]
    BytesTooLong(usize),

    /// An array does not fit the 32-bit count prefix.
    #[error("array of {0} entries exceeds the int32 count prefix")]
    ArrayTooLong(usize),
}

/// Condition that terminates a connection's dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The frame body could not be decoded as the request kind it announced.
    #[error("could not read message {kind}: {source}")]
    Decode {
        kind: i16,
        #[source]
        source: DecodeError,
    },

    /// A handler returned a response that cannot be serialized.
    #[error("cannot serialize response: {0}")]
    Encode(#[from] EncodeError),

    /// The default responder has no canned answer for this kind.
    /// Register a handler for it.
    #[error("request kind {0} is not implemented by the default responder")]
    Unimplemented(i16),

    /// The frame carries a request kind this broker does not know.
    #[error("unrecognized request type {0}")]
    UnrecognizedRequest(i16),

    /// The server address was requested before the listener was bound.
    #[error("server is not bound")]
    NotBound,
}

/// Server lifecycle errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// `start` was called on a server that already has a listener.
    #[error("server already started")]
    AlreadyStarted,

    /// An operation needed the bound listener before `start` was called.
    #[error("server not started")]
    NotStarted,

    /// Binding the listener failed.
    #[error("cannot start server: {0}")]
    Bind(#[source] std::io::Error),
}
