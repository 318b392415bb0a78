//! Messages, message sets and broker error codes.

use super::codec::{Decoder, Encoder};
use crate::crc::{compute_crc, MESSAGE_ATTRIBUTES, MESSAGE_MAGIC};
use crate::error::{DecodeError, EncodeError};
use bytes::Bytes;

/// Size of `offset | message_size` ahead of every message in a set.
const MESSAGE_HEADER_LEN: usize = 12;

/// A single v0 message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    pub offset: i64,
    /// Checksum as read from the wire. Ignored when encoding; the encoder
    /// always writes the checksum of the current key and value.
    pub crc: u32,
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
}

impl Message {
    /// Build a message at offset 0 with its checksum filled in.
    pub fn new<K, V>(key: Option<K>, value: Option<V>) -> Self
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let mut message = Message {
            offset: 0,
            crc: 0,
            key: key.map(|k| Bytes::copy_from_slice(k.as_ref())),
            value: value.map(|v| Bytes::copy_from_slice(v.as_ref())),
        };
        message.crc = compute_crc(&message);
        message
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Write `messages` as an int32-size-prefixed message set.
pub(crate) fn encode_message_set(enc: &mut Encoder, messages: &[Message]) -> Result<(), EncodeError> {
    let mut set = Encoder::unframed();
    for message in messages {
        let mut body = Encoder::unframed();
        body.u32(compute_crc(message));
        body.i8(MESSAGE_MAGIC);
        body.i8(MESSAGE_ATTRIBUTES);
        body.bytes(message.key.as_deref())?;
        body.bytes(message.value.as_deref())?;
        let body = body.into_inner();

        set.i64(message.offset);
        set.bytes(Some(&body[..]))?;
    }
    enc.bytes(Some(&set.into_inner()[..]))
}

/// Read an int32-size-prefixed message set.
///
/// A trailing partial message is dropped silently; brokers cut sets at the
/// requested byte limit.
pub(crate) fn decode_message_set(dec: &mut Decoder<'_>) -> Result<Vec<Message>, DecodeError> {
    let size = dec.i32()?;
    if size < 0 {
        return Err(DecodeError::InvalidLength(size));
    }
    let mut set = Decoder::new(dec.raw(size as usize)?);
    let mut messages = Vec::new();

    while set.remaining() >= MESSAGE_HEADER_LEN {
        let offset = set.i64()?;
        let message_size = set.i32()?;
        if message_size < 0 {
            return Err(DecodeError::InvalidLength(message_size));
        }
        if set.remaining() < message_size as usize {
            break;
        }
        let mut body = Decoder::new(set.raw(message_size as usize)?);
        let stored = body.u32()?;
        let _magic = body.i8()?;
        let _attributes = body.i8()?;
        let message = Message {
            offset,
            crc: stored,
            key: body.bytes()?,
            value: body.bytes()?,
        };
        let computed = compute_crc(&message);
        if computed != stored {
            return Err(DecodeError::CrcMismatch { stored, computed });
        }
        messages.push(message);
    }

    Ok(messages)
}

/// Broker error codes carried in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KafkaCode {
    #[default]
    NoError,
    OffsetOutOfRange,
    InvalidMessage,
    UnknownTopicOrPartition,
    InvalidMessageSize,
    LeaderNotAvailable,
    NotLeaderForPartition,
    RequestTimedOut,
    BrokerNotAvailable,
    ReplicaNotAvailable,
    MessageSizeTooLarge,
    StaleControllerEpoch,
    OffsetMetadataTooLarge,
    OffsetsLoadInProgress,
    ConsumerCoordinatorNotAvailable,
    NotCoordinatorForConsumer,
    /// Any code without a named variant.
    Other(i16),
}

impl From<i16> for KafkaCode {
    fn from(code: i16) -> Self {
        match code {
            0 => KafkaCode::NoError,
            1 => KafkaCode::OffsetOutOfRange,
            2 => KafkaCode::InvalidMessage,
            3 => KafkaCode::UnknownTopicOrPartition,
            4 => KafkaCode::InvalidMessageSize,
            5 => KafkaCode::LeaderNotAvailable,
            6 => KafkaCode::NotLeaderForPartition,
            7 => KafkaCode::RequestTimedOut,
            8 => KafkaCode::BrokerNotAvailable,
            9 => KafkaCode::ReplicaNotAvailable,
            10 => KafkaCode::MessageSizeTooLarge,
            11 => KafkaCode::StaleControllerEpoch,
            12 => KafkaCode::OffsetMetadataTooLarge,
            14 => KafkaCode::OffsetsLoadInProgress,
            15 => KafkaCode::ConsumerCoordinatorNotAvailable,
            16 => KafkaCode::NotCoordinatorForConsumer,
            other => KafkaCode::Other(other),
        }
    }
}

impl From<KafkaCode> for i16 {
    fn from(code: KafkaCode) -> Self {
        match code {
            KafkaCode::NoError => 0,
            KafkaCode::OffsetOutOfRange => 1,
            KafkaCode::InvalidMessage => 2,
            KafkaCode::UnknownTopicOrPartition => 3,
            KafkaCode::InvalidMessageSize => 4,
            KafkaCode::LeaderNotAvailable => 5,
            KafkaCode::NotLeaderForPartition => 6,
            KafkaCode::RequestTimedOut => 7,
            KafkaCode::BrokerNotAvailable => 8,
            KafkaCode::ReplicaNotAvailable => 9,
            KafkaCode::MessageSizeTooLarge => 10,
            KafkaCode::StaleControllerEpoch => 11,
            KafkaCode::OffsetMetadataTooLarge => 12,
            KafkaCode::OffsetsLoadInProgress => 14,
            KafkaCode::ConsumerCoordinatorNotAvailable => 15,
            KafkaCode::NotCoordinatorForConsumer => 16,
            KafkaCode::Other(code) => code,
        }
    }
}

impl KafkaCode {
    pub(crate) fn decode(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(KafkaCode::from(dec.i16()?))
    }

    pub(crate) fn encode(self, enc: &mut Encoder) {
        enc.i16(self.into());
    }
}
