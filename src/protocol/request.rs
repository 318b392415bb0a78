//! Request messages.
//!
//! Every request frame starts with the same header:
//!
//! ```text
//! size:int32 | api_key:int16 | api_version:int16 | correlation_id:int32 | client_id:string
//! ```
//!
//! `decode` takes the frame without the size prefix (as returned by
//! `read_request`); `bytes` produces the complete size-prefixed frame.

use super::codec::{Decoder, Encoder};
use super::message::{decode_message_set, encode_message_set, Message};
use super::{
    Serializable, CONSUMER_METADATA_REQUEST, FETCH_REQUEST, METADATA_REQUEST, OFFSET_COMMIT_REQUEST,
    OFFSET_FETCH_REQUEST, OFFSET_REQUEST, PRODUCE_REQUEST,
};
use crate::error::{DecodeError, DispatchError, EncodeError};
use bytes::Bytes;

/// API version written in every request header.
const API_VERSION: i16 = 0;

fn read_header(dec: &mut Decoder<'_>, expected: i16) -> Result<(i32, String), DecodeError> {
    let kind = dec.i16()?;
    if kind != expected {
        return Err(DecodeError::KindMismatch {
            expected,
            found: kind,
        });
    }
    let _version = dec.i16()?;
    let correlation_id = dec.i32()?;
    let client_id = dec.nullable_string()?.unwrap_or_default();
    Ok((correlation_id, client_id))
}

fn write_header(kind: i16, correlation_id: i32, client_id: &str) -> Result<Encoder, EncodeError> {
    let mut enc = Encoder::new();
    enc.i16(kind);
    enc.i16(API_VERSION);
    enc.i32(correlation_id);
    enc.string(client_id)?;
    Ok(enc)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProduceReq {
    pub correlation_id: i32,
    pub client_id: String,
    pub required_acks: i16,
    /// Server-side ack timeout in milliseconds.
    pub timeout: i32,
    pub topics: Vec<ProduceReqTopic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProduceReqTopic {
    pub name: String,
    pub partitions: Vec<ProduceReqPartition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProduceReqPartition {
    pub id: i32,
    pub messages: Vec<Message>,
}

impl ProduceReq {
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let mut dec = Decoder::new(frame);
        let (correlation_id, client_id) = read_header(&mut dec, PRODUCE_REQUEST)?;
        let required_acks = dec.i16()?;
        let timeout = dec.i32()?;
        let topics = dec.array(|dec| {
            Ok(ProduceReqTopic {
                name: dec.string()?,
                partitions: dec.array(|dec| {
                    Ok(ProduceReqPartition {
                        id: dec.i32()?,
                        messages: decode_message_set(dec)?,
                    })
                })?,
            })
        })?;
        dec.finish()?;
        Ok(ProduceReq {
            correlation_id,
            client_id,
            required_acks,
            timeout,
            topics,
        })
    }
}

impl Serializable for ProduceReq {
    fn bytes(&self) -> Result<Bytes, EncodeError> {
        let mut enc = write_header(PRODUCE_REQUEST, self.correlation_id, &self.client_id)?;
        enc.i16(self.required_acks);
        enc.i32(self.timeout);
        enc.array(&self.topics, |enc, topic| {
            enc.string(&topic.name)?;
            enc.array(&topic.partitions, |enc, part| {
                enc.i32(part.id);
                encode_message_set(enc, &part.messages)
            })
        })?;
        enc.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchReq {
    pub correlation_id: i32,
    pub client_id: String,
    pub replica_id: i32,
    /// Maximum wait in milliseconds.
    pub max_wait_time: i32,
    pub min_bytes: i32,
    pub topics: Vec<FetchReqTopic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchReqTopic {
    pub name: String,
    pub partitions: Vec<FetchReqPartition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchReqPartition {
    pub id: i32,
    pub fetch_offset: i64,
    pub max_bytes: i32,
}

impl FetchReq {
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let mut dec = Decoder::new(frame);
        let (correlation_id, client_id) = read_header(&mut dec, FETCH_REQUEST)?;
        let replica_id = dec.i32()?;
        let max_wait_time = dec.i32()?;
        let min_bytes = dec.i32()?;
        let topics = dec.array(|dec| {
            Ok(FetchReqTopic {
                name: dec.string()?,
                partitions: dec.array(|dec| {
                    Ok(FetchReqPartition {
                        id: dec.i32()?,
                        fetch_offset: dec.i64()?,
                        max_bytes: dec.i32()?,
                    })
                })?,
            })
        })?;
        dec.finish()?;
        Ok(FetchReq {
            correlation_id,
            client_id,
            replica_id,
            max_wait_time,
            min_bytes,
            topics,
        })
    }
}

impl Serializable for FetchReq {
    fn bytes(&self) -> Result<Bytes, EncodeError> {
        let mut enc = write_header(FETCH_REQUEST, self.correlation_id, &self.client_id)?;
        enc.i32(self.replica_id);
        enc.i32(self.max_wait_time);
        enc.i32(self.min_bytes);
        enc.array(&self.topics, |enc, topic| {
            enc.string(&topic.name)?;
            enc.array(&topic.partitions, |enc, part| {
                enc.i32(part.id);
                enc.i64(part.fetch_offset);
                enc.i32(part.max_bytes);
                Ok(())
            })
        })?;
        enc.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetReq {
    pub correlation_id: i32,
    pub client_id: String,
    pub replica_id: i32,
    pub topics: Vec<OffsetReqTopic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetReqTopic {
    pub name: String,
    pub partitions: Vec<OffsetReqPartition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetReqPartition {
    pub id: i32,
    /// Timestamp in milliseconds; -1 asks for the latest offset, -2 for the
    /// earliest.
    pub time_ms: i64,
    pub max_offsets: i32,
}

impl OffsetReq {
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let mut dec = Decoder::new(frame);
        let (correlation_id, client_id) = read_header(&mut dec, OFFSET_REQUEST)?;
        let replica_id = dec.i32()?;
        let topics = dec.array(|dec| {
            Ok(OffsetReqTopic {
                name: dec.string()?,
                partitions: dec.array(|dec| {
                    Ok(OffsetReqPartition {
                        id: dec.i32()?,
                        time_ms: dec.i64()?,
                        max_offsets: dec.i32()?,
                    })
                })?,
            })
        })?;
        dec.finish()?;
        Ok(OffsetReq {
            correlation_id,
            client_id,
            replica_id,
            topics,
        })
    }
}

impl Serializable for OffsetReq {
    fn bytes(&self) -> Result<Bytes, EncodeError> {
        let mut enc = write_header(OFFSET_REQUEST, self.correlation_id, &self.client_id)?;
        enc.i32(self.replica_id);
        enc.array(&self.topics, |enc, topic| {
            enc.string(&topic.name)?;
            enc.array(&topic.partitions, |enc, part| {
                enc.i32(part.id);
                enc.i64(part.time_ms);
                enc.i32(part.max_offsets);
                Ok(())
            })
        })?;
        enc.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataReq {
    pub correlation_id: i32,
    pub client_id: String,
    /// Topics to describe; empty means all topics.
    pub topics: Vec<String>,
}

impl MetadataReq {
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let mut dec = Decoder::new(frame);
        let (correlation_id, client_id) = read_header(&mut dec, METADATA_REQUEST)?;
        let topics = dec.array(|dec| dec.string())?;
        dec.finish()?;
        Ok(MetadataReq {
            correlation_id,
            client_id,
            topics,
        })
    }
}

impl Serializable for MetadataReq {
    fn bytes(&self) -> Result<Bytes, EncodeError> {
        let mut enc = write_header(METADATA_REQUEST, self.correlation_id, &self.client_id)?;
        enc.array(&self.topics, |enc, name| enc.string(name))?;
        enc.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConsumerMetadataReq {
    pub correlation_id: i32,
    pub client_id: String,
    pub consumer_group: String,
}

impl ConsumerMetadataReq {
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let mut dec = Decoder::new(frame);
        let (correlation_id, client_id) = read_header(&mut dec, CONSUMER_METADATA_REQUEST)?;
        let consumer_group = dec.string()?;
        dec.finish()?;
        Ok(ConsumerMetadataReq {
            correlation_id,
            client_id,
            consumer_group,
        })
    }
}

impl Serializable for ConsumerMetadataReq {
    fn bytes(&self) -> Result<Bytes, EncodeError> {
        let mut enc = write_header(CONSUMER_METADATA_REQUEST, self.correlation_id, &self.client_id)?;
        enc.string(&self.consumer_group)?;
        enc.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetCommitReq {
    pub correlation_id: i32,
    pub client_id: String,
    pub consumer_group: String,
    pub topics: Vec<OffsetCommitReqTopic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetCommitReqTopic {
    pub name: String,
    pub partitions: Vec<OffsetCommitReqPartition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetCommitReqPartition {
    pub id: i32,
    pub offset: i64,
    pub metadata: String,
}

impl OffsetCommitReq {
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let mut dec = Decoder::new(frame);
        let (correlation_id, client_id) = read_header(&mut dec, OFFSET_COMMIT_REQUEST)?;
        let consumer_group = dec.string()?;
        let topics = dec.array(|dec| {
            Ok(OffsetCommitReqTopic {
                name: dec.string()?,
                partitions: dec.array(|dec| {
                    Ok(OffsetCommitReqPartition {
                        id: dec.i32()?,
                        offset: dec.i64()?,
                        metadata: dec.nullable_string()?.unwrap_or_default(),
                    })
                })?,
            })
        })?;
        dec.finish()?;
        Ok(OffsetCommitReq {
            correlation_id,
            client_id,
            consumer_group,
            topics,
        })
    }
}

impl Serializable for OffsetCommitReq {
    fn bytes(&self) -> Result<Bytes, EncodeError> {
        let mut enc = write_header(OFFSET_COMMIT_REQUEST, self.correlation_id, &self.client_id)?;
        enc.string(&self.consumer_group)?;
        enc.array(&self.topics, |enc, topic| {
            enc.string(&topic.name)?;
            enc.array(&topic.partitions, |enc, part| {
                enc.i32(part.id);
                enc.i64(part.offset);
                enc.string(&part.metadata)
            })
        })?;
        enc.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetFetchReq {
    pub correlation_id: i32,
    pub client_id: String,
    pub consumer_group: String,
    pub topics: Vec<OffsetFetchReqTopic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetFetchReqTopic {
    pub name: String,
    pub partitions: Vec<i32>,
}

impl OffsetFetchReq {
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let mut dec = Decoder::new(frame);
        let (correlation_id, client_id) = read_header(&mut dec, OFFSET_FETCH_REQUEST)?;
        let consumer_group = dec.string()?;
        let topics = dec.array(|dec| {
            Ok(OffsetFetchReqTopic {
                name: dec.string()?,
                partitions: dec.array(|dec| dec.i32())?,
            })
        })?;
        dec.finish()?;
        Ok(OffsetFetchReq {
            correlation_id,
            client_id,
            consumer_group,
            topics,
        })
    }
}

impl Serializable for OffsetFetchReq {
    fn bytes(&self) -> Result<Bytes, EncodeError> {
        let mut enc = write_header(OFFSET_FETCH_REQUEST, self.correlation_id, &self.client_id)?;
        enc.string(&self.consumer_group)?;
        enc.array(&self.topics, |enc, topic| {
            enc.string(&topic.name)?;
            enc.array(&topic.partitions, |enc, id| {
                enc.i32(*id);
                Ok(())
            })
        })?;
        enc.finish()
    }
}

/// A decoded request of any supported kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Produce(ProduceReq),
    Fetch(FetchReq),
    Offset(OffsetReq),
    Metadata(MetadataReq),
    ConsumerMetadata(ConsumerMetadataReq),
    OffsetCommit(OffsetCommitReq),
    OffsetFetch(OffsetFetchReq),
}

impl Request {
    /// Decode `frame` as the request type selected by `kind`.
    pub fn decode(kind: i16, frame: &[u8]) -> Result<Self, DispatchError> {
        let decoded = match kind {
            PRODUCE_REQUEST => ProduceReq::decode(frame).map(Request::Produce),
            FETCH_REQUEST => FetchReq::decode(frame).map(Request::Fetch),
            OFFSET_REQUEST => OffsetReq::decode(frame).map(Request::Offset),
            METADATA_REQUEST => MetadataReq::decode(frame).map(Request::Metadata),
            CONSUMER_METADATA_REQUEST => {
                ConsumerMetadataReq::decode(frame).map(Request::ConsumerMetadata)
            }
            OFFSET_COMMIT_REQUEST => OffsetCommitReq::decode(frame).map(Request::OffsetCommit),
            OFFSET_FETCH_REQUEST => OffsetFetchReq::decode(frame).map(Request::OffsetFetch),
            other => return Err(DispatchError::UnrecognizedRequest(other)),
        };
        decoded.map_err(|source| DispatchError::Decode { kind, source })
    }

    /// Request-kind tag of this request.
    pub fn kind(&self) -> i16 {
        match self {
            Request::Produce(_) => PRODUCE_REQUEST,
            Request::Fetch(_) => FETCH_REQUEST,
            Request::Offset(_) => OFFSET_REQUEST,
            Request::Metadata(_) => METADATA_REQUEST,
            Request::ConsumerMetadata(_) => CONSUMER_METADATA_REQUEST,
            Request::OffsetCommit(_) => OFFSET_COMMIT_REQUEST,
            Request::OffsetFetch(_) => OFFSET_FETCH_REQUEST,
        }
    }

    pub fn correlation_id(&self) -> i32 {
        match self {
            Request::Produce(r) => r.correlation_id,
            Request::Fetch(r) => r.correlation_id,
            Request::Offset(r) => r.correlation_id,
            Request::Metadata(r) => r.correlation_id,
            Request::ConsumerMetadata(r) => r.correlation_id,
            Request::OffsetCommit(r) => r.correlation_id,
            Request::OffsetFetch(r) => r.correlation_id,
        }
    }
}

impl Serializable for Request {
    fn bytes(&self) -> Result<Bytes, EncodeError> {
        match self {
            Request::Produce(r) => r.bytes(),
            Request::Fetch(r) => r.bytes(),
            Request::Offset(r) => r.bytes(),
            Request::Metadata(r) => r.bytes(),
            Request::ConsumerMetadata(r) => r.bytes(),
            Request::OffsetCommit(r) => r.bytes(),
            Request::OffsetFetch(r) => r.bytes(),
        }
    }
}
