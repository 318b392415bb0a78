//! Response messages.
//!
//! A response frame is `size:int32 | correlation_id:int32 | body`. `decode`
//! takes the frame without the size prefix (as returned by `read_response`).

use super::codec::{Decoder, Encoder};
use super::message::{decode_message_set, encode_message_set, KafkaCode, Message};
use super::Serializable;
use crate::error::{DecodeError, EncodeError};
use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProduceResp {
    pub correlation_id: i32,
    pub topics: Vec<ProduceRespTopic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProduceRespTopic {
    pub name: String,
    pub partitions: Vec<ProduceRespPartition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProduceRespPartition {
    pub id: i32,
    pub err: KafkaCode,
    pub offset: i64,
}

impl ProduceResp {
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let mut dec = Decoder::new(frame);
        let correlation_id = dec.i32()?;
        let topics = dec.array(|dec| {
            Ok(ProduceRespTopic {
                name: dec.string()?,
                partitions: dec.array(|dec| {
                    Ok(ProduceRespPartition {
                        id: dec.i32()?,
                        err: KafkaCode::decode(dec)?,
                        offset: dec.i64()?,
                    })
                })?,
            })
        })?;
        dec.finish()?;
        Ok(ProduceResp {
            correlation_id,
            topics,
        })
    }
}

impl Serializable for ProduceResp {
    fn bytes(&self) -> Result<Bytes, EncodeError> {
        let mut enc = Encoder::new();
        enc.i32(self.correlation_id);
        enc.array(&self.topics, |enc, topic| {
            enc.string(&topic.name)?;
            enc.array(&topic.partitions, |enc, part| {
                enc.i32(part.id);
                part.err.encode(enc);
                enc.i64(part.offset);
                Ok(())
            })
        })?;
        enc.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchResp {
    pub correlation_id: i32,
    pub topics: Vec<FetchRespTopic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchRespTopic {
    pub name: String,
    pub partitions: Vec<FetchRespPartition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchRespPartition {
    pub id: i32,
    pub err: KafkaCode,
    /// High watermark of the partition.
    pub tip_offset: i64,
    pub messages: Vec<Message>,
}

impl FetchResp {
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let mut dec = Decoder::new(frame);
        let correlation_id = dec.i32()?;
        let topics = dec.array(|dec| {
            Ok(FetchRespTopic {
                name: dec.string()?,
                partitions: dec.array(|dec| {
                    Ok(FetchRespPartition {
                        id: dec.i32()?,
                        err: KafkaCode::decode(dec)?,
                        tip_offset: dec.i64()?,
                        messages: decode_message_set(dec)?,
                    })
                })?,
            })
        })?;
        dec.finish()?;
        Ok(FetchResp {
            correlation_id,
            topics,
        })
    }
}

impl Serializable for FetchResp {
    fn bytes(&self) -> Result<Bytes, EncodeError> {
        let mut enc = Encoder::new();
        enc.i32(self.correlation_id);
        enc.array(&self.topics, |enc, topic| {
            enc.string(&topic.name)?;
            enc.array(&topic.partitions, |enc, part| {
                enc.i32(part.id);
                part.err.encode(enc);
                enc.i64(part.tip_offset);
                encode_message_set(enc, &part.messages)
            })
        })?;
        enc.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetResp {
    pub correlation_id: i32,
    pub topics: Vec<OffsetRespTopic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetRespTopic {
    pub name: String,
    pub partitions: Vec<OffsetRespPartition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetRespPartition {
    pub id: i32,
    pub err: KafkaCode,
    pub offsets: Vec<i64>,
}

impl OffsetResp {
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let mut dec = Decoder::new(frame);
        let correlation_id = dec.i32()?;
        let topics = dec.array(|dec| {
            Ok(OffsetRespTopic {
                name: dec.string()?,
                partitions: dec.array(|dec| {
                    Ok(OffsetRespPartition {
                        id: dec.i32()?,
                        err: KafkaCode::decode(dec)?,
                        offsets: dec.array(|dec| dec.i64())?,
                    })
                })?,
            })
        })?;
        dec.finish()?;
        Ok(OffsetResp {
            correlation_id,
            topics,
        })
    }
}

impl Serializable for OffsetResp {
    fn bytes(&self) -> Result<Bytes, EncodeError> {
        let mut enc = Encoder::new();
        enc.i32(self.correlation_id);
        enc.array(&self.topics, |enc, topic| {
            enc.string(&topic.name)?;
            enc.array(&topic.partitions, |enc, part| {
                enc.i32(part.id);
                part.err.encode(enc);
                enc.array(&part.offsets, |enc, offset| {
                    enc.i64(*offset);
                    Ok(())
                })
            })
        })?;
        enc.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataResp {
    pub correlation_id: i32,
    pub brokers: Vec<MetadataRespBroker>,
    pub topics: Vec<MetadataRespTopic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataRespBroker {
    pub node_id: i32,
    pub host: String,
    pub port: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataRespTopic {
    pub name: String,
    pub err: KafkaCode,
    pub partitions: Vec<MetadataRespPartition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataRespPartition {
    pub err: KafkaCode,
    pub id: i32,
    pub leader: i32,
    pub replicas: Vec<i32>,
    pub isrs: Vec<i32>,
}

impl MetadataResp {
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let mut dec = Decoder::new(frame);
        let correlation_id = dec.i32()?;
        let brokers = dec.array(|dec| {
            Ok(MetadataRespBroker {
                node_id: dec.i32()?,
                host: dec.string()?,
                port: dec.i32()?,
            })
        })?;
        let topics = dec.array(|dec| {
            let err = KafkaCode::decode(dec)?;
            let name = dec.string()?;
            let partitions = dec.array(|dec| {
                Ok(MetadataRespPartition {
                    err: KafkaCode::decode(dec)?,
                    id: dec.i32()?,
                    leader: dec.i32()?,
                    replicas: dec.array(|dec| dec.i32())?,
                    isrs: dec.array(|dec| dec.i32())?,
                })
            })?;
            Ok(MetadataRespTopic {
                name,
                err,
                partitions,
            })
        })?;
        dec.finish()?;
        Ok(MetadataResp {
            correlation_id,
            brokers,
            topics,
        })
    }
}

impl Serializable for MetadataResp {
    fn bytes(&self) -> Result<Bytes, EncodeError> {
        let mut enc = Encoder::new();
        enc.i32(self.correlation_id);
        enc.array(&self.brokers, |enc, broker| {
            enc.i32(broker.node_id);
            enc.string(&broker.host)?;
            enc.i32(broker.port);
            Ok(())
        })?;
        enc.array(&self.topics, |enc, topic| {
            topic.err.encode(enc);
            enc.string(&topic.name)?;
            enc.array(&topic.partitions, |enc, part| {
                part.err.encode(enc);
                enc.i32(part.id);
                enc.i32(part.leader);
                enc.array(&part.replicas, |enc, id| {
                    enc.i32(*id);
                    Ok(())
                })?;
                enc.array(&part.isrs, |enc, id| {
                    enc.i32(*id);
                    Ok(())
                })
            })
        })?;
        enc.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConsumerMetadataResp {
    pub correlation_id: i32,
    pub err: KafkaCode,
    pub coordinator_id: i32,
    pub coordinator_host: String,
    pub coordinator_port: i32,
}

impl ConsumerMetadataResp {
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let mut dec = Decoder::new(frame);
        let resp = ConsumerMetadataResp {
            correlation_id: dec.i32()?,
            err: KafkaCode::decode(&mut dec)?,
            coordinator_id: dec.i32()?,
            coordinator_host: dec.string()?,
            coordinator_port: dec.i32()?,
        };
        dec.finish()?;
        Ok(resp)
    }
}

impl Serializable for ConsumerMetadataResp {
    fn bytes(&self) -> Result<Bytes, EncodeError> {
        let mut enc = Encoder::new();
        enc.i32(self.correlation_id);
        self.err.encode(&mut enc);
        enc.i32(self.coordinator_id);
        enc.string(&self.coordinator_host)?;
        enc.i32(self.coordinator_port);
        enc.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetCommitResp {
    pub correlation_id: i32,
    pub topics: Vec<OffsetCommitRespTopic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetCommitRespTopic {
    pub name: String,
    pub partitions: Vec<OffsetCommitRespPartition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetCommitRespPartition {
    pub id: i32,
    pub err: KafkaCode,
}

impl OffsetCommitResp {
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let mut dec = Decoder::new(frame);
        let correlation_id = dec.i32()?;
        let topics = dec.array(|dec| {
            Ok(OffsetCommitRespTopic {
                name: dec.string()?,
                partitions: dec.array(|dec| {
                    Ok(OffsetCommitRespPartition {
                        id: dec.i32()?,
                        err: KafkaCode::decode(dec)?,
                    })
                })?,
            })
        })?;
        dec.finish()?;
        Ok(OffsetCommitResp {
            correlation_id,
            topics,
        })
    }
}

impl Serializable for OffsetCommitResp {
    fn bytes(&self) -> Result<Bytes, EncodeError> {
        let mut enc = Encoder::new();
        enc.i32(self.correlation_id);
        enc.array(&self.topics, |enc, topic| {
            enc.string(&topic.name)?;
            enc.array(&topic.partitions, |enc, part| {
                enc.i32(part.id);
                part.err.encode(enc);
                Ok(())
            })
        })?;
        enc.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetFetchResp {
    pub correlation_id: i32,
    pub topics: Vec<OffsetFetchRespTopic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetFetchRespTopic {
    pub name: String,
    pub partitions: Vec<OffsetFetchRespPartition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetFetchRespPartition {
    pub id: i32,
    pub offset: i64,
    pub metadata: String,
    pub err: KafkaCode,
}

impl OffsetFetchResp {
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let mut dec = Decoder::new(frame);
        let correlation_id = dec.i32()?;
        let topics = dec.array(|dec| {
            Ok(OffsetFetchRespTopic {
                name: dec.string()?,
                partitions: dec.array(|dec| {
                    Ok(OffsetFetchRespPartition {
                        id: dec.i32()?,
                        offset: dec.i64()?,
                        metadata: dec.nullable_string()?.unwrap_or_default(),
                        err: KafkaCode::decode(dec)?,
                    })
                })?,
            })
        })?;
        dec.finish()?;
        Ok(OffsetFetchResp {
            correlation_id,
            topics,
        })
    }
}

impl Serializable for OffsetFetchResp {
    fn bytes(&self) -> Result<Bytes, EncodeError> {
        let mut enc = Encoder::new();
        enc.i32(self.correlation_id);
        enc.array(&self.topics, |enc, topic| {
            enc.string(&topic.name)?;
            enc.array(&topic.partitions, |enc, part| {
                enc.i32(part.id);
                enc.i64(part.offset);
                enc.string(&part.metadata)?;
                part.err.encode(enc);
                Ok(())
            })
        })?;
        enc.finish()
    }
}

/// A response of any supported kind, as returned by request handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Produce(ProduceResp),
    Fetch(FetchResp),
    Offset(OffsetResp),
    Metadata(MetadataResp),
    ConsumerMetadata(ConsumerMetadataResp),
    OffsetCommit(OffsetCommitResp),
    OffsetFetch(OffsetFetchResp),
}

impl Response {
    pub fn correlation_id(&self) -> i32 {
        match self {
            Response::Produce(r) => r.correlation_id,
            Response::Fetch(r) => r.correlation_id,
            Response::Offset(r) => r.correlation_id,
            Response::Metadata(r) => r.correlation_id,
            Response::ConsumerMetadata(r) => r.correlation_id,
            Response::OffsetCommit(r) => r.correlation_id,
            Response::OffsetFetch(r) => r.correlation_id,
        }
    }
}

impl Serializable for Response {
    fn bytes(&self) -> Result<Bytes, EncodeError> {
        match self {
            Response::Produce(r) => r.bytes(),
            Response::Fetch(r) => r.bytes(),
            Response::Offset(r) => r.bytes(),
            Response::Metadata(r) => r.bytes(),
            Response::ConsumerMetadata(r) => r.bytes(),
            Response::OffsetCommit(r) => r.bytes(),
            Response::OffsetFetch(r) => r.bytes(),
        }
    }
}

macro_rules! impl_from_response {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Response {
                fn from(resp: $ty) -> Self {
                    Response::$variant(resp)
                }
            }
        )*
    };
}

impl_from_response!(
    Produce(ProduceResp),
    Fetch(FetchResp),
    Offset(OffsetResp),
    Metadata(MetadataResp),
    ConsumerMetadata(ConsumerMetadataResp),
    OffsetCommit(OffsetCommitResp),
    OffsetFetch(OffsetFetchResp),
);
