//! Canned responses used when no handler is registered for a request kind.
//!
//! - Fetch and Produce: every requested partition answers with
//!   `UnknownTopicOrPartition` and offset -1.
//! - Metadata: this server is the only broker (node 1) and there are no topics.
//! - Offset, ConsumerMetadata, OffsetCommit, OffsetFetch: not implemented;
//!   tests must register a handler for these.

use crate::error::DispatchError;
use crate::protocol::{
    FetchReq, FetchResp, FetchRespPartition, FetchRespTopic, KafkaCode, MetadataReq, MetadataResp,
    MetadataRespBroker, ProduceReq, ProduceResp, ProduceRespPartition, ProduceRespTopic, Request,
    Response,
};
use crate::registry::{HandlerResult, RequestHandler};
use crate::server::split_host_port;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

/// Node id the mock advertises for itself.
pub const DEFAULT_NODE_ID: i32 = 1;

/// Fallback handler installed on every new server.
pub struct DefaultResponder {
    addr: Arc<OnceLock<SocketAddr>>,
}

impl DefaultResponder {
    /// `addr` is filled in once the owning server binds.
    pub fn new(addr: Arc<OnceLock<SocketAddr>>) -> Self {
        Self { addr }
    }

    fn metadata(&self, req: &MetadataReq) -> HandlerResult {
        let addr = self.addr.get().ok_or(DispatchError::NotBound)?;
        let (host, port) = split_host_port(addr);
        Ok(Some(Response::Metadata(MetadataResp {
            correlation_id: req.correlation_id,
            brokers: vec![MetadataRespBroker {
                node_id: DEFAULT_NODE_ID,
                host,
                port: i32::from(port),
            }],
            topics: Vec::new(),
        })))
    }
}

impl RequestHandler for DefaultResponder {
    fn handle(&self, request: &Request) -> HandlerResult {
        match request {
            Request::Fetch(req) => Ok(Some(Response::Fetch(fetch(req)))),
            Request::Produce(req) => Ok(Some(Response::Produce(produce(req)))),
            Request::Metadata(req) => self.metadata(req),
            Request::Offset(_)
            | Request::ConsumerMetadata(_)
            | Request::OffsetCommit(_)
            | Request::OffsetFetch(_) => Err(DispatchError::Unimplemented(request.kind())),
        }
    }
}

fn fetch(req: &FetchReq) -> FetchResp {
    FetchResp {
        correlation_id: req.correlation_id,
        topics: req
            .topics
            .iter()
            .map(|topic| FetchRespTopic {
                name: topic.name.clone(),
                partitions: topic
                    .partitions
                    .iter()
                    .map(|part| FetchRespPartition {
                        id: part.id,
                        err: KafkaCode::UnknownTopicOrPartition,
                        tip_offset: -1,
                        messages: Vec::new(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn produce(req: &ProduceReq) -> ProduceResp {
    ProduceResp {
        correlation_id: req.correlation_id,
        topics: req
            .topics
            .iter()
            .map(|topic| ProduceRespTopic {
                name: topic.name.clone(),
                partitions: topic
                    .partitions
                    .iter()
                    .map(|part| ProduceRespPartition {
                        id: part.id,
                        err: KafkaCode::UnknownTopicOrPartition,
                        offset: -1,
                    })
                    .collect(),
            })
            .collect(),
    }
}
