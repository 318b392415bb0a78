//! Mock broker server.
//!
//! Owns the handler registry and the listener. `start` binds and spawns an
//! accept loop; every accepted connection gets its own dispatch task.
//! `close` stops accepting but leaves established connections running until
//! their peers disconnect.

use crate::connection::handle_connection;
use crate::error::{DispatchError, ServerError};
use crate::protocol::Request;
use crate::registry::{HandlerRegistry, HandlerResult, RequestHandler};
use crate::responder::DefaultResponder;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

/// Default bind address: loopback with an OS-assigned port.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:0";

/// State shared with connection tasks.
struct Shared {
    registry: HandlerRegistry,
    processed: AtomicU64,
    failures: Mutex<Vec<DispatchError>>,
}

impl Shared {
    fn record_failure(&self, err: DispatchError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(err);
    }
}

/// A mock broker.
///
/// ```no_run
/// # async fn demo() -> Result<(), kafkatest::ServerError> {
/// use kafkatest::{Server, FETCH_REQUEST};
///
/// let server = Server::new();
/// server.handle(FETCH_REQUEST, |_req| Ok(None));
/// server.start().await?;
/// let (host, port) = server.host_port()?;
/// // point a client at host:port ...
/// server.close();
/// # Ok(())
/// # }
/// ```
pub struct Server {
    listen: String,
    shared: Arc<Shared>,
    addr: Arc<OnceLock<SocketAddr>>,
    started: AtomicBool,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl Server {
    /// Create a server that will bind loopback on an OS-assigned port.
    pub fn new() -> Self {
        Self::with_listen(DEFAULT_LISTEN)
    }

    /// Create a server that will bind `listen` (e.g. `0.0.0.0:9092`).
    pub fn with_listen(listen: impl Into<String>) -> Self {
        let addr = Arc::new(OnceLock::new());
        let fallback = Arc::new(DefaultResponder::new(Arc::clone(&addr)));

        Server {
            listen: listen.into(),
            shared: Arc::new(Shared {
                registry: HandlerRegistry::new(fallback),
                processed: AtomicU64::new(0),
                failures: Mutex::new(Vec::new()),
            }),
            addr,
            started: AtomicBool::new(false),
            shutdown: Mutex::new(None),
        }
    }

    /// Register a closure for `kind`. Use `ANY_REQUEST` to replace the
    /// fallback. Takes effect for every request resolved after this returns.
    ///
    /// Only the seven kinds in [`crate::protocol`] are ever dispatched. A
    /// frame of any other kind ends its connection with
    /// `UnrecognizedRequest`, even if a handler was registered for it.
    pub fn handle<F>(&self, kind: i16, handler: F)
    where
        F: Fn(&Request) -> HandlerResult + Send + Sync + 'static,
    {
        self.handle_with(kind, handler);
    }

    /// Register any `RequestHandler` implementation for `kind`.
    pub fn handle_with<H>(&self, kind: i16, handler: H)
    where
        H: RequestHandler,
    {
        self.shared.registry.register(kind, Arc::new(handler));
    }

    /// Bind the listener and spawn the accept loop.
    ///
    /// Must be called from within a Tokio runtime. Fails with
    /// `AlreadyStarted` on a second call.
    pub async fn start(&self) -> Result<(), ServerError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyStarted);
        }

        let listener = match TcpListener::bind(&self.listen).await {
            Ok(listener) => listener,
            Err(e) => {
                self.started.store(false, Ordering::SeqCst);
                return Err(ServerError::Bind(e));
            }
        };
        let local = listener.local_addr().map_err(ServerError::Bind)?;
        // `started` guards this cell, so it is set exactly once.
        let _ = self.addr.set(local);

        let (tx, rx) = oneshot::channel();
        *self.shutdown.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);

        info!(address = %local, "Mock broker listening");
        tokio::spawn(accept_loop(listener, Arc::clone(&self.shared), rx));
        Ok(())
    }

    /// Stop accepting connections. Established connections are not touched.
    /// Does nothing if the server was never started or is already closed.
    pub fn close(&self) {
        let sender = self
            .shutdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = sender {
            let _ = tx.send(());
            info!("Mock broker closed");
        }
    }

    /// Bound socket address.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.addr.get().copied().ok_or(ServerError::NotStarted)
    }

    /// Bound address as `host:port`.
    pub fn address(&self) -> Result<String, ServerError> {
        let (host, port) = self.host_port()?;
        Ok(format!("{host}:{port}"))
    }

    /// Bound address as separate host and port.
    pub fn host_port(&self) -> Result<(String, u16), ServerError> {
        Ok(split_host_port(&self.local_addr()?))
    }

    /// Number of requests handed to a handler so far, across all connections.
    pub fn processed(&self) -> u64 {
        self.shared.processed.load(Ordering::Relaxed)
    }

    /// Fatal conditions that terminated connections, in the order they
    /// occurred. A passing test expects this to be empty.
    pub fn failures(&self) -> Vec<DispatchError> {
        self.shared
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a socket address into host and port. An unspecified address
/// (`0.0.0.0`, `::`) is reported as `localhost`.
pub(crate) fn split_host_port(addr: &SocketAddr) -> (String, u16) {
    let host = if addr.ip().is_unspecified() {
        "localhost".to_string()
    } else {
        addr.ip().to_string()
    };
    (host, addr.port())
}

/// Accept connections until `shutdown` fires (or its sender is dropped) or
/// accept fails.
async fn accept_loop(
    listener: TcpListener,
    shared: Arc<Shared>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("Accept loop stopped");
                return;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "New connection");
                    let shared = Arc::clone(&shared);
                    tokio::spawn(async move {
                        let result =
                            handle_connection(stream, &shared.registry, &shared.processed).await;
                        if let Err(e) = result {
                            error!(peer = %peer, error = %e, "Fatal dispatch error");
                            shared.record_failure(e);
                        }
                    });
                }
                Err(e) => {
                    debug!(error = %e, "Accept failed");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::compute_crc;
    use crate::protocol::{
        read_response, ConsumerMetadataReq, ConsumerMetadataResp, FetchReq, FetchReqPartition,
        FetchReqTopic, FetchResp, FetchRespPartition, FetchRespTopic, KafkaCode, Message,
        MetadataReq, MetadataResp, OffsetCommitReq, OffsetCommitReqPartition,
        OffsetCommitReqTopic, OffsetCommitResp, OffsetCommitRespPartition, OffsetCommitRespTopic,
        OffsetFetchReq, OffsetFetchReqTopic, OffsetFetchResp, OffsetFetchRespPartition,
        OffsetFetchRespTopic, OffsetReq, OffsetResp, OffsetRespPartition, OffsetRespTopic,
        ProduceReq, ProduceReqPartition, ProduceReqTopic, ProduceResp, Response, Serializable,
        CONSUMER_METADATA_REQUEST, FETCH_REQUEST, OFFSET_COMMIT_REQUEST, OFFSET_FETCH_REQUEST,
        OFFSET_REQUEST,
    };
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    async fn started() -> Server {
        let server = Server::new();
        server.start().await.unwrap();
        server
    }

    async fn connect(server: &Server) -> TcpStream {
        TcpStream::connect(server.local_addr().unwrap()).await.unwrap()
    }

    async fn roundtrip(stream: &mut TcpStream, req: &impl Serializable) -> bytes::Bytes {
        stream.write_all(&req.bytes().unwrap()).await.unwrap();
        read_response(stream).await.unwrap()
    }

    /// Poll until a connection task has recorded a failure.
    async fn wait_for_failure(server: &Server) -> DispatchError {
        for _ in 0..200 {
            if let Some(err) = server.failures().into_iter().next() {
                return err;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no failure recorded");
    }

    fn fetch_request(correlation_id: i32) -> FetchReq {
        FetchReq {
            correlation_id,
            client_id: "test".to_string(),
            replica_id: -1,
            max_wait_time: 100,
            min_bytes: 1,
            topics: vec![FetchReqTopic {
                name: "foo".to_string(),
                partitions: vec![FetchReqPartition {
                    id: 0,
                    fetch_offset: 0,
                    max_bytes: 1024,
                }],
            }],
        }
    }

    #[tokio::test]
    async fn test_registered_fetch_handler() {
        let server = started().await;
        server.handle(FETCH_REQUEST, |req: &Request| -> HandlerResult {
            Ok(Some(Response::Fetch(FetchResp {
                correlation_id: req.correlation_id(),
                topics: vec![FetchRespTopic {
                    name: "foo".to_string(),
                    partitions: vec![FetchRespPartition {
                        id: 0,
                        err: KafkaCode::NoError,
                        tip_offset: 1,
                        messages: vec![Message::new(Some("k"), Some("v"))],
                    }],
                }],
            })))
        });

        let mut stream = connect(&server).await;
        let frame = roundtrip(&mut stream, &fetch_request(42)).await;
        let resp = FetchResp::decode(&frame).unwrap();

        assert_eq!(resp.correlation_id, 42);
        let messages = &resp.topics[0].partitions[0].messages;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].key.as_deref(), Some(&b"k"[..]));
        assert_eq!(messages[0].value.as_deref(), Some(&b"v"[..]));
        assert_eq!(messages[0].crc, compute_crc(&Message::new(Some("k"), Some("v"))));
        assert_eq!(server.processed(), 1);
        server.close();
    }

    #[tokio::test]
    async fn test_default_produce_response() {
        let server = started().await;
        let req = ProduceReq {
            correlation_id: 5,
            required_acks: 1,
            timeout: 1000,
            topics: vec![
                ProduceReqTopic {
                    name: "first".to_string(),
                    partitions: vec![ProduceReqPartition {
                        id: 0,
                        messages: vec![Message::new(Some("k"), Some("v"))],
                    }],
                },
                ProduceReqTopic {
                    name: "second".to_string(),
                    partitions: vec![ProduceReqPartition {
                        id: 1,
                        messages: vec![Message::new(None::<&str>, Some("w"))],
                    }],
                },
            ],
            ..Default::default()
        };

        let mut stream = connect(&server).await;
        let resp = ProduceResp::decode(&roundtrip(&mut stream, &req).await).unwrap();

        assert_eq!(resp.correlation_id, 5);
        assert_eq!(resp.topics.len(), 2);
        for (resp_topic, req_topic) in resp.topics.iter().zip(&req.topics) {
            assert_eq!(resp_topic.name, req_topic.name);
            assert_eq!(resp_topic.partitions.len(), 1);
            let part = &resp_topic.partitions[0];
            assert_eq!(part.id, req_topic.partitions[0].id);
            assert_eq!(part.err, KafkaCode::UnknownTopicOrPartition);
            assert_eq!(part.offset, -1);
        }
    }

    #[tokio::test]
    async fn test_default_metadata_points_at_server() {
        let server = started().await;
        let mut stream = connect(&server).await;
        let req = MetadataReq {
            correlation_id: 3,
            ..Default::default()
        };
        let resp = MetadataResp::decode(&roundtrip(&mut stream, &req).await).unwrap();

        let (host, port) = server.host_port().unwrap();
        assert_eq!(resp.correlation_id, 3);
        assert_eq!(resp.brokers.len(), 1);
        assert_eq!(resp.brokers[0].node_id, 1);
        assert_eq!(resp.brokers[0].host, host);
        assert_eq!(resp.brokers[0].port, i32::from(port));
        assert!(resp.topics.is_empty());
    }

    #[tokio::test]
    async fn test_unimplemented_offset_recorded() {
        let server = started().await;
        let mut stream = connect(&server).await;
        let req = OffsetReq {
            correlation_id: 1,
            ..Default::default()
        };
        stream.write_all(&req.bytes().unwrap()).await.unwrap();

        assert_eq!(
            wait_for_failure(&server).await,
            DispatchError::Unimplemented(OFFSET_REQUEST)
        );
        // The failing connection is closed without a response.
        assert!(read_response(&mut stream).await.is_err());
    }

    #[tokio::test]
    async fn test_registered_offset_handler() {
        let server = started().await;
        server.handle(OFFSET_REQUEST, |req: &Request| -> HandlerResult {
            Ok(Some(Response::Offset(OffsetResp {
                correlation_id: req.correlation_id(),
                topics: vec![OffsetRespTopic {
                    name: "foo".to_string(),
                    partitions: vec![OffsetRespPartition {
                        id: 0,
                        err: KafkaCode::NoError,
                        offsets: vec![123],
                    }],
                }],
            })))
        });

        let mut stream = connect(&server).await;
        let req = OffsetReq {
            correlation_id: 17,
            ..Default::default()
        };
        let resp = OffsetResp::decode(&roundtrip(&mut stream, &req).await).unwrap();
        assert_eq!(resp.correlation_id, 17);
        assert_eq!(resp.topics[0].partitions[0].offsets, vec![123]);
        assert!(server.failures().is_empty());
    }

    #[tokio::test]
    async fn test_registered_group_handlers() {
        let server = started().await;
        server.handle(CONSUMER_METADATA_REQUEST, |req: &Request| -> HandlerResult {
            Ok(Some(Response::ConsumerMetadata(ConsumerMetadataResp {
                correlation_id: req.correlation_id(),
                err: KafkaCode::NoError,
                coordinator_id: 1,
                coordinator_host: "localhost".to_string(),
                coordinator_port: 9092,
            })))
        });
        server.handle(OFFSET_COMMIT_REQUEST, |req: &Request| -> HandlerResult {
            let Request::OffsetCommit(commit) = req else {
                return Err(DispatchError::Unimplemented(req.kind()));
            };
            Ok(Some(Response::OffsetCommit(OffsetCommitResp {
                correlation_id: commit.correlation_id,
                topics: commit
                    .topics
                    .iter()
                    .map(|topic| OffsetCommitRespTopic {
                        name: topic.name.clone(),
                        partitions: topic
                            .partitions
                            .iter()
                            .map(|part| OffsetCommitRespPartition {
                                id: part.id,
                                err: KafkaCode::NoError,
                            })
                            .collect(),
                    })
                    .collect(),
            })))
        });
        server.handle(OFFSET_FETCH_REQUEST, |req: &Request| -> HandlerResult {
            Ok(Some(Response::OffsetFetch(OffsetFetchResp {
                correlation_id: req.correlation_id(),
                topics: vec![OffsetFetchRespTopic {
                    name: "t".to_string(),
                    partitions: vec![OffsetFetchRespPartition {
                        id: 0,
                        offset: 41,
                        metadata: "m".to_string(),
                        err: KafkaCode::NoError,
                    }],
                }],
            })))
        });

        let mut stream = connect(&server).await;

        let coordinator = ConsumerMetadataReq {
            correlation_id: 10,
            client_id: "test".to_string(),
            consumer_group: "group".to_string(),
        };
        let resp = ConsumerMetadataResp::decode(&roundtrip(&mut stream, &coordinator).await).unwrap();
        assert_eq!(
            resp,
            ConsumerMetadataResp {
                correlation_id: 10,
                err: KafkaCode::NoError,
                coordinator_id: 1,
                coordinator_host: "localhost".to_string(),
                coordinator_port: 9092,
            }
        );

        let commit = OffsetCommitReq {
            correlation_id: 11,
            client_id: "test".to_string(),
            consumer_group: "group".to_string(),
            topics: vec![OffsetCommitReqTopic {
                name: "t".to_string(),
                partitions: vec![OffsetCommitReqPartition {
                    id: 2,
                    offset: 40,
                    metadata: "m".to_string(),
                }],
            }],
        };
        let resp = OffsetCommitResp::decode(&roundtrip(&mut stream, &commit).await).unwrap();
        assert_eq!(resp.correlation_id, 11);
        assert_eq!(resp.topics[0].name, "t");
        assert_eq!(
            resp.topics[0].partitions,
            vec![OffsetCommitRespPartition {
                id: 2,
                err: KafkaCode::NoError,
            }]
        );

        let fetch = OffsetFetchReq {
            correlation_id: 12,
            client_id: "test".to_string(),
            consumer_group: "group".to_string(),
            topics: vec![OffsetFetchReqTopic {
                name: "t".to_string(),
                partitions: vec![0],
            }],
        };
        let resp = OffsetFetchResp::decode(&roundtrip(&mut stream, &fetch).await).unwrap();
        assert_eq!(resp.correlation_id, 12);
        assert_eq!(resp.topics[0].partitions[0].offset, 41);
        assert_eq!(resp.topics[0].partitions[0].metadata, "m");

        assert_eq!(server.processed(), 3);
        assert!(server.failures().is_empty());
    }

    #[tokio::test]
    async fn test_handler_for_unknown_kind_never_runs() {
        let server = started().await;
        server.handle(42, |_req: &Request| -> HandlerResult { Ok(None) });

        let mut stream = connect(&server).await;
        // size, kind 42, version, correlation id, empty client id
        let frame = [0u8, 0, 0, 10, 0, 42, 0, 0, 0, 0, 0, 1, 0, 0];
        stream.write_all(&frame).await.unwrap();

        assert_eq!(
            wait_for_failure(&server).await,
            DispatchError::UnrecognizedRequest(42)
        );
        assert_eq!(server.processed(), 0);
    }

    #[tokio::test]
    async fn test_registration_affects_later_requests() {
        let server = started().await;
        let mut stream = connect(&server).await;

        let before = FetchResp::decode(&roundtrip(&mut stream, &fetch_request(1)).await).unwrap();
        assert_eq!(
            before.topics[0].partitions[0].err,
            KafkaCode::UnknownTopicOrPartition
        );

        server.handle(FETCH_REQUEST, |req: &Request| -> HandlerResult {
            Ok(Some(Response::Fetch(FetchResp {
                correlation_id: req.correlation_id(),
                topics: Vec::new(),
            })))
        });

        let after = FetchResp::decode(&roundtrip(&mut stream, &fetch_request(2)).await).unwrap();
        assert_eq!(after.correlation_id, 2);
        assert!(after.topics.is_empty());
        assert_eq!(server.processed(), 2);
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let server = started().await;
        assert!(matches!(
            server.start().await,
            Err(ServerError::AlreadyStarted)
        ));
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let server = Server::with_listen("not-an-address");
        assert!(matches!(server.start().await, Err(ServerError::Bind(_))));
        assert!(matches!(server.address(), Err(ServerError::NotStarted)));
    }

    #[tokio::test]
    async fn test_address_forms_agree() {
        let server = started().await;
        let (host, port) = server.host_port().unwrap();
        assert_eq!(host, "127.0.0.1");
        assert_ne!(port, 0);
        assert_eq!(server.address().unwrap(), format!("{host}:{port}"));
    }

    #[test]
    fn test_unspecified_host_is_localhost() {
        let addr: SocketAddr = "0.0.0.0:9092".parse().unwrap();
        assert_eq!(split_host_port(&addr), ("localhost".to_string(), 9092));
    }

    #[tokio::test]
    async fn test_close_keeps_live_connections() {
        let server = started().await;
        let addr = server.local_addr().unwrap();
        let mut stream = connect(&server).await;
        // Make sure the connection has been accepted before closing.
        roundtrip(&mut stream, &fetch_request(1)).await;

        server.close();
        server.close();

        let resp = FetchResp::decode(&roundtrip(&mut stream, &fetch_request(2)).await).unwrap();
        assert_eq!(resp.correlation_id, 2);

        // The listener is gone, so new connections are refused.
        let mut refused = false;
        for _ in 0..50 {
            if TcpStream::connect(addr).await.is_err() {
                refused = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(refused);
    }

    #[tokio::test]
    async fn test_connections_are_independent() {
        let server = started().await;
        let mut healthy = connect(&server).await;
        let mut broken = connect(&server).await;

        broken
            .write_all(&OffsetReq::default().bytes().unwrap())
            .await
            .unwrap();
        wait_for_failure(&server).await;

        let resp = FetchResp::decode(&roundtrip(&mut healthy, &fetch_request(8)).await).unwrap();
        assert_eq!(resp.correlation_id, 8);
    }
}
