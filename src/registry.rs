//! Handler registry.
//!
//! Maps request-kind tags to handlers. The fallback handler (registered
//! under `ANY_REQUEST`) always exists, so resolving a kind never fails.

use crate::error::DispatchError;
use crate::protocol::{is_known_kind, Request, Response, ANY_REQUEST};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// What a handler produces: a response to write, nothing (no write), or a
/// fatal condition for the connection.
pub type HandlerResult = Result<Option<Response>, DispatchError>;

/// Something that can answer a decoded request.
///
/// Implemented for every `Fn(&Request) -> HandlerResult` closure that is
/// `Send + Sync`, so tests usually register closures directly.
pub trait RequestHandler: Send + Sync + 'static {
    fn handle(&self, request: &Request) -> HandlerResult;
}

impl<F> RequestHandler for F
where
    F: Fn(&Request) -> HandlerResult + Send + Sync + 'static,
{
    fn handle(&self, request: &Request) -> HandlerResult {
        self(request)
    }
}

struct Handlers {
    by_kind: HashMap<i16, Arc<dyn RequestHandler>>,
    fallback: Arc<dyn RequestHandler>,
}

/// Thread-safe kind-to-handler mapping.
///
/// Resolution takes a read lock and clones the handler out, so handlers run
/// without the lock held and registration never waits on a running handler.
pub struct HandlerRegistry {
    handlers: RwLock<Handlers>,
}

impl HandlerRegistry {
    /// Create a registry whose only entry is `fallback`.
    pub fn new(fallback: Arc<dyn RequestHandler>) -> Self {
        Self {
            handlers: RwLock::new(Handlers {
                by_kind: HashMap::new(),
                fallback,
            }),
        }
    }

    /// Install or replace the handler for `kind`. Registering under
    /// `ANY_REQUEST` replaces the fallback. A handler for a kind the codec
    /// does not know is stored but never runs, since such frames are
    /// rejected before resolution.
    pub fn register(&self, kind: i16, handler: Arc<dyn RequestHandler>) {
        if kind != ANY_REQUEST && !is_known_kind(kind) {
            warn!(kind, "Handler registered for a request kind that cannot be decoded");
        }
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if kind == ANY_REQUEST {
            handlers.fallback = handler;
        } else {
            handlers.by_kind.insert(kind, handler);
        }
        debug!(kind, "Registered request handler");
    }

    /// Handler for `kind`, or the fallback if none is registered.
    pub fn resolve(&self, kind: i16) -> Arc<dyn RequestHandler> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers
            .by_kind
            .get(&kind)
            .unwrap_or(&handlers.fallback)
            .clone()
    }
}
