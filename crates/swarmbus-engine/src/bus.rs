//! The bus facade: the single type embedding applications talk to.
//!
//! `Bus` owns the listener registry, the pending-request table, and the
//! schema catalog the pipeline validates against. Internally it is an
//! `Arc`-wrapped handle — cloning a `Bus` is cheap and every clone shares the
//! same state, which is what lets a dispatched listener task hold its own
//! `Bus` handle to route a reply back without borrowing the caller's.
//!
//! # Example
//!
//! ```rust,no_run
//! use swarmbus_engine::{Bus, Cardinality};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let bus = Bus::builder().build();
//! bus.register_listener(&["cad-task"], swarmbus_registry::VersionMatch::Wildcard, 0, |xml| async move {
//!     Ok(Some(xml))
//! });
//! let reply = bus.request(b"<cad-task/>", Default::default()).await?;
//! let _ = reply;
//! bus.close().await;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use swarmbus_pipeline::{CorrelationOverrides, ProcessedMessage};
use swarmbus_registry::{HandlerFn, ListenerBinding, ListenerRegistry, VersionMatch};
use swarmbus_schema::SchemaCatalog;
use swarmbus_utils::BusError;
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::pending::{Cardinality, CompletionInput, PendingEntry, PendingOutcome};
use crate::reply::Reply;

/// Whether a message is routed expecting a correlated reply, or dispatched
/// and forgotten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    RequestResponse,
    FireAndForget,
}

/// Options controlling one `request()` call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    pub cardinality: Cardinality,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self { timeout: None, cardinality: Cardinality::One }
    }
}

/// What `request()` resolves to on success.
#[derive(Debug, Clone)]
pub enum RequestReply {
    One(Vec<u8>),
    Many(Vec<Vec<u8>>),
}

/// The canonical bytes and routing metadata of a message that was published,
/// returned only when the caller asks for it.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub canonical: Vec<u8>,
    pub message_id: String,
    pub root: String,
    pub version: Option<String>,
}

struct BusInner {
    config: swarmbus_config::BusConfig,
    schemas: SchemaCatalog,
    registry: ListenerRegistry,
    pending: AsyncMutex<HashMap<String, PendingEntry>>,
    health_shutdown: StdMutex<Option<oneshot::Sender<()>>>,
    health_task: StdMutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

/// The message bus. Cheaply cloneable; every clone is a handle onto the same
/// shared state.
#[derive(Clone)]
pub struct Bus {
    inner: Arc<BusInner>,
}

/// Assembles a [`Bus`] from configuration, mirroring the teacher's
/// config-then-build construction shape.
pub struct BusBuilder {
    config: swarmbus_config::BusConfig,
}

impl Default for BusBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BusBuilder {
    pub fn new() -> Self {
        Self { config: swarmbus_config::BusConfig::default() }
    }

    pub fn with_config(mut self, config: swarmbus_config::BusConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the bus. Schema discovery never fails this call; a directory
    /// that cannot be read is logged and skipped (see
    /// `SchemaCatalog::discover`).
    pub fn build(self) -> Bus {
        let schemas = SchemaCatalog::discover(&self.config.schema_dirs);
        tracing::info!(schema_count = schemas.len(), "bus schema catalog loaded");

        let registry = ListenerRegistry::new(self.config.max_concurrent_per_listener);
        let enable_health_ping = self.config.enable_health_ping;
        let health_ping_interval = self.config.health_ping_interval;

        let inner = Arc::new(BusInner {
            config: self.config,
            schemas,
            registry,
            pending: AsyncMutex::new(HashMap::new()),
            health_shutdown: StdMutex::new(None),
            health_task: StdMutex::new(None),
            closed: AtomicBool::new(false),
        });

        let bus = Bus { inner };
        if enable_health_ping {
            bus.spawn_health_task(health_ping_interval);
        }
        bus
    }
}

impl Bus {
    pub fn builder() -> BusBuilder {
        BusBuilder::new()
    }

    fn schemas(&self) -> &SchemaCatalog {
        &self.inner.schemas
    }

    /// Registers a handler. `roots` are the root element local names this
    /// listener accepts; `version` may be an exact match or
    /// [`VersionMatch::Wildcard`]. Returns the assigned listener id.
    pub fn register_listener<F, Fut>(
        &self,
        roots: &[&str],
        version: VersionMatch,
        priority: i32,
        handler: F,
    ) -> u64
    where
        F: Fn(Vec<u8>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Vec<u8>>>> + Send + 'static,
    {
        let handler: HandlerFn = Arc::new(move |xml| Box::pin(handler(xml)));
        let roots = roots.iter().map(|r| r.to_string()).collect();
        let binding = self.inner.registry.register(roots, version, priority, handler);
        binding.id
    }

    /// Runs `xml` through the normalization pipeline, routes it for a
    /// correlated reply, and waits up to `opts.timeout` (or
    /// `BusConfig::default_timeout`) for it.
    pub async fn request(&self, xml: impl AsRef<[u8]>, opts: RequestOptions) -> Result<RequestReply, BusError> {
        let processed = swarmbus_pipeline::process(xml.as_ref(), None, self.schemas())?;
        let message_id = processed.message_id.clone();

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.inner.pending.lock().await;
            pending.insert(message_id.clone(), PendingEntry::new(tx, opts.cardinality));
        }

        self.route(&processed, opts.cardinality, Flow::RequestResponse, Some(&message_id)).await;

        let timeout_duration = opts.timeout.unwrap_or(self.inner.config.default_timeout);
        match tokio::time::timeout(timeout_duration, rx).await {
            Ok(Ok(PendingOutcome::One(bytes))) => Ok(RequestReply::One(bytes)),
            Ok(Ok(PendingOutcome::All(replies))) => Ok(RequestReply::Many(replies)),
            Ok(Ok(PendingOutcome::NoListener)) => {
                Err(BusError::NoListener { root: processed.root_local_name, version: processed.version.unwrap_or_else(|| "*".to_string()) })
            }
            Ok(Err(_canceled)) => Err(BusError::Timeout),
            Err(_elapsed) => {
                self.inner.pending.lock().await.remove(&message_id);
                Err(BusError::Timeout)
            }
        }
    }

    /// Runs `xml` through the pipeline and dispatches it fire-and-forget at
    /// the given cardinality. When `return_canonical` is set, the canonical
    /// bytes and routing metadata are returned to the caller.
    pub async fn publish(
        &self,
        xml: impl AsRef<[u8]>,
        cardinality: Cardinality,
        return_canonical: bool,
    ) -> Result<Option<PublishedMessage>, BusError> {
        let processed = swarmbus_pipeline::process(xml.as_ref(), None, self.schemas())?;
        self.route(&processed, cardinality, Flow::FireAndForget, None).await;

        if return_canonical {
            Ok(Some(PublishedMessage {
                canonical: processed.canonical_bytes,
                message_id: processed.message_id,
                root: processed.root_local_name,
                version: processed.version,
            }))
        } else {
            Ok(None)
        }
    }

    /// Completes a pending `request()` out of band: normalizes `response`
    /// with `in-reply-to` stamped to the request it answers, feeds it into
    /// the completion logic, and (per the design note in `DESIGN.md`)
    /// re-dispatches it fire-and-forget so other listeners can observe the
    /// reply.
    ///
    /// `in_reply_to` is resolved from `response` itself if it carries one;
    /// otherwise, when the caller passes the original request's canonical
    /// bytes as `original_message`, its `message-id` is pulled out with
    /// [`swarmbus_pipeline::extract_message_id`] rather than re-running the
    /// full pipeline on it. Fails with [`BusError::CorrelationMissing`] if
    /// neither source resolves.
    pub async fn reply(&self, response: Reply, original_message: Option<&[u8]>) -> Result<(), BusError> {
        let in_reply_to = response
            .in_reply_to
            .clone()
            .or_else(|| original_message.and_then(swarmbus_pipeline::extract_message_id));
        let Some(in_reply_to) = in_reply_to else {
            return Err(BusError::CorrelationMissing);
        };

        let overrides = CorrelationOverrides {
            message_id: Some(response.message_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string())),
            in_reply_to: Some(in_reply_to.clone()),
            tombstone: Some(response.tombstone),
            outcome: response.outcome.map(|o| o.as_str().to_string()),
            ..Default::default()
        };

        let processed = swarmbus_pipeline::process(&response.xml, Some(&overrides), self.schemas())?;

        self.route(&processed, Cardinality::One, Flow::FireAndForget, Some(&in_reply_to)).await;
        self.complete(&in_reply_to, CompletionInput::Reply(processed.canonical_bytes)).await;
        Ok(())
    }

    /// Cancels the health-ping task (if running) and every pending request,
    /// then clears the pending table. Safe to call more than once.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(shutdown) = self.inner.health_shutdown.lock().expect("health shutdown mutex poisoned").take() {
            let _ = shutdown.send(());
        }
        let handle = self.inner.health_task.lock().expect("health task mutex poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        self.inner.pending.lock().await.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.inner.registry.len()
    }

    // -- internals ---------------------------------------------------- //

    fn spawn_health_task(&self, interval: Duration) {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        *self.inner.health_shutdown.lock().expect("health shutdown mutex poisoned") = Some(shutdown_tx);

        let bus = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = tokio::time::sleep(interval) => {
                        let ping = format!(r#"<ping timestamp="{}"/>"#, swarmbus_utils::timestamps::now_iso8601());
                        if let Err(e) = bus.publish(ping.as_bytes(), Cardinality::Any, false).await {
                            tracing::warn!(error = %e, "health ping failed to process, skipping");
                        }
                    }
                }
            }
        });
        *self.inner.health_task.lock().expect("health task mutex poisoned") = Some(handle);
    }

    /// Matching → viable-set computation → cardinality-aware dispatch, per
    /// the routing engine's ordering rule: the pending-table lock is taken
    /// only for the brief snapshot/update steps, never across a dispatch
    /// await.
    async fn route(&self, processed: &ProcessedMessage, cardinality: Cardinality, flow: Flow, original_id: Option<&str>) {
        let root = processed.root_local_name.as_str();
        let version = processed.version.as_deref();

        let matching = self.inner.registry.matching(root, version);

        if matching.is_empty() {
            if flow == Flow::RequestResponse {
                if let Some(id) = original_id {
                    self.complete(id, CompletionInput::NoListener).await;
                }
            }
            return;
        }

        let version_key = version.unwrap_or("*");
        let viable: Vec<Arc<ListenerBinding>> =
            matching.into_iter().filter(|l| !l.circuit_is_open(root, version_key)).collect();

        if flow == Flow::RequestResponse {
            if let Some(id) = original_id {
                let required = if cardinality == Cardinality::All { viable.len() } else { 1 };
                let mut pending = self.inner.pending.lock().await;
                if let Some(entry) = pending.get_mut(id) {
                    entry.required_replies = required;
                }
            }
        }

        if viable.is_empty() {
            if flow == Flow::RequestResponse {
                if let Some(id) = original_id {
                    self.complete(id, CompletionInput::NoListener).await;
                }
            }
            return;
        }

        let dispatch_list: Vec<Arc<ListenerBinding>> =
            if cardinality == Cardinality::One { vec![viable[0].clone()] } else { viable };

        let mut tasks = Vec::with_capacity(dispatch_list.len());
        for listener in dispatch_list {
            let bus = self.clone();
            let canonical = processed.canonical_bytes.clone();
            let root = root.to_string();
            let version = version_key.to_string();
            let reply_to = original_id.map(str::to_string);
            tasks.push(tokio::spawn(async move {
                bus.deliver(listener, canonical, root, version, reply_to).await;
            }));
        }
        for task in tasks {
            let _ = task.await;
        }
    }

    /// Delivers to one listener under its concurrency permit, recording
    /// circuit success/failure and, on a non-empty reply, feeding the
    /// pipeline-normalized reply into the completion logic.
    async fn deliver(&self, listener: Arc<ListenerBinding>, xml: Vec<u8>, root: String, version: String, reply_to: Option<String>) {
        let Ok(_permit) = listener.semaphore.clone().acquire_owned().await else { return };
        let span = swarmbus_utils::logging::dispatch_span(&root, &version);
        let _enter = span.enter();

        let handler = listener.handler.clone();
        let call = (handler)(xml);
        let outcome = tokio::time::timeout(self.inner.config.default_timeout, call).await;

        match outcome {
            Ok(Ok(Some(reply_bytes))) => {
                listener.record_success(&root, &version);
                let Some(reply_to) = reply_to else { return };
                let overrides = CorrelationOverrides::reply_to(reply_to.clone());
                match swarmbus_pipeline::process(&reply_bytes, Some(&overrides), self.schemas()) {
                    Ok(processed) => self.complete(&reply_to, CompletionInput::Reply(processed.canonical_bytes)).await,
                    Err(e) => tracing::warn!(error = %e, "listener reply failed normalization, dropping"),
                }
            }
            Ok(Ok(None)) => {
                listener.record_success(&root, &version);
            }
            Ok(Err(handler_err)) => {
                listener.record_failure(&root, &version);
                tracing::warn!(error = %handler_err, "listener returned an error, recording circuit failure");
            }
            Err(_elapsed) => {
                listener.record_failure(&root, &version);
                tracing::warn!("listener exceeded default_timeout, recording circuit failure");
            }
        }
    }

    /// At-most-once completion: a pending entry is consulted and then
    /// removed in the same lock acquisition, so a stale or duplicate
    /// completion for an id that already fired (or never existed) is a
    /// silent no-op.
    async fn complete(&self, request_id: &str, input: CompletionInput) {
        let mut pending = self.inner.pending.lock().await;

        let should_fire = match (pending.get_mut(request_id), &input) {
            (None, _) => false,
            (Some(entry), CompletionInput::Reply(reply)) if entry.cardinality == Cardinality::All => {
                entry.replies.push(reply.clone());
                entry.replies.len() >= entry.required_replies
            }
            (Some(_), _) => true,
        };

        if !should_fire {
            return;
        }

        match input {
            CompletionInput::Reply(reply) => {
                if let Some(mut fired) = pending.remove(request_id) {
                    if fired.cardinality == Cardinality::All {
                        if let Some(sender) = fired.sender.take() {
                            let _ = sender.send(PendingOutcome::All(std::mem::take(&mut fired.replies)));
                        }
                    } else if let Some(sender) = fired.sender.take() {
                        let _ = sender.send(PendingOutcome::One(reply));
                    }
                }
            }
            CompletionInput::NoListener => {
                if let Some(mut fired) = pending.remove(request_id) {
                    if let Some(sender) = fired.sender.take() {
                        let _ = sender.send(PendingOutcome::NoListener);
                    }
                }
            }
        }
    }
}
