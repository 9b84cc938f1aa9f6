//! ---
//! csms_section: "02-messaging-ipc-data-model"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Message contracts, envelopes, and protocol codecs."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use uuid::Uuid;

/// Timeout attached to requests when neither caller nor configuration supplies one.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Correlation identifier of a request; unique per process when generated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Address of a charge point, local controller, or CSMS.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Ordered list of nodes a message traversed, first hop first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NetworkPath(Vec<NodeId>);

impl NetworkPath {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Path that starts at `source`.
    pub fn from_source(source: NodeId) -> Self {
        Self(vec![source])
    }

    /// Copy of this path with `node` appended.
    pub fn append(&self, node: NodeId) -> Self {
        let mut hops = self.0.clone();
        hops.push(node);
        Self(hops)
    }

    pub fn hops(&self) -> &[NodeId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Originating node, if recorded.
    pub fn source(&self) -> Option<&NodeId> {
        self.0.first()
    }

    /// Most recent hop, if any.
    pub fn last(&self) -> Option<&NodeId> {
        self.0.last()
    }
}

impl FromIterator<NodeId> for NetworkPath {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for NetworkPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hops: Vec<&str> = self.0.iter().map(NodeId::as_str).collect();
        f.write_str(&hops.join(" -> "))
    }
}

/// Identifier correlating one logical event across systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventTrackingId(Uuid);

impl EventTrackingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventTrackingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventTrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a message is going and how it got here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routing {
    pub destination: NodeId,
    pub network_path: NetworkPath,
}

impl Routing {
    pub fn new(destination: NodeId, network_path: NetworkPath) -> Self {
        Self {
            destination,
            network_path,
        }
    }

    /// Direct delivery with no recorded hops.
    pub fn to(destination: NodeId) -> Self {
        Self::new(destination, NetworkPath::empty())
    }

    /// Routing for the answer to a message routed by `self`.
    ///
    /// The answer goes back to the path's source. Without a recorded source
    /// the sender is unknown and the answer is addressed to the node the
    /// message was sent to; transports that know the sender should record
    /// it in the path or override the routing.
    pub fn reply(&self) -> Self {
        let destination = self
            .network_path
            .source()
            .cloned()
            .unwrap_or_else(|| self.destination.clone());
        Self::to(destination)
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cooperative abort signal a transport can poll or await for a pending
/// exchange.
///
/// Clones share the same state. Never part of a message's identity or wire form.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<CancelState>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake every task awaiting [`Self::cancelled`].
    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once cancellation is requested; immediately if it already was.
    pub async fn cancelled(&self) {
        loop {
            // registered before the check so a concurrent cancel is not missed
            let notified = self.0.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Transport-provided metadata for an inbound or outbound request.
#[derive(Debug, Clone)]
pub struct RequestHeader {
    pub request_id: RequestId,
    pub routing: Routing,
    /// Defaults to "now" when absent.
    pub timestamp: Option<DateTime<Utc>>,
    /// Defaults to [`DEFAULT_REQUEST_TIMEOUT`] (or the codec's configured value).
    pub timeout: Option<Duration>,
    pub event_tracking_id: Option<EventTrackingId>,
    pub cancellation: Option<CancellationToken>,
}

impl RequestHeader {
    pub fn new(request_id: RequestId, routing: Routing) -> Self {
        Self {
            request_id,
            routing,
            timestamp: None,
            timeout: None,
            event_tracking_id: None,
            cancellation: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_event_tracking_id(mut self, event_tracking_id: EventTrackingId) -> Self {
        self.event_tracking_id = Some(event_tracking_id);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = Some(cancellation);
        self
    }
}
