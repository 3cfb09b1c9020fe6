//! The reconciler contract shared by every resource kind.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use sticker_core::ResourceKind;

use crate::error::Result;

/// A request to reconcile one named resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Request {
    pub kind: ResourceKind,
    pub name: String,
}

impl Request {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn sticker(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::Sticker, name)
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::StickerGroup, name)
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Outcome of a reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    /// Run this request again after the delay.
    pub requeue_after: Option<Duration>,
    /// Other resources that need a pass because of this one.
    pub follow_ups: Vec<Request>,
}

impl ReconcileResult {
    /// Converged; do not retry.
    pub fn done() -> Self {
        Self::default()
    }

    pub fn requeue(after: Duration) -> Self {
        Self {
            requeue_after: Some(after),
            follow_ups: Vec::new(),
        }
    }

    pub fn with_follow_up(mut self, request: Request) -> Self {
        self.follow_ups.push(request);
        self
    }
}

/// Drives one resource kind towards its desired state.
///
/// Passes must be idempotent: the driver delivers requests at least once and
/// may repeat a request whose resource did not change.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// The kind of resource this reconciler handles.
    fn kind(&self) -> ResourceKind;

    /// Run one pass for `request`.
    async fn reconcile(&self, request: &Request) -> Result<ReconcileResult>;

    /// Names to enqueue on a periodic resync.
    async fn resync_names(&self) -> Result<Vec<String>>;
}
