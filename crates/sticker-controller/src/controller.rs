//! Work-queue driver for reconcilers.
//!
//! The controller owns a request queue and runs reconciles on a bounded set of
//! tasks. A request is never reconciled concurrently with itself: if it shows
//! up again while a pass for it is running, it is marked dirty and run once
//! more after that pass finishes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use sticker_core::ResourceKind;
use tokio::sync::{mpsc, watch};
use tokio::task::{self, JoinError, JoinSet};
use tokio::time::Interval;
use tracing::{debug, error, info};

use crate::config::ControllerConfig;
use crate::error::{ControllerError, Result};
use crate::reconciler::{ReconcileResult, Reconciler, Request};

/// Cheap handle for feeding requests into a running [`Controller`].
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<Request>,
}

impl ControllerHandle {
    /// Queue a request. Returns false once the controller has stopped.
    pub fn enqueue(&self, request: Request) -> bool {
        self.tx.send(request).is_ok()
    }

    /// Queue `request` after `delay`.
    pub fn enqueue_after(&self, request: Request, delay: Duration) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(request);
        });
    }
}

type Completion = (Request, Result<ReconcileResult>);

/// Requests of the tasks currently in the join set.
type TaskRequests = HashMap<task::Id, Request>;

/// Runs reconcilers over a deduplicating work queue.
pub struct Controller {
    config: ControllerConfig,
    reconcilers: HashMap<ResourceKind, Arc<dyn Reconciler>>,
    handle: ControllerHandle,
    rx: mpsc::UnboundedReceiver<Request>,
}

/// Queue bookkeeping, owned by the run loop.
#[derive(Default)]
struct Queue {
    pending: VecDeque<Request>,
    queued: HashSet<Request>,
    in_flight: HashSet<Request>,
    dirty: HashSet<Request>,
}

impl Queue {
    fn push(&mut self, request: Request) {
        if self.in_flight.contains(&request) {
            self.dirty.insert(request);
        } else if self.queued.insert(request.clone()) {
            self.pending.push_back(request);
        }
    }

    fn pop(&mut self) -> Option<Request> {
        let request = self.pending.pop_front()?;
        self.queued.remove(&request);
        self.in_flight.insert(request.clone());
        Some(request)
    }

    fn finish(&mut self, request: &Request) {
        self.in_flight.remove(request);
        if self.dirty.remove(request) {
            self.push(request.clone());
        }
    }
}

impl Controller {
    pub fn new(config: ControllerConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config,
            reconcilers: HashMap::new(),
            handle: ControllerHandle { tx },
            rx,
        }
    }

    /// Register the reconciler for its kind, replacing any earlier one.
    pub fn with_reconciler(mut self, reconciler: impl Reconciler + 'static) -> Self {
        self.reconcilers.insert(reconciler.kind(), Arc::new(reconciler));
        self
    }

    pub fn handle(&self) -> ControllerHandle {
        self.handle.clone()
    }

    /// Process requests until `shutdown` turns true or its sender is dropped.
    ///
    /// In-flight reconciles are awaited before returning; queued ones are
    /// discarded.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let workers = self.config.workers.max(1);
        let mut queue = Queue::default();
        let mut tasks: JoinSet<Completion> = JoinSet::new();
        let mut running = TaskRequests::new();
        let mut resync = self
            .config
            .resync_interval
            .filter(|period| !period.is_zero())
            .map(tokio::time::interval);

        info!(workers, kinds = self.reconcilers.len(), "controller started");

        loop {
            while tasks.len() < workers {
                let Some(request) = queue.pop() else { break };
                self.spawn(&mut tasks, &mut running, request);
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                Some(joined) = tasks.join_next_with_id(), if !tasks.is_empty() => {
                    self.joined(&mut queue, &mut running, joined);
                }
                Some(request) = self.rx.recv() => queue.push(request),
                _ = tick(&mut resync) => self.resync(&mut queue).await,
            }
        }

        info!(in_flight = tasks.len(), "controller stopping");
        while let Some(joined) = tasks.join_next().await {
            if let Ok((request, Err(e))) = joined {
                error!(request = %request, error = %e, "reconcile failed during shutdown");
            }
        }
        Ok(())
    }

    fn spawn(&self, tasks: &mut JoinSet<Completion>, running: &mut TaskRequests, request: Request) {
        let reconciler = self.reconcilers.get(&request.kind).cloned();
        let tracked = request.clone();
        let handle = tasks.spawn(async move {
            let outcome = match reconciler {
                Some(reconciler) => AssertUnwindSafe(reconciler.reconcile(&request))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| Err(ControllerError::Panicked(request.to_string()))),
                None => Err(ControllerError::NoReconciler(request.kind)),
            };
            (request, outcome)
        });
        running.insert(handle.id(), tracked);
    }

    /// Settle a finished task. An aborted task still releases its request,
    /// which is retried after the error backoff.
    fn joined(
        &self,
        queue: &mut Queue,
        running: &mut TaskRequests,
        joined: std::result::Result<(task::Id, Completion), JoinError>,
    ) {
        match joined {
            Ok((id, (request, outcome))) => {
                running.remove(&id);
                queue.finish(&request);
                self.complete(queue, request, outcome);
            }
            Err(e) => match running.remove(&e.id()) {
                Some(request) => {
                    error!(request = %request, error = %e, "reconcile task aborted");
                    queue.finish(&request);
                    self.handle.enqueue_after(request, self.config.error_backoff);
                }
                None => error!(error = %e, "reconcile task aborted"),
            },
        }
    }

    fn complete(&self, queue: &mut Queue, request: Request, outcome: Result<ReconcileResult>) {
        match outcome {
            Ok(result) => {
                for follow_up in result.follow_ups {
                    queue.push(follow_up);
                }
                if let Some(delay) = result.requeue_after {
                    debug!(request = %request, delay_ms = delay.as_millis() as u64, "requeue");
                    self.handle.enqueue_after(request, delay);
                }
            }
            Err(ControllerError::NoReconciler(kind)) => {
                error!(request = %request, kind = %kind, "dropping request with no reconciler");
            }
            Err(e) => {
                error!(request = %request, error = %e, "reconcile failed");
                self.handle.enqueue_after(request, self.config.error_backoff);
            }
        }
    }

    async fn resync(&self, queue: &mut Queue) {
        for (kind, reconciler) in &self.reconcilers {
            match reconciler.resync_names().await {
                Ok(names) => {
                    debug!(kind = %kind, count = names.len(), "resync");
                    for name in names {
                        queue.push(Request::new(*kind, name));
                    }
                }
                Err(e) => error!(kind = %kind, error = %e, "resync listing failed"),
            }
        }
    }
}

/// Wait for the next resync tick, or forever when resync is disabled.
async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
