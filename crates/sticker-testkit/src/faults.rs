//! Fault injection around a resource store.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use sticker_core::{ListResult, PageRequest, Metadata, Resource};
use sticker_store::{ResourceStore, Result, StoreError, Watch, WatchEvent};
use tokio::sync::broadcast;

/// A write another client slips in ahead of a failing update.
type ConcurrentWrite = Arc<dyn Fn(&mut Metadata) + Send + Sync>;

/// Wraps a store, counts writes and fails selected updates with a conflict.
///
/// Plain injected conflicts are reported before the inner store is touched,
/// so the stored value and its version stay as they were. With a concurrent
/// write installed, the stored resource is changed and its version advanced
/// first, as if another client had won the race.
pub struct FlakyStore<S> {
    inner: S,
    conflicts: AtomicU32,
    concurrent: RwLock<Option<ConcurrentWrite>>,
    creates: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
}

impl<S> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            conflicts: AtomicU32::new(0),
            concurrent: RwLock::new(None),
            creates: AtomicU64::new(0),
            updates: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
        }
    }

    /// Fail the next `n` updates with a conflict.
    pub fn inject_conflicts(&self, n: u32) {
        self.set_concurrent(None);
        self.conflicts.store(n, AtomicOrdering::SeqCst);
    }

    /// Fail the next `n` updates after applying `write` to the stored copy.
    ///
    /// Concurrent writes go straight to the inner store and are not counted.
    pub fn inject_concurrent_writes(
        &self,
        n: u32,
        write: impl Fn(&mut Metadata) + Send + Sync + 'static,
    ) {
        self.set_concurrent(Some(Arc::new(write)));
        self.conflicts.store(n, AtomicOrdering::SeqCst);
    }

    pub fn conflicts_remaining(&self) -> u32 {
        self.conflicts.load(AtomicOrdering::SeqCst)
    }

    /// Successful creates, updates and deletes so far.
    pub fn writes(&self) -> u64 {
        self.creates() + self.updates() + self.deletes()
    }

    pub fn creates(&self) -> u64 {
        self.creates.load(AtomicOrdering::SeqCst)
    }

    pub fn updates(&self) -> u64 {
        self.updates.load(AtomicOrdering::SeqCst)
    }

    pub fn deletes(&self) -> u64 {
        self.deletes.load(AtomicOrdering::SeqCst)
    }

    pub fn reset_counts(&self) {
        self.creates.store(0, AtomicOrdering::SeqCst);
        self.updates.store(0, AtomicOrdering::SeqCst);
        self.deletes.store(0, AtomicOrdering::SeqCst);
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn set_concurrent(&self, write: Option<ConcurrentWrite>) {
        match self.concurrent.write() {
            Ok(mut slot) => *slot = write,
            Err(poisoned) => *poisoned.into_inner() = write,
        }
    }

    fn concurrent_write(&self) -> Option<ConcurrentWrite> {
        match self.concurrent.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn take_conflict(&self) -> bool {
        self.conflicts
            .fetch_update(AtomicOrdering::SeqCst, AtomicOrdering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl<S: ResourceStore> ResourceStore for FlakyStore<S> {
    async fn fetch<R: Resource>(&self, name: &str) -> Result<Option<R>> {
        self.inner.fetch(name).await
    }

    async fn create<R: Resource>(&self, resource: R) -> Result<R> {
        let created = self.inner.create(resource).await?;
        self.creates.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(created)
    }

    async fn update<R: Resource>(&self, resource: R) -> Result<R> {
        if self.take_conflict() {
            let expected = resource.metadata().version;
            let actual = match self.concurrent_write() {
                Some(write) => {
                    let mut stored: R = self.inner.get(resource.name()).await?;
                    write(stored.metadata_mut());
                    self.inner.update(stored).await?.version()
                }
                None => expected.next(),
            };
            return Err(StoreError::Conflict {
                kind: R::KIND,
                name: resource.name().to_string(),
                expected,
                actual,
            });
        }
        let updated = self.inner.update(resource).await?;
        self.updates.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(updated)
    }

    async fn delete<R: Resource>(&self, resource: R) -> Result<R> {
        let deleted = self.inner.delete(resource).await?;
        self.deletes.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(deleted)
    }

    async fn list<R: Resource>(
        &self,
        predicate: &(dyn for<'a> Fn(&'a R) -> bool + Send + Sync),
        comparator: Option<&(dyn for<'a, 'b> Fn(&'a R, &'b R) -> Ordering + Send + Sync)>,
        page: PageRequest,
    ) -> Result<ListResult<R>> {
        self.inner.list(predicate, comparator, page).await
    }
}

impl<S: Watch> Watch for FlakyStore<S> {
    fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.inner.subscribe()
    }
}
