//! ResourceStore trait: the abstract interface for versioned resources.
//!
//! This trait keeps reconcilers and services storage-agnostic. Implementations
//! include SQLite and in-memory (for tests and embedding).

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use sticker_core::{ListResult, PageRequest, Resource, ResourceKind};
use tokio::sync::broadcast;

use crate::error::{Result, StoreError};

/// The ResourceStore trait: async, versioned CRUD for typed resources.
///
/// # Design Notes
///
/// - **Optimistic concurrency**: `update` and `delete` succeed only when the
///   resource carries the version the store currently holds. A losing write
///   returns [`StoreError::Conflict`] and leaves the stored value untouched.
/// - **Versions**: `create` assigns version 1; every successful write advances
///   it by exactly one.
/// - **Soft delete**: `delete` of a resource with finalizers only sets the
///   deletion timestamp. The record is physically removed by the write that
///   leaves it with a deletion timestamp and no finalizers.
/// - **Copies**: every call returns owned copies; nothing is shared with the
///   caller after the call returns.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch a resource by name.
    async fn fetch<R: Resource>(&self, name: &str) -> Result<Option<R>>;

    /// Create a new resource. Fails with `AlreadyExists` if the name is taken.
    async fn create<R: Resource>(&self, resource: R) -> Result<R>;

    /// Conditionally replace a resource.
    async fn update<R: Resource>(&self, resource: R) -> Result<R>;

    /// Conditionally delete a resource.
    ///
    /// Returns the resource as marked, or as it was when physically removed.
    async fn delete<R: Resource>(&self, resource: R) -> Result<R>;

    /// List resources of one kind.
    ///
    /// Items are filtered by `predicate`, ordered by `comparator` (by name when
    /// absent), then paged.
    async fn list<R: Resource>(
        &self,
        predicate: &(dyn for<'a> Fn(&'a R) -> bool + Send + Sync),
        comparator: Option<&(dyn for<'a, 'b> Fn(&'a R, &'b R) -> Ordering + Send + Sync)>,
        page: PageRequest,
    ) -> Result<ListResult<R>>;

    /// Fetch a resource that must exist.
    async fn get<R: Resource>(&self, name: &str) -> Result<R> {
        self.fetch::<R>(name)
            .await?
            .ok_or_else(|| StoreError::not_found(R::KIND, name))
    }

    /// Every resource of one kind matching `predicate`, ordered by name.
    async fn list_all<R: Resource>(
        &self,
        predicate: &(dyn for<'a> Fn(&'a R) -> bool + Send + Sync),
    ) -> Result<Vec<R>> {
        Ok(self.list(predicate, None, PageRequest::all()).await?.items)
    }
}

#[async_trait]
impl<S: ResourceStore> ResourceStore for Arc<S> {
    async fn fetch<R: Resource>(&self, name: &str) -> Result<Option<R>> {
        (**self).fetch(name).await
    }

    async fn create<R: Resource>(&self, resource: R) -> Result<R> {
        (**self).create(resource).await
    }

    async fn update<R: Resource>(&self, resource: R) -> Result<R> {
        (**self).update(resource).await
    }

    async fn delete<R: Resource>(&self, resource: R) -> Result<R> {
        (**self).delete(resource).await
    }

    async fn list<R: Resource>(
        &self,
        predicate: &(dyn for<'a> Fn(&'a R) -> bool + Send + Sync),
        comparator: Option<&(dyn for<'a, 'b> Fn(&'a R, &'b R) -> Ordering + Send + Sync)>,
        page: PageRequest,
    ) -> Result<ListResult<R>> {
        (**self).list(predicate, comparator, page).await
    }
}

/// What happened to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventType {
    Added,
    Modified,
    /// Physically removed.
    Deleted,
}

/// A change notification emitted after a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: ResourceKind,
    pub name: String,
    pub event_type: WatchEventType,
}

/// Stores that publish change notifications.
///
/// Delivery is best effort: a lagging subscriber misses events and is
/// expected to catch up through a periodic resync.
pub trait Watch {
    fn subscribe(&self) -> broadcast::Receiver<WatchEvent>;
}

impl<S: Watch + ?Sized> Watch for Arc<S> {
    fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        (**self).subscribe()
    }
}
