//! In-memory implementation of the ResourceStore trait.
//!
//! This is primarily for testing and embedding. It has the same semantics as
//! SQLite but keeps everything in memory with no persistence.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use sticker_core::{ListResult, PageRequest, Resource, ResourceKind};
use tokio::sync::broadcast;

use crate::codec;
use crate::error::{Result, StoreError};
use crate::traits::{ResourceStore, Watch, WatchEvent, WatchEventType};
use crate::versioning::{self, now_millis, Write};

/// Capacity of the watch channel before slow subscribers start lagging.
const WATCH_CAPACITY: usize = 1024;

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
    events: broadcast::Sender<WatchEvent>,
}

struct MemoryStoreInner {
    /// Encoded bodies indexed by (kind, name).
    resources: HashMap<(ResourceKind, String), Vec<u8>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(WATCH_CAPACITY);
        Self {
            inner: RwLock::new(MemoryStoreInner {
                resources: HashMap::new(),
            }),
            events,
        }
    }

    /// Number of stored resources of `kind`, including soft-deleted ones.
    pub fn len(&self, kind: ResourceKind) -> usize {
        self.read()
            .map(|inner| inner.resources.keys().filter(|(k, _)| *k == kind).count())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.read()
            .map(|inner| inner.resources.is_empty())
            .unwrap_or(true)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }

    fn stored<R: Resource>(inner: &MemoryStoreInner, name: &str) -> Result<R> {
        let bytes = inner
            .resources
            .get(&(R::KIND, name.to_string()))
            .ok_or_else(|| StoreError::not_found(R::KIND, name))?;
        codec::decode(bytes)
    }

    /// Apply an accepted write and report what happened.
    fn apply<R: Resource>(inner: &mut MemoryStoreInner, write: Write<R>) -> Result<(R, WatchEventType)> {
        match write {
            Write::Put(resource) => {
                let bytes = codec::encode(&resource)?;
                inner
                    .resources
                    .insert((R::KIND, resource.name().to_string()), bytes);
                Ok((resource, WatchEventType::Modified))
            }
            Write::Remove(resource) => {
                inner.resources.remove(&(R::KIND, resource.name().to_string()));
                Ok((resource, WatchEventType::Deleted))
            }
        }
    }

    fn notify(&self, kind: ResourceKind, name: &str, event_type: WatchEventType) {
        // No subscribers is not an error.
        let _ = self.events.send(WatchEvent {
            kind,
            name: name.to_string(),
            event_type,
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Watch for MemoryStore {
    fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn fetch<R: Resource>(&self, name: &str) -> Result<Option<R>> {
        let inner = self.read()?;
        inner
            .resources
            .get(&(R::KIND, name.to_string()))
            .map(|bytes| codec::decode(bytes))
            .transpose()
    }

    async fn create<R: Resource>(&self, resource: R) -> Result<R> {
        let resource = versioning::prepare_create(resource, now_millis())?;
        let bytes = codec::encode(&resource)?;
        {
            let mut inner = self.write()?;
            let key = (R::KIND, resource.name().to_string());
            if inner.resources.contains_key(&key) {
                return Err(StoreError::AlreadyExists {
                    kind: R::KIND,
                    name: key.1,
                });
            }
            inner.resources.insert(key, bytes);
        }
        self.notify(R::KIND, resource.name(), WatchEventType::Added);
        Ok(resource)
    }

    async fn update<R: Resource>(&self, resource: R) -> Result<R> {
        let (resource, event) = {
            let mut inner = self.write()?;
            let stored: R = Self::stored(&inner, resource.name())?;
            let write = versioning::prepare_update(&stored, resource)?;
            Self::apply(&mut inner, write)?
        };
        self.notify(R::KIND, resource.name(), event);
        Ok(resource)
    }

    async fn delete<R: Resource>(&self, resource: R) -> Result<R> {
        let (resource, event) = {
            let mut inner = self.write()?;
            let stored: R = Self::stored(&inner, resource.name())?;
            let write = versioning::prepare_delete(&stored, resource, now_millis())?;
            Self::apply(&mut inner, write)?
        };
        self.notify(R::KIND, resource.name(), event);
        Ok(resource)
    }

    async fn list<R: Resource>(
        &self,
        predicate: &(dyn for<'a> Fn(&'a R) -> bool + Send + Sync),
        comparator: Option<&(dyn for<'a, 'b> Fn(&'a R, &'b R) -> Ordering + Send + Sync)>,
        page: PageRequest,
    ) -> Result<ListResult<R>> {
        let mut items: Vec<R> = {
            let inner = self.read()?;
            inner
                .resources
                .iter()
                .filter(|((kind, _), _)| *kind == R::KIND)
                .map(|(_, bytes)| codec::decode::<R>(bytes))
                .collect::<Result<Vec<_>>>()?
        };
        items.retain(|r| predicate(r));
        sort_items(&mut items, comparator);
        Ok(page.apply(items))
    }
}

/// Order by `comparator`, or by name when none is given.
pub(crate) fn sort_items<R: Resource>(
    items: &mut [R],
    comparator: Option<&(dyn for<'a, 'b> Fn(&'a R, &'b R) -> Ordering + Send + Sync)>,
) {
    match comparator {
        Some(cmp) => items.sort_by(|a, b| cmp(a, b)),
        None => items.sort_by(|a, b| a.name().cmp(b.name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use sticker_core::{ResourceVersion, Sticker, StickerGroup, StickerGroupSpec, StickerSpec};

    fn sticker(name: &str, group: &str) -> Sticker {
        Sticker::new(
            name,
            StickerSpec {
                group_name: group.into(),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        let created = store.create(sticker("s1", "g")).await.unwrap();
        assert_eq!(created.version(), ResourceVersion(1));

        let fetched: Sticker = store.get("s1").await.unwrap();
        assert_eq!(fetched, created);
        assert!(store.fetch::<Sticker>("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_kinds_do_not_collide() {
        let store = MemoryStore::new();
        store.create(sticker("same", "")).await.unwrap();
        store
            .create(StickerGroup::new("same", StickerGroupSpec::default()))
            .await
            .unwrap();
        assert_eq!(store.len(ResourceKind::Sticker), 1);
        assert_eq!(store.len(ResourceKind::StickerGroup), 1);
    }

    #[tokio::test]
    async fn test_create_twice_already_exists() {
        let store = MemoryStore::new();
        store.create(sticker("s1", "")).await.unwrap();
        let err = store.create(sticker("s1", "")).await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_losing_write_leaves_store_untouched() {
        let store = MemoryStore::new();
        let v1 = store.create(sticker("s1", "a")).await.unwrap();

        let mut winner = v1.clone();
        winner.spec.group_name = "b".into();
        store.update(winner).await.unwrap();

        let mut loser = v1;
        loser.spec.group_name = "c".into();
        let err = store.update(loser).await.unwrap_err();
        assert!(err.is_conflict());

        let current: Sticker = store.get("s1").await.unwrap();
        assert_eq!(current.spec.group_name, "b");
        assert_eq!(current.version(), ResourceVersion(2));
    }

    #[tokio::test]
    async fn test_two_phase_delete() {
        let store = MemoryStore::new();
        let mut s = sticker("s1", "");
        s.metadata.add_finalizer("cleanup");
        let s = store.create(s).await.unwrap();

        let marked = store.delete(s).await.unwrap();
        assert!(marked.metadata.is_deleted());
        let still_there: Sticker = store.get("s1").await.unwrap();
        assert!(still_there.metadata.is_deleted());

        let mut cleaned = still_there;
        cleaned.metadata.remove_finalizer("cleanup");
        store.update(cleaned).await.unwrap();
        assert!(store.fetch::<Sticker>("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_sorts_and_pages() {
        let store = MemoryStore::new();
        for (name, group) in [("d", "g"), ("a", "g"), ("c", "other"), ("b", "g")] {
            store.create(sticker(name, group)).await.unwrap();
        }

        let page = store
            .list(&|s: &Sticker| s.spec.group_name == "g", None, PageRequest::new(1, 2))
            .await
            .unwrap();
        let names: Vec<_> = page.items.iter().map(|s| s.metadata.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(page.total, 3);

        let reversed = store
            .list(
                &|_: &Sticker| true,
                Some(&|a: &Sticker, b: &Sticker| b.metadata.name.cmp(&a.metadata.name)),
                PageRequest::all(),
            )
            .await
            .unwrap();
        assert_eq!(reversed.items[0].metadata.name, "d");
    }

    #[tokio::test]
    async fn test_list_through_arc_with_borrowing_closures() {
        let store = Arc::new(MemoryStore::new());
        for (name, group) in [("x", "keep"), ("y", "drop"), ("z", "keep")] {
            store.create(sticker(name, group)).await.unwrap();
        }

        let wanted = String::from("keep");
        let descending = true;
        let predicate = |s: &Sticker| s.spec.group_name == wanted;
        let comparator = |a: &Sticker, b: &Sticker| {
            let order = a.metadata.name.cmp(&b.metadata.name);
            if descending { order.reverse() } else { order }
        };
        let listed = store
            .list(&predicate, Some(&comparator), PageRequest::all())
            .await
            .unwrap();
        let names: Vec<_> = listed.items.iter().map(|s| s.metadata.name.as_str()).collect();
        assert_eq!(names, vec!["z", "x"]);

        let all = store.list_all(&predicate).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_watch_events() {
        let store = MemoryStore::new();
        let mut events = store.subscribe();

        let s = store.create(sticker("s1", "")).await.unwrap();
        store.delete(s).await.unwrap();

        let added = events.recv().await.unwrap();
        assert_eq!(added.event_type, WatchEventType::Added);
        assert_eq!(added.name, "s1");
        let deleted = events.recv().await.unwrap();
        assert_eq!(deleted.event_type, WatchEventType::Deleted);
    }
}
