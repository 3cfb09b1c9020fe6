//! SQLite implementation of the ResourceStore trait.
//!
//! This is the persistent storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use sticker_core::{ListResult, PageRequest, Resource, ResourceKind};
use tokio::sync::broadcast;

use crate::codec;
use crate::error::{Result, StoreError};
use crate::memory::sort_items;
use crate::migration;
use crate::traits::{ResourceStore, Watch, WatchEvent, WatchEventType};
use crate::versioning::{self, now_millis, Write};

const WATCH_CAPACITY: usize = 1024;

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
    events: broadcast::Sender<WatchEvent>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        let (events, _) = broadcast::channel(WATCH_CAPACITY);
        Self {
            conn: Arc::new(Mutex::new(conn)),
            events,
        }
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&conn)
        })
        .await
        .map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("spawn_blocking failed: {}", e)),
            ))
        })?
    }

    fn notify(&self, kind: ResourceKind, name: &str, event_type: WatchEventType) {
        let _ = self.events.send(WatchEvent {
            kind,
            name: name.to_string(),
            event_type,
        });
    }
}

fn load<R: Resource>(conn: &Connection, name: &str) -> Result<Option<R>> {
    let body: Option<Vec<u8>> = conn
        .query_row(
            "SELECT body FROM resources WHERE kind = ?1 AND name = ?2",
            params![R::KIND.as_str(), name],
            |row| row.get(0),
        )
        .optional()?;
    body.map(|bytes| codec::decode(&bytes)).transpose()
}

/// Persist an accepted write, guarded by the version it was prepared from.
fn apply<R: Resource>(
    conn: &Connection,
    stored: &R,
    write: Write<R>,
) -> Result<(R, WatchEventType)> {
    let expected = stored.version().get() as i64;
    let (changed, resource, event) = match write {
        Write::Put(resource) => {
            let body = codec::encode(&resource)?;
            let changed = conn.execute(
                "UPDATE resources SET version = ?1, deleted_at = ?2, body = ?3
                 WHERE kind = ?4 AND name = ?5 AND version = ?6",
                params![
                    resource.version().get() as i64,
                    resource.metadata().deletion_timestamp,
                    body,
                    R::KIND.as_str(),
                    resource.name(),
                    expected,
                ],
            )?;
            (changed, resource, WatchEventType::Modified)
        }
        Write::Remove(resource) => {
            let changed = conn.execute(
                "DELETE FROM resources WHERE kind = ?1 AND name = ?2 AND version = ?3",
                params![R::KIND.as_str(), resource.name(), expected],
            )?;
            (changed, resource, WatchEventType::Deleted)
        }
    };

    if changed == 0 {
        // Another connection to the same file got there first.
        let actual = load::<R>(conn, resource.name())?
            .ok_or_else(|| StoreError::not_found(R::KIND, resource.name()))?
            .version();
        return Err(StoreError::Conflict {
            kind: R::KIND,
            name: resource.name().to_string(),
            expected: stored.version(),
            actual,
        });
    }
    Ok((resource, event))
}

fn require<R: Resource>(conn: &Connection, name: &str) -> Result<R> {
    load::<R>(conn, name)?.ok_or_else(|| StoreError::not_found(R::KIND, name))
}

impl Watch for SqliteStore {
    fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl ResourceStore for SqliteStore {
    async fn fetch<R: Resource>(&self, name: &str) -> Result<Option<R>> {
        let name = name.to_string();
        self.blocking(move |conn| load::<R>(conn, &name)).await
    }

    async fn create<R: Resource>(&self, resource: R) -> Result<R> {
        let resource = versioning::prepare_create(resource, now_millis())?;
        let body = codec::encode(&resource)?;
        let row = (
            resource.name().to_string(),
            resource.version().get() as i64,
            resource.metadata().creation_timestamp.unwrap_or_default(),
        );

        self.blocking(move |conn| {
            let (name, version, created_at) = row;
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO resources (kind, name, version, deleted_at, created_at, body)
                 VALUES (?1, ?2, ?3, NULL, ?4, ?5)",
                params![R::KIND.as_str(), name, version, created_at, body],
            )?;
            if inserted == 0 {
                return Err(StoreError::AlreadyExists { kind: R::KIND, name });
            }
            Ok(())
        })
        .await?;

        self.notify(R::KIND, resource.name(), WatchEventType::Added);
        Ok(resource)
    }

    async fn update<R: Resource>(&self, resource: R) -> Result<R> {
        let (resource, event) = self
            .blocking(move |conn| {
                let stored: R = require(conn, resource.name())?;
                let write = versioning::prepare_update(&stored, resource)?;
                apply(conn, &stored, write)
            })
            .await?;
        self.notify(R::KIND, resource.name(), event);
        Ok(resource)
    }

    async fn delete<R: Resource>(&self, resource: R) -> Result<R> {
        let (resource, event) = self
            .blocking(move |conn| {
                let stored: R = require(conn, resource.name())?;
                let write = versioning::prepare_delete(&stored, resource, now_millis())?;
                apply(conn, &stored, write)
            })
            .await?;
        self.notify(R::KIND, resource.name(), event);
        Ok(resource)
    }

    async fn list<R: Resource>(
        &self,
        predicate: &(dyn for<'a> Fn(&'a R) -> bool + Send + Sync),
        comparator: Option<&(dyn for<'a, 'b> Fn(&'a R, &'b R) -> Ordering + Send + Sync)>,
        page: PageRequest,
    ) -> Result<ListResult<R>> {
        // The predicate borrows from the caller, so decoding happens on the
        // blocking pool and filtering back here.
        let bodies = self
            .blocking(|conn| {
                let mut stmt = conn.prepare("SELECT body FROM resources WHERE kind = ?1")?;
                let rows = stmt
                    .query_map(params![R::KIND.as_str()], |row| row.get::<_, Vec<u8>>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        let mut items = bodies
            .iter()
            .map(|bytes| codec::decode::<R>(bytes))
            .collect::<Result<Vec<_>>>()?;
        items.retain(|r| predicate(r));
        sort_items(&mut items, comparator);
        Ok(page.apply(items))
    }
}
