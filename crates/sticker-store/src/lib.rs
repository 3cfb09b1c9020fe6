//! # Sticker Store
//!
//! Storage contracts for the sticker system: a versioned [`ResourceStore`] for
//! stickers and groups, and an [`AttachmentStore`] for the uploaded bytes.
//!
//! ## Overview
//!
//! Reconcilers and services are generic over [`ResourceStore`], so they never
//! know which backend they run against. [`SqliteStore`] persists to a file,
//! [`MemoryStore`] keeps everything in memory for tests and embedding. Both
//! publish change notifications through [`Watch`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sticker_core::{Sticker, StickerSpec};
//! use sticker_store::{ResourceStore, SqliteStore};
//!
//! async fn example() -> sticker_store::Result<()> {
//!     let store = SqliteStore::open("stickers.db")?;
//!
//!     let created = store.create(Sticker::new("s1", StickerSpec::default())).await?;
//!     let mut edited = created.clone();
//!     edited.spec.sequence = Some(1);
//!
//!     // Succeeds: written from the latest version.
//!     store.update(edited).await?;
//!     // Fails with Conflict: `created` is now stale.
//!     assert!(store.update(created).await.unwrap_err().is_conflict());
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Optimistic concurrency**: writes carry the version they were read at
//! - **Soft delete**: resources with finalizers are marked, not removed
//! - **Size guard**: [`limit_size`] fails an upload body as soon as it
//!   crosses the limit

pub mod attachment;
pub mod codec;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod stream;
pub mod traits;
mod versioning;

pub use attachment::{Attachment, AttachmentStore, MemoryAttachmentStore, DEFAULT_POLICY};
pub use error::{AttachmentError, AttachmentResult, Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use stream::{chunked, limit_size, ByteStream, StreamError};
pub use traits::{ResourceStore, Watch, WatchEvent, WatchEventType};
