//! # Sticker
//!
//! The unified API for user stickers: upload image files, organise them into
//! groups, and list them back.
//!
//! ## Overview
//!
//! - **Upload**: [`UploadLinkWorkflow`] streams a file into the attachment
//!   store, resolves the target group and creates a linked [`Sticker`]
//! - **Stickers**: [`StickerService`] reads, filters and edits stickers
//! - **Groups**: [`StickerGroupService`] manages the caller's own groups
//! - **Reconciliation**: the controller from [`StickerManager::controller`]
//!   resolves URLs, counts group members and finishes deletions
//!
//! Every owner-scoped call takes an explicit [`CallerContext`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use sticker::{
//!     AttachmentSettings, CallerContext, FilePart, GroupTarget, StickerConfig, StickerManager,
//! };
//! use sticker::store::{chunked, MemoryAttachmentStore, SqliteStore};
//!
//! async fn example() -> sticker::Result<()> {
//!     let store = Arc::new(SqliteStore::open("stickers.db")?);
//!     let attachments = Arc::new(MemoryAttachmentStore::new("https://cdn.example"));
//!     let config = StickerConfig::default().with_attachment(AttachmentSettings::default());
//!     let manager = StickerManager::new(store, attachments, config)?;
//!
//!     let alice = CallerContext::new("alice");
//!     let file = FilePart::new("wave.png", chunked(vec![0u8; 512], 128));
//!     let sticker = manager
//!         .uploads()
//!         .upload(&alice, &GroupTarget::parse("-"), file)
//!         .await?;
//!     assert_eq!(sticker.spec.group_name, "alice-stickers");
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `sticker::core` - Resources and the query engine
//! - `sticker::store` - Resource and attachment stores
//! - `sticker::controller` - Reconcilers and the work-queue driver

pub mod caller;
pub mod config;
pub mod error;
pub mod form;
pub mod groups;
pub mod manager;
pub mod retry;
pub mod stickers;
pub mod upload;

pub use sticker_controller as controller;
pub use sticker_core as core;
pub use sticker_store as store;

pub use caller::CallerContext;
pub use config::{AttachmentSettings, StickerConfig, DEFAULT_MAX_UPLOAD_BYTES};
pub use error::{Result, ServiceError};
pub use form::{FilePart, FormPart, UploadForm, FILE_PART};
pub use groups::StickerGroupService;
pub use manager::StickerManager;
pub use retry::{retry_on_conflict, RetryPolicy};
pub use stickers::{StickerPatch, StickerService};
pub use upload::{storage_key, GroupTarget, UploadLinkWorkflow, STICKER_ATTACHMENT_GROUP};

pub use sticker_core::{
    ListResult, PageRequest, Sticker, StickerGroup, StickerGroupSpec, StickerPhase, StickerQuery,
    StickerSorter,
};
