//! # Sticker Core
//!
//! Pure model for the sticker system: resources, their lifecycle helpers,
//! and the listing query engine.
//!
//! This crate contains no I/O, no storage, no scheduling. Everything here is
//! plain data and deterministic functions over it.
//!
//! ## Key Types
//!
//! - [`Sticker`] - A user-uploaded image reference
//! - [`StickerGroup`] - A named collection of stickers
//! - [`Metadata`] - Name, version token, finalizers and soft-delete marker
//! - [`Resource`] - The trait the resource store is generic over
//! - [`StickerQuery`] - Filter, order and page a set of stickers
//!
//! ## Lifecycle
//!
//! ```text
//! Pending --reconcile--> Active --delete--> Terminating --finalizer removed--> gone
//! ```
//!
//! See [`StickerPhase`] and [`Sticker::lifecycle`].

pub mod error;
pub mod group;
pub mod metadata;
pub mod page;
pub mod query;
pub mod selector;
pub mod sticker;
pub mod types;

pub use error::{CoreError, Result};
pub use group::{StickerGroup, StickerGroupSpec, StickerGroupStatus};
pub use metadata::{validate_name, Metadata, Resource, MAX_NAME_LEN};
pub use page::{ListResult, PageRequest};
pub use query::{StickerFilter, StickerOrder, StickerQuery, StickerSorter};
pub use selector::{LabelRequirement, LabelSelector};
pub use sticker::{Sticker, StickerPhase, StickerSpec, StickerStatus, CLEANUP_FINALIZER};
pub use types::{ResourceKind, ResourceVersion};
