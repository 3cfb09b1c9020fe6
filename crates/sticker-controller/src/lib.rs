//! # Sticker Controller
//!
//! Background reconciliation for stickers and sticker groups.
//!
//! ## Overview
//!
//! Clients write intent (an attachment reference, a group name, a deletion
//! mark). The reconcilers derive everything else:
//!
//! - [`StickerReconciler`] resolves the download URL, keeps the cleanup
//!   finalizer and releases it once a sticker is marked for deletion
//! - [`StickerGroupReconciler`] recomputes each group's sticker count
//!
//! [`Controller`] drives them from a deduplicating work queue, and
//! [`forward_events`] feeds that queue from a store's watch channel.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use sticker_controller::{
//!     forward_events, Controller, ControllerConfig, ReconcilerConfig, StickerGroupReconciler,
//!     StickerReconciler,
//! };
//! use sticker_store::{MemoryAttachmentStore, MemoryStore};
//!
//! async fn example() {
//!     let store = Arc::new(MemoryStore::new());
//!     let attachments = Arc::new(MemoryAttachmentStore::new("https://cdn.example"));
//!
//!     let controller = Controller::new(ControllerConfig::default())
//!         .with_reconciler(StickerReconciler::new(
//!             store.clone(),
//!             attachments,
//!             ReconcilerConfig::default(),
//!         ))
//!         .with_reconciler(StickerGroupReconciler::new(store.clone()));
//!
//!     let (stop, stopped) = tokio::sync::watch::channel(false);
//!     forward_events(&store, controller.handle(), stopped.clone());
//!     let running = tokio::spawn(controller.run(stopped));
//!
//!     // ... write stickers ...
//!
//!     stop.send(true).unwrap();
//!     running.await.unwrap().unwrap();
//! }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod group;
pub mod reconciler;
pub mod sticker;
pub mod watch;

pub use config::{ControllerConfig, ReconcilerConfig};
pub use controller::{Controller, ControllerHandle};
pub use error::{ControllerError, Result};
pub use group::{sync_sticker_count, StickerGroupReconciler};
pub use reconciler::{ReconcileResult, Reconciler, Request};
pub use sticker::StickerReconciler;
pub use watch::forward_events;
