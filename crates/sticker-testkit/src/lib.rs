//! # Sticker Testkit
//!
//! Testing utilities for the sticker system.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: in-memory stores wired into a ready [`TestFixture`]
//! - **Faults**: [`FlakyStore`] counts writes and injects write conflicts
//! - **Generators**: Proptest strategies for stickers and queries
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use sticker::{CallerContext, GroupTarget};
//! use sticker_testkit::fixtures::{png, TestFixture};
//!
//! async fn upload() {
//!     let fixture = TestFixture::new();
//!     let manager = fixture.manager();
//!     let sticker = manager
//!         .uploads()
//!         .upload(&CallerContext::new("alice"), &GroupTarget::SelfDefault, png("a.png", 16))
//!         .await
//!         .unwrap();
//!     assert_eq!(sticker.spec.group_name, "alice-stickers");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use sticker_testkit::generators::{sticker_query, stickers};
//!
//! proptest! {
//!     #[test]
//!     fn listing_is_deterministic(set in stickers(20), query in sticker_query()) {
//!         prop_assert_eq!(query.apply(set.clone()), query.apply(set));
//!     }
//! }
//! ```

pub mod faults;
pub mod fixtures;
pub mod generators;

pub use faults::FlakyStore;
pub use fixtures::{group, png, sticker, wait_until, TestFixture, TestManager, BASE_URL};
