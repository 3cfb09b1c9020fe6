//! Proptest generators for property-based testing.
//!
//! Value pools are small on purpose so generated sets have plenty of ties
//! and missing values.

use proptest::prelude::*;

use sticker_core::{PageRequest, Sticker, StickerQuery, StickerSorter, StickerSpec};

/// Group names a generated sticker may belong to. Empty means ungrouped.
pub const GROUPS: &[&str] = &["", "cats", "dogs", "memes"];

const TEXTS: &[&str] = &["Alpha", "beta", "Gamma cat", "delta", "Dog"];

const KEYWORDS: &[&str] = &["a", "CAT", "do", "zzz"];

/// Generate a group name from [`GROUPS`].
pub fn group_name() -> impl Strategy<Value = String> {
    prop::sample::select(GROUPS).prop_map(str::to_string)
}

/// Generate optional display text.
pub fn display_text() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop::sample::select(TEXTS))
        .prop_map(|text| text.map(str::to_string))
}

/// Generate an optional manual ordering.
pub fn sequence() -> impl Strategy<Value = Option<i32>> {
    prop::option::of(-3i32..=3)
}

/// Generate a sticker spec without attachment or URL.
pub fn sticker_spec() -> impl Strategy<Value = StickerSpec> {
    (group_name(), display_text(), display_text(), sequence()).prop_map(
        |(group_name, display_name, description, sequence)| StickerSpec {
            group_name,
            display_name,
            description,
            sequence,
            ..Default::default()
        },
    )
}

/// Generate up to `max` stickers with distinct names.
pub fn stickers(max: usize) -> impl Strategy<Value = Vec<Sticker>> {
    prop::collection::vec(sticker_spec(), 0..=max).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, spec)| Sticker::new(format!("sticker-{i:03}"), spec))
            .collect()
    })
}

/// Generate a sort key.
pub fn sticker_sorter() -> impl Strategy<Value = StickerSorter> {
    prop_oneof![
        Just(StickerSorter::DisplayName),
        Just(StickerSorter::Sequence),
        Just(StickerSorter::GroupName),
    ]
}

/// Generate a page request, sometimes unpaged.
pub fn page_request() -> impl Strategy<Value = PageRequest> {
    prop_oneof![
        Just(PageRequest::all()),
        (1usize..4, 1usize..6).prop_map(|(page, size)| PageRequest::new(page, size)),
    ]
}

/// Generate a query over the generated value pools.
pub fn sticker_query() -> impl Strategy<Value = StickerQuery> {
    (
        prop::option::of(group_name()),
        prop::option::of(prop::sample::select(KEYWORDS)),
        prop::option::of(sticker_sorter()),
        prop::option::of(any::<bool>()),
        page_request(),
    )
        .prop_map(|(group, keyword, sort, ascending, page)| StickerQuery {
            group,
            keyword: keyword.map(str::to_string),
            sort,
            ascending,
            page,
            ..Default::default()
        })
}
