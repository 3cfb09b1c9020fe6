//! Sticker listing: filter predicate and deterministic ordering.
//!
//! A [`StickerQuery`] is built from boundary query parameters and split into
//! a [`StickerFilter`] (what to include) and a [`StickerOrder`] (how to sort).
//! Both are pure and can be shared freely across threads.
//!
//! Ordering rules:
//! - the default is [`StickerSorter::Sequence`], ascending;
//! - a sticker without a value for the sort key always sorts after stickers
//!   that have one, whatever the direction;
//! - ties are broken by resource name, ascending, so the order is total.

use std::cmp::Ordering;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::page::PageRequest;
use crate::selector::LabelSelector;
use crate::sticker::Sticker;

/// The closed set of sort keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StickerSorter {
    DisplayName,
    #[default]
    Sequence,
    GroupName,
}

impl StickerSorter {
    pub const fn as_str(self) -> &'static str {
        match self {
            StickerSorter::DisplayName => "DISPLAY_NAME",
            StickerSorter::Sequence => "SEQUENCE",
            StickerSorter::GroupName => "GROUP_NAME",
        }
    }
}

impl FromStr for StickerSorter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "displayname" => Ok(StickerSorter::DisplayName),
            "sequence" => Ok(StickerSorter::Sequence),
            "groupname" => Ok(StickerSorter::GroupName),
            _ => Err(CoreError::UnsupportedSort(s.to_string())),
        }
    }
}

/// A sort key plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StickerOrder {
    pub sorter: StickerSorter,
    pub ascending: bool,
}

impl Default for StickerOrder {
    fn default() -> Self {
        Self {
            sorter: StickerSorter::Sequence,
            ascending: true,
        }
    }
}

impl StickerOrder {
    pub fn new(sorter: StickerSorter, ascending: bool) -> Self {
        Self { sorter, ascending }
    }

    /// Total order over stickers.
    pub fn compare(&self, a: &Sticker, b: &Sticker) -> Ordering {
        let primary = match self.sorter {
            StickerSorter::Sequence => {
                missing_last(a.spec.sequence, b.spec.sequence, self.ascending)
            }
            StickerSorter::DisplayName => missing_last(
                a.spec.display_name.as_deref(),
                b.spec.display_name.as_deref(),
                self.ascending,
            ),
            StickerSorter::GroupName => missing_last(a.group(), b.group(), self.ascending),
        };
        primary.then_with(|| a.metadata.name.cmp(&b.metadata.name))
    }

    /// Sort a slice in place.
    pub fn sort(&self, stickers: &mut [Sticker]) {
        stickers.sort_by(|a, b| self.compare(a, b));
    }
}

fn missing_last<T: Ord>(a: Option<T>, b: Option<T>, ascending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if ascending => a.cmp(&b),
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Inclusion predicate: group AND keyword AND label selector.
#[derive(Debug, Clone, Default)]
pub struct StickerFilter {
    group: Option<String>,
    keyword: Option<String>,
    selector: LabelSelector,
}

impl StickerFilter {
    pub fn matches(&self, sticker: &Sticker) -> bool {
        if let Some(group) = &self.group {
            if sticker.spec.group_name != *group {
                return false;
            }
        }
        if let Some(keyword) = &self.keyword {
            let hit = [&sticker.spec.display_name, &sticker.spec.description]
                .into_iter()
                .flatten()
                .any(|text| text.to_lowercase().contains(keyword.as_str()));
            if !hit {
                return false;
            }
        }
        self.selector.matches(&sticker.metadata)
    }
}

/// A listing request over stickers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StickerQuery {
    pub group: Option<String>,
    pub keyword: Option<String>,
    pub sort: Option<StickerSorter>,
    pub ascending: Option<bool>,
    pub page: PageRequest,
    pub label_selector: LabelSelector,
}

impl StickerQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn sort(mut self, sorter: StickerSorter, ascending: bool) -> Self {
        self.sort = Some(sorter);
        self.ascending = Some(ascending);
        self
    }

    pub fn page(mut self, page: usize, size: usize) -> Self {
        self.page = PageRequest::new(page, size);
        self
    }

    pub fn selector(mut self, selector: LabelSelector) -> Self {
        self.label_selector = selector;
        self
    }

    /// Build a query from boundary parameters.
    ///
    /// Recognized keys are `group`, `keyword`, `sort`, `sortOrder`, `page`,
    /// `size` and `labelSelector`. The first occurrence of a key wins and
    /// blank values count as absent.
    pub fn from_params<'a, I>(params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut query = Self::new();
        let mut seen = std::collections::HashSet::new();

        for (key, value) in params {
            if !seen.insert(key) {
                continue;
            }
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key {
                "group" => query.group = Some(value.to_string()),
                "keyword" => query.keyword = Some(value.to_string()),
                "sort" => query.sort = Some(value.parse()?),
                "sortOrder" => query.ascending = Some(parse_direction(value)?),
                "page" => query.page.page = parse_number("page", value)?,
                "size" => query.page.size = parse_number("size", value)?,
                "labelSelector" => query.label_selector = LabelSelector::parse(value)?,
                _ => {}
            }
        }

        Ok(query)
    }

    pub fn filter(&self) -> StickerFilter {
        StickerFilter {
            group: self.group.clone(),
            keyword: self.keyword.as_ref().map(|k| k.to_lowercase()),
            selector: self.label_selector.clone(),
        }
    }

    pub fn order(&self) -> StickerOrder {
        StickerOrder::new(self.sort.unwrap_or_default(), self.ascending.unwrap_or(true))
    }

    /// Apply the whole query to an in-memory set of stickers.
    pub fn apply(&self, stickers: impl IntoIterator<Item = Sticker>) -> crate::ListResult<Sticker> {
        let filter = self.filter();
        let mut matched: Vec<Sticker> = stickers.into_iter().filter(|s| filter.matches(s)).collect();
        self.order().sort(&mut matched);
        self.page.apply(matched)
    }
}

fn parse_direction(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "asc" => Ok(true),
        "false" | "desc" => Ok(false),
        _ => Err(CoreError::InvalidQuery {
            param: "sortOrder",
            message: format!("expected true or false, got {value:?}"),
        }),
    }
}

fn parse_number(param: &'static str, value: &str) -> Result<usize> {
    value.parse().map_err(|_| CoreError::InvalidQuery {
        param,
        message: format!("expected a non-negative integer, got {value:?}"),
    })
}
