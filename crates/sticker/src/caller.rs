//! Identity of the user a service call is made for.

use std::fmt;

use sticker_core::StickerGroup;

/// The authenticated caller of a service operation.
///
/// Services never look identity up from ambient state; every owner-scoped
/// call takes one of these explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerContext {
    username: String,
}

impl CallerContext {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Name of this caller's default group.
    pub fn default_group_name(&self) -> String {
        StickerGroup::default_name_for(&self.username)
    }

    pub fn owns(&self, group: &StickerGroup) -> bool {
        group.is_owned_by(&self.username)
    }
}

impl fmt::Display for CallerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_group_name() {
        let caller = CallerContext::new("alice");
        assert_eq!(caller.default_group_name(), "alice-stickers");
        assert!(caller.owns(&StickerGroup::default_for("alice")));
        assert!(!caller.owns(&StickerGroup::default_for("bob")));
    }
}
