//! The todo item entity.
//!
//! A [`TodoItem`] is a plain value. It has no id until a session persists it;
//! after that the id is fixed and only `text` and `done` change.
//!
//! # Examples
//!
//! ```
//! use todo_store::domain::TodoItem;
//!
//! let item = TodoItem::new("Buy milk");
//! assert!(!item.done);
//! assert_eq!(item.id(), None);
//! assert_eq!(item.to_string(), "Buy milk");
//! ```

use std::fmt;

/// Maximum length of [`TodoItem::text`], enforced by the storage layer.
pub const TEXT_MAX_LEN: usize = 50;

/// One task on the todo list.
#[derive(Clone, PartialEq, Eq)]
pub struct TodoItem {
    id: Option<i64>,
    /// What needs doing. At most [`TEXT_MAX_LEN`] characters once stored.
    pub text: String,
    pub done: bool,
}

impl TodoItem {
    /// Create an unsaved, not-done item.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            done: false,
        }
    }

    /// Storage-assigned id, or `None` before the first persist.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Rebuild an item that was read from storage.
    pub(crate) fn from_parts(id: i64, text: String, done: bool) -> Self {
        Self {
            id: Some(id),
            text,
            done,
        }
    }

    pub(crate) fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

impl fmt::Display for TodoItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for TodoItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "TodoItem(id={id}, text={:?})", self.text),
            None => write!(f, "TodoItem(id=None, text={:?})", self.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_item_is_not_done() {
        for text in ["", "a", "Buy milk", &"x".repeat(TEXT_MAX_LEN)] {
            let item = TodoItem::new(text);
            assert!(!item.done, "{text:?} should start not done");
            assert_eq!(item.id(), None);
            assert!(!item.is_persisted());
        }
    }

    #[test]
    fn display_is_text_only() {
        let item = TodoItem::from_parts(3, "Walk the dog".into(), true);
        assert_eq!(item.to_string(), "Walk the dog");
        assert_eq!(format!("{item}"), item.text);
    }

    #[test]
    fn display_does_not_escape() {
        let item = TodoItem::new("say \"hi\"\n");
        assert_eq!(item.to_string(), "say \"hi\"\n");
    }

    #[test]
    fn debug_contains_id_and_quoted_text() {
        let item = TodoItem::from_parts(7, "Buy milk".into(), false);
        assert_eq!(format!("{item:?}"), r#"TodoItem(id=7, text="Buy milk")"#);
    }

    #[test]
    fn debug_escapes_text() {
        let item = TodoItem::from_parts(1, "it's \"done\"\n".into(), false);
        assert_eq!(
            format!("{item:?}"),
            r#"TodoItem(id=1, text="it's \"done\"\n")"#
        );
    }

    #[test]
    fn debug_before_persist_shows_none() {
        let item = TodoItem::new("draft");
        assert_eq!(format!("{item:?}"), r#"TodoItem(id=None, text="draft")"#);
    }

    #[test]
    fn assign_id_persists_item() {
        let mut item = TodoItem::new("x");
        item.assign_id(12);
        assert_eq!(item.id(), Some(12));
        assert!(item.is_persisted());
    }
}
