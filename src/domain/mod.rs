//! Storage-agnostic entity types.

mod todo_item;

pub use todo_item::{TodoItem, TEXT_MAX_LEN};
