//! Database model types for Diesel ORM.

use diesel::prelude::*;

use super::schema::todo_items;
use crate::domain::TodoItem;

/// Database row for a todo item.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = todo_items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TodoRow {
    pub id: i64,
    pub text: String,
    pub done: bool,
}

/// Insertable row. The id is left to SQLite.
#[derive(Insertable, Debug)]
#[diesel(table_name = todo_items)]
pub struct NewTodoRow<'a> {
    pub text: &'a str,
    pub done: bool,
}

/// Mutable columns written back by an update.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = todo_items)]
pub struct TodoChanges<'a> {
    pub text: &'a str,
    pub done: bool,
}

/// Row for `SELECT last_insert_rowid() AS id`.
#[derive(QueryableByName)]
pub(crate) struct LastInsertRowId {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub id: i64,
}

impl From<TodoRow> for TodoItem {
    fn from(row: TodoRow) -> Self {
        TodoItem::from_parts(row.id, row.text, row.done)
    }
}

impl TodoItem {
    pub(crate) fn to_new_row(&self) -> NewTodoRow<'_> {
        NewTodoRow {
            text: &self.text,
            done: self.done,
        }
    }

    pub(crate) fn to_changes(&self) -> TodoChanges<'_> {
        TodoChanges {
            text: &self.text,
            done: self.done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_converts_to_persisted_item() {
        let item = TodoItem::from(TodoRow {
            id: 4,
            text: "Water plants".into(),
            done: true,
        });
        assert_eq!(item.id(), Some(4));
        assert_eq!(item.text, "Water plants");
        assert!(item.done);
    }

    #[test]
    fn new_row_carries_in_memory_default() {
        let item = TodoItem::new("Buy milk");
        let row = item.to_new_row();
        assert_eq!(row.text, "Buy milk");
        assert!(!row.done);
    }

    #[test]
    fn changes_reflect_current_fields() {
        let mut item = TodoItem::new("a");
        item.text = "b".into();
        item.done = true;
        let changes = item.to_changes();
        assert_eq!(changes.text, "b");
        assert!(changes.done);
    }
}
