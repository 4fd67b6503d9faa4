use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::{authors, books};
use crate::sync::{ColumnDef, TableShape};

/// Whether a row has been soft-deleted, derived from its `deleted_at` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionStatus {
    Active,
    Deleted(DateTime<Utc>),
}

impl From<Option<DateTime<Utc>>> for DeletionStatus {
    fn from(deleted_at: Option<DateTime<Utc>>) -> Self {
        match deleted_at {
            None => DeletionStatus::Active,
            Some(at) => DeletionStatus::Deleted(at),
        }
    }
}

#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    diesel::Queryable,
    diesel::Selectable,
    diesel::Identifiable,
    diesel::Associations,
)]
#[diesel(table_name = books)]
#[diesel(belongs_to(Author, foreign_key = author_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Book {
    pub id: String,
    pub name: String,
    pub pages: i32,
    pub stock: i32,
    pub cost: f64,
    pub stock_code: String,
    pub isbn: String,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Book {
    pub fn status(&self) -> DeletionStatus {
        self.deleted_at.into()
    }
}

/// The caller-supplied fields of a book. The store fills in timestamps.
#[derive(Debug, Clone, PartialEq, Deserialize, diesel::Insertable, diesel::AsChangeset)]
#[diesel(table_name = books)]
pub struct NewBook {
    pub id: String,
    pub name: String,
    pub pages: i32,
    pub stock: i32,
    pub cost: f64,
    pub stock_code: String,
    pub isbn: String,
    pub author_id: String,
}

#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    diesel::Queryable,
    diesel::Selectable,
    diesel::Identifiable,
)]
#[diesel(table_name = authors)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Author {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Author {
    pub fn status(&self) -> DeletionStatus {
        self.deleted_at.into()
    }
}

#[derive(Debug, Clone, PartialEq, diesel::Insertable)]
#[diesel(table_name = authors)]
pub struct NewAuthor {
    pub id: String,
    pub name: String,
}

/// An author together with the books whose `author_id` points at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorWithBooks {
    #[serde(flatten)]
    pub author: Author,
    pub books: Vec<Book>,
}

const TIMESTAMP_COLUMNS: [ColumnDef; 3] = [
    ColumnDef::new("created_at", "TIMESTAMPTZ NOT NULL DEFAULT now()"),
    ColumnDef::new("updated_at", "TIMESTAMPTZ NOT NULL DEFAULT now()"),
    ColumnDef::new("deleted_at", "TIMESTAMPTZ NULL"),
];

impl TableShape for Book {
    const TABLE: &'static str = "books";
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::new("id", "TEXT NOT NULL DEFAULT ''"),
        ColumnDef::new("name", "TEXT NOT NULL DEFAULT ''"),
        ColumnDef::new("pages", "INTEGER NOT NULL DEFAULT 0"),
        ColumnDef::new("stock", "INTEGER NOT NULL DEFAULT 0"),
        ColumnDef::new("cost", "DOUBLE PRECISION NOT NULL DEFAULT 0"),
        ColumnDef::new("stock_code", "TEXT NOT NULL DEFAULT ''"),
        ColumnDef::new("isbn", "TEXT NOT NULL DEFAULT ''"),
        ColumnDef::new("author_id", "TEXT NOT NULL DEFAULT ''"),
        TIMESTAMP_COLUMNS[0],
        TIMESTAMP_COLUMNS[1],
        TIMESTAMP_COLUMNS[2],
    ];
    const INDEXED: &'static [&'static str] = &["id", "name", "author_id"];
}

impl TableShape for Author {
    const TABLE: &'static str = "authors";
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::new("id", "TEXT NOT NULL DEFAULT ''"),
        ColumnDef::new("name", "TEXT NOT NULL DEFAULT ''"),
        TIMESTAMP_COLUMNS[0],
        TIMESTAMP_COLUMNS[1],
        TIMESTAMP_COLUMNS[2],
    ];
    const INDEXED: &'static [&'static str] = &["id", "name"];
}
