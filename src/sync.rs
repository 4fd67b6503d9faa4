use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::{debug, info};

use crate::database::{DBPool, DatabaseError};
use crate::models::{Author, Book};

/// One column and the DDL fragment used to add it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub definition: &'static str,
}

impl ColumnDef {
    pub const fn new(name: &'static str, definition: &'static str) -> Self {
        ColumnDef { name, definition }
    }
}

/// The relational shape backing an entity.
///
/// Every table gets a surrogate `row_id SERIAL PRIMARY KEY`; the entity's own
/// `id` column is a business key and is not unique.
pub trait TableShape {
    const TABLE: &'static str;
    const COLUMNS: &'static [ColumnDef];
    /// Columns that get a plain b-tree index.
    const INDEXED: &'static [&'static str] = &[];
}

/// The DDL statements that bring `T`'s table up to date, in execution order.
pub fn ddl_statements<T: TableShape>() -> Vec<String> {
    let table = T::TABLE;
    let mut statements = Vec::with_capacity(1 + T::COLUMNS.len() + T::INDEXED.len());

    statements.push(format!(
        "CREATE TABLE IF NOT EXISTS {table} (row_id SERIAL PRIMARY KEY)"
    ));
    statements.extend(T::COLUMNS.iter().map(|column| {
        format!(
            "ALTER TABLE {table} ADD COLUMN IF NOT EXISTS {} {}",
            column.name, column.definition
        )
    }));
    statements.extend(T::INDEXED.iter().map(|column| {
        format!("CREATE INDEX IF NOT EXISTS {table}_{column}_idx ON {table} ({column})")
    }));

    statements
}

/// Creates the table if missing and adds missing columns. Never drops,
/// renames or retypes anything.
pub async fn sync_table<T: TableShape>(conn: &mut AsyncPgConnection) -> Result<(), DatabaseError> {
    for statement in ddl_statements::<T>() {
        debug!(table = T::TABLE, %statement, "Applying DDL");
        diesel::sql_query(statement).execute(conn).await?;
    }
    Ok(())
}

/// Brings every catalog table up to date. Each statement is idempotent, so a
/// failure part-way through is repaired by the next startup.
pub async fn sync_schema(pool: &DBPool) -> Result<(), DatabaseError> {
    let mut conn = pool.get().await?;

    sync_table::<Author>(&mut conn).await?;
    sync_table::<Book>(&mut conn).await?;

    info!("Schema synchronised for tables: {}, {}", Author::TABLE, Book::TABLE);
    Ok(())
}
