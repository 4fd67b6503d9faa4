use chrono::Utc;
use diesel::{
    BelongingToDsl, BoolExpressionMethods, ExpressionMethods, GroupedBy, OptionalExtension,
    QueryDsl, SelectableHelper, TextExpressionMethods,
};
use diesel_async::{
    pooled_connection::{AsyncDieselConnectionManager, PoolError},
    AsyncPgConnection, RunQueryDsl,
};
use tracing::{debug, warn};

use crate::models::{Author, AuthorWithBooks, Book, DeletionStatus, NewAuthor, NewBook};
use crate::repo::{contains_pattern, title_case, AuthorRepo, BookRepo, GuardedDeleteError};
use crate::schema::{authors, books};
use crate::seed::SeedReport;

pub type DBPool = bb8::Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;

pub async fn create_db_pool(connection_string: String) -> Result<DBPool, PoolError> {
    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(connection_string);
    bb8::Pool::builder().build(config).await
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("problem getting a connection from the connection pool: {0}")]
    PoolError(#[from] bb8::RunError<PoolError>),

    #[error("problem executing a statement against the DB: {0}")]
    ResultError(#[from] diesel::result::Error),
}

#[derive(Clone)]
pub struct DatabaseBookRepo {
    pool: DBPool,
}

impl DatabaseBookRepo {
    pub fn new(pool: DBPool) -> Self {
        DatabaseBookRepo { pool }
    }
}

impl BookRepo for DatabaseBookRepo {
    type Error = DatabaseError;

    async fn find_all(&self) -> Result<Vec<Book>, DatabaseError> {
        let mut conn = self.pool.get().await?;

        let books = books::table
            .select(Book::as_select())
            .load(&mut conn)
            .await?;

        debug!("Loaded {} books", books.len());
        Ok(books)
    }

    async fn find_by_id(&self, id: &str) -> Result<Vec<Book>, DatabaseError> {
        let mut conn = self.pool.get().await?;

        let books = books::table
            .filter(books::id.eq(id))
            .order((books::id.desc(), books::name.asc()))
            .select(Book::as_select())
            .load(&mut conn)
            .await?;

        debug!("Found {} books with ID {}", books.len(), id);
        Ok(books)
    }

    async fn find_by_author_or_id(&self, id: &str) -> Result<Vec<Book>, DatabaseError> {
        let mut conn = self.pool.get().await?;

        let books = books::table
            .filter(books::id.eq(id).or(books::author_id.eq(id)))
            .select(Book::as_select())
            .load(&mut conn)
            .await?;

        debug!("Found {} books with book or author ID {}", books.len(), id);
        Ok(books)
    }

    async fn find_by_name(&self, fragment: &str) -> Result<Vec<Book>, DatabaseError> {
        let mut conn = self.pool.get().await?;

        let pattern = contains_pattern(&title_case(fragment));
        let books = books::table
            .filter(books::name.like(&pattern))
            .select(Book::as_select())
            .load(&mut conn)
            .await?;

        debug!("Found {} books matching {}", books.len(), pattern);
        Ok(books)
    }

    async fn find_by_name_verbatim(&self, fragment: &str) -> Result<Vec<Book>, DatabaseError> {
        let mut conn = self.pool.get().await?;

        let pattern = contains_pattern(fragment);
        let books = books::table
            .filter(books::name.like(&pattern))
            .select(Book::as_select())
            .load(&mut conn)
            .await?;

        debug!("Found {} books matching {} verbatim", books.len(), pattern);
        Ok(books)
    }

    async fn find_one(&self, id: &str) -> Result<Option<Book>, DatabaseError> {
        let mut conn = self.pool.get().await?;

        // Under DESC, Postgres sorts NULLs first, so an active row wins.
        let book = books::table
            .filter(books::id.eq(id))
            .order((books::deleted_at.desc(), books::row_id.asc()))
            .select(Book::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(book)
    }

    async fn create(&self, new_book: NewBook) -> Result<Book, DatabaseError> {
        let mut conn = self.pool.get().await?;

        let inserted_book = diesel::insert_into(books::table)
            .values(new_book)
            .returning(Book::as_returning())
            .get_result(&mut conn)
            .await?;

        Ok(inserted_book)
    }

    async fn update(&self, new_book: NewBook) -> Result<Vec<Book>, DatabaseError> {
        let mut conn = self.pool.get().await?;

        // The changeset leaves `id` alone; it only selects the rows.
        let updated_books = diesel::update(books::table.filter(books::id.eq(&new_book.id)))
            .set((&new_book, books::updated_at.eq(Utc::now())))
            .returning(Book::as_returning())
            .get_results(&mut conn)
            .await?;

        Ok(updated_books)
    }

    async fn delete(&self, book: &Book) -> Result<(), DatabaseError> {
        self.delete_by_id(&book.id).await
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), DatabaseError> {
        let mut conn = self.pool.get().await?;

        let affected_rows = diesel::update(
            books::table
                .filter(books::id.eq(id))
                .filter(books::deleted_at.is_null()),
        )
        .set(books::deleted_at.eq(Some(Utc::now())))
        .execute(&mut conn)
        .await?;

        debug!("Soft-deleted {} books with ID {}", affected_rows, id);
        Ok(())
    }

    async fn guarded_delete(
        &self,
        id: &str,
    ) -> Result<Vec<Book>, GuardedDeleteError<DatabaseError>> {
        let book = self
            .find_one(id)
            .await
            .map_err(GuardedDeleteError::Store)?
            .ok_or_else(|| GuardedDeleteError::NotFound(id.to_string()))?;

        match book.status() {
            DeletionStatus::Deleted(at) => {
                debug!("Book {} was already deleted at {}", id, at);
                Err(GuardedDeleteError::AlreadyDeleted(id.to_string()))
            }
            DeletionStatus::Active => {
                let mut conn = self
                    .pool
                    .get()
                    .await
                    .map_err(|e| GuardedDeleteError::Store(e.into()))?;

                let deleted = diesel::update(
                    books::table
                        .filter(books::id.eq(id))
                        .filter(books::deleted_at.is_null()),
                )
                .set(books::deleted_at.eq(Some(Utc::now())))
                .returning(Book::as_returning())
                .get_results(&mut conn)
                .await;

                match deleted {
                    Ok(books) if !books.is_empty() => {
                        debug!("Deleted books: {:?}", books);
                        Ok(books)
                    }
                    Ok(_) => Err(GuardedDeleteError::AlreadyDeleted(id.to_string())),
                    Err(e) => {
                        warn!("Delete of book {} failed, treating as already deleted: {}", id, e);
                        Err(GuardedDeleteError::AlreadyDeleted(id.to_string()))
                    }
                }
            }
        }
    }

    async fn seed_books(&self, rows: Vec<NewBook>) -> Result<SeedReport, DatabaseError> {
        let mut conn = self.pool.get().await?;
        let mut report = SeedReport::default();

        for row in rows {
            let existing: Option<i32> = books::table
                .filter(books::name.eq(&row.name))
                .select(books::row_id)
                .first(&mut conn)
                .await
                .optional()?;

            if existing.is_some() {
                report.skipped += 1;
                continue;
            }

            diesel::insert_into(books::table)
                .values(&row)
                .execute(&mut conn)
                .await?;
            report.inserted += 1;
        }

        Ok(report)
    }
}

#[derive(Clone)]
pub struct DatabaseAuthorRepo {
    pool: DBPool,
}

impl DatabaseAuthorRepo {
    pub fn new(pool: DBPool) -> Self {
        DatabaseAuthorRepo { pool }
    }
}

impl AuthorRepo for DatabaseAuthorRepo {
    type Error = DatabaseError;

    async fn all_with_books(&self) -> Result<Vec<AuthorWithBooks>, DatabaseError> {
        let mut conn = self.pool.get().await?;

        let authors = authors::table
            .select(Author::as_select())
            .load(&mut conn)
            .await?;

        let books = Book::belonging_to(&authors)
            .select(Book::as_select())
            .load(&mut conn)
            .await?;

        let authors_with_books: Vec<AuthorWithBooks> = books
            .grouped_by(&authors)
            .into_iter()
            .zip(authors)
            .map(|(books, author)| AuthorWithBooks { author, books })
            .collect();

        debug!("Loaded {} authors with their books", authors_with_books.len());
        Ok(authors_with_books)
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<AuthorWithBooks>, DatabaseError> {
        let mut conn = self.pool.get().await?;

        let name = title_case(name);
        let maybe_author = authors::table
            .filter(authors::name.eq(&name))
            .order(authors::row_id.asc())
            .select(Author::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        let Some(author) = maybe_author else {
            debug!("No author found with name {}", name);
            return Ok(None);
        };

        let books = Book::belonging_to(&author)
            .select(Book::as_select())
            .load(&mut conn)
            .await?;

        debug!("Author {} has {} books", author.name, books.len());
        Ok(Some(AuthorWithBooks { author, books }))
    }

    async fn seed_authors(&self, rows: Vec<NewAuthor>) -> Result<SeedReport, DatabaseError> {
        let mut conn = self.pool.get().await?;
        let mut report = SeedReport::default();

        for row in rows {
            let existing: Option<i32> = authors::table
                .filter(authors::name.eq(&row.name))
                .select(authors::row_id)
                .first(&mut conn)
                .await
                .optional()?;

            if existing.is_some() {
                report.skipped += 1;
                continue;
            }

            diesel::insert_into(authors::table)
                .values(&row)
                .execute(&mut conn)
                .await?;
            report.inserted += 1;
        }

        Ok(report)
    }
}
