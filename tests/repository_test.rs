mod common;

use diesel_async::RunQueryDsl;

use bookshelf_api::database::{create_db_pool, DatabaseAuthorRepo, DatabaseBookRepo};
use bookshelf_api::models::{DeletionStatus, NewAuthor, NewBook};
use bookshelf_api::repo::{AuthorRepo, BookRepo, GuardedDeleteError};
use bookshelf_api::seed::SeedReport;
use bookshelf_api::sync::sync_schema;

fn new_author(id: &str, name: &str) -> NewAuthor {
    NewAuthor {
        id: id.to_string(),
        name: name.to_string(),
    }
}

fn new_book(id: &str, name: &str, author_id: &str) -> NewBook {
    NewBook {
        id: id.to_string(),
        name: name.to_string(),
        pages: 300,
        stock: 5,
        cost: 20.0,
        stock_code: format!("C{id}"),
        isbn: format!("ISBN{id}"),
        author_id: author_id.to_string(),
    }
}

fn seed_authors() -> Vec<NewAuthor> {
    vec![new_author("1", "George Orwell"), new_author("2", "Stephen King")]
}

fn seed_books() -> Vec<NewBook> {
    vec![
        new_book("10", "1984", "1"),
        new_book("11", "Animal Farm", "1"),
        new_book("1", "It", "2"),
        new_book("2", "Carrie", "2"),
    ]
}

fn sorted_ids(books: &[bookshelf_api::models::Book]) -> Vec<String> {
    let mut ids: Vec<String> = books.iter().map(|b| b.id.clone()).collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn database_repositories_integration_test() {
    let (_postgres, db_url) = common::start_postgres().await;
    let pool = create_db_pool(db_url).await.unwrap();

    // Running the sync twice is harmless.
    sync_schema(&pool).await.unwrap();
    sync_schema(&pool).await.unwrap();

    let books = DatabaseBookRepo::new(pool.clone());
    let authors = DatabaseAuthorRepo::new(pool.clone());

    // Seeding twice leaves the same rows as seeding once
    let report = authors.seed_authors(seed_authors()).await.unwrap();
    assert_eq!(report, SeedReport { inserted: 2, skipped: 0 });
    let report = authors.seed_authors(seed_authors()).await.unwrap();
    assert_eq!(report, SeedReport { inserted: 0, skipped: 2 });

    let report = books.seed_books(seed_books()).await.unwrap();
    assert_eq!(report, SeedReport { inserted: 4, skipped: 0 });
    let report = books.seed_books(seed_books()).await.unwrap();
    assert_eq!(report, SeedReport { inserted: 0, skipped: 4 });

    assert_eq!(books.find_all().await.unwrap().len(), 4);
    assert_eq!(authors.all_with_books().await.unwrap().len(), 2);

    // Name search does not depend on the caller's casing
    let lower = books.find_by_name("it").await.unwrap();
    let title = books.find_by_name("It").await.unwrap();
    assert_eq!(lower, title);
    assert_eq!(sorted_ids(&lower), vec!["1"]);

    let farm = books.find_by_name("FARM").await.unwrap();
    assert_eq!(sorted_ids(&farm), vec!["11"]);

    // Book-or-author lookup is the union of both matches, without duplicates
    let union = books.find_by_author_or_id("1").await.unwrap();
    assert_eq!(sorted_ids(&union), vec!["1", "10", "11"]);

    // A row whose id is also its author id shows up once
    let king = books.find_by_author_or_id("2").await.unwrap();
    assert_eq!(sorted_ids(&king), vec!["1", "2"]);

    // The verbatim search keeps the caller's casing
    assert!(books.find_by_name_verbatim("it").await.unwrap().is_empty());
    let verbatim = books.find_by_name_verbatim("It").await.unwrap();
    assert_eq!(sorted_ids(&verbatim), vec!["1"]);

    // Rows sharing an id come back ordered by name
    books.create(new_book("10", "1984 Annotated", "1")).await.unwrap();
    let by_id = books.find_by_id("10").await.unwrap();
    let names: Vec<&str> = by_id.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["1984", "1984 Annotated"]);

    let one = books.find_one("10").await.unwrap().unwrap();
    assert_eq!(one.id, "10");
    assert!(books.find_one("404").await.unwrap().is_none());

    // Create and update
    let created = books.create(new_book("4", "The Dice Man", "7")).await.unwrap();
    assert_eq!(created.id, "4");
    assert_eq!(created.status(), DeletionStatus::Active);

    let updated = books
        .update(new_book("4", "The Search For The Dice Man", "7"))
        .await
        .unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].name, "The Search For The Dice Man");
    assert!(updated[0].updated_at >= created.updated_at);

    let missing = books.update(new_book("404", "Nothing", "7")).await.unwrap();
    assert!(missing.is_empty());

    // Deleting an unknown id is not an error
    books.delete_by_id("nope").await.unwrap();

    // Guarded delete succeeds once, then reports the row as already deleted
    let deleted = books.guarded_delete("11").await.unwrap();
    assert_eq!(deleted.len(), 1);
    assert!(matches!(deleted[0].status(), DeletionStatus::Deleted(_)));

    let again = books.guarded_delete("11").await.unwrap_err();
    assert!(matches!(again, GuardedDeleteError::AlreadyDeleted(id) if id == "11"));

    let unknown = books.guarded_delete("99").await.unwrap_err();
    assert!(matches!(unknown, GuardedDeleteError::NotFound(id) if id == "99"));

    // Soft-deleted rows stay visible to reads
    let still_there = books.find_by_id("11").await.unwrap();
    assert_eq!(still_there.len(), 1);
    assert!(still_there[0].deleted_at.is_some());

    // Plain delete of a row soft-deletes it
    let it = books.find_by_id("1").await.unwrap().remove(0);
    books.delete(&it).await.unwrap();
    assert!(books.find_by_id("1").await.unwrap()[0].deleted_at.is_some());

    // Author lookups carry the author's books
    let orwell = authors.get_by_name("george orwell").await.unwrap().unwrap();
    assert_eq!(orwell.author.id, "1");
    assert_eq!(sorted_ids(&orwell.books), vec!["10", "10", "11"]);

    assert!(authors.get_by_name("nobody").await.unwrap().is_none());

    // A delete statement that touches no rows is reported as already deleted
    let mut conn = pool.get().await.unwrap();
    diesel::sql_query(
        "CREATE OR REPLACE FUNCTION skip_book_updates() RETURNS trigger AS $$ \
         BEGIN RETURN NULL; END; $$ LANGUAGE plpgsql",
    )
    .execute(&mut conn)
    .await
    .unwrap();
    diesel::sql_query(
        "CREATE TRIGGER books_frozen BEFORE UPDATE ON books \
         FOR EACH ROW EXECUTE FUNCTION skip_book_updates()",
    )
    .execute(&mut conn)
    .await
    .unwrap();

    let skipped = books.guarded_delete("2").await.unwrap_err();
    assert!(matches!(skipped, GuardedDeleteError::AlreadyDeleted(id) if id == "2"));

    // So is one that fails outright
    diesel::sql_query(
        "CREATE OR REPLACE FUNCTION skip_book_updates() RETURNS trigger AS $$ \
         BEGIN RAISE EXCEPTION 'books are frozen'; END; $$ LANGUAGE plpgsql",
    )
    .execute(&mut conn)
    .await
    .unwrap();

    let failed = books.guarded_delete("2").await.unwrap_err();
    assert!(matches!(failed, GuardedDeleteError::AlreadyDeleted(id) if id == "2"));

    diesel::sql_query("DROP TRIGGER books_frozen ON books")
        .execute(&mut conn)
        .await
        .unwrap();
    drop(conn);

    let untouched = books.find_one("2").await.unwrap().unwrap();
    assert_eq!(untouched.status(), DeletionStatus::Active);

    // Another sync on a populated schema keeps the data
    sync_schema(&pool).await.unwrap();
    assert_eq!(books.find_all().await.unwrap().len(), 6);
}
