pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod lifecycle;
pub mod middleware;
pub mod models;
pub mod repo;
pub mod schema;
pub mod seed;
pub mod sync;

use axum::Router;
use tracing::info;

use config::Config;
use database::{create_db_pool, DatabaseAuthorRepo, DatabaseBookRepo};
use error::StartupError;
use middleware::AuthGate;
use models::{NewAuthor, NewBook};
use repo::{AuthorRepo, BookRepo};
use seed::read_seed_file;

/// Connects to the store, brings the schema up to date, seeds it and returns
/// the router ready to be served.
pub async fn bootstrap(config: &Config) -> Result<Router, StartupError> {
    let pool = create_db_pool(config.database_url.clone()).await?;

    sync::sync_schema(&pool).await.map_err(StartupError::Schema)?;

    let books = DatabaseBookRepo::new(pool.clone());
    let authors = DatabaseAuthorRepo::new(pool);

    let author_rows: Vec<NewAuthor> = read_seed_file(&config.author_seed)?;
    let report = authors
        .seed_authors(author_rows)
        .await
        .map_err(StartupError::Seed)?;
    info!(
        "Seeded authors from {}: {} inserted, {} already present",
        config.author_seed.display(),
        report.inserted,
        report.skipped
    );

    let book_rows: Vec<NewBook> = read_seed_file(&config.book_seed)?;
    let report = books
        .seed_books(book_rows)
        .await
        .map_err(StartupError::Seed)?;
    info!(
        "Seeded books from {}: {} inserted, {} already present",
        config.book_seed.display(),
        report.inserted,
        report.skipped
    );

    Ok(api::build_app(
        books,
        authors,
        AuthGate::new(config.auth_prefix.as_str()),
        config.request_timeout(),
    ))
}
