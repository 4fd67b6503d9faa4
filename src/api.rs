use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use crate::error::{internal_error, ApiError};
use crate::middleware::{self, AuthGate};
use crate::models::{AuthorWithBooks, Book, NewBook};
use crate::repo::{AuthorRepo, BookRepo};

#[derive(Clone)]
struct AppState<R> {
    repo: R,
}

#[derive(Debug, Deserialize)]
struct NameQuery {
    #[serde(default)]
    name: String,
}

/// Builds the catalog router with its middleware chain.
pub fn build_app<B, A>(books: B, authors: A, gate: AuthGate, request_timeout: Duration) -> Router
where
    B: BookRepo + Clone + Send + Sync + 'static,
    A: AuthorRepo + Clone + Send + Sync + 'static,
{
    let book_routes = Router::new()
        .route("/book", get(list_books::<B>).post(create_book::<B>))
        .route("/book/", get(books_by_name::<B>))
        .route("/book/{id}", get(books_by_id::<B>).put(update_book::<B>))
        .route("/book/id/{id}", get(books_by_author_or_id::<B>))
        .route("/book/delete/{id}", delete(delete_book::<B>))
        .with_state(AppState { repo: books });

    let author_routes = Router::new()
        .route("/author", get(list_authors::<A>))
        .route("/author/name", get(author_by_name::<A>))
        .with_state(AppState { repo: authors });

    let router = book_routes
        .merge(author_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ));

    middleware::apply(router, gate)
}

async fn list_books<B>(State(state): State<AppState<B>>) -> Result<Json<Vec<Book>>, ApiError>
where
    B: BookRepo + Clone + Send + Sync,
{
    let results = state.repo.find_all().await.map_err(internal_error)?;

    info!("Retrieved {} books from the DB", results.len());

    Ok(Json(results))
}

async fn books_by_id<B>(
    State(state): State<AppState<B>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Book>>, ApiError>
where
    B: BookRepo + Clone + Send + Sync,
{
    let results = state.repo.find_by_id(&id).await.map_err(internal_error)?;

    info!("Retrieved {} books with ID {}", results.len(), id);

    Ok(Json(results))
}

async fn books_by_author_or_id<B>(
    State(state): State<AppState<B>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Book>>, ApiError>
where
    B: BookRepo + Clone + Send + Sync,
{
    let results = state
        .repo
        .find_by_author_or_id(&id)
        .await
        .map_err(internal_error)?;

    info!("Retrieved {} books by book or author ID {}", results.len(), id);

    Ok(Json(results))
}

async fn books_by_name<B>(
    State(state): State<AppState<B>>,
    Query(query): Query<NameQuery>,
) -> Result<Json<Vec<Book>>, ApiError>
where
    B: BookRepo + Clone + Send + Sync,
{
    let results = state
        .repo
        .find_by_name(&query.name)
        .await
        .map_err(internal_error)?;

    info!("Retrieved {} books matching {:?}", results.len(), query.name);

    Ok(Json(results))
}

async fn create_book<B>(
    State(state): State<AppState<B>>,
    Json(new_book): Json<NewBook>,
) -> Result<(StatusCode, Json<Book>), ApiError>
where
    B: BookRepo + Clone + Send + Sync,
{
    let inserted_book = state.repo.create(new_book).await.map_err(internal_error)?;

    info!("Inserted book into the DB: {:?}", inserted_book);

    Ok((StatusCode::CREATED, Json(inserted_book)))
}

async fn update_book<B>(
    State(state): State<AppState<B>>,
    Path(id): Path<String>,
    Json(mut new_book): Json<NewBook>,
) -> Result<Json<Vec<Book>>, ApiError>
where
    B: BookRepo + Clone + Send + Sync,
{
    new_book.id = id.clone();
    let updated_books = state.repo.update(new_book).await.map_err(internal_error)?;

    if updated_books.is_empty() {
        info!("Tried to update non-existent book with ID: {}", id);
        return Err(ApiError::NotFound(format!("No book found with ID: {}", id)));
    }

    info!("Updated {} books with ID {}", updated_books.len(), id);
    Ok(Json(updated_books))
}

async fn delete_book<B>(
    State(state): State<AppState<B>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Book>>, ApiError>
where
    B: BookRepo + Clone + Send + Sync,
{
    let deleted_books = state.repo.guarded_delete(&id).await?;

    info!("Deleted book from DB with ID: {}", id);

    Ok(Json(deleted_books))
}

async fn list_authors<A>(
    State(state): State<AppState<A>>,
) -> Result<Json<Vec<AuthorWithBooks>>, ApiError>
where
    A: AuthorRepo + Clone + Send + Sync,
{
    let results = state.repo.all_with_books().await.map_err(internal_error)?;

    info!("Retrieved {} authors from the DB", results.len());

    Ok(Json(results))
}

async fn author_by_name<A>(
    State(state): State<AppState<A>>,
    Query(query): Query<NameQuery>,
) -> Result<Json<AuthorWithBooks>, ApiError>
where
    A: AuthorRepo + Clone + Send + Sync,
{
    let author = state
        .repo
        .get_by_name(&query.name)
        .await
        .map_err(internal_error)?;

    match author {
        Some(author) => {
            info!("Retrieved author from DB: {}", author.author.name);
            Ok(Json(author))
        }
        None => {
            info!("No author found in DB with name: {}", query.name);
            Err(ApiError::NotFound(format!(
                "No author found with name: {}",
                query.name
            )))
        }
    }
}
