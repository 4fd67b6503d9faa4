use crate::models::{AuthorWithBooks, Book, NewAuthor, NewBook};
use crate::seed::SeedReport;
use std::error::Error;
use std::future::Future;

/// Outcome of [`BookRepo::guarded_delete`] when nothing was deleted.
#[derive(Debug, thiserror::Error)]
pub enum GuardedDeleteError<E> {
    #[error("No book found with ID: {0}")]
    NotFound(String),

    #[error("This book has already been deleted: {0}")]
    AlreadyDeleted(String),

    #[error("{0}")]
    Store(E),
}

pub trait BookRepo {
    type Error: Error + Send + Sync + 'static;

    fn find_all(&self) -> impl Future<Output = Result<Vec<Book>, Self::Error>> + Send;

    /// Rows with the given natural key, ordered by id descending then name.
    fn find_by_id(&self, id: &str) -> impl Future<Output = Result<Vec<Book>, Self::Error>> + Send;

    /// Rows whose own id or whose author id equals `id`.
    fn find_by_author_or_id(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Vec<Book>, Self::Error>> + Send;

    /// Rows whose name contains the title-cased `fragment`.
    fn find_by_name(
        &self,
        fragment: &str,
    ) -> impl Future<Output = Result<Vec<Book>, Self::Error>> + Send;

    /// Like `find_by_name`, but matches `fragment` exactly as given.
    fn find_by_name_verbatim(
        &self,
        fragment: &str,
    ) -> impl Future<Output = Result<Vec<Book>, Self::Error>> + Send;

    /// A single row with the given id, active rows first.
    fn find_one(&self, id: &str) -> impl Future<Output = Result<Option<Book>, Self::Error>> + Send;

    fn create(&self, new_book: NewBook) -> impl Future<Output = Result<Book, Self::Error>> + Send;

    /// Rewrites every row sharing `new_book.id`. Returns the updated rows.
    fn update(
        &self,
        new_book: NewBook,
    ) -> impl Future<Output = Result<Vec<Book>, Self::Error>> + Send;

    fn delete(&self, book: &Book) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Soft-deletes by natural key. A missing id is not an error.
    fn delete_by_id(&self, id: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Soft-deletes only after checking the row is still active. Returns the
    /// rows that were deleted.
    fn guarded_delete(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Vec<Book>, GuardedDeleteError<Self::Error>>> + Send;

    /// Inserts each row unless a book with the same name already exists.
    fn seed_books(
        &self,
        rows: Vec<NewBook>,
    ) -> impl Future<Output = Result<SeedReport, Self::Error>> + Send;
}

pub trait AuthorRepo {
    type Error: Error + Send + Sync + 'static;

    fn all_with_books(
        &self,
    ) -> impl Future<Output = Result<Vec<AuthorWithBooks>, Self::Error>> + Send;

    /// Exact match on the title-cased name.
    fn get_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<AuthorWithBooks>, Self::Error>> + Send;

    /// Inserts each row unless an author with the same name already exists.
    fn seed_authors(
        &self,
        rows: Vec<NewAuthor>,
    ) -> impl Future<Output = Result<SeedReport, Self::Error>> + Send;
}

/// Lower-cases `input` and upper-cases the first letter of every word.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut word_start = true;

    for c in input.chars() {
        if word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        word_start = is_separator(c);
    }

    out
}

// ASCII letters, digits and `_` continue a word, any other ASCII character
// ends it. Outside ASCII only whitespace does.
fn is_separator(c: char) -> bool {
    if c.is_ascii() {
        !(c.is_ascii_alphanumeric() || c == '_')
    } else {
        c.is_whitespace()
    }
}

/// A `LIKE` pattern matching any value that contains `fragment` literally.
pub fn contains_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_normalises_any_casing() {
        assert_eq!(title_case("it"), "It");
        assert_eq!(title_case("IT"), "It");
        assert_eq!(title_case("It"), "It");
        assert_eq!(title_case("the DICE man"), "The Dice Man");
    }

    #[test]
    fn title_case_word_boundaries() {
        assert_eq!(title_case("jack-london"), "Jack-London");
        assert_eq!(title_case("o'brien"), "O'Brien");
        assert_eq!(title_case("snake_case words"), "Snake_case Words");
        assert_eq!(title_case("éLAN vital"), "Élan Vital");
        assert_eq!(title_case("1984"), "1984");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn contains_pattern_wraps_and_escapes() {
        assert_eq!(contains_pattern("It"), "%It%");
        assert_eq!(contains_pattern(""), "%%");
        assert_eq!(contains_pattern("100%_done\\"), "%100\\%\\_done\\\\%");
    }
}
