use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::models::{NewAuthor, NewBook};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("could not read seed file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: column `{column}` is not a valid number: {value:?}")]
    InvalidNumber {
        line: usize,
        column: &'static str,
        value: String,
    },
}

/// How many seed rows were written and how many were already present.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// An entity that can be built from one positional seed row.
pub trait SeedRecord: Sized {
    /// Column names, in file order.
    const COLUMNS: &'static [&'static str];

    /// `fields` has exactly `COLUMNS.len()` trimmed entries.
    fn from_fields(fields: &[&str], line: usize) -> Result<Self, SeedError>;
}

impl SeedRecord for NewAuthor {
    const COLUMNS: &'static [&'static str] = &["id", "name"];

    fn from_fields(fields: &[&str], _line: usize) -> Result<Self, SeedError> {
        Ok(NewAuthor {
            id: fields[0].to_string(),
            name: fields[1].to_string(),
        })
    }
}

impl SeedRecord for NewBook {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "pages",
        "stock",
        "cost",
        "stock_code",
        "isbn",
        "author_id",
    ];

    fn from_fields(fields: &[&str], line: usize) -> Result<Self, SeedError> {
        Ok(NewBook {
            id: fields[0].to_string(),
            name: fields[1].to_string(),
            pages: number(fields[2], "pages", line)?,
            stock: number(fields[3], "stock", line)?,
            cost: number(fields[4], "cost", line)?,
            stock_code: fields[5].to_string(),
            isbn: fields[6].to_string(),
            author_id: fields[7].to_string(),
        })
    }
}

fn number<N: FromStr>(value: &str, column: &'static str, line: usize) -> Result<N, SeedError> {
    value.parse().map_err(|_| SeedError::InvalidNumber {
        line,
        column,
        value: value.to_string(),
    })
}

fn parse_record<T: SeedRecord>(fields: &[&str], line: usize) -> Result<T, SeedError> {
    if fields.len() != T::COLUMNS.len() {
        return Err(SeedError::ColumnCount {
            line,
            expected: T::COLUMNS.len(),
            found: fields.len(),
        });
    }
    let trimmed: Vec<&str> = fields.iter().map(|field| field.trim()).collect();
    T::from_fields(&trimmed, line)
}

/// Maps already-split rows to records. `rows[0]` is the header.
pub fn parse_rows<T, R, S>(rows: &[R]) -> Result<Vec<T>, SeedError>
where
    T: SeedRecord,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    rows.iter()
        .enumerate()
        .skip(1)
        .map(|(index, row)| {
            let fields: Vec<&str> = row.as_ref().iter().map(AsRef::as_ref).collect();
            parse_record(&fields, index + 1)
        })
        .collect()
}

/// Reads and maps every data row of a CSV file.
pub fn read_seed_file<T: SeedRecord>(path: &Path) -> Result<Vec<T>, SeedError> {
    let read_error = |source| SeedError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(read_error)?;

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(read_error)?;
        let fields: Vec<&str> = record.iter().collect();
        // Line 1 is the header.
        records.push(parse_record(&fields, index + 2)?);
    }

    Ok(records)
}
