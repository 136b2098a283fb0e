//! Movie catalog records and their invariants.

use chrono::{DateTime, Datelike, Utc};

use crate::validator::{ValidationErrors, Validator, unique};

pub const MIN_YEAR: i32 = 1888;
pub const MAX_TITLE_BYTES: usize = 500;
pub const MAX_GENRES: usize = 5;

/// A stored movie. `version` starts at 1 and grows by one on every update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movie {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub year: i32,
    pub runtime: i32,
    pub genres: Vec<String>,
    pub version: i32,
}

/// Validated data for a movie that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovie {
    pub title: String,
    pub year: i32,
    pub runtime: i32,
    pub genres: Vec<String>,
}

/// Client-supplied movie fields. `None` means the client did not send the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieFields {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub runtime: Option<i32>,
    pub genres: Option<Vec<String>>,
}

/// Title and genre constraints for listing. Empty values match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieFilter {
    pub title: String,
    pub genres: Vec<String>,
}

impl Movie {
    /// Overlay `patch` on the current values; only supplied fields overwrite.
    pub fn merged_with(&self, patch: MovieFields) -> MovieFields {
        MovieFields {
            title: patch.title.or_else(|| Some(self.title.clone())),
            year: patch.year.or(Some(self.year)),
            runtime: patch.runtime.or(Some(self.runtime)),
            genres: patch.genres.or_else(|| Some(self.genres.clone())),
        }
    }

    pub fn apply(&mut self, valid: NewMovie) {
        self.title = valid.title;
        self.year = valid.year;
        self.runtime = valid.runtime;
        self.genres = valid.genres;
    }
}

/// Check every movie invariant and return the validated record.
pub fn validate_movie(fields: MovieFields) -> Result<NewMovie, ValidationErrors> {
    validate_movie_in_year(fields, Utc::now().year())
}

pub fn validate_movie_in_year(
    fields: MovieFields,
    current_year: i32,
) -> Result<NewMovie, ValidationErrors> {
    let mut v = Validator::new();

    let title = fields.title.unwrap_or_default();
    v.check(!title.is_empty(), "title", "must be provided");
    v.check(
        title.len() <= MAX_TITLE_BYTES,
        "title",
        "must not be more than 500 bytes long",
    );

    let year = fields.year.unwrap_or(0);
    v.check(year != 0, "year", "must be provided");
    v.check(year >= MIN_YEAR, "year", "must be greater than 1888");
    v.check(year <= current_year, "year", "must not be in the future");

    let runtime = fields.runtime.unwrap_or(0);
    v.check(runtime != 0, "runtime", "must be provided");
    v.check(runtime > 0, "runtime", "must be a positive integer");

    v.check(fields.genres.is_some(), "genres", "must be provided");
    let genres = fields.genres.unwrap_or_default();
    v.check(!genres.is_empty(), "genres", "must contain at least 1 genre");
    v.check(
        genres.len() <= MAX_GENRES,
        "genres",
        "must not contain more than 5 genres",
    );
    v.check(unique(&genres), "genres", "must not contain duplicate values");

    v.finish()?;
    Ok(NewMovie {
        title,
        year,
        runtime,
        genres,
    })
}
