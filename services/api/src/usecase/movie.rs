use moviego_domain::movie::{Movie, MovieFields, MovieFilter, validate_movie};
use moviego_domain::pagination::{Filters, Metadata};

use crate::domain::repository::MovieRepository;
use crate::error::ApiError;

// ── CreateMovie ───────────────────────────────────────────────────────────────

pub struct CreateMovieUseCase<M: MovieRepository> {
    pub movies: M,
}

impl<M: MovieRepository> CreateMovieUseCase<M> {
    pub async fn execute(&self, input: MovieFields) -> Result<Movie, ApiError> {
        let valid = validate_movie(input)?;
        self.movies.insert(&valid).await
    }
}

// ── ShowMovie ─────────────────────────────────────────────────────────────────

pub struct ShowMovieUseCase<M: MovieRepository> {
    pub movies: M,
}

impl<M: MovieRepository> ShowMovieUseCase<M> {
    pub async fn execute(&self, id: i64) -> Result<Movie, ApiError> {
        self.movies.get(id).await
    }
}

// ── UpdateMovie ───────────────────────────────────────────────────────────────

pub struct UpdateMovieInput {
    pub id: i64,
    /// Decimal version the client last saw, from `X-Expected-Version`.
    pub expected_version: Option<String>,
    pub patch: MovieFields,
}

pub struct UpdateMovieUseCase<M: MovieRepository> {
    pub movies: M,
}

impl<M: MovieRepository> UpdateMovieUseCase<M> {
    /// Read, merge the supplied fields, revalidate, then write conditioned on the read version.
    pub async fn execute(&self, input: UpdateMovieInput) -> Result<Movie, ApiError> {
        let mut movie = self.movies.get(input.id).await?;
        if let Some(expected) = input.expected_version {
            if expected != movie.version.to_string() {
                return Err(ApiError::EditConflict);
            }
        }

        let valid = validate_movie(movie.merged_with(input.patch))?;
        movie.apply(valid);
        movie.version = self.movies.update(&movie).await?;
        Ok(movie)
    }
}

// ── DeleteMovie ───────────────────────────────────────────────────────────────

pub struct DeleteMovieUseCase<M: MovieRepository> {
    pub movies: M,
}

impl<M: MovieRepository> DeleteMovieUseCase<M> {
    pub async fn execute(&self, id: i64) -> Result<(), ApiError> {
        self.movies.delete(id).await
    }
}

// ── ListMovies ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ListMoviesInput {
    pub filter: MovieFilter,
    pub filters: Filters,
}

#[derive(Debug)]
pub struct ListMoviesOutput {
    pub movies: Vec<Movie>,
    pub metadata: Metadata,
}

pub struct ListMoviesUseCase<M: MovieRepository> {
    pub movies: M,
}

impl<M: MovieRepository> ListMoviesUseCase<M> {
    pub async fn execute(&self, input: ListMoviesInput) -> Result<ListMoviesOutput, ApiError> {
        let (movies, total) = self.movies.list(&input.filter, &input.filters).await?;
        Ok(ListMoviesOutput {
            movies,
            metadata: Metadata::calculate(total, &input.filters),
        })
    }
}
