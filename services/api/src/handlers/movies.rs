use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use moviego_core::envelope::Envelope;
use moviego_core::extract::JsonBody;
use moviego_domain::movie::{Movie, MovieFields, MovieFilter};
use moviego_domain::pagination::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, Filters, Metadata};
use moviego_domain::validator::Validator;

use crate::error::ApiError;
use crate::handlers::expected_version;
use crate::state::AppState;
use crate::usecase::movie::{
    CreateMovieUseCase, DeleteMovieUseCase, ListMoviesInput, ListMoviesUseCase, ShowMovieUseCase,
    UpdateMovieInput, UpdateMovieUseCase,
};

#[derive(Debug, Serialize)]
pub struct MovieResponse {
    pub id: i64,
    pub title: String,
    pub year: i32,
    pub runtime: i32,
    pub genres: Vec<String>,
    pub version: i32,
}

impl From<Movie> for MovieResponse {
    fn from(movie: Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.title,
            year: movie.year,
            runtime: movie.runtime,
            genres: movie.genres,
            version: movie.version,
        }
    }
}

/// Movie fields as sent by clients. Absent fields stay `None`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MovieRequest {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub runtime: Option<i32>,
    pub genres: Option<Vec<String>>,
}

impl From<MovieRequest> for MovieFields {
    fn from(body: MovieRequest) -> Self {
        Self {
            title: body.title,
            year: body.year,
            runtime: body.runtime,
            genres: body.genres,
        }
    }
}

/// Ids are positive integers; anything else cannot name a movie.
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::NotFound),
    }
}

// ── GET /v1/movies ────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListMoviesQuery {
    pub title: Option<String>,
    pub genres: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListMoviesResponse {
    pub movies: Vec<MovieResponse>,
    pub metadata: Metadata,
}

fn read_int(v: &mut Validator, raw: Option<&str>, key: &str, default: i64) -> i64 {
    match raw {
        None | Some("") => default,
        Some(s) => s.parse().unwrap_or_else(|_| {
            v.add_error(key, "must be an integer value");
            default
        }),
    }
}

fn read_csv(raw: Option<&str>) -> Vec<String> {
    match raw {
        None | Some("") => Vec::new(),
        Some(s) => s.split(',').map(str::to_owned).collect(),
    }
}

impl ListMoviesQuery {
    pub fn into_input(self) -> Result<ListMoviesInput, ApiError> {
        let mut v = Validator::new();
        let page = read_int(&mut v, self.page.as_deref(), "page", DEFAULT_PAGE);
        let page_size = read_int(&mut v, self.page_size.as_deref(), "page_size", DEFAULT_PAGE_SIZE);
        let sort = self.sort.filter(|s| !s.is_empty());

        let filters = Filters::parse(page, page_size, sort.as_deref().unwrap_or("id"));
        if let Err(errors) = &filters {
            v.merge(errors.clone());
        }
        v.finish()?;

        Ok(ListMoviesInput {
            filter: MovieFilter {
                title: self.title.unwrap_or_default(),
                genres: read_csv(self.genres.as_deref()),
            },
            filters: filters?,
        })
    }
}

pub async fn list_movies(
    State(state): State<AppState>,
    query: Result<Query<ListMoviesQuery>, QueryRejection>,
) -> Result<Json<ListMoviesResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let usecase = ListMoviesUseCase {
        movies: state.movie_repo(),
    };
    let output = usecase.execute(query.into_input()?).await?;
    Ok(Json(ListMoviesResponse {
        movies: output.movies.into_iter().map(Into::into).collect(),
        metadata: output.metadata,
    }))
}

// ── POST /v1/movies ───────────────────────────────────────────────────────────

pub async fn create_movie(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<MovieRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = CreateMovieUseCase {
        movies: state.movie_repo(),
    };
    let movie = usecase.execute(body.into()).await?;
    let location = format!("/v1/movies/{}", movie.id);
    Ok((
        StatusCode::CREATED,
        [(LOCATION, location)],
        Json(Envelope::new("movie", MovieResponse::from(movie))),
    ))
}

// ── GET /v1/movies/{id} ───────────────────────────────────────────────────────

pub async fn show_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<MovieResponse>>, ApiError> {
    let id = parse_id(&id)?;
    let usecase = ShowMovieUseCase {
        movies: state.movie_repo(),
    };
    let movie = usecase.execute(id).await?;
    Ok(Json(Envelope::new("movie", movie.into())))
}

// ── PATCH /v1/movies/{id} ─────────────────────────────────────────────────────

pub async fn update_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<MovieRequest>,
) -> Result<Json<Envelope<MovieResponse>>, ApiError> {
    let id = parse_id(&id)?;
    let usecase = UpdateMovieUseCase {
        movies: state.movie_repo(),
    };
    let movie = usecase
        .execute(UpdateMovieInput {
            id,
            expected_version: expected_version(&headers)?,
            patch: body.into(),
        })
        .await?;
    Ok(Json(Envelope::new("movie", movie.into())))
}

// ── DELETE /v1/movies/{id} ────────────────────────────────────────────────────

pub async fn delete_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<&'static str>>, ApiError> {
    let id = parse_id(&id)?;
    let usecase = DeleteMovieUseCase {
        movies: state.movie_repo(),
    };
    usecase.execute(id).await?;
    Ok(Json(Envelope::new("message", "movie successfully deleted")))
}
