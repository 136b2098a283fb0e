use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, patch, post, put};
use tower::ServiceBuilder;

use moviego_core::cors::cors;
use moviego_core::error::{method_not_allowed, not_found};
use moviego_core::health::healthcheck;
use moviego_core::metrics::track_metrics;
use moviego_core::middleware::{
    propagate_request_id_layer, recovery_layer, request_id_layer, trace_layer,
};
use moviego_core::rate_limit::rate_limit;
use moviego_domain::permission::{MOVIES_READ, MOVIES_WRITE};

use crate::handlers::{
    metrics::debug_vars,
    movies::{create_movie, delete_movie, list_movies, show_movie, update_movie},
    tokens::create_authentication_token,
    users::{activate_user, get_me, register_user, update_me},
};
use crate::middleware::authenticate::authenticate;
use crate::middleware::authorize::{require_activated, require_authenticated, require_permission};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let read = || from_fn_with_state(state.clone(), require_permission(MOVIES_READ));
    let write = || from_fn_with_state(state.clone(), require_permission(MOVIES_WRITE));

    Router::new()
        // Health and metrics
        .route("/v1/healthcheck", get(healthcheck))
        .route("/debug/vars", get(debug_vars))
        // Movies
        .route("/v1/movies", get(list_movies).route_layer(read()))
        .route("/v1/movies", post(create_movie).route_layer(write()))
        .route("/v1/movies/{id}", get(show_movie).route_layer(read()))
        .route(
            "/v1/movies/{id}",
            patch(update_movie).delete(delete_movie).route_layer(write()),
        )
        // Users
        .route("/v1/users", post(register_user))
        .route("/v1/users/activated", put(activate_user))
        .route(
            "/v1/users/me",
            get(get_me).route_layer(from_fn(require_authenticated)),
        )
        .route(
            "/v1/users/me",
            patch(update_me).route_layer(from_fn(require_activated)),
        )
        // Tokens
        .route("/v1/tokens/authentication", post(create_authentication_token))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(trace_layer())
                .layer(propagate_request_id_layer())
                .layer(from_fn_with_state(state.metrics.clone(), track_metrics))
                .layer(recovery_layer())
                .layer(from_fn_with_state(state.origins.clone(), cors))
                .layer(from_fn_with_state(state.limiter.clone(), rate_limit))
                .layer(from_fn_with_state(state.clone(), authenticate)),
        )
        .with_state(state)
}
