use axum::http::StatusCode;
use axum::http::header::{LOCATION, WWW_AUTHENTICATE};
use serde_json::json;

use moviego_api::domain::repository::UserRepository;
use moviego_api::error::ApiError;
use moviego_domain::permission::{MOVIES_READ, MOVIES_WRITE};
use moviego_domain::token::Scope;
use moviego_testing::{TestRequest, body_json};

use crate::helpers::{TEST_PASSWORD, TestApp, seed_user};

#[tokio::test]
async fn should_register_activate_login_and_read_movies() {
    let app = TestApp::new();

    // Register.
    let resp = app
        .send(
            TestRequest::post("/v1/users")
                .json(&json!({
                    "name": "Ivy Jones",
                    "email": "ivy@example.com",
                    "password": TEST_PASSWORD,
                }))
                .build(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["user"]["email"], "ivy@example.com");
    assert_eq!(body["user"]["activated"], false);
    assert!(body["user"].get("password_hash").is_none());

    // Activate with the token from the welcome mail.
    let activation_token = app.activation_token_for("ivy@example.com").await;
    let resp = app
        .send(
            TestRequest::put("/v1/users/activated")
                .json(&json!({ "token": activation_token }))
                .build(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["user"]["activated"], true);

    // The activation token is spent.
    let consumed = app
        .store
        .user_repo()
        .get_for_token(Scope::Activation, &activation_token)
        .await;
    assert!(matches!(consumed, Err(ApiError::NotFound)));

    // Log in.
    let resp = app
        .send(
            TestRequest::post("/v1/tokens/authentication")
                .json(&json!({ "email": "ivy@example.com", "password": TEST_PASSWORD }))
                .build(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    let token = body["authentication_token"]["token"]
        .as_str()
        .unwrap()
        .to_owned();
    assert!(body["authentication_token"]["expiry"].is_string());

    // Registered users can read movies.
    let resp = app
        .send(TestRequest::get("/v1/movies").bearer(&token).build())
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await,
        json!({ "movies": [], "metadata": {} })
    );

    // Without credentials the same route is an authorization failure, not an authentication one.
    let resp = app.send(TestRequest::get("/v1/movies").build()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(!resp.headers().contains_key(WWW_AUTHENTICATE));
    assert_eq!(
        body_json(resp).await,
        json!({ "error": "anonymous access to this resource is not permitted" })
    );

    // Readers may not write.
    let resp = app
        .send(
            TestRequest::post("/v1/movies")
                .bearer(&token)
                .json(&json!({ "title": "Up", "year": 2009, "runtime": 96, "genres": ["animation"] }))
                .build(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn should_reject_reused_or_unknown_activation_tokens() {
    let app = TestApp::new();
    let resp = app
        .send(
            TestRequest::put("/v1/users/activated")
                .json(&json!({ "token": "ABCDEFGHIJKLMNOPQRSTUV" }))
                .build(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body_json(resp).await,
        json!({ "error": { "token": "invalid or expired activation token" } })
    );
}

#[tokio::test]
async fn should_reject_duplicate_registration() {
    let app = TestApp::new();
    seed_user(&app.store, "dup@example.com", true, &[]).await;

    let resp = app
        .send(
            TestRequest::post("/v1/users")
                .json(&json!({
                    "name": "Dup",
                    "email": "dup@example.com",
                    "password": TEST_PASSWORD,
                }))
                .build(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body_json(resp).await,
        json!({ "error": { "email": "a user with this email address already exists" } })
    );
}

#[tokio::test]
async fn should_forbid_inactive_accounts_on_gated_routes() {
    let app = TestApp::new();
    let (_, token) = seed_user(&app.store, "idle@example.com", false, &[MOVIES_READ]).await;

    let resp = app
        .send(TestRequest::get("/v1/movies").bearer(&token).build())
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(resp).await,
        json!({ "error": "your user account must be activated to access this resource" })
    );

    // Reading the own profile only needs authentication.
    let resp = app
        .send(TestRequest::get("/v1/users/me").bearer(&token).build())
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["user"]["email"], "idle@example.com");
}

#[tokio::test]
async fn should_run_movie_lifecycle_for_writers() {
    let app = TestApp::new();
    let (_, token) = seed_user(
        &app.store,
        "writer@example.com",
        true,
        &[MOVIES_READ, MOVIES_WRITE],
    )
    .await;

    // Create.
    let resp = app
        .send(
            TestRequest::post("/v1/movies")
                .bearer(&token)
                .json(&json!({
                    "title": "Moana",
                    "year": 2016,
                    "runtime": 107,
                    "genres": ["animation", "adventure"],
                }))
                .build(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let location = resp.headers()[LOCATION].to_str().unwrap().to_owned();
    let movie = body_json(resp).await["movie"].clone();
    assert_eq!(location, format!("/v1/movies/{}", movie["id"]));
    assert_eq!(movie["version"], 1);

    // Show.
    let resp = app.send(TestRequest::get(&location).bearer(&token).build()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["movie"], movie);

    // Validation failures name the field.
    let resp = app
        .send(
            TestRequest::patch(&location)
                .bearer(&token)
                .json(&json!({ "year": 1700 }))
                .build(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body_json(resp).await,
        json!({ "error": { "year": "must be greater than 1888" } })
    );

    // Stale precondition.
    let resp = app
        .send(
            TestRequest::patch(&location)
                .bearer(&token)
                .header("x-expected-version", "2")
                .json(&json!({ "runtime": 108 }))
                .build(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Matching precondition.
    let resp = app
        .send(
            TestRequest::patch(&location)
                .bearer(&token)
                .header("x-expected-version", "1")
                .json(&json!({ "runtime": 108 }))
                .build(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = body_json(resp).await["movie"].clone();
    assert_eq!(updated["runtime"], 108);
    assert_eq!(updated["title"], "Moana");
    assert_eq!(updated["version"], 2);

    // List with filters.
    let resp = app
        .send(
            TestRequest::get("/v1/movies?title=moana&genres=animation&sort=-year")
                .bearer(&token)
                .build(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["movies"].as_array().unwrap().len(), 1);
    assert_eq!(
        body["metadata"],
        json!({
            "current_page": 1,
            "page_size": 20,
            "first_page": 1,
            "last_page": 1,
            "total_records": 1,
        })
    );

    // Bad listing parameters.
    let resp = app
        .send(
            TestRequest::get("/v1/movies?page=x&sort=rating")
                .bearer(&token)
                .build(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body_json(resp).await,
        json!({ "error": { "page": "must be an integer value", "sort": "invalid sort value" } })
    );

    // Delete.
    let resp = app
        .send(TestRequest::delete(&location).bearer(&token).build())
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await,
        json!({ "message": "movie successfully deleted" })
    );

    let resp = app.send(TestRequest::get(&location).bearer(&token).build()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Ids must be positive integers.
    let resp = app
        .send(TestRequest::get("/v1/movies/-3").bearer(&token).build())
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn should_update_own_profile_with_version_check() {
    let app = TestApp::new();
    let (_, token) = seed_user(&app.store, "kim@example.com", true, &[]).await;

    let resp = app
        .send(
            TestRequest::patch("/v1/users/me")
                .bearer(&token)
                .header("x-expected-version", "1")
                .json(&json!({ "name": "Kim Lee" }))
                .build(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["user"]["name"], "Kim Lee");
    assert_eq!(body["user"]["version"], 2);

    let resp = app
        .send(
            TestRequest::patch("/v1/users/me")
                .bearer(&token)
                .header("x-expected-version", "1")
                .json(&json!({ "name": "Kim Again" }))
                .build(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}
