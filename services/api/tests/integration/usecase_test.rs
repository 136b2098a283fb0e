use moviego_api::domain::repository::{MovieRepository, PermissionRepository, UserRepository};
use moviego_api::error::ApiError;
use moviego_api::infra::memory::{
    MemoryPermissionRepository, MemoryStore, MemoryTokenRepository, MemoryUserRepository,
};
use moviego_api::usecase::movie::{
    CreateMovieUseCase, ListMoviesInput, ListMoviesUseCase, UpdateMovieInput, UpdateMovieUseCase,
};
use moviego_api::usecase::user::{
    ActivateUserUseCase, RegisterUserInput, RegisterUserUseCase, UpdateProfileInput,
    UpdateProfileUseCase,
};
use moviego_domain::movie::{MovieFields, MovieFilter};
use moviego_domain::pagination::Filters;
use moviego_domain::permission::{MOVIES_READ, MOVIES_WRITE, Permissions};
use moviego_domain::token::Scope;

use crate::helpers::{TEST_PASSWORD, new_movie, new_user};

fn register_input(email: &str) -> RegisterUserInput {
    RegisterUserInput {
        name: "Faith Smith".into(),
        email: email.into(),
        password: TEST_PASSWORD.into(),
    }
}

fn register_usecase(
    store: &MemoryStore,
) -> RegisterUserUseCase<MemoryUserRepository, MemoryPermissionRepository, MemoryTokenRepository> {
    RegisterUserUseCase {
        users: store.user_repo(),
        permissions: store.permission_repo(),
        tokens: store.token_repo(),
    }
}

// ── RegisterUserUseCase ───────────────────────────────────────────────────────

#[tokio::test]
async fn should_register_inactive_reader_with_activation_token() {
    let store = MemoryStore::new();
    let output = register_usecase(&store)
        .execute(register_input("faith@example.com"))
        .await
        .unwrap();

    assert!(!output.user.activated);
    assert_ne!(output.user.password_hash, TEST_PASSWORD);
    assert_eq!(output.activation_token.scope, Scope::Activation);

    let permissions = store
        .permission_repo()
        .get_all_for_user(output.user.id)
        .await
        .unwrap();
    assert!(permissions.includes(MOVIES_READ));
    assert!(!permissions.includes(MOVIES_WRITE));

    let owner = store
        .user_repo()
        .get_for_token(Scope::Activation, &output.activation_token.plaintext)
        .await
        .unwrap();
    assert_eq!(owner.id, output.user.id);
}

#[tokio::test]
async fn should_reject_duplicate_email_ignoring_case() {
    let store = MemoryStore::new();
    store
        .user_repo()
        .insert(&new_user("faith@example.com", true))
        .await
        .unwrap();

    let result = register_usecase(&store)
        .execute(register_input("Faith@Example.COM"))
        .await;
    assert!(matches!(result, Err(ApiError::DuplicateEmail)), "got {result:?}");
}

struct UnavailablePermissions;

impl PermissionRepository for UnavailablePermissions {
    async fn get_all_for_user(&self, _user_id: i64) -> Result<Permissions, ApiError> {
        Ok(Permissions::default())
    }

    async fn add_for_user(&self, _user_id: i64, _codes: &[&str]) -> Result<(), ApiError> {
        Err(ApiError::StoreUnavailable(anyhow::anyhow!("permissions: timed out")))
    }
}

#[tokio::test]
async fn should_remove_user_when_registration_cannot_complete() {
    let store = MemoryStore::new();
    let failing = RegisterUserUseCase {
        users: store.user_repo(),
        permissions: UnavailablePermissions,
        tokens: store.token_repo(),
    };

    let result = failing.execute(register_input("faith@example.com")).await;
    assert!(matches!(result, Err(ApiError::StoreUnavailable(_))), "got {result:?}");
    assert!(matches!(
        store.user_repo().get_by_email("faith@example.com").await,
        Err(ApiError::NotFound)
    ));

    // The address is free again once the store recovers.
    let output = register_usecase(&store)
        .execute(register_input("faith@example.com"))
        .await
        .unwrap();
    assert!(!output.user.activated);
}

#[tokio::test]
async fn should_delete_user_with_tokens_and_grants() {
    let store = MemoryStore::new();
    let output = register_usecase(&store)
        .execute(register_input("faith@example.com"))
        .await
        .unwrap();

    store.user_repo().delete(output.user.id).await.unwrap();

    assert!(matches!(
        store
            .user_repo()
            .get_for_token(Scope::Activation, &output.activation_token.plaintext)
            .await,
        Err(ApiError::NotFound)
    ));
    let permissions = store
        .permission_repo()
        .get_all_for_user(output.user.id)
        .await
        .unwrap();
    assert!(permissions.is_empty());
    assert!(matches!(
        store.user_repo().delete(output.user.id).await,
        Err(ApiError::NotFound)
    ));
}

#[tokio::test]
async fn should_report_every_invalid_registration_field() {
    let store = MemoryStore::new();
    let result = register_usecase(&store)
        .execute(RegisterUserInput {
            name: String::new(),
            email: "nope".into(),
            password: "x".repeat(73),
        })
        .await;
    let Err(ApiError::FailedValidation(errors)) = result else {
        panic!("expected validation failure, got {result:?}");
    };
    assert_eq!(errors.get("name"), Some("must be provided"));
    assert_eq!(errors.get("email"), Some("must be a valid email address"));
    assert_eq!(errors.get("password"), Some("must not be more than 72 bytes long"));
}

// ── ActivateUserUseCase ───────────────────────────────────────────────────────

#[tokio::test]
async fn should_activate_and_consume_activation_token() {
    let store = MemoryStore::new();
    let output = register_usecase(&store)
        .execute(register_input("grace@example.com"))
        .await
        .unwrap();

    let usecase = ActivateUserUseCase {
        users: store.user_repo(),
        tokens: store.token_repo(),
    };
    let user = usecase
        .execute(&output.activation_token.plaintext)
        .await
        .unwrap();
    assert!(user.activated);
    assert_eq!(user.version, output.user.version + 1);

    let again = usecase.execute(&output.activation_token.plaintext).await;
    let Err(ApiError::FailedValidation(errors)) = again else {
        panic!("expected validation failure, got {again:?}");
    };
    assert_eq!(errors.get("token"), Some("invalid or expired activation token"));
}

#[tokio::test]
async fn should_reject_malformed_activation_token_without_lookup() {
    let store = MemoryStore::new();
    let usecase = ActivateUserUseCase {
        users: store.user_repo(),
        tokens: store.token_repo(),
    };
    let result = usecase.execute("too-short").await;
    let Err(ApiError::FailedValidation(errors)) = result else {
        panic!("expected validation failure, got {result:?}");
    };
    assert_eq!(errors.get("token"), Some("must be 22 bytes long"));
}

// ── UpdateProfileUseCase ──────────────────────────────────────────────────────

#[tokio::test]
async fn should_update_profile_name_and_bump_version() {
    let store = MemoryStore::new();
    let user = store
        .user_repo()
        .insert(&new_user("heidi@example.com", true))
        .await
        .unwrap();

    let usecase = UpdateProfileUseCase {
        users: store.user_repo(),
    };
    let updated = usecase
        .execute(
            user.clone(),
            UpdateProfileInput {
                name: Some("Heidi Klum".into()),
                expected_version: Some("1".into()),
                ..UpdateProfileInput::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Heidi Klum");
    assert_eq!(updated.version, 2);
    assert_eq!(updated.password_hash, user.password_hash);

    let stale = usecase
        .execute(
            user,
            UpdateProfileInput {
                name: Some("Stale".into()),
                ..UpdateProfileInput::default()
            },
        )
        .await;
    assert!(matches!(stale, Err(ApiError::EditConflict)), "got {stale:?}");
}

// ── Movie use cases ───────────────────────────────────────────────────────────

#[tokio::test]
async fn should_validate_before_creating_movie() {
    let store = MemoryStore::new();
    let usecase = CreateMovieUseCase {
        movies: store.movie_repo(),
    };
    let result = usecase.execute(MovieFields::default()).await;
    assert!(matches!(result, Err(ApiError::FailedValidation(_))));

    let (movies, total) = store
        .movie_repo()
        .list(&MovieFilter::default(), &Filters::default())
        .await
        .unwrap();
    assert!(movies.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn should_honour_expected_version_precondition() {
    let store = MemoryStore::new();
    let movie = store
        .movie_repo()
        .insert(&new_movie("Black Panther", 2018, &["action"]))
        .await
        .unwrap();
    let usecase = UpdateMovieUseCase {
        movies: store.movie_repo(),
    };

    let stale = usecase
        .execute(UpdateMovieInput {
            id: movie.id,
            expected_version: Some("7".into()),
            patch: MovieFields {
                year: Some(2019),
                ..MovieFields::default()
            },
        })
        .await;
    assert!(matches!(stale, Err(ApiError::EditConflict)), "got {stale:?}");

    let updated = usecase
        .execute(UpdateMovieInput {
            id: movie.id,
            expected_version: Some("1".into()),
            patch: MovieFields {
                runtime: Some(134),
                ..MovieFields::default()
            },
        })
        .await
        .unwrap();
    assert_eq!(updated.runtime, 134);
    assert_eq!(updated.year, 2018);
    assert_eq!(updated.version, 2);
}

#[tokio::test]
async fn should_return_not_found_when_updating_missing_movie() {
    let store = MemoryStore::new();
    let usecase = UpdateMovieUseCase {
        movies: store.movie_repo(),
    };
    let result = usecase
        .execute(UpdateMovieInput {
            id: 404,
            expected_version: None,
            patch: MovieFields::default(),
        })
        .await;
    assert!(matches!(result, Err(ApiError::NotFound)));
}

#[tokio::test]
async fn should_build_metadata_from_total_matches() {
    let store = MemoryStore::new();
    for title in ["The Thing", "The Fly", "The Birds"] {
        store
            .movie_repo()
            .insert(&new_movie(title, 1982, &["horror"]))
            .await
            .unwrap();
    }
    let usecase = ListMoviesUseCase {
        movies: store.movie_repo(),
    };
    let output = usecase
        .execute(ListMoviesInput {
            filter: MovieFilter::default(),
            filters: Filters::parse(1, 2, "title").unwrap(),
        })
        .await
        .unwrap();

    let titles: Vec<&str> = output.movies.iter().map(|m| m.title.as_str()).collect();
    assert_eq!(titles, vec!["The Birds", "The Fly"]);
    assert_eq!(output.metadata.total_records, 3);
    assert_eq!(output.metadata.last_page, 2);
    assert_eq!(output.metadata.current_page, 1);
}
