use chrono::Duration;

use moviego_api::domain::credential::generate_token;
use moviego_api::domain::repository::{TokenRepository, UserRepository};
use moviego_api::error::ApiError;
use moviego_api::infra::memory::MemoryStore;
use moviego_api::usecase::token::{
    CreateAuthenticationTokenInput, CreateAuthenticationTokenUseCase, activation_ttl, issue_token,
};
use moviego_domain::token::{Scope, TOKEN_PLAINTEXT_LEN};

use crate::helpers::{TEST_PASSWORD, new_user};

// ── issue_token / get_for_token ───────────────────────────────────────────────

#[tokio::test]
async fn should_resolve_issued_token_to_its_owner() {
    let store = MemoryStore::new();
    let user = store
        .user_repo()
        .insert(&new_user("owner@example.com", false))
        .await
        .unwrap();

    let token = issue_token(&store.token_repo(), user.id, activation_ttl(), Scope::Activation)
        .await
        .unwrap();
    assert_eq!(token.plaintext.len(), TOKEN_PLAINTEXT_LEN);

    let resolved = store
        .user_repo()
        .get_for_token(Scope::Activation, &token.plaintext)
        .await
        .unwrap();
    assert_eq!(resolved.id, user.id);
}

#[tokio::test]
async fn should_not_resolve_token_under_another_scope() {
    let store = MemoryStore::new();
    let user = store
        .user_repo()
        .insert(&new_user("scoped@example.com", true))
        .await
        .unwrap();
    let token = issue_token(&store.token_repo(), user.id, activation_ttl(), Scope::Activation)
        .await
        .unwrap();

    let result = store
        .user_repo()
        .get_for_token(Scope::Authentication, &token.plaintext)
        .await;
    assert!(matches!(result, Err(ApiError::NotFound)));
}

#[tokio::test]
async fn should_not_resolve_expired_token() {
    let store = MemoryStore::new();
    let user = store
        .user_repo()
        .insert(&new_user("expired@example.com", true))
        .await
        .unwrap();
    let token = generate_token(user.id, Duration::seconds(-1), Scope::Authentication);
    store.token_repo().insert(&token).await.unwrap();

    let result = store
        .user_repo()
        .get_for_token(Scope::Authentication, &token.plaintext)
        .await;
    assert!(matches!(result, Err(ApiError::NotFound)));
}

#[tokio::test]
async fn should_revoke_only_the_given_scope() {
    let store = MemoryStore::new();
    let user = store
        .user_repo()
        .insert(&new_user("revoke@example.com", true))
        .await
        .unwrap();
    let tokens = store.token_repo();
    let activation = issue_token(&tokens, user.id, activation_ttl(), Scope::Activation)
        .await
        .unwrap();
    let login = issue_token(&tokens, user.id, activation_ttl(), Scope::Authentication)
        .await
        .unwrap();

    tokens
        .delete_all_for_user(Scope::Activation, user.id)
        .await
        .unwrap();

    let users = store.user_repo();
    assert!(matches!(
        users.get_for_token(Scope::Activation, &activation.plaintext).await,
        Err(ApiError::NotFound)
    ));
    assert!(users
        .get_for_token(Scope::Authentication, &login.plaintext)
        .await
        .is_ok());
}

// ── CreateAuthenticationTokenUseCase ──────────────────────────────────────────

#[tokio::test]
async fn should_issue_authentication_token_for_valid_credentials() {
    let store = MemoryStore::new();
    let user = store
        .user_repo()
        .insert(&new_user("login@example.com", true))
        .await
        .unwrap();

    let usecase = CreateAuthenticationTokenUseCase {
        users: store.user_repo(),
        tokens: store.token_repo(),
    };
    let token = usecase
        .execute(CreateAuthenticationTokenInput {
            email: "login@example.com".into(),
            password: TEST_PASSWORD.into(),
        })
        .await
        .unwrap();

    assert_eq!(token.scope, Scope::Authentication);
    assert!(token.expiry > chrono::Utc::now() + Duration::hours(23));
    let owner = store
        .user_repo()
        .get_for_token(Scope::Authentication, &token.plaintext)
        .await
        .unwrap();
    assert_eq!(owner.id, user.id);
}

#[tokio::test]
async fn should_reject_unknown_email_and_wrong_password_alike() {
    let store = MemoryStore::new();
    store
        .user_repo()
        .insert(&new_user("known@example.com", true))
        .await
        .unwrap();
    let usecase = CreateAuthenticationTokenUseCase {
        users: store.user_repo(),
        tokens: store.token_repo(),
    };

    for (email, password) in [
        ("nobody@example.com", TEST_PASSWORD),
        ("known@example.com", "not-the-password"),
    ] {
        let result = usecase
            .execute(CreateAuthenticationTokenInput {
                email: email.into(),
                password: password.into(),
            })
            .await;
        assert!(
            matches!(result, Err(ApiError::InvalidCredentials)),
            "expected InvalidCredentials for {email}, got {result:?}"
        );
    }
}

#[tokio::test]
async fn should_validate_credentials_before_lookup() {
    let store = MemoryStore::new();
    let usecase = CreateAuthenticationTokenUseCase {
        users: store.user_repo(),
        tokens: store.token_repo(),
    };
    let result = usecase
        .execute(CreateAuthenticationTokenInput {
            email: "not-an-email".into(),
            password: "short".into(),
        })
        .await;
    let Err(ApiError::FailedValidation(errors)) = result else {
        panic!("expected validation failure, got {result:?}");
    };
    assert_eq!(errors.get("email"), Some("must be a valid email address"));
    assert_eq!(errors.get("password"), Some("must be at least 8 bytes long"));
}
