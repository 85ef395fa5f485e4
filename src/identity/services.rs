use tracing::{info, warn};

use super::{
    dto::{Identity, LoginRequest, NewUser, UserUpdate},
    jwt::{JwtKeys, TokenError},
    password::{hash_password, verify_password},
    repo::{User, UserStore},
};
use crate::error::ApiError;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Exchanges credentials for a token. Unknown users and wrong passwords
/// are indistinguishable to the caller.
pub async fn login(
    users: &dyn UserStore,
    keys: &JwtKeys,
    credentials: &LoginRequest,
) -> Result<String, ApiError> {
    let Some(user) = users.find(&credentials.username).await? else {
        warn!(username = %credentials.username, "login unknown username");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    if !verify_password(&credentials.password, &user.password_hash) {
        warn!(username = %user.username, "login invalid password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let token = keys.issue(&user.username)?;
    info!(username = %user.username, "user logged in");
    Ok(token)
}

/// Resolves a token to the current state of its identity record.
pub async fn validate_token(
    users: &dyn UserStore,
    keys: &JwtKeys,
    token: &str,
) -> Result<Identity, ApiError> {
    let subject = keys
        .validate(token)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    match users.find(&subject.username).await? {
        Some(user) => Ok(user.identity()),
        None => {
            warn!(username = %subject.username, "token for a deleted user");
            Err(ApiError::Unauthorized(TokenError::Invalid.to_string()))
        }
    }
}

pub async fn list_users(users: &dyn UserStore) -> Result<Vec<Identity>, ApiError> {
    Ok(users.list().await?.iter().map(User::identity).collect())
}

pub async fn get_user(users: &dyn UserStore, username: &str) -> Result<Identity, ApiError> {
    users
        .find(username)
        .await?
        .map(|u| u.identity())
        .ok_or_else(|| ApiError::not_found("User", username))
}

pub async fn create_user(users: &dyn UserStore, new: NewUser) -> Result<Identity, ApiError> {
    let user = User {
        username: new.username,
        email_address: new.email_address,
        password_hash: hash_password(&new.password)?,
        role: new.role,
    };
    users.insert(&user).await?;
    info!(username = %user.username, role = %user.role, "user registered");
    Ok(user.identity())
}

pub async fn update_user(
    users: &dyn UserStore,
    username: &str,
    update: UserUpdate,
) -> Result<(), ApiError> {
    let existing = users
        .find(username)
        .await?
        .ok_or_else(|| ApiError::not_found("User", username))?;

    if update.username != existing.username {
        return Err(ApiError::BadRequest("The username cannot be changed".into()));
    }

    let password_hash = match &update.password {
        Some(p) => hash_password(p)?,
        None => existing.password_hash,
    };
    let user = User {
        username: existing.username,
        email_address: update.email_address,
        password_hash,
        role: update.role,
    };
    if !users.update(&user).await? {
        return Err(ApiError::not_found("User", username));
    }
    info!(username = %user.username, "user updated");
    Ok(())
}

pub async fn delete_user(users: &dyn UserStore, username: &str) -> Result<(), ApiError> {
    if !users.delete(username).await? {
        return Err(ApiError::not_found("User", username));
    }
    info!(username = %username, "user deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::JwtConfig, identity::dto::Role, identity::memory::MemoryUserStore};

    fn keys() -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: "test".into(),
            issuer: "test".into(),
            ttl_minutes: 60,
        })
    }

    async fn store_with(username: &str, password: &str, role: Role) -> MemoryUserStore {
        let store = MemoryUserStore::new();
        create_user(
            &store,
            NewUser {
                username: username.into(),
                email_address: format!("{username}@example.com"),
                password: password.into(),
                role,
            },
        )
        .await
        .unwrap();
        store
    }

    fn creds(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn login_then_validate_returns_same_username() {
        let store = store_with("alice", "wonderland", Role::BasicUser).await;
        let keys = keys();
        let token = login(&store, &keys, &creds("alice", "wonderland")).await.unwrap();
        let identity = validate_token(&store, &keys, &token).await.unwrap();
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.role, Role::BasicUser);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let store = store_with("alice", "wonderland", Role::BasicUser).await;
        let keys = keys();
        let unknown = login(&store, &keys, &creds("mallory", "wonderland"))
            .await
            .unwrap_err();
        let wrong = login(&store, &keys, &creds("alice", "looking-glass"))
            .await
            .unwrap_err();
        assert!(matches!(unknown, ApiError::Unauthorized(_)));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn validation_reflects_role_changes() {
        let store = store_with("alice", "wonderland", Role::BasicUser).await;
        let keys = keys();
        let token = login(&store, &keys, &creds("alice", "wonderland")).await.unwrap();

        update_user(
            &store,
            "alice",
            UserUpdate {
                username: "alice".into(),
                email_address: "alice@example.com".into(),
                password: None,
                role: Role::Admin,
            },
        )
        .await
        .unwrap();

        let identity = validate_token(&store, &keys, &token).await.unwrap();
        assert_eq!(identity.role, Role::Admin);
        // password untouched when omitted
        assert!(login(&store, &keys, &creds("alice", "wonderland")).await.is_ok());
    }

    #[tokio::test]
    async fn token_of_deleted_user_is_invalid() {
        let store = store_with("alice", "wonderland", Role::BasicUser).await;
        let keys = keys();
        let token = login(&store, &keys, &creds("alice", "wonderland")).await.unwrap();
        delete_user(&store, "alice").await.unwrap();
        let err = validate_token(&store, &keys, &token).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(m) if m.contains("invalid")));
    }

    #[tokio::test]
    async fn username_is_immutable() {
        let store = store_with("alice", "wonderland", Role::BasicUser).await;
        let err = update_user(
            &store,
            "alice",
            UserUpdate {
                username: "alicia".into(),
                email_address: "alice@example.com".into(),
                password: None,
                role: Role::BasicUser,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let store = store_with("alice", "wonderland", Role::BasicUser).await;
        let err = create_user(
            &store,
            NewUser {
                username: "alice".into(),
                email_address: "another@example.com".into(),
                password: "whatever".into(),
                role: Role::BasicUser,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn second_delete_is_not_found() {
        let store = store_with("alice", "wonderland", Role::BasicUser).await;
        delete_user(&store, "alice").await.unwrap();
        let err = delete_user(&store, "alice").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
