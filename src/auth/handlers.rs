use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use crate::store::Profile;

use super::dto::{
    AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest, RegisterResponse,
};
use super::jwt::{AuthUser, JwtKeys};
use super::password::{hash_password, is_valid_email, verify_password};

/// Creates an account in the pending state. Nobody can log in with it until
/// an admin approves the profile.
pub async fn register_user(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<Profile, AppError> {
    let email = email.trim().to_lowercase();

    let mut problems = Vec::new();
    if !is_valid_email(&email) {
        problems.push(format!("invalid email: {email}"));
    }
    if password.len() < 8 {
        problems.push("password must be at least 8 characters".into());
    }
    if !problems.is_empty() {
        return Err(AppError::Validation(problems));
    }

    if state.store.profile_by_email(&email).await?.is_some() {
        return Err(AppError::Validation(vec![format!(
            "email already registered: {email}"
        )]));
    }

    let hash = hash_password(password)?;
    let profile = state.store.create_profile(&email, &hash).await?;
    info!(user_id = %profile.id, email = %profile.email, "user registered, awaiting approval");
    Ok(profile)
}

/// Verifies credentials and the approval gate. A valid password on an
/// unapproved account fails with a distinct "pending admin approval" error,
/// never the generic invalid-credentials one.
pub async fn login_user(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<Profile, AppError> {
    let email = email.trim().to_lowercase();

    let profile = state
        .store
        .profile_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Auth("invalid credentials".into()))?;

    if !verify_password(password, &profile.password_hash)? {
        warn!(user_id = %profile.id, "login with invalid password");
        return Err(AppError::Auth("invalid credentials".into()));
    }

    if !profile.is_approved && profile.id != state.config.admin_user_id {
        return Err(AppError::PendingApproval);
    }

    info!(user_id = %profile.id, "user logged in");
    Ok(profile)
}

pub fn ensure_admin(state: &AppState, user_id: Uuid) -> Result<(), AppError> {
    if user_id == state.config.admin_user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// Accounts waiting for approval, oldest first.
pub async fn get_pending_users(state: &AppState) -> Result<Vec<PublicUser>, AppError> {
    let pending = state.store.pending_profiles().await?;
    Ok(pending.iter().map(PublicUser::from).collect())
}

pub async fn approve_user(state: &AppState, target: Uuid) -> Result<(), AppError> {
    state.store.approve_profile(target).await?;
    info!(user_id = %target, "account approved");
    Ok(())
}

// --- axum handlers ---

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let profile = register_user(&state, &payload.email, &payload.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: PublicUser::from(&profile),
            status: "pending admin approval",
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let profile = login_user(&state, &payload.email, &payload.password).await?;
    let keys = JwtKeys::from_ref(&state);
    Ok(Json(AuthResponse {
        access_token: keys.sign_access(profile.id)?,
        refresh_token: keys.sign_refresh(profile.id)?,
        user: PublicUser::from(&profile),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Auth(e.to_string()))?;

    let profile = state
        .store
        .profile_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::Auth("user not found".into()))?;

    Ok(Json(AuthResponse {
        access_token: keys.sign_access(profile.id)?,
        refresh_token: keys.sign_refresh(profile.id)?,
        user: PublicUser::from(&profile),
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let profile = state
        .store
        .profile_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Auth("user not found".into()))?;
    Ok(Json(PublicUser::from(&profile)))
}

#[instrument(skip(state))]
pub async fn pending_users(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    ensure_admin(&state, user_id)?;
    Ok(Json(get_pending_users(&state).await?))
}

#[instrument(skip(state))]
pub async fn approve_user_route(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(target): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ensure_admin(&state, user_id)?;
    approve_user(&state, target).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_login_is_gated_on_approval() {
        let state = AppState::fake();
        let profile = register_user(&state, "Dana@Example.com ", "s3cret-pass")
            .await
            .unwrap();
        assert_eq!(profile.email, "dana@example.com");
        assert!(!profile.is_approved);

        // Correct password, unapproved account: distinct pending error.
        let err = login_user(&state, "dana@example.com", "s3cret-pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PendingApproval));

        // Wrong password stays a credentials failure, not a pending one.
        let err = login_user(&state, "dana@example.com", "wrong-pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));

        approve_user(&state, profile.id).await.unwrap();
        let logged_in = login_user(&state, "dana@example.com", "s3cret-pass")
            .await
            .unwrap();
        assert_eq!(logged_in.id, profile.id);
    }

    #[tokio::test]
    async fn approval_clears_the_pending_list() {
        let state = AppState::fake();
        let a = register_user(&state, "a@example.com", "password-a")
            .await
            .unwrap();
        register_user(&state, "b@example.com", "password-b")
            .await
            .unwrap();

        let pending = get_pending_users(&state).await.unwrap();
        assert_eq!(pending.len(), 2);

        approve_user(&state, a.id).await.unwrap();
        let pending = get_pending_users(&state).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].email, "b@example.com");
    }

    #[tokio::test]
    async fn register_reports_all_problems_together() {
        let state = AppState::fake();
        let err = register_user(&state, "not-an-email", "short")
            .await
            .unwrap_err();
        match err {
            AppError::Validation(problems) => assert_eq!(problems.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn only_the_admin_passes_the_admin_gate() {
        let state = AppState::fake();
        assert!(ensure_admin(&state, state.config.admin_user_id).is_ok());
        assert!(matches!(
            ensure_admin(&state, Uuid::new_v4()),
            Err(AppError::Forbidden)
        ));
    }
}
