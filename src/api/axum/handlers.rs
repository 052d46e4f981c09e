//! HTTP handlers for the auth and profile endpoints.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use super::error::AppError;
use super::middleware::{AuthenticatedUser, ClientIp};
use super::routes::AppState;
use crate::actions::{
    GetProfileAction, LoginAction, LoginOutcome, RegisterAction, RegisterInput,
    UpdateProfileAction, UpdateProfileInput,
};
use crate::api::{
    BlockedResponse, LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest,
    UserResponse,
};
use crate::guard::Block;
use crate::jwt::TokenIssuer;
use crate::{AuthError, RoleRepository, UserRepository};

fn blocked(block: Block) -> Response {
    let retry_after = block.block_secs;
    let mut response =
        (StatusCode::TOO_MANY_REQUESTS, Json(BlockedResponse::from(block))).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

/// An empty body reads as an empty request so the missing fields are
/// reported by validation.
fn parse_login(body: &[u8]) -> Result<LoginRequest, AuthError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(LoginRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        log::debug!(target: "turnstile_auth", "msg=\"unreadable login body\", error=\"{e}\"");
        AuthError::Validation(
            "The request body must be a JSON object with email and password.".to_owned(),
        )
    })
}

/// Authenticate through the abuse guard and return an access token.
///
/// The body is read raw and parsed only after the guard has counted the
/// request, so every POST counts whatever it carries.
///
/// POST /auth/login
pub async fn login<U, R, T>(
    State(state): State<AppState<U, R, T>>,
    ClientIp(ip): ClientIp,
    body: Bytes,
) -> Result<Response, AppError>
where
    U: UserRepository + Clone + 'static,
    R: RoleRepository + Clone + 'static,
    T: TokenIssuer + Clone + 'static,
{
    let action = LoginAction::new(
        state.guard.clone(),
        state.user_repo.clone(),
        state.role_repo.clone(),
        state.token_issuer.clone(),
    )
    .with_hasher(state.hasher.clone());
    let now = Utc::now();

    if let Some(block) = action.admit(&ip, now).await? {
        return Ok(blocked(block));
    }

    let request = parse_login(&body)?;
    match action
        .authenticate(&request.email, &request.password, &ip, now)
        .await?
    {
        LoginOutcome::Success(success) => {
            Ok((StatusCode::OK, Json(LoginResponse::from(success))).into_response())
        }
        LoginOutcome::InvalidCredentials { .. } => Err(AppError(AuthError::InvalidCredentials)),
        LoginOutcome::Blocked(block) => Ok(blocked(block)),
    }
}

/// POST /auth/register
pub async fn register<U, R, T>(
    State(state): State<AppState<U, R, T>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError>
where
    U: UserRepository + Clone + 'static,
    R: RoleRepository + Clone + 'static,
    T: TokenIssuer + Clone + 'static,
{
    let action = RegisterAction::new(state.user_repo.clone()).with_hasher(state.hasher.clone());
    let input = RegisterInput {
        name: body.name,
        email: body.email,
        password: body.password,
        password_confirmation: body.password_confirmation,
    };

    let user = action.execute(&input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// PUT /profile/update
pub async fn update_profile<U, R, T>(
    State(state): State<AppState<U, R, T>>,
    auth: AuthenticatedUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError>
where
    U: UserRepository + Clone + 'static,
    R: RoleRepository + Clone + 'static,
    T: TokenIssuer + Clone + 'static,
{
    let action =
        UpdateProfileAction::new(state.user_repo.clone()).with_hasher(state.hasher.clone());
    let input = UpdateProfileInput {
        name: body.name,
        password: body.password,
    };

    let user = action.execute(auth.user().id, &input, Utc::now()).await?;
    Ok(Json(UserResponse::from(user)))
}

/// GET /profile/secure
pub async fn secure_profile<U, R, T>(
    State(state): State<AppState<U, R, T>>,
    auth: AuthenticatedUser,
) -> Result<Json<UserResponse>, AppError>
where
    U: UserRepository + Clone + 'static,
    R: RoleRepository + Clone + 'static,
    T: TokenIssuer + Clone + 'static,
{
    let user = GetProfileAction::new(state.user_repo.clone())
        .own(auth.user().id, None)
        .await?;
    Ok(Json(UserResponse::from(user)))
}

/// GET /profile/secure/{id}
pub async fn secure_profile_by_id<U, R, T>(
    State(state): State<AppState<U, R, T>>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, AppError>
where
    U: UserRepository + Clone + 'static,
    R: RoleRepository + Clone + 'static,
    T: TokenIssuer + Clone + 'static,
{
    let user = GetProfileAction::new(state.user_repo.clone())
        .own(auth.user().id, Some(id))
        .await?;
    Ok(Json(UserResponse::from(user)))
}

/// GET /profile/{id}
pub async fn get_profile<U, R, T>(
    State(state): State<AppState<U, R, T>>,
    _auth: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, AppError>
where
    U: UserRepository + Clone + 'static,
    R: RoleRepository + Clone + 'static,
    T: TokenIssuer + Clone + 'static,
{
    let user = GetProfileAction::new(state.user_repo.clone()).find(id).await?;
    Ok(Json(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login() {
        let request = parse_login(br#"{"email":"a@example.com","password":"x"}"#).unwrap();
        assert_eq!(request.email, "a@example.com");
        assert_eq!(request.password.expose_secret(), "x");

        let empty = parse_login(b"  ").unwrap();
        assert!(empty.email.is_empty());
        assert!(empty.password.is_empty());

        assert!(matches!(parse_login(b"email=a"), Err(AuthError::Validation(_))));
        assert!(matches!(
            parse_login(br#"{"email":1,"password":"x"}"#),
            Err(AuthError::Validation(_))
        ));
    }
}
