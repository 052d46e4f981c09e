use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::error::AppError;
use super::routes::AppState;
use crate::jwt::TokenIssuer;
use crate::{AuthError, AuthUser, RoleRepository, UserRepository};

/// validates the bearer token from `Authorization` and loads its user
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    user: AuthUser,
}

impl AuthenticatedUser {
    pub fn into_inner(self) -> AuthUser {
        self.user
    }

    pub fn user(&self) -> &AuthUser {
        &self.user
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToOwned::to_owned)
}

impl<U, R, T> FromRequestParts<AppState<U, R, T>> for AuthenticatedUser
where
    U: UserRepository + Clone + 'static,
    R: RoleRepository + Clone + 'static,
    T: TokenIssuer + Clone + 'static,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<U, R, T>,
    ) -> Result<Self, Self::Rejection> {
        let token =
            extract_bearer_token(&parts.headers).ok_or(AppError(AuthError::TokenInvalid))?;

        let user_id = state.token_issuer.verify(&token)?;

        // a token for a deleted user is as good as no token
        let user = state
            .user_repo
            .find_user_by_id(user_id)
            .await?
            .ok_or(AppError(AuthError::TokenInvalid))?;

        Ok(AuthenticatedUser { user })
    }
}

/// The IP the abuse guard and the throttle key on.
///
/// The peer address by default. With `trust_proxy_headers` the first
/// `X-Forwarded-For` entry, then `X-Real-IP`, then `CF-Connecting-IP` win.
/// Falls back to `"unknown"` when the server was started without connect info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<U, R, T> FromRequestParts<AppState<U, R, T>> for ClientIp
where
    U: UserRepository + Clone + 'static,
    R: RoleRepository + Clone + 'static,
    T: TokenIssuer + Clone + 'static,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<U, R, T>,
    ) -> Result<Self, Self::Rejection> {
        let peer = ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|ConnectInfo(addr)| addr);

        Ok(ClientIp(extract_client_ip(
            &parts.headers,
            peer,
            state.config.trust_proxy_headers,
        )))
    }
}

fn header_ip(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(ToOwned::to_owned)
}

pub fn extract_client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy_headers: bool,
) -> String {
    if trust_proxy_headers {
        let forwarded = ["X-Forwarded-For", "X-Real-IP", "CF-Connecting-IP"]
            .into_iter()
            .find_map(|name| header_ip(headers, name));
        if let Some(ip) = forwarded {
            return ip;
        }
    }

    peer.map_or_else(|| "unknown".to_owned(), |addr| addr.ip().to_string())
}
