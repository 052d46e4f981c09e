//! Per-IP request throttle for every route.

use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use super::error::AppError;
use super::middleware::ClientIp;
use super::routes::AppState;
use crate::guard::keys;
use crate::jwt::TokenIssuer;
use crate::store::{CounterInfo, Expiry};
use crate::{AuthError, RoleRepository, UserRepository};

const LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

async fn hit<U, R, T>(state: &AppState<U, R, T>, ip: &str) -> Result<CounterInfo, AuthError> {
    let throttle = &state.config.throttle;
    let key = keys::throttle(ip);
    let fut = state.store.increment(
        &key,
        throttle.window,
        Expiry::FromFirstHit,
        Utc::now(),
    );

    tokio::time::timeout(state.config.guard.store_timeout, fut)
        .await
        .map_err(|_| AuthError::StoreUnavailable("throttle increment timed out".to_owned()))?
}

/// `axum::middleware::from_fn_with_state` handler.
///
/// Counts every request from the client IP in a fixed window. Store errors
/// let the request through.
pub async fn throttle<U, R, T>(
    State(state): State<AppState<U, R, T>>,
    ClientIp(ip): ClientIp,
    request: Request,
    next: Next,
) -> Response
where
    U: UserRepository + Clone + 'static,
    R: RoleRepository + Clone + 'static,
    T: TokenIssuer + Clone + 'static,
{
    let max = state.config.throttle.max_requests;

    let info = match hit(&state, &ip).await {
        Ok(info) => info,
        Err(e) => {
            log::error!(
                target: "turnstile_auth",
                "msg=\"throttle store error\", ip=\"{ip}\", error=\"{e}\""
            );
            return next.run(request).await;
        }
    };

    if info.count > max {
        let retry_after = u64::try_from(info.available_in(Utc::now())).unwrap_or(0).max(1);
        log::warn!(
            target: "turnstile_auth",
            "msg=\"rate limited\", ip=\"{ip}\", retry_after={retry_after}"
        );

        let mut response = AppError(AuthError::TooManyRequests { retry_after }).into_response();

        let headers = response.headers_mut();
        headers.insert(LIMIT, HeaderValue::from(max));
        headers.insert(REMAINING, HeaderValue::from_static("0"));
        return response;
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(LIMIT, HeaderValue::from(max));
    headers.insert(REMAINING, HeaderValue::from(max.saturating_sub(info.count)));
    response
}
