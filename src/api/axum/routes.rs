use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use tower_http::trace::TraceLayer;

use super::{handlers, throttle};
use crate::config::TurnstileConfig;
use crate::crypto::{Argon2Hasher, PasswordHasher};
use crate::guard::AbuseGuard;
use crate::jwt::TokenIssuer;
use crate::store::CounterStore;
use crate::{RoleRepository, UserRepository};

#[derive(Clone)]
pub struct AppState<U, R, T> {
    pub user_repo: U,
    pub role_repo: R,
    pub token_issuer: T,
    pub guard: AbuseGuard,
    /// Shared with the guard; the API throttle keeps its counters here too.
    pub store: Arc<dyn CounterStore>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub config: Arc<TurnstileConfig>,
}

impl<U, R, T> AppState<U, R, T> {
    pub fn new(
        user_repo: U,
        role_repo: R,
        token_issuer: T,
        store: Arc<dyn CounterStore>,
        config: TurnstileConfig,
    ) -> Self {
        Self {
            user_repo,
            role_repo,
            token_issuer,
            guard: AbuseGuard::with_config(Arc::clone(&store), config.guard.clone()),
            store,
            hasher: Arc::new(Argon2Hasher::default()),
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }
}

/// `POST /login`, `POST /register`
pub fn auth_routes<U, R, T>() -> Router<AppState<U, R, T>>
where
    U: UserRepository + Clone + 'static,
    R: RoleRepository + Clone + 'static,
    T: TokenIssuer + Clone + 'static,
{
    Router::new()
        .route("/login", post(handlers::login::<U, R, T>))
        .route("/register", post(handlers::register::<U, R, T>))
}

/// Bearer-token protected profile routes.
pub fn profile_routes<U, R, T>() -> Router<AppState<U, R, T>>
where
    U: UserRepository + Clone + 'static,
    R: RoleRepository + Clone + 'static,
    T: TokenIssuer + Clone + 'static,
{
    Router::new()
        .route("/update", put(handlers::update_profile::<U, R, T>))
        .route("/secure", get(handlers::secure_profile::<U, R, T>))
        .route("/secure/{id}", get(handlers::secure_profile_by_id::<U, R, T>))
        .route("/{id}", get(handlers::get_profile::<U, R, T>))
}

/// Full application: `/auth` and `/profile` behind the per-IP throttle.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so the
/// guard sees peer addresses.
pub fn router<U, R, T>(state: AppState<U, R, T>) -> Router
where
    U: UserRepository + Clone + 'static,
    R: RoleRepository + Clone + 'static,
    T: TokenIssuer + Clone + 'static,
{
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/profile", profile_routes())
        .layer(from_fn_with_state(state.clone(), throttle::throttle::<U, R, T>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
