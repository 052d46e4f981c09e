mod cors;
mod error;
mod handlers;
mod middleware;
mod routes;
mod throttle;

pub use cors::cors_layer;
pub use error::AppError;
pub use middleware::{AuthenticatedUser, ClientIp, extract_bearer_token, extract_client_ip};
pub use routes::{AppState, auth_routes, profile_routes, router};
pub use throttle::throttle;
