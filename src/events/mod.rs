//! Auth and guard events.
//!
//! Actions and the [`AbuseGuard`](crate::guard::AbuseGuard) dispatch an
//! [`AuthEvent`] for every login outcome and every new block. Nothing happens
//! until listeners are registered.
//!
//! ```rust,ignore
//! use turnstile::events::{register_event_listeners, listeners::LoggingListener};
//!
//! register_event_listeners(|registry| {
//!     registry.listen(LoggingListener::new());
//! });
//! ```
//!
//! Custom listeners implement [`Listener`]:
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use turnstile::events::{AuthEvent, Listener};
//!
//! struct BlockAlerts;
//!
//! #[async_trait]
//! impl Listener for BlockAlerts {
//!     async fn handle(&self, event: &AuthEvent) {
//!         if let AuthEvent::IpBlocked { ip, kind, .. } = event {
//!             // page someone
//!         }
//!     }
//! }
//! ```

mod event;
mod listener;
mod registry;

pub mod listeners;

pub use event::AuthEvent;
pub use listener::Listener;
pub use registry::{EventRegistry, dispatch, register_event_listeners};
