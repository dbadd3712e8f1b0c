//! Sprout account client
//!
//! Talks to the Sprout HTTP API (login, registration, plants) and keeps the
//! session in a local credential store so it survives restarts.

pub mod auth;
pub mod config;
pub mod credentials;
mod error;
pub mod http;
pub mod store;

#[cfg(test)]
mod stub;

pub use auth::AuthService;
pub use config::{ClientConfig, ConfigError, CredentialBackend};
pub use credentials::{CredentialStore, CurrentUser, Role, Session};
pub use error::{ApiError, AuthError, Operation};
pub use http::ApiClient;
pub use store::{KeyValueStore, StoreError};
