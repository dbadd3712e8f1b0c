//! Account login state
//!
//! [`AuthService`] is the one place that changes who is logged in. Anything
//! that renders differently for logged-in users holds a
//! [`AuthService::subscribe`] receiver instead of polling the store.

use serde::{Deserialize, Serialize};
use sprout_proto::validation;
use tokio::sync::watch;

use crate::credentials::{CredentialStore, CurrentUser, Role, Session};
use crate::error::{AuthError, Operation};
use crate::http::{ApiClient, LOGIN_PATH, REGISTER_PATH};

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(rename = "deviceToken")]
    device_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    role: Role,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
    role: Role,
    #[serde(rename = "deviceToken")]
    device_token: &'a str,
}

pub struct AuthService {
    api: ApiClient,
    credentials: CredentialStore,
    session: watch::Sender<Option<Session>>,
}

impl AuthService {
    /// Restores a previously saved session, if the store holds a complete one
    pub fn new(api: ApiClient, credentials: CredentialStore) -> Self {
        let restored = match credentials.load_session() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "could not restore session");
                None
            }
        };
        if let Some(s) = &restored {
            tracing::debug!(email = %s.email, role = %s.role, "session restored");
        }
        let (session, _) = watch::channel(restored);
        Self {
            api,
            credentials,
            session,
        }
    }

    /// Log in and persist the session. Nothing is stored on failure.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        validation::validate_login(email, password)?;
        let email = email.trim();

        let device_token = self.credentials.device_token_or_placeholder()?;
        let request = LoginRequest {
            email,
            password,
            device_token: &device_token,
        };
        let reply: LoginResponse = self.api.post(Operation::Login, LOGIN_PATH, &request).await?;

        let session = Session {
            token: reply.token,
            email: email.to_owned(),
            role: reply.role,
        };
        if let Err(e) = self.credentials.save_session(&session) {
            // don't leave half a session behind
            if let Err(e) = self.credentials.clear_session() {
                tracing::warn!(error = %e, "could not clear partial session");
            }
            return Err(e.into());
        }

        tracing::info!(email = %session.email, role = %session.role, "logged in");
        self.session.send_replace(Some(session.clone()));
        Ok(session)
    }

    /// Create an account. Does not log in; returns the server's account JSON.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: Role,
    ) -> Result<serde_json::Value, AuthError> {
        validation::validate_new_account(name, email, password)?;

        let device_token = self.credentials.device_token_or_placeholder()?;
        let request = RegisterRequest {
            email: email.trim(),
            password,
            name: name.trim(),
            role,
            device_token: &device_token,
        };
        let account = self
            .api
            .post(Operation::Register, REGISTER_PATH, &request)
            .await?;
        tracing::info!(email = %request.email, "account registered");
        Ok(account)
    }

    /// Forget the session. Calling it while logged out is fine.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.credentials.clear_session()?;
        if self.session.send_replace(None).is_some() {
            tracing::info!("logged out");
        }
        Ok(())
    }

    /// A token is stored. Its validity is only known to the server.
    pub fn is_authenticated(&self) -> bool {
        match self.credentials.token() {
            Ok(token) => token.is_some_and(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "auth check failed");
                false
            }
        }
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        match self.credentials.current_user() {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "could not read current user");
                None
            }
        }
    }

    pub fn session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }
}
