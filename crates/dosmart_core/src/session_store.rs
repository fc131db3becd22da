//! Authentication state: who is logged in, with which token.
//!
//! Remote work is split in two halves so a caller can run the network call
//! anywhere (a spawned task, a blocking CLI run) and hand the outcome back:
//! [`SessionStore::begin`] hands out a ticket, [`SessionStore::complete`]
//! applies the outcome only if the ticket still matches the current session.

use crate::api::{self, AuthGateway};
use crate::error::AppError;
use crate::form::validate_credentials;
use crate::model::{Credentials, SessionState};
use crate::storage::{
    AUTH_TOKEN_KEY, KeyValueStore, SharedStore, TASKS_KEY, TOKEN_KEY, USERNAME_KEY, stored_token,
};
use serde_json::Value;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOp {
    Login,
    Signup,
    FetchCurrentUser,
}

/// Handle for one in-flight session operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTicket {
    pub op: SessionOp,
    version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRequest {
    Login {
        username: String,
        password: String,
    },
    Signup {
        username: String,
        password: String,
    },
    FetchCurrentUser {
        token: String,
        username: Option<String>,
    },
}

impl SessionRequest {
    pub fn op(&self) -> SessionOp {
        match self {
            Self::Login { .. } => SessionOp::Login,
            Self::Signup { .. } => SessionOp::Signup,
            Self::FetchCurrentUser { .. } => SessionOp::FetchCurrentUser,
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        match self {
            Self::Login { username, password } | Self::Signup { username, password } => {
                validate_credentials(username, password).map(|_| ())
            }
            Self::FetchCurrentUser { token, .. } if token.trim().is_empty() => {
                Err(AppError::not_logged_in())
            }
            Self::FetchCurrentUser { .. } => Ok(()),
        }
    }

    /// Runs the remote half of the operation.
    pub async fn execute(&self, gateway: &dyn AuthGateway) -> Result<Credentials, AppError> {
        match self {
            Self::Login { username, password } => {
                api::login(gateway, username.trim(), password).await
            }
            Self::Signup { username, password } => {
                api::signup(gateway, username.trim(), password).await
            }
            Self::FetchCurrentUser { token, username } => {
                gateway.validate_token(token).await?;
                Ok(Credentials {
                    username: username.clone().unwrap_or_default(),
                    token: token.clone(),
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Fulfilled(Credentials),
    Rejected(String),
}

/// Next state for `op` reaching `phase`.
pub fn reduce(state: &SessionState, op: SessionOp, phase: &Phase) -> SessionState {
    match phase {
        Phase::Pending => SessionState {
            loading: true,
            error: None,
            ..state.clone()
        },
        Phase::Fulfilled(credentials) => SessionState {
            username: Some(credentials.username.clone()),
            token: Some(credentials.token.clone()),
            is_authenticated: true,
            loading: false,
            error: None,
        },
        Phase::Rejected(message) if op == SessionOp::FetchCurrentUser => SessionState {
            error: Some(message.clone()),
            ..SessionState::default()
        },
        Phase::Rejected(message) => SessionState {
            loading: false,
            error: Some(message.clone()),
            ..state.clone()
        },
    }
}

pub struct SessionStore {
    state: SessionState,
    storage: SharedStore,
    version: u64,
    in_flight: Option<SessionOp>,
}

impl SessionStore {
    pub fn new(storage: SharedStore) -> Self {
        Self {
            state: SessionState::default(),
            storage,
            version: 0,
            in_flight: None,
        }
    }

    /// Starts from whatever the last run persisted. A stored token counts as
    /// authenticated until a revalidation says otherwise.
    pub fn restore(storage: SharedStore) -> Result<Self, AppError> {
        let mut store = Self::new(storage);
        if let Some(credentials) = store.stored_credentials()? {
            store.state = SessionState {
                username: Some(credentials.username),
                token: Some(credentials.token),
                is_authenticated: true,
                ..SessionState::default()
            };
        }
        Ok(store)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn token(&self) -> Option<&str> {
        self.state
            .token
            .as_deref()
            .filter(|_| self.state.is_authenticated)
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn stored_credentials(&self) -> Result<Option<Credentials>, AppError> {
        let Some(token) = stored_token(self.storage.as_ref())? else {
            return Ok(None);
        };
        let username = self.storage.get_string(USERNAME_KEY)?.unwrap_or_default();
        Ok(Some(Credentials { username, token }))
    }

    /// Request that checks the persisted token against the server.
    pub fn revalidation_request(&self) -> Result<SessionRequest, AppError> {
        let credentials = self
            .stored_credentials()?
            .ok_or_else(AppError::not_logged_in)?;
        Ok(SessionRequest::FetchCurrentUser {
            token: credentials.token,
            username: Some(credentials.username).filter(|name| !name.is_empty()),
        })
    }

    pub fn begin(&mut self, request: &SessionRequest) -> Result<SessionTicket, AppError> {
        if let Some(running) = self.in_flight {
            return Err(AppError::busy(format!(
                "{} is already in progress",
                op_name(running)
            )));
        }
        request.validate()?;

        let op = request.op();
        self.version += 1;
        self.in_flight = Some(op);
        self.state = reduce(&self.state, op, &Phase::Pending);
        debug!(op = op_name(op), version = self.version, "session operation started");
        Ok(SessionTicket {
            op,
            version: self.version,
        })
    }

    /// Applies an outcome. `Ok(None)` means the ticket is stale (a logout or
    /// another operation happened meanwhile) and nothing changed.
    pub fn complete(
        &mut self,
        ticket: SessionTicket,
        outcome: Result<Credentials, AppError>,
    ) -> Result<Option<Credentials>, AppError> {
        if ticket.version != self.version {
            debug!(
                op = op_name(ticket.op),
                ticket = ticket.version,
                current = self.version,
                "discarding stale session result"
            );
            return Ok(None);
        }
        self.in_flight = None;

        match outcome {
            Ok(credentials) => {
                if let Err(err) = self.persist(&credentials) {
                    let failed = Phase::Rejected(err.message().to_string());
                    self.state = reduce(&self.state, ticket.op, &failed);
                    return Err(err);
                }
                info!(
                    user = %credentials.username,
                    op = op_name(ticket.op),
                    "session authenticated"
                );
                let applied = Phase::Fulfilled(credentials.clone());
                self.state = reduce(&self.state, ticket.op, &applied);
                Ok(Some(credentials))
            }
            Err(err) => {
                debug!(op = op_name(ticket.op), error = %err, "session operation failed");
                if ticket.op == SessionOp::FetchCurrentUser
                    && let Err(clear_err) = self.clear_storage()
                {
                    warn!(error = %clear_err, "could not clear stored session");
                }
                self.state = reduce(
                    &self.state,
                    ticket.op,
                    &Phase::Rejected(err.message().to_string()),
                );
                Err(err)
            }
        }
    }

    /// Drops the session in memory and on disk. Safe to call repeatedly.
    pub fn logout(&mut self) -> Result<(), AppError> {
        self.version += 1;
        self.in_flight = None;
        self.state = SessionState::default();
        info!("session cleared");
        self.clear_storage()
    }

    pub async fn login(
        &mut self,
        gateway: &dyn AuthGateway,
        username: &str,
        password: &str,
    ) -> Result<Credentials, AppError> {
        let request = SessionRequest::Login {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.run(gateway, request).await
    }

    pub async fn signup(
        &mut self,
        gateway: &dyn AuthGateway,
        username: &str,
        password: &str,
    ) -> Result<Credentials, AppError> {
        let request = SessionRequest::Signup {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.run(gateway, request).await
    }

    pub async fn fetch_current_user(
        &mut self,
        gateway: &dyn AuthGateway,
    ) -> Result<Credentials, AppError> {
        let request = self.revalidation_request()?;
        self.run(gateway, request).await
    }

    async fn run(
        &mut self,
        gateway: &dyn AuthGateway,
        request: SessionRequest,
    ) -> Result<Credentials, AppError> {
        let ticket = self.begin(&request)?;
        let outcome = request.execute(gateway).await;
        self.complete(ticket, outcome)?
            .ok_or_else(|| AppError::busy("session changed before the request finished"))
    }

    fn persist(&self, credentials: &Credentials) -> Result<(), AppError> {
        let token = Value::String(credentials.token.clone());
        self.storage.set(TOKEN_KEY, token.clone())?;
        self.storage.set(AUTH_TOKEN_KEY, token)?;
        self.storage
            .set(USERNAME_KEY, Value::String(credentials.username.clone()))
    }

    fn clear_storage(&self) -> Result<(), AppError> {
        clear_session_keys(self.storage.as_ref())
    }
}

pub fn clear_session_keys(storage: &dyn KeyValueStore) -> Result<(), AppError> {
    for key in [TOKEN_KEY, AUTH_TOKEN_KEY, USERNAME_KEY, TASKS_KEY] {
        storage.remove(key)?;
    }
    Ok(())
}

fn op_name(op: SessionOp) -> &'static str {
    match op {
        SessionOp::Login => "login",
        SessionOp::Signup => "signup",
        SessionOp::FetchCurrentUser => "fetch user",
    }
}
