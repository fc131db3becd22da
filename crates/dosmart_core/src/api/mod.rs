//! Remote gateway: one call per backend operation.
//!
//! The traits are the seam between the stores and the network. `HttpGateway`
//! talks to the real backend; tests substitute in-memory fakes.

use crate::error::{AppError, Operation};
use crate::model::{Credentials, NewTask, Task, TaskStatus, TaskUpdate};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod http;

pub use http::HttpGateway;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// `POST /auth/register`.
    async fn register(&self, username: &str, password: &str)
    -> Result<Option<RegisteredUser>, AppError>;

    /// `POST /auth/login`, returning the issued token.
    async fn login(&self, username: &str, password: &str) -> Result<String, AppError>;

    /// Calls a protected endpoint to check that `token` is still accepted.
    async fn validate_token(&self, token: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait TaskGateway: Send + Sync {
    async fn fetch_tasks(&self, token: &str) -> Result<Vec<Task>, AppError>;

    async fn create_task(&self, token: &str, input: &NewTask) -> Result<Task, AppError>;

    async fn update_task(&self, token: &str, id: &str, fields: &TaskUpdate)
    -> Result<Task, AppError>;

    async fn update_task_status(
        &self,
        token: &str,
        id: &str,
        status: TaskStatus,
    ) -> Result<Task, AppError>;

    /// Returns the server's confirmation message.
    async fn delete_task(&self, token: &str, id: &str) -> Result<String, AppError>;
}

pub async fn login(
    gateway: &dyn AuthGateway,
    username: &str,
    password: &str,
) -> Result<Credentials, AppError> {
    let token = gateway.login(username, password).await?;
    Ok(Credentials {
        username: username.to_string(),
        token,
    })
}

/// Registers the account, then logs in with the same credentials so the
/// caller ends up with a token. A failing login step is reported as
/// [`Operation::LoginAfterSignup`].
pub async fn signup(
    gateway: &dyn AuthGateway,
    username: &str,
    password: &str,
) -> Result<Credentials, AppError> {
    gateway.register(username, password).await?;
    let token = gateway
        .login(username, password)
        .await
        .map_err(|err| reassign_operation(err, Operation::LoginAfterSignup))?;
    Ok(Credentials {
        username: username.to_string(),
        token,
    })
}

/// Moves a gateway error to another operation. A default message of the old
/// operation, alone or as the prefix of a transport error, is swapped for the
/// new operation's default; server-provided messages are kept.
pub fn reassign_operation(err: AppError, target: Operation) -> AppError {
    let swap = |previous: Option<Operation>, message: String| match previous {
        Some(op) if op.default_message() == message => target.default_message().to_string(),
        _ => message,
    };

    match err {
        AppError::Transport { operation, message } => {
            let message = match message.strip_prefix(operation.default_message()) {
                Some(detail) => format!("{}{detail}", target.default_message()),
                None => message,
            };
            AppError::Transport {
                operation: target,
                message,
            }
        }
        AppError::Rejected {
            operation,
            status,
            message,
        } => AppError::Rejected {
            operation: target,
            status,
            message: swap(Some(operation), message),
        },
        AppError::Unauthorized { operation, message } => AppError::Unauthorized {
            operation: Some(target),
            message: swap(operation, message),
        },
        other => other,
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Pulls a human-readable message out of an error response body: the
/// `error` field first, then `message`.
pub fn extract_error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .error
        .filter(|value| !value.trim().is_empty())
        .or(parsed.message.filter(|value| !value.trim().is_empty()))
}

/// Converts a non-2xx response into an error for `operation`.
pub fn error_from_response(operation: Operation, status: u16, body: &str) -> AppError {
    let message = extract_error_message(body)
        .unwrap_or_else(|| operation.default_message().to_string());

    if status == 401 || status == 403 {
        AppError::Unauthorized {
            operation: Some(operation),
            message,
        }
    } else {
        AppError::Rejected {
            operation,
            status,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AuthGateway, RegisteredUser, error_from_response, extract_error_message,
        reassign_operation, signup,
    };
    use crate::error::{AppError, Operation};
    use async_trait::async_trait;

    #[test]
    fn extract_prefers_error_field() {
        let body = r#"{"error":"Username taken","message":"ignored"}"#;
        assert_eq!(extract_error_message(body).as_deref(), Some("Username taken"));
    }

    #[test]
    fn extract_falls_back_to_message_field() {
        let body = r#"{"message":"Task not found"}"#;
        assert_eq!(extract_error_message(body).as_deref(), Some("Task not found"));
    }

    #[test]
    fn extract_ignores_non_json_and_blank_fields() {
        assert_eq!(extract_error_message("<html>502</html>"), None);
        assert_eq!(extract_error_message(r#"{"error":"  "}"#), None);
    }

    #[test]
    fn error_from_response_uses_default_message() {
        let err = error_from_response(Operation::DeleteTask, 500, "");
        assert_eq!(
            err,
            AppError::Rejected {
                operation: Operation::DeleteTask,
                status: 500,
                message: "Failed to delete task".to_string(),
            }
        );
    }

    #[test]
    fn error_from_response_maps_auth_statuses() {
        let err = error_from_response(Operation::FetchTasks, 401, r#"{"error":"Invalid token"}"#);
        assert!(err.is_auth_failure());
        assert_eq!(err.message(), "Invalid token");
        assert_eq!(err.operation(), Some(Operation::FetchTasks));
    }

    #[test]
    fn reassign_swaps_only_default_messages() {
        let defaulted = error_from_response(Operation::Login, 500, "");
        let moved = reassign_operation(defaulted, Operation::LoginAfterSignup);
        assert_eq!(moved.message(), "Login after signup failed");
        assert_eq!(moved.operation(), Some(Operation::LoginAfterSignup));

        let explained = error_from_response(Operation::Login, 500, r#"{"error":"db down"}"#);
        let moved = reassign_operation(explained, Operation::LoginAfterSignup);
        assert_eq!(moved.message(), "db down");
    }

    #[test]
    fn reassign_rewrites_transport_prefix() {
        let unreachable = AppError::Transport {
            operation: Operation::Login,
            message: "Login failed: connection refused".to_string(),
        };
        let moved = reassign_operation(unreachable, Operation::LoginAfterSignup);
        assert_eq!(moved.code(), "transport_error");
        assert_eq!(moved.message(), "Login after signup failed: connection refused");
        assert_eq!(moved.operation(), Some(Operation::LoginAfterSignup));

        let other = AppError::Transport {
            operation: Operation::Login,
            message: "proxy refused".to_string(),
        };
        let moved = reassign_operation(other, Operation::LoginAfterSignup);
        assert_eq!(moved.message(), "proxy refused");
    }

    struct RegisterOnly;

    #[async_trait]
    impl AuthGateway for RegisterOnly {
        async fn register(
            &self,
            username: &str,
            _password: &str,
        ) -> Result<Option<RegisteredUser>, AppError> {
            Ok(Some(RegisteredUser {
                id: "u1".to_string(),
                username: username.to_string(),
                created_at: None,
            }))
        }

        async fn login(&self, _username: &str, _password: &str) -> Result<String, AppError> {
            Err(error_from_response(Operation::Login, 500, ""))
        }

        async fn validate_token(&self, _token: &str) -> Result<(), AppError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn signup_reports_login_step_separately() {
        let err = signup(&RegisterOnly, "ada", "pw").await.unwrap_err();

        assert_eq!(err.operation(), Some(Operation::LoginAfterSignup));
        assert_eq!(err.message(), "Login after signup failed");
    }
}
