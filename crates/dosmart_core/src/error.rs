use std::fmt;
use thiserror::Error;

/// Remote operation an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Register,
    Login,
    LoginAfterSignup,
    FetchCurrentUser,
    FetchTasks,
    CreateTask,
    UpdateTask,
    UpdateTaskStatus,
    DeleteTask,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Self::Register => "signup",
            Self::Login => "login",
            Self::LoginAfterSignup => "login after signup",
            Self::FetchCurrentUser => "fetch user",
            Self::FetchTasks => "fetch tasks",
            Self::CreateTask => "create task",
            Self::UpdateTask => "update task",
            Self::UpdateTaskStatus => "update task status",
            Self::DeleteTask => "delete task",
        }
    }

    /// Message shown when the server gives no usable error body.
    pub fn default_message(self) -> &'static str {
        match self {
            Self::Register => "Signup failed",
            Self::Login => "Login failed",
            Self::LoginAfterSignup => "Login after signup failed",
            Self::FetchCurrentUser => "Fetch user failed",
            Self::FetchTasks => "Failed to fetch tasks",
            Self::CreateTask => "Failed to create task",
            Self::UpdateTask => "Failed to update task",
            Self::UpdateTaskStatus => "Failed to update task status",
            Self::DeleteTask => "Failed to delete task",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("invalid_input - {0}")]
    InvalidInput(String),
    #[error("invalid_data - {0}")]
    InvalidData(String),
    #[error("io_error - {0}")]
    Io(String),
    #[error("transport_error - {message}")]
    Transport {
        operation: Operation,
        message: String,
    },
    #[error("rejected - {message}")]
    Rejected {
        operation: Operation,
        status: u16,
        message: String,
    },
    #[error("unauthorized - {message}")]
    Unauthorized {
        operation: Option<Operation>,
        message: String,
    },
    #[error("busy - {0}")]
    Busy(String),
}

impl AppError {
    pub fn invalid_input<M: Into<String>>(message: M) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_data<M: Into<String>>(message: M) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io(message.into())
    }

    pub fn busy<M: Into<String>>(message: M) -> Self {
        Self::Busy(message.into())
    }

    pub fn not_logged_in() -> Self {
        Self::Unauthorized {
            operation: None,
            message: "not logged in".to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidData(_) => "invalid_data",
            Self::Io(_) => "io_error",
            Self::Transport { .. } => "transport_error",
            Self::Rejected { .. } => "rejected",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Busy(_) => "busy",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(message)
            | Self::InvalidData(message)
            | Self::Io(message)
            | Self::Busy(message) => message,
            Self::Transport { message, .. }
            | Self::Rejected { message, .. }
            | Self::Unauthorized { message, .. } => message,
        }
    }

    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Transport { operation, .. } | Self::Rejected { operation, .. } => {
                Some(*operation)
            }
            Self::Unauthorized { operation, .. } => *operation,
            _ => None,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}
