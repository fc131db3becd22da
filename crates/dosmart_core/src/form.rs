//! Client-side validation for the login, quick-task, custom-task and edit
//! forms. Validation runs before any request is sent.

use crate::error::AppError;
use crate::model::{NewTask, Task, TaskStatus, TaskUpdate};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// Trimmed username plus the password as typed.
pub fn validate_credentials(username: &str, password: &str) -> Result<(String, String), AppError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::invalid_input("username is required"));
    }
    if password.trim().is_empty() {
        return Err(AppError::invalid_input("password is required"));
    }
    Ok((username.to_string(), password.to_string()))
}

pub fn quick_task(text: &str) -> Result<NewTask, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("task text is required"));
    }
    Ok(NewTask::Simple {
        text_input: trimmed.to_string(),
    })
}

/// Parses a timestamp typed by the user: RFC 3339, or a local
/// `YYYY-MM-DDTHH:MM[:SS]` / `YYYY-MM-DD HH:MM[:SS]`.
pub fn parse_datetime(raw: &str, offset: UtcOffset) -> Result<OffsetDateTime, AppError> {
    let trimmed = raw.trim();
    if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(parsed);
    }

    let local_formats = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ];
    local_formats
        .iter()
        .find_map(|format| PrimitiveDateTime::parse(trimmed, format).ok())
        .map(|local| local.assume_offset(offset))
        .ok_or_else(|| AppError::invalid_input(format!("'{trimmed}' is not a valid date and time")))
}

pub fn to_utc_string(value: OffsetDateTime) -> Result<String, AppError> {
    value
        .to_offset(UtcOffset::UTC)
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

fn parse_date(raw: &str) -> Result<Date, AppError> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::invalid_input("start date must be YYYY-MM-DD"))
}

fn parse_time(raw: &str) -> Result<Time, AppError> {
    let trimmed = raw.trim();
    Time::parse(trimmed, format_description!("[hour]:[minute]"))
        .or_else(|_| Time::parse(trimmed, format_description!("[hour]:[minute]:[second]")))
        .map_err(|_| AppError::invalid_input("start time must be HH:MM"))
}

fn required<'a>(value: &'a str, message: &str) -> Result<&'a str, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AppError::invalid_input(message))
    } else {
        Ok(trimmed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomTaskForm {
    pub title: String,
    pub description: String,
    pub start_date: String,
    pub start_time: String,
    pub deadline: String,
}

impl CustomTaskForm {
    /// Builds the create payload. Start date and time are combined in
    /// `offset`; both timestamps are sent as UTC.
    pub fn validate(&self, offset: UtcOffset) -> Result<NewTask, AppError> {
        let title = required(&self.title, "title is required")?;
        let description = required(&self.description, "description is required")?;
        required(&self.start_date, "start date is required")?;
        required(&self.start_time, "start time is required")?;
        required(&self.deadline, "deadline is required")?;

        let start = PrimitiveDateTime::new(
            parse_date(&self.start_date)?,
            parse_time(&self.start_time)?,
        )
        .assume_offset(offset);
        let deadline = parse_datetime(&self.deadline, offset)?;
        if deadline < start {
            return Err(AppError::invalid_input(
                "deadline must not be before the start time",
            ));
        }

        Ok(NewTask::Custom {
            title: title.to_string(),
            description: Some(description.to_string()),
            start_time: Some(to_utc_string(start)?),
            deadline: to_utc_string(deadline)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEditForm {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub deadline: String,
}

impl TaskEditForm {
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            status: task.status,
            deadline: task.deadline.clone(),
        }
    }

    /// Field set for the update call. A blank description is sent as `null`.
    pub fn validate(&self, offset: UtcOffset) -> Result<TaskUpdate, AppError> {
        let title = required(&self.title, "title is required")?;
        let deadline = parse_datetime(required(&self.deadline, "deadline is required")?, offset)?;
        let description = match self.description.trim() {
            "" => None,
            value => Some(value.to_string()),
        };

        Ok(TaskUpdate {
            title: Some(title.to_string()),
            description: Some(description),
            start_time: None,
            deadline: Some(to_utc_string(deadline)?),
            status: Some(self.status),
        })
    }
}
