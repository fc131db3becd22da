//! The signed-in user's task list.
//!
//! Like the session store, every remote call is bracketed by `begin` and
//! `complete`. The list only changes when the server's answer is applied.

use crate::api::TaskGateway;
use crate::board::{Bucket, plan_move};
use crate::error::AppError;
use crate::model::{NewTask, Task, TaskStatus, TaskUpdate};
use crate::storage::{SharedStore, mirror_tasks};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// Action key guarded by an in-progress flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskOp {
    Load,
    Create,
    Update(String),
    UpdateStatus(String),
    Remove(String),
}

impl fmt::Display for TaskOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => f.write_str("load"),
            Self::Create => f.write_str("create"),
            Self::Update(id) => write!(f, "update:{id}"),
            Self::UpdateStatus(id) => write!(f, "status:{id}"),
            Self::Remove(id) => write!(f, "remove:{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskRequest {
    Load,
    Create(NewTask),
    Update { id: String, fields: TaskUpdate },
    UpdateStatus { id: String, status: TaskStatus },
    Remove { id: String },
}

impl TaskRequest {
    pub fn op(&self) -> TaskOp {
        match self {
            Self::Load => TaskOp::Load,
            Self::Create(_) => TaskOp::Create,
            Self::Update { id, .. } => TaskOp::Update(id.clone()),
            Self::UpdateStatus { id, .. } => TaskOp::UpdateStatus(id.clone()),
            Self::Remove { id } => TaskOp::Remove(id.clone()),
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        match self {
            Self::Load => Ok(()),
            Self::Create(NewTask::Simple { text_input }) if text_input.trim().is_empty() => {
                Err(AppError::invalid_input("task text is required"))
            }
            Self::Create(NewTask::Custom { title, .. }) if title.trim().is_empty() => {
                Err(AppError::invalid_input("title is required"))
            }
            Self::Create(_) => Ok(()),
            Self::Update { fields, .. } if fields.is_empty() => {
                Err(AppError::invalid_input("nothing to update"))
            }
            Self::Update { id, .. } | Self::UpdateStatus { id, .. } | Self::Remove { id }
                if id.trim().is_empty() =>
            {
                Err(AppError::invalid_input("task id is required"))
            }
            _ => Ok(()),
        }
    }

    pub async fn execute(
        &self,
        gateway: &dyn TaskGateway,
        token: &str,
    ) -> Result<TaskOutcome, AppError> {
        match self {
            Self::Load => gateway.fetch_tasks(token).await.map(TaskOutcome::Loaded),
            Self::Create(input) => gateway
                .create_task(token, input)
                .await
                .map(TaskOutcome::Created),
            Self::Update { id, fields } => gateway
                .update_task(token, id, fields)
                .await
                .map(TaskOutcome::Updated),
            Self::UpdateStatus { id, status } => gateway
                .update_task_status(token, id, *status)
                .await
                .map(TaskOutcome::Updated),
            Self::Remove { id } => {
                gateway.delete_task(token, id).await?;
                Ok(TaskOutcome::Removed(id.clone()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Loaded(Vec<Task>),
    Created(Task),
    Updated(Task),
    Removed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTicket {
    pub op: TaskOp,
    generation: u64,
}

#[derive(Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    error: Option<String>,
    in_flight: HashSet<TaskOp>,
    generation: u64,
    mirror: Option<SharedStore>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also writes the list to the `tasks` storage key after each change.
    pub fn with_mirror(storage: SharedStore) -> Self {
        Self {
            mirror: Some(storage),
            ..Self::default()
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn is_running(&self, op: &TaskOp) -> bool {
        self.in_flight.contains(op)
    }

    pub fn begin(&mut self, request: &TaskRequest) -> Result<TaskTicket, AppError> {
        let op = request.op();
        if self.in_flight.contains(&op) {
            return Err(AppError::busy(format!("{op} is already in progress")));
        }
        request.validate()?;

        self.error = None;
        self.in_flight.insert(op.clone());
        debug!(%op, "task operation started");
        Ok(TaskTicket {
            op,
            generation: self.generation,
        })
    }

    /// Applies an outcome. `Ok(None)` means the store was reset after the
    /// ticket was issued and the outcome was dropped.
    pub fn complete(
        &mut self,
        ticket: TaskTicket,
        outcome: Result<TaskOutcome, AppError>,
    ) -> Result<Option<TaskOutcome>, AppError> {
        if ticket.generation != self.generation {
            debug!(op = %ticket.op, "discarding task result from a previous session");
            return Ok(None);
        }
        self.in_flight.remove(&ticket.op);

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                debug!(op = %ticket.op, error = %err, "task operation failed");
                self.error = Some(err.message().to_string());
                return Err(err);
            }
        };

        match &outcome {
            TaskOutcome::Loaded(tasks) => self.tasks = tasks.clone(),
            TaskOutcome::Created(task) => self.tasks.push(task.clone()),
            TaskOutcome::Updated(task) => {
                match self.tasks.iter_mut().find(|existing| existing.id == task.id) {
                    Some(existing) => *existing = task.clone(),
                    None => debug!(id = %task.id, "updated task is not in the local list"),
                }
            }
            TaskOutcome::Removed(id) => self.tasks.retain(|task| &task.id != id),
        }
        self.write_mirror();
        Ok(Some(outcome))
    }

    /// Forgets everything, including in-flight operations.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.tasks.clear();
        self.error = None;
        self.in_flight.clear();
    }

    pub async fn load(
        &mut self,
        gateway: &dyn TaskGateway,
        token: &str,
    ) -> Result<Vec<Task>, AppError> {
        match self.run(gateway, token, TaskRequest::Load).await? {
            TaskOutcome::Loaded(tasks) => Ok(tasks),
            other => Err(unexpected(other)),
        }
    }

    pub async fn create(
        &mut self,
        gateway: &dyn TaskGateway,
        token: &str,
        input: NewTask,
    ) -> Result<Task, AppError> {
        match self.run(gateway, token, TaskRequest::Create(input)).await? {
            TaskOutcome::Created(task) => Ok(task),
            other => Err(unexpected(other)),
        }
    }

    pub async fn update(
        &mut self,
        gateway: &dyn TaskGateway,
        token: &str,
        id: &str,
        fields: TaskUpdate,
    ) -> Result<Task, AppError> {
        let request = TaskRequest::Update {
            id: id.to_string(),
            fields,
        };
        match self.run(gateway, token, request).await? {
            TaskOutcome::Updated(task) => Ok(task),
            other => Err(unexpected(other)),
        }
    }

    pub async fn update_status(
        &mut self,
        gateway: &dyn TaskGateway,
        token: &str,
        id: &str,
        status: TaskStatus,
    ) -> Result<Task, AppError> {
        let request = TaskRequest::UpdateStatus {
            id: id.to_string(),
            status,
        };
        match self.run(gateway, token, request).await? {
            TaskOutcome::Updated(task) => Ok(task),
            other => Err(unexpected(other)),
        }
    }

    pub async fn remove(
        &mut self,
        gateway: &dyn TaskGateway,
        token: &str,
        id: &str,
    ) -> Result<(), AppError> {
        let request = TaskRequest::Remove { id: id.to_string() };
        self.run(gateway, token, request).await.map(|_| ())
    }

    /// Moves a card between buckets. `Ok(None)` when the move needs no call.
    pub async fn move_task(
        &mut self,
        gateway: &dyn TaskGateway,
        token: &str,
        id: &str,
        source: Bucket,
        destination: Bucket,
    ) -> Result<Option<Task>, AppError> {
        let Some(change) = plan_move(&self.tasks, id, source, destination) else {
            return Ok(None);
        };
        self.update_status(gateway, token, &change.task_id, change.status)
            .await
            .map(Some)
    }

    async fn run(
        &mut self,
        gateway: &dyn TaskGateway,
        token: &str,
        request: TaskRequest,
    ) -> Result<TaskOutcome, AppError> {
        let ticket = self.begin(&request)?;
        let outcome = request.execute(gateway, token).await;
        self.complete(ticket, outcome)?
            .ok_or_else(|| AppError::busy("task list was reset before the request finished"))
    }

    fn write_mirror(&self) {
        if let Some(storage) = &self.mirror
            && let Err(err) = mirror_tasks(storage.as_ref(), &self.tasks)
        {
            warn!(error = %err, "could not mirror task list");
        }
    }
}

fn unexpected(outcome: TaskOutcome) -> AppError {
    AppError::invalid_data(format!("unexpected task outcome: {outcome:?}"))
}
