//! Board state and key handling. Nothing here touches the network: keys and
//! completed requests go in, [`Effect`]s (requests to run) come out.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use dosmart_core::board::{Board, Bucket, categorize, plan_move};
use dosmart_core::error::AppError;
use dosmart_core::form::{CustomTaskForm, TaskEditForm, local_offset, quick_task};
use dosmart_core::model::{Credentials, Task, TaskStatus};
use dosmart_core::session_store::{SessionRequest, SessionStore, SessionTicket};
use dosmart_core::task_store::{TaskOutcome, TaskRequest, TaskStore, TaskTicket};
use time::OffsetDateTime;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Signup,
    Board,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    Username,
    Password,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Buckets,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomModal {
    pub form: CustomTaskForm,
    pub field: usize,
}

impl CustomModal {
    pub const LABELS: [&'static str; 5] = [
        "Title",
        "Description",
        "Start date (YYYY-MM-DD)",
        "Start time (HH:MM)",
        "Deadline (YYYY-MM-DD HH:MM)",
    ];

    fn field_mut(&mut self) -> &mut String {
        match self.field {
            0 => &mut self.form.title,
            1 => &mut self.form.description,
            2 => &mut self.form.start_date,
            3 => &mut self.form.start_time,
            _ => &mut self.form.deadline,
        }
    }

    pub fn values(&self) -> [&str; 5] {
        [
            &self.form.title,
            &self.form.description,
            &self.form.start_date,
            &self.form.start_time,
            &self.form.deadline,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditModal {
    pub task_id: String,
    pub form: TaskEditForm,
    pub field: usize,
}

impl EditModal {
    pub const LABELS: [&'static str; 4] = ["Title", "Description", "Status", "Deadline"];
    const STATUS_FIELD: usize = 2;

    fn text_field_mut(&mut self) -> Option<&mut String> {
        match self.field {
            0 => Some(&mut self.form.title),
            1 => Some(&mut self.form.description),
            3 => Some(&mut self.form.deadline),
            _ => None,
        }
    }

    fn cycle_status(&mut self, forward: bool) {
        let all = TaskStatus::ALL;
        let current = all
            .iter()
            .position(|status| *status == self.form.status)
            .unwrap_or(0);
        let next = if forward {
            (current + 1) % all.len()
        } else {
            (current + all.len() - 1) % all.len()
        };
        self.form.status = all[next];
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modal {
    Custom(CustomModal),
    Edit(EditModal),
}

/// Remote work the event loop should start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Session {
        ticket: SessionTicket,
        request: SessionRequest,
    },
    Tasks {
        ticket: TaskTicket,
        request: TaskRequest,
        token: String,
    },
}

/// Completed remote work, sent back to the event loop.
#[derive(Debug)]
pub enum AppEvent {
    Session {
        ticket: SessionTicket,
        outcome: Result<Credentials, AppError>,
    },
    Tasks {
        ticket: TaskTicket,
        outcome: Result<TaskOutcome, AppError>,
    },
}

pub struct App {
    pub screen: Screen,
    pub auth_field: AuthField,
    pub username_input: String,
    pub password_input: String,
    pub focus: Focus,
    pub quick_input: String,
    pub selected_bucket: Bucket,
    pub selected_index: usize,
    /// Card picked up with Space, with the bucket it came from.
    pub carrying: Option<(String, Bucket)>,
    pub modal: Option<Modal>,
    pub error_message: Option<String>,
    pub should_quit: bool,
    session: SessionStore,
    tasks: TaskStore,
}

impl App {
    pub fn new(session: SessionStore, tasks: TaskStore) -> Self {
        Self {
            screen: Screen::Login,
            auth_field: AuthField::Username,
            username_input: String::new(),
            password_input: String::new(),
            focus: Focus::Input,
            quick_input: String::new(),
            selected_bucket: Bucket::Upcoming,
            selected_index: 0,
            carrying: None,
            modal: None,
            error_message: None,
            should_quit: false,
            session,
            tasks,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_busy() || self.tasks.is_loading()
    }

    pub fn board(&self) -> Board {
        categorize(self.tasks.tasks(), OffsetDateTime::now_utc())
    }

    pub fn selected_task(&self) -> Option<Task> {
        let board = self.board();
        let column = board.column(self.selected_bucket);
        column
            .get(self.selected_index.min(column.len().saturating_sub(1)))
            .cloned()
    }

    /// With a stored session the board opens right away while the token is
    /// checked in the background.
    pub fn start(&mut self) -> Vec<Effect> {
        if self.session.token().is_none() {
            return Vec::new();
        }
        self.screen = Screen::Board;

        let mut effects = Vec::new();
        match self.session.revalidation_request() {
            Ok(request) => effects.extend(self.begin_session(request)),
            Err(err) => self.show_error(&err),
        }
        effects.extend(self.begin_tasks(TaskRequest::Load));
        effects
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return Vec::new();
        }
        if self.error_message.take().is_some() {
            return Vec::new();
        }

        match self.screen {
            Screen::Login | Screen::Signup => self.handle_auth_key(key),
            Screen::Board if self.modal.is_some() => self.handle_modal_key(key),
            Screen::Board => match self.focus {
                Focus::Input => self.handle_input_key(key),
                Focus::Buckets => self.handle_bucket_key(key),
            },
        }
    }

    pub fn apply(&mut self, event: AppEvent) -> Vec<Effect> {
        match event {
            AppEvent::Session { ticket, outcome } => self.apply_session(ticket, outcome),
            AppEvent::Tasks { ticket, outcome } => {
                self.apply_tasks(ticket, outcome);
                Vec::new()
            }
        }
    }

    fn apply_session(
        &mut self,
        ticket: SessionTicket,
        outcome: Result<Credentials, AppError>,
    ) -> Vec<Effect> {
        let was_on_board = self.screen == Screen::Board;
        match self.session.complete(ticket, outcome) {
            Ok(Some(_)) if was_on_board => Vec::new(),
            Ok(Some(_)) => {
                self.screen = Screen::Board;
                self.focus = Focus::Input;
                self.password_input.clear();
                self.tasks.reset();
                self.begin_tasks(TaskRequest::Load)
            }
            Ok(None) => Vec::new(),
            Err(err) => {
                if !self.session.state().is_authenticated {
                    self.leave_board();
                }
                self.show_error(&err);
                Vec::new()
            }
        }
    }

    fn apply_tasks(&mut self, ticket: TaskTicket, outcome: Result<TaskOutcome, AppError>) {
        match self.tasks.complete(ticket, outcome) {
            Ok(Some(TaskOutcome::Created(_))) => match self.modal {
                Some(Modal::Custom(_)) => self.modal = None,
                _ => self.quick_input.clear(),
            },
            Ok(Some(TaskOutcome::Updated(task))) => {
                if matches!(&self.modal, Some(Modal::Edit(edit)) if edit.task_id == task.id) {
                    self.modal = None;
                }
            }
            Ok(_) => {}
            Err(err) => self.show_error(&err),
        }
    }

    fn show_error(&mut self, err: &AppError) {
        self.error_message = Some(err.message().to_string());
    }

    fn begin_session(&mut self, request: SessionRequest) -> Option<Effect> {
        match self.session.begin(&request) {
            Ok(ticket) => Some(Effect::Session { ticket, request }),
            Err(err) => {
                self.show_error(&err);
                None
            }
        }
    }

    fn begin_tasks(&mut self, request: TaskRequest) -> Vec<Effect> {
        let Some(token) = self.session.token().map(str::to_string) else {
            self.show_error(&AppError::not_logged_in());
            return Vec::new();
        };
        match self.tasks.begin(&request) {
            Ok(ticket) => vec![Effect::Tasks {
                ticket,
                request,
                token,
            }],
            Err(err) => {
                self.show_error(&err);
                Vec::new()
            }
        }
    }

    fn leave_board(&mut self) {
        self.tasks.reset();
        self.screen = Screen::Login;
        self.auth_field = AuthField::Username;
        self.password_input.clear();
        self.quick_input.clear();
        self.carrying = None;
        self.modal = None;
        self.focus = Focus::Input;
        self.selected_index = 0;
    }

    fn logout(&mut self) {
        if let Err(err) = self.session.logout() {
            self.show_error(&err);
        }
        self.username_input.clear();
        self.leave_board();
        debug!("logged out from the board");
    }

    fn handle_auth_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.auth_field = match self.auth_field {
                    AuthField::Username => AuthField::Password,
                    AuthField::Password => AuthField::Username,
                };
            }
            KeyCode::F(2) => {
                self.screen = match self.screen {
                    Screen::Login => Screen::Signup,
                    _ => Screen::Login,
                };
            }
            KeyCode::Enter => {
                let username = self.username_input.clone();
                let password = self.password_input.clone();
                let request = match self.screen {
                    Screen::Signup => SessionRequest::Signup { username, password },
                    _ => SessionRequest::Login { username, password },
                };
                return self.begin_session(request).into_iter().collect();
            }
            KeyCode::Backspace => {
                self.auth_input_mut().pop();
            }
            KeyCode::Char(ch) => self.auth_input_mut().push(ch),
            _ => {}
        }
        Vec::new()
    }

    fn auth_input_mut(&mut self) -> &mut String {
        match self.auth_field {
            AuthField::Username => &mut self.username_input,
            AuthField::Password => &mut self.password_input,
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        match key.code {
            KeyCode::Tab | KeyCode::Esc => self.focus = Focus::Buckets,
            KeyCode::Enter => match quick_task(&self.quick_input) {
                Ok(input) => return self.begin_tasks(TaskRequest::Create(input)),
                Err(err) => self.show_error(&err),
            },
            KeyCode::Backspace => {
                self.quick_input.pop();
            }
            KeyCode::Char(ch) => self.quick_input.push(ch),
            _ => {}
        }
        Vec::new()
    }

    fn handle_bucket_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        match key.code {
            KeyCode::Tab => self.focus = Focus::Input,
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => self.carrying = None,
            KeyCode::Left => self.select_bucket(-1),
            KeyCode::Right => self.select_bucket(1),
            KeyCode::Up => self.selected_index = self.selected_index.saturating_sub(1),
            KeyCode::Down => {
                let len = self.board().column(self.selected_bucket).len();
                if self.selected_index + 1 < len {
                    self.selected_index += 1;
                }
            }
            KeyCode::Char(' ') => return self.pick_up_or_drop(),
            KeyCode::Char('c') => {
                self.modal = Some(Modal::Custom(CustomModal {
                    form: CustomTaskForm::default(),
                    field: 0,
                }));
            }
            KeyCode::Char('e') => {
                if let Some(task) = self.selected_task() {
                    self.modal = Some(Modal::Edit(EditModal {
                        task_id: task.id.clone(),
                        form: TaskEditForm::from_task(&task),
                        field: 0,
                    }));
                }
            }
            KeyCode::Char('d') => {
                if let Some(task) = self.selected_task() {
                    return self.begin_tasks(TaskRequest::Remove { id: task.id });
                }
            }
            KeyCode::Char('r') => return self.begin_tasks(TaskRequest::Load),
            KeyCode::Char('L') => self.logout(),
            _ => {}
        }
        Vec::new()
    }

    fn select_bucket(&mut self, step: isize) {
        let count = Bucket::ALL.len() as isize;
        let next = (self.selected_bucket.index() as isize + step).rem_euclid(count);
        self.selected_bucket = Bucket::ALL[next as usize];
        self.selected_index = 0;
    }

    fn pick_up_or_drop(&mut self) -> Vec<Effect> {
        match self.carrying.take() {
            None => {
                if let Some(task) = self.selected_task() {
                    self.carrying = Some((task.id, self.selected_bucket));
                }
                Vec::new()
            }
            Some((task_id, source)) => {
                match plan_move(self.tasks.tasks(), &task_id, source, self.selected_bucket) {
                    Some(change) => self.begin_tasks(TaskRequest::UpdateStatus {
                        id: change.task_id,
                        status: change.status,
                    }),
                    None => Vec::new(),
                }
            }
        }
    }

    fn handle_modal_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        if key.code == KeyCode::Esc {
            self.modal = None;
            return Vec::new();
        }
        if key.code == KeyCode::Enter {
            return self.submit_modal();
        }

        match &mut self.modal {
            Some(Modal::Custom(custom)) => match key.code {
                KeyCode::Tab | KeyCode::Down => {
                    custom.field = (custom.field + 1) % CustomModal::LABELS.len();
                }
                KeyCode::BackTab | KeyCode::Up => {
                    custom.field =
                        (custom.field + CustomModal::LABELS.len() - 1) % CustomModal::LABELS.len();
                }
                KeyCode::Backspace => {
                    custom.field_mut().pop();
                }
                KeyCode::Char(ch) => custom.field_mut().push(ch),
                _ => {}
            },
            Some(Modal::Edit(edit)) => match key.code {
                KeyCode::Tab | KeyCode::Down => {
                    edit.field = (edit.field + 1) % EditModal::LABELS.len();
                }
                KeyCode::BackTab | KeyCode::Up => {
                    let count = EditModal::LABELS.len();
                    edit.field = (edit.field + count - 1) % count;
                }
                KeyCode::Left if edit.field == EditModal::STATUS_FIELD => edit.cycle_status(false),
                KeyCode::Right | KeyCode::Char(' ') if edit.field == EditModal::STATUS_FIELD => {
                    edit.cycle_status(true)
                }
                KeyCode::Backspace => {
                    if let Some(value) = edit.text_field_mut() {
                        value.pop();
                    }
                }
                KeyCode::Char(ch) => {
                    if let Some(value) = edit.text_field_mut() {
                        value.push(ch);
                    }
                }
                _ => {}
            },
            None => {}
        }
        Vec::new()
    }

    fn submit_modal(&mut self) -> Vec<Effect> {
        let request = match &self.modal {
            Some(Modal::Custom(custom)) => custom
                .form
                .validate(local_offset())
                .map(TaskRequest::Create),
            Some(Modal::Edit(edit)) => edit
                .form
                .validate(local_offset())
                .map(|fields| TaskRequest::Update {
                    id: edit.task_id.clone(),
                    fields,
                }),
            None => return Vec::new(),
        };
        match request {
            Ok(request) => self.begin_tasks(request),
            Err(err) => {
                self.show_error(&err);
                Vec::new()
            }
        }
    }
}
