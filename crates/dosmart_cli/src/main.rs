use clap::Parser;
use clap::error::ErrorKind;
use dosmart_cli::cli::{CONFIG_OVERRIDE_FLAG, Cli, Command, collect_config_overrides};
use dosmart_cli::{logging, tui};
use dosmart_core::api::HttpGateway;
use dosmart_core::board::{Board, Bucket, bucket_of, categorize};
use dosmart_core::config::{Config, Palette};
use dosmart_core::error::AppError;
use dosmart_core::form::{
    CustomTaskForm, local_offset, parse_datetime, quick_task, to_utc_string,
};
use dosmart_core::model::{Task, TaskStatus, TaskUpdate};
use dosmart_core::session_store::SessionStore;
use dosmart_core::storage::{JsonFileStore, SharedStore, stored_tasks};
use dosmart_core::task_store::TaskStore;
use std::sync::Arc;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use time::OffsetDateTime;
use tracing::{debug, warn};

struct Context {
    config: Config,
    palette: Palette,
    storage: SharedStore,
    gateway: Arc<HttpGateway>,
    json: bool,
}

impl Context {
    fn gateway(&self) -> &HttpGateway {
        &self.gateway
    }

    fn session(&self) -> Result<SessionStore, AppError> {
        SessionStore::restore(self.storage.clone())
    }

    fn token(&self) -> Result<String, AppError> {
        self.session()?
            .token()
            .map(str::to_string)
            .ok_or_else(AppError::not_logged_in)
    }

    fn task_store(&self) -> TaskStore {
        if self.config.mirror_tasks {
            TaskStore::with_mirror(self.storage.clone())
        } else {
            TaskStore::new()
        }
    }
}

#[derive(Tabled)]
struct TaskRow<'a> {
    #[tabled(rename = "ID")]
    id: &'a str,
    #[tabled(rename = "Title")]
    title: &'a str,
    #[tabled(rename = "Start")]
    start_time: &'a str,
    #[tabled(rename = "Deadline")]
    deadline: &'a str,
    #[tabled(rename = "Status")]
    status: &'static str,
}

impl<'a> From<&'a Task> for TaskRow<'a> {
    fn from(task: &'a Task) -> Self {
        Self {
            id: &task.id,
            title: &task.title,
            start_time: &task.start_time,
            deadline: &task.deadline,
            status: task.status.label(),
        }
    }
}

fn print_task(ctx: &Context, verb: &str, task: &Task) -> Result<(), AppError> {
    if ctx.json {
        print_json(task)
    } else {
        println!(
            "{verb} task: {} ({}) {}",
            task.title,
            task.id,
            ctx.palette.mutedize(task.status.label())
        );
        Ok(())
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let rendered =
        serde_json::to_string(value).map_err(|err| AppError::invalid_data(err.to_string()))?;
    println!("{rendered}");
    Ok(())
}

fn print_board(ctx: &Context, board: &Board, only: Option<Bucket>) -> Result<(), AppError> {
    let buckets: Vec<Bucket> = match only {
        Some(bucket) => vec![bucket],
        None => Bucket::ALL.to_vec(),
    };

    if ctx.json {
        return match only {
            Some(bucket) => print_json(board.column(bucket)),
            None => {
                let mut payload = serde_json::Map::new();
                for bucket in buckets {
                    let tasks = serde_json::to_value(board.column(bucket))
                        .map_err(|err| AppError::invalid_data(err.to_string()))?;
                    payload.insert(bucket.id().to_string(), tasks);
                }
                print_json(&payload)
            }
        };
    }

    for bucket in buckets {
        let column = board.column(bucket);
        println!(
            "{} {}",
            ctx.palette.accentize(bucket.title()),
            ctx.palette.mutedize(&format!("({})", column.len()))
        );
        if column.is_empty() {
            println!("  -");
        } else {
            let rows: Vec<TaskRow<'_>> = column.iter().map(TaskRow::from).collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
    }
    Ok(())
}

/// Falls back to the mirrored board when the server cannot be reached.
/// Any other failure, or an empty mirror slot, is returned as is.
fn cached_tasks(ctx: &Context, err: AppError) -> Result<Vec<Task>, AppError> {
    if err.code() != "transport_error" || !ctx.config.mirror_tasks {
        return Err(err);
    }
    let Some(tasks) = stored_tasks(ctx.storage.as_ref())? else {
        return Err(err);
    };
    debug!(error = %err, cached = tasks.len(), "showing mirrored tasks");
    eprintln!("{}", ctx.palette.mutedize(&format!("cached: {}", err.message())));
    Ok(tasks)
}

fn resolve_password(password: Option<String>) -> Result<String, AppError> {
    match password {
        Some(value) => Ok(value),
        None => rpassword::prompt_password("Password: ")
            .map_err(|err| AppError::io(format!("could not read password: {err}"))),
    }
}

fn build_update(
    title: Option<String>,
    description: Option<String>,
    clear_description: bool,
    deadline: Option<String>,
    status: Option<TaskStatus>,
) -> Result<TaskUpdate, AppError> {
    let title = match title {
        Some(value) if value.trim().is_empty() => {
            return Err(AppError::invalid_input("title cannot be blank"));
        }
        Some(value) => Some(value.trim().to_string()),
        None => None,
    };
    let description = if clear_description {
        Some(None)
    } else {
        description.map(|value| match value.trim() {
            "" => None,
            trimmed => Some(trimmed.to_string()),
        })
    };
    let deadline = deadline
        .map(|raw| parse_datetime(&raw, local_offset()).and_then(to_utc_string))
        .transpose()?;

    let update = TaskUpdate {
        title,
        description,
        start_time: None,
        deadline,
        status,
    };
    if update.is_empty() {
        return Err(AppError::invalid_input("nothing to edit"));
    }
    Ok(update)
}

fn build_context(cli: &Cli) -> Result<Context, AppError> {
    let loaded = Config::load();
    if let Some(err) = loaded.warning {
        warn!(error = %err, "using default configuration");
    }
    let overrides = collect_config_overrides(&cli.config_override)
        .map_err(|err| AppError::invalid_input(format!("{CONFIG_OVERRIDE_FLAG}: {err}")))?;
    let config = loaded.config.with_overrides(&overrides);

    let store = JsonFileStore::from_env()?;
    let gateway = Arc::new(HttpGateway::from_config(&config)?);
    debug!(
        store = %store.path().display(),
        api = gateway.base_url(),
        theme = config.theme().name(),
        "context ready"
    );
    let storage: SharedStore = Arc::new(store);
    Ok(Context {
        palette: config.palette(),
        config,
        storage,
        gateway,
        json: cli.json,
    })
}

async fn run_command(ctx: &Context, command: Command) -> Result<(), AppError> {
    match command {
        Command::Login { username, password } => {
            let password = resolve_password(password)?;
            let credentials = ctx
                .session()?
                .login(ctx.gateway(), &username, &password)
                .await?;
            if ctx.json {
                print_json(&serde_json::json!({ "username": credentials.username }))?;
            } else {
                println!("Logged in as {}", ctx.palette.accentize(&credentials.username));
            }
        }
        Command::Signup { username, password } => {
            let password = resolve_password(password)?;
            let credentials = ctx
                .session()?
                .signup(ctx.gateway(), &username, &password)
                .await?;
            if ctx.json {
                print_json(&serde_json::json!({ "username": credentials.username }))?;
            } else {
                println!(
                    "Signed up and logged in as {}",
                    ctx.palette.accentize(&credentials.username)
                );
            }
        }
        Command::Logout => {
            SessionStore::new(ctx.storage.clone()).logout()?;
            if ctx.json {
                print_json(&serde_json::json!({ "logged_out": true }))?;
            } else {
                println!("Logged out");
            }
        }
        Command::Whoami => {
            let credentials = ctx.session()?.fetch_current_user(ctx.gateway()).await?;
            if ctx.json {
                print_json(&serde_json::json!({ "username": credentials.username }))?;
            } else if credentials.username.is_empty() {
                println!("Logged in");
            } else {
                println!("Logged in as {}", ctx.palette.accentize(&credentials.username));
            }
        }
        Command::List { bucket } => {
            let token = ctx.token()?;
            let mut store = ctx.task_store();
            let tasks = match store.load(ctx.gateway(), &token).await {
                Ok(tasks) => tasks,
                Err(err) => cached_tasks(ctx, err)?,
            };
            let board = categorize(&tasks, OffsetDateTime::now_utc());
            print_board(ctx, &board, bucket)?;
        }
        Command::Add { text } => {
            let input = quick_task(&text)?;
            let token = ctx.token()?;
            let task = ctx.task_store().create(ctx.gateway(), &token, input).await?;
            print_task(ctx, "Added", &task)?;
        }
        Command::Create {
            title,
            description,
            start_date,
            start_time,
            deadline,
        } => {
            let form = CustomTaskForm {
                title,
                description,
                start_date,
                start_time,
                deadline,
            };
            let input = form.validate(local_offset())?;
            let token = ctx.token()?;
            let task = ctx.task_store().create(ctx.gateway(), &token, input).await?;
            print_task(ctx, "Created", &task)?;
        }
        Command::Edit {
            id,
            title,
            description,
            clear_description,
            deadline,
            status,
        } => {
            let fields = build_update(title, description, clear_description, deadline, status)?;
            let token = ctx.token()?;
            let task = ctx
                .task_store()
                .update(ctx.gateway(), &token, &id, fields)
                .await?;
            print_task(ctx, "Updated", &task)?;
        }
        Command::Move { id, bucket } => {
            let token = ctx.token()?;
            let mut store = ctx.task_store();
            store.load(ctx.gateway(), &token).await?;
            let (source, status) = store
                .task(&id)
                .map(|task| (bucket_of(task, OffsetDateTime::now_utc()), task.status))
                .ok_or_else(|| AppError::invalid_input(format!("task {id} not found")))?;
            let moved = match source {
                Some(source) => {
                    store
                        .move_task(ctx.gateway(), &token, &id, source, bucket)
                        .await?
                }
                None if status != bucket.status() => Some(
                    store
                        .update_status(ctx.gateway(), &token, &id, bucket.status())
                        .await?,
                ),
                None => None,
            };
            match moved {
                Some(task) => print_task(ctx, "Moved", &task)?,
                None if ctx.json => print_json(&store.task(&id))?,
                None => println!("Task {id} is already in {}", bucket.title()),
            }
        }
        Command::Status { id, status } => {
            let token = ctx.token()?;
            let task = ctx
                .task_store()
                .update_status(ctx.gateway(), &token, &id, status)
                .await?;
            print_task(ctx, "Updated", &task)?;
        }
        Command::Delete { id } => {
            let token = ctx.token()?;
            ctx.task_store().remove(ctx.gateway(), &token, &id).await?;
            if ctx.json {
                print_json(&serde_json::json!({ "deleted": id }))?;
            } else {
                println!("Deleted task: {id}");
            }
        }
        Command::Board => {
            tui::run(ctx.config.clone(), ctx.storage.clone(), ctx.gateway.clone()).await?;
        }
    }

    Ok(())
}

fn exit_with(err: AppError) -> ! {
    eprintln!("ERROR: {err}");
    std::process::exit(1);
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

#[tokio::main]
async fn main() {
    let mut cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => exit_with(normalize_parse_error(err)),
    };

    let command = cli.command.take().unwrap_or(Command::Board);
    if matches!(command, Command::Board) {
        logging::init_for_board();
    } else {
        logging::init_stderr();
    }

    let ctx = match build_context(&cli) {
        Ok(ctx) => ctx,
        Err(err) => exit_with(err),
    };

    if let Err(err) = run_command(&ctx, command).await {
        exit_with(err);
    }
}
