use clap::{Parser, Subcommand};
use dosmart_core::board::Bucket;
use dosmart_core::config::ConfigOverrides;
use dosmart_core::model::TaskStatus;
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(author, version, about = "Do Smart task board client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and remember the session
    ///
    /// Example: dosmart login -u ada
    Login {
        #[arg(short = 'u', long)]
        username: String,
        /// Read from DOSMART_PASSWORD or prompted when omitted
        #[arg(long, env = "DOSMART_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account, then log in with it
    ///
    /// Example: dosmart signup -u ada
    Signup {
        #[arg(short = 'u', long)]
        username: String,
        #[arg(long, env = "DOSMART_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Check the stored session against the server
    Whoami,
    /// List tasks grouped by bucket
    ///
    /// Example: dosmart list
    /// Example: dosmart list --bucket ongoing
    List {
        #[arg(long, value_parser = parse_bucket)]
        bucket: Option<Bucket>,
    },
    /// Quick-add a task from free text
    ///
    /// Example: dosmart add "Buy milk"
    Add { text: String },
    /// Create a task with every field spelled out
    ///
    /// Example: dosmart create --title Report --description "Q3 numbers"
    ///          --start-date 2025-06-01 --start-time 09:00 --deadline "2025-06-01 17:00"
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        start_date: String,
        #[arg(long)]
        start_time: String,
        #[arg(long)]
        deadline: String,
    },
    /// Edit fields of a task
    ///
    /// Example: dosmart edit 42 --title "Buy oat milk" --clear-description
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long, value_parser = parse_status)]
        status: Option<TaskStatus>,
    },
    /// Move a task to another bucket
    ///
    /// Example: dosmart move 42 success
    Move {
        id: String,
        #[arg(value_parser = parse_bucket)]
        bucket: Bucket,
    },
    /// Set a task's status directly
    ///
    /// Example: dosmart status 42 "Ongoing Task"
    Status {
        id: String,
        #[arg(value_parser = parse_status)]
        status: TaskStatus,
    },
    /// Delete a task
    ///
    /// Example: dosmart delete 42
    Delete { id: String },
    /// Open the full-screen board
    Board,
}

fn parse_bucket(raw: &str) -> Result<Bucket, String> {
    raw.parse()
}

fn parse_status(raw: &str) -> Result<TaskStatus, String> {
    raw.parse()
}

pub const CONFIG_OVERRIDE_FLAG: &str = "--config-override";

/// Config field named on the left of a `--config-override` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideKey {
    Theme,
    ApiBaseUrl,
    RequestTimeout,
    MirrorTasks,
}

impl FromStr for OverrideKey {
    type Err = String;

    /// Case and separators are ignored, so `API-Base-URL` and `api_base_url`
    /// name the same field.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let folded: String = raw
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|ch| ch.to_ascii_lowercase())
            .collect();
        match folded.as_str() {
            "theme" => Ok(Self::Theme),
            "apibaseurl" | "baseurl" | "apiurl" => Ok(Self::ApiBaseUrl),
            "requesttimeoutsecs" | "requesttimeout" | "timeout" => Ok(Self::RequestTimeout),
            "mirrortasks" | "mirror" => Ok(Self::MirrorTasks),
            "" => Err("override key cannot be empty".to_string()),
            _ => Err(format!("unknown config field '{}'", raw.trim())),
        }
    }
}

/// Folds every `--config-override` value into one override set. Later values win.
pub fn collect_config_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    raw.iter()
        .try_fold(ConfigOverrides::default(), |mut overrides, entry| {
            apply_override(&mut overrides, entry)?;
            Ok(overrides)
        })
}

fn apply_override(overrides: &mut ConfigOverrides, entry: &str) -> Result<(), String> {
    let (key, value) = entry
        .split_once('=')
        .ok_or_else(|| format!("'{}' is not a KEY=VALUE pair", entry.trim()))?;
    let value = value.trim();

    match key.parse::<OverrideKey>()? {
        OverrideKey::Theme => overrides.theme = Some(value.to_string()),
        OverrideKey::ApiBaseUrl if value.is_empty() => {
            return Err("api_base_url override cannot be empty".to_string());
        }
        OverrideKey::ApiBaseUrl => overrides.api_base_url = Some(value.to_string()),
        OverrideKey::RequestTimeout => {
            let secs = value
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    format!("request_timeout_secs must be a positive number, got '{value}'")
                })?;
            overrides.request_timeout_secs = Some(secs);
        }
        OverrideKey::MirrorTasks => overrides.mirror_tasks = Some(parse_switch(value)?),
    }
    Ok(())
}

fn parse_switch(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(format!("expected true or false, got '{raw}'")),
    }
}
