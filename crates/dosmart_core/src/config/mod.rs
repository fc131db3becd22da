//! Client settings: where the backend lives, how long to wait for it and how
//! command-line output is colored.
//!
//! Lowest precedence first: built-in defaults, the JSON config file,
//! `DOSMART_API_BASE_URL`, then `--config-override` values.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR_NAME: &str = "dosmart";
const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "DOSMART_CONFIG_PATH";
const BASE_URL_ENV_VAR: &str = "DOSMART_API_BASE_URL";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:4000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const MUTED_INDEX: u8 = 250;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Plain,
    Noir,
    Solarized,
}

impl Theme {
    /// Case, spaces and punctuation are ignored. `light`, `vanilla` and
    /// unknown names all mean the plain theme.
    pub fn from_name(raw: &str) -> Self {
        let key: String = raw
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|ch| ch.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "noir" | "dark" | "darkmode" => Self::Noir,
            "solarized" => Self::Solarized,
            _ => Self::Plain,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Plain => "default",
            Self::Noir => "noir",
            Self::Solarized => "solarized",
        }
    }

    /// 256-color index for headings and highlights.
    pub fn accent_index(self) -> Option<u8> {
        match self {
            Self::Plain => None,
            Self::Noir => Some(208),
            Self::Solarized => Some(108),
        }
    }

    pub fn palette(self) -> Palette {
        let accent = self.accent_index();
        Palette {
            accent,
            muted: accent.map(|_| MUTED_INDEX),
        }
    }
}

/// ANSI coloring for command-line output. The plain palette leaves text alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Palette {
    accent: Option<u8>,
    muted: Option<u8>,
}

impl Palette {
    pub fn accentize(&self, text: &str) -> String {
        paint(self.accent, text)
    }

    pub fn mutedize(&self, text: &str) -> String {
        paint(self.muted, text)
    }
}

fn paint(color: Option<u8>, text: &str) -> String {
    match color {
        Some(index) => format!("\x1b[38;5;{index}m{text}\x1b[0m"),
        None => text.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub theme: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub mirror_tasks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            theme: None,
            request_timeout_secs: None,
            mirror_tasks: true,
        }
    }
}

/// Result of reading the config file. A broken file still yields defaults;
/// `warning` says what was wrong with it.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub warning: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub theme: Option<String>,
    pub api_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub mirror_tasks: Option<bool>,
}

impl Config {
    /// Reads the config file (missing is fine) and applies
    /// `DOSMART_API_BASE_URL`.
    pub fn load() -> LoadedConfig {
        let mut loaded = match app_file(CONFIG_ENV_VAR, CONFIG_FILE_NAME) {
            Ok(path) => read_or_default(&path),
            Err(err) => LoadedConfig {
                config: Config::default(),
                warning: Some(err),
            },
        };
        if let Ok(url) = std::env::var(BASE_URL_ENV_VAR) {
            loaded.config.set_base_url(&url);
        }
        loaded
    }

    pub fn with_overrides(&self, overrides: &ConfigOverrides) -> Self {
        let mut merged = self.clone();
        if let Some(url) = &overrides.api_base_url {
            merged.set_base_url(url);
        }
        merged.theme = overrides.theme.clone().or(merged.theme);
        merged.request_timeout_secs = overrides
            .request_timeout_secs
            .or(merged.request_timeout_secs);
        merged.mirror_tasks = overrides.mirror_tasks.unwrap_or(merged.mirror_tasks);
        merged
    }

    /// Trailing slashes are stripped so paths can be appended directly.
    pub fn api_base_url(&self) -> String {
        self.api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn request_timeout(&self) -> Duration {
        let secs = self
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    /// Never longer than the request timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.request_timeout()
            .min(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
    }

    pub fn theme(&self) -> Theme {
        self.theme.as_deref().map(Theme::from_name).unwrap_or_default()
    }

    pub fn palette(&self) -> Palette {
        self.theme().palette()
    }

    fn set_base_url(&mut self, raw: &str) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            self.api_base_url = Some(trimmed.to_string());
        }
    }
}

/// `env_var` when it is set, otherwise `<config dir>/dosmart/<file_name>`.
pub fn app_file(env_var: &str, file_name: &str) -> Result<PathBuf, AppError> {
    if let Some(path) = std::env::var_os(env_var).filter(|path| !path.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    let (base_var, nested) = if cfg!(windows) {
        ("APPDATA", None)
    } else {
        ("HOME", Some(".config"))
    };
    let mut dir = std::env::var_os(base_var)
        .map(PathBuf::from)
        .ok_or_else(|| AppError::invalid_data(format!("{base_var} is not set")))?;
    if let Some(nested) = nested {
        dir.push(nested);
    }
    Ok(dir.join(APP_DIR_NAME).join(file_name))
}

fn read_or_default(path: &Path) -> LoadedConfig {
    match read_config(path) {
        Ok(config) => LoadedConfig {
            config: config.unwrap_or_default(),
            warning: None,
        },
        Err(err) => LoadedConfig {
            config: Config::default(),
            warning: Some(err),
        },
    }
}

fn read_config(path: &Path) -> Result<Option<Config>, AppError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(AppError::io(format!("cannot read {}: {err}", path.display())));
        }
    };
    serde_json::from_str(&content).map(Some).map_err(|err| {
        AppError::invalid_data(format!("{} is not a valid config: {err}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigOverrides, DEFAULT_API_BASE_URL, Theme, read_config, read_or_default};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("dosmart-{nanos}-{file_name}"))
    }

    #[test]
    fn missing_file_means_defaults() {
        let loaded = read_or_default(&temp_path("absent.json"));

        assert_eq!(loaded.config, Config::default());
        assert!(loaded.warning.is_none());
    }

    #[test]
    fn broken_file_falls_back_with_warning() {
        let path = temp_path("broken.json");
        fs::write(&path, "{ \"theme\": ").unwrap();

        let loaded = read_or_default(&path);
        fs::remove_file(&path).ok();

        assert_eq!(loaded.config, Config::default());
        assert_eq!(loaded.warning.map(|err| err.code()), Some("invalid_data"));
    }

    #[test]
    fn file_values_are_read() {
        let path = temp_path("tasks-config.json");
        let content = serde_json::json!({
            "api_base_url": "https://tasks.example.com/api/",
            "theme": "Dark Mode",
            "request_timeout_secs": 5,
            "mirror_tasks": false
        });
        fs::write(&path, content.to_string()).unwrap();

        let config = read_config(&path).unwrap().unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.theme(), Theme::Noir);
        assert_eq!(config.api_base_url(), "https://tasks.example.com/api");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert!(!config.mirror_tasks);
    }

    #[test]
    fn partial_file_keeps_mirroring_on() {
        let config: Config = serde_json::from_str(r#"{"theme":"solarized"}"#).unwrap();

        assert!(config.mirror_tasks);
        assert_eq!(config.api_base_url(), DEFAULT_API_BASE_URL);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn overrides_win_and_blank_url_is_ignored() {
        let base = Config {
            api_base_url: Some("http://file".into()),
            theme: Some("light".into()),
            request_timeout_secs: Some(20),
            ..Config::default()
        };

        let merged = base.with_overrides(&ConfigOverrides {
            theme: Some("noir".into()),
            api_base_url: Some("  ".into()),
            request_timeout_secs: None,
            mirror_tasks: Some(false),
        });

        assert_eq!(merged.theme(), Theme::Noir);
        assert_eq!(merged.api_base_url(), "http://file");
        assert_eq!(merged.request_timeout(), Duration::from_secs(20));
        assert!(!merged.mirror_tasks);
        assert_eq!(base.with_overrides(&ConfigOverrides::default()), base);
    }

    #[test]
    fn theme_aliases() {
        assert_eq!(Theme::from_name("Vanilla"), Theme::Plain);
        assert_eq!(Theme::from_name("light"), Theme::Plain);
        assert_eq!(Theme::from_name("dark-mode"), Theme::Noir);
        assert_eq!(Theme::from_name(" Solarized "), Theme::Solarized);
        assert_eq!(Theme::from_name("oceanic").name(), "default");
    }

    #[test]
    fn palette_paints_only_for_colored_themes() {
        assert_eq!(Theme::Plain.palette().accentize("Upcoming"), "Upcoming");
        assert_eq!(
            Theme::Noir.palette().accentize("Upcoming"),
            "\x1b[38;5;208mUpcoming\x1b[0m"
        );
        assert_eq!(Theme::Solarized.palette().mutedize("(2)"), "\x1b[38;5;250m(2)\x1b[0m");
    }
}
