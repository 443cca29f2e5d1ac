//! Configuration file discovery and merging with command-line flags
//!
//! Priority: command-line flags > config file > defaults.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use pylog_normalize::{
    DEFAULT_CARRY_LIMIT, DEFAULT_CHUNK_SIZE, MatchPolicy, NormalizerOptions, PumpOptions,
};
use pylog_render::{
    DEFAULT_TIME_FORMAT, PinoLevel, RenderOptions, is_valid_time_format, parse_key_list,
};

use crate::cli::Args;

/// File names looked for in the working directory and its parent
pub const CONFIG_FILE_NAMES: [&str; 2] = ["pylog-pretty.toml", ".pylog-prettyrc.toml"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read config file {}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config file {}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid minimum level '{0}' (expected trace, debug, info, warn, error, fatal or a number)")]
    InvalidLevel(String),

    #[error("invalid time format '{0}'")]
    InvalidTimeFormat(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// `translate-time = true` or `translate-time = "%H:%M"`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TranslateTime {
    Enabled(bool),
    Format(String),
}

/// Contents of a config file; every key is optional
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub raw: Option<bool>,
    pub first_match_only: Option<bool>,
    pub carry_limit: Option<usize>,
    pub chunk_size: Option<usize>,
    pub colorize: Option<bool>,
    pub crlf: Option<bool>,
    pub level_first: Option<bool>,
    pub minimum_level: Option<String>,
    pub message_key: Option<String>,
    pub level_key: Option<String>,
    pub timestamp_key: Option<String>,
    pub translate_time: Option<TranslateTime>,
    pub ignore: Option<String>,
    pub hide_object: Option<bool>,
    pub single_line: Option<bool>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Per-user config file (`~/.config/pylog-pretty/config.toml` on Linux)
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pylog-pretty").join("config.toml"))
}

/// Look for a config file in `start`, then its parent, then the user file
pub fn discover(start: &Path, user_config: Option<PathBuf>) -> Option<PathBuf> {
    let local = std::iter::once(start)
        .chain(start.parent())
        .flat_map(|dir| CONFIG_FILE_NAMES.into_iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file());

    local.or_else(|| user_config.filter(|path| path.is_file()))
}

/// Load the explicit config file, or a discovered one, or defaults
pub fn load(args: &Args) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => std::env::current_dir()
            .ok()
            .and_then(|cwd| discover(&cwd, user_config_path())),
    };

    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config file");
            Ok((FileConfig::from_file(&path)?, Some(path)))
        }
        None => Ok((FileConfig::default(), None)),
    }
}

/// Fully resolved runtime settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub raw: bool,
    pub normalizer: NormalizerOptions,
    pub pump: PumpOptions,
    pub render: RenderOptions,
}

impl Settings {
    /// Merge flags over file values over defaults
    pub fn resolve(
        args: &Args,
        file: FileConfig,
        stdout_is_terminal: bool,
    ) -> Result<Self, ConfigError> {
        let flag = |cli: bool, file: Option<bool>| cli || file.unwrap_or(false);

        let policy = if flag(args.first_match_only, file.first_match_only) {
            MatchPolicy::First
        } else {
            MatchPolicy::All
        };
        let normalizer = NormalizerOptions {
            policy,
            carry_limit: args
                .carry_limit
                .or(file.carry_limit)
                .unwrap_or(DEFAULT_CARRY_LIMIT),
        };

        let chunk_size = args
            .chunk_size
            .or(file.chunk_size)
            .unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size == 0 {
            return Err(ConfigError::Zero("chunk-size"));
        }

        let colorize = if args.colorize {
            true
        } else if args.no_colorize {
            false
        } else {
            file.colorize.unwrap_or(stdout_is_terminal)
        };

        let minimum_level = args
            .minimum_level
            .clone()
            .or(file.minimum_level)
            .map(|level| parse_minimum_level(&level))
            .transpose()?;

        let translate_time = match args.translate_time.clone() {
            Some(format) => Some(format),
            None => match file.translate_time {
                Some(TranslateTime::Enabled(true)) => Some(DEFAULT_TIME_FORMAT.to_string()),
                Some(TranslateTime::Enabled(false)) | None => None,
                Some(TranslateTime::Format(format)) => Some(format),
            },
        };
        if let Some(format) = &translate_time {
            if !is_valid_time_format(format) {
                return Err(ConfigError::InvalidTimeFormat(format.clone()));
            }
        }

        let defaults = RenderOptions::default();
        let render = RenderOptions {
            colorize,
            crlf: flag(args.crlf, file.crlf),
            level_first: flag(args.level_first, file.level_first),
            message_key: args
                .message_key
                .clone()
                .or(file.message_key)
                .unwrap_or(defaults.message_key),
            message_key_fallbacks: defaults.message_key_fallbacks,
            level_key: args
                .level_key
                .clone()
                .or(file.level_key)
                .unwrap_or(defaults.level_key),
            timestamp_key: args
                .timestamp_key
                .clone()
                .or(file.timestamp_key)
                .unwrap_or(defaults.timestamp_key),
            translate_time,
            ignore: args
                .ignore
                .clone()
                .or(file.ignore)
                .map(|keys| parse_key_list(&keys))
                .unwrap_or(defaults.ignore),
            hide_object: flag(args.hide_object, file.hide_object),
            single_line: flag(args.single_line, file.single_line),
            minimum_level,
        };

        Ok(Self {
            raw: flag(args.raw, file.raw),
            normalizer,
            pump: PumpOptions { chunk_size },
            render,
        })
    }
}

/// Accept a pino level name or any number
fn parse_minimum_level(level: &str) -> Result<u64, ConfigError> {
    level
        .trim()
        .parse::<u64>()
        .ok()
        .or_else(|| PinoLevel::parse(level).map(|l| l.value()))
        .ok_or_else(|| ConfigError::InvalidLevel(level.to_string()))
}
