//! Run configuration.
//!
//! Command line flags, an optional TOML settings file, and built-in defaults
//! are resolved once into an immutable [`Config`].

use crate::cli::Cli;
use crate::digest::{Algorithm, BuiltinDigest, DigestProvider, SystemToolDigest};
use crate::max_age::{MaxAge, MaxAgeError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_DB_FILENAME: &str = "smart_checksums_db.json";
pub const DEFAULT_MAX_AGE: &str = "1m";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Target path does not exist or is not a directory: {0}")]
    InvalidTarget(PathBuf),
    #[error("Unknown checksum type {0:?} (use md5 or sha256)")]
    UnknownAlgorithm(String),
    #[error("Invalid max age: {0}")]
    MaxAge(#[from] MaxAgeError),
    #[error("Unknown digest backend {0:?} (use builtin or system)")]
    UnknownBackend(String),
    #[error("Cannot read settings file {path}: {source}")]
    SettingsIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid settings file {path}: {source}")]
    SettingsParse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Defaults read from a `--config` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub checksum: Option<String>,
    pub db: Option<String>,
    pub max_age: Option<String>,
    pub save_often: Option<bool>,
    pub digest_backend: Option<String>,
    #[serde(default)]
    pub tools: ToolSettings,
}

/// External binaries used by the `system` digest backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolSettings {
    pub md5: Option<String>,
    pub sha256: Option<String>,
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::SettingsIo {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&content).map_err(|source| ConfigError::SettingsParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestBackend {
    Builtin,
    System { md5_tool: String, sha256_tool: String },
}

impl DigestBackend {
    pub fn provider(&self) -> Box<dyn DigestProvider> {
        match self {
            DigestBackend::Builtin => Box::new(BuiltinDigest),
            DigestBackend::System {
                md5_tool,
                sha256_tool,
            } => Box::new(SystemToolDigest::new(md5_tool, sha256_tool)),
        }
    }
}

/// What a run does. Exactly one mode runs per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Compute missing baselines.
    Calculate,
    /// Verify against baselines, optionally followed by the last-OK report.
    Check { then_last_ok: bool },
    /// Only the last-OK report.
    LastOk,
    /// Only write the plain checksum file.
    ExportPlain,
}

impl Mode {
    pub fn from_flags(check: bool, lastok: bool, export: bool) -> Self {
        match (export, check, lastok) {
            (true, _, _) => Mode::ExportPlain,
            (_, true, then_last_ok) => Mode::Check { then_last_ok },
            (_, _, true) => Mode::LastOk,
            _ => Mode::Calculate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub target: PathBuf,
    pub db_path: PathBuf,
    pub algorithm: Algorithm,
    pub max_age: MaxAge,
    pub mode: Mode,
    pub force: bool,
    pub save_often: bool,
    pub backend: DigestBackend,
}

impl Config {
    /// Builds the run configuration from parsed flags.
    ///
    /// Validation happens here, before any file is touched.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let settings = match &cli.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };

        Self::resolve(cli, settings)
    }

    fn resolve(cli: &Cli, settings: Settings) -> Result<Self, ConfigError> {
        let algorithm_name = cli
            .checksum
            .clone()
            .or(settings.checksum)
            .unwrap_or_else(|| Algorithm::Md5.as_str().to_string());
        let algorithm = Algorithm::parse(&algorithm_name)
            .ok_or(ConfigError::UnknownAlgorithm(algorithm_name))?;

        let max_age: MaxAge = cli
            .max_age
            .as_deref()
            .or(settings.max_age.as_deref())
            .unwrap_or(DEFAULT_MAX_AGE)
            .parse()?;

        let backend_name = cli
            .digest_backend
            .clone()
            .or(settings.digest_backend)
            .unwrap_or_else(|| "builtin".to_string());
        let backend = match backend_name.as_str() {
            "builtin" => DigestBackend::Builtin,
            "system" => DigestBackend::System {
                md5_tool: settings
                    .tools
                    .md5
                    .unwrap_or_else(|| Algorithm::Md5.default_tool().to_string()),
                sha256_tool: settings
                    .tools
                    .sha256
                    .unwrap_or_else(|| Algorithm::Sha256.default_tool().to_string()),
            },
            _ => return Err(ConfigError::UnknownBackend(backend_name)),
        };

        if !cli.target.is_dir() {
            return Err(ConfigError::InvalidTarget(cli.target.clone()));
        }

        let db_name = cli
            .db
            .clone()
            .or(settings.db)
            .unwrap_or_else(|| DEFAULT_DB_FILENAME.to_string());

        Ok(Config {
            db_path: cli.target.join(db_name),
            target: cli.target.clone(),
            algorithm,
            max_age,
            mode: Mode::from_flags(cli.check, cli.lastok, cli.gen_plain_checksum_file),
            force: cli.force,
            save_often: cli.save_often || settings.save_often.unwrap_or(false),
            backend,
        })
    }
}
