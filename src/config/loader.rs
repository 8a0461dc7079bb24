use crate::config::schema::{EditScript, ValidationError};
use crate::config::settings::{EditorSettings, SettingsError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: InvalidConfig,
    },
}

/// Validation failure of either settings or an edit script.
#[derive(Debug, Clone)]
pub enum InvalidConfig {
    Settings(SettingsError),
    Script(ValidationError),
}

impl fmt::Display for InvalidConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidConfig::Settings(e) => write!(f, "{e}"),
            InvalidConfig::Script(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for InvalidConfig {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InvalidConfig::Settings(e) => Some(e),
            InvalidConfig::Script(e) => Some(e),
        }
    }
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Io { .. } => self,
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(f, "failed to parse TOML ({}): {}", path.display(), source),
                None => write!(f, "failed to parse TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid configuration ({}): {}", path.display(), source),
                None => write!(f, "invalid configuration: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

pub fn load_settings_from_str(input: &str) -> Result<EditorSettings, ConfigError> {
    let settings: EditorSettings = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    settings.validate().map_err(|e| ConfigError::Validation {
        path: None,
        source: InvalidConfig::Settings(e),
    })?;
    Ok(settings)
}

pub fn load_settings_from_path(path: impl AsRef<Path>) -> Result<EditorSettings, ConfigError> {
    let path = path.as_ref();
    let contents = read(path)?;
    load_settings_from_str(&contents).map_err(|error| error.with_path(path))
}

pub fn load_script_from_str(input: &str) -> Result<EditScript, ConfigError> {
    let script: EditScript = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    script.validate().map_err(|e| ConfigError::Validation {
        path: None,
        source: InvalidConfig::Script(e),
    })?;
    Ok(script)
}

pub fn load_script_from_path(path: impl AsRef<Path>) -> Result<EditScript, ConfigError> {
    let path = path.as_ref();
    let contents = read(path)?;
    load_script_from_str(&contents).map_err(|error| error.with_path(path))
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
