use factory_core::betting::DEFAULT_THRESHOLDS;
use factory_core::model::level::ComponentPlacement;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_SEED: u64 = 4242;
const NAME_ALLOWED: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root level configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LevelConfig {
    pub name: String,
    #[serde(default)]
    pub seed: Option<u64>,
    pub script: String,
    pub layout: Vec<ComponentPlacement>,
    #[serde(default = "default_thresholds")]
    pub thresholds: [f64; 4],
    #[serde(default)]
    pub submission: Option<SubmissionConfig>,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LevelConfig {
    /// Load a level from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: LevelConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;

        if self.script.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "script".to_string(),
                message: "script text must not be empty".to_string(),
            });
        }

        if self.layout.is_empty() {
            return Err(ValidationError::InvalidField {
                field: "layout".to_string(),
                message: "a level needs at least one component".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for placement in &self.layout {
            if !seen.insert(placement.id.as_str()) {
                return Err(ValidationError::InvalidField {
                    field: "layout".to_string(),
                    message: format!("duplicate component id '{}'", placement.id),
                });
            }
        }
        for placement in &self.layout {
            for output in &placement.outputs {
                if !seen.contains(output.as_str()) {
                    return Err(ValidationError::InvalidField {
                        field: "layout".to_string(),
                        message: format!(
                            "component '{}' outputs to unknown '{output}'",
                            placement.id
                        ),
                    });
                }
            }
        }

        for pair in self.thresholds.windows(2) {
            if pair[0] >= pair[1] {
                return Err(ValidationError::InvalidField {
                    field: "thresholds".to_string(),
                    message: "star thresholds must be strictly increasing".to_string(),
                });
            }
        }
        if self.thresholds[0] <= 0.0 {
            return Err(ValidationError::InvalidField {
                field: "thresholds".to_string(),
                message: "star thresholds must be positive".to_string(),
            });
        }

        if let Some(submission) = &self.submission {
            submission.validate()?;
        }

        self.outputs.validate()?;
        self.logging.normalize();
        Ok(())
    }

    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or(DEFAULT_SEED)
    }

    /// Resolve output templates (`{name}` placeholders) into paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            report_jsonl: resolve_template(&self.name, &self.outputs.report_jsonl),
        }
    }
}

fn default_thresholds() -> [f64; 4] {
    DEFAULT_THRESHOLDS
}

/// A recorded learner belief to score after playback.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SubmissionConfig {
    pub picks: Vec<f64>,
}

impl SubmissionConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.picks.is_empty() {
            return Err(ValidationError::InvalidField {
                field: "submission.picks".to_string(),
                message: "at least one pick is required".to_string(),
            });
        }
        for pick in &self.picks {
            if !(0.0..=1.0).contains(pick) {
                return Err(ValidationError::InvalidField {
                    field: "submission.picks".to_string(),
                    message: format!("pick {pick} is outside [0, 1]"),
                });
            }
        }
        Ok(())
    }
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub report_jsonl: String,
}

impl OutputsConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.report_jsonl.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "outputs.report_jsonl".to_string(),
                message: "path must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default)]
    pub level: Option<String>,
}

impl LoggingConfig {
    pub fn level(&self) -> Option<Level> {
        self.level
            .as_deref()
            .and_then(|value| value.parse::<Level>().ok())
    }

    fn normalize(&mut self) {
        if let Some(level) = &self.level {
            self.level = Some(level.to_lowercase());
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOutputs {
    pub report_jsonl: PathBuf,
}

fn resolve_template(name: &str, template: &str) -> PathBuf {
    PathBuf::from(template.replace("{name}", name))
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::InvalidField {
            field: "name".to_string(),
            message: "level name must not be empty".to_string(),
        });
    }
    if let Some(bad) = name.chars().find(|c| !NAME_ALLOWED.contains(*c)) {
        return Err(ValidationError::InvalidField {
            field: "name".to_string(),
            message: format!("level name contains invalid character '{bad}'"),
        });
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read level {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse level {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid level in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}
