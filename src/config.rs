// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Logger configuration files.
//!
//! JSON5 input format (comments and trailing commas allowed) describing a
//! logger's threshold, ring capacity, output format and sinks.

use crate::format::FormatSpec;
use crate::level::Level;
use crate::logger::{Logger, DEFAULT_CAPACITY};
use crate::sink::{ConsoleSink, ConsoleTarget, RemoteSink, RollingFileSink, Sink};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors from loading or applying a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    IoError(PathBuf, String),

    #[error("failed to parse config: {0}")]
    ParseError(String),

    #[error("unknown console target {target:?} (expected \"stdout\" or \"stderr\")")]
    InvalidConsoleTarget { target: String },

    #[error("file sink path must not be empty")]
    EmptyFilePath,

    #[error("remote sink url must not be empty")]
    EmptyRemoteUrl,

    #[error("failed to build logger: {0}")]
    BuildError(#[from] crate::Error),
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_console_target() -> String {
    "stdout".to_string()
}

fn default_max_backups() -> usize {
    5
}

fn default_max_queue() -> isize {
    1024
}

/// One sink in a logger configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkSpec {
    /// Console output, `target` is `"stdout"` or `"stderr"`
    Console {
        #[serde(default = "default_console_target")]
        target: String,
    },
    /// Rolling file output
    File {
        path: PathBuf,
        #[serde(default)]
        truncate: bool,
        /// Rotate past this many bytes; 0 disables rotation
        #[serde(default)]
        max_file_size: u64,
        #[serde(default = "default_max_backups")]
        max_backups: usize,
    },
    /// Remote HTTP stream
    Remote {
        url: String,
        #[serde(default = "default_max_queue")]
        max_queue: isize,
    },
}

/// Complete configuration for one logger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Minimum accepted level
    #[serde(default)]
    pub threshold: Level,

    /// Ring buffer capacity (rounded up to a power of two)
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Output format shared by the configured sinks
    #[serde(default)]
    pub format: FormatSpec,

    /// Sinks to attach
    #[serde(default)]
    pub sinks: Vec<SinkSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: Level::default(),
            capacity: DEFAULT_CAPACITY,
            format: FormatSpec::default(),
            sinks: Vec::new(),
        }
    }
}

impl Config {
    /// Parse a JSON5 document into a configuration
    pub fn parse(document: &str) -> Result<Self, ConfigError> {
        json5::from_str(document).map_err(|err| ConfigError::ParseError(err.to_string()))
    }

    /// Read and parse a configuration file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(document) => Self::parse(&document),
            Err(err) => Err(ConfigError::IoError(path.to_path_buf(), err.to_string())),
        }
    }

    /// Render the configuration as a document `parse` accepts.
    ///
    /// Emitted as plain pretty-printed JSON, which is a JSON5 subset. Any
    /// comments or trailing commas a hand-written file carried are not
    /// round-tripped.
    pub fn to_json5(&self) -> String {
        match serde_json::to_string_pretty(self) {
            Ok(document) => document,
            Err(_) => "{}".to_string(),
        }
    }

    /// Write the configuration to `path`, replacing any previous content
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let document = self.to_json5();
        std::fs::write(path, document)
            .map_err(|err| ConfigError::IoError(path.to_path_buf(), err.to_string()))
    }

    /// Validate the configuration without building anything
    pub fn validate(&self) -> Result<(), ConfigError> {
        for sink in &self.sinks {
            match sink {
                SinkSpec::Console { target } => {
                    if ConsoleTarget::from_name(target).is_err() {
                        return Err(ConfigError::InvalidConsoleTarget {
                            target: target.clone(),
                        });
                    }
                }
                SinkSpec::File { path, .. } => {
                    if path.as_os_str().is_empty() {
                        return Err(ConfigError::EmptyFilePath);
                    }
                }
                SinkSpec::Remote { url, .. } => {
                    if url.is_empty() {
                        return Err(ConfigError::EmptyRemoteUrl);
                    }
                }
            }
        }
        Ok(())
    }

    /// Build a logger wired up as configured
    pub fn build_logger(&self, name: impl Into<String>) -> Result<Logger, ConfigError> {
        self.validate()?;

        let logger = Logger::with_capacity(name, self.capacity)?;
        logger.set_threshold(self.threshold);

        for spec in &self.sinks {
            let sink: Arc<dyn Sink> = match spec {
                SinkSpec::Console { target } => {
                    let target = ConsoleTarget::from_name(target)?;
                    Arc::new(ConsoleSink::new(target, self.format.clone()))
                }
                SinkSpec::File {
                    path,
                    truncate,
                    max_file_size,
                    max_backups,
                } => Arc::new(
                    RollingFileSink::with_options(path.clone(), *truncate, 8192)?
                        .with_format(self.format.clone())
                        .with_max_file_size(*max_file_size)
                        .with_max_backups(*max_backups),
                ),
                SinkSpec::Remote { url, max_queue } => {
                    Arc::new(RemoteSink::with_max_queue(url.clone(), *max_queue))
                }
            };
            logger.add_sink(sink)?;
        }

        Ok(logger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json5_with_comments() {
        let config = Config::parse(
            r#"{
                // accept warnings and up
                threshold: "Warn",
                capacity: 64,
                sinks: [
                    { kind: "console", target: "stderr" },
                ],
            }"#,
        )
        .unwrap();

        assert_eq!(config.threshold, Level::Warn);
        assert_eq!(config.capacity, 64);
        assert_eq!(
            config.sinks,
            vec![SinkSpec::Console {
                target: "stderr".to_string()
            }]
        );
    }

    #[test]
    fn test_defaults_apply_to_empty_document() {
        let config = Config::parse("{}").unwrap();
        assert_eq!(config.threshold, Level::Debug);
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert!(config.sinks.is_empty());
    }

    #[test]
    fn test_roundtrip_through_json5() {
        let config = Config {
            threshold: Level::Notice,
            capacity: 32,
            format: FormatSpec::default(),
            sinks: vec![
                SinkSpec::Console {
                    target: "stdout".to_string(),
                },
                SinkSpec::File {
                    path: PathBuf::from("/tmp/app.log"),
                    truncate: true,
                    max_file_size: 1024,
                    max_backups: 3,
                },
            ],
        };
        let parsed = Config::parse(&config.to_json5()).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_validate_rejects_unknown_console_target() {
        let config = Config {
            sinks: vec![SinkSpec::Console {
                target: "syslog".to_string(),
            }],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConsoleTarget { target }) if target == "syslog"
        ));
    }

    #[test]
    fn test_validate_rejects_empty_paths() {
        let config = Config {
            sinks: vec![SinkSpec::File {
                path: PathBuf::new(),
                truncate: false,
                max_file_size: 0,
                max_backups: 5,
            }],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyFilePath)));

        let config = Config {
            sinks: vec![SinkSpec::Remote {
                url: String::new(),
                max_queue: 16,
            }],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyRemoteUrl)));
    }

    #[test]
    fn test_build_logger_applies_threshold_and_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            threshold: Level::Error,
            capacity: 16,
            format: FormatSpec::default(),
            sinks: vec![SinkSpec::File {
                path: dir.path().join("built.log"),
                truncate: true,
                max_file_size: 0,
                max_backups: 1,
            }],
        };

        let logger = config.build_logger("configured").unwrap();
        assert_eq!(logger.threshold(), Level::Error);
        assert_eq!(logger.name(), "configured");
    }

    #[test]
    fn test_load_from_missing_file_reports_path() {
        let err = Config::load_from_file(Path::new("/nonexistent/ringlog.json5")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(path, _) if path.ends_with("ringlog.json5")));
    }
}
