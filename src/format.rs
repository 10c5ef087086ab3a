// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Event rendering: an ordered list of components, configurable from a
//! serde-deserialized settings document.

use crate::event::LogEvent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

fn enabled() -> bool {
    true
}

fn default_loc_format() -> String {
    "[{file}:{module}:{line}]".to_string()
}

fn default_level_colors() -> HashMap<String, String> {
    [
        ("debug", "white"),
        ("info", "cyan"),
        ("notice", "blue"),
        ("warn", "yellow"),
        ("error", "red"),
        ("fatal", "magenta"),
    ]
    .into_iter()
    .map(|(level, color)| (level.to_string(), color.to_string()))
    .collect()
}

/// One piece of a rendered line, in output order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentSpec {
    /// Local wall-clock time, `[2025-01-01 12:00:00.000]`
    Timestamp {
        #[serde(default = "enabled")]
        enabled: bool,
    },
    /// Upper-case level name, `[INFO]`
    Level {
        #[serde(default = "enabled")]
        enabled: bool,
    },
    /// Producer thread id, `[tid: 4242]`
    Tid {
        #[serde(default = "enabled")]
        enabled: bool,
    },
    /// Call site; `{file}`, `{module}` and `{line}` are substituted
    Loc {
        #[serde(default = "default_loc_format")]
        format: String,
        #[serde(default = "enabled")]
        enabled: bool,
    },
    /// The message text
    Msg {
        #[serde(default = "enabled")]
        enabled: bool,
    },
    /// Wrap the whole line in an ANSI color chosen by level
    Color {
        #[serde(default = "default_level_colors")]
        level_colors: HashMap<String, String>,
        #[serde(default = "enabled")]
        enabled: bool,
    },
}

/// Ordered component list for one sink's output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormatSpec {
    pub components: Vec<ComponentSpec>,
}

impl Default for FormatSpec {
    fn default() -> Self {
        Self {
            components: vec![
                ComponentSpec::Timestamp { enabled: true },
                ComponentSpec::Level { enabled: true },
                ComponentSpec::Tid { enabled: true },
                ComponentSpec::Loc {
                    format: default_loc_format(),
                    enabled: true,
                },
                ComponentSpec::Msg { enabled: true },
                ComponentSpec::Color {
                    level_colors: default_level_colors(),
                    enabled: true,
                },
            ],
        }
    }
}

/// Renders events to single lines according to a `FormatSpec`
#[derive(Debug, Clone)]
pub struct Formatter {
    spec: FormatSpec,
}

impl Formatter {
    pub fn new(spec: FormatSpec) -> Self {
        Self { spec }
    }

    /// Render one event. No trailing newline; sinks add their own.
    pub fn render(&self, event: &LogEvent) -> String {
        let mut out = String::with_capacity(96);
        let mut color: Option<&str> = None;

        for component in &self.spec.components {
            let part = match component {
                ComponentSpec::Timestamp { enabled: true } => {
                    format!("[{}]", event.timestamp().format(TIMESTAMP_FORMAT))
                }
                ComponentSpec::Level { enabled: true } => {
                    format!("[{}]", event.formatted_level())
                }
                ComponentSpec::Tid { enabled: true } => {
                    format!("[tid: {}]", event.thread_id())
                }
                ComponentSpec::Loc {
                    format,
                    enabled: true,
                } => {
                    let loc = event.location();
                    format
                        .replace("{file}", loc.file())
                        .replace("{module}", loc.module())
                        .replace("{line}", &loc.line().to_string())
                }
                ComponentSpec::Msg { enabled: true } => event.message().to_string(),
                ComponentSpec::Color {
                    level_colors,
                    enabled: true,
                } => {
                    let key = event.formatted_level().to_ascii_lowercase();
                    color = Some(
                        level_colors
                            .get(&key)
                            .map(|name| ansi_code(name))
                            .unwrap_or(ansi_code("white")),
                    );
                    continue;
                }
                _ => continue,
            };
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&part);
        }

        match color {
            Some(code) => format!("\x1b[{code}m{out}\x1b[0m"),
            None => out,
        }
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(FormatSpec::default())
    }
}

fn ansi_code(name: &str) -> &'static str {
    match name {
        "red" => "31",
        "yellow" => "33",
        "blue" => "34",
        "magenta" => "35",
        "cyan" => "36",
        _ => "37", // white
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Level, LogEvent, SourceLocation};

    fn event() -> LogEvent {
        LogEvent::new(
            Level::Warn,
            "disk almost full",
            SourceLocation::new("main.rs", "app::disk", 77),
        )
    }

    #[test]
    fn test_default_render_has_all_components() {
        let line = Formatter::default().render(&event());
        assert!(line.contains("[WARN]"));
        assert!(line.contains("[main.rs:app::disk:77]"));
        assert!(line.contains("disk almost full"));
        assert!(line.contains("[tid: "));
        // warn renders yellow by default
        assert!(line.starts_with("\x1b[33m"));
        assert!(line.ends_with("\x1b[0m"));
    }

    #[test]
    fn test_disabled_components_are_omitted() {
        let spec = FormatSpec {
            components: vec![
                ComponentSpec::Level { enabled: false },
                ComponentSpec::Msg { enabled: true },
            ],
        };
        let line = Formatter::new(spec).render(&event());
        assert_eq!(line, "disk almost full");
    }

    #[test]
    fn test_loc_format_substitution() {
        let spec = FormatSpec {
            components: vec![ComponentSpec::Loc {
                format: "{file}#{line}".to_string(),
                enabled: true,
            }],
        };
        let line = Formatter::new(spec).render(&event());
        assert_eq!(line, "main.rs#77");
    }

    #[test]
    fn test_color_wraps_line() {
        let spec = FormatSpec {
            components: vec![
                ComponentSpec::Msg { enabled: true },
                ComponentSpec::Color {
                    level_colors: default_level_colors(),
                    enabled: true,
                },
            ],
        };
        let line = Formatter::new(spec).render(&event());
        // warn maps to yellow
        assert_eq!(line, "\x1b[33mdisk almost full\x1b[0m");
    }

    #[test]
    fn test_spec_deserializes_with_defaults() {
        let spec: FormatSpec = serde_json::from_str(
            r#"{ "components": [ { "type": "level" }, { "type": "msg" }, { "type": "loc" } ] }"#,
        )
        .unwrap();
        let line = Formatter::new(spec).render(&event());
        assert!(line.starts_with("[WARN]"));
        assert!(line.contains("[main.rs:app::disk:77]"));
    }
}
