//! Structured reporting for simulation runs
//!
//! Events carry a level, a tag (`vm`, `nat`, `network`, ...), a message and
//! optional JSON data. They are printed either as coloured lines or as JSON
//! lines, and can be mirrored to a log file.

use chrono::{DateTime, Utc};
use colored::Colorize;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub level: Level,
    pub tag: String,
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

static LOG_FORMAT: Lazy<Mutex<LogFormat>> = Lazy::new(|| Mutex::new(LogFormat::Pretty));
static LOG_FILE: Lazy<Mutex<Option<PathBuf>>> = Lazy::new(|| Mutex::new(None));

impl Event {
    pub fn new(level: Level, tag: impl Into<String>, message: impl Into<String>) -> Self {
        let now: DateTime<Utc> = Utc::now();

        Self {
            level,
            tag: tag.into(),
            message: message.into(),
            timestamp: now.to_rfc3339(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn info(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Info, tag, message)
    }

    pub fn warn(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Warn, tag, message)
    }

    pub fn error(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Error, tag, message)
    }

    /// Print the event in the current format and mirror it to the log file
    pub fn emit(&self) -> io::Result<()> {
        let format = *LOG_FORMAT.lock().unwrap_or_else(|e| e.into_inner());
        let log_file = LOG_FILE.lock().unwrap_or_else(|e| e.into_inner()).clone();

        let (screen, plain) = match format {
            LogFormat::Pretty => (self.render_pretty(), self.render_plain()),
            LogFormat::Json => {
                let json = self.render_json()?;
                (json.clone(), json)
            }
        };

        println!("{}", screen);
        if let Some(path) = log_file {
            append_to_file(&path, &plain)?;
        }
        Ok(())
    }

    /// Coloured single-line form showing only the time of day
    pub fn render_pretty(&self) -> String {
        let time = self
            .timestamp
            .split('T')
            .nth(1)
            .unwrap_or(&self.timestamp)
            .split('.')
            .next()
            .unwrap_or("");
        let line = format!("{} [{}] [{}] {}", time, self.level.as_str(), self.tag, self.message);
        match self.level {
            Level::Info => line.green().to_string(),
            Level::Warn => line.yellow().to_string(),
            Level::Error => line.red().to_string(),
        }
    }

    /// Uncoloured form used for log files
    pub fn render_plain(&self) -> String {
        let mut line = format!(
            "{} [{}] [{}] {}",
            self.timestamp,
            self.level.as_str(),
            self.tag,
            self.message
        );
        if let Some(data) = &self.data {
            line.push(' ');
            line.push_str(&data.to_string());
        }
        line
    }

    pub fn render_json(&self) -> io::Result<String> {
        serde_json::to_string(self).map_err(io::Error::from)
    }
}

pub fn set_log_format(format: LogFormat) {
    *LOG_FORMAT.lock().unwrap_or_else(|e| e.into_inner()) = format;
}

pub fn set_log_file(path: Option<PathBuf>) {
    *LOG_FILE.lock().unwrap_or_else(|e| e.into_inner()) = path;
}

fn append_to_file(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", content)
}
