use std::{fmt, io::IsTerminal, net::SocketAddr, path::PathBuf, str::FromStr};

use clap::{Parser, ValueEnum};
use config::Config;
use logforth::filter::EnvFilter;

/// Crates of this workspace, logged at the selected level. Everything else logs warnings only.
const WORKSPACE_CRATES: &[&str] = &["parley", "server", "config", "messaging", "rate_limit", "unit_of_work"];

#[derive(Debug, Parser)]
#[command(name = "Parley", version, long_about = concat!("Parley messaging server v", env!("CARGO_PKG_VERSION")))]
pub struct Args {
    /// IP address and port the server listens on.
    /// Default: 127.0.0.1:8000
    #[arg(short, long, env = "PARLEY_LISTEN_ADDRESS")]
    pub listen_address: Option<SocketAddr>,
    /// Path to the TOML configuration file
    #[arg(long, short, env = "PARLEY_CONFIG_PATH", default_value = "./parley.toml")]
    pub config: PathBuf,
    /// Set the logging level
    #[arg(long = "log", env = "PARLEY_LOG", default_value_t = LogLevel::default())]
    pub log_level: LogLevel,
    /// Set the style of log output
    #[arg(long, env = "PARLEY_LOG_STYLE", default_value_t = LogStyle::default())]
    pub log_style: LogStyle,
}

impl Args {
    /// The configuration file, or the defaults if there is none.
    pub fn config(&self) -> anyhow::Result<Config> {
        if !self.config.exists() {
            log::info!("No configuration at {}, using defaults", self.config.display());
            return Ok(Config::default());
        }

        Config::load(&self.config)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogStyle {
    /// Colorized text, used as the default with TTY output
    Color,
    /// Standard text, used as the default with non-TTY output
    Text,
    /// JSON objects
    Json,
}

impl Default for LogStyle {
    fn default() -> Self {
        if std::io::stdout().is_terminal() {
            LogStyle::Color
        } else {
            LogStyle::Text
        }
    }
}

impl fmt::Display for LogStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogStyle::Color => "color",
            LogStyle::Text => "text",
            LogStyle::Json => "json",
        })
    }
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogLevel {
    /// Disable logging
    Off,
    /// Only log errors
    Error,
    /// Log errors, and warnings
    Warn,
    /// Log errors, warnings, and info messages
    #[default]
    Info,
    /// Log errors, warnings, info, and debug messages
    Debug,
    /// Log everything, including retried transactions and cache hits
    Trace,
}

impl LogLevel {
    pub fn env_filter(self) -> anyhow::Result<EnvFilter> {
        let directives = match self {
            LogLevel::Off => "off".to_string(),
            level => WORKSPACE_CRATES
                .iter()
                .fold(String::from("warn"), |directives, name| format!("{directives},{name}={level}")),
        };

        EnvFilter::from_str(&directives).map_err(|e| anyhow::anyhow!("Invalid log filter '{directives}': {e:?}"))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    }
}
