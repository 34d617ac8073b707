//! 日志初始化
//!
//! 容器内部只通过 `tracing` 宏记录日志，是否以及如何输出由应用决定。

use std::fmt;
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::{ApplicationError, ApplicationResult};

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level: Level = (*self).into();
        write!(f, "{}", level.as_str().to_lowercase())
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 紧凑格式
    #[default]
    Compact,
    /// 完整格式
    Full,
    Json,
    /// 多行美化输出，适合开发时查看容器启动过程
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "full" => Ok(LogFormat::Full),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// 没有自定义过滤器时使用的级别
    pub level: LogLevel,

    pub format: LogFormat,

    /// 是否显示目标（模块路径）
    pub show_target: bool,

    pub show_thread_ids: bool,

    /// 自定义过滤器，例如 `"sprig_core=debug,ioc_demo=info"`
    pub filter: Option<String>,
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn show_target(mut self, show: bool) -> Self {
        self.show_target = show;
        self
    }

    pub fn show_thread_ids(mut self, show: bool) -> Self {
        self.show_thread_ids = show;
        self
    }

    /// 设置自定义过滤器
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// 从环境变量读取配置：`RUST_LOG`、`LOG_LEVEL`、`LOG_FORMAT`
    ///
    /// 无法解析的值会被忽略，保留默认配置。
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(rust_log) = lookup("RUST_LOG") {
            config.filter = Some(rust_log);
        }
        if let Some(level) = lookup("LOG_LEVEL").and_then(|s| s.parse().ok()) {
            config.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT").and_then(|s| s.parse().ok()) {
            config.format = format;
        }

        config
    }

    /// 过滤器无效时退回到配置的级别
    fn env_filter(&self) -> EnvFilter {
        self.filter
            .as_deref()
            .and_then(|filter| EnvFilter::try_new(filter).ok())
            .unwrap_or_else(|| EnvFilter::new(self.level.to_string()))
    }

    /// 初始化全局日志订阅者
    ///
    /// 全局订阅者已经存在时返回 [`ApplicationError::LoggingInitFailed`]。
    pub fn init(self) -> ApplicationResult<()> {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter())
            .with_target(self.show_target)
            .with_thread_ids(self.show_thread_ids);

        let result = match self.format {
            LogFormat::Compact => builder.compact().try_init(),
            LogFormat::Full => builder.try_init(),
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Pretty => builder.pretty().try_init(),
        };

        result.map_err(|e| ApplicationError::LoggingInitFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!(" trace ".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Debug.to_string(), "debug");
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("RUST_LOG", "sprig_core=trace"),
            ("LOG_LEVEL", "error"),
            ("LOG_FORMAT", "nonsense"),
        ]
        .into_iter()
        .collect();

        let config = LoggingConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.filter.as_deref(), Some("sprig_core=trace"));
        assert_eq!(config.level, LogLevel::Error);
        assert_eq!(config.format, LogFormat::Compact);
    }

    #[test]
    fn test_invalid_filter_falls_back_to_level() {
        let config = LoggingConfig::new()
            .level(LogLevel::Warn)
            .filter("sprig_core=loud");
        assert_eq!(config.env_filter().to_string(), "warn");
    }

    #[test]
    fn test_second_init_fails() {
        let _ = LoggingConfig::new().init();
        assert!(matches!(
            LoggingConfig::new().init(),
            Err(ApplicationError::LoggingInitFailed(_))
        ));
    }
}
