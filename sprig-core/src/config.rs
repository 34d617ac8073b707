use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use parking_lot::RwLock;
use serde::Deserialize;

use crate::constants;
use crate::error::{ApplicationError, ApplicationResult};
use crate::registry::DuplicatePolicy;

/// 配置值类型
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<ConfigValue>),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            ConfigValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(s) => f.write_str(s),
            ConfigValue::Int(i) => write!(f, "{}", i),
            ConfigValue::Float(x) => write!(f, "{}", x),
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Array(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                f.write_str(&parts.join(","))
            }
        }
    }
}

/// 配置源 trait
pub trait PropertySource: Send + Sync {
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// 配置源优先级（数字越大优先级越高）
    fn priority(&self) -> i32 {
        0
    }
}

/// Environment - 配置管理器
///
/// 按优先级从高到低依次查询配置源，第一个命中的值生效。
pub struct Environment {
    sources: RwLock<Vec<Box<dyn PropertySource>>>,
    active_profiles: RwLock<Vec<String>>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<String> = self
            .sources
            .read()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        f.debug_struct("Environment")
            .field("sources", &sources)
            .field("active_profiles", &*self.active_profiles.read())
            .finish()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(Vec::new()),
            active_profiles: RwLock::new(Vec::new()),
        }
    }

    /// 添加配置源
    pub fn add_property_source(&self, source: Box<dyn PropertySource>) {
        let mut sources = self.sources.write();
        tracing::debug!(
            "Adding property source '{}' (priority: {})",
            source.name(),
            source.priority()
        );
        sources.push(source);
        // 稳定排序：同优先级时后加入的排在后面
        sources.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        let sources = self.sources.read();
        for source in sources.iter() {
            if let Some(value) = source.get(key) {
                tracing::trace!("Config '{}' found in source '{}'", key, source.name());
                return Some(value);
            }
        }
        None
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_string())
    }

    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|| default.to_string())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    pub fn set_active_profiles(&self, profiles: Vec<String>) {
        *self.active_profiles.write() = profiles;
    }

    pub fn active_profiles(&self) -> Vec<String> {
        self.active_profiles.read().clone()
    }

    pub fn accepts_profile(&self, profile: &str) -> bool {
        self.active_profiles.read().iter().any(|p| p == profile)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// 环境变量配置源
///
/// `database.max-connections` 对应 `APP_DATABASE_MAX_CONNECTIONS`。
pub struct EnvironmentPropertySource {
    prefix: String,
}

impl EnvironmentPropertySource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn key_to_env(&self, key: &str) -> String {
        format!(
            "{}{}",
            self.prefix,
            key.replace(['.', '-'], "_").to_uppercase()
        )
    }
}

impl PropertySource for EnvironmentPropertySource {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        std::env::var(self.key_to_env(key))
            .ok()
            .map(ConfigValue::String)
    }

    fn priority(&self) -> i32 {
        100
    }
}

/// TOML 文件配置源
///
/// 嵌套表展开成点号分隔的键：`[person.bill] name = ".."` -> `person.bill.name`。
pub struct TomlPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl TomlPropertySource {
    pub fn from_file(path: impl AsRef<Path>) -> ApplicationResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ApplicationError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::parse(&content, path.to_string_lossy().to_string())
    }

    pub fn parse(content: &str, name: impl Into<String>) -> ApplicationResult<Self> {
        let value: toml::Value = toml::from_str(content)
            .map_err(|e| ApplicationError::Config(format!("Failed to parse TOML: {}", e)))?;

        let mut properties = HashMap::new();
        flatten(&value, String::new(), &mut properties);

        Ok(Self {
            name: name.into(),
            properties,
            priority: 0,
        })
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

fn flatten(value: &toml::Value, prefix: String, out: &mut HashMap<String, ConfigValue>) {
    match value {
        toml::Value::Table(table) => {
            for (key, val) in table {
                let nested = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(val, nested, out);
            }
        }
        other => {
            if let Some(converted) = scalar(other) {
                out.insert(prefix, converted);
            }
        }
    }
}

fn scalar(value: &toml::Value) -> Option<ConfigValue> {
    Some(match value {
        toml::Value::String(s) => ConfigValue::String(s.clone()),
        toml::Value::Integer(i) => ConfigValue::Int(*i),
        toml::Value::Float(f) => ConfigValue::Float(*f),
        toml::Value::Boolean(b) => ConfigValue::Bool(*b),
        toml::Value::Datetime(dt) => ConfigValue::String(dt.to_string()),
        toml::Value::Array(items) => ConfigValue::Array(items.iter().filter_map(scalar).collect()),
        toml::Value::Table(_) => return None,
    })
}

impl PropertySource for TomlPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// 内存配置源（用于测试或运行时配置）
pub struct MapPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl MapPropertySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: HashMap::new(),
            priority: 50,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// 容器行为配置，对应配置文件中的 `[container]` 表
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ContainerSettings {
    /// 是否允许同名 Bean 覆盖（默认不允许）
    pub allow_bean_definition_overriding: bool,

    /// 是否所有单例都延迟初始化
    pub lazy_initialization: bool,
}

#[derive(Deserialize)]
struct SettingsDocument {
    #[serde(default)]
    container: ContainerSettings,
}

impl ContainerSettings {
    /// 从 TOML 文本的 `[container]` 表读取
    pub fn from_toml_str(content: &str) -> ApplicationResult<Self> {
        let document: SettingsDocument = toml::from_str(content)
            .map_err(|e| ApplicationError::Config(format!("Invalid [container] settings: {}", e)))?;
        Ok(document.container)
    }

    /// 从 Environment 读取（环境变量可以覆盖文件配置）
    pub fn from_environment(env: &Environment) -> Self {
        Self {
            allow_bean_definition_overriding: env
                .get_bool_or(constants::ALLOW_BEAN_DEFINITION_OVERRIDING_PROPERTY, false),
            lazy_initialization: env.get_bool_or(constants::LAZY_INITIALIZATION_PROPERTY, false),
        }
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        DuplicatePolicy::from_allow_overriding(self.allow_bean_definition_overriding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[container]
allow-bean-definition-overriding = true

[person.bill]
name = "比尔盖茨"
age = 20
tags = ["windows", "founder"]
"#;

    #[test]
    fn test_toml_is_flattened() {
        let source = TomlPropertySource::parse(SAMPLE, "sample").unwrap();

        assert_eq!(
            source.get("person.bill.name"),
            Some(ConfigValue::String("比尔盖茨".to_string()))
        );
        assert_eq!(source.get("person.bill.age"), Some(ConfigValue::Int(20)));
        assert_eq!(
            source.get("person.bill.tags").map(|v| v.to_string()),
            Some("windows,founder".to_string())
        );
        assert_eq!(source.get("person.bill"), None);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlPropertySource::parse("not = = toml", "broken").err().unwrap();
        assert!(matches!(err, ApplicationError::Config(_)));
    }

    #[test]
    fn test_environment_respects_priority() {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("low")
                .with_property("person.age", ConfigValue::Int(20))
                .with_priority(1),
        ));
        env.add_property_source(Box::new(
            MapPropertySource::new("high")
                .with_property("person.age", ConfigValue::String("30".to_string()))
                .with_priority(10),
        ));

        assert_eq!(env.get_i64("person.age"), Some(30));
        assert_eq!(env.get_string_or("person.name", "nobody"), "nobody");
    }

    #[test]
    fn test_settings_from_toml() {
        let settings = ContainerSettings::from_toml_str(SAMPLE).unwrap();
        assert!(settings.allow_bean_definition_overriding);
        assert!(!settings.lazy_initialization);
        assert_eq!(settings.duplicate_policy(), DuplicatePolicy::Override);

        let defaults = ContainerSettings::from_toml_str("").unwrap();
        assert_eq!(defaults, ContainerSettings::default());
        assert_eq!(defaults.duplicate_policy(), DuplicatePolicy::Reject);
    }

    #[test]
    fn test_settings_from_environment() {
        let env = Environment::new();
        env.add_property_source(Box::new(TomlPropertySource::parse(SAMPLE, "sample").unwrap()));

        let settings = ContainerSettings::from_environment(&env);
        assert!(settings.allow_bean_definition_overriding);
    }

    #[test]
    fn test_env_key_mapping() {
        let source = EnvironmentPropertySource::new("APP_");
        assert_eq!(
            source.key_to_env("container.allow-bean-definition-overriding"),
            "APP_CONTAINER_ALLOW_BEAN_DEFINITION_OVERRIDING"
        );
    }

    #[test]
    fn test_profiles() {
        let env = Environment::new();
        env.set_active_profiles(vec!["dev".to_string()]);
        assert!(env.accepts_profile("dev"));
        assert!(!env.accepts_profile("prod"));
    }
}
