//! 条件注册
//!
//! 类似 Spring 的 `@Conditional` 系列注解。条件在注册时求值一次，
//! 不满足条件的 Bean 不会进入注册表。

use std::any::TypeId;

use crate::config::Environment;
use crate::registry::BeanRegistry;

/// 条件求值上下文
pub struct ConditionContext<'a> {
    environment: &'a Environment,
    registry: &'a BeanRegistry,
}

impl<'a> ConditionContext<'a> {
    pub(crate) fn new(environment: &'a Environment, registry: &'a BeanRegistry) -> Self {
        Self {
            environment,
            registry,
        }
    }

    pub fn environment(&self) -> &Environment {
        self.environment
    }

    /// 截至目前已注册的 Bean
    pub fn registry(&self) -> &BeanRegistry {
        self.registry
    }
}

/// 注册条件
pub trait Condition: Send + Sync {
    fn matches(&self, context: &ConditionContext<'_>) -> bool;

    /// 用于日志输出
    fn describe(&self) -> String {
        "custom condition".to_string()
    }
}

impl<F> Condition for F
where
    F: Fn(&ConditionContext<'_>) -> bool + Send + Sync,
{
    fn matches(&self, context: &ConditionContext<'_>) -> bool {
        self(context)
    }
}

/// 无参谓词
pub struct When<F> {
    predicate: F,
}

impl<F> Condition for When<F>
where
    F: Fn() -> bool + Send + Sync,
{
    fn matches(&self, _context: &ConditionContext<'_>) -> bool {
        (self.predicate)()
    }

    fn describe(&self) -> String {
        "predicate".to_string()
    }
}

pub fn when<F>(predicate: F) -> When<F>
where
    F: Fn() -> bool + Send + Sync,
{
    When { predicate }
}

/// 操作系统条件
///
/// 优先读取 `os.name` 配置，没有配置时使用编译目标的操作系统。
pub struct OnOs {
    os: String,
}

pub fn on_os(os: impl Into<String>) -> OnOs {
    OnOs { os: os.into() }
}

impl Condition for OnOs {
    fn matches(&self, context: &ConditionContext<'_>) -> bool {
        let current = context
            .environment()
            .get_string(crate::constants::OS_NAME_PROPERTY)
            .unwrap_or_else(|| std::env::consts::OS.to_string());
        current.eq_ignore_ascii_case(&self.os)
    }

    fn describe(&self) -> String {
        format!("on os '{}'", self.os)
    }
}

/// profile 条件（@Profile）
///
/// `"!prod"` 表示 prod 未激活时满足。
pub struct OnProfile {
    profile: String,
}

pub fn on_profile(profile: impl Into<String>) -> OnProfile {
    OnProfile {
        profile: profile.into(),
    }
}

impl Condition for OnProfile {
    fn matches(&self, context: &ConditionContext<'_>) -> bool {
        match self.profile.strip_prefix('!') {
            Some(profile) => !context.environment().accepts_profile(profile),
            None => context.environment().accepts_profile(&self.profile),
        }
    }

    fn describe(&self) -> String {
        format!("on profile '{}'", self.profile)
    }
}

/// 配置项条件（@ConditionalOnProperty）
///
/// 未指定期望值时，配置存在且不为 `false` 即满足。
pub struct OnProperty {
    key: String,
    having_value: Option<String>,
}

pub fn on_property(key: impl Into<String>, having_value: impl Into<String>) -> OnProperty {
    OnProperty {
        key: key.into(),
        having_value: Some(having_value.into()),
    }
}

pub fn on_property_present(key: impl Into<String>) -> OnProperty {
    OnProperty {
        key: key.into(),
        having_value: None,
    }
}

impl Condition for OnProperty {
    fn matches(&self, context: &ConditionContext<'_>) -> bool {
        let Some(value) = context.environment().get(&self.key) else {
            return false;
        };
        let value = value.to_string();
        match &self.having_value {
            Some(expected) => value.eq_ignore_ascii_case(expected),
            None => !value.eq_ignore_ascii_case("false"),
        }
    }

    fn describe(&self) -> String {
        match &self.having_value {
            Some(v) => format!("on property '{}' = '{}'", self.key, v),
            None => format!("on property '{}'", self.key),
        }
    }
}

/// 指定名称的 Bean 已注册（@ConditionalOnBean）
pub struct OnBean {
    name: String,
}

pub fn on_bean(name: impl Into<String>) -> OnBean {
    OnBean { name: name.into() }
}

impl Condition for OnBean {
    fn matches(&self, context: &ConditionContext<'_>) -> bool {
        context.registry().contains(&self.name)
    }

    fn describe(&self) -> String {
        format!("on bean '{}'", self.name)
    }
}

/// 指定名称的 Bean 未注册（@ConditionalOnMissingBean(name = ..)）
pub struct OnMissingBean {
    name: String,
}

pub fn on_missing_bean(name: impl Into<String>) -> OnMissingBean {
    OnMissingBean { name: name.into() }
}

impl Condition for OnMissingBean {
    fn matches(&self, context: &ConditionContext<'_>) -> bool {
        !context.registry().contains(&self.name)
    }

    fn describe(&self) -> String {
        format!("on missing bean '{}'", self.name)
    }
}

/// 没有任何可以作为 `T` 注入的 Bean（@ConditionalOnMissingBean(value = T)）
pub struct OnMissingBeanOfType {
    type_id: TypeId,
    type_name: &'static str,
}

pub fn on_missing_bean_of_type<T: ?Sized + 'static>() -> OnMissingBeanOfType {
    OnMissingBeanOfType {
        type_id: TypeId::of::<T>(),
        type_name: std::any::type_name::<T>(),
    }
}

impl Condition for OnMissingBeanOfType {
    fn matches(&self, context: &ConditionContext<'_>) -> bool {
        context.registry().lookup_by_type(self.type_id).is_empty()
    }

    fn describe(&self) -> String {
        format!("on missing bean of type '{}'", self.type_name)
    }
}
