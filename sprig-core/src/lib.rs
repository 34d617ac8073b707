// sprig-core: 类似 Spring IoC 的依赖注入容器
//
// 提供按名称注册、按类型解析的依赖注入功能，支持：
// - 单例和原型作用域
// - primary / qualifier 消歧
// - 构造器注入与 setter 注入
// - 条件注册与配置类导入

pub mod app;
pub mod bean;
pub mod bean_factory;
pub mod condition;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod injection;
pub mod logging;
pub mod registry;
pub mod resolver;
pub mod scope;
pub mod utils;

// 重新导出常用类型
pub use app::Application;
pub use bean::{
    BeanDefinition, BeanInstance, Capability, FunctionFactory, InstanceFactory, ObjectFactory,
    ProviderFactory,
};
pub use bean_factory::{downcast_bean, BeanProvider, BeanProviderExt, DefaultListableBeanFactory};
pub use condition::{Condition, ConditionContext};
pub use config::{
    ConfigValue, ContainerSettings, Environment, EnvironmentPropertySource, MapPropertySource,
    PropertySource, TomlPropertySource,
};
pub use constants::*;
pub use context::{ApplicationContext, ApplicationContextBuilder, Configuration};
pub use error::{ApplicationError, ApplicationResult, ContainerError, ContainerResult, Result};
pub use injection::{unknown_setter, ResolvedArgs, ResolvedBean, SetterTarget};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use registry::{BeanRegistry, DuplicatePolicy};
pub use resolver::BeanRequest;
pub use scope::Scope;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::app::Application;
    pub use crate::bean::BeanDefinition;
    pub use crate::bean_factory::{BeanProvider, BeanProviderExt};
    pub use crate::condition::{
        on_bean, on_missing_bean, on_missing_bean_of_type, on_os, on_profile, on_property,
        on_property_present, when, Condition,
    };
    pub use crate::context::{ApplicationContext, Configuration};
    pub use crate::error::{ApplicationResult, ContainerError, ContainerResult, Result};
    pub use crate::injection::{unknown_setter, ResolvedArgs, ResolvedBean, SetterTarget};
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use crate::registry::DuplicatePolicy;
    pub use crate::resolver::BeanRequest;
    pub use crate::scope::Scope;
    // Re-export anyhow for convenience
    pub use anyhow::{anyhow, Context};
}
