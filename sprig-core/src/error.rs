//! 统一的错误处理类型
//!
//! 容器相关错误使用 [`ContainerError`]，应用启动相关错误使用 [`ApplicationError`]。
//! Bean 工厂内部可以返回任意 `anyhow::Error`，通过 `?` 自动转换为
//! [`ContainerError::Other`]。

use thiserror::Error;

/// 容器错误
#[derive(Debug, Error)]
pub enum ContainerError {
    /// 同名 Bean 已存在（严格策略下注册失败）
    #[error("Bean '{0}' is already registered and overriding is disabled")]
    DuplicateName(String),

    /// 没有找到满足条件的 Bean
    #[error("No such bean: {0}")]
    NoSuchBean(String),

    /// 找到多个候选 Bean，且无法通过 primary / qualifier 区分
    #[error("Ambiguous bean for {requested}: candidates [{}]", candidates.join(", "))]
    AmbiguousBean {
        requested: String,
        /// 候选 Bean 名称（按字母序）
        candidates: Vec<String>,
    },

    /// 按名称找到的 Bean 不能作为请求的类型注入
    #[error("Bean '{name}' cannot be injected as '{expected}' (actual type '{found}')")]
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    /// Bean 创建失败
    #[error("Bean creation failed: {0}")]
    BeanCreationFailed(String),

    /// 循环依赖
    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    /// 依赖校验失败
    #[error("Dependency validation failed: {0}")]
    DependencyValidationFailed(String),

    /// setter 注入时目标对象不认识该 setter
    #[error("Type '{target}' has no setter named '{setter}'")]
    UnknownSetter { target: String, setter: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 容器操作结果
pub type ContainerResult<T> = std::result::Result<T, ContainerError>;

/// 应用启动错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// 配置文件读取或解析失败
    #[error("Configuration error: {0}")]
    Config(String),

    /// 日志系统初始化失败
    #[error("Failed to initialize logging: {0}")]
    LoggingInitFailed(String),
}

/// 应用操作结果
pub type ApplicationResult<T> = std::result::Result<T, ApplicationError>;

/// 通用结果类型
pub use anyhow::Result;
