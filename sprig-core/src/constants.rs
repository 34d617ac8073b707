/// 配置键常量
///
/// 容器和内置条件读取的配置项统一在这里定义，避免各处硬编码。

/// 是否允许同名 Bean 覆盖
pub const ALLOW_BEAN_DEFINITION_OVERRIDING_PROPERTY: &str =
    "container.allow-bean-definition-overriding";

/// 是否所有单例都延迟初始化
pub const LAZY_INITIALIZATION_PROPERTY: &str = "container.lazy-initialization";

/// 操作系统条件读取的配置键
pub const OS_NAME_PROPERTY: &str = "os.name";

/// 默认配置文件
pub const DEFAULT_CONFIG_FILE: &str = "application.toml";

/// 默认环境变量前缀
pub const DEFAULT_ENV_PREFIX: &str = "APP_";
