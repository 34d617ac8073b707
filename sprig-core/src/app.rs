use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::{ContainerSettings, EnvironmentPropertySource, TomlPropertySource};
use crate::constants;
use crate::context::{ApplicationContext, ApplicationContextBuilder, Configuration};
use crate::logging::LoggingConfig;
use crate::{ApplicationError, ApplicationResult};

/// 应用启动器
///
/// 负责初始化日志、加载配置文件、应用配置类并预实例化单例。
pub struct Application {
    /// 应用名称
    name: String,

    /// 配置文件路径
    config_files: Vec<String>,

    /// 环境变量前缀
    env_prefix: String,

    /// 激活的 profiles
    profiles: Vec<String>,

    /// 是否显示 banner
    show_banner: bool,

    /// 日志配置
    logging_config: Option<LoggingConfig>,

    /// 是否由启动器初始化日志
    init_logging: bool,

    /// 配置类（按添加顺序应用）
    configurations: Vec<Box<dyn Configuration>>,
}

impl Application {
    /// 创建新的应用
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_files: vec![constants::DEFAULT_CONFIG_FILE.to_string()],
            env_prefix: constants::DEFAULT_ENV_PREFIX.to_string(),
            profiles: Vec::new(),
            show_banner: true,
            logging_config: None,
            init_logging: true,
            configurations: Vec::new(),
        }
    }

    /// 设置配置文件路径
    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_files = vec![path.into()];
        self
    }

    /// 添加多个配置文件
    pub fn config_files(mut self, paths: Vec<String>) -> Self {
        self.config_files = paths;
        self
    }

    /// 设置环境变量前缀
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// 设置激活的 profiles
    pub fn profiles(mut self, profiles: Vec<String>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn banner(mut self, show: bool) -> Self {
        self.show_banner = show;
        self
    }

    /// 设置日志配置
    ///
    /// 如果不设置，将使用默认配置（从环境变量读取）
    pub fn logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = Some(config);
        self
    }

    /// 已经自行初始化日志时关闭
    pub fn init_logging(mut self, init: bool) -> Self {
        self.init_logging = init;
        self
    }

    /// 添加配置类
    pub fn configuration<C: Configuration + 'static>(mut self, configuration: C) -> Self {
        self.configurations.push(Box::new(configuration));
        self
    }

    /// 运行应用
    pub fn run(self) -> ApplicationResult<Arc<ApplicationContext>> {
        if self.init_logging {
            let logging_config = self
                .logging_config
                .clone()
                .unwrap_or_else(LoggingConfig::from_env);
            logging_config.init()?;
        }

        let start_time = std::time::Instant::now();

        if self.show_banner {
            self.print_banner();
        }

        tracing::info!("Starting {} application", self.name);

        let active_profiles = self.resolve_profiles();
        if !active_profiles.is_empty() {
            tracing::info!("Active profiles: {:?}", active_profiles);
        } else {
            tracing::info!("No active profiles set, using default configuration");
        }

        let mut builder = ApplicationContext::builder().app_name(self.name.clone());

        // 优先级：default -> profile specific -> environment
        builder = self.load_configurations(builder, &active_profiles)?;

        builder = builder.add_property_source(Box::new(EnvironmentPropertySource::new(
            self.env_prefix.clone(),
        )));
        tracing::debug!("Environment variable prefix: {}", self.env_prefix);

        builder = builder.set_active_profiles(active_profiles);

        let Self {
            name,
            configurations,
            ..
        } = self;
        for configuration in configurations {
            builder = builder.import_boxed(configuration);
        }

        let context = builder.build()?;
        tracing::info!("ApplicationContext created");

        tracing::info!("Initializing non-lazy singleton beans");
        context.refresh()?;

        tracing::info!(
            "Started {} in {}ms",
            name,
            start_time.elapsed().as_millis()
        );

        Ok(context)
    }

    /// 代码设置优先，其次是环境变量 `{prefix}PROFILES_ACTIVE`
    fn resolve_profiles(&self) -> Vec<String> {
        if !self.profiles.is_empty() {
            return self.profiles.clone();
        }
        std::env::var(format!("{}PROFILES_ACTIVE", self.env_prefix))
            .map(|profiles| {
                profiles
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 加载配置文件
    ///
    /// 加载顺序（优先级从低到高）：
    /// 1. application.toml (default)
    /// 2. application-{profile}.toml (profile specific)
    fn load_configurations(
        &self,
        mut builder: ApplicationContextBuilder,
        active_profiles: &[String],
    ) -> ApplicationResult<ApplicationContextBuilder> {
        for base_config in &self.config_files {
            builder = try_load_config_file(builder, base_config, 0)?;
        }

        for (index, profile) in active_profiles.iter().enumerate() {
            for base_config in &self.config_files {
                let profile_config = profile_config_path(base_config, profile);
                builder = try_load_config_file(builder, &profile_config, 10 + index as i32)?;
            }
        }

        Ok(builder)
    }

    fn print_banner(&self) {
        println!();
        println!(r"   ___ _ __  _ __(_) __ _ ");
        println!(r"  / __| '_ \| '__| |/ _` |");
        println!(r"  \__ \ |_) | |  | | (_| |");
        println!(r"  |___/ .__/|_|  |_|\__, |");
        println!(r"      |_|           |___/ ");
        println!();
        println!("  :: Sprig ::        (v{})", env!("CARGO_PKG_VERSION"));
        println!();
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new("application")
    }
}

/// application.toml -> application-dev.toml
fn profile_config_path(base_path: &str, profile: &str) -> String {
    match base_path.rfind('.') {
        Some(dot_pos) => {
            let (name, ext) = base_path.split_at(dot_pos);
            format!("{}-{}{}", name, profile, ext)
        }
        None => format!("{}-{}", base_path, profile),
    }
}

/// 文件不存在时跳过
///
/// 文件无法解析，或 `[container]` 表中的值类型不对时启动失败，
/// 避免 `allow-bean-definition-overriding = "yes"` 之类的写法被静默当作 `false`。
fn try_load_config_file(
    builder: ApplicationContextBuilder,
    config_file: &str,
    priority: i32,
) -> ApplicationResult<ApplicationContextBuilder> {
    if !Path::new(config_file).exists() {
        tracing::debug!("Configuration file not found: {}", config_file);
        return Ok(builder);
    }

    let content = fs::read_to_string(config_file).map_err(|e| {
        ApplicationError::Config(format!("Failed to read config file {}: {}", config_file, e))
    })?;

    let settings = ContainerSettings::from_toml_str(&content).map_err(|e| {
        tracing::error!("Invalid configuration file {}: {}", config_file, e);
        e
    })?;
    tracing::debug!("Container settings in {}: {:?}", config_file, settings);

    let source = TomlPropertySource::parse(&content, config_file)?.with_priority(priority);
    tracing::info!(
        "Loaded configuration from: {} (priority: {})",
        config_file,
        priority
    );
    Ok(builder.add_property_source(Box::new(source)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean::BeanDefinition;
    use crate::bean_factory::{BeanProvider, BeanProviderExt};
    use crate::condition::on_profile;
    use crate::ContainerResult;

    #[test]
    fn test_profile_config_path() {
        assert_eq!(
            profile_config_path("application.toml", "dev"),
            "application-dev.toml"
        );
        assert_eq!(
            profile_config_path("config/app.toml", "prod"),
            "config/app-prod.toml"
        );
        assert_eq!(profile_config_path("settings", "dev"), "settings-dev");
    }

    struct GreetingConfig;

    impl Configuration for GreetingConfig {
        fn name(&self) -> &str {
            "greetingConfig"
        }

        fn register_beans(&self, context: &ApplicationContext) -> ContainerResult<()> {
            context.register_singleton("greeting", || Ok("你好".to_string()))?;
            Ok(())
        }
    }

    struct ProfileConfig;

    impl Configuration for ProfileConfig {
        fn name(&self) -> &str {
            "profileConfig"
        }

        fn register_beans(&self, context: &ApplicationContext) -> ContainerResult<()> {
            context.register(
                BeanDefinition::from_fn("devGreeting", || Ok("dev".to_string()))
                    .with_condition(on_profile("dev")),
            )?;
            context.register(
                BeanDefinition::from_fn("prodGreeting", || Ok("prod".to_string()))
                    .with_condition(on_profile("prod")),
            )?;
            Ok(())
        }
    }

    #[test]
    fn test_run_applies_configurations() {
        let context = Application::new("test")
            .banner(false)
            .init_logging(false)
            .config_file("does-not-exist.toml")
            .profiles(vec!["dev".to_string()])
            .configuration(GreetingConfig)
            .run()
            .unwrap();

        assert_eq!(context.app_name(), "test");
        assert_eq!(context.environment().active_profiles(), vec!["dev"]);
        assert!(context.get_bean_factory().is_singleton_created("greeting"));
        assert_eq!(*context.get_bean_by_type::<String>().unwrap(), "你好");
    }

    #[test]
    fn test_run_reads_container_settings_from_file() {
        let dir = std::env::temp_dir().join(format!("sprig-app-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("application.toml");
        std::fs::write(
            &path,
            "[container]\nallow-bean-definition-overriding = true\nlazy-initialization = true\n",
        )
        .unwrap();

        let context = Application::new("test")
            .banner(false)
            .init_logging(false)
            .config_file(path.to_string_lossy().to_string())
            .configuration(GreetingConfig)
            .run()
            .unwrap();

        assert!(!context.get_bean_factory().is_singleton_created("greeting"));
        context
            .register_singleton("greeting", || Ok("hello".to_string()))
            .unwrap();
        assert_eq!(*context.get_bean_by_type::<String>().unwrap(), "hello");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_run_rejects_mistyped_container_settings() {
        let dir = std::env::temp_dir().join(format!("sprig-app-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("application.toml");
        std::fs::write(&path, "[container]\nallow-bean-definition-overriding = \"yes\"\n").unwrap();

        let result = Application::new("test")
            .banner(false)
            .init_logging(false)
            .config_file(path.to_string_lossy().to_string())
            .configuration(GreetingConfig)
            .run();

        assert!(matches!(result, Err(ApplicationError::Config(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_profile_file_overrides_base_file() {
        let dir = std::env::temp_dir().join(format!("sprig-app-profile-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let base = dir.join("application.toml");
        std::fs::write(&base, "[greeting]\ntext = \"你好\"\n").unwrap();
        std::fs::write(
            dir.join("application-dev.toml"),
            "[greeting]\ntext = \"hello\"\n",
        )
        .unwrap();

        let context = Application::new("test")
            .banner(false)
            .init_logging(false)
            .config_file(base.to_string_lossy().to_string())
            .profiles(vec!["dev".to_string()])
            .configuration(ProfileConfig)
            .run()
            .unwrap();

        assert_eq!(
            context.environment().get_string("greeting.text").as_deref(),
            Some("hello")
        );
        assert!(context.contains_bean("devGreeting"));
        assert!(!context.contains_bean("prodGreeting"));
        std::fs::remove_dir_all(&dir).ok();
    }
}
