use std::any::Any;
use std::sync::Arc;

use crate::bean::{BeanDefinition, BeanInstance};
use crate::bean_factory::{BeanProvider, DefaultListableBeanFactory};
use crate::condition::when;
use crate::config::{ContainerSettings, Environment, PropertySource};
use crate::error::ContainerResult;
use crate::injection::ResolvedBean;
use crate::registry::DuplicatePolicy;
use crate::resolver::BeanRequest;
use crate::utils::naming::default_bean_name;
use crate::Scope;

/// 配置类 - 按顺序注册一组 Bean
///
/// 相当于 Spring 的 `@Configuration` 类，`imports` 相当于 `@Import`。
pub trait Configuration: Send + Sync {
    /// 配置名称，同名配置只会被应用一次
    fn name(&self) -> &str;

    /// 注册本配置声明的 Bean
    fn register_beans(&self, context: &ApplicationContext) -> ContainerResult<()>;

    /// 需要先于本配置应用的其他配置
    fn imports(&self) -> Vec<Box<dyn Configuration>> {
        Vec::new()
    }
}

/// 应用上下文
///
/// 持有 BeanFactory 和 Environment，解析请求全部委托给 BeanFactory。
pub struct ApplicationContext {
    /// Bean 工厂 - 负责 Bean 的创建和管理
    bean_factory: Arc<DefaultListableBeanFactory>,

    /// 配置环境
    environment: Arc<Environment>,

    /// 应用名称
    app_name: String,
}

impl ApplicationContext {
    /// 创建新的应用上下文（不允许同名覆盖）
    pub fn new() -> Self {
        Self::with_environment(Arc::new(Environment::new()), &ContainerSettings::default())
    }

    pub(crate) fn with_environment(
        environment: Arc<Environment>,
        settings: &ContainerSettings,
    ) -> Self {
        let bean_factory = DefaultListableBeanFactory::with_environment(
            settings.duplicate_policy(),
            Arc::clone(&environment),
        );
        bean_factory.set_lazy_initialization(settings.lazy_initialization);

        Self {
            bean_factory: Arc::new(bean_factory),
            environment,
            app_name: "application".to_string(),
        }
    }

    /// 构建器模式创建上下文
    pub fn builder() -> ApplicationContextBuilder {
        ApplicationContextBuilder::new()
    }

    /// 获取内部的 BeanFactory
    pub fn get_bean_factory(&self) -> &Arc<DefaultListableBeanFactory> {
        &self.bean_factory
    }

    /// 获取 Environment
    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// 注册 Bean 定义，条件不满足时返回 `Ok(false)`
    pub fn register(&self, definition: BeanDefinition) -> ContainerResult<bool> {
        self.bean_factory.register_bean_definition(definition)
    }

    /// 以完整元数据注册零参数工厂
    pub fn register_factory<T, F>(
        &self,
        name: impl Into<String>,
        scope: Scope,
        primary: bool,
        qualifier: Option<&str>,
        factory: F,
    ) -> ContainerResult<bool>
    where
        T: Any + Send + Sync,
        F: Fn() -> ContainerResult<T> + Send + Sync + 'static,
    {
        let mut definition = BeanDefinition::from_fn(name, factory)
            .with_scope(scope)
            .with_primary(primary);
        if let Some(qualifier) = qualifier {
            definition = definition.with_qualifier(qualifier);
        }
        self.register(definition)
    }

    /// 同 [`register_factory`](Self::register_factory)，`include_if` 返回 false 时不注册
    pub fn register_factory_if<T, F, P>(
        &self,
        name: impl Into<String>,
        scope: Scope,
        primary: bool,
        qualifier: Option<&str>,
        include_if: P,
        factory: F,
    ) -> ContainerResult<bool>
    where
        T: Any + Send + Sync,
        F: Fn() -> ContainerResult<T> + Send + Sync + 'static,
        P: Fn() -> bool + Send + Sync + 'static,
    {
        let mut definition = BeanDefinition::from_fn(name, factory)
            .with_scope(scope)
            .with_primary(primary)
            .with_condition(when(include_if));
        if let Some(qualifier) = qualifier {
            definition = definition.with_qualifier(qualifier);
        }
        self.register(definition)
    }

    /// 注册单例 Bean
    pub fn register_singleton<T, F>(&self, name: impl Into<String>, factory: F) -> ContainerResult<bool>
    where
        T: Any + Send + Sync,
        F: Fn() -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.register_factory(name, Scope::Singleton, false, None, factory)
    }

    /// 注册原型 Bean
    pub fn register_prototype<T, F>(&self, name: impl Into<String>, factory: F) -> ContainerResult<bool>
    where
        T: Any + Send + Sync,
        F: Fn() -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.register_factory(name, Scope::Prototype, false, None, factory)
    }

    /// 注册已经构建好的实例
    pub fn register_instance<T>(&self, name: impl Into<String>, instance: T) -> ContainerResult<bool>
    where
        T: Any + Send + Sync,
    {
        self.register(BeanDefinition::from_instance(name, Arc::new(instance)))
    }

    /// 以类型名推导 Bean 名称注册（`UserDao` -> `userDao`）
    pub fn register_type<T, F>(&self, factory: F) -> ContainerResult<bool>
    where
        T: Any + Send + Sync,
        F: Fn() -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.register_singleton(default_bean_name::<T>(), factory)
    }

    /// 应用配置类及其导入的配置
    pub fn apply_configuration(&self, configuration: &dyn Configuration) -> ContainerResult<()> {
        let mut applied = Vec::new();
        self.apply_configuration_once(configuration, &mut applied)
    }

    fn apply_configuration_once(
        &self,
        configuration: &dyn Configuration,
        applied: &mut Vec<String>,
    ) -> ContainerResult<()> {
        let name = configuration.name().to_string();
        if applied.contains(&name) {
            tracing::debug!("Configuration '{}' already applied, skipping", name);
            return Ok(());
        }
        applied.push(name.clone());

        for import in configuration.imports() {
            self.apply_configuration_once(import.as_ref(), applied)?;
        }

        tracing::debug!("Applying configuration '{}'", name);
        configuration.register_beans(self).map_err(|e| {
            tracing::error!("Configuration '{}' failed: {}", name, e);
            e
        })
    }

    /// 按注册顺序返回所有 Bean 名称
    pub fn get_bean_names(&self) -> Vec<String> {
        self.bean_factory.get_bean_names()
    }

    pub fn get_bean_definition(&self, name: &str) -> ContainerResult<BeanDefinition> {
        self.bean_factory.get_bean_definition(name)
    }

    /// 校验依赖并预实例化所有非延迟加载的单例
    pub fn refresh(&self) -> ContainerResult<()> {
        tracing::info!(
            "Refreshing application context '{}' with {} bean definition(s)",
            self.app_name,
            self.bean_factory.get_bean_definition_count()
        );
        self.bean_factory.validate_dependencies()?;
        self.bean_factory.preinstantiate_singletons()
    }

    /// 销毁所有单例 Bean
    pub fn shutdown(&self) {
        tracing::info!("Starting application shutdown");
        self.bean_factory.destroy_singletons();
        tracing::info!("Application shutdown complete");
    }
}

impl Default for ApplicationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BeanProvider for ApplicationContext {
    fn resolve(&self, request: &BeanRequest) -> ContainerResult<ResolvedBean> {
        self.bean_factory.resolve(request)
    }

    fn resolve_all(&self, request: &BeanRequest) -> ContainerResult<Vec<ResolvedBean>> {
        self.bean_factory.resolve_all(request)
    }

    fn get_bean(&self, name: &str) -> ContainerResult<BeanInstance> {
        self.bean_factory.get_bean(name)
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.bean_factory.contains_bean(name)
    }
}

/// 应用上下文构建器
pub struct ApplicationContextBuilder {
    environment: Arc<Environment>,
    settings: Option<ContainerSettings>,
    app_name: Option<String>,
    configurations: Vec<Box<dyn Configuration>>,
}

impl ApplicationContextBuilder {
    pub fn new() -> Self {
        Self {
            environment: Arc::new(Environment::new()),
            settings: None,
            app_name: None,
            configurations: Vec::new(),
        }
    }

    /// 使用已有的 Environment
    pub fn environment(mut self, environment: Arc<Environment>) -> Self {
        self.environment = environment;
        self
    }

    /// 添加配置源到 Environment
    pub fn add_property_source(self, source: Box<dyn PropertySource>) -> Self {
        self.environment.add_property_source(source);
        self
    }

    /// 设置激活的 profiles
    pub fn set_active_profiles(self, profiles: Vec<String>) -> Self {
        self.environment.set_active_profiles(profiles);
        self
    }

    /// 显式指定容器设置；不指定时从 Environment 读取
    pub fn settings(mut self, settings: ContainerSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// 直接指定同名覆盖策略
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        let mut settings = self
            .settings
            .take()
            .unwrap_or_else(|| ContainerSettings::from_environment(&self.environment));
        settings.allow_bean_definition_overriding = policy == DuplicatePolicy::Override;
        self.settings = Some(settings);
        self
    }

    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// 导入配置类，`build()` 时按导入顺序应用
    pub fn import<C: Configuration + 'static>(mut self, configuration: C) -> Self {
        self.configurations.push(Box::new(configuration));
        self
    }

    pub fn import_boxed(mut self, configuration: Box<dyn Configuration>) -> Self {
        self.configurations.push(configuration);
        self
    }

    /// 构建上下文并应用所有配置（不会预实例化单例，见 [`ApplicationContext::refresh`]）
    pub fn build(self) -> ContainerResult<Arc<ApplicationContext>> {
        let settings = self
            .settings
            .unwrap_or_else(|| ContainerSettings::from_environment(&self.environment));
        tracing::debug!(
            "Building ApplicationContext: duplicate policy {:?}, lazy initialization {}",
            settings.duplicate_policy(),
            settings.lazy_initialization
        );

        let mut context = ApplicationContext::with_environment(self.environment, &settings);
        if let Some(name) = self.app_name {
            context.app_name = name;
        }

        let mut applied = Vec::new();
        for configuration in &self.configurations {
            context.apply_configuration_once(configuration.as_ref(), &mut applied)?;
        }
        tracing::info!(
            "Applied {} configuration(s), {} bean definition(s) registered",
            applied.len(),
            context.bean_factory.get_bean_definition_count()
        );

        Ok(Arc::new(context))
    }
}

impl Default for ApplicationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean_factory::BeanProviderExt;
    use crate::error::ContainerError;
    use crate::condition::on_property;
    use crate::config::{ConfigValue, MapPropertySource};
    use parking_lot::Mutex;

    #[derive(Debug)]
    struct Person {
        name: String,
    }

    #[derive(Debug)]
    struct UserDao;

    fn person(name: &'static str) -> impl Fn() -> ContainerResult<Person> + Send + Sync + 'static {
        move || {
            Ok(Person {
                name: name.to_string(),
            })
        }
    }

    struct PersonConfig {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Configuration for PersonConfig {
        fn name(&self) -> &str {
            "personConfig"
        }

        fn register_beans(&self, context: &ApplicationContext) -> ContainerResult<()> {
            self.log.lock().push(self.name().to_string());
            context.register_factory("zhangsan", Scope::Singleton, true, None, person("张三2"))?;
            context.register_singleton("lisi", person("李四"))?;
            Ok(())
        }
    }

    struct AppConfig {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Configuration for AppConfig {
        fn name(&self) -> &str {
            "appConfig"
        }

        fn register_beans(&self, _context: &ApplicationContext) -> ContainerResult<()> {
            self.log.lock().push(self.name().to_string());
            Ok(())
        }

        fn imports(&self) -> Vec<Box<dyn Configuration>> {
            vec![
                Box::new(PersonConfig {
                    log: Arc::clone(&self.log),
                }),
                Box::new(PersonConfig {
                    log: Arc::clone(&self.log),
                }),
            ]
        }
    }

    #[test]
    fn test_imports_applied_first_and_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let context = ApplicationContext::builder()
            .import(AppConfig {
                log: Arc::clone(&log),
            })
            .build()
            .unwrap();

        assert_eq!(*log.lock(), vec!["personConfig", "appConfig"]);
        assert_eq!(context.get_bean_names(), vec!["zhangsan", "lisi"]);
        assert_eq!(context.get_bean_by_type::<Person>().unwrap().name, "张三2");
    }

    #[test]
    fn test_override_policy_from_environment() {
        let context = ApplicationContext::builder()
            .add_property_source(Box::new(MapPropertySource::new("test").with_property(
                crate::constants::ALLOW_BEAN_DEFINITION_OVERRIDING_PROPERTY,
                ConfigValue::Bool(true),
            )))
            .build()
            .unwrap();

        context.register_singleton("zhangsan", person("张三2")).unwrap();
        context.register_singleton("zhangsan", person("张三1")).unwrap();
        assert_eq!(
            context.get_bean_by_name::<Person>("zhangsan").unwrap().name,
            "张三1"
        );
    }

    #[test]
    fn test_reject_policy_by_default() {
        let context = ApplicationContext::new();
        context.register_singleton("zhangsan", person("张三2")).unwrap();
        let err = context
            .register_singleton("zhangsan", person("张三1"))
            .unwrap_err();
        assert!(matches!(err, ContainerError::DuplicateName(_)));
    }

    #[test]
    fn test_register_type_uses_default_name() {
        let context = ApplicationContext::new();
        context.register_type(|| Ok(UserDao)).unwrap();
        assert!(context.contains_bean("userDao"));
    }

    #[test]
    fn test_register_instance_and_qualifier() {
        let context = ApplicationContext::new();
        context
            .register_instance(
                "lisi",
                Person {
                    name: "李四".to_string(),
                },
            )
            .unwrap();
        context
            .register_factory("wangwu", Scope::Prototype, false, Some("friend"), person("王五"))
            .unwrap();

        assert_eq!(context.get_qualified_bean::<Person>("friend").unwrap().name, "王五");
        assert_eq!(context.get_qualified_bean::<Person>("lisi").unwrap().name, "李四");
        assert!(matches!(
            context.get_qualified_bean::<Person>("wangwu"),
            Err(ContainerError::NoSuchBean(_))
        ));
    }

    #[test]
    fn test_property_condition() {
        let context = ApplicationContext::builder()
            .add_property_source(Box::new(
                MapPropertySource::new("test")
                    .with_property("feature.dogs", ConfigValue::String("on".to_string())),
            ))
            .build()
            .unwrap();

        let registered = context
            .register(
                BeanDefinition::from_fn("lisi", person("李四"))
                    .with_condition(on_property("feature.dogs", "off")),
            )
            .unwrap();
        assert!(!registered);
        assert!(context.get_bean_names().is_empty());
    }

    #[test]
    fn test_register_factory_if() {
        let context = ApplicationContext::new();
        let on_windows = || cfg!(target_os = "windows");

        let registered = context
            .register_factory_if("bill", Scope::Singleton, false, None, on_windows, person("比尔盖茨"))
            .unwrap();
        assert_eq!(registered, cfg!(target_os = "windows"));
        assert_eq!(context.contains_bean("bill"), cfg!(target_os = "windows"));

        assert!(context
            .register_factory_if("lisi", Scope::Singleton, false, None, || true, person("李四"))
            .unwrap());
        assert!(context.contains_bean("lisi"));
    }

    #[test]
    fn test_refresh_and_shutdown() {
        let context = ApplicationContext::builder()
            .duplicate_policy(DuplicatePolicy::Override)
            .app_name("test-app")
            .build()
            .unwrap();
        context.register_singleton("lisi", person("李四")).unwrap();
        context.register_prototype("temp", person("临时")).unwrap();

        context.refresh().unwrap();
        assert_eq!(context.app_name(), "test-app");
        assert!(context.get_bean_factory().is_singleton_created("lisi"));
        assert!(!context.get_bean_factory().is_singleton_created("temp"));

        context.shutdown();
        assert!(!context.get_bean_factory().is_singleton_created("lisi"));
    }
}
