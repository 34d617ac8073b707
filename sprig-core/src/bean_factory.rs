//! Bean Factory - 核心容器
//!
//! 参考 Spring 的 BeanFactory 架构设计：[`BeanProvider`] 是可以作为 trait object
//! 使用的最小接口，[`BeanProviderExt`] 在其上提供泛型的便捷方法，
//! [`DefaultListableBeanFactory`] 是实际的容器实现。

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::bean::{BeanDefinition, BeanInstance};
use crate::condition::ConditionContext;
use crate::config::Environment;
use crate::error::{ContainerError, ContainerResult};
use crate::injection::{ResolvedArgs, ResolvedBean, SetterTarget};
use crate::registry::{BeanRegistry, DuplicatePolicy};
use crate::resolver::{self, BeanRequest};
use crate::utils::dependency::{
    validate_dependency_graph, CreationGuard, CreationTracker, InitializingGuard, WaitGuard,
};
use crate::Scope;

/// BeanProvider - 最基础的解析接口
///
/// 不包含泛型方法，可以作为 `&dyn BeanProvider` 传给工厂函数。
pub trait BeanProvider: Send + Sync {
    /// 按注入请求解析唯一的 Bean
    fn resolve(&self, request: &BeanRequest) -> ContainerResult<ResolvedBean>;

    /// 解析所有可以作为请求类型注入的 Bean（按名称排序）
    ///
    /// 请求带限定符时只返回匹配限定符的 Bean；名称会被忽略。
    fn resolve_all(&self, request: &BeanRequest) -> ContainerResult<Vec<ResolvedBean>>;

    /// 通过名称获取 Bean（具体类型）
    fn get_bean(&self, name: &str) -> ContainerResult<BeanInstance>;

    /// 检查是否包含指定名称的 Bean
    fn contains_bean(&self, name: &str) -> bool;
}

/// BeanProvider 的泛型扩展
pub trait BeanProviderExt: BeanProvider {
    /// 通过类型获取 Bean
    fn get_bean_by_type<T: ?Sized + Send + Sync + 'static>(&self) -> ContainerResult<Arc<T>> {
        self.resolve(&BeanRequest::of::<T>())?.into_arc()
    }

    /// 通过名称和类型获取 Bean
    fn get_bean_by_name<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> ContainerResult<Arc<T>> {
        self.resolve(&BeanRequest::of::<T>().named(name))?.into_arc()
    }

    /// 通过类型和限定符获取 Bean
    fn get_qualified_bean<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: &str,
    ) -> ContainerResult<Arc<T>> {
        self.resolve(&BeanRequest::of::<T>().qualified(qualifier))?.into_arc()
    }

    /// 获取所有可以作为 `T` 注入的 Bean
    fn get_beans_of_type<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> ContainerResult<Vec<(String, Arc<T>)>> {
        self.resolve_all(&BeanRequest::of::<T>())?
            .into_iter()
            .map(|bean| {
                let name = bean.name().to_string();
                bean.into_arc().map(|instance| (name, instance))
            })
            .collect()
    }

    /// 构造器注入：按顺序解析所有参数，全部成功后才调用 `target`
    fn inject_constructor<T, F>(&self, requests: &[BeanRequest], target: F) -> ContainerResult<T>
    where
        F: FnOnce(ResolvedArgs) -> ContainerResult<T>,
    {
        let resolved = requests
            .iter()
            .map(|request| self.resolve(request))
            .collect::<ContainerResult<Vec<_>>>()?;
        target(ResolvedArgs::new(resolved))
    }

    /// setter 注入：解析一个依赖并通过名为 `setter` 的 setter 设置
    fn inject_setter<S>(&self, target: &mut S, setter: &str, request: &BeanRequest) -> ContainerResult<()>
    where
        S: SetterTarget + ?Sized,
    {
        let dependency = self.resolve(request)?;
        tracing::debug!(
            "Injecting bean '{}' through setter '{}' of '{}'",
            dependency.name(),
            setter,
            std::any::type_name::<S>()
        );
        target.apply_setter(setter, dependency)
    }
}

impl<P: BeanProvider + ?Sized> BeanProviderExt for P {}

type SingletonSlot = Arc<OnceCell<BeanInstance>>;

/// DefaultListableBeanFactory - 默认的 Bean 容器实现
///
/// 注册阶段假定只有一个线程在写；注册完成后可以并发解析。
/// 每个单例有自己的初始化槽，首次创建按名称串行，创建完成后的读取不再加创建锁。
pub struct DefaultListableBeanFactory {
    /// Bean 定义注册表
    registry: RwLock<BeanRegistry>,

    /// 单例 Bean 缓存
    singletons: RwLock<HashMap<String, SingletonSlot>>,

    /// 循环依赖检测
    creation_tracker: CreationTracker,

    /// 条件求值使用的配置环境
    environment: Arc<Environment>,

    /// 全局延迟初始化
    lazy_initialization: AtomicBool,
}

impl DefaultListableBeanFactory {
    /// 创建新的 Bean 工厂（不允许同名覆盖）
    pub fn new() -> Self {
        Self::with_environment(DuplicatePolicy::default(), Arc::new(Environment::new()))
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self::with_environment(policy, Arc::new(Environment::new()))
    }

    pub fn with_environment(policy: DuplicatePolicy, environment: Arc<Environment>) -> Self {
        Self {
            registry: RwLock::new(BeanRegistry::new(policy)),
            singletons: RwLock::new(HashMap::new()),
            creation_tracker: CreationTracker::new(),
            environment,
            lazy_initialization: AtomicBool::new(false),
        }
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.registry.read().policy()
    }

    pub fn set_duplicate_policy(&self, policy: DuplicatePolicy) {
        self.registry.write().set_policy(policy);
    }

    pub fn set_lazy_initialization(&self, lazy: bool) {
        self.lazy_initialization.store(lazy, Ordering::Relaxed);
    }

    /// 注册 Bean 定义
    ///
    /// 条件不满足时跳过注册并返回 `Ok(false)`。
    pub fn register_bean_definition(&self, definition: BeanDefinition) -> ContainerResult<bool> {
        tracing::trace!(
            "Attempting to register bean: name='{}', type='{}', scope={:?}, primary={}",
            definition.name,
            definition.produced_type_name(),
            definition.scope,
            definition.primary
        );

        {
            let registry = self.registry.read();
            let context = ConditionContext::new(&self.environment, &registry);
            if let Some(condition) = definition
                .conditions()
                .iter()
                .find(|condition| !condition.matches(&context))
            {
                tracing::debug!(
                    "Skipping bean '{}': condition {} did not match",
                    definition.name,
                    condition.describe()
                );
                return Ok(false);
            }
        }

        let name = definition.name.clone();
        let replaced = self.registry.write().register(definition)?;
        if replaced.is_some() {
            // 旧定义的单例不能再被返回
            self.singletons.write().remove(&name);
        }

        tracing::debug!("Bean definition registered successfully: '{}'", name);
        Ok(true)
    }

    /// 移除 Bean 定义及其单例缓存
    pub fn remove_bean_definition(&self, name: &str) -> ContainerResult<()> {
        self.registry
            .write()
            .remove(name)
            .ok_or_else(|| ContainerError::NoSuchBean(format!("no bean named '{}'", name)))?;
        self.singletons.write().remove(name);
        tracing::debug!("Bean definition removed: '{}'", name);
        Ok(())
    }

    /// 获取 Bean 定义的副本
    pub fn get_bean_definition(&self, name: &str) -> ContainerResult<BeanDefinition> {
        self.registry
            .read()
            .lookup_by_name(name)
            .cloned()
            .ok_or_else(|| ContainerError::NoSuchBean(format!("no bean named '{}'", name)))
    }

    /// 按注册顺序返回所有 Bean 名称
    pub fn get_bean_names(&self) -> Vec<String> {
        self.registry.read().names().to_vec()
    }

    /// 可以作为 `T` 注入的 Bean 名称（按名称排序）
    pub fn get_bean_names_for_type<T: ?Sized + 'static>(&self) -> Vec<String> {
        self.registry
            .read()
            .lookup_by_type(std::any::TypeId::of::<T>())
            .into_iter()
            .map(|def| def.name.clone())
            .collect()
    }

    pub fn get_bean_definition_count(&self) -> usize {
        self.registry.read().len()
    }

    /// 单例是否已经创建
    pub fn is_singleton_created(&self, name: &str) -> bool {
        self.singletons
            .read()
            .get(name)
            .map_or(false, |slot| slot.get().is_some())
    }

    /// 预实例化所有非延迟加载的单例 Bean（按注册顺序）
    pub fn preinstantiate_singletons(&self) -> ContainerResult<()> {
        if self.lazy_initialization.load(Ordering::Relaxed) {
            tracing::debug!("Lazy initialization enabled, skipping singleton pre-instantiation");
            return Ok(());
        }

        let bean_names: Vec<String> = self
            .registry
            .read()
            .iter()
            .filter(|def| def.scope.is_singleton() && !def.lazy)
            .map(|def| def.name.clone())
            .collect();

        tracing::debug!("Pre-instantiating {} singleton beans", bean_names.len());

        for name in bean_names {
            self.get_bean(&name)?;
        }

        Ok(())
    }

    /// 检查 depends_on 声明：缺失的依赖与循环依赖
    pub fn validate_dependencies(&self) -> ContainerResult<()> {
        let dependency_map: HashMap<String, Vec<String>> = self
            .registry
            .read()
            .iter()
            .map(|def| (def.name.clone(), def.depends_on.clone()))
            .collect();

        validate_dependency_graph(&dependency_map)
            .map_err(|e| ContainerError::DependencyValidationFailed(e.to_string()))?;

        tracing::info!(
            "Dependency validation passed for {} bean(s)",
            dependency_map.len()
        );
        Ok(())
    }

    /// 清空单例缓存
    pub fn destroy_singletons(&self) {
        let mut singletons = self.singletons.write();
        let created = singletons.values().filter(|slot| slot.get().is_some()).count();
        singletons.clear();
        tracing::info!("Destroyed {} singleton bean(s)", created);
    }

    fn singleton_slot(&self, name: &str) -> SingletonSlot {
        if let Some(slot) = self.singletons.read().get(name) {
            return Arc::clone(slot);
        }
        let mut singletons = self.singletons.write();
        Arc::clone(singletons.entry(name.to_string()).or_default())
    }

    fn enter_creation(&self, name: &str) -> ContainerResult<CreationGuard<'_>> {
        CreationGuard::enter(&self.creation_tracker, name).map_err(|chain| {
            tracing::error!(
                "Circular dependency detected while creating '{}'. Creation chain: {:?}",
                name,
                chain
            );
            ContainerError::CircularDependency(chain.join(" -> "))
        })
    }

    /// 阻塞等待另一线程初始化前检查等待环
    fn enter_wait(&self, name: &str) -> ContainerResult<WaitGuard<'_>> {
        WaitGuard::enter(&self.creation_tracker, name).map_err(|cycle| {
            tracing::error!(
                "Circular dependency across threads detected while waiting for '{}': {:?}",
                name,
                cycle
            );
            ContainerError::CircularDependency(cycle.join(" -> "))
        })
    }

    /// 按作用域返回实例：单例走缓存，原型每次新建
    fn get_or_create(&self, definition: &BeanDefinition) -> ContainerResult<BeanInstance> {
        let name = definition.name.as_str();
        match definition.scope {
            Scope::Singleton => {
                let slot = self.singleton_slot(name);
                if let Some(bean) = slot.get() {
                    tracing::debug!("Returning cached instance of singleton bean '{}'", name);
                    return Ok(Arc::clone(bean));
                }

                // 必须在进入 OnceCell 之前检测，同线程重入初始化会死锁
                let _guard = self.enter_creation(name)?;
                let _waiting = self.enter_wait(name)?;
                let bean = slot.get_or_try_init(|| {
                    let _owner = InitializingGuard::enter(&self.creation_tracker, name);
                    tracing::info!("Creating shared instance of singleton bean '{}'", name);
                    self.create_bean(definition)
                })?;
                Ok(Arc::clone(bean))
            }
            Scope::Prototype => {
                let _guard = self.enter_creation(name)?;
                tracing::debug!("Creating new instance of prototype bean '{}'", name);
                self.create_bean(definition)
            }
        }
    }

    fn create_bean(&self, definition: &BeanDefinition) -> ContainerResult<BeanInstance> {
        for dependency in &definition.depends_on {
            tracing::trace!("Bean '{}' depends on '{}'", definition.name, dependency);
            self.get_bean(dependency).map_err(|e| match e {
                ContainerError::CircularDependency(_) => e,
                other => ContainerError::BeanCreationFailed(format!(
                    "{}: dependency '{}' failed: {}",
                    definition.name, dependency, other
                )),
            })?;
        }

        definition.factory.create(self).map_err(|e| match e {
            // 保留循环依赖错误，不要包装它
            ContainerError::CircularDependency(_) => e,
            other => ContainerError::BeanCreationFailed(format!("{}: {}", definition.name, other)),
        })
    }

    fn lookup(&self, request: &BeanRequest) -> ContainerResult<BeanDefinition> {
        let registry = self.registry.read();
        resolver::resolve_definition(&registry, request).map(BeanDefinition::clone)
    }

    fn to_resolved(
        &self,
        definition: &BeanDefinition,
        request: &BeanRequest,
    ) -> ContainerResult<ResolvedBean> {
        let instance = self.get_or_create(definition)?;
        let value = definition
            .capability(request.type_id())
            .and_then(|capability| capability.cast(instance))
            .ok_or_else(|| ContainerError::TypeMismatch {
                name: definition.name.clone(),
                expected: request.type_name().to_string(),
                found: definition.produced_type_name().to_string(),
            })?;
        Ok(ResolvedBean::new(
            definition.name.clone(),
            request.type_name(),
            value,
        ))
    }
}

impl Default for DefaultListableBeanFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BeanProvider for DefaultListableBeanFactory {
    fn resolve(&self, request: &BeanRequest) -> ContainerResult<ResolvedBean> {
        tracing::trace!("Requesting bean for {}", request);
        let definition = self.lookup(request).map_err(|e| {
            tracing::debug!("Resolution failed for {}: {}", request, e);
            e
        })?;
        self.to_resolved(&definition, request)
    }

    fn resolve_all(&self, request: &BeanRequest) -> ContainerResult<Vec<ResolvedBean>> {
        let definitions: Vec<BeanDefinition> = {
            let registry = self.registry.read();
            let candidates = match request.qualifier() {
                Some(qualifier) => registry.lookup_by_qualifier(request.type_id(), qualifier),
                None => registry.lookup_by_type(request.type_id()),
            };
            candidates.into_iter().cloned().collect()
        };

        definitions
            .iter()
            .map(|definition| self.to_resolved(definition, request))
            .collect()
    }

    fn get_bean(&self, name: &str) -> ContainerResult<BeanInstance> {
        tracing::trace!("Requesting bean: '{}'", name);
        let definition = self.registry.read().lookup_by_name(name).cloned().ok_or_else(|| {
            tracing::debug!("Bean '{}' not found in container", name);
            ContainerError::NoSuchBean(format!("no bean named '{}'", name))
        })?;
        self.get_or_create(&definition)
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.registry.read().contains(name)
    }
}

/// 按具体类型取回 `get_bean` 的结果
pub fn downcast_bean<T: Any + Send + Sync>(name: &str, bean: BeanInstance) -> ContainerResult<Arc<T>> {
    bean.downcast::<T>().map_err(|_| ContainerError::TypeMismatch {
        name: name.to_string(),
        expected: std::any::type_name::<T>().to_string(),
        found: "unknown".to_string(),
    })
}
