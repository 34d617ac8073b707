use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::bean_factory::BeanProvider;
use crate::condition::Condition;
use crate::{ContainerResult, Scope};

/// 容器内部持有的 Bean 实例
pub type BeanInstance = Arc<dyn Any + Send + Sync>;

/// 对象工厂 trait - 用于创建 Bean 实例
///
/// 工厂拿到一个 [`BeanProvider`]，需要依赖其他 Bean 的工厂可以从中解析依赖；
/// 零参数工厂直接忽略它。
pub trait ObjectFactory: Send + Sync {
    /// 创建 Bean 实例
    fn create(&self, provider: &dyn BeanProvider) -> ContainerResult<BeanInstance>;

    /// 产出实例的类型 ID
    fn produced_type_id(&self) -> TypeId;

    /// 产出实例的类型名称
    fn produced_type_name(&self) -> &'static str;
}

/// 零参数函数工厂
pub struct FunctionFactory<T, F> {
    factory_fn: F,
    _phantom: PhantomData<fn() -> T>,
}

impl<T, F> FunctionFactory<T, F>
where
    T: Any + Send + Sync,
    F: Fn() -> ContainerResult<T> + Send + Sync,
{
    pub fn new(factory_fn: F) -> Self {
        Self {
            factory_fn,
            _phantom: PhantomData,
        }
    }
}

impl<T, F> ObjectFactory for FunctionFactory<T, F>
where
    T: Any + Send + Sync,
    F: Fn() -> ContainerResult<T> + Send + Sync,
{
    fn create(&self, _provider: &dyn BeanProvider) -> ContainerResult<BeanInstance> {
        let instance = (self.factory_fn)()?;
        Ok(Arc::new(instance))
    }

    fn produced_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn produced_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// 可以从容器解析依赖的函数工厂（构造器注入）
pub struct ProviderFactory<T, F> {
    factory_fn: F,
    _phantom: PhantomData<fn() -> T>,
}

impl<T, F> ProviderFactory<T, F>
where
    T: Any + Send + Sync,
    F: Fn(&dyn BeanProvider) -> ContainerResult<T> + Send + Sync,
{
    pub fn new(factory_fn: F) -> Self {
        Self {
            factory_fn,
            _phantom: PhantomData,
        }
    }
}

impl<T, F> ObjectFactory for ProviderFactory<T, F>
where
    T: Any + Send + Sync,
    F: Fn(&dyn BeanProvider) -> ContainerResult<T> + Send + Sync,
{
    fn create(&self, provider: &dyn BeanProvider) -> ContainerResult<BeanInstance> {
        let instance = (self.factory_fn)(provider)?;
        Ok(Arc::new(instance))
    }

    fn produced_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn produced_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// 已经构建好的实例，注册后作为单例返回同一个 `Arc`
pub struct InstanceFactory<T> {
    instance: Arc<T>,
}

impl<T: Any + Send + Sync> InstanceFactory<T> {
    pub fn new(instance: Arc<T>) -> Self {
        Self { instance }
    }
}

impl<T: Any + Send + Sync> ObjectFactory for InstanceFactory<T> {
    fn create(&self, _provider: &dyn BeanProvider) -> ContainerResult<BeanInstance> {
        Ok(Arc::clone(&self.instance) as BeanInstance)
    }

    fn produced_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn produced_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

type CastFn = Arc<dyn Fn(BeanInstance) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// Bean 可以被注入成的类型
///
/// 每个 Bean 至少拥有自身具体类型这一项能力，还可以通过
/// [`BeanDefinition::provides`] 声明可以作为 `dyn Trait` 注入。
/// `cast` 返回的 `Box` 里装的是目标类型的 `Arc<I>`。
#[derive(Clone)]
pub struct Capability {
    type_id: TypeId,
    type_name: &'static str,
    source_type_id: TypeId,
    cast: CastFn,
}

impl Capability {
    /// 具体类型自身
    pub fn of<T: Any + Send + Sync>() -> Self {
        let cast: CastFn = Arc::new(|instance: BeanInstance| {
            instance
                .downcast::<T>()
                .ok()
                .map(|typed| Box::new(typed) as Box<dyn Any + Send + Sync>)
        });
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            source_type_id: TypeId::of::<T>(),
            cast,
        }
    }

    /// `T` 作为 `I`（通常是 `dyn Trait`）注入
    pub fn alias<T, I, F>(convert: F) -> Self
    where
        T: Any + Send + Sync,
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        let cast: CastFn = Arc::new(move |instance: BeanInstance| {
            instance
                .downcast::<T>()
                .ok()
                .map(|typed| Box::new(convert(typed)) as Box<dyn Any + Send + Sync>)
        });
        Self {
            type_id: TypeId::of::<I>(),
            type_name: std::any::type_name::<I>(),
            source_type_id: TypeId::of::<T>(),
            cast,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn source_type_id(&self) -> TypeId {
        self.source_type_id
    }

    pub(crate) fn cast(&self, instance: BeanInstance) -> Option<Box<dyn Any + Send + Sync>> {
        (self.cast)(instance)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Bean 定义 - 描述如何创建和管理 Bean
///
/// 注册之后不再修改；同名比较即相等。
#[derive(Clone)]
pub struct BeanDefinition {
    /// Bean 的名称
    pub name: String,

    /// Bean 的作用域
    pub scope: Scope,

    /// 是否为主候选（@Primary）
    pub primary: bool,

    /// 限定符（@Qualifier）
    pub qualifier: Option<String>,

    /// 是否延迟初始化（仅对单例有效）
    pub lazy: bool,

    /// 创建前必须先创建的 Bean（@DependsOn）
    pub depends_on: Vec<String>,

    /// Bean 工厂
    pub factory: Arc<dyn ObjectFactory>,

    capabilities: Vec<Capability>,

    conditions: Vec<Arc<dyn Condition>>,
}

impl BeanDefinition {
    /// 创建新的 Bean 定义
    pub fn new<T, F>(name: impl Into<String>, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: ObjectFactory + 'static,
    {
        debug_assert_eq!(factory.produced_type_id(), TypeId::of::<T>());
        Self {
            name: name.into(),
            scope: Scope::default(),
            primary: false,
            qualifier: None,
            lazy: false,
            depends_on: Vec::new(),
            factory: Arc::new(factory),
            capabilities: vec![Capability::of::<T>()],
            conditions: Vec::new(),
        }
    }

    /// 零参数工厂
    pub fn from_fn<T, F>(name: impl Into<String>, factory_fn: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> ContainerResult<T> + Send + Sync + 'static,
    {
        Self::new::<T, _>(name, FunctionFactory::new(factory_fn))
    }

    /// 需要从容器解析依赖的工厂
    pub fn from_provider<T, F>(name: impl Into<String>, factory_fn: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&dyn BeanProvider) -> ContainerResult<T> + Send + Sync + 'static,
    {
        Self::new::<T, _>(name, ProviderFactory::new(factory_fn))
    }

    /// 已有实例
    pub fn from_instance<T>(name: impl Into<String>, instance: Arc<T>) -> Self
    where
        T: Any + Send + Sync,
    {
        Self::new::<T, _>(name, InstanceFactory::new(instance))
    }

    /// 设置作用域
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// 标记为主候选
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    /// 设置限定符
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// 设置延迟初始化
    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// 声明创建顺序上的依赖
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    /// 声明 Bean 还可以作为 `I` 注入
    pub fn provides<T, I, F>(mut self, convert: F) -> Self
    where
        T: Any + Send + Sync,
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        let capability = Capability::alias::<T, I, F>(convert);
        if !self.has_capability(capability.type_id()) {
            self.capabilities.push(capability);
        }
        self
    }

    /// 添加注册条件（@Conditional），全部满足时才会注册
    pub fn with_condition<C>(mut self, condition: C) -> Self
    where
        C: Condition + 'static,
    {
        self.conditions.push(Arc::new(condition));
        self
    }

    pub fn produced_type_id(&self) -> TypeId {
        self.factory.produced_type_id()
    }

    pub fn produced_type_name(&self) -> &'static str {
        self.factory.produced_type_name()
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn capability(&self, type_id: TypeId) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.type_id == type_id)
    }

    /// 是否可以作为给定类型注入
    pub fn has_capability(&self, type_id: TypeId) -> bool {
        self.capability(type_id).is_some()
    }

    /// 限定符匹配：Bean 自带限定符时比较限定符，否则退回到比较 Bean 名称
    pub fn matches_qualifier(&self, qualifier: &str) -> bool {
        match &self.qualifier {
            Some(own) => own == qualifier,
            None => self.name == qualifier,
        }
    }

    pub(crate) fn conditions(&self) -> &[Arc<dyn Condition>] {
        &self.conditions
    }
}

impl PartialEq for BeanDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for BeanDefinition {}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("primary", &self.primary)
            .field("qualifier", &self.qualifier)
            .field("lazy", &self.lazy)
            .field("depends_on", &self.depends_on)
            .field("type_name", &self.produced_type_name())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}
