//! Bean 定义注册表
//!
//! 名称到 [`BeanDefinition`] 的映射，保留注册顺序。
//! 注册表本身不做同步，由持有它的 Bean 工厂负责加锁。

use std::any::TypeId;
use std::collections::HashMap;

use crate::bean::BeanDefinition;
use crate::error::{ContainerError, ContainerResult};

/// 同名 Bean 再次注册时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// 拒绝注册，返回 [`ContainerError::DuplicateName`]
    #[default]
    Reject,

    /// 后注册的覆盖先注册的
    Override,
}

impl DuplicatePolicy {
    pub fn from_allow_overriding(allow: bool) -> Self {
        if allow {
            DuplicatePolicy::Override
        } else {
            DuplicatePolicy::Reject
        }
    }
}

#[derive(Debug, Default)]
pub struct BeanRegistry {
    policy: DuplicatePolicy,
    definitions: HashMap<String, BeanDefinition>,
    order: Vec<String>,
}

impl BeanRegistry {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            definitions: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: DuplicatePolicy) {
        self.policy = policy;
    }

    /// 注册 Bean 定义
    ///
    /// 覆盖策略下返回被替换掉的旧定义。
    pub fn register(
        &mut self,
        definition: BeanDefinition,
    ) -> ContainerResult<Option<BeanDefinition>> {
        let produced = definition.produced_type_id();
        if let Some(capability) = definition
            .capabilities()
            .iter()
            .find(|c| c.source_type_id() != produced)
        {
            return Err(ContainerError::TypeMismatch {
                name: definition.name.clone(),
                expected: capability.type_name().to_string(),
                found: definition.produced_type_name().to_string(),
            });
        }

        let name = definition.name.clone();
        if self.definitions.contains_key(&name) {
            match self.policy {
                DuplicatePolicy::Reject => {
                    tracing::warn!("Bean '{}' already exists, registration failed", name);
                    return Err(ContainerError::DuplicateName(name));
                }
                DuplicatePolicy::Override => {
                    tracing::warn!(
                        "Overriding bean definition '{}' with type '{}'",
                        name,
                        definition.produced_type_name()
                    );
                    return Ok(self.definitions.insert(name, definition));
                }
            }
        }

        self.order.push(name.clone());
        self.definitions.insert(name, definition);
        Ok(None)
    }

    /// 按名称查找
    pub fn lookup_by_name(&self, name: &str) -> Option<&BeanDefinition> {
        self.definitions.get(name)
    }

    /// 所有可以作为给定类型注入的 Bean，按名称排序
    pub fn lookup_by_type(&self, type_id: TypeId) -> Vec<&BeanDefinition> {
        let mut found: Vec<&BeanDefinition> = self
            .definitions
            .values()
            .filter(|def| def.has_capability(type_id))
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    /// 类型兼容且限定符匹配的 Bean，按名称排序
    pub fn lookup_by_qualifier(&self, type_id: TypeId, qualifier: &str) -> Vec<&BeanDefinition> {
        self.lookup_by_type(type_id)
            .into_iter()
            .filter(|def| def.matches_qualifier(qualifier))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<BeanDefinition> {
        let removed = self.definitions.remove(name)?;
        self.order.retain(|n| n != name);
        Some(removed)
    }

    /// 按注册顺序返回所有名称
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// 按注册顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &BeanDefinition> {
        self.order.iter().filter_map(|name| self.definitions.get(name))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Person {
        name: &'static str,
    }

    trait Named: Send + Sync {}
    impl Named for Person {}

    fn person(bean: &str, name: &'static str) -> BeanDefinition {
        BeanDefinition::from_fn(bean, move || Ok(Person { name }))
    }

    #[test]
    fn test_reject_policy_fails_on_duplicate() {
        let mut registry = BeanRegistry::new(DuplicatePolicy::Reject);
        registry.register(person("zhangsan", "张三2").primary()).unwrap();

        let err = registry.register(person("zhangsan", "张三1")).unwrap_err();
        assert!(matches!(err, ContainerError::DuplicateName(ref n) if n == "zhangsan"));
        assert!(registry.lookup_by_name("zhangsan").unwrap().primary);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_override_policy_keeps_last_and_original_position() {
        let mut registry = BeanRegistry::new(DuplicatePolicy::Override);
        registry.register(person("zhangsan", "张三2").primary()).unwrap();
        registry.register(person("lisi", "李四")).unwrap();

        let replaced = registry.register(person("zhangsan", "张三1")).unwrap();
        assert!(replaced.unwrap().primary);
        assert!(!registry.lookup_by_name("zhangsan").unwrap().primary);
        assert_eq!(registry.names(), &["zhangsan".to_string(), "lisi".to_string()]);
    }

    #[test]
    fn test_lookup_by_type_is_sorted() {
        let mut registry = BeanRegistry::default();
        registry.register(person("joseph", "乔布斯")).unwrap();
        registry.register(person("bill", "比尔盖茨")).unwrap();
        registry
            .register(BeanDefinition::from_fn("answer", || Ok(42_u32)))
            .unwrap();

        let names: Vec<&str> = registry
            .lookup_by_type(TypeId::of::<Person>())
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["bill", "joseph"]);
        assert!(registry.lookup_by_type(TypeId::of::<String>()).is_empty());
    }

    #[test]
    fn test_lookup_by_qualifier_uses_tag_then_name() {
        let mut registry = BeanRegistry::default();
        registry.register(person("bill", "比尔盖茨").with_qualifier("windows")).unwrap();
        registry.register(person("joseph", "乔布斯")).unwrap();

        let by_tag = registry.lookup_by_qualifier(TypeId::of::<Person>(), "windows");
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].name, "bill");

        let by_name = registry.lookup_by_qualifier(TypeId::of::<Person>(), "joseph");
        assert_eq!(by_name.len(), 1);

        // 有自己的限定符时不再按名称匹配
        assert!(registry.lookup_by_qualifier(TypeId::of::<Person>(), "bill").is_empty());
    }

    #[test]
    fn test_alias_types_are_found() {
        let mut registry = BeanRegistry::default();
        registry
            .register(person("bill", "比尔盖茨").provides(|p: Arc<Person>| p as Arc<dyn Named>))
            .unwrap();

        assert_eq!(registry.lookup_by_type(TypeId::of::<dyn Named>()).len(), 1);
    }

    #[test]
    fn test_remove_drops_from_order() {
        let mut registry = BeanRegistry::default();
        registry.register(person("bill", "比尔盖茨")).unwrap();
        registry.register(person("lisi", "李四")).unwrap();

        let removed = registry.remove("bill").unwrap();
        assert_eq!(removed.name, "bill");
        assert_eq!(registry.names(), &["lisi".to_string()]);
        assert!(registry.remove("bill").is_none());
    }
}
