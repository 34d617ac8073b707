//! 注入点解析
//!
//! 给定一个 [`BeanRequest`]，从注册表中选出唯一的 Bean 定义。
//!
//! 优先级：精确名称 > 限定符 > primary > 报错。

use std::any::TypeId;
use std::fmt;

use crate::bean::BeanDefinition;
use crate::error::{ContainerError, ContainerResult};
use crate::registry::BeanRegistry;

/// 注入请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeanRequest {
    type_id: TypeId,
    type_name: &'static str,
    qualifier: Option<String>,
    name: Option<String>,
}

impl BeanRequest {
    /// 按类型请求
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            qualifier: None,
            name: None,
        }
    }

    /// 同时指定 Bean 名称
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 同时指定限定符（@Qualifier）
    pub fn qualified(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for BeanRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type '{}'", self.type_name)?;
        if let Some(name) = &self.name {
            write!(f, " named '{}'", name)?;
        }
        if let Some(qualifier) = &self.qualifier {
            write!(f, " qualified '{}'", qualifier)?;
        }
        Ok(())
    }
}

/// 为请求选出唯一的 Bean 定义
pub fn resolve_definition<'r>(
    registry: &'r BeanRegistry,
    request: &BeanRequest,
) -> ContainerResult<&'r BeanDefinition> {
    if let Some(name) = request.name() {
        let definition = registry
            .lookup_by_name(name)
            .ok_or_else(|| ContainerError::NoSuchBean(format!("no bean named '{}'", name)))?;

        if !definition.has_capability(request.type_id()) {
            return Err(ContainerError::TypeMismatch {
                name: name.to_string(),
                expected: request.type_name().to_string(),
                found: definition.produced_type_name().to_string(),
            });
        }
        return Ok(definition);
    }

    let candidates = match request.qualifier() {
        Some(qualifier) => {
            let matched = registry.lookup_by_qualifier(request.type_id(), qualifier);
            if matched.is_empty() {
                return Err(ContainerError::NoSuchBean(format!(
                    "no bean of {} matches qualifier '{}'",
                    request, qualifier
                )));
            }
            matched
        }
        None => registry.lookup_by_type(request.type_id()),
    };

    select_candidate(candidates, request)
}

fn select_candidate<'r>(
    candidates: Vec<&'r BeanDefinition>,
    request: &BeanRequest,
) -> ContainerResult<&'r BeanDefinition> {
    match candidates.as_slice() {
        [] => Err(ContainerError::NoSuchBean(format!("no bean of {}", request))),
        [only] => Ok(*only),
        _ => {
            let mut primaries = candidates.iter().filter(|def| def.primary);
            match (primaries.next(), primaries.next()) {
                (Some(primary), None) => {
                    tracing::debug!(
                        "Selected primary bean '{}' among {} candidates for {}",
                        primary.name,
                        candidates.len(),
                        request
                    );
                    Ok(*primary)
                }
                _ => Err(ContainerError::AmbiguousBean {
                    requested: request.to_string(),
                    // lookup_by_type 已经按名称排好序
                    candidates: candidates.iter().map(|def| def.name.clone()).collect(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DuplicatePolicy;
    use proptest::prelude::*;

    struct Person;
    struct Dog;

    fn person(name: &str) -> BeanDefinition {
        BeanDefinition::from_fn(name, || Ok(Person))
    }

    fn registry_of(definitions: Vec<BeanDefinition>) -> BeanRegistry {
        let mut registry = BeanRegistry::new(DuplicatePolicy::Reject);
        for def in definitions {
            registry.register(def).unwrap();
        }
        registry
    }

    #[test]
    fn test_single_candidate_is_returned() {
        let registry = registry_of(vec![person("lisi")]);
        let def = resolve_definition(&registry, &BeanRequest::of::<Person>()).unwrap();
        assert_eq!(def.name, "lisi");
    }

    #[test]
    fn test_no_candidate_fails() {
        let registry = registry_of(vec![person("lisi")]);
        let err = resolve_definition(&registry, &BeanRequest::of::<Dog>()).unwrap_err();
        assert!(matches!(err, ContainerError::NoSuchBean(_)));
    }

    #[test]
    fn test_ambiguous_lists_candidates_alphabetically() {
        let registry = registry_of(vec![person("lisi"), person("bill"), person("joseph")]);
        let err = resolve_definition(&registry, &BeanRequest::of::<Person>()).unwrap_err();

        match err {
            ContainerError::AmbiguousBean { candidates, .. } => {
                assert_eq!(candidates, vec!["bill", "joseph", "lisi"]);
            }
            other => panic!("expected AmbiguousBean, got {:?}", other),
        }
    }

    #[test]
    fn test_primary_breaks_tie() {
        let registry = registry_of(vec![person("bill"), person("joseph"), person("zhangsan").primary()]);
        let def = resolve_definition(&registry, &BeanRequest::of::<Person>()).unwrap();
        assert_eq!(def.name, "zhangsan");
    }

    #[test]
    fn test_two_primaries_are_ambiguous() {
        let registry = registry_of(vec![person("bill").primary(), person("joseph").primary()]);
        let err = resolve_definition(&registry, &BeanRequest::of::<Person>()).unwrap_err();
        assert!(matches!(err, ContainerError::AmbiguousBean { .. }));
    }

    #[test]
    fn test_qualifier_beats_primary() {
        let registry = registry_of(vec![person("bill").primary(), person("joseph")]);
        let def =
            resolve_definition(&registry, &BeanRequest::of::<Person>().qualified("joseph")).unwrap();
        assert_eq!(def.name, "joseph");
    }

    #[test]
    fn test_qualifier_without_match_fails() {
        let registry = registry_of(vec![person("bill")]);
        let err = resolve_definition(&registry, &BeanRequest::of::<Person>().qualified("steve"))
            .unwrap_err();
        assert!(matches!(err, ContainerError::NoSuchBean(_)));
    }

    #[test]
    fn test_shared_qualifier_falls_back_to_primary() {
        let registry = registry_of(vec![
            person("bill").with_qualifier("founder"),
            person("joseph").with_qualifier("founder").primary(),
            person("lisi"),
        ]);
        let def =
            resolve_definition(&registry, &BeanRequest::of::<Person>().qualified("founder")).unwrap();
        assert_eq!(def.name, "joseph");
    }

    #[test]
    fn test_name_takes_precedence() {
        let registry = registry_of(vec![person("bill"), person("zhangsan").primary()]);
        let def = resolve_definition(&registry, &BeanRequest::of::<Person>().named("bill")).unwrap();
        assert_eq!(def.name, "bill");

        let err = resolve_definition(&registry, &BeanRequest::of::<Person>().named("steve"))
            .unwrap_err();
        assert!(matches!(err, ContainerError::NoSuchBean(_)));
    }

    #[test]
    fn test_name_with_wrong_type_is_mismatch() {
        let registry = registry_of(vec![person("bill")]);
        let err = resolve_definition(&registry, &BeanRequest::of::<Dog>().named("bill")).unwrap_err();
        assert!(matches!(err, ContainerError::TypeMismatch { .. }));
    }

    #[test]
    fn test_request_display() {
        let request = BeanRequest::of::<u32>().named("answer").qualified("deep");
        assert_eq!(request.to_string(), "type 'u32' named 'answer' qualified 'deep'");
    }

    proptest! {
        #[test]
        fn primary_wins_regardless_of_registration_order(
            names in proptest::sample::subsequence(
                vec!["bill", "joseph", "lisi", "wangwu", "zhaoliu"], 2..=5
            ).prop_shuffle(),
            primary_index in 0usize..5,
        ) {
            let primary_index = primary_index % names.len();
            let definitions = names
                .iter()
                .enumerate()
                .map(|(i, name)| person(name).with_primary(i == primary_index))
                .collect();
            let registry = registry_of(definitions);

            let def = resolve_definition(&registry, &BeanRequest::of::<Person>()).unwrap();
            prop_assert_eq!(def.name.as_str(), names[primary_index]);
        }
    }
}
