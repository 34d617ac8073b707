//! 构造器注入与 setter 注入的辅助类型

use std::any::Any;
use std::sync::Arc;

use crate::error::{ContainerError, ContainerResult};

/// 解析结果：选中的 Bean 名称及其按请求类型转换后的实例
pub struct ResolvedBean {
    name: String,
    type_name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

impl ResolvedBean {
    pub(crate) fn new(
        name: impl Into<String>,
        type_name: &'static str,
        value: Box<dyn Any + Send + Sync>,
    ) -> Self {
        Self {
            name: name.into(),
            type_name,
            value,
        }
    }

    /// 被选中的 Bean 名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 取出 `Arc<T>`，`T` 必须是请求时的类型
    pub fn into_arc<T: ?Sized + Send + Sync + 'static>(self) -> ContainerResult<Arc<T>> {
        let Self {
            name,
            type_name,
            value,
        } = self;
        value
            .downcast::<Arc<T>>()
            .map(|typed| *typed)
            .map_err(|_| ContainerError::TypeMismatch {
                name,
                expected: std::any::type_name::<T>().to_string(),
                found: type_name.to_string(),
            })
    }
}

impl std::fmt::Debug for ResolvedBean {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedBean")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// 构造器参数，按请求顺序依次取出
#[derive(Debug)]
pub struct ResolvedArgs {
    beans: std::vec::IntoIter<ResolvedBean>,
}

impl ResolvedArgs {
    pub(crate) fn new(beans: Vec<ResolvedBean>) -> Self {
        Self {
            beans: beans.into_iter(),
        }
    }

    /// 取出下一个参数
    pub fn take<T: ?Sized + Send + Sync + 'static>(&mut self) -> ContainerResult<Arc<T>> {
        self.beans
            .next()
            .ok_or_else(|| {
                ContainerError::BeanCreationFailed(format!(
                    "constructor asked for more arguments than were requested (next: '{}')",
                    std::any::type_name::<T>()
                ))
            })?
            .into_arc()
    }

    pub fn remaining(&self) -> usize {
        self.beans.len()
    }
}

/// 支持按名称 setter 注入的类型
///
/// ```ignore
/// impl SetterTarget for UserDao {
///     fn apply_setter(&mut self, setter: &str, dependency: ResolvedBean) -> ContainerResult<()> {
///         match setter {
///             "set_dog" => self.dog = Some(dependency.into_arc::<Dog>()?),
///             _ => return Err(unknown_setter::<Self>(setter)),
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait SetterTarget {
    fn apply_setter(&mut self, setter: &str, dependency: ResolvedBean) -> ContainerResult<()>;
}

/// `apply_setter` 遇到不认识的 setter 时返回的错误
pub fn unknown_setter<T: ?Sized>(setter: &str) -> ContainerError {
    ContainerError::UnknownSetter {
        target: std::any::type_name::<T>().to_string(),
        setter: setter.to_string(),
    }
}
