use std::fmt;
use std::sync::Arc;

use sprig_core::prelude::*;

use crate::model::Dog;

/// 通过 setter 注入持有一只狗
#[derive(Debug, Default)]
pub struct UserDao {
    dog: Option<Arc<Dog>>,
}

impl UserDao {
    /// 构造器注入
    pub fn new(dog: Arc<Dog>) -> Self {
        println!("UserDao...有参构造器：{}", dog);
        Self { dog: Some(dog) }
    }

    pub fn set_dog(&mut self, dog: Arc<Dog>) {
        println!("setDog...{}", dog);
        self.dog = Some(dog);
    }

    pub fn dog(&self) -> Option<&Arc<Dog>> {
        self.dog.as_ref()
    }
}

impl SetterTarget for UserDao {
    fn apply_setter(&mut self, setter: &str, dependency: ResolvedBean) -> ContainerResult<()> {
        match setter {
            "set_dog" => self.set_dog(dependency.into_arc()?),
            _ => return Err(unknown_setter::<Self>(setter)),
        }
        Ok(())
    }
}

impl fmt::Display for UserDao {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dog {
            Some(dog) => write!(f, "UserDao(haha={})", dog),
            None => write!(f, "UserDao(haha=null)"),
        }
    }
}
