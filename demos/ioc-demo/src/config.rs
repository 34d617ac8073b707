//! 配置类：每个方法对应一个 `@Bean`

use sprig_core::prelude::*;
use sprig_core::utils::naming::default_bean_name;

use crate::dao::UserDao;
use crate::model::{Dog, Person};

/// 人员配置
///
/// joseph 只在 macOS 上注册，bill 只在 Windows 上注册；
/// zhangsan 注册两次，是否允许覆盖由 `container.allow-bean-definition-overriding` 决定。
pub struct PersonConfig;

impl Configuration for PersonConfig {
    fn name(&self) -> &str {
        "personConfig"
    }

    fn register_beans(&self, context: &ApplicationContext) -> ContainerResult<()> {
        context.register(
            BeanDefinition::from_fn("joseph", || Ok(Person::new("乔布斯")))
                .with_condition(on_os("macos")),
        )?;
        context.register(
            BeanDefinition::from_fn("bill", || Ok(Person::new("比尔盖茨")))
                .with_condition(on_os("windows")),
        )?;
        context.register_factory("zhangsan", Scope::Singleton, true, None, || {
            Ok(Person::new("张三2"))
        })?;
        context.register_singleton("zhangsan", || Ok(Person::new("张三1")))?;
        context.register_singleton("lisi", || Ok(Person::new("李四")))?;
        Ok(())
    }
}

/// 狗配置
pub struct DogConfig;

impl Configuration for DogConfig {
    fn name(&self) -> &str {
        "dogConfig"
    }

    fn register_beans(&self, context: &ApplicationContext) -> ContainerResult<()> {
        context.register_singleton("dog01", || Ok(Dog::new("大狗")))?;
        context.register_singleton("dog02", || Ok(Dog::new("2狗")))?;
        Ok(())
    }
}

/// DAO 配置：userDao 通过 setter 注入 dog02
pub struct DaoConfig;

impl Configuration for DaoConfig {
    fn name(&self) -> &str {
        "daoConfig"
    }

    fn register_beans(&self, context: &ApplicationContext) -> ContainerResult<()> {
        context.register(
            BeanDefinition::from_provider(default_bean_name::<UserDao>(), |provider| {
                let mut dao = UserDao::default();
                provider.inject_setter(
                    &mut dao,
                    "set_dog",
                    &BeanRequest::of::<Dog>().qualified("dog02"),
                )?;
                Ok(dao)
            })
            .with_lazy(true),
        )?;
        Ok(())
    }
}

/// 根配置，导入其余配置类
pub struct AppConfig;

impl Configuration for AppConfig {
    fn name(&self) -> &str {
        "appConfig"
    }

    fn register_beans(&self, _context: &ApplicationContext) -> ContainerResult<()> {
        Ok(())
    }

    fn imports(&self) -> Vec<Box<dyn Configuration>> {
        vec![Box::new(PersonConfig), Box::new(DogConfig), Box::new(DaoConfig)]
    }
}
