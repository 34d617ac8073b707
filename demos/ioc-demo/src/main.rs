use sprig_core::prelude::*;

mod config;
mod dao;
mod model;

use config::AppConfig;
use dao::UserDao;
use model::{Dog, Person};

fn main() -> anyhow::Result<()> {
    let config_paths = ["demos/ioc-demo/application.toml", "application.toml"];
    let config_file = config_paths
        .iter()
        .find(|path| std::path::Path::new(path).exists())
        .copied()
        .unwrap_or("application.toml");

    let context = Application::new("ioc-demo")
        .config_file(config_file)
        .env_prefix("APP_")
        .configuration(AppConfig)
        .run()?;

    println!("\n==================== 容器中的组件 ====================");
    for name in context.get_bean_names() {
        let definition = context.get_bean_definition(&name)?;
        println!(
            "{:<10} scope={:?} primary={}",
            name, definition.scope, definition.primary
        );
    }

    println!("\n==================== 按类型获取 ====================");
    // 多个 Person，取 primary；zhangsan 被覆盖后 primary 由配置决定
    match context.get_bean_by_type::<Person>() {
        Ok(person) => println!("Person: {}", person),
        Err(e) => println!("Person: {}", e),
    }

    // 两只狗都不是 primary
    match context.get_bean_by_type::<Dog>() {
        Ok(dog) => println!("Dog: {}", dog),
        Err(e) => println!("Dog: {}", e),
    }

    println!("\n==================== 按名称获取 ====================");
    let zhangsan = context.get_bean_by_name::<Person>("zhangsan")?;
    let again = context.get_bean_by_name::<Person>("zhangsan")?;
    println!("zhangsan: {}", zhangsan);
    println!("单例: {}", std::sync::Arc::ptr_eq(&zhangsan, &again));

    for (name, dog) in context.get_beans_of_type::<Dog>()? {
        println!("{}: {}", name, dog);
    }

    println!("\n==================== 依赖注入 ====================");
    let user_dao = context.get_bean_by_type::<UserDao>()?;
    println!("{}", user_dao);

    let constructed = context.inject_constructor(
        &[BeanRequest::of::<Dog>().qualified("dog01")],
        |mut args| Ok(UserDao::new(args.take::<Dog>()?)),
    )?;
    println!("{}", constructed);
    tracing::debug!("Constructed dao holds {:?}", constructed.dog());

    context.shutdown();
    Ok(())
}
