//! Utility functions for the container

/// Naming convention utilities for bean names
pub mod naming {
    /// Converts a PascalCase type name to camelCase for bean naming.
    ///
    /// ```
    /// use sprig_core::utils::naming::to_camel_case;
    ///
    /// assert_eq!(to_camel_case("UserDao"), "userDao");
    /// assert_eq!(to_camel_case("A"), "a");
    /// assert_eq!(to_camel_case(""), "");
    /// ```
    pub fn to_camel_case(s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(first) => {
                let mut result = String::with_capacity(s.len());
                result.extend(first.to_lowercase());
                result.push_str(chars.as_str());
                result
            }
        }
    }

    /// Default bean name for a type: the last path segment, generics stripped,
    /// in camelCase. `my_app::dao::UserDao` becomes `userDao`.
    pub fn default_bean_name<T: ?Sized>() -> String {
        let full = std::any::type_name::<T>();
        let without_generics = full.split('<').next().unwrap_or(full);
        let short = without_generics
            .rsplit("::")
            .next()
            .unwrap_or(without_generics);
        to_camel_case(short)
    }
}

/// Dependency resolution utilities
pub mod dependency {
    use std::collections::{HashMap, HashSet};
    use std::thread::{self, ThreadId};

    use parking_lot::Mutex;

    /// Tracks the beans each thread is currently creating.
    ///
    /// Chains are kept per thread: two threads racing to create the same
    /// singleton is not a cycle, a factory on one thread asking for a bean
    /// that thread is already building is.
    ///
    /// Cycles spanning threads are caught through a wait-for graph. Each
    /// singleton under construction records its owning thread, and each
    /// thread about to block on a singleton records which one. A wait that
    /// would close a loop back to the waiting thread is refused.
    #[derive(Debug, Default)]
    pub struct CreationTracker {
        state: Mutex<TrackerState>,
    }

    #[derive(Debug, Default)]
    struct TrackerState {
        chains: HashMap<ThreadId, Vec<String>>,
        owners: HashMap<String, ThreadId>,
        waiting: HashMap<ThreadId, String>,
    }

    impl TrackerState {
        /// Follows owner and wait edges starting at `name`. Returns the
        /// beans along the way when the walk ends at `current`.
        fn wait_cycle(&self, current: ThreadId, name: &str) -> Option<Vec<String>> {
            let mut path = vec![name.to_string()];
            let mut next = name;
            // 每个线程至多等待一个 bean，步数不会超过线程数
            for _ in 0..=self.waiting.len() {
                let owner = *self.owners.get(next)?;
                if owner == current {
                    let mut cycle = vec![next.to_string()];
                    cycle.extend(path.iter().take(path.len() - 1).cloned());
                    cycle.push(next.to_string());
                    return Some(cycle);
                }
                next = self.waiting.get(&owner)?.as_str();
                path.push(next.to_string());
            }
            None
        }
    }

    impl CreationTracker {
        pub fn new() -> Self {
            Self::default()
        }

        /// Marks `name` as being created on the current thread.
        ///
        /// Returns the full chain (ending in `name`) when the current thread is
        /// already creating it.
        pub fn start_creating(&self, name: &str) -> Result<(), Vec<String>> {
            let mut state = self.state.lock();
            let chain = state.chains.entry(thread::current().id()).or_default();
            if chain.iter().any(|n| n == name) {
                let mut cycle = chain.clone();
                cycle.push(name.to_string());
                return Err(cycle);
            }
            chain.push(name.to_string());
            Ok(())
        }

        /// Marks `name` as finished on the current thread.
        pub fn finish_creating(&self, name: &str) {
            let mut state = self.state.lock();
            let id = thread::current().id();
            if let Some(chain) = state.chains.get_mut(&id) {
                if let Some(pos) = chain.iter().rposition(|n| n == name) {
                    chain.remove(pos);
                }
                if chain.is_empty() {
                    state.chains.remove(&id);
                }
            }
        }

        /// Snapshot of the current thread's creation chain.
        pub fn current_chain(&self) -> Vec<String> {
            self.state
                .lock()
                .chains
                .get(&thread::current().id())
                .cloned()
                .unwrap_or_default()
        }

        /// Records that the current thread runs the initializer of `name`.
        pub fn start_initializing(&self, name: &str) {
            let mut state = self.state.lock();
            let id = thread::current().id();
            state.waiting.remove(&id);
            state.owners.insert(name.to_string(), id);
        }

        pub fn finish_initializing(&self, name: &str) {
            self.state.lock().owners.remove(name);
        }

        /// Records that the current thread is about to block until `name` is
        /// initialized.
        ///
        /// Returns the cycle (first and last entries equal) when the owner of
        /// `name` is itself, directly or transitively, waiting on a bean the
        /// current thread is initializing.
        pub fn start_waiting(&self, name: &str) -> Result<(), Vec<String>> {
            let mut state = self.state.lock();
            let id = thread::current().id();
            if let Some(cycle) = state.wait_cycle(id, name) {
                return Err(cycle);
            }
            state.waiting.insert(id, name.to_string());
            Ok(())
        }

        pub fn finish_waiting(&self, name: &str) {
            let mut state = self.state.lock();
            let id = thread::current().id();
            if state.waiting.get(&id).is_some_and(|n| n == name) {
                state.waiting.remove(&id);
            }
        }
    }

    /// Removes the creation mark when dropped, whatever way creation ends.
    pub struct CreationGuard<'a> {
        tracker: &'a CreationTracker,
        name: String,
    }

    impl<'a> CreationGuard<'a> {
        pub fn enter(tracker: &'a CreationTracker, name: &str) -> Result<Self, Vec<String>> {
            tracker.start_creating(name)?;
            Ok(Self {
                tracker,
                name: name.to_string(),
            })
        }
    }

    impl Drop for CreationGuard<'_> {
        fn drop(&mut self) {
            self.tracker.finish_creating(&self.name);
        }
    }

    /// Clears the wait edge when dropped.
    pub struct WaitGuard<'a> {
        tracker: &'a CreationTracker,
        name: String,
    }

    impl<'a> WaitGuard<'a> {
        pub fn enter(tracker: &'a CreationTracker, name: &str) -> Result<Self, Vec<String>> {
            tracker.start_waiting(name)?;
            Ok(Self {
                tracker,
                name: name.to_string(),
            })
        }
    }

    impl Drop for WaitGuard<'_> {
        fn drop(&mut self) {
            self.tracker.finish_waiting(&self.name);
        }
    }

    /// Clears the ownership mark when dropped, also when the initializer fails.
    pub struct InitializingGuard<'a> {
        tracker: &'a CreationTracker,
        name: String,
    }

    impl<'a> InitializingGuard<'a> {
        pub fn enter(tracker: &'a CreationTracker, name: &str) -> Self {
            tracker.start_initializing(name);
            Self {
                tracker,
                name: name.to_string(),
            }
        }
    }

    impl Drop for InitializingGuard<'_> {
        fn drop(&mut self) {
            self.tracker.finish_initializing(&self.name);
        }
    }

    /// Dependency graph analysis result
    #[derive(Debug, PartialEq, Eq)]
    pub enum DependencyValidationError {
        CircularDependency { cycle: Vec<String> },
        MissingDependency { bean: String, missing: String },
    }

    impl std::fmt::Display for DependencyValidationError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::CircularDependency { cycle } => {
                    write!(f, "Circular dependency detected: {}", cycle.join(" -> "))
                }
                Self::MissingDependency { bean, missing } => {
                    write!(f, "Bean '{}' depends on '{}' which is not registered", bean, missing)
                }
            }
        }
    }

    /// Validates a `depends_on` graph for missing beans and cycles.
    ///
    /// Beans are visited in name order so the reported problem is stable.
    pub fn validate_dependency_graph(
        dependencies: &HashMap<String, Vec<String>>,
    ) -> Result<(), DependencyValidationError> {
        let mut names: Vec<&String> = dependencies.keys().collect();
        names.sort();

        for bean in &names {
            for dep in &dependencies[*bean] {
                if !dependencies.contains_key(dep) {
                    return Err(DependencyValidationError::MissingDependency {
                        bean: (*bean).clone(),
                        missing: dep.clone(),
                    });
                }
            }
        }

        let mut visited = HashSet::new();
        let mut stack = Vec::new();
        for bean in names {
            if !visited.contains(bean.as_str()) {
                if let Some(cycle) = detect_cycle(bean, dependencies, &mut visited, &mut stack) {
                    return Err(DependencyValidationError::CircularDependency { cycle });
                }
            }
        }

        Ok(())
    }

    fn detect_cycle(
        node: &str,
        graph: &HashMap<String, Vec<String>>,
        visited: &mut HashSet<String>,
        stack: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        visited.insert(node.to_string());
        stack.push(node.to_string());

        if let Some(deps) = graph.get(node) {
            for dep in deps {
                if let Some(start) = stack.iter().position(|n| n == dep) {
                    let mut cycle = stack[start..].to_vec();
                    cycle.push(dep.clone());
                    return Some(cycle);
                }
                if !visited.contains(dep) {
                    if let Some(cycle) = detect_cycle(dep, graph, visited, stack) {
                        return Some(cycle);
                    }
                }
            }
        }

        stack.pop();
        None
    }

}

#[cfg(test)]
mod tests {
    use super::naming::*;

    struct UserDao;
    struct Wrapper<T>(T);

    #[test]
    fn test_default_bean_name() {
        assert_eq!(default_bean_name::<UserDao>(), "userDao");
        assert_eq!(default_bean_name::<Wrapper<UserDao>>(), "wrapper");
        assert_eq!(default_bean_name::<u32>(), "u32");
    }
}
