//! Name → factory table for pipeline components and trainers.
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

use serde_json::{Map, Value};
use tracing::{instrument, trace};

use crate::{CoreError, EventHandler, Executor, Filter, Trainer};

/// Arguments passed to a component factory.
pub type ComponentArgs = Map<String, Value>;

pub type ExecutorFactory =
    Arc<dyn Fn(&ComponentArgs) -> Result<Arc<dyn Executor>, CoreError> + Send + Sync>;
pub type FilterFactory =
    Arc<dyn Fn(&ComponentArgs) -> Result<Arc<dyn Filter>, CoreError> + Send + Sync>;
pub type HandlerFactory =
    Arc<dyn Fn(&ComponentArgs) -> Result<Arc<dyn EventHandler>, CoreError> + Send + Sync>;
pub type TrainerFactory =
    Arc<dyn Fn(&ComponentArgs) -> Result<Arc<dyn Trainer>, CoreError> + Send + Sync>;

/// A constructed pipeline component.
#[derive(Clone)]
pub enum Component {
    Executor(Arc<dyn Executor>),
    Filter(Arc<dyn Filter>),
    EventHandler(Arc<dyn EventHandler>),
}

impl Component {
    pub fn kind(&self) -> &'static str {
        match self {
            Component::Executor(_) => "executor",
            Component::Filter(_) => "filter",
            Component::EventHandler(_) => "event handler",
        }
    }

    pub fn into_executor(self, name: &str) -> Result<Arc<dyn Executor>, CoreError> {
        match self {
            Component::Executor(e) => Ok(e),
            _ => Err(CoreError::WrongCapability {
                name: name.to_string(),
                expected: "executor",
            }),
        }
    }

    pub fn into_filter(self, name: &str) -> Result<Arc<dyn Filter>, CoreError> {
        match self {
            Component::Filter(f) => Ok(f),
            _ => Err(CoreError::WrongCapability {
                name: name.to_string(),
                expected: "filter",
            }),
        }
    }

    pub fn into_handler(self, name: &str) -> Result<Arc<dyn EventHandler>, CoreError> {
        match self {
            Component::EventHandler(h) => Ok(h),
            _ => Err(CoreError::WrongCapability {
                name: name.to_string(),
                expected: "event handler",
            }),
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component::{}", self.kind())
    }
}

#[derive(Clone)]
enum Factory {
    Executor(ExecutorFactory),
    Filter(FilterFactory),
    EventHandler(HandlerFactory),
}

impl Factory {
    fn build(&self, args: &ComponentArgs) -> Result<Component, CoreError> {
        Ok(match self {
            Factory::Executor(f) => Component::Executor(f(args)?),
            Factory::Filter(f) => Component::Filter(f(args)?),
            Factory::EventHandler(f) => Component::EventHandler(f(args)?),
        })
    }
}

/// Registry of component type names and trainer methods.
///
/// Registering an existing name replaces the previous factory.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    components: HashMap<String, Factory>,
    trainers: BTreeMap<String, TrainerFactory>,
}

impl ComponentRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_executor<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn(&ComponentArgs) -> Result<Arc<dyn Executor>, CoreError> + Send + Sync + 'static,
    {
        self.insert(type_name.into(), Factory::Executor(Arc::new(factory)));
    }

    pub fn register_filter<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn(&ComponentArgs) -> Result<Arc<dyn Filter>, CoreError> + Send + Sync + 'static,
    {
        self.insert(type_name.into(), Factory::Filter(Arc::new(factory)));
    }

    pub fn register_handler<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn(&ComponentArgs) -> Result<Arc<dyn EventHandler>, CoreError>
            + Send
            + Sync
            + 'static,
    {
        self.insert(type_name.into(), Factory::EventHandler(Arc::new(factory)));
    }

    /// Register a trainer for a training method (e.g. `"cnn"`).
    pub fn register_trainer<F>(&mut self, method: impl Into<String>, factory: F)
    where
        F: Fn(&ComponentArgs) -> Result<Arc<dyn Trainer>, CoreError> + Send + Sync + 'static,
    {
        let method = method.into();
        trace!(method = %method, "registering trainer");
        self.trainers.insert(method, Arc::new(factory));
    }

    fn insert(&mut self, type_name: String, factory: Factory) {
        let replaced = self.components.insert(type_name.clone(), factory).is_some();
        trace!(type_name = %type_name, replaced, "registering component");
    }

    /// Copy every entry of `other` into `self`; entries of `other` win on conflict.
    pub fn merge(&mut self, other: &ComponentRegistry) {
        for (name, factory) in &other.components {
            self.insert(name.clone(), factory.clone());
        }
        for (method, factory) in &other.trainers {
            self.trainers.insert(method.clone(), Arc::clone(factory));
        }
    }

    /// Construct the component registered under `type_name`.
    #[instrument(level = "trace", skip(self, args))]
    pub fn resolve(&self, type_name: &str, args: &ComponentArgs) -> Result<Component, CoreError> {
        let factory = self
            .components
            .get(type_name)
            .ok_or_else(|| CoreError::UnknownComponent(type_name.to_string()))?;
        let component = factory.build(args)?;
        trace!(kind = component.kind(), "component built");
        Ok(component)
    }

    /// Construct the trainer for `method`.
    pub fn trainer(&self, method: &str, args: &ComponentArgs) -> Result<Arc<dyn Trainer>, CoreError> {
        let factory = self
            .trainers
            .get(method)
            .ok_or_else(|| CoreError::NoTrainer(method.to_string()))?;
        factory(args)
    }

    #[inline]
    pub fn contains(&self, type_name: &str) -> bool {
        self.components.contains_key(type_name)
    }

    #[inline]
    pub fn has_trainer(&self, method: &str) -> bool {
        self.trainers.contains_key(method)
    }

    /// Registered component type names, sorted.
    pub fn component_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.components.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered trainer methods, sorted.
    pub fn trainer_methods(&self) -> impl Iterator<Item = &str> {
        self.trainers.keys().map(String::as_str)
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.component_types())
            .field("trainers", &self.trainer_methods().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Context, Signal};
    use async_trait::async_trait;
    use edge_model::Dxo;

    struct Tag(&'static str);

    #[async_trait]
    impl Filter for Tag {
        async fn filter(&self, input: Dxo, _: &Context, _: &Signal) -> Result<Dxo, CoreError> {
            Ok(input.with_meta("tag", self.0))
        }
    }

    #[test]
    fn unknown_type_is_an_error() {
        let reg = ComponentRegistry::new();
        assert!(matches!(
            reg.resolve("Filter.Missing", &ComponentArgs::new()),
            Err(CoreError::UnknownComponent(name)) if name == "Filter.Missing"
        ));
        assert!(matches!(
            reg.trainer("cnn", &ComponentArgs::new()),
            Err(CoreError::NoTrainer(_))
        ));
    }

    #[test]
    fn resolve_checks_capability() {
        let mut reg = ComponentRegistry::new();
        reg.register_filter("Filter.Tag", |_| Ok(Arc::new(Tag("a")) as Arc<dyn Filter>));

        let component = reg.resolve("Filter.Tag", &ComponentArgs::new()).unwrap();
        assert_eq!(component.kind(), "filter");
        assert!(matches!(
            component.into_executor("Filter.Tag"),
            Err(CoreError::WrongCapability { expected: "executor", .. })
        ));
    }

    #[tokio::test]
    async fn merge_overrides_existing_entries() {
        let mut base = ComponentRegistry::new();
        base.register_filter("Filter.Tag", |_| Ok(Arc::new(Tag("base")) as Arc<dyn Filter>));

        let mut host = ComponentRegistry::new();
        host.register_filter("Filter.Tag", |_| Ok(Arc::new(Tag("host")) as Arc<dyn Filter>));
        host.register_filter("Filter.Other", |_| Ok(Arc::new(Tag("other")) as Arc<dyn Filter>));

        base.merge(&host);
        assert_eq!(base.component_types(), vec!["Filter.Other", "Filter.Tag"]);

        let filter = base
            .resolve("Filter.Tag", &ComponentArgs::new())
            .unwrap()
            .into_filter("Filter.Tag")
            .unwrap();
        let out = filter
            .filter(Dxo::new("WEIGHTS"), &Context::new(), &Signal::new())
            .await
            .unwrap();
        assert_eq!(out.meta["tag"], "host");
    }

    #[test]
    fn factory_errors_propagate() {
        let mut reg = ComponentRegistry::new();
        reg.register_filter("Filter.Strict", |args| {
            if args.contains_key("threshold") {
                Ok(Arc::new(Tag("ok")) as Arc<dyn Filter>)
            } else {
                Err(CoreError::InvalidArgs {
                    name: "Filter.Strict".into(),
                    reason: "threshold is required".into(),
                })
            }
        });
        assert!(matches!(
            reg.resolve("Filter.Strict", &ComponentArgs::new()),
            Err(CoreError::InvalidArgs { .. })
        ));
    }
}
