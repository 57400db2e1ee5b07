//! Per-job key/value bag shared by executors, filters and handlers.
use std::{fmt, sync::Arc};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

use crate::{ComponentRegistry, DataSource, Dataset, Event, EventHandler, Executor, Signal};

/// Well-known context keys populated by the runner.
pub mod keys {
    pub const DATA_SOURCE: &str = "data_source";
    pub const DATASET: &str = "dataset";
    pub const REGISTRY: &str = "registry";
    pub const EVENT_HANDLERS: &str = "event_handlers";
    pub const EXECUTOR: &str = "executor";
    pub const JOB_ID: &str = "job_id";
    pub const JOB_NAME: &str = "job_name";
    pub const METHOD: &str = "method";
    pub const TASK_ID: &str = "task_id";
    pub const TASK_NAME: &str = "task_name";
    pub const TASK_DATA: &str = "task_data";
    pub const CURRENT_ROUND: &str = "current_round";
    pub const TOTAL_ROUNDS: &str = "total_rounds";
}

#[derive(Clone)]
pub enum ContextValue {
    Text(String),
    Json(Value),
    Dataset(Arc<dyn Dataset>),
    DataSource(Arc<dyn DataSource>),
    Registry(Arc<ComponentRegistry>),
    Executor(Arc<dyn Executor>),
    Handlers(Arc<[Arc<dyn EventHandler>]>),
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Text(s) => f.debug_tuple("Text").field(s).finish(),
            ContextValue::Json(v) => f.debug_tuple("Json").field(v).finish(),
            ContextValue::Dataset(d) => write!(f, "Dataset(size={})", d.size()),
            ContextValue::DataSource(_) => f.write_str("DataSource(..)"),
            ContextValue::Registry(r) => f.debug_tuple("Registry").field(r).finish(),
            ContextValue::Executor(_) => f.write_str("Executor(..)"),
            ContextValue::Handlers(h) => write!(f, "Handlers(len={})", h.len()),
        }
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        ContextValue::Text(s)
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::Text(s.to_string())
    }
}

impl From<Value> for ContextValue {
    fn from(v: Value) -> Self {
        ContextValue::Json(v)
    }
}

impl From<u32> for ContextValue {
    fn from(n: u32) -> Self {
        ContextValue::Json(Value::from(n))
    }
}

/// Ordered key/value bag.
///
/// Created fresh for every job and discarded when the job ends.
#[derive(Debug, Clone, Default)]
pub struct Context {
    entries: IndexMap<String, ContextValue>,
}

impl Context {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry, returning the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ContextValue>,
    ) -> Option<ContextValue> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn put_dataset(&mut self, dataset: Arc<dyn Dataset>) {
        self.insert(keys::DATASET, ContextValue::Dataset(dataset));
    }

    pub fn put_data_source(&mut self, source: Arc<dyn DataSource>) {
        self.insert(keys::DATA_SOURCE, ContextValue::DataSource(source));
    }

    pub fn put_registry(&mut self, registry: Arc<ComponentRegistry>) {
        self.insert(keys::REGISTRY, ContextValue::Registry(registry));
    }

    pub fn put_executor(&mut self, executor: Arc<dyn Executor>) {
        self.insert(keys::EXECUTOR, ContextValue::Executor(executor));
    }

    pub fn put_handlers(&mut self, handlers: Arc<[Arc<dyn EventHandler>]>) {
        self.insert(keys::EVENT_HANDLERS, ContextValue::Handlers(handlers));
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ContextValue> {
        self.entries.shift_remove(key)
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Text entry; JSON strings are accepted too.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            ContextValue::Text(s) => Some(s),
            ContextValue::Json(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn json(&self, key: &str) -> Option<&Value> {
        match self.get(key)? {
            ContextValue::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn u32(&self, key: &str) -> Option<u32> {
        self.json(key)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    }

    pub fn dataset(&self) -> Option<Arc<dyn Dataset>> {
        match self.get(keys::DATASET)? {
            ContextValue::Dataset(d) => Some(Arc::clone(d)),
            _ => None,
        }
    }

    pub fn data_source(&self) -> Option<Arc<dyn DataSource>> {
        match self.get(keys::DATA_SOURCE)? {
            ContextValue::DataSource(d) => Some(Arc::clone(d)),
            _ => None,
        }
    }

    pub fn registry(&self) -> Option<Arc<ComponentRegistry>> {
        match self.get(keys::REGISTRY)? {
            ContextValue::Registry(r) => Some(Arc::clone(r)),
            _ => None,
        }
    }

    pub fn executor(&self) -> Option<Arc<dyn Executor>> {
        match self.get(keys::EXECUTOR)? {
            ContextValue::Executor(e) => Some(Arc::clone(e)),
            _ => None,
        }
    }

    pub fn handlers(&self) -> Option<Arc<[Arc<dyn EventHandler>]>> {
        match self.get(keys::EVENT_HANDLERS)? {
            ContextValue::Handlers(h) => Some(Arc::clone(h)),
            _ => None,
        }
    }

    /// Deliver `event` to every registered handler, in registration order.
    ///
    /// A missing handler list is a no-op.
    pub async fn fire_event(&self, event: &Event, signal: &Signal) {
        let Some(handlers) = self.handlers() else {
            return;
        };
        trace!(kind = event.kind.as_str(), handlers = handlers.len(), "firing event");
        for handler in handlers.iter() {
            handler.handle_event(event, self, signal).await;
        }
    }
}
