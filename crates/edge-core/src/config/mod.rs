//! Job configuration carried in `job_data` and its resolution into components.
//!
//! ```json
//! {
//!   "method": "cnn",
//!   "components": [{"name": "clip", "type": "Filter.Clip", "args": {"max": 1.0}}],
//!   "executors": {"train": {"type": "Executor.TrainerExecutor"}, "*": "@fallback"},
//!   "in_filters": ["@clip"],
//!   "out_filters": [{"type": "Filter.NoOpFilter"}],
//!   "handlers": []
//! }
//! ```
use std::{collections::HashMap, sync::Arc};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    Component, ComponentArgs, ComponentRegistry, CoreError, EventHandler, Executor, FilterChain,
};

/// Wildcard key of the `executors` map.
pub const ANY_TASK: &str = "*";

/// Reference to a component: `"@name"` for a declared component, a bare type name, or an inline `{type, args}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentRef {
    Named(String),
    Inline {
        #[serde(rename = "type")]
        type_name: String,
        #[serde(default)]
        args: ComponentArgs,
    },
}

/// Component declared once and referenced as `@name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub args: ComponentArgs,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default)]
    pub components: Vec<ComponentDecl>,
    #[serde(default)]
    pub executors: IndexMap<String, ComponentRef>,
    #[serde(default)]
    pub in_filters: Vec<ComponentRef>,
    #[serde(default)]
    pub out_filters: Vec<ComponentRef>,
    #[serde(default)]
    pub handlers: Vec<ComponentRef>,
    /// Job name, injected into every component's args.
    #[serde(skip)]
    pub job_name: String,
}

impl JobConfig {
    /// Extract the configuration from a job's opaque data.
    ///
    /// `job_data["config"]` may be an object or a JSON string; without it, `job_data` itself is the configuration.
    pub fn from_job_data(job_data: &Map<String, Value>, job_name: &str) -> Result<Self, CoreError> {
        let raw = match job_data.get("config") {
            Some(Value::Object(obj)) => Value::Object(obj.clone()),
            Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
                Ok(v @ Value::Object(_)) => v,
                _ => {
                    warn!(job = job_name, "config string is not a json object, using job data");
                    Value::Object(job_data.clone())
                }
            },
            _ => Value::Object(job_data.clone()),
        };

        let mut cfg: JobConfig = serde_json::from_value(raw)
            .map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
        cfg.job_name = job_name.to_string();
        debug!(
            job = job_name,
            method = ?cfg.method,
            components = cfg.components.len(),
            executors = cfg.executors.len(),
            "job config parsed"
        );
        Ok(cfg)
    }

    /// Construct every declared component and reference through `registry`.
    pub fn resolve(&self, registry: &ComponentRegistry) -> Result<ResolvedJob, CoreError> {
        let mut declared: HashMap<&str, Component> = HashMap::new();
        for decl in &self.components {
            if declared.contains_key(decl.name.as_str()) {
                return Err(CoreError::InvalidConfig(format!(
                    "component {} declared twice",
                    decl.name
                )));
            }
            let component = registry.resolve(&decl.type_name, &self.args_for(&decl.args))?;
            declared.insert(&decl.name, component);
        }

        let build = |r: &ComponentRef| -> Result<(String, Component), CoreError> {
            match r {
                ComponentRef::Named(s) => match s.strip_prefix('@') {
                    Some(name) => declared
                        .get(name)
                        .cloned()
                        .map(|c| (s.clone(), c))
                        .ok_or_else(|| {
                            CoreError::InvalidConfig(format!("dangling reference {s}"))
                        }),
                    None => Ok((s.clone(), registry.resolve(s, &self.args_for(&Map::new()))?)),
                },
                ComponentRef::Inline { type_name, args } => Ok((
                    type_name.clone(),
                    registry.resolve(type_name, &self.args_for(args))?,
                )),
            }
        };

        let mut executors = IndexMap::new();
        for (task, r) in &self.executors {
            let (label, c) = build(r)?;
            executors.insert(task.clone(), c.into_executor(&label)?);
        }

        let mut in_filters = FilterChain::new();
        for r in &self.in_filters {
            let (label, c) = build(r)?;
            in_filters.push(label.clone(), c.into_filter(&label)?);
        }

        let mut out_filters = FilterChain::new();
        for r in &self.out_filters {
            let (label, c) = build(r)?;
            out_filters.push(label.clone(), c.into_filter(&label)?);
        }

        let mut handlers = Vec::with_capacity(self.handlers.len());
        for r in &self.handlers {
            let (label, c) = build(r)?;
            handlers.push(c.into_handler(&label)?);
        }

        Ok(ResolvedJob {
            method: self.method.clone(),
            executors,
            in_filters,
            out_filters,
            handlers: Arc::from(handlers),
        })
    }

    fn args_for(&self, args: &ComponentArgs) -> ComponentArgs {
        let mut args = args.clone();
        args.entry("job_name")
            .or_insert_with(|| Value::String(self.job_name.clone()));
        if let Some(method) = &self.method {
            args.entry("method")
                .or_insert_with(|| Value::String(method.clone()));
        }
        args
    }
}

/// Components of one job, ready to run.
#[derive(Clone)]
pub struct ResolvedJob {
    pub method: Option<String>,
    pub executors: IndexMap<String, Arc<dyn Executor>>,
    pub in_filters: FilterChain,
    pub out_filters: FilterChain,
    pub handlers: Arc<[Arc<dyn EventHandler>]>,
}

impl ResolvedJob {
    /// Executor for `task_name`: exact match first, then the `"*"` entry.
    pub fn find_executor(&self, task_name: &str) -> Option<Arc<dyn Executor>> {
        self.executors
            .get(task_name)
            .or_else(|| self.executors.get(ANY_TASK))
            .cloned()
    }
}

impl std::fmt::Debug for ResolvedJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedJob")
            .field("method", &self.method)
            .field("executors", &self.executors.keys().collect::<Vec<_>>())
            .field("in_filters", &self.in_filters)
            .field("out_filters", &self.out_filters)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
