//! Built-in pipeline components.
mod error;
pub use error::ExecError;

mod noop;
pub use noop::{NoOpEventHandler, NoOpFilter};

mod trainer;
pub use trainer::TrainerExecutor;

use std::sync::Arc;

use edge_core::{ComponentRegistry, EventHandler, Executor, Filter};

pub const NOOP_FILTER: &str = "Filter.NoOpFilter";
pub const NOOP_EVENT_HANDLER: &str = "EventHandler.NoOpEventHandler";
pub const TRAINER_EXECUTOR: &str = "Executor.TrainerExecutor";
pub const DL_TRAINER: &str = "Trainer.DLTrainer";

/// Register every built-in component into `registry`.
///
/// Host entries registered afterwards with the same name replace these.
pub fn register_builtins(registry: &mut ComponentRegistry) {
    registry.register_filter(NOOP_FILTER, |_| Ok(Arc::new(NoOpFilter) as Arc<dyn Filter>));
    registry.register_handler(NOOP_EVENT_HANDLER, |_| {
        Ok(Arc::new(NoOpEventHandler) as Arc<dyn EventHandler>)
    });
    for name in [TRAINER_EXECUTOR, DL_TRAINER] {
        registry.register_executor(name, |args| {
            Ok(Arc::new(TrainerExecutor::from_args(args)) as Arc<dyn Executor>)
        });
    }
}

/// A registry holding only the built-ins.
pub fn builtin_registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    register_builtins(&mut registry);
    registry
}

pub mod prelude {
    pub use crate::{
        ExecError, NoOpEventHandler, NoOpFilter, TrainerExecutor, builtin_registry,
        register_builtins,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_core::ComponentArgs;

    #[test]
    fn builtins_are_registered() {
        let reg = builtin_registry();
        assert_eq!(
            reg.component_types(),
            vec![NOOP_EVENT_HANDLER, TRAINER_EXECUTOR, NOOP_FILTER, DL_TRAINER]
        );

        let args = ComponentArgs::new();
        assert_eq!(reg.resolve(NOOP_FILTER, &args).unwrap().kind(), "filter");
        assert_eq!(reg.resolve(NOOP_EVENT_HANDLER, &args).unwrap().kind(), "event handler");
        assert_eq!(reg.resolve(DL_TRAINER, &args).unwrap().kind(), "executor");
    }
}
