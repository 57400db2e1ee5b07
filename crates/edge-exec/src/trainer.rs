use std::sync::Arc;

use async_trait::async_trait;
use edge_core::{ComponentArgs, Context, CoreError, Executor, Signal, Trainer, context::keys};
use edge_model::Dxo;
use serde_json::Value;
use tracing::debug;

use crate::ExecError;

/// Executor that dispatches to the trainer registered for the job's method.
///
/// The method comes from the `method` arg, else from the context. The trainer gets the job's dataset and its
/// own component args.
#[derive(Debug, Clone, Default)]
pub struct TrainerExecutor {
    method: Option<String>,
    args: ComponentArgs,
}

impl TrainerExecutor {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: Some(method.into()),
            args: ComponentArgs::new(),
        }
    }

    pub fn from_args(args: &ComponentArgs) -> Self {
        Self {
            method: args
                .get("method")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
            args: args.clone(),
        }
    }

    fn method<'a>(&'a self, ctx: &'a Context) -> Result<&'a str, ExecError> {
        self.method
            .as_deref()
            .or_else(|| ctx.text(keys::METHOD))
            .ok_or(ExecError::MissingMethod)
    }

    fn trainer(&self, method: &str, ctx: &Context) -> Result<Arc<dyn Trainer>, CoreError> {
        let registry = ctx.registry().ok_or(ExecError::MissingRegistry)?;
        registry.trainer(method, &self.args)
    }
}

#[async_trait]
impl Executor for TrainerExecutor {
    async fn execute(&self, input: Dxo, ctx: &Context, signal: &Signal) -> Result<Dxo, CoreError> {
        if signal.is_triggered() {
            return Err(ExecError::Cancelled.into());
        }
        let method = self.method(ctx)?;
        let trainer = self.trainer(method, ctx)?;
        let dataset = ctx.dataset().ok_or(ExecError::MissingDataset)?;

        debug!(method, kind = %input.kind, dataset_size = dataset.size(), "training");
        let output = trainer.train(input, dataset, ctx, signal).await?;
        output.validate()?;
        Ok(output)
    }
}
