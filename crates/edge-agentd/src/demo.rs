//! Synthetic data and a toy trainer so the agent can join a session without an ML stack.
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use edge_core::{Batch, Context, CoreError, DataSource, Dataset, Signal, Trainer};
use edge_model::{DataKind, Dxo};
use serde_json::{Value, json};
use tracing::debug;

pub const AVERAGING_METHOD: &str = "avg";

const FEATURES: usize = 4;
const BATCH_SIZE: usize = 16;
const LEARNING_RATE: f64 = 0.1;

/// Deterministic samples `x[i][j] = ((i * 7 + j * 3) % 11) / 10`.
pub struct SyntheticDataset {
    samples: usize,
    cursor: AtomicUsize,
}

impl SyntheticDataset {
    pub fn new(samples: usize) -> Self {
        Self {
            samples,
            cursor: AtomicUsize::new(0),
        }
    }

    fn sample(i: usize) -> Vec<f64> {
        (0..FEATURES)
            .map(|j| ((i * 7 + j * 3) % 11) as f64 / 10.0)
            .collect()
    }
}

impl Dataset for SyntheticDataset {
    fn size(&self) -> usize {
        self.samples
    }

    fn next_batch(&self, batch_size: usize) -> Option<Batch> {
        let start = self.cursor.fetch_add(batch_size, Ordering::SeqCst);
        if start >= self.samples {
            return None;
        }
        let end = (start + batch_size).min(self.samples);
        let input: Vec<Vec<f64>> = (start..end).map(Self::sample).collect();
        let label: Vec<f64> = input.iter().map(|x| x.iter().sum::<f64>()).collect();
        Some(Batch {
            input: json!(input),
            label: json!(label),
        })
    }

    fn reset(&self) {
        self.cursor.store(0, Ordering::SeqCst);
    }
}

/// Hands every job a fresh [`SyntheticDataset`].
pub struct SyntheticSource {
    pub samples: usize,
}

impl DataSource for SyntheticSource {
    fn dataset(&self, job_name: &str, _ctx: &Context) -> Result<Arc<dyn Dataset>, CoreError> {
        if self.samples == 0 {
            return Err(CoreError::Dataset {
                job: job_name.to_string(),
                reason: "synthetic dataset is empty".into(),
            });
        }
        Ok(Arc::new(SyntheticDataset::new(self.samples)))
    }
}

/// Moves the incoming `weights` vector toward the per-feature mean of the local data.
///
/// Produces a `WEIGHT_DIFF` DXO with `data.weights` holding the delta and `meta.num_samples`.
pub struct AveragingTrainer;

#[async_trait]
impl Trainer for AveragingTrainer {
    async fn train(
        &self,
        input: Dxo,
        dataset: Arc<dyn Dataset>,
        _ctx: &Context,
        signal: &Signal,
    ) -> Result<Dxo, CoreError> {
        let weights: Vec<f64> = match input.data.get("weights") {
            Some(Value::Array(values)) => {
                values.iter().map(|v| v.as_f64().unwrap_or(0.0)).collect()
            }
            Some(other) => {
                return Err(CoreError::stage(
                    "averaging trainer",
                    format!("weights must be an array, got {other}"),
                ));
            }
            None => vec![0.0; FEATURES],
        };

        dataset.reset();
        let mut sums = vec![0.0; weights.len()];
        let mut seen = 0usize;
        while let Some(batch) = dataset.next_batch(BATCH_SIZE) {
            if signal.is_triggered() {
                return Err(CoreError::Aborted);
            }
            for row in batch.input.as_array().into_iter().flatten() {
                for (sum, x) in sums.iter_mut().zip(row.as_array().into_iter().flatten()) {
                    *sum += x.as_f64().unwrap_or(0.0);
                }
                seen += 1;
            }
            tokio::task::yield_now().await;
        }

        let diff: Vec<f64> = weights
            .iter()
            .zip(&sums)
            .map(|(w, sum)| {
                let mean = if seen == 0 { *w } else { sum / seen as f64 };
                LEARNING_RATE * (mean - w)
            })
            .collect();
        debug!(samples = seen, features = diff.len(), "averaging round done");

        Ok(Dxo::new(DataKind::WEIGHT_DIFF)
            .with_data("weights", diff)
            .with_meta("num_samples", seen))
    }
}
