//! Progress sinks that hosts can plug into the runner.
use std::sync::Arc;

use edge_core::ProgressSink;
use edge_model::{Phase, Progress};
use tracing::{debug, error, info, warn};

/// Logs every progress record through `tracing`.
///
/// Polling phases go to `debug`, milestones to `info`, stopping to `warn` and failures to `error`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_progress(&self, p: &Progress) {
        let phase = p.phase.as_str();
        let job_id = p.job_id.as_deref().unwrap_or("-");
        let task = p.task_name.as_deref().unwrap_or("-");

        match p.phase {
            Phase::Connecting | Phase::FetchingJob | Phase::FetchingTask | Phase::SendingResults => {
                debug!(phase, job_id, task, round = p.rounds.current, "{}", p.message)
            }
            Phase::JobReceived
            | Phase::TaskReceived
            | Phase::Training
            | Phase::ResultsSent
            | Phase::Completed => info!(
                phase,
                job_id,
                task,
                round = p.rounds.current,
                total_rounds = p.rounds.total,
                duration_ms = p.duration_ms,
                "{}",
                p.message
            ),
            Phase::Stopping => warn!(phase, "{}", p.message),
            Phase::Error => error!(
                phase,
                details = p.error.as_deref().unwrap_or_default(),
                "{}",
                p.message
            ),
        }
    }
}

/// Fans each record out to several sinks, in order.
#[derive(Clone, Default)]
pub struct ChainProgress {
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl ChainProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ProgressSink for ChainProgress {
    fn on_progress(&self, progress: &Progress) {
        for sink in &self.sinks {
            sink.on_progress(progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use edge_core::ProgressFn;
    use edge_model::Rounds;

    #[test]
    fn chain_delivers_to_every_sink_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let tag = |name: &'static str| {
            let seen = Arc::clone(&seen);
            Arc::new(ProgressFn(move |p: &Progress| {
                seen.lock().unwrap().push(format!("{name}:{}", p.phase.as_str()))
            })) as Arc<dyn ProgressSink>
        };

        let chain = ChainProgress::new()
            .with(tag("a"))
            .with(Arc::new(LogProgress))
            .with(tag("b"));
        assert_eq!(chain.len(), 3);

        chain.on_progress(&Progress::training("train", Rounds::new(1, 2)));
        chain.on_progress(&Progress::error("boom", "details"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["a:training", "b:training", "a:error", "b:error"]
        );
    }

    #[test]
    fn empty_chain_is_a_no_op() {
        let chain = ChainProgress::new();
        assert!(chain.is_empty());
        chain.on_progress(&Progress::completed());
    }
}
