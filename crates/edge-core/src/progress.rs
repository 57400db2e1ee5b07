use edge_model::Progress;

/// Receiver of session progress updates.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, progress: &Progress);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn on_progress(&self, _progress: &Progress) {}
}

/// Adapts a closure into a [`ProgressSink`].
pub struct ProgressFn<F>(pub F);

impl<F> ProgressSink for ProgressFn<F>
where
    F: Fn(&Progress) + Send + Sync,
{
    fn on_progress(&self, progress: &Progress) {
        (self.0)(progress)
    }
}
