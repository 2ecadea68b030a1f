use crate::domain::error::AppError;
use crate::domain::generation::{GenerationProgress, GenerationStage};

/// Overall progress never reaches 1.0 before the `complete` event.
const PROGRESS_CEILING: f32 = 0.99;

/// Maps per-stage checkpoints onto a single monotonic fraction and forwards
/// each one to the caller's callback.
pub(crate) struct ProgressTracker<F>
where
    F: FnMut(GenerationProgress),
{
    callback: F,
    total_stages: usize,
    completed_stages: usize,
    last: f32,
}

impl<F> ProgressTracker<F>
where
    F: FnMut(GenerationProgress),
{
    pub(crate) fn new(total_stages: usize, callback: F) -> Self {
        Self {
            callback,
            total_stages: total_stages.max(1),
            completed_stages: 0,
            last: 0.0,
        }
    }

    pub(crate) fn step(&mut self, stage: GenerationStage, fraction: f32, message: impl Into<String>) {
        let fraction = fraction.clamp(0.0, 1.0);
        let overall = (self.completed_stages as f32 + fraction) / self.total_stages as f32;
        self.last = overall.min(PROGRESS_CEILING).max(self.last);
        (self.callback)(GenerationProgress::new(stage, self.last, message));
    }

    pub(crate) fn finish_stage(&mut self) {
        self.completed_stages = (self.completed_stages + 1).min(self.total_stages);
    }

    pub(crate) fn complete(&mut self, message: impl Into<String>) {
        self.last = 1.0;
        let mut event = GenerationProgress::new(GenerationStage::Complete, 1.0, message);
        event.completed = true;
        (self.callback)(event);
    }

    pub(crate) fn fail(&mut self, err: &AppError) {
        let mut event = GenerationProgress::new(GenerationStage::Error, self.last, "Generation failed");
        event.completed = true;
        event.error = Some(err.user_message().to_string());
        (self.callback)(event);
    }
}
