//! Progress observation for batch runs.

/// Emitted once per document, after its outcome is final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate<'a> {
    /// Documents finished so far, including this one. Strictly increasing.
    pub completed: usize,
    /// Documents in the batch.
    pub total: usize,
    /// Name of the document that just finished.
    pub document: &'a str,
    /// Whether it produced a result.
    pub succeeded: bool,
}

impl ProgressUpdate<'_> {
    /// Completed share of the batch in `[0.0, 1.0]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Receives progress updates from the batch runner.
pub trait ProgressObserver: Send + Sync {
    /// Called after each document completes, in input order.
    fn on_progress(&self, update: &ProgressUpdate<'_>);
}

/// Discards all updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _update: &ProgressUpdate<'_>) {}
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressUpdate<'_>) + Send + Sync,
{
    fn on_progress(&self, update: &ProgressUpdate<'_>) {
        self(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_covers_empty_batches() {
        let update = ProgressUpdate {
            completed: 0,
            total: 0,
            document: "",
            succeeded: true,
        };
        assert_eq!(update.fraction(), 1.0);
        let half = ProgressUpdate {
            completed: 1,
            total: 2,
            ..update
        };
        assert_eq!(half.fraction(), 0.5);
    }
}
