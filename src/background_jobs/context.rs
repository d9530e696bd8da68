use tokio_util::sync::CancellationToken;

/// Per-run state handed to [`BackgroundJob::execute`](super::BackgroundJob::execute).
#[derive(Clone)]
pub struct JobContext {
    /// Child of the scheduler's shutdown token.
    pub cancellation_token: CancellationToken,
}

impl JobContext {
    pub fn new(cancellation_token: CancellationToken) -> Self {
        Self { cancellation_token }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}
