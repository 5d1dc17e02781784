use fqa_core::error::AppError;

/// Per-process lifecycle. Queries run one at a time and only start from `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    Initializing,
    Ready,
    Querying,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent {
    InitStarted,
    InitSucceeded,
    InitFailed,
    QueryStarted,
    QueryFinished,
    ShutdownRequested,
}

impl PipelineState {
    pub fn apply(self, event: PipelineEvent) -> Result<Self, AppError> {
        use PipelineEvent::*;
        use PipelineState::*;

        let next = match (self, event) {
            (Uninitialized, InitStarted) => Initializing,
            (Initializing, InitSucceeded) => Ready,
            (Initializing, InitFailed) => Shutdown,
            (Ready, QueryStarted) => Querying,
            (Querying, QueryFinished) => Ready,
            (Querying, ShutdownRequested) => Shutdown,
            (Ready, ShutdownRequested) => Shutdown,
            (Uninitialized, ShutdownRequested) => Shutdown,
            (state, event) => {
                return Err(AppError::new(
                    "PIPELINE_STATE_INVALID",
                    "Invalid pipeline state transition",
                )
                .with_details(format!("state={state:?}; event={event:?}")));
            }
        };
        tracing::debug!(from = ?self, to = ?next, "pipeline state");
        Ok(next)
    }

    pub fn accepts_queries(self) -> bool {
        self == PipelineState::Ready
    }
}
