//! Background build task handle.

use super::builder::{BuiltIndex, IndexBuilder};
use crate::cancel::CancellationToken;
use crate::{Result, SearchError};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// A running index build on tokio's blocking pool.
///
/// Must be started from within a tokio runtime.
pub struct IndexBuildTask {
    cancel: CancellationToken,
    handle: JoinHandle<Result<BuiltIndex>>,
}

impl IndexBuildTask {
    /// Spawn `builder` on a blocking worker thread.
    pub fn start(builder: IndexBuilder) -> Self {
        Self::start_with_token(builder, CancellationToken::new())
    }

    /// Spawn `builder`, observing a token owned by the caller.
    pub fn start_with_token(builder: IndexBuilder, cancel: CancellationToken) -> Self {
        let worker_cancel = cancel.clone();
        let handle = tokio::task::spawn_blocking(move || builder.build(&worker_cancel));
        Self { cancel, handle }
    }

    /// Ask the worker to stop at its next record.
    pub fn cancel(&self) {
        info!("Cancelling index build");
        self.cancel.cancel();
    }

    /// Token observed by the worker.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker and return its outcome.
    pub async fn wait(self) -> Result<BuiltIndex> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => {
                error!("Index build worker failed: {}", e);
                Err(SearchError::BuildFailed {
                    message: e.to_string(),
                })
            }
        }
    }
}
