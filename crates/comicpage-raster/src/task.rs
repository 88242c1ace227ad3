use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread;

use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::canvas::RasterCanvas;
use crate::error::{RasterError, Result};
use crate::halftone::{CancelFlag, HalftoneEngine};

/// Halftone screening running on a dedicated worker thread.
///
/// The task is a future resolving to the screened canvas. Callers that are
/// not async can poll it with [`HalftoneTask::try_result`] or block with
/// [`HalftoneTask::wait`]. Cancelling only raises a flag: the worker stops at
/// the next grid row and its partial result is thrown away.
pub struct HalftoneTask {
    cancel: CancelFlag,
    result_rx: oneshot::Receiver<Result<RasterCanvas>>,
}

impl HalftoneTask {
    /// Starts screening `source` on a new worker thread.
    pub fn spawn(engine: HalftoneEngine, source: Arc<RasterCanvas>) -> Self {
        let (result_tx, result_rx) = oneshot::channel();
        let cancel = CancelFlag::new();
        let worker_cancel = cancel.clone();

        thread::spawn(move || {
            let result = engine.apply_cancellable(&source, &worker_cancel);
            if let Err(e) = &result {
                log::debug!("Halftone worker finished without a canvas: {}", e);
            }
            // The receiver may already be gone; nothing left to do then.
            let _ = result_tx.send(result);
        });

        Self { cancel, result_rx }
    }

    /// Asks the worker to stop. The task then resolves to [`RasterError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Non-blocking check; `None` while the worker is still busy.
    pub fn try_result(&mut self) -> Option<Result<RasterCanvas>> {
        match self.result_rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(RasterError::WorkerLost)),
        }
    }

    /// Blocks the current thread until the worker finishes.
    ///
    /// Must not be called from inside an async runtime; `.await` the task there.
    pub fn wait(self) -> Result<RasterCanvas> {
        self.result_rx
            .blocking_recv()
            .map_err(|_| RasterError::WorkerLost)?
    }
}

impl Future for HalftoneTask {
    type Output = Result<RasterCanvas>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.result_rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(RasterError::WorkerLost)))
    }
}
