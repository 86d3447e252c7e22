//! Completion callback for a single write.

use tokio::sync::oneshot;

use crate::error::{DuplexError, DuplexResult, SharedError};

/// Completion callback handed to [`super::PushSink::write`].
///
/// The sink completes it exactly once. Dropping it uncompleted resolves
/// the paired [`WriteAck`] with [`DuplexError::WriteDropped`].
#[derive(Debug)]
pub struct WriteDone {
    tx: oneshot::Sender<DuplexResult<()>>,
}

/// The writer's side of a [`WriteDone`].
#[derive(Debug)]
pub struct WriteAck {
    rx: oneshot::Receiver<DuplexResult<()>>,
}

impl WriteDone {
    pub fn new() -> (WriteDone, WriteAck) {
        let (tx, rx) = oneshot::channel();
        (WriteDone { tx }, WriteAck { rx })
    }

    /// The chunk was accepted.
    pub fn succeed(self) {
        self.complete(Ok(()));
    }

    /// The chunk was not accepted. The writer sees `err` as [`DuplexError::Sink`].
    pub fn fail(self, err: SharedError) {
        self.complete(Err(DuplexError::Sink(err)));
    }

    /// Rejected by the duplex before reaching the sink.
    pub(crate) fn reject(self, err: DuplexError) {
        self.complete(Err(err));
    }

    fn complete(self, result: DuplexResult<()>) {
        // The writer may have stopped waiting; nothing to report then.
        let _ = self.tx.send(result);
    }
}

impl WriteAck {
    /// Wait for the sink to complete the write.
    pub async fn wait(self) -> DuplexResult<()> {
        self.rx.await.unwrap_or(Err(DuplexError::WriteDropped))
    }

    /// The outcome, if the write has completed already.
    pub fn try_result(&mut self) -> Option<DuplexResult<()>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(DuplexError::WriteDropped)),
        }
    }
}
