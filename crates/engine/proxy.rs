//! Channel-based handoff between transaction submission and consensus.

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::EngineError;

/// Default capacity of the submit queue.
pub const SUBMIT_CHANNEL_CAPACITY: usize = 1024;

/// Sending half of the submission queue, handed to whatever accepts
/// transactions from users (API handlers, tooling).
///
/// The queue is bounded; when it is full the submission is rejected
/// immediately with [`EngineError::SubmitQueueFull`] rather than blocking
/// the submitter. The consensus side decides when to drain it.
#[derive(Debug, Clone)]
pub struct TxSubmitter {
    sender: mpsc::Sender<Bytes>,
}

impl TxSubmitter {
    /// Enqueues raw transaction bytes for inclusion in a future block.
    /// Never blocks waiting for inclusion.
    pub fn submit(&self, raw: Bytes) -> Result<(), EngineError> {
        self.sender.try_send(raw).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => EngineError::SubmitQueueFull,
            mpsc::error::TrySendError::Closed(_) => EngineError::SubmitChannelClosed,
        })?;
        debug!("Enqueued transaction for consensus");
        Ok(())
    }
}

/// Creates the submission queue connecting the API surface to consensus.
pub fn submit_channel(capacity: usize) -> (TxSubmitter, mpsc::Receiver<Bytes>) {
    let (sender, receiver) = mpsc::channel(capacity);
    (TxSubmitter { sender }, receiver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn submit_enqueues_until_full() {
        let (submitter, mut receiver) = submit_channel(2);
        submitter.submit(Bytes::from_static(b"a")).expect("first fits");
        submitter.submit(Bytes::from_static(b"b")).expect("second fits");
        assert!(matches!(
            submitter.submit(Bytes::from_static(b"c")),
            Err(EngineError::SubmitQueueFull)
        ));
        assert_eq!(receiver.recv().await, Some(Bytes::from_static(b"a")));
    }

    #[tokio::test]
    async fn submit_after_close_is_an_error() {
        let (submitter, receiver) = submit_channel(1);
        drop(receiver);
        assert!(matches!(
            submitter.submit(Bytes::from_static(b"a")),
            Err(EngineError::SubmitChannelClosed)
        ));
    }
}
