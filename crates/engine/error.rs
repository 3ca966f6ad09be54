use ledgerex_state::StateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("submit queue is full")]
    SubmitQueueFull,
    #[error("submit channel closed")]
    SubmitChannelClosed,
    #[error("consensus not initialized")]
    NotInitialized,
    #[error(transparent)]
    State(#[from] StateError),
}
