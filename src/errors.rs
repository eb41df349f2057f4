use thiserror::Error;

#[derive(Debug, Error, PartialEq, PartialOrd, Eq, Ord, Clone)]
pub enum SpawnError {
    #[error("pool is stopped, submission rejected")]
    PoolStopped,
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(String),
    #[error("task panicked: {0}")]
    Panic(String),
    #[error("result channel closed before a value was delivered")]
    ChannelClosed,
    #[error("timed out waiting for task result")]
    Timeout,
}
