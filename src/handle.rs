use super::{
    errors::SpawnError,
    result::SpawnResult,
};
use crossbeam::channel::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a submitted task's eventual result
pub struct JoinHandle<T> {
    receiver: Receiver<SpawnResult<T>>,
}

impl<T> JoinHandle<T> {

    pub(crate) fn new(receiver: Receiver<SpawnResult<T>>) -> Self {
        Self {
            receiver
        }
    }

    /// Block until the task finishes and take its result or captured failure.
    #[inline(always)]
    pub fn join(self) -> SpawnResult<T> {
        self.receiver.recv().unwrap_or(Err(SpawnError::ChannelClosed))
    }

    pub fn join_timeout(self, timeout: Duration) -> SpawnResult<T> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(SpawnError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(SpawnError::ChannelClosed),
        }
    }

    /// Take the result if the task has already finished, without blocking.
    pub fn try_join(&self) -> Option<SpawnResult<T>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(SpawnError::ChannelClosed)),
        }
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        !self.receiver.is_empty()
    }
}
