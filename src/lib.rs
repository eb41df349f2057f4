//! Synchronous worker-thread pool with blocking result handles
//!
//! # Features
//! - Fixed or elastic set of OS worker threads sharing one FIFO queue
//! - Result handles with panic capture and timeout joins
//! - Fire-and-forget submission and ordered bulk submission
//! - Graceful shutdown that drains every queued task before joining
//! - Pool metrics snapshot

pub mod errors;
pub mod handle;
pub mod model;
pub mod pool;
pub mod queue;
pub mod result;

pub use handle::JoinHandle;
pub use pool::{ThreadPoolInner,Config,ThreadPool};
