//! Interval-driven task scheduler: one producer per task feeding a bounded
//! pool of workers through a shared hand-off queue.

pub mod lifecycle;
pub(crate) mod producer;
pub(crate) mod worker_pool;

pub use lifecycle::Scheduler;
