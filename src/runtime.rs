//! Runtime glue: cancellation contexts, the task abstraction, validated
//! configuration, telemetry, and runner orchestration.

pub mod config;
pub mod context;
pub mod runner;
pub mod task;
pub mod telemetry;
