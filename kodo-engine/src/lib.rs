#![deny(clippy::all)]

pub mod compile;
pub mod config;
pub mod error;
pub mod exec;
pub mod job;
pub mod lang;
pub mod prepare;
pub mod run;
pub mod scheduler;
pub mod verdict;
pub mod workspace;

pub use self::config::Config;
pub use self::error::EngineError;
pub use self::job::{ExecutionRequest, ExecutionResult};
pub use self::scheduler::{Counter, JobHandle, JobState, Scheduler};
