//! Command-execution bridge to the `s9s` binary.
//!
//!   env      - connection settings from an environment snapshot
//!   runner   - argv construction + subprocess execution under a timeout
//!   recover  - JSON recovery from noisy text output

pub mod env;
pub mod recover;
pub mod runner;

pub use env::EnvSnapshot;
pub use recover::{Recovery, recover};
pub use runner::{ExecutionRequest, ExecutionResult, Executor, Runner};
