/*!
Client-side subcommands used to smoke-test a running bridge.

  src/cmd/
    mod.rs       (this file)
    tools.rs     (ToolsArgs       + execute_tools)
    call.rs      (CallArgs        + execute_call)
    jobs.rs      (FailedJobsArgs  + execute_failed_jobs)
    selftest.rs  (SelftestArgs    + execute_selftest)
    shared.rs    (tool fetching, argument coercion, param files, error output)
    format.rs    (boxed headers and tables for human output)

Conventions:
  - Each subcommand module exposes one public async `execute_*` function
    returning `anyhow::Result<()>`.
  - Argument structs derive `clap::Args`; `--json` switches to
    machine-readable output.
*/

pub mod call;
pub mod format;
pub mod jobs;
pub mod selftest;
pub mod shared;
pub mod tools;

pub use call::{CallArgs, execute_call};
pub use jobs::{FailedJobsArgs, execute_failed_jobs};
pub use selftest::{SelftestArgs, execute_selftest};
pub use tools::{ToolsArgs, execute_tools};
