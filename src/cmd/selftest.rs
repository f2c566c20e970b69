/*!
`selftest.rs`

`s9s-mcp selftest`: run `s9s --version` and `s9s --help` through the
runner, without any MCP session, and report exit code and output of each.
Fails when either check exits non-zero.
*/

use anyhow::{Result, bail};
use clap::Args;
use serde::Serialize;
use std::time::Duration;

use crate::bridge::{EnvSnapshot, ExecutionRequest, ExecutionResult, Executor, Runner};
use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji};
use crate::cmd::shared::print_json;

const CHECKS: [&str; 2] = ["--version", "--help"];

#[derive(Args, Debug)]
pub struct SelftestArgs {
    /// Per-check timeout in seconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct Check {
    pub directive: &'static str,
    #[serde(flatten)]
    pub result: ExecutionResult,
}

impl Check {
    /// stdout, or stderr when stdout is empty.
    fn output(&self) -> &str {
        if self.result.stdout.is_empty() {
            &self.result.stderr
        } else {
            &self.result.stdout
        }
    }
}

pub async fn run_checks<E: Executor>(executor: &E, timeout: Duration) -> Vec<Check> {
    let mut checks = Vec::with_capacity(CHECKS.len());
    for directive in CHECKS {
        let request = ExecutionRequest::new([directive]).with_timeout(timeout);
        checks.push(Check {
            directive,
            result: executor.execute(request).await,
        });
    }
    checks
}

pub async fn execute_selftest(args: SelftestArgs) -> Result<()> {
    // one snapshot for both checks
    let runner = Runner::with_env(EnvSnapshot::capture());
    let checks = run_checks(&runner, Duration::from_secs(args.timeout)).await;
    let failed = checks.iter().filter(|c| !c.result.success()).count();

    if args.json {
        let status = if failed == 0 { "ok" } else { "error" };
        print_json(&serde_json::json!({
            "status": status,
            "checks": checks,
        }));
    } else {
        let style = StyleOptions::detect();
        for check in &checks {
            let (tag, role) = if check.result.success() {
                ("success", Role::Success)
            } else {
                ("error", Role::Error)
            };
            println!(
                "{}",
                box_header(
                    format!("{} s9s {}", emoji(tag, &style), check.directive),
                    Some(color(role, format!("exit {}", check.result.exit_code), &style)),
                    &style,
                )
            );
            println!("{}\n", check.output().trim_end());
        }
    }

    if failed > 0 {
        bail!("{failed} of {} selftest checks failed", checks.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_fails_both_checks() {
        let runner = Runner::with_env(EnvSnapshot::from_iter([(
            "S9S_BIN",
            "/nonexistent/s9s-selftest",
        )]));
        let checks = run_checks(&runner, Duration::from_secs(5)).await;
        assert_eq!(checks.len(), 2);
        assert!(checks.iter().all(|c| !c.result.success()));
        assert!(checks[0].output().contains("failed to spawn"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn directives_run_without_connection_flags() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("s9s");
        std::fs::write(&script, "#!/bin/sh\necho \"$@\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let runner = Runner::with_env(EnvSnapshot::from_iter([
            ("S9S_BIN", script.to_str().unwrap()),
            ("CC_HOST", "10.0.0.5"),
        ]));
        let checks = run_checks(&runner, Duration::from_secs(5)).await;
        assert_eq!(checks[0].output(), "--version");
        assert_eq!(checks[1].output(), "--help");

        let v = serde_json::to_value(&checks[0]).unwrap();
        assert_eq!(v["directive"], "--version");
        assert_eq!(v["exitCode"], 0);
    }
}
