/*!
`jobs.rs`

`s9s-mcp failed-jobs`: list jobs through the target's `job_list` tool and
report the failed or aborted ones, optionally with their logs.

Detection:
  - payload recovered as JSON with a `jobs` array: status FAILED / ABORTED,
    or a non-zero `exit_code`
  - anything else: lines mentioning FAILED or ABORTED
*/

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::bridge::recover;
use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji, table};
use crate::cmd::shared::{output_error, print_json};
use crate::mcp::client::{self, ClientService, resolve_target};

const ERROR_TITLE: &str = "Failed Jobs Error";
const FAILED_STATUSES: [&str; 2] = ["FAILED", "ABORTED"];

#[derive(Args, Debug)]
pub struct FailedJobsArgs {
    /// Fetch the log of every failed job
    #[arg(long)]
    pub log: bool,

    /// Output JSON
    #[arg(long)]
    pub json: bool,

    /// Target MCP server command (falls back to S9S_MCP_TARGET, then this binary)
    #[arg(short = 't', long)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedJob {
    pub id: Option<String>,
    pub status: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

pub async fn execute_failed_jobs(args: FailedJobsArgs) -> Result<()> {
    let spec = resolve_target(args.target.as_deref())?;
    if !spec.is_local() {
        return output_error(args.json, ERROR_TITLE, "remote targets are not supported");
    }

    let service = match client::connect(&spec).await {
        Ok(s) => s,
        Err(e) => return output_error(args.json, ERROR_TITLE, &format!("{e:#}")),
    };
    let collected = collect(&service, args.log).await;
    let _ = service.cancel().await;
    let jobs = match collected {
        Ok(jobs) => jobs,
        Err(e) => return output_error(args.json, ERROR_TITLE, &format!("{e:#}")),
    };

    if args.json {
        print_json(&json!({
            "status": "ok",
            "target": spec.original(),
            "count": jobs.len(),
            "jobs": jobs,
        }));
    } else {
        print_jobs(&jobs);
    }
    Ok(())
}

async fn collect(service: &ClientService, with_logs: bool) -> Result<Vec<FailedJob>> {
    let mut arguments = Map::new();
    arguments.insert("flags".into(), json!(["--long", "--print-json"]));
    let listed = client::call_tool(service, "job_list", arguments).await?;
    let (text, is_error) = client::result_text(&listed);
    if is_error {
        anyhow::bail!("job_list failed: {}", text.trim());
    }

    let mut jobs = find_failed(&text);
    if with_logs {
        for job in jobs.iter_mut() {
            let Some(id) = job.id.clone() else {
                continue;
            };
            let mut arguments = Map::new();
            arguments.insert("jobId".into(), Value::String(id));
            let fetched = client::call_tool(service, "job_log", arguments).await?;
            job.log = Some(client::result_text(&fetched).0);
        }
    }
    Ok(jobs)
}

/// Failed jobs in a `job_list` payload, structured when possible.
pub fn find_failed(text: &str) -> Vec<FailedJob> {
    let recovered = recover(text).into_value();
    match recovered.as_ref().and_then(|v| v.get("jobs")).and_then(|v| v.as_array()) {
        Some(jobs) => jobs.iter().filter_map(failed_from_object).collect(),
        None => failed_from_lines(text),
    }
}

fn failed_from_object(job: &Value) -> Option<FailedJob> {
    let status = job
        .get("status")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_ascii_uppercase();
    let exit_code = job.get("exit_code").and_then(|v| v.as_i64()).unwrap_or(0);
    if !FAILED_STATUSES.contains(&status.as_str()) && exit_code == 0 {
        return None;
    }
    let id = job.get("job_id").or_else(|| job.get("id")).and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    Some(FailedJob {
        id,
        status,
        title: job
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        log: None,
    })
}

fn failed_from_lines(text: &str) -> Vec<FailedJob> {
    text.lines()
        .filter_map(|line| {
            let status = FAILED_STATUSES.iter().find(|s| line.contains(*s))?;
            let id = line
                .split_whitespace()
                .next()
                .filter(|tok| tok.chars().all(|c| c.is_ascii_digit()))
                .map(str::to_string);
            Some(FailedJob {
                id,
                status: status.to_string(),
                title: line.trim().to_string(),
                log: None,
            })
        })
        .collect()
}

fn print_jobs(jobs: &[FailedJob]) {
    let style = StyleOptions::detect();
    println!(
        "{}",
        box_header(
            format!("{} Failed Jobs ({})", emoji("list", &style), jobs.len()),
            None::<&str>,
            &style,
        )
    );
    if jobs.is_empty() {
        println!(
            "{}",
            color(
                Role::Success,
                format!("{} No failed or aborted jobs", emoji("success", &style)),
                &style
            )
        );
        return;
    }

    let rows: Vec<Vec<String>> = jobs
        .iter()
        .map(|j| {
            vec![
                j.id.clone().unwrap_or_else(|| "-".into()),
                j.status.clone(),
                j.title.clone(),
            ]
        })
        .collect();
    println!("{}", table(&["ID", "STATUS", "TITLE"], &rows, &style));

    for job in jobs {
        if let (Some(id), Some(log)) = (&job.id, &job.log) {
            println!("\n{}", color(Role::Accent, format!("Job {id} log:"), &style));
            println!("{log}");
        }
    }
}
