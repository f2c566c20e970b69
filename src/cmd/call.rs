/*!
`call.rs`

`s9s-mcp call <TOOL>`: invoke one tool on the target server.

Parameters:
  --param KEY=VALUE        (repeatable)
  --param-file F.json|yaml (merged; --param overrides file entries)
Values are coerced from the tool's input schema.

JSON Output:
{
  "status": "ok" | "tool_error",
  "tool": "cluster_list",
  "target": "...",
  "elapsed_ms": 42,
  "arguments": { ... },
  "text": "...",          // joined text content
  "result": { ... }       // only with --raw
}
*/

use anyhow::{Context, Result, anyhow};
use clap::Args;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::time::Instant;

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji};
use crate::cmd::shared::{
    build_arguments_from_schema, extract_tool_array, find_tool_case_insensitive,
    load_param_file, output_error, parse_params, print_json,
};
use crate::mcp::client::{self, resolve_target};

const ERROR_TITLE: &str = "Call Error";

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Tool name to invoke
    #[arg(value_name = "TOOL")]
    pub tool: String,

    /// Provide parameter (KEY=VALUE), repeatable
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Load parameters from file (JSON or YAML). CLI --param overrides file entries
    #[arg(long = "param-file", value_name = "PATH")]
    pub param_file: Option<String>,

    /// Target MCP server command (falls back to S9S_MCP_TARGET, then this binary)
    #[arg(short = 't', long)]
    pub target: Option<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,

    /// Include the full MCP call result
    #[arg(long)]
    pub raw: bool,
}

struct Invocation {
    arguments: Map<String, Value>,
    result: rmcp::model::CallToolResult,
}

pub async fn execute_call(args: CallArgs) -> Result<()> {
    let tool = args.tool.trim().to_string();
    if tool.is_empty() {
        return output_error(args.json, ERROR_TITLE, "tool name cannot be empty");
    }

    let provided = match parse_params(&args.params) {
        Ok(p) => p,
        Err(e) => return output_error(args.json, ERROR_TITLE, &e.to_string()),
    };
    let from_file = match args.param_file.as_deref().map(load_param_file) {
        Some(Err(e)) => return output_error(args.json, ERROR_TITLE, &format!("{e:#}")),
        Some(Ok(map)) => map,
        None => Map::new(),
    };

    let spec = resolve_target(args.target.as_deref())?;
    if !spec.is_local() {
        return output_error(args.json, ERROR_TITLE, "remote targets are not supported");
    }

    let started = Instant::now();
    let invocation = match invoke(&spec, &tool, &provided, &from_file).await {
        Ok(inv) => inv,
        Err(e) => return output_error(args.json, ERROR_TITLE, &format!("{e:#}")),
    };
    let elapsed_ms = started.elapsed().as_millis();
    let (text, is_error) = client::result_text(&invocation.result);

    if args.json {
        let status = if is_error { "tool_error" } else { "ok" };
        let mut out = json!({
            "status": status,
            "tool": tool,
            "target": spec.original(),
            "elapsed_ms": elapsed_ms,
            "arguments": invocation.arguments,
            "text": text,
        });
        if args.raw
            && let Value::Object(map) = &mut out
        {
            map.insert(
                "result".into(),
                serde_json::to_value(&invocation.result).unwrap_or(Value::Null),
            );
        }
        print_json(&out);
    } else {
        let style = StyleOptions::detect();
        let (tag, label) = if is_error {
            ("error", "Tool Error")
        } else {
            ("success", "Call Success")
        };
        println!(
            "{}",
            box_header(
                format!("{} {label} ({tool})", emoji(tag, &style)),
                Some(format!("target={} • {elapsed_ms} ms", spec.original())),
                &style,
            )
        );
        if args.raw {
            println!("{}", color(Role::Accent, "Raw Result:", &style));
            print_json(&serde_json::to_value(&invocation.result).unwrap_or(Value::Null));
        } else {
            println!("{text}");
        }
    }
    Ok(())
}

async fn invoke(
    spec: &client::TargetSpec,
    tool: &str,
    provided: &HashMap<String, String>,
    from_file: &Map<String, Value>,
) -> Result<Invocation> {
    let service = client::connect(spec).await?;
    let outcome = invoke_on(&service, tool, provided, from_file).await;
    let _ = service.cancel().await;
    outcome
}

async fn invoke_on(
    service: &client::ClientService,
    tool: &str,
    provided: &HashMap<String, String>,
    from_file: &Map<String, Value>,
) -> Result<Invocation> {
    let listed = service
        .list_tools(Default::default())
        .await
        .context("Failed to list tools")?;
    let tools = extract_tool_array(&serde_json::to_value(listed).unwrap_or(Value::Null));
    let descriptor = find_tool_case_insensitive(&tools, tool)
        .ok_or_else(|| anyhow!("tool '{tool}' not found"))?;
    let name = descriptor
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or(tool)
        .to_string();
    let arguments = build_arguments_from_schema(descriptor, provided, from_file)?;
    let result = client::call_tool(service, &name, arguments.clone()).await?;
    Ok(Invocation { arguments, result })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        call: CallArgs,
    }

    #[test]
    fn clap_parses_repeated_params() {
        let cli = TestCli::try_parse_from([
            "t",
            "job_log",
            "--param",
            "jobId=12",
            "--param",
            "extra=x",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.call.tool, "job_log");
        assert_eq!(cli.call.params, vec!["jobId=12", "extra=x"]);
        assert!(cli.call.json);
        assert!(!cli.call.raw);
    }

    #[tokio::test]
    async fn remote_target_is_refused_before_spawn() {
        let args = CallArgs {
            tool: "s9s_version".into(),
            params: vec![],
            param_file: None,
            target: Some("https://mcp.example/".into()),
            json: true,
            raw: false,
        };
        let err = execute_call(args).await.unwrap_err();
        assert!(err.to_string().contains("remote targets"));
    }
}
