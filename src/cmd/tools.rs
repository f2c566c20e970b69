/*!
`tools.rs`

`s9s-mcp tools`: spawn the target server, enumerate its tools and print
them as a table or as JSON.

JSON Output Shape:
{
  "status": "ok",
  "target": "<target>",
  "elapsed_ms": 12,
  "count": 9,
  "tools": [
    { "name": "cluster_list", "description": "...", "params": ["flags:array"] }
  ]
}
*/

use anyhow::Result;
use clap::Args;
use serde_json::{Value, json};

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji, table};
use crate::cmd::shared::{ToolList, fetch_tools, output_error, param_summary, print_json};
use crate::mcp::client::resolve_target;

#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Output JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Target MCP server command (falls back to S9S_MCP_TARGET, then this binary)
    #[arg(short = 't', long)]
    pub target: Option<String>,
}

pub async fn execute_tools(args: ToolsArgs) -> Result<()> {
    let spec = resolve_target(args.target.as_deref())?;
    if !spec.is_local() {
        return output_error(args.json, "Tools Error", "remote targets are not supported");
    }
    let listed = match fetch_tools(&spec).await {
        Ok(listed) => listed,
        Err(e) => return output_error(args.json, "Tools Error", &format!("{e:#}")),
    };

    if args.json {
        print_json(&tools_json(spec.original(), &listed));
    } else {
        print_tools(spec.original(), &listed);
    }
    Ok(())
}

fn tool_str<'a>(tool: &'a Value, key: &str) -> &'a str {
    tool.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

fn tools_json(target: &str, listed: &ToolList) -> Value {
    let items: Vec<Value> = listed
        .tools
        .iter()
        .map(|t| {
            json!({
                "name": tool_str(t, "name"),
                "description": tool_str(t, "description"),
                "params": param_summary(t),
            })
        })
        .collect();
    json!({
        "status": "ok",
        "target": target,
        "elapsed_ms": listed.elapsed_ms,
        "count": listed.count(),
        "tools": items,
    })
}

fn print_tools(target: &str, listed: &ToolList) {
    let style = StyleOptions::detect();
    let count = listed.count();
    println!(
        "{}",
        box_header(
            format!("{} Tools ({count})", emoji("list", &style)),
            Some(format!("target={target} • {} ms", listed.elapsed_ms)),
            &style,
        )
    );

    if count == 0 {
        println!(
            "{}",
            color(Role::Dim, format!("{} (none)", emoji("info", &style)), &style)
        );
        return;
    }

    let rows: Vec<Vec<String>> = listed
        .tools
        .iter()
        .enumerate()
        .map(|(idx, t)| {
            let params = param_summary(t);
            vec![
                (idx + 1).to_string(),
                tool_str(t, "name").to_string(),
                if params.is_empty() {
                    "-".to_string()
                } else {
                    params.join(", ")
                },
                tool_str(t, "description").replace('\n', " "),
            ]
        })
        .collect();
    println!(
        "{}",
        table(&["#", "NAME", "PARAMS", "DESCRIPTION"], &rows, &style)
    );
    println!(
        "\n{} {}",
        emoji("info", &style),
        color(
            Role::Dim,
            "Use `s9s-mcp call <name> --param key=value` to invoke a tool",
            &style
        )
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shape() {
        let listed = ToolList {
            tools: vec![json!({
                "name": "job_log",
                "description": "Show a job log",
                "inputSchema": {
                    "type": "object",
                    "required": ["jobId"],
                    "properties": {"jobId": {"type": "string"}}
                }
            })],
            elapsed_ms: 7,
        };
        let out = tools_json("s9s-mcp serve", &listed);
        assert_eq!(out["count"], 1);
        assert_eq!(out["target"], "s9s-mcp serve");
        assert_eq!(out["tools"][0]["name"], "job_log");
        assert_eq!(out["tools"][0]["params"], json!(["jobId*:string"]));
    }
}
