//! Target parsing and client connections for the smoke-test commands.
//!
//! parse_target -> TargetSpec { LocalCommand | RemoteUrl }
//! resolve_target: --target > S9S_MCP_TARGET > this executable with `serve`.
//! connect: spawn a local target and complete the MCP handshake.
//! Remote targets are recognized but rejected.
//!
use anyhow::{Context, Result, bail};
use rmcp::model::{CallToolRequestParam, CallToolResult};
use rmcp::service::RunningService;
use rmcp::{RoleClient, ServiceExt};
use shell_words::split as shell_split;
use std::fmt;
use tokio::process::Command;
use tracing::debug;
use url::Url;

/// Environment fallback for `--target`.
pub const TARGET_ENV: &str = "S9S_MCP_TARGET";

pub type ClientService = RunningService<RoleClient, ()>;

/// A parsed representation of a user-supplied target string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// A local MCP server process to spawn.
    LocalCommand {
        original: String,
        program: String,
        args: Vec<String>,
    },
    /// Remote endpoint (http/https or ws/wss). Not supported.
    RemoteUrl { original: String, url: Url },
}

impl TargetSpec {
    pub fn original(&self) -> &str {
        match self {
            TargetSpec::LocalCommand { original, .. } => original,
            TargetSpec::RemoteUrl { original, .. } => original,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, TargetSpec::LocalCommand { .. })
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSpec::LocalCommand { program, args, .. } => {
                if args.is_empty() {
                    write!(f, "local: {}", program)
                } else {
                    write!(f, "local: {} {}", program, args.join(" "))
                }
            }
            TargetSpec::RemoteUrl { url, .. } => write!(f, "remote: {}", url),
        }
    }
}

/// Parse a `--target` value.
///
/// URLs with an http/https/ws/wss scheme are remote; anything else is a local
/// command line split with shell rules.
pub fn parse_target(raw: &str) -> Result<TargetSpec> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("Target string is empty");
    }

    if let Ok(url) = Url::parse(trimmed)
        && matches!(url.scheme(), "http" | "https" | "ws" | "wss")
    {
        return Ok(TargetSpec::RemoteUrl {
            original: raw.to_string(),
            url,
        });
    }

    let mut parts =
        shell_split(trimmed).context("Failed to parse local command line (shell splitting)")?;
    if parts.is_empty() || parts[0].is_empty() {
        bail!("Empty program name in local command target");
    }
    let program = parts.remove(0);
    Ok(TargetSpec::LocalCommand {
        original: raw.to_string(),
        program,
        args: parts,
    })
}

/// This executable running `serve`.
pub fn self_target() -> Result<TargetSpec> {
    let exe = std::env::current_exe().context("Failed to locate current executable")?;
    let program = exe.display().to_string();
    Ok(TargetSpec::LocalCommand {
        original: format!("{program} serve"),
        program,
        args: vec!["serve".into()],
    })
}

/// Pick the target: explicit flag, then `S9S_MCP_TARGET`, then ourselves.
pub fn resolve_target(flag: Option<&str>) -> Result<TargetSpec> {
    let from_env = std::env::var(TARGET_ENV).ok();
    match flag.or(from_env.as_deref()).filter(|s| !s.trim().is_empty()) {
        Some(raw) => parse_target(raw).with_context(|| format!("Failed to parse target: '{raw}'")),
        None => self_target(),
    }
}

/// Spawn a local target and initialize an MCP client session.
pub async fn connect(spec: &TargetSpec) -> Result<ClientService> {
    use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};

    let TargetSpec::LocalCommand { program, args, .. } = spec else {
        bail!("remote targets are not supported: {}", spec.original());
    };

    let service = ()
        .serve(TokioChildProcess::new(Command::new(program).configure(
            |c| {
                c.args(args);
                // keep the server's log lines off our terminal
                c.stderr(std::process::Stdio::null());
            },
        ))?)
        .await
        .with_context(|| format!("Failed to spawn & initialize MCP server: '{}'", spec))?;

    debug!(target = %spec, peer = ?service.peer_info(), "connected");
    Ok(service)
}

/// Invoke `tool` with `arguments` over an open session.
pub async fn call_tool(
    service: &ClientService,
    tool: &str,
    arguments: serde_json::Map<String, serde_json::Value>,
) -> Result<CallToolResult> {
    service
        .call_tool(CallToolRequestParam {
            name: tool.to_string().into(),
            arguments: if arguments.is_empty() {
                None
            } else {
                Some(arguments)
            },
        })
        .await
        .with_context(|| format!("tool invocation failed: {}", tool))
}

/// Joined text content and the error flag of a tool result.
pub fn result_text(result: &CallToolResult) -> (String, bool) {
    let value = serde_json::to_value(result).unwrap_or(serde_json::Value::Null);
    let text = value
        .get("content")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|c| c.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();
    let is_error = value
        .get("isError")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    (text, is_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_remote_rejected_later() {
        let spec = parse_target("https://example.com/mcp").unwrap();
        assert!(!spec.is_local());
        assert_eq!(spec.original(), "https://example.com/mcp");
    }

    #[test]
    fn parse_local_simple() {
        let spec = parse_target("s9s-mcp serve").unwrap();
        assert_eq!(
            spec,
            TargetSpec::LocalCommand {
                original: "s9s-mcp serve".into(),
                program: "s9s-mcp".into(),
                args: vec!["serve".into()],
            }
        );
    }

    #[test]
    fn parse_local_quoted() {
        let spec = parse_target(r#"/opt/bin/s9s-mcp -v "serve""#).unwrap();
        if let TargetSpec::LocalCommand { program, args, .. } = spec {
            assert_eq!(program, "/opt/bin/s9s-mcp");
            assert_eq!(args, vec!["-v", "serve"]);
        } else {
            panic!("Expected LocalCommand variant");
        }
    }

    #[test]
    fn unknown_scheme_falls_back_to_command() {
        let spec = parse_target("ftp://example.com/resource").unwrap();
        assert!(spec.is_local());
    }

    #[test]
    fn empty_target_rejected() {
        let err = parse_target("   ").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn self_target_runs_serve() {
        let spec = self_target().unwrap();
        assert!(spec.original().ends_with(" serve"));
    }

    #[test]
    fn explicit_flag_wins() {
        let spec = resolve_target(Some("other-server --stdio")).unwrap();
        assert_eq!(spec.original(), "other-server --stdio");
    }

    #[tokio::test]
    async fn connect_refuses_remote() {
        let spec = parse_target("wss://mcp.example/ws").unwrap();
        let Err(err) = connect(&spec).await else {
            panic!("remote target should be refused");
        };
        assert!(err.to_string().contains("remote targets are not supported"));
    }
}
