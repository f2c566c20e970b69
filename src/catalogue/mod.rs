/*!
Operation catalogue.

A fixed table of [`OperationDescriptor`]s, one per MCP tool. Each entry
declares its parameters, a rule turning validated [`Arguments`] into an
[`ExecutionRequest`], and a [`Packaging`] strategy. [`dispatch`] is the single
code path shared by every entry:

  validate -> build -> execute -> package

Validation failures never reach the executor. Every outcome is a
[`ToolResponse`]; nothing here returns an error.
*/

pub mod params;

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::bridge::{ExecutionRequest, ExecutionResult, Executor, Recovery, recover};
pub use params::{Arguments, ParamKind, ParamSpec};

/// Subcommands accepted by `s9s_exec`.
pub const EXEC_SUBCOMMANDS: &[&str] = &["cluster", "job", "task", "server", "node", "backup"];

/// How an [`ExecutionResult`] becomes a [`ToolResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packaging {
    /// stdout (or stderr when stdout is empty); error iff exit code != 0.
    Raw,
    /// Pretty JSON recovered from the output on success, raw text otherwise.
    JsonPreferring,
    /// The whole result serialized as JSON.
    Generic,
}

/// Static definition of one callable tool.
pub struct OperationDescriptor {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
    pub build: fn(&Arguments) -> ExecutionRequest,
    pub packaging: Packaging,
    pub read_only: bool,
}

impl std::fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("packaging", &self.packaging)
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

impl OperationDescriptor {
    pub fn input_schema(&self) -> Map<String, Value> {
        params::input_schema(self.params)
    }
}

/* ---- Response ---- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// Uniform response shape handed back to the protocol layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub content: Vec<TextContent>,
    pub is_error: bool,
}

impl ToolResponse {
    pub fn new(text: impl Into<String>, is_error: bool) -> Self {
        Self {
            content: vec![TextContent {
                kind: "text",
                text: text.into(),
            }],
            is_error,
        }
    }

    /// Concatenated text of all content items.
    #[cfg(test)]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/* ---- Packaging ---- */

/// `a`, or `b` when `a` is empty.
fn non_empty_or<'a>(a: &'a str, b: &'a str) -> &'a str {
    if a.is_empty() { b } else { a }
}

fn pretty(value: &impl Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<serialize error: {e}>"))
}

/// Apply `packaging` to `result`.
pub fn package(packaging: Packaging, result: &ExecutionResult) -> ToolResponse {
    match packaging {
        Packaging::Raw => ToolResponse::new(
            non_empty_or(&result.stdout, &result.stderr),
            !result.success(),
        ),
        Packaging::JsonPreferring => {
            if !result.success() {
                return ToolResponse::new(non_empty_or(&result.stderr, &result.stdout), true);
            }
            let text = non_empty_or(&result.stdout, &result.stderr);
            match recover(text) {
                Recovery::Parsed(value) => ToolResponse::new(pretty(&value), false),
                Recovery::Unrecoverable => {
                    debug!("no JSON recovered from s9s output, returning raw text");
                    ToolResponse::new(text, false)
                }
            }
        }
        Packaging::Generic => ToolResponse::new(pretty(result), !result.success()),
    }
}

/// Run `descriptor` with the caller's raw arguments.
pub async fn dispatch<E: Executor>(
    descriptor: &OperationDescriptor,
    arguments: Option<&Map<String, Value>>,
    executor: &E,
) -> ToolResponse {
    let args = match params::validate(descriptor.params, arguments) {
        Ok(args) => args,
        Err(err) => {
            debug!(tool = descriptor.name, error = %err, "rejected tool arguments");
            return ToolResponse::new(err.to_string(), true);
        }
    };
    let request = (descriptor.build)(&args);
    let result = executor.execute(request).await;
    debug!(tool = descriptor.name, exit_code = result.exit_code, "tool finished");
    package(descriptor.packaging, &result)
}

/* ---- Catalogue ---- */

pub fn catalogue() -> &'static [OperationDescriptor] {
    CATALOGUE
}

pub fn find(name: &str) -> Option<&'static OperationDescriptor> {
    CATALOGUE.iter().find(|d| d.name == name)
}

const FLAGS: ParamSpec = ParamSpec {
    name: "flags",
    kind: ParamKind::Flags,
    required: false,
    description: "Additional s9s flags appended to the command",
};

const CLUSTER_ID: ParamSpec = ParamSpec {
    name: "clusterId",
    kind: ParamKind::Identifier,
    required: true,
    description: "Cluster ID",
};

const JOB_ID: ParamSpec = ParamSpec {
    name: "jobId",
    kind: ParamKind::Identifier,
    required: true,
    description: "Job ID",
};

const EXEC_PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "subcommand",
        kind: ParamKind::Choice(EXEC_SUBCOMMANDS),
        required: true,
        description: "s9s subcommand to run",
    },
    ParamSpec {
        name: "args",
        kind: ParamKind::Flags,
        required: false,
        description: "Arguments passed after the subcommand",
    },
    ParamSpec {
        name: "timeoutSeconds",
        kind: ParamKind::PositiveInteger,
        required: false,
        description: "Timeout in seconds (default 60)",
    },
];

static CATALOGUE: &[OperationDescriptor] = &[
    OperationDescriptor {
        name: "s9s_version",
        title: "s9s version",
        description: "Return `s9s --version` output",
        params: &[],
        build: |_| ExecutionRequest::new(["--version"]),
        packaging: Packaging::Raw,
        read_only: true,
    },
    OperationDescriptor {
        name: "s9s_help",
        title: "s9s help",
        description: "Return `s9s --help` output",
        params: &[],
        build: |_| ExecutionRequest::new(["--help"]),
        packaging: Packaging::Raw,
        read_only: true,
    },
    OperationDescriptor {
        name: "cluster_list",
        title: "List clusters",
        description: "Run `s9s cluster --list` with optional flags",
        params: &[FLAGS],
        build: |a| with_flags(&["cluster", "--list", "--print-json"], a),
        packaging: Packaging::JsonPreferring,
        read_only: true,
    },
    OperationDescriptor {
        name: "job_list",
        title: "List jobs",
        description: "Run `s9s job --list` with optional flags",
        params: &[FLAGS],
        build: |a| with_flags(&["job", "--list"], a),
        packaging: Packaging::Raw,
        read_only: true,
    },
    OperationDescriptor {
        name: "node_list",
        title: "List nodes",
        description: "Run `s9s node --list --print-json` with optional flags",
        params: &[FLAGS],
        build: |a| with_flags(&["node", "--list", "--print-json"], a),
        packaging: Packaging::JsonPreferring,
        read_only: true,
    },
    OperationDescriptor {
        name: "backup_list",
        title: "List backups",
        description: "Run `s9s backup --list --print-json` with optional flags",
        params: &[FLAGS],
        build: |a| with_flags(&["backup", "--list", "--print-json"], a),
        packaging: Packaging::JsonPreferring,
        read_only: true,
    },
    OperationDescriptor {
        name: "cluster_list_config",
        title: "List cluster configuration",
        description: "Run `s9s cluster --cluster-id=X --list-config` to get cluster configuration",
        params: &[CLUSTER_ID, FLAGS],
        build: cluster_list_config,
        packaging: Packaging::Raw,
        read_only: true,
    },
    OperationDescriptor {
        name: "job_log",
        title: "Get job log",
        description: "Get logs for a specific job using job ID",
        params: &[JOB_ID],
        build: |a| {
            let id = a.text("jobId").unwrap_or_default();
            ExecutionRequest::new(["job".to_string(), "--log".into(), format!("--job-id={id}")])
        },
        packaging: Packaging::Raw,
        read_only: true,
    },
    OperationDescriptor {
        name: "s9s_exec",
        title: "Execute s9s subcommand",
        description: "Execute a whitelisted s9s subcommand with args. Returns stdout/stderr/exitCode",
        params: EXEC_PARAMS,
        build: exec,
        packaging: Packaging::Generic,
        read_only: false,
    },
];

fn with_flags(base: &[&str], args: &Arguments) -> ExecutionRequest {
    let tokens = base.iter().map(|s| s.to_string());
    ExecutionRequest::new(tokens.chain(args.list("flags").iter().cloned()))
}

fn cluster_list_config(args: &Arguments) -> ExecutionRequest {
    let id = args.text("clusterId").unwrap_or_default();
    let tokens = [
        "cluster".to_string(),
        format!("--cluster-id={id}"),
        "--list-config".into(),
    ];
    ExecutionRequest::new(tokens.into_iter().chain(args.list("flags").iter().cloned()))
}

fn exec(args: &Arguments) -> ExecutionRequest {
    let subcommand = args.text("subcommand").unwrap_or_default().to_string();
    let request = ExecutionRequest::new(
        std::iter::once(subcommand).chain(args.list("args").iter().cloned()),
    );
    match args.integer("timeoutSeconds") {
        Some(secs) => request.with_timeout(Duration::from_secs(secs)),
        None => request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Executor returning a canned result and recording every request.
    struct Recording {
        result: ExecutionResult,
        seen: Mutex<Vec<ExecutionRequest>>,
    }

    impl Recording {
        fn new(stdout: &str, stderr: &str, exit_code: i32) -> Self {
            Self {
                result: ExecutionResult {
                    stdout: stdout.into(),
                    stderr: stderr.into(),
                    exit_code,
                },
                seen: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<ExecutionRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Executor for Recording {
        async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
            self.seen.lock().unwrap().push(request);
            self.result.clone()
        }
    }

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn op(name: &str) -> &'static OperationDescriptor {
        find(name).unwrap_or_else(|| panic!("missing operation {name}"))
    }

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = catalogue().iter().map(|d| d.name).collect();
        assert_eq!(names.len(), catalogue().len());
        assert_eq!(catalogue().len(), 9);
        assert!(find("delete_everything").is_none());
    }

    #[test]
    fn schemas_list_every_param() {
        for d in catalogue() {
            let schema = Value::Object(d.input_schema());
            assert_eq!(schema["type"], "object", "{}", d.name);
            for p in d.params {
                assert!(schema["properties"].get(p.name).is_some(), "{}.{}", d.name, p.name);
            }
        }
        let exec = Value::Object(op("s9s_exec").input_schema());
        assert_eq!(exec["required"], json!(["subcommand"]));
        assert_eq!(exec["properties"]["subcommand"]["enum"], json!(EXEC_SUBCOMMANDS));
    }

    #[test]
    fn build_rules() {
        let build = |name: &str, raw: Value| {
            let d = op(name);
            let a = params::validate(d.params, Some(&args(raw))).unwrap();
            (d.build)(&a)
        };
        assert_eq!(build("s9s_version", json!({})).tokens(), ["--version"]);
        assert_eq!(
            build("cluster_list", json!({"flags": ["--long"]})).tokens(),
            ["cluster", "--list", "--print-json", "--long"]
        );
        assert_eq!(build("job_list", json!({})).tokens(), ["job", "--list"]);
        assert_eq!(
            build("cluster_list_config", json!({"clusterId": 3})).tokens(),
            ["cluster", "--cluster-id=3", "--list-config"]
        );
        assert_eq!(
            build("job_log", json!({"jobId": "6180"})).tokens(),
            ["job", "--log", "--job-id=6180"]
        );
        let exec = build(
            "s9s_exec",
            json!({"subcommand": "node", "args": ["--list", "--long"], "timeoutSeconds": 5}),
        );
        assert_eq!(exec.tokens(), ["node", "--list", "--long"]);
        assert_eq!(exec.timeout(), Duration::from_secs(5));
        let exec = build("s9s_exec", json!({"subcommand": "job"}));
        assert_eq!(exec.timeout(), crate::bridge::runner::DEFAULT_TIMEOUT);
    }

    #[test]
    fn raw_packaging() {
        let ok = ExecutionResult {
            stdout: "s9s version 1.9".into(),
            stderr: String::new(),
            exit_code: 0,
        };
        assert_eq!(package(Packaging::Raw, &ok), ToolResponse::new("s9s version 1.9", false));

        let failed = ExecutionResult {
            stdout: String::new(),
            stderr: "no such job".into(),
            exit_code: 1,
        };
        assert_eq!(package(Packaging::Raw, &failed), ToolResponse::new("no such job", true));
    }

    #[test]
    fn json_preferring_unrecoverable_falls_back_to_text() {
        let result = ExecutionResult {
            stdout: "ID STATE NAME\n1 STARTED prod".into(),
            stderr: String::new(),
            exit_code: 0,
        };
        let resp = package(Packaging::JsonPreferring, &result);
        assert!(!resp.is_error);
        assert_eq!(resp.text(), "ID STATE NAME\n1 STARTED prod");
    }

    #[test]
    fn json_preferring_uses_stdout_on_error_without_stderr() {
        let result = ExecutionResult {
            stdout: r#"{"error": "denied"}"#.into(),
            stderr: String::new(),
            exit_code: 4,
        };
        let resp = package(Packaging::JsonPreferring, &result);
        assert!(resp.is_error);
        // verbatim, not re-rendered
        assert_eq!(resp.text(), r#"{"error": "denied"}"#);
    }

    #[test]
    fn generic_packaging_serializes_result() {
        let result = ExecutionResult {
            stdout: "out".into(),
            stderr: "warn".into(),
            exit_code: 2,
        };
        let resp = package(Packaging::Generic, &result);
        assert!(resp.is_error);
        let back: Value = serde_json::from_str(&resp.text()).unwrap();
        assert_eq!(back, json!({"stdout": "out", "stderr": "warn", "exitCode": 2}));
        assert!(resp.text().contains("\"exitCode\": 2"));
    }

    #[test]
    fn response_wire_shape() {
        let v = serde_json::to_value(ToolResponse::new("hi", true)).unwrap();
        assert_eq!(v, json!({"content": [{"type": "text", "text": "hi"}], "isError": true}));
    }

    #[tokio::test]
    async fn exec_rejects_unlisted_subcommand_without_spawning() {
        let exec = Recording::new("", "", 0);
        let resp = dispatch(
            op("s9s_exec"),
            Some(&args(json!({"subcommand": "delete-everything"}))),
            &exec,
        )
        .await;
        assert!(resp.is_error);
        assert_eq!(
            resp.text(),
            "subcommand must be one of: cluster, job, task, server, node, backup"
        );
        assert!(exec.requests().is_empty());
    }

    #[tokio::test]
    async fn missing_required_param_does_not_spawn() {
        let exec = Recording::new("", "", 0);
        let resp = dispatch(op("job_log"), None, &exec).await;
        assert!(resp.is_error);
        assert_eq!(resp.text(), "missing required parameter: jobId");
        assert!(exec.requests().is_empty());
    }

    #[tokio::test]
    async fn json_preferring_recovers_embedded_object() {
        let exec = Recording::new(
            r#"noise... {"jobs":[{"id":1,"status":"FAILED"}]} trailing"#,
            "",
            0,
        );
        let resp = dispatch(op("node_list"), None, &exec).await;
        assert!(!resp.is_error);
        let expected = json!({"jobs": [{"id": 1, "status": "FAILED"}]});
        assert_eq!(resp.text(), serde_json::to_string_pretty(&expected).unwrap());
        assert_eq!(
            exec.requests(),
            vec![ExecutionRequest::new(["node", "--list", "--print-json"])]
        );
    }

    #[tokio::test]
    async fn json_preferring_failure_returns_stderr() {
        let exec = Recording::new(r#"{"jobs":[]}"#, "connection refused", 2);
        let resp = dispatch(op("cluster_list"), None, &exec).await;
        assert!(resp.is_error);
        assert_eq!(resp.text(), "connection refused");
    }

    #[tokio::test]
    async fn exec_returns_whole_result() {
        let exec = Recording::new("1 job", "", 0);
        let resp = dispatch(
            op("s9s_exec"),
            Some(&args(json!({"subcommand": "job", "args": ["--list"]}))),
            &exec,
        )
        .await;
        assert!(!resp.is_error);
        let v: Value = serde_json::from_str(&resp.text()).unwrap();
        assert_eq!(v, json!({"stdout": "1 job", "stderr": "", "exitCode": 0}));
        assert_eq!(exec.requests()[0].tokens(), ["job", "--list"]);
    }
}
