//! MCP protocol integration tests.
//!
//! Drives the server through `handle_line` / `serve` with in-memory
//! transports, and the tools through a fake agent script where a real
//! subprocess is needed.

use std::path::Path;
use std::time::Duration;

use agentmesh::config::RunnerConfig;
use agentmesh::runner::AgentRunner;
use agentmesh::server::{JsonRpcRequest, JsonRpcResponse, McpServer};
use agentmesh::tools::ToolRouter;
use serde_json::json;

fn config_for(workspace: &Path) -> RunnerConfig {
    RunnerConfig {
        executable_override: None,
        runtime_version: None,
        home_dir: None,
        default_timeout: Duration::from_secs(30),
        default_working_dir: workspace.to_path_buf(),
    }
}

fn server_for(config: RunnerConfig) -> McpServer {
    McpServer::new(ToolRouter::new(AgentRunner::new(config)))
}

fn request(server: &McpServer, message: &serde_json::Value) -> serde_json::Value {
    let resp = server
        .handle_line(&message.to_string())
        .expect("request should get a response");
    serde_json::to_value(resp).expect("serialize response")
}

#[test]
fn test_json_rpc_request_parsing() {
    let req: JsonRpcRequest = serde_json::from_value(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-06-18",
            "capabilities": {},
            "clientInfo": { "name": "test-client", "version": "0.1.0" }
        }
    }))
    .expect("should parse initialize request");

    assert_eq!(req.method, "initialize");
    assert_eq!(req.id, Some(json!(1)));
}

#[test]
fn test_json_rpc_response_skips_empty_fields() {
    let resp = JsonRpcResponse {
        jsonrpc: "2.0".to_owned(),
        id: Some(json!(1)),
        result: Some(json!({"ok": true})),
        error: None,
    };
    let json_str = serde_json::to_string(&resp).expect("should serialize");
    assert!(!json_str.contains("error"));
}

#[test]
fn test_initialize() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = server_for(config_for(dir.path()));

    let resp = request(&server, &json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}));
    assert_eq!(resp["id"], json!(1));
    assert_eq!(resp["result"]["protocolVersion"], "2025-06-18");
    assert_eq!(resp["result"]["serverInfo"]["name"], "agentmesh");
    assert_eq!(resp["result"]["capabilities"]["tools"]["listChanged"], false);
}

#[test]
fn test_notification_gets_no_response() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = server_for(config_for(dir.path()));
    let line = json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string();
    assert!(server.handle_line(&line).is_none());
    assert!(server.handle_line("   ").is_none());
}

#[test]
fn test_protocol_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = server_for(config_for(dir.path()));

    let parse = serde_json::to_value(server.handle_line("{not json").expect("response"))
        .expect("serialize");
    assert_eq!(parse["error"]["code"], -32700);

    let version = request(&server, &json!({"jsonrpc": "1.0", "id": 2, "method": "ping"}));
    assert_eq!(version["error"]["code"], -32600);

    let unknown = request(&server, &json!({"jsonrpc": "2.0", "id": 3, "method": "resources/list"}));
    assert_eq!(unknown["error"]["code"], -32601);
    assert!(unknown.get("result").is_none());

    let bad_params = request(
        &server,
        &json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": {"arguments": {}}}),
    );
    assert_eq!(bad_params["error"]["code"], -32602);
}

#[test]
fn test_tool_definitions_complete() {
    let dir = tempfile::tempdir().expect("tempdir");
    let router = ToolRouter::new(AgentRunner::new(config_for(dir.path())));

    let tools = router.list_tools();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "code_review",
            "refactor",
            "generate_tests",
            "generate_docs",
            "git_assist",
            "scaffold",
            "security_audit",
            "run_workflow",
            "judge_quality",
            "agent_status",
        ]
    );

    for tool in &tools {
        assert!(!tool.description.is_empty(), "tool {} missing description", tool.name);
        assert_eq!(tool.input_schema["type"], "object", "tool {} schema", tool.name);
    }
}

#[test]
fn test_tool_call_unknown() {
    let dir = tempfile::tempdir().expect("tempdir");
    let router = ToolRouter::new(AgentRunner::new(config_for(dir.path())));

    let result = router
        .call_tool("nonexistent_tool", json!({}))
        .expect("should not error");
    assert!(result.is_error);
    assert!(result.content[0].text.contains("Unknown tool"));
}

#[test]
fn test_missing_required_argument_is_error_result() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = server_for(config_for(dir.path()));

    let resp = request(
        &server,
        &json!({
            "jsonrpc": "2.0", "id": 5, "method": "tools/call",
            "params": {"name": "refactor", "arguments": {"target": "src"}}
        }),
    );
    assert_eq!(resp["result"]["isError"], true);
    let text = resp["result"]["content"][0]["text"].as_str().expect("text");
    assert!(text.contains("invalid refactor parameters"), "{text}");
}

#[test]
fn test_oversized_prompt_rejected_before_spawn() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = server_for(config_for(dir.path()));

    let resp = request(
        &server,
        &json!({
            "jsonrpc": "2.0", "id": 6, "method": "tools/call",
            "params": {"name": "git_assist", "arguments": {"task": "x".repeat(20_000)}}
        }),
    );
    assert_eq!(resp["result"]["isError"], true);
    let text = resp["result"]["content"][0]["text"].as_str().expect("text");
    assert!(text.contains("prompt too long"), "{text}");
}

#[test]
fn test_judge_quality_over_protocol() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = server_for(config_for(dir.path()));

    let resp = request(
        &server,
        &json!({
            "jsonrpc": "2.0", "id": 7, "method": "tools/call",
            "params": {"name": "judge_quality", "arguments": {"content": ""}}
        }),
    );
    assert!(resp["result"].get("isError").is_none());
    let text = resp["result"]["content"][0]["text"].as_str().expect("text");
    let report: serde_json::Value = serde_json::from_str(text).expect("report json");
    assert_eq!(report["overall_score"], 7);
}

#[test]
fn test_serve_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = server_for(config_for(dir.path()));

    let input = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}).to_string(),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
        String::new(),
        json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}).to_string(),
        json!({"jsonrpc": "2.0", "id": 3, "method": "tools/list"}).to_string(),
    ]
    .join("\n");

    let mut output = Vec::new();
    server
        .serve(std::io::Cursor::new(input), &mut output)
        .expect("serve");

    let lines: Vec<serde_json::Value> = String::from_utf8(output)
        .expect("utf8")
        .lines()
        .map(|l| serde_json::from_str(l).expect("response json"))
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["id"], 1);
    assert_eq!(lines[1]["id"], 2);
    assert_eq!(lines[2]["result"]["tools"].as_array().map(Vec::len), Some(10));
}

#[cfg(unix)]
mod with_fake_agent {
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    use super::*;

    /// Write an executable shell script standing in for `cline`.
    fn install_agent(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-cline");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write agent");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }

    fn router_with_agent(workspace: &Path, agent: PathBuf) -> ToolRouter {
        let mut config = config_for(workspace);
        config.executable_override = Some(agent);
        ToolRouter::new(AgentRunner::new(config))
    }

    #[test]
    fn test_code_review_defaults_to_plan_mode() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Echo the flags back through a completion event.
        let agent = install_agent(
            dir.path(),
            r#"printf '{"say":"completion_result","text":"flags %s %s %s"}\n' "$1" "$2" "$3""#,
        );
        let router = router_with_agent(dir.path(), agent);

        let result = router
            .call_tool("code_review", json!({ "target": "src/lib.rs" }))
            .expect("call");
        assert!(!result.is_error, "{}", result.content[0].text);
        assert_eq!(result.content[0].text, "flags -y -m plan");
    }

    #[test]
    fn test_refactor_defaults_to_act_mode() {
        let dir = tempfile::tempdir().expect("tempdir");
        let agent = install_agent(
            dir.path(),
            r#"printf '{"say":"completion_result","text":"flags %s %s %s"}\n' "$1" "$2" "$3""#,
        );
        let router = router_with_agent(dir.path(), agent);

        let result = router
            .call_tool("refactor", json!({ "target": "src", "goal": "split modules" }))
            .expect("call");
        assert!(!result.is_error, "{}", result.content[0].text);
        assert_eq!(result.content[0].text, "flags -y -m act");

        let result = router
            .call_tool(
                "refactor",
                json!({ "target": "src", "goal": "split modules", "mode": "plan" }),
            )
            .expect("call");
        assert_eq!(result.content[0].text, "flags -y -m plan");
    }

    #[test]
    fn test_failure_surfaces_partial_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let agent = install_agent(dir.path(), "echo 'edited two files'\necho 'quota exceeded' >&2\nexit 1");
        let router = router_with_agent(dir.path(), agent);

        let result = router
            .call_tool("refactor", json!({ "target": "src", "goal": "split modules" }))
            .expect("call");
        assert!(result.is_error);
        let text = &result.content[0].text;
        assert!(text.contains("quota exceeded"), "{text}");
        assert!(text.contains("Partial output:\nedited two files"), "{text}");
    }

    #[test]
    fn test_workflow_halts_at_first_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Fail on any prompt mentioning "break", and record every run.
        let agent = install_agent(
            dir.path(),
            r#"for last; do :; done
echo "$last" >> runs.log
case "$last" in
  *break*) echo 'boom' >&2; exit 1 ;;
  *) printf '{"say":"completion_result","text":"did %s"}\n' "$last" ;;
esac"#,
        );
        let router = router_with_agent(dir.path(), agent);

        let result = router
            .call_tool(
                "run_workflow",
                json!({
                    "steps": [
                        { "name": "first", "prompt": "step one" },
                        { "prompt": "now break" },
                        { "prompt": "never runs" }
                    ]
                }),
            )
            .expect("call");

        assert!(result.is_error);
        let text = &result.content[0].text;
        assert!(text.contains("## Step 1/3: first [ok]"), "{text}");
        assert!(text.contains("did step one"), "{text}");
        assert!(text.contains("## Step 2/3: step 2 [FAILED]"), "{text}");
        assert!(text.contains("Workflow halted at step 2 of 3."), "{text}");
        assert!(!text.contains("Step 3/3"), "{text}");

        let runs = std::fs::read_to_string(dir.path().join("runs.log")).expect("runs log");
        assert_eq!(runs.lines().collect::<Vec<_>>(), ["step one", "now break"]);
    }

    #[test]
    fn test_workflow_validates_all_steps_before_running() {
        let dir = tempfile::tempdir().expect("tempdir");
        let agent = install_agent(dir.path(), "echo ran >> runs.log");
        let router = router_with_agent(dir.path(), agent);

        let result = router.call_tool(
            "run_workflow",
            json!({ "steps": [ { "prompt": "fine" }, { "prompt": "!!!" } ] }),
        );
        assert!(result.is_err());
        assert!(!dir.path().join("runs.log").exists());
    }

    #[test]
    fn test_timeout_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let agent = install_agent(dir.path(), "echo 'still thinking'\nsleep 10");
        let router = router_with_agent(dir.path(), agent);

        let result = router
            .call_tool("generate_docs", json!({ "target": "src", "timeoutMillis": 300 }))
            .expect("call");
        assert!(result.is_error);
        let text = &result.content[0].text;
        assert!(text.contains("timed out after 300 ms"), "{text}");
        assert!(text.contains("still thinking"), "{text}");
    }
}
