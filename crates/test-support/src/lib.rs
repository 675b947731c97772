//! Helpers for driving the `khipu-mcp` binary over stdio in integration tests.

use anyhow::Context as _;
use serde_json::{Value, json};
use std::ffi::OsStr;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct KillOnDrop(pub Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.start_kill();
    }
}

/// Newline-delimited JSON-RPC client over a child's stdin/stdout.
///
/// Server notifications and responses to other ids are skipped while waiting for a reply.
pub struct McpStdioSession {
    child: KillOnDrop,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

impl McpStdioSession {
    /// Spawn `bin` with `args` and `envs` and run the MCP handshake.
    ///
    /// Inherited `KHIPU_*` variables are cleared so the caller fully controls configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or the handshake fails.
    pub async fn spawn<I, S>(bin: &str, args: I, envs: &[(&str, &str)]) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(bin);
        cmd.args(args)
            .env_remove("KHIPU_API_KEY")
            .env_remove("KHIPU_BASE_URL")
            .env_remove("KHIPU_OPENAPI_SPEC")
            .env_remove("KHIPU_OPENAPI_SPEC_HASH")
            .env_remove("KHIPU_OPENAPI_SPEC_HASH_POLICY")
            .env_remove("KHIPU_TIMEOUT_SECS")
            .env_remove("KHIPU_LOG_FORMAT")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        for (k, v) in envs {
            cmd.env(k, v);
        }

        let mut child = cmd.spawn().with_context(|| format!("spawn {bin}"))?;
        let stdin = child.stdin.take().context("child stdin")?;
        let stdout = child.stdout.take().context("child stdout")?;

        let mut session = Self {
            child: KillOnDrop(child),
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
        };
        session.initialize().await?;
        Ok(session)
    }

    async fn initialize(&mut self) -> anyhow::Result<()> {
        let init = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": { "name": "khipu-mcp-integration-tests", "version": "0" }
                }),
            )
            .await?;
        anyhow::ensure!(
            init.get("result").is_some(),
            "initialize failed: {init}"
        );
        self.notify("notifications/initialized", None).await
    }

    /// Send a request and wait (up to [`DEFAULT_TIMEOUT`]) for the response with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, timeout, or if stdout closes first.
    pub async fn request(&mut self, method: &str, params: Value) -> anyhow::Result<Value> {
        let id = self.next_id;
        self.next_id += 1;
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .await?;

        tokio::time::timeout(DEFAULT_TIMEOUT, self.read_response(id))
            .await
            .with_context(|| format!("timeout waiting for response to '{method}'"))?
    }

    /// Send a notification (no response expected).
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub async fn notify(&mut self, method: &str, params: Option<Value>) -> anyhow::Result<()> {
        let mut msg = json!({ "jsonrpc": "2.0", "method": method });
        if let Some(params) = params {
            msg["params"] = params;
        }
        self.send(&msg).await
    }

    /// `tools/call` shortcut.
    ///
    /// # Errors
    ///
    /// See [`McpStdioSession::request`].
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> anyhow::Result<Value> {
        self.request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await
    }

    /// Names from `tools/list`, in server order.
    ///
    /// # Errors
    ///
    /// Returns an error if the response has no tool list.
    pub async fn tool_names(&mut self) -> anyhow::Result<Vec<String>> {
        let msg = self.request("tools/list", json!({})).await?;
        let tools = msg
            .pointer("/result/tools")
            .and_then(Value::as_array)
            .context("tools/list missing result.tools")?;
        Ok(tools
            .iter()
            .filter_map(|t| t.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    /// Close stdin and wait for the server to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the process does not exit in time.
    pub async fn shutdown(mut self) -> anyhow::Result<std::process::ExitStatus> {
        self.stdin.shutdown().await.ok();
        drop(self.stdin);
        let status = tokio::time::timeout(DEFAULT_TIMEOUT, self.child.0.wait())
            .await
            .context("timeout waiting for server exit")??;
        Ok(status)
    }

    async fn send(&mut self, msg: &Value) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(msg)?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn read_response(&mut self, id: u64) -> anyhow::Result<Value> {
        while let Some(line) = self.stdout.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let msg: Value =
                serde_json::from_str(line).with_context(|| format!("stdout is not JSON: {line}"))?;
            if msg.get("id") == Some(&json!(id)) {
                return Ok(msg);
            }
        }
        anyhow::bail!("server closed stdout before responding to id {id}")
    }
}

/// Concatenated text blocks of a `tools/call` response.
///
/// # Errors
///
/// Returns an error if the message carries no tool result.
pub fn tool_text(msg: &Value) -> anyhow::Result<String> {
    let content = msg
        .pointer("/result/content")
        .and_then(Value::as_array)
        .with_context(|| format!("tools/call missing result.content: {msg}"))?;
    Ok(content
        .iter()
        .filter_map(|c| c.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Tool text parsed as JSON.
///
/// # Errors
///
/// Returns an error if the text is not valid JSON.
pub fn tool_json(msg: &Value) -> anyhow::Result<Value> {
    let text = tool_text(msg)?;
    serde_json::from_str(&text).with_context(|| format!("tool text is not JSON: {text}"))
}

#[must_use]
pub fn tool_is_error(msg: &Value) -> bool {
    msg.pointer("/result/isError").and_then(Value::as_bool) == Some(true)
}
