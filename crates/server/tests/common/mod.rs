use anyhow::Context as _;
use serde_json::{Value, json};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

pub const BIN: &str = env!("CARGO_BIN_EXE_novita-mcp-server");

/// Minimal MCP client speaking newline-delimited JSON-RPC to the server binary.
pub struct StdioSession {
    _child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl StdioSession {
    /// Spawn the server against `base_url` and complete the initialize handshake.
    pub async fn start(base_url: &str) -> anyhow::Result<Self> {
        let mut child = Command::new(BIN)
            .env("NOVITA_API_KEY", "test-key")
            .env("NOVITA_API_BASE_URL", base_url)
            .env("NOVITA_MCP_LOG", "warn")
            .env_remove("NOVITA_MCP_CATALOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .context("spawn novita-mcp-server")?;

        let stdin = child.stdin.take().context("child stdin")?;
        let stdout = child.stdout.take().context("child stdout")?;

        let mut session = Self {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        };

        let init = session
            .request(
                0,
                "initialize",
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": { "name": "novita-mcp-server-tests", "version": "0" }
                }),
            )
            .await?;
        anyhow::ensure!(init.get("result").is_some(), "initialize failed: {init}");

        session
            .send(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }))
            .await?;

        Ok(session)
    }

    async fn send(&mut self, msg: Value) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(&msg)?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Send a request and wait for the response carrying the same id.
    pub async fn request(&mut self, id: u64, method: &str, params: Value) -> anyhow::Result<Value> {
        self.send(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .await?;

        tokio::time::timeout(Duration::from_secs(20), async {
            loop {
                let line = self
                    .stdout
                    .next_line()
                    .await?
                    .context("server closed stdout")?;
                let Ok(msg) = serde_json::from_str::<Value>(&line) else {
                    continue;
                };
                if msg.get("id") == Some(&json!(id)) {
                    return Ok::<_, anyhow::Error>(msg);
                }
            }
        })
        .await
        .context("timeout waiting for response")?
    }
}

/// Parse `result.content[0].text` of a tools/call response as JSON.
#[allow(dead_code)]
pub fn tool_call_text_json(msg: &Value) -> anyhow::Result<Value> {
    let text = msg
        .pointer("/result/content/0/text")
        .and_then(Value::as_str)
        .context("tools/call missing result.content[0].text")?;
    serde_json::from_str(text).context("tools/call text is not JSON")
}
