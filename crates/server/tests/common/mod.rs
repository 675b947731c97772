use khipu_test_support::McpStdioSession;

pub const BIN: &str = env!("CARGO_BIN_EXE_khipu-mcp");

pub fn fixture_path() -> String {
    format!(
        "{}/../openapi-nav/tests/fixtures/payments.json",
        env!("CARGO_MANIFEST_DIR")
    )
}

/// Start the server on the shared fixture with `extra` CLI args.
pub async fn spawn_server(extra: &[&str]) -> anyhow::Result<McpStdioSession> {
    let spec = fixture_path();
    let mut args = vec!["--spec", spec.as_str(), "--log-level", "warn"];
    args.extend_from_slice(extra);
    McpStdioSession::spawn(BIN, args, &[]).await
}
