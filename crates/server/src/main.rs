use clap::Parser as _;
use khipu_mcp::{Args, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level, args.log_format)?;

    if let Err(e) = khipu_mcp::run(args).await {
        tracing::error!(error = %e, "khipu-mcp failed");
        return Err(e.into());
    }
    Ok(())
}
