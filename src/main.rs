use anyhow::Result;
use pushcast::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
