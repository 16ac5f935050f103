use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    gitboard::cli::run().await
}
