use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    clientdash::run().await
}
