#[tokio::main]
async fn main() -> anyhow::Result<()> {
    labsync::bootstrapper::run().await
}
