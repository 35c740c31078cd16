#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = examd::run().await {
        eprintln!("examd fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
