use clap::Parser;
use reloader_server::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let result = reloader_server::run(args).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "obsctl-reloader stopped with error");
    }
    result
}
