use clap::Parser;
use regionstats_server::config::{DatasetConfig, DatasetPolicy, DEFAULT_ADDRESS, DEFAULT_DATASET_PATH};
use regionstats_server::dataset::Dataset;
use regionstats_server::{Server, ServerConfig};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "regionstats-server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "REGIONSTATS_ADDRESS", default_value = DEFAULT_ADDRESS)]
    address: SocketAddr,

    /// Path to the JSON array of telemetry records.
    #[arg(long, env = "REGIONSTATS_DATASET", default_value = DEFAULT_DATASET_PATH)]
    dataset: std::path::PathBuf,

    /// Serve an empty dataset instead of exiting when the dataset cannot be loaded.
    #[arg(long, env = "REGIONSTATS_ALLOW_MISSING_DATASET")]
    allow_missing_dataset: bool,

    /// Emit logs as JSON lines.
    #[arg(long, env = "REGIONSTATS_LOG_JSON")]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let dataset_config = DatasetConfig {
        path: args.dataset,
        policy: if args.allow_missing_dataset {
            DatasetPolicy::EmptyOnError
        } else {
            DatasetPolicy::FailFast
        },
    };
    info!(path = %dataset_config.path.display(), policy = ?dataset_config.policy, "loading dataset");
    let dataset = Dataset::load_with_policy(&dataset_config)?;

    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();

    // Print "Listening on <addr>" once the server signals it is bound.
    tokio::spawn(async move {
        if let Ok(addr) = ready_rx.await {
            println!("Listening on {}", addr);
        }
    });

    Server::new(ServerConfig { address: args.address }, dataset).run(ready_tx).await?;
    Ok(())
}
