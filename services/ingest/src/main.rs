use std::process::ExitCode;

use clap::Parser;
use mlsync_config::{init_tracing, AppConfig};
use mlsync_ingest::cli::Cli;
use mlsync_ingest::reso::client::{ResoClient, ResoClientConfig};
use mlsync_ingest::sync::{run_all, RunOptions};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing("info");
    let cli = Cli::parse();

    tracing::info!(service = "mlsync-ingest", "starting");

    let config = AppConfig::from_env().expect("failed to load config");
    let reso_config = ResoClientConfig::from_env().expect("failed to load RESO config");
    let pool = mlsync_db::create_pool(&config.database_url)
        .await
        .expect("failed to connect to database");
    mlsync_db::apply_schema(&pool)
        .await
        .expect("failed to create tables");

    let client = ResoClient::new(reso_config).expect("failed to create RESO client");
    let syncer = mlsync_ingest::pg_syncer(pool, client, config.sync);

    let outcome = if cli.all {
        run_all(&syncer, cli.limit, cli.reset).await.map(|_| ())
    } else {
        syncer
            .run(RunOptions {
                sync_type: cli.sync_type,
                limit: cli.limit,
                reset: cli.reset,
            })
            .await
            .map(|_| ())
    };

    match outcome {
        Ok(()) => {
            tracing::info!("sync finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "sync failed");
            ExitCode::FAILURE
        }
    }
}
