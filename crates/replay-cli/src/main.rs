mod telemetry;

use anyhow::Context;
use replay_core::impls::PostgrestStore;
use replay_core::{ReplayConfig, ReplayLoopBuilder};
use tracing::{debug, error, info};

/// 設定 → ログ → store → ループ の順に組み立てて、staging が空になるまで回す。
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = match ReplayConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = telemetry::init_logging(&config.log_level) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }
    debug!("Configuration: {:?}", config);

    if let Err(e) = run(config).await {
        error!("Replay worker halted: {e:#}");
        std::process::exit(1);
    }
}

async fn run(config: ReplayConfig) -> anyhow::Result<()> {
    let store = PostgrestStore::new(
        &config.supabase_url,
        config.supabase_service_role_key.clone(),
        config.http_timeout(),
    )
    .context("create backend client")?;

    let replay = ReplayLoopBuilder::new(config.replay_settings())
        .store(store)
        .build()?;

    let summary = replay.run().await?;
    info!(
        run_id = %summary.run_id,
        moved = summary.stats.moved,
        batches = summary.stats.batches,
        elapsed_secs = (summary.finished_at - summary.started_at).num_seconds(),
        "Replay worker done"
    );
    Ok(())
}
