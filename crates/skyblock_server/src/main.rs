//! Skyblock server entry point.

use anyhow::anyhow;
use skyblock_grid::MemoryDirectory;
use skyblock_server::logging::setup_logging;
use skyblock_server::signals::wait_for_shutdown;
use skyblock_server::{AppConfig, CliArgs, LogOnlyRegenerator, SkyblockRuntime};
use tracing::{error, info};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Configuration is loaded before logging so the configured level applies.
    let mut config = AppConfig::load_from_file(&args.config_path).await?;
    args.apply_to(&mut config);
    config
        .validate()
        .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;

    setup_logging(&config.logging, args.json_logs)?;

    let version = env!("CARGO_PKG_VERSION");
    info!("🚀 Skyblock Server v{}", version);
    info!("📋 Configuration Summary:");
    info!("  📂 Config file: {}", args.config_path.display());
    info!("  🌍 Island world: {}", config.grid.world);
    info!(
        "  📐 Island distance: {} | Protection range: {}",
        config.grid.island_distance, config.grid.protection_range
    );
    info!("  💾 Data directory: {}", config.storage.data_dir.display());
    info!("  ⏱️ Tick: {}ms", config.runtime.tick_interval_ms);

    let runtime = SkyblockRuntime::from_config(
        &config,
        Box::new(MemoryDirectory::new()),
        Box::new(LogOnlyRegenerator),
    )
    .await?;

    info!("✅ Skyblock server is running");
    info!("🛑 Press Ctrl+C to gracefully shutdown");

    let skyblock = runtime
        .run(async {
            if let Err(e) = wait_for_shutdown().await {
                error!("❌ Could not listen for shutdown signals, stopping: {}", e);
            }
        })
        .await?;

    info!(
        "👋 Shutdown complete with {} islands and {} coop grants saved",
        skyblock.grid().len(),
        skyblock.coops().len()
    );
    Ok(())
}
