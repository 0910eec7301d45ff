use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use megsync_core::constants::{DEFAULT_CONFIG_FILE, DEFAULT_LOG_DIR};
use megsync_core::{
    ConfigFile, CopyDisposition, FifMetadataReader, JsonLinesSink, RegistryProvider, SyncService,
    TeeSink, TracingSink, YamlRegistryFile,
};

/// Main entry point for an unattended megsync run
///
/// Loads the run configuration, fetches the registry snapshot once, synchronises the whole
/// archive and writes the disposition log as JSON lines to a timestamped file.
///
/// # Environment Variables
/// - `MEGSYNC_CONFIG`: YAML configuration file (default: "megsync.yaml")
/// - `MEGSYNC_REGISTRY`: registry snapshot, overrides `registry` in the configuration
/// - `MEGSYNC_LOG_DIR`: directory for disposition logs, overrides `log_dir` (default: "logs")
///
/// # Returns
/// * `Ok(())` - If the run completed; per-file rejections are reported, not fatal
/// * `Err(anyhow::Error)` - If configuration, the registry, or a root directory is unusable
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("megsync=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path: PathBuf = std::env::var("MEGSYNC_CONFIG")
        .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into())
        .into();
    let file = ConfigFile::load(&config_path)
        .with_context(|| format!("loading configuration {}", config_path.display()))?;
    let cfg = Arc::new(file.to_sync_config()?);

    let registry_path = std::env::var("MEGSYNC_REGISTRY")
        .ok()
        .map(PathBuf::from)
        .or_else(|| file.registry.clone())
        .context("no registry snapshot configured (set MEGSYNC_REGISTRY or 'registry')")?;
    let log_dir = std::env::var("MEGSYNC_LOG_DIR")
        .ok()
        .map(PathBuf::from)
        .or_else(|| file.log_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));

    let snapshot = YamlRegistryFile::new(registry_path).fetch()?;

    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;
    let log_file = log_dir.join(format!(
        "megsync_{}.jsonl",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));
    let writer = std::io::BufWriter::new(
        std::fs::File::create(&log_file)
            .with_context(|| format!("creating disposition log {}", log_file.display()))?,
    );
    tracing::info!("writing disposition log to {}", log_file.display());

    let service = SyncService::new(cfg, FifMetadataReader, snapshot);
    let mut sink = TeeSink::new(JsonLinesSink::new(writer), TracingSink);
    let report = service.run(&mut sink)?;

    tracing::info!(
        "run complete: {} copied, {} already present, {} rejected",
        report.count(CopyDisposition::Copied),
        report.count(CopyDisposition::AlreadyPresent),
        report.rejection_count()
    );
    if report.count(CopyDisposition::RejectedUnaccounted) > 0 {
        tracing::error!(
            "{} files could not be accounted for; see {}",
            report.count(CopyDisposition::RejectedUnaccounted),
            log_file.display()
        );
    }

    Ok(())
}
