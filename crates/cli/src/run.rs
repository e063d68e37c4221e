use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    anyhow::Context,
    pagekeeper_bot::Processor,
    pagekeeper_channels::MessageSender,
    pagekeeper_config::{PagekeeperConfig, Severity, StorageBackend, StorageConfig, validate},
    pagekeeper_consumer::{Consumer, ConsumerConfig},
    pagekeeper_metrics::{MetricsRecorderConfig, init_metrics},
    pagekeeper_sessions::InMemorySessionStateStore,
    pagekeeper_storage::{MemoryPageStore, PageStore, SqlitePageStore},
    pagekeeper_telegram::TelegramTransport,
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
};

/// Wire everything together and poll until Ctrl-C.
pub async fn run_bot(config: PagekeeperConfig, data_dir: &Path) -> anyhow::Result<()> {
    let report = validate(&config);
    for d in &report.diagnostics {
        match d.severity {
            Severity::Error => error!(path = d.path, "{}", d.message),
            Severity::Warning => warn!(path = d.path, "{}", d.message),
        }
    }
    if report.has_errors() {
        anyhow::bail!("invalid configuration, see `pagekeeper config check`");
    }

    init_metrics(MetricsRecorderConfig {
        enabled: config.metrics.enabled,
        listen: metrics_listen(&config)?,
    })?;

    let pages = open_page_store(&config.storage, data_dir).await?;
    let transport = Arc::new(
        TelegramTransport::connect(&config.telegram)
            .await
            .context("can't connect to telegram")?,
    );

    let processor = Arc::new(Processor::new(
        Arc::clone(&transport) as Arc<dyn MessageSender>,
        pages,
        Arc::new(InMemorySessionStateStore::new()),
    ));
    let consumer = Consumer::new(transport, processor, ConsumerConfig::from(&config.consumer));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("shutdown requested");
                    cancel.cancel();
                },
                Err(e) => warn!("can't listen for ctrl-c: {e}"),
            }
        }
    });

    consumer.run(cancel).await;
    Ok(())
}

fn metrics_listen(config: &PagekeeperConfig) -> anyhow::Result<Option<SocketAddr>> {
    if !config.metrics.enabled {
        return Ok(None);
    }
    let addr = config
        .metrics
        .listen
        .parse()
        .with_context(|| format!("invalid metrics.listen `{}`", config.metrics.listen))?;
    Ok(Some(addr))
}

async fn open_page_store(
    storage: &StorageConfig,
    data_dir: &Path,
) -> anyhow::Result<Arc<dyn PageStore>> {
    match storage.backend {
        StorageBackend::Memory => {
            warn!("using in-memory page storage; pages are lost on restart");
            Ok(Arc::new(MemoryPageStore::new()))
        },
        StorageBackend::Sqlite => {
            let path = database_path(&storage.path, data_dir);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("can't create {}", parent.display()))?;
            }
            info!(path = %path.display(), "opening page database");
            let store = SqlitePageStore::connect(&format!("sqlite:{}", path.display()))
                .await
                .with_context(|| format!("can't open {}", path.display()))?;
            Ok(Arc::new(store))
        },
    }
}

/// Relative database paths live in the data directory.
fn database_path(path: &Path, data_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_dir.join(path)
    }
}
