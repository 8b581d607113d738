// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `zapkeep serve` command implementation.
//!
//! Opens the token store, restores sessions, starts the delivery workers
//! and the archive scheduler, then serves the gateway until a shutdown
//! signal arrives.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use zapkeep_config::ZapkeepConfig;
use zapkeep_config::model::{LogConfig, LogTarget};
use zapkeep_core::{ChatControl, MediaFetcher, ZapkeepError};
use zapkeep_dispatch::{
    ArchivePolicy, ArchivePolicyScheduler, EventPipeline, FailureLog, FilterConfig,
    HttpMediaFetcher, LoggingChatControl, MediaCollaborators, NotificationDispatcher,
    WebsocketHub, shutdown,
};
use zapkeep_gateway::{GatewayState, ServerConfig};
use zapkeep_store::SessionTokenRegistry;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the `zapkeep serve` command.
pub async fn run_serve(config: ZapkeepConfig) -> Result<(), ZapkeepError> {
    init_tracing(&config.log)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        device = %config.server.device_name,
        token_store = %config.session.token_store,
        "starting zapkeep serve"
    );

    let cancel = shutdown::install_signal_handler();

    let backend = zapkeep_store::open_backend(&config).await?;
    let registry = Arc::new(SessionTokenRegistry::new(backend));
    if config.session.start_all_session {
        registry.restore_all(&cancel).await?;
    }

    let hub = WebsocketHub::new(config.server.max_listeners, config.websocket.queue_capacity);
    let failures = Arc::new(FailureLog::default());

    let fetcher: Arc<dyn MediaFetcher> = Arc::new(HttpMediaFetcher::new(Duration::from_secs(
        config.webhook.timeout_secs,
    ))?);
    if config.webhook.upload_s3 || config.websocket.upload_s3 {
        warn!("upload_s3 is set but no object storage client is attached; media will be flagged media_error");
    }
    let media = MediaCollaborators {
        fetcher: Some(fetcher),
        storage: None,
    };

    let (dispatcher, mut tasks) = NotificationDispatcher::start(
        &config,
        hub.clone(),
        media,
        failures.clone(),
        cancel.clone(),
    )?;

    let control: Arc<dyn ChatControl> = Arc::new(LoggingChatControl);
    let archive = Arc::new(ArchivePolicyScheduler::new(ArchivePolicy::from_config(
        &config.archive,
    )));
    tasks.push(tokio::spawn(archive.clone().run(
        archive_interval(config.archive.wait_time),
        control.clone(),
        cancel.clone(),
    )));

    let pipeline = Arc::new(
        EventPipeline::new(
            FilterConfig::from_config(&config),
            registry.clone(),
            dispatcher,
            archive,
            control,
        )
        .with_read_message(config.webhook.read_message),
    );

    if config.webhook.all_unread_on_start {
        for token in registry.list() {
            if let Err(e) = pipeline.replay_unread(&token.name).await {
                warn!(session = %token.name, error = %e, "unread replay failed");
            }
        }
    }

    let state = GatewayState::new(
        pipeline,
        hub.clone(),
        failures,
        config.server.secret_key.clone(),
    );
    if state.auth.bearer_token.is_none() {
        warn!("server.secret_key is not set; authenticated endpoints will reject every request");
    }

    let served = zapkeep_gateway::start_server(
        &ServerConfig::from_config(&config),
        state,
        cancel.clone(),
    )
    .await;

    // Bind failures return early without a signal.
    cancel.cancel();
    hub.close_all();
    shutdown::drain_tasks(tasks, DRAIN_TIMEOUT).await;

    info!("zapkeep stopped");
    served
}

/// Scheduler tick: a tenth of the pending delay, between 1s and 60s.
fn archive_interval(wait_time_secs: u64) -> Duration {
    Duration::from_secs((wait_time_secs / 10).clamp(1, 60))
}

fn init_tracing(log: &LogConfig) -> Result<(), ZapkeepError> {
    use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let level = log.level.as_directive();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("zapkeep={level},warn")));

    let console = log
        .logger
        .contains(&LogTarget::Console)
        .then(|| fmt::layer().with_target(true).boxed());

    let file = if log.logger.contains(&LogTarget::File) {
        let path = std::path::Path::new(&log.file_path);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| {
                ZapkeepError::Config(format!("cannot create log directory {}: {e}", dir.display()))
            })?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ZapkeepError::Config(format!("cannot open log file {}: {e}", path.display())))?;
        Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .boxed(),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| ZapkeepError::Internal(format!("failed to install tracing subscriber: {e}")))
}
