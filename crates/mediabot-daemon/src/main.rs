mod control;
mod events;
mod mpv;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use mediabot_core::access::LockState;
use mediabot_core::commands::{BotContext, CommandTable};
use mediabot_core::config::{Config, ConfigStore};
use mediabot_core::platform;
use mediabot_core::player::Player;
use mediabot_core::processor::CommandProcessor;
use mediabot_core::services::{Service, ServiceManager, StationService};
use mediabot_core::streamer::UrlStreamer;
use mediabot_core::translator::{StaticTranslator, Translator};
use mediabot_core::workers::Workers;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("mediabot.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(log_file)
                .with_ansi(false),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "info,mediabot_daemon=debug,mediabot_core=debug",
                )
            }),
        )
        .init();

    info!("Log file: {:?}", log_path);

    let config_path = Config::config_path();
    let config = Config::load()?;
    info!("Config loaded from: {:?}", config_path);

    let shutdown = CancellationToken::new();
    let transport = Arc::new(transport::LineTransport::new(&config.general.nickname));

    let (track_end_tx, track_end_rx) = mpsc::channel(16);
    let (mpv_process, backend) = mpv::launch(track_end_tx).await?;
    let player = Player::new(Arc::new(backend), &config.player).shared();

    let translator = Arc::new(StaticTranslator::default());
    translator.install_locale(&config.general.language, true)?;

    let stations: Arc<dyn Service> =
        Arc::new(StationService::new(config.services.stations_file.clone()));
    let services = ServiceManager::new(vec![stations], &config.services.default)?;

    let control = Arc::new(control::DaemonControl::new(shutdown.clone()));
    let ctx = BotContext {
        locks: Arc::new(LockState::default()),
        player: player.clone(),
        services: Arc::new(services),
        streamer: Arc::new(UrlStreamer::new()),
        transport: transport.clone(),
        translator,
        control: control.clone(),
        workers: Workers::new(config.workers.max_jobs, transport.clone()),
        max_volume: config.player.max_volume,
        config: Arc::new(ConfigStore::new(config.clone(), config_path)),
    };
    let processor = Arc::new(CommandProcessor::new(Arc::new(ctx), CommandTable::standard()));

    let server = transport::start_server(
        config.transport.bind_address.clone(),
        config.transport.port,
        processor.clone(),
        transport.clone(),
        shutdown.clone(),
    );
    let event_loop = tokio::spawn(events::run(
        player,
        transport.clone(),
        track_end_rx,
        shutdown.clone(),
    ));

    info!("Bot initialised as {:?}", config.general.nickname);
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            shutdown.cancel();
        }
        _ = shutdown.cancelled() => {}
    }

    let workers = &processor.context().workers;
    if tokio::time::timeout(SHUTDOWN_GRACE, workers.wait_idle())
        .await
        .is_err()
    {
        warn!("{} background jobs still running at shutdown", workers.pending());
    }
    let _ = server.await;
    let _ = event_loop.await;
    mpv_process.shutdown().await;

    if control.restart_requested() {
        control::respawn()?;
    }
    info!("Bye");
    Ok(())
}
