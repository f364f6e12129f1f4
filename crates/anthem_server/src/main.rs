//! Demo server entry point.
//!
//! Wires the MVP anthem plugin to in-memory host capabilities, then plays
//! a scripted session: the configured players connect, the server ticks,
//! and each round crowns the next player in rotation.

mod cli;
mod config;
mod logging;

use anthem_event_system::{
    create_event_system, current_timestamp, CapabilityRegistry, EventSystem, HostContext,
    PlayerConnectedEvent, PlayerDisconnectedEvent, PlayerId, RoundMvpEvent, ServerTickEvent,
    SimplePlugin,
};
use anthem_host_stub::StubHost;
use anyhow::{Context, Result};
use cli::CliArgs;
use config::AppConfig;
use plugin_mvp_anthem::{AnthemPlayedEvent, MvpAnthemPlugin, PLUGIN_NAME};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let mut config = AppConfig::load_from_file(&args.config_path).await?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir.to_string_lossy().to_string();
    }
    if let Some(log_level) = args.log_level {
        config.logging.level = log_level;
    }
    config.validate().map_err(anyhow::Error::msg)?;

    logging::setup_logging(&config.logging, args.json_logs)?;
    info!("anthem demo server v{}", env!("CARGO_PKG_VERSION"));
    info!(config = %args.config_path.display(), data_dir = %config.data_dir, "starting");

    run_session(config).await
}

async fn run_session(config: AppConfig) -> Result<()> {
    let data_dir = PathBuf::from(&config.data_dir);
    tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("creating {}", data_dir.display()))?;

    let host = StubHost::new();
    let capabilities = Arc::new(CapabilityRegistry::new());
    host.provide_all(&capabilities);

    let events = create_event_system();
    let context = Arc::new(HostContext::new(
        Arc::clone(&events),
        capabilities,
        data_dir,
    ));

    let mut plugin = MvpAnthemPlugin::new();
    plugin
        .register_handlers(Arc::clone(&events), Arc::clone(&context))
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    plugin
        .on_init(Arc::clone(&context))
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    events
        .on_plugin(PLUGIN_NAME, "anthem_played", |event: AnthemPlayedEvent| {
            info!(
                player = %event.player_id,
                template = %event.template,
                round = event.round,
                "anthem played"
            );
            Ok(())
        })
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    for player in &config.demo.players {
        let id = PlayerId(player.id);
        host.players.join(id, &player.name);
        for grant in &player.grants {
            host.permissions.grant(id, grant);
        }
        events
            .emit_core(
                "player_connected",
                &PlayerConnectedEvent { player_id: id, timestamp: current_timestamp() },
            )
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        info!(player = %id, name = %player.name, "player connected");
    }
    host.pump();

    let session = drive_rounds(&config, &host, &events);
    tokio::select! {
        result = session => result?,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, shutting down early");
        }
    }

    for player in &config.demo.players {
        let id = PlayerId(player.id);
        events
            .emit_core(
                "player_disconnected",
                &PlayerDisconnectedEvent {
                    player_id: id,
                    reason: "session over".to_string(),
                    timestamp: current_timestamp(),
                },
            )
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        host.players.leave(id);
    }
    host.pump();

    plugin
        .on_shutdown(context)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let stats = events.get_stats().await;
    info!(
        handlers = stats.total_handlers,
        events = stats.events_emitted,
        "session complete"
    );
    Ok(())
}

async fn drive_rounds(config: &AppConfig, host: &StubHost, events: &Arc<EventSystem>) -> Result<()> {
    let mut interval =
        tokio::time::interval(tokio::time::Duration::from_millis(config.demo.tick_interval_ms));
    let mut tick: u64 = 0;

    for round in 1..=config.demo.rounds {
        for _ in 0..config.demo.ticks_per_round {
            interval.tick().await;
            tick += 1;
            events
                .emit_core(
                    "server_tick",
                    &ServerTickEvent { tick, timestamp: current_timestamp() },
                )
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
            host.pump();
            // One simulated second per tick drives center-text expiry.
            host.scheduler.advance_seconds(1);
        }

        let mvp = &config.demo.players[(round as usize - 1) % config.demo.players.len()];
        info!(round, mvp = %mvp.name, "round over");
        events
            .emit_core(
                "round_mvp",
                &RoundMvpEvent {
                    player_id: PlayerId(mvp.id),
                    round,
                    timestamp: current_timestamp(),
                },
            )
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        host.pump();

        for request in host.audio.take_submitted() {
            info!(?request.source, channel = %request.channel,
                listeners = request.listeners.len(), "audio submitted");
        }
        for (player, line) in host.messenger.take_chat() {
            info!(%player, "{line}");
        }
    }

    Ok(())
}
