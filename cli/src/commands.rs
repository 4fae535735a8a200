use eqlive_core::{
    AppConfig, AppConfigExt, Broadcaster, Catalogs, EventSink, LiveService, character_name,
    init_from_full_scan, list_log_files,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::server::{self, assets, ws};

/// Run the live service with its WebSocket and HTTP servers until Ctrl-C.
pub async fn serve(config_path: &Path) -> Result<(), AppError> {
    let config = AppConfig::load_from(config_path)?;
    let catalogs = Arc::new(Catalogs::load(&config));

    let cancel = CancellationToken::new();
    let (broadcast, broadcaster_task) = Broadcaster::spawn(cancel.clone());

    let ws_listener = server::bind("WebSocket", &config.bind_address, config.ws_port).await?;
    let http_listener = server::bind("HTTP", &config.bind_address, config.http_port).await?;

    let sink: Arc<dyn EventSink> = Arc::new(broadcast.clone());
    let (service, handle) = LiveService::new(config.clone(), catalogs, sink, cancel.clone())?;

    let service_task = tokio::spawn(service.run());
    let ws_task = tokio::spawn(ws::run(ws_listener, broadcast, cancel.clone()));
    let http_task = tokio::spawn(assets::run(
        http_listener,
        PathBuf::from(&config.asset_directory),
        cancel.clone(),
    ));

    tracing::info!(
        ws = %format!("ws://{}:{}", config.bind_address, config.ws_port),
        "WebSocket server listening"
    );
    for (label, page) in assets::OVERLAY_PAGES {
        tracing::info!(
            overlay = label,
            url = %format!("http://{}:{}/{}", config.bind_address, config.http_port, page),
            "Overlay page"
        );
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutting down"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
    }

    if let Err(e) = handle.shutdown().await {
        tracing::debug!(error = %e, "Service already stopped");
    }
    cancel.cancel();

    let (service, ws, http, broadcaster) =
        tokio::join!(service_task, ws_task, http_task, broadcaster_task);
    for (name, result) in [
        ("service", service),
        ("websocket", ws),
        ("http", http),
        ("broadcaster", broadcaster),
    ] {
        if let Err(e) = result {
            tracing::error!(task = name, error = %e, "Task ended abnormally");
        }
    }

    let snapshot = handle.snapshot();
    tracing::info!(
        kills = snapshot.counters.total_kills,
        deaths = snapshot.counters.total_deaths,
        "Stopped"
    );
    Ok(())
}

/// Count kills and deaths in one log file and print the result.
pub fn scan(path: &Path, json: bool) -> Result<(), AppError> {
    let timer = Instant::now();
    let summary = init_from_full_scan(path)?;
    let elapsed_ms = timer.elapsed().as_millis();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("File:      {}", path.display());
    println!("Character: {}", character_name(path));
    println!("Zone:      {}", summary.last_zone.as_deref().unwrap_or("Unknown"));
    println!("Kills:     {}", summary.kills);
    println!("Deaths:    {}", summary.deaths);
    println!("scanned {} bytes in {}ms", summary.end_position, elapsed_ms);
    Ok(())
}

/// List the game logs in `dir`, or in the configured log directory.
pub fn files(dir: Option<PathBuf>, config_path: &Path) -> Result<(), AppError> {
    let dir = match dir {
        Some(dir) => dir,
        None => PathBuf::from(AppConfig::load_from(config_path)?.log_directory),
    };

    let mut entries = list_log_files(&dir)?;
    if entries.is_empty() {
        println!("No log files found in {}", dir.display());
        return Ok(());
    }
    entries.sort_by(|a, b| b.modified.cmp(&a.modified));

    println!("{:<20} {:<20} {:>12}  File", "Character", "Modified", "Size");
    println!("{}", "-".repeat(80));
    for entry in &entries {
        println!(
            "{:<20} {:<20} {:>12}  {}",
            entry.character_name,
            entry.formatted_modified(),
            entry.file_size,
            entry.filename
        );
    }

    println!("\nTotal: {} files", entries.len());
    Ok(())
}
