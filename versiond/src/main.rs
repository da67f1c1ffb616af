//! versiond - Entry Point
//!
//! Local service that brings working copies up to date with their trunk,
//! builds them and drops the resulting artifacts into a deployment folder.

use std::collections::HashMap;
use std::env;

use versiond::app::options::AppOptions;
use versiond::app::run::run;
use versiond::logs::{init_logging, LogOptions};
use versiond::storage::layout::StorageLayout;
use versiond::storage::settings::Settings;
use versiond::utils::version_info;

use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(_) => println!("{}", version.version),
        }
        return;
    }

    let layout = match cli_args.get("data-dir") {
        Some(dir) => StorageLayout::new(dir),
        None => StorageLayout::default(),
    };

    // Retrieve the settings file
    let mut settings = match Settings::load(&layout.settings_file()).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level,
        json_format: settings.json_logs,
    };
    if let Err(e) = init_logging(log_options) {
        println!("Failed to initialize logging: {e}");
    }

    // Command line and environment overrides
    if let Some(host) = cli_args.get("host") {
        settings.server.host = host.clone();
    }
    let port = cli_args.get("port").cloned().or_else(|| env::var("PORT").ok());
    if let Some(port) = port {
        match port.parse::<u16>() {
            Ok(port) => settings.server.port = port,
            Err(_) => warn!("Ignoring invalid port '{}'", port),
        }
    }
    if let Some(folder) = cli_args.get("deployment-folder") {
        settings.deployment_folder = folder.clone();
    }

    let options = AppOptions::from_settings(&settings, layout);

    info!("Running versiond {} with options: {:?}", version.version, options);
    let result = run(options, settings, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Failed to run versiond: {e}");
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                _ => {
                    warn!("Unable to install signal handlers, waiting for Ctrl+C only");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Ctrl+C received, shutting down...");
    }
}
