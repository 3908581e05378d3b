pub mod config;    // Configuration management
pub mod device;    // Device query client
pub mod fields;    // Field extraction table
pub mod mqtt;      // MQTT publishing
pub mod options;   // Command line options parsing
pub mod poller;    // Fleet polling
pub mod prelude;   // Common imports and types
pub mod reading;   // Response decoding
pub mod scheduler; // In-process repeat polling

// Get the package version from Cargo.toml
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;
use crate::mqtt::Mqtt;
use crate::scheduler::Scheduler;
use std::sync::Arc;

fn init_logging(level: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .try_init();
}

/// Main application entry point
///
/// Loads the configuration, connects to the broker, then either runs a
/// single poll cycle or keeps polling on the configured interval until
/// Ctrl+C. The broker connection is flushed and closed before returning.
pub async fn app(options: Options) -> Result<()> {
    let config = match Config::new(options.config_file.clone()) {
        Ok(config) => {
            init_logging(&config.loglevel);
            config
        }
        Err(err) => {
            init_logging("info");
            error!("Failed to load config: {:?}", err);
            return Err(err);
        }
    };

    info!(
        "Starting wifibat-bridge {} with config file: {}",
        CARGO_PKG_VERSION, options.config_file
    );
    config.log_summary();

    let (mqtt, mqtt_handle) = Mqtt::new(config.mqtt.clone());
    let poller = FleetPoller::from_config(&config, Arc::new(mqtt.clone()));

    match config.poll_interval() {
        Some(interval) if !options.once => {
            let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for Ctrl+C: {}", e);
                }
                if let Err(e) = shutdown_tx.send(()) {
                    error!("Failed to send shutdown signal: {}", e);
                }
            });

            info!("Polling {} devices every {}s", poller.targets().len(), interval.as_secs());
            let cycles = Scheduler::new(interval).run(&poller, shutdown_rx).await?;
            info!("Completed {} poll cycles", cycles);
        }
        _ => {
            poller.poll().await.print_summary();
        }
    }

    mqtt.stop(mqtt_handle).await?;

    info!("Application shutdown complete");
    Ok(())
}
