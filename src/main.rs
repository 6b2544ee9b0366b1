//! ==============================================================================
//! main.rs - weather node entry point
//! ==============================================================================
//!
//! purpose:
//!     wires the node together and hands control to the scheduler.
//!
//! responsibilities:
//!     - load configuration (node.toml) and initialize logging
//!     - build the real collaborators: clock, sensor, link, http transport,
//!       file cache, mqtt publisher, display sinks
//!     - optionally serve the display frame over http
//!     - run the cooperative main loop until ctrl-c
//!
//! architecture:
//!
//!     ┌──────────────────────────────────────────────────────────────┐
//!     │                  scheduler (one thread, 200ms tick)           │
//!     │  ┌─────────────┐   ┌──────────────┐   ┌───────────────────┐  │
//!     │  │ maintenance │ → │ sensor step  │ → │ fetch step        │  │
//!     │  │ mqtt / ota  │   │ (60s)        │   │ (15min, backoff)  │  │
//!     │  └─────────────┘   └──────┬───────┘   └──┬──────────┬─────┘  │
//!     │                           │              │          │        │
//!     └───────────────────────────┼──────────────┼──────────┼────────┘
//!                                 ▼              ▼          ▼
//!                             mqtt broker    display    cache file
//!
//! ==============================================================================

mod backoff;
mod cache;
mod clock;
mod config;
mod display;
mod domain;
mod fetch;
mod forecast;
mod link;
mod publish;
mod scheduler;
mod sensor;
mod server;
#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::backoff::BackoffController;
use crate::cache::FileCache;
use crate::clock::SystemClock;
use crate::config::{NodeConfig, SensorKind};
use crate::display::{ConsoleDisplay, Displays, SharedFrame};
use crate::fetch::{HttpTransport, RemoteFetcher};
use crate::link::SysfsLink;
use crate::publish::MqttPublisher;
use crate::scheduler::{Parts, Scheduler, Settings};
use crate::sensor::{IioSensor, MockSensor, Sensor};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // startup banner
    println!("===========================================================");
    println!("  Weather Node");
    println!("  local sensor + forecast + mqtt + offline cache");
    println!("===========================================================");

    // step 1: load configuration
    let config = NodeConfig::load_or_default(std::env::args().nth(1).map(PathBuf::from));
    config.print_summary();

    // step 2: logging, RUST_LOG wins over the config file
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.forecast.api_key.is_empty() {
        tracing::warn!("no forecast api key configured; fetches will be rejected");
    }

    // step 3: collaborators
    let transport = match HttpTransport::new(Duration::from_secs(config.forecast.request_timeout_seconds)) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Fatal: failed to build http client: {:#}", e);
            return Err(e);
        }
    };

    let sensor: Box<dyn Sensor> = match config.sensor.kind {
        SensorKind::Iio => Box::new(IioSensor::new(&config.sensor.iio_device)),
        SensorKind::Mock => Box::new(MockSensor::new()),
    };

    let mut displays = Displays::default();
    if config.display.console {
        displays.push(ConsoleDisplay);
    }

    // step 4: status server in background
    if let Some(port) = config.display.http_port {
        let frame = SharedFrame::default();
        displays.push(frame.clone());
        tokio::spawn(async move {
            tracing::info!("status page live at http://0.0.0.0:{}", port);
            if let Err(e) = server::serve(frame, port).await {
                tracing::error!("status server error: {:#}", e);
            }
        });
    }

    let parts = Parts {
        clock: Box::new(SystemClock),
        sensor,
        link: Box::new(SysfsLink::new(&config.network.interface)),
        fetcher: RemoteFetcher::new(transport, &config.forecast),
        backoff: BackoffController::new(config.backoff),
        cache: Box::new(FileCache::open(&config.cache.path)),
        publisher: MqttPublisher::new(&config.mqtt),
        display: Box::new(displays),
        updater: None,
    };
    let settings = Settings::new(&config.schedule, &config.mqtt, config.logging.show_sensor_data);

    // step 5: main loop
    tracing::info!(
        "starting main loop (sensor every {}s, fetch every {}s)",
        settings.sensor_interval,
        settings.fetch_interval
    );
    Scheduler::new(settings, parts).run().await;
    Ok(())
}
