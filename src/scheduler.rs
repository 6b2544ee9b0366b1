//! ==============================================================================
//! scheduler.rs - main loop driver
//! ==============================================================================
//!
//! purpose:
//!     owns every piece of mutable node state (backoff, schedule, cache
//!     handle) and runs the periodic work in one cooperative loop.
//!
//!     every tick samples `now` once, then in this order:
//!
//!         1. maintenance   firmware-update channel, mqtt reconnect/service
//!         2. sensor step   due every sensor_interval: sample, publish, render
//!         3. fetch step    due every fetch_interval: fetch -> parse -> cache,
//!                          publish, render; on failure render from cache
//!
//!     the fetch step marks itself done *before* attempting, so a failed or
//!     gated attempt waits a full interval rather than retrying next tick.
//!
//! relationships:
//!     - used by: main.rs (boot + run)
//!     - uses: clock, sensor, link, fetch, backoff, forecast, cache,
//!             publish, display
//!
//! ==============================================================================

use std::time::Duration;

use crate::backoff::BackoffController;
use crate::cache::CacheStore;
use crate::clock::Clock;
use crate::config::{MqttConfig, ScheduleConfig};
use crate::display::{self, Display};
use crate::domain::ForecastSummary;
use crate::fetch::{FetchError, RemoteFetcher, Transport};
use crate::forecast;
use crate::link::Link;
use crate::publish::{self, Publisher};
use crate::sensor::{self, Sensor};

/// firmware-update servicing hook, polled once per tick when installed
pub trait UpdateChannel {
    fn service(&mut self);
}

/// `None` = never ran, which is always due
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleState {
    pub last_sensor_tick: Option<u64>,
    pub last_fetch_tick: Option<u64>,
}

/// a clock that stepped backwards counts as due, so the step re-anchors
fn is_due(last: Option<u64>, now: u64, interval: u64) -> bool {
    match last {
        None => true,
        Some(last) if now < last => true,
        Some(last) => now - last >= interval,
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub sensor_interval: u64,
    pub fetch_interval: u64,
    pub tick: Duration,
    pub metrics_topic: String,
    pub forecast_topic: String,
    pub show_sensor_data: bool,
}

impl Settings {
    pub fn new(schedule: &ScheduleConfig, mqtt: &MqttConfig, show_sensor_data: bool) -> Self {
        Self {
            sensor_interval: schedule.sensor_interval_seconds,
            fetch_interval: schedule.fetch_interval_seconds,
            tick: Duration::from_millis(schedule.tick_millis),
            metrics_topic: mqtt.metrics_topic.clone(),
            forecast_topic: mqtt.forecast_topic.clone(),
            show_sensor_data,
        }
    }
}

/// the collaborators the scheduler drives
pub struct Parts<T, P> {
    pub clock: Box<dyn Clock>,
    pub sensor: Box<dyn Sensor>,
    pub link: Box<dyn Link>,
    pub fetcher: RemoteFetcher<T>,
    pub backoff: BackoffController,
    pub cache: Box<dyn CacheStore>,
    pub publisher: P,
    pub display: Box<dyn Display>,
    pub updater: Option<Box<dyn UpdateChannel>>,
}

pub struct Scheduler<T, P> {
    settings: Settings,
    parts: Parts<T, P>,
    schedule: ScheduleState,
}

impl<T: Transport, P: Publisher> Scheduler<T, P> {
    pub fn new(settings: Settings, parts: Parts<T, P>) -> Self {
        Self { settings, parts, schedule: ScheduleState::default() }
    }

    #[cfg(test)]
    pub fn schedule(&self) -> ScheduleState {
        self.schedule
    }

    #[cfg(test)]
    pub fn backoff(&self) -> &BackoffController {
        &self.parts.backoff
    }

    /// one-time startup: both steps due, sink connected if possible, and the
    /// cached forecast on screen so the display is never blank
    pub async fn boot(&mut self) {
        self.schedule = ScheduleState::default();
        if !self.parts.publisher.is_connected() {
            self.parts.publisher.reconnect().await;
        }

        let now = self.parts.clock.now();
        match self.load_cached() {
            Some(summary) => {
                tracing::info!("showing cached forecast until the first fetch");
                self.render_with(now, Some(&summary));
            }
            None => tracing::info!("no cached forecast"),
        }
    }

    /// run forever, or until ctrl-c
    pub async fn run(&mut self) {
        self.boot().await;
        loop {
            self.tick().await;
            tokio::select! {
                _ = tokio::time::sleep(self.settings.tick) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown requested");
                    return;
                }
            }
        }
    }

    pub async fn tick(&mut self) {
        let now = self.parts.clock.now();

        self.maintain().await;

        if is_due(self.schedule.last_sensor_tick, now, self.settings.sensor_interval) {
            self.sensor_step(now);
        }

        if is_due(self.schedule.last_fetch_tick, now, self.settings.fetch_interval) {
            self.fetch_step(now).await;
        }
    }

    async fn maintain(&mut self) {
        if let Some(updater) = self.parts.updater.as_mut() {
            updater.service();
        }

        if self.parts.publisher.is_connected() {
            self.parts.publisher.service().await;
        } else {
            self.parts.publisher.reconnect().await;
        }
    }

    fn sensor_step(&mut self, now: u64) {
        let reading = sensor::sample(&mut *self.parts.sensor, now);
        if self.settings.show_sensor_data {
            tracing::info!(
                "Local sensor T: {:.2} C  H: {:.2} %  P: {:.2} Pa",
                reading.temperature,
                reading.humidity,
                reading.pressure
            );
        }

        let msg = publish::metrics_message(&reading);
        publish::publish_logged(&mut self.parts.publisher, &self.settings.metrics_topic, &msg);

        // redrawn without remote context; the next fetch step restores it
        self.parts.display.show(&display::render(&reading, None));
        self.schedule.last_sensor_tick = Some(now);
    }

    async fn fetch_step(&mut self, now: u64) {
        self.schedule.last_fetch_tick = Some(now);

        if self.parts.backoff.is_gated(now) {
            tracing::debug!("skipping fetch due to backoff");
            return;
        }

        let fetched = self
            .parts
            .fetcher
            .fetch(&mut self.parts.backoff, &*self.parts.link, now)
            .await;

        match fetched {
            Ok(payload) => match forecast::parse(&payload) {
                Ok(summary) => {
                    tracing::info!("fetched weather: {:.2} C {}", summary.current_temp, summary.description);
                    self.parts.cache.write(&payload);
                    let msg = publish::forecast_message(&summary, now);
                    publish::publish_logged(&mut self.parts.publisher, &self.settings.forecast_topic, &msg);
                    self.render_with(now, Some(&summary));
                }
                Err(e) => tracing::warn!("{}; payload discarded", e),
            },
            Err(e) => {
                if !matches!(e, FetchError::Transport(_) | FetchError::BadStatus(_)) {
                    tracing::warn!("failed to fetch weather: {}", e);
                }
                match self.load_cached() {
                    Some(summary) => self.render_with(now, Some(&summary)),
                    None => tracing::info!("no usable cached forecast; display unchanged"),
                }
            }
        }
    }

    /// cached payload, if present and parseable
    fn load_cached(&mut self) -> Option<ForecastSummary> {
        let Some(payload) = self.parts.cache.read() else {
            let health = self.parts.cache.health();
            if health.read_failures > 0 {
                tracing::debug!("cache degraded: {:?}", health);
            }
            return None;
        };
        match forecast::parse(&payload) {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!("cached {}", e);
                None
            }
        }
    }

    fn render_with(&mut self, now: u64, remote: Option<&ForecastSummary>) {
        let reading = sensor::sample(&mut *self.parts.sensor, now);
        self.parts.display.show(&display::render(&reading, remote));
    }
}
