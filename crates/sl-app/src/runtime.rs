//! Process wiring: background threads, startup gate, and the control loop.
//!
//! The gateway and settings clients are blocking, so sensor polling and
//! settings refresh run on plain threads and the control loop runs on the
//! calling thread. The monitoring server gets its own tokio runtime on a
//! dedicated thread.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use sl_config::Config;
use sl_controls::{
    ActuatorSink, ControlMetrics, Controller, FlowOutput, Mode, SensorSnapshot, SettingsSnapshot,
    Settle, ThreadSettle, TickOutcome,
};
use sl_io::{EvokClient, HassClient, SensorRouter, poll_sensors};
use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult};
use crate::server::{self, AppState};
use crate::settings_sync::{self, RefreshOutcome};
use crate::startup;
use crate::status::StatusBoard;

/// Per-request timeout for gateway and settings calls.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const STARTUP_POLL: Duration = Duration::from_millis(500);
const RESET_REASON: &str = "SYSTEM RESET";

/// Run one control tick and publish its outcome.
pub fn step<A: ActuatorSink, S: Settle>(
    controller: &mut Controller<A, S>,
    status: &StatusBoard,
    now: Instant,
    at: DateTime<Utc>,
) -> Option<TickOutcome> {
    match controller.tick(now) {
        Ok(outcome) => {
            debug!(
                delta = outcome.delta,
                mode = %outcome.mode,
                flow = ?outcome.flow,
                "Tick complete"
            );
            if status.mode() != outcome.mode {
                info!(mode = %outcome.mode, "Mode changed");
            }
            status.record(&outcome, now, at);
            Some(outcome)
        }
        Err(e) => {
            warn!(error = %e, "Control tick failed");
            None
        }
    }
}

fn spawn_sensor_poller(
    client: EvokClient,
    router: SensorRouter,
    interval: Duration,
) -> AppResult<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("sensor-poll".to_string())
        .spawn(move || {
            loop {
                let applied = poll_sensors(&client, &router);
                debug!(applied, "Sensor poll complete");
                thread::sleep(interval);
            }
        })?;
    Ok(handle)
}

fn spawn_settings_refresher(
    client: HassClient,
    config: Arc<Config>,
    snapshot: Arc<SettingsSnapshot>,
    output: FlowOutput,
    interval: Duration,
) -> AppResult<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("settings-refresh".to_string())
        .spawn(move || {
            loop {
                let outcome = settings_sync::refresh_once(
                    &client,
                    &config.settings,
                    &snapshot,
                    &output,
                );
                if let RefreshOutcome::Applied { fetched } = outcome {
                    debug!(fetched, "Settings refreshed");
                }
                thread::sleep(interval);
            }
        })?;
    Ok(handle)
}

fn spawn_server(listen: SocketAddr, state: Arc<AppState>) -> AppResult<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("http")
        .enable_all()
        .build()?;
    let listener = runtime.block_on(tokio::net::TcpListener::bind(listen))?;
    let handle = thread::Builder::new()
        .name("http-server".to_string())
        .spawn(move || {
            if let Err(e) = runtime.block_on(server::serve(listener, state)) {
                error!(error = %e, "Monitoring server stopped");
            }
        })?;
    Ok(handle)
}

/// Run the controller until the process is killed.
///
/// # Errors
///
/// Returns error if the configuration cannot be turned into control types,
/// a client or the monitoring listener cannot be set up, sensors do not all
/// report within the startup timeout, or the startup reset fails.
pub fn run(config: Config) -> AppResult<()> {
    let config = Arc::new(config);
    let thresholds = config.thresholds()?;
    let options = config.control_options()?;
    let listen: SocketAddr = config
        .server
        .listen
        .parse()
        .map_err(|e| AppError::InvalidInput(format!("listen address: {e}")))?;

    if options.output.invert {
        info!("Inverted flow regulator: higher voltage means less flow");
    }

    let sensors = Arc::new(SensorSnapshot::new());
    let settings = Arc::new(SettingsSnapshot::new(thresholds));
    let metrics = Arc::new(ControlMetrics::new());
    let status = Arc::new(StatusBoard::new(Utc::now()));

    let state = Arc::new(AppState {
        sensors: Arc::clone(&sensors),
        settings: Arc::clone(&settings),
        metrics: Arc::clone(&metrics),
        status: Arc::clone(&status),
        devices: config.sensors.clone(),
        health_timeout: config.server.health_timeout(),
    });
    spawn_server(listen, state)?;

    info!(address = %config.evok.address, "Connecting to EVOK");
    let poll_client = EvokClient::new(&config.evok.address, config.actuators.clone(), HTTP_TIMEOUT)?;
    let router = SensorRouter::new(
        &config.sensors,
        config.panel,
        Arc::clone(&sensors),
        Arc::clone(&metrics),
    );
    spawn_sensor_poller(poll_client, router, config.sync.sensor_poll())?;

    info!(address = %config.homeassistant.address, "Connecting to Home Assistant");
    let hass = HassClient::new(
        &config.homeassistant.address,
        &config.homeassistant.token,
        HTTP_TIMEOUT,
    )?;
    spawn_settings_refresher(
        hass,
        Arc::clone(&config),
        Arc::clone(&settings),
        options.output,
        config.sync.settings_refresh(),
    )?;

    startup::wait_for_sensors(
        &sensors,
        config.startup.sensor_timeout(),
        config.startup.sensor_log_every(),
        STARTUP_POLL,
    )?;

    let sink = EvokClient::new(&config.evok.address, config.actuators.clone(), HTTP_TIMEOUT)?;
    let mut controller = Controller::new(
        Arc::clone(&sensors),
        Arc::clone(&settings),
        sink,
        ThreadSettle,
        options,
        Arc::clone(&metrics),
    );
    controller.reset(RESET_REASON)?;
    status.set_mode(Mode::Stopped, Utc::now());

    let interval = config.control.poll_interval();
    info!(interval_s = interval.as_secs(), "Control loop started");
    loop {
        thread::sleep(interval);
        step(&mut controller, &status, Instant::now(), Utc::now());
    }
}
