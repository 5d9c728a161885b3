//! HTTP endpoints for monitoring.
//!
//! - GET /metrics: Prometheus text exposition
//! - GET /status: operating mode and last tick results
//! - GET /config: thresholds currently in force
//! - GET /sensors: every configured sensor and its latest value
//! - GET /sensors/panel: panel probe temperature and raw voltage
//! - GET /health: 200 while ticks keep completing, 500 otherwise

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use sl_config::SensorsDef;
use sl_controls::{ControlMetrics, SensorId, SensorSnapshot, SettingsSnapshot, Thresholds};
use tokio::net::TcpListener;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::status::{StatusBoard, StatusView};

/// Shared server state.
pub struct AppState {
    pub sensors: Arc<SensorSnapshot>,
    pub settings: Arc<SettingsSnapshot>,
    pub metrics: Arc<ControlMetrics>,
    pub status: Arc<StatusBoard>,
    pub devices: SensorsDef,
    pub health_timeout: Duration,
}

#[derive(Debug, Serialize)]
pub struct SensorView {
    pub name: SensorId,
    pub dev: String,
    pub circuit: String,
    pub value: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct PanelView {
    pub name: SensorId,
    pub temperature: Option<f64>,
    pub voltage: f64,
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.export(),
    )
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusView> {
    Json(state.status.view())
}

async fn config_handler(State(state): State<Arc<AppState>>) -> Json<Thresholds> {
    Json(state.settings.load())
}

async fn sensors_handler(State(state): State<Arc<AppState>>) -> Json<Vec<SensorView>> {
    let views = state
        .devices
        .devices()
        .map(|(id, device)| SensorView {
            name: id,
            dev: device.dev.clone(),
            circuit: device.circuit.clone(),
            value: state.sensors.get(id),
        })
        .collect();
    Json(views)
}

async fn panel_handler(State(state): State<Arc<AppState>>) -> Json<PanelView> {
    Json(PanelView {
        name: SensorId::SolarUp,
        temperature: state.sensors.get(SensorId::SolarUp),
        voltage: state.metrics.panel_voltage.get(),
    })
}

async fn health_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.status.is_healthy(Instant::now(), state.health_timeout) {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/status", get(status_handler))
        .route("/config", get(config_handler))
        .route("/sensors", get(sensors_handler))
        .route("/sensors/panel", get(panel_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Serve the monitoring endpoints on an already bound listener.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> AppResult<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Monitoring endpoints listening");
    }
    axum::serve(listener, router(state))
        .await
        .map_err(|e| AppError::Server(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sl_config::DeviceDef;
    use sl_controls::{FlowCurve, Mode, TickOutcome};

    fn device(dev: &str, circuit: &str) -> DeviceDef {
        DeviceDef {
            dev: dev.to_string(),
            circuit: circuit.to_string(),
        }
    }

    fn state() -> Arc<AppState> {
        let flow = FlowCurve::new(5.0, 9.0, 1.8, 3.0).unwrap();
        let thresholds = Thresholds::new(90.0, 6.0, 5.0, 65.0, flow).unwrap();
        Arc::new(AppState {
            sensors: Arc::new(SensorSnapshot::new()),
            settings: Arc::new(SettingsSnapshot::new(thresholds)),
            metrics: Arc::new(ControlMetrics::new()),
            status: Arc::new(StatusBoard::new(Utc::now())),
            devices: SensorsDef {
                solar_up: device("ai", "1_01"),
                solar_in: device("temp", "A"),
                solar_out: device("temp", "B"),
                tank_up: device("temp", "C"),
            },
            health_timeout: Duration::from_secs(60),
        })
    }

    #[tokio::test]
    async fn health_follows_last_tick() {
        let state = state();
        assert_eq!(
            health_handler(State(Arc::clone(&state))).await,
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let outcome = TickOutcome {
            delta: 3.0,
            mode: Mode::Stopped,
            flow: Some(1.8),
            guard: None,
        };
        state.status.record(&outcome, Instant::now(), Utc::now());
        assert_eq!(health_handler(State(state)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn sensors_report_missing_as_null() {
        let state = state();
        state.sensors.update(SensorId::SolarIn, 31.5);
        let Json(views) = sensors_handler(State(state)).await;
        assert_eq!(views.len(), 4);
        assert_eq!(views[1].name, SensorId::SolarIn);
        assert_eq!(views[1].value, Some(31.5));
        assert_eq!(views[0].value, None);

        let json = serde_json::to_value(&views[1]).unwrap();
        assert_eq!(json["name"], "solarIn");
        assert_eq!(json["circuit"], "A");
    }

    #[tokio::test]
    async fn panel_reports_voltage_gauge() {
        let state = state();
        state.sensors.update(SensorId::SolarUp, 50.0);
        state.metrics.panel_voltage.set(3.0);
        let Json(panel) = panel_handler(State(state)).await;
        assert_eq!(panel.temperature, Some(50.0));
        assert_eq!(panel.voltage, 3.0);
    }

    #[tokio::test]
    async fn config_serves_current_thresholds() {
        let state = state();
        let Json(thresholds) = config_handler(State(Arc::clone(&state))).await;
        assert_eq!(thresholds, state.settings.load());
        let json = serde_json::to_value(thresholds).unwrap();
        assert_eq!(json["solarCritical"], 90.0);
    }

    #[tokio::test]
    async fn metrics_are_plain_text() {
        let state = state();
        state.metrics.failsafe_total.inc();
        let body = metrics_handler(State(state)).await.into_response();
        assert_eq!(body.status(), StatusCode::OK);
        assert_eq!(
            body.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }
}
