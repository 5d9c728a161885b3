//! Metrics published by the control loop.

use sl_core::{Counter, Gauge, render};

use crate::guard::GuardKind;

#[derive(Debug)]
pub struct ControlMetrics {
    pub heat_escape_total: Counter,
    pub failsafe_total: Counter,
    pub tank_full_total: Counter,
    pub reduced_mode: Gauge,
    pub flow_rate: Gauge,
    pub circuit_running: Gauge,
    pub delta: Gauge,
    pub panel_temperature: Gauge,
    pub panel_voltage: Gauge,
}

impl Default for ControlMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlMetrics {
    pub fn new() -> Self {
        Self {
            heat_escape_total: Counter::new(
                "solar_heat_escape_total",
                "Increase when heat escape system kicked in",
            ),
            failsafe_total: Counter::new(
                "solar_failsafe_total",
                "Increase when failsafe system kicked in",
            ),
            tank_full_total: Counter::new(
                "solar_tank_full_total",
                "Increase when heating stopped due to tank being full",
            ),
            reduced_mode: Gauge::new(
                "solar_reduced_mode",
                "Solar circuit is operating in reduced mode",
            ),
            flow_rate: Gauge::new("solar_flow_rate_volts", "Flow rate in volts"),
            circuit_running: Gauge::new(
                "solar_circuit_running_binary",
                "Registers when solar control circuit is running",
            ),
            delta: Gauge::new(
                "solar_temperature_delta_celsius",
                "Temperature delta used for setting flow rate",
            ),
            panel_temperature: Gauge::new(
                "solar_panel_temperature_celsius",
                "Temperature of solar panel",
            ),
            panel_voltage: Gauge::new(
                "solar_panel_voltage_volts",
                "Voltage reported by solar panel temperature sensor",
            ),
        }
    }

    /// Counter incremented each tick the given guard fires.
    pub fn guard_counter(&self, kind: GuardKind) -> &Counter {
        match kind {
            GuardKind::Critical => &self.failsafe_total,
            GuardKind::TankFull => &self.tank_full_total,
            GuardKind::HeatEscape => &self.heat_escape_total,
        }
    }

    /// Prometheus text exposition of every metric.
    pub fn export(&self) -> String {
        render(&[
            &self.heat_escape_total,
            &self.failsafe_total,
            &self.tank_full_total,
            &self.reduced_mode,
            &self.flow_rate,
            &self.circuit_running,
            &self.delta,
            &self.panel_temperature,
            &self.panel_voltage,
        ])
    }
}
