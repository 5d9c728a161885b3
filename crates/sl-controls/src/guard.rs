//! Ordered stop conditions evaluated before any flow decision.
//!
//! The table order is the priority order: the first entry whose predicate
//! holds wins, and nothing else is evaluated for that tick.

use serde::Serialize;

use crate::controller::Mode;
use crate::measured::Readings;
use crate::settings::Thresholds;

/// Why a guard forced the circuit to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GuardKind {
    /// Panel reached the critical temperature.
    Critical,
    /// Tank is at its maximum temperature.
    TankFull,
    /// The loop would carry heat from the tank back into the panel.
    HeatEscape,
}

impl GuardKind {
    pub fn reason(self) -> &'static str {
        match self {
            GuardKind::Critical => "critical",
            GuardKind::TankFull => "tank full",
            GuardKind::HeatEscape => "heat escape",
        }
    }

    /// Mode reported while this guard holds the circuit down.
    pub fn mode(self) -> Mode {
        match self {
            GuardKind::Critical => Mode::Failsafe,
            GuardKind::TankFull => Mode::TankFull,
            GuardKind::HeatEscape => Mode::HeatEscape,
        }
    }
}

/// Everything a guard predicate may look at.
#[derive(Debug, Clone, Copy)]
pub struct GuardInput<'a> {
    pub readings: &'a Readings,
    pub delta: f64,
    pub thresholds: &'a Thresholds,
}

/// One row of the guard table.
#[derive(Clone, Copy)]
pub struct Guard {
    pub kind: GuardKind,
    pub predicate: fn(&GuardInput<'_>) -> bool,
}

/// Guards in priority order.
pub const GUARDS: [Guard; 3] = [
    Guard {
        kind: GuardKind::Critical,
        predicate: panel_critical,
    },
    Guard {
        kind: GuardKind::TankFull,
        predicate: tank_full,
    },
    Guard {
        kind: GuardKind::HeatEscape,
        predicate: heat_escaping,
    },
];

fn panel_critical(i: &GuardInput<'_>) -> bool {
    i.readings.panel >= i.thresholds.solar_critical()
}

fn tank_full(i: &GuardInput<'_>) -> bool {
    i.readings.tank > i.thresholds.tank_max()
}

// Panel is colder than the loop: circulating would heat the panel.
fn heat_escaping(i: &GuardInput<'_>) -> bool {
    i.delta < 0.0
}

/// A fired guard together with a log-friendly description.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardTrip {
    pub kind: GuardKind,
    pub detail: String,
}

/// Evaluate `guards` in order and return the first one that fires.
pub fn evaluate_with(guards: &[Guard], input: &GuardInput<'_>) -> Option<GuardTrip> {
    guards
        .iter()
        .find(|g| (g.predicate)(input))
        .map(|g| GuardTrip {
            kind: g.kind,
            detail: describe(g.kind, input),
        })
}

/// Evaluate the standard guard table.
pub fn evaluate(input: &GuardInput<'_>) -> Option<GuardTrip> {
    evaluate_with(&GUARDS, input)
}

fn describe(kind: GuardKind, input: &GuardInput<'_>) -> String {
    match kind {
        GuardKind::Critical => format!(
            "Critical solar temperature reached: {:.1} degrees",
            input.readings.panel
        ),
        GuardKind::TankFull => format!(
            "Tank filled with hot water: {:.1} degrees",
            input.readings.tank
        ),
        GuardKind::HeatEscape => format!(
            "Heat escape prevention, delta: {:.2} < 0",
            input.delta
        ),
    }
}
