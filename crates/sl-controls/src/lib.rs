//! Control-loop decision engine for a solar-thermal collector circuit.
//!
//! Every poll interval the [`Controller`] reads the sensor and settings
//! snapshots, runs the ordered safety guards, and then chooses between
//! modulating the flow actuator, holding it at minimum duty, or stopping the
//! circulation pump and valve.
//!
//! # Architecture
//!
//! - [`measured`] and [`settings`] hold the shared snapshots written by the
//!   ingestion and refresh tasks
//! - [`flow`] maps a temperature delta onto a duty value
//! - [`guard`] is the prioritised table of stop conditions
//! - [`circuit`] sequences pump, valve and flow commands with settle delays
//! - [`reduced`] decides between modulation, reduced hold and shutdown
//! - [`controller`] composes all of the above into one tick
//!
//! All hardware access goes through the [`ActuatorSink`] and [`Settle`]
//! traits so the whole loop can be driven with simulated time in tests.

pub mod actuator;
pub mod circuit;
pub mod controller;
pub mod error;
pub mod flow;
pub mod guard;
pub mod measured;
pub mod metrics;
pub mod reduced;
pub mod settings;

pub use actuator::{Actuator, ActuatorSink, FlowOutput, OFF, ON, Settle, ThreadSettle};
pub use circuit::Circuit;
pub use controller::{ControlOptions, Controller, Mode, TickOutcome};
pub use error::{ControlError, ControlResult};
pub use flow::FlowCurve;
pub use guard::{GUARDS, Guard, GuardInput, GuardKind, GuardTrip};
pub use measured::{Readings, SensorId, SensorSnapshot};
pub use metrics::ControlMetrics;
pub use reduced::{DutyBranch, ReducedWindow};
pub use settings::{SettingId, SettingValues, SettingsSnapshot, Thresholds};
