//! Conversions from configuration sections into control-loop types.

use sl_controls::{ControlOptions, ControlResult, FlowCurve, FlowOutput, Thresholds};

use crate::schema::{ControlDef, SettingsDef};

/// Initial thresholds from the `value` fields of the settings section.
pub fn thresholds(settings: &SettingsDef) -> ControlResult<Thresholds> {
    let flow = FlowCurve::new(
        settings.flow.temp_min.value,
        settings.flow.temp_max.value,
        settings.flow.duty_min.value,
        settings.flow.duty_max.value,
    )?;
    Thresholds::new(
        settings.solar_critical.value,
        settings.solar_on.value,
        settings.solar_off.value,
        settings.tank_max.value,
        flow,
    )
}

pub fn control_options(control: &ControlDef) -> ControlResult<ControlOptions> {
    Ok(ControlOptions {
        settle_delay: control.settle_delay(),
        reduction_window: control.reduction_window(),
        output: FlowOutput::new(control.invert, control.flow_max)?,
    })
}
