//! Applying refreshed thresholds from the settings provider.

use sl_config::SettingsDef;
use sl_controls::{FlowOutput, SettingsSnapshot, Thresholds};
use sl_io::{HassClient, Refresh};
use tracing::{info, warn};

/// What happened to one refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// A new threshold set is in force.
    Applied { fetched: usize },
    /// Fetched values matched the current set.
    Unchanged,
    /// The merged set violated an invariant; the previous set stays.
    Rejected { reason: String },
    /// No entity could be fetched.
    Unavailable,
}

/// Validate a refreshed set as a whole and swap it in.
///
/// The merged curve must also stay inside the regulator range of `output`,
/// the same bound the startup configuration is held to.
pub fn apply_refresh(
    snapshot: &SettingsSnapshot,
    refresh: Refresh,
    output: &FlowOutput,
) -> RefreshOutcome {
    if refresh.fetched == 0 && !refresh.errors.is_empty() {
        warn!(
            failures = refresh.errors.len(),
            "Settings provider unavailable, keeping current thresholds"
        );
        return RefreshOutcome::Unavailable;
    }

    let next = match Thresholds::try_from(refresh.values)
        .and_then(|next| output.check(&next.flow()).map(|()| next))
    {
        Ok(next) => next,
        Err(e) => {
            warn!(error = %e, "Rejecting refreshed thresholds, keeping current set");
            return RefreshOutcome::Rejected {
                reason: e.to_string(),
            };
        }
    };

    if next == snapshot.load() {
        return RefreshOutcome::Unchanged;
    }
    info!(
        solar_on = next.solar_on(),
        solar_off = next.solar_off(),
        solar_critical = next.solar_critical(),
        tank_max = next.tank_max(),
        duty_max = next.flow().duty_max(),
        "Applying refreshed thresholds"
    );
    snapshot.replace(next);
    RefreshOutcome::Applied {
        fetched: refresh.fetched,
    }
}

/// Fetch every setting once and apply the result.
pub fn refresh_once(
    client: &HassClient,
    settings: &SettingsDef,
    snapshot: &SettingsSnapshot,
    output: &FlowOutput,
) -> RefreshOutcome {
    let refresh = client.refresh(settings, &snapshot.load());
    apply_refresh(snapshot, refresh, output)
}
