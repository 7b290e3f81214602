//! This module converts a manufacturer's net sensible heat ratio, which already counts the
//! indoor fan heat as a load on the airstream, into the coil-only (gross) value.

use crate::compare_floats::clamp_to_band;
use crate::core::units::{BTU_PER_HOUR_PER_TON, BTU_PER_WATT_HOUR};
use crate::errors::DerivationError;
use tracing::debug;

pub const MIN_GROSS_SHR: f64 = 0.60;

/// Highest gross SHR the coil model stays stable at for the given airflow (cfm/ton)
pub fn max_gross_shr(airflow_per_ton: f64) -> f64 {
    0.3821066 + 0.001050652 * airflow_per_ton - 0.01
}

/// Arguments:
/// * `net_shr` - rated net sensible heat ratio, in (0, 1]
/// * `fan_power` - rated indoor fan power, in W/cfm
/// * `airflow_per_ton` - rated airflow of the stage, in cfm/ton
pub fn gross_shr_from_net(
    net_shr: f64,
    fan_power: f64,
    airflow_per_ton: f64,
) -> Result<f64, DerivationError> {
    if !(net_shr > 0. && net_shr <= 1.) {
        return Err(DerivationError::InvalidInput(format!(
            "net SHR must lie in (0, 1], got {net_shr}"
        )));
    }

    // one reference ton of net capacity
    let net_total_capacity = BTU_PER_HOUR_PER_TON;
    let net_sensible_capacity = net_total_capacity * net_shr;
    let fan_heat = airflow_per_ton * fan_power * BTU_PER_WATT_HOUR;

    let gross_shr = (net_sensible_capacity + fan_heat) / (net_total_capacity + fan_heat);
    let upper = max_gross_shr(airflow_per_ton);
    let clamped = clamp_to_band(gross_shr, MIN_GROSS_SHR, upper);

    if clamped != gross_shr {
        debug!(
            "Gross SHR of {gross_shr} clamped into [{MIN_GROSS_SHR}, {upper}], giving {clamped}"
        );
    }

    Ok(clamped)
}
