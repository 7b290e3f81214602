use thiserror::Error;

pub const BTU_PER_WATT_HOUR: f64 = 3.412141633;
pub const BTU_PER_HOUR_PER_TON: f64 = 12_000.;
pub const WATTS_PER_TON: f64 = BTU_PER_HOUR_PER_TON / BTU_PER_WATT_HOUR;
/// Nominal airflow at which rated fan power (W/cfm) is quoted
pub const RATED_CFM_PER_TON: f64 = 400.;
/// Converts rated fan power in W/cfm into fan power per unit of capacity (W/W)
pub const FAN_POWER_PER_CAPACITY: f64 = RATED_CFM_PER_TON / WATTS_PER_TON;

const FAHRENHEIT_PER_KELVIN: f64 = 1.8;
const FAHRENHEIT_AT_ABSOLUTE_ZERO: f64 = -459.67;
const FAHRENHEIT_AT_ZERO_CELSIUS: f64 = 32.;

pub(crate) fn fahrenheit_to_kelvin(temp_f: f64) -> Result<f64, BelowAbsoluteZeroError> {
    if temp_f < FAHRENHEIT_AT_ABSOLUTE_ZERO {
        Err(BelowAbsoluteZeroError::from_f(temp_f))
    } else {
        Ok((temp_f - FAHRENHEIT_AT_ABSOLUTE_ZERO) / FAHRENHEIT_PER_KELVIN)
    }
}

/// Linear map `degF = scale * v + offset` for a temperature scale `v`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FahrenheitMapping {
    pub scale: f64,
    pub offset: f64,
}

impl FahrenheitMapping {
    pub(crate) const IDENTITY: Self = Self {
        scale: 1.,
        offset: 0.,
    };

    pub(crate) const CELSIUS: Self = Self {
        scale: FAHRENHEIT_PER_KELVIN,
        offset: FAHRENHEIT_AT_ZERO_CELSIUS,
    };

    /// Absolute temperature divided by a reference temperature (in K)
    pub(crate) fn normalized_kelvin(reference_k: f64) -> Self {
        Self {
            scale: FAHRENHEIT_PER_KELVIN * reference_k,
            offset: FAHRENHEIT_AT_ABSOLUTE_ZERO,
        }
    }

    pub(crate) fn from_fahrenheit(&self, temp_f: f64) -> f64 {
        (temp_f - self.offset) / self.scale
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq)]
#[error("A temperature of {k}ºK/{}ºF was encountered, which is less than absolute zero", k * 1.8 - 459.67)]
pub struct BelowAbsoluteZeroError {
    k: f64,
}

impl BelowAbsoluteZeroError {
    fn from_f(f: f64) -> Self {
        Self {
            k: (f - FAHRENHEIT_AT_ABSOLUTE_ZERO) / FAHRENHEIT_PER_KELVIN,
        }
    }
}
