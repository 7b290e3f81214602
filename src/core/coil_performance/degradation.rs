use crate::core::curves::SingleVariableCurve;
use crate::input::CoilMode;
use serde::Serialize;

const SEER_THRESHOLD: f64 = 13.;
const HSPF_THRESHOLD: f64 = 7.;

/// Cycling degradation coefficient (Cd) for a coil with `num_stages` capacity stages.
///
/// `seasonal_rating` is the SEER or HSPF of the equipment where it has one; single-stage
/// equipment rated directly by EER or COP is treated as meeting the rating threshold.
pub fn degradation_coefficient(
    mode: CoilMode,
    num_stages: usize,
    seasonal_rating: Option<f64>,
) -> f64 {
    let below_threshold = |threshold: f64| seasonal_rating.is_some_and(|rating| rating < threshold);

    match (mode, num_stages) {
        (CoilMode::Cooling, 1) if below_threshold(SEER_THRESHOLD) => 0.20,
        (CoilMode::Cooling, 1) => 0.07,
        (CoilMode::Cooling, 2) => 0.11,
        (CoilMode::Cooling, _) => 0.25,
        (CoilMode::Heating, 1) if below_threshold(HSPF_THRESHOLD) => 0.20,
        (CoilMode::Heating, 1) => 0.11,
        (CoilMode::Heating, 2) => 0.11,
        (CoilMode::Heating, _) => 0.24,
    }
}

/// Linear part-load fraction curve `PLF(PLR) = (1 - Cd) + Cd * PLR`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PartLoadCurve {
    degradation_coefficient: f64,
}

impl PartLoadCurve {
    pub fn new(degradation_coefficient: f64) -> Self {
        Self {
            degradation_coefficient,
        }
    }

    pub fn degradation_coefficient(&self) -> f64 {
        self.degradation_coefficient
    }

    pub fn part_load_fraction(&self, part_load_ratio: f64) -> f64 {
        (1. - self.degradation_coefficient) + self.degradation_coefficient * part_load_ratio
    }

    /// Coefficients of the curve in quadratic form, as simulation engines expect
    pub fn coefficients(&self) -> [f64; 3] {
        [
            1. - self.degradation_coefficient,
            self.degradation_coefficient,
            0.,
        ]
    }

    pub fn as_curve(&self) -> SingleVariableCurve {
        SingleVariableCurve::quadratic(self.coefficients())
    }
}
