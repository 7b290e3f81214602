use crate::core::catalog::StageCurves;
use crate::core::coil_performance::stages::PendingStage;
use crate::core::curves::DomainPolicy;
use crate::core::solvers::balance_temperature;
use crate::errors::{CurveError, DerivationError};
use crate::input::CoilMode;
use serde::Serialize;

/// A stage at one rating condition, with capacities and powers per unit of nominal capacity.
///
/// The curve modifiers do not depend on the efficiency being tried, so they are evaluated
/// once.
#[derive(Clone, Debug)]
pub(crate) struct RatingCondition {
    temperature: f64,
    gross_capacity: f64,
    eir_modifier: f64,
    fan_power: f64,
    stage: PendingStage,
}

impl RatingCondition {
    /// Arguments:
    /// * `stage` - the stage being rated
    /// * `curves` - performance curves of the stage
    /// * `indoor_temperature` - entering wet bulb (cooling) or dry bulb (heating), in degF
    /// * `outdoor_temperature` - in degF
    /// * `policy` - what to do when a temperature lies outside a curve's valid range
    pub(crate) fn new(
        stage: &PendingStage,
        curves: &StageCurves,
        indoor_temperature: f64,
        outdoor_temperature: f64,
        policy: DomainPolicy,
    ) -> Result<Self, CurveError> {
        // rating conditions are at rated airflow
        let flow_fraction = 1.;

        let capacity_modifier = curves.capacity_ft.evaluate_fahrenheit(
            indoor_temperature,
            outdoor_temperature,
            policy,
        )? * curves.capacity_fflow.evaluate(flow_fraction, policy)?;
        let eir_modifier = curves.eir_ft.evaluate_fahrenheit(
            indoor_temperature,
            outdoor_temperature,
            policy,
        )? * curves.eir_fflow.evaluate(flow_fraction, policy)?;

        Ok(Self {
            temperature: outdoor_temperature,
            gross_capacity: stage.capacity_ratio() * capacity_modifier,
            eir_modifier,
            fan_power: stage.normalized_fan_power(),
            stage: stage.clone(),
        })
    }

    pub(crate) fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Net capacity: fan heat is a gain to the airstream, so it is lost to cooling and
    /// adds to heating.
    pub(crate) fn net_capacity(&self, mode: CoilMode) -> f64 {
        match mode {
            CoilMode::Cooling => self.gross_capacity - self.fan_power,
            CoilMode::Heating => self.gross_capacity + self.fan_power,
        }
    }

    /// Net power drawn, fan included, for a maximum-stage full-load efficiency
    pub(crate) fn net_power(&self, mode: CoilMode, max_stage_efficiency: f64) -> f64 {
        let rated_eir = self.stage.eir_for(mode, max_stage_efficiency);
        self.gross_capacity * rated_eir * self.eir_modifier + self.fan_power
    }
}

/// Straight line in outdoor temperature.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Line {
    temperature: f64,
    value: f64,
    slope: f64,
}

impl Line {
    pub(crate) fn new(temperature: f64, value: f64, slope: f64) -> Self {
        Self {
            temperature,
            value,
            slope,
        }
    }

    pub(crate) fn through(first: (f64, f64), second: (f64, f64)) -> Self {
        Self::new(first.0, first.1, (second.1 - first.1) / (second.0 - first.0))
    }

    pub(crate) fn slope(&self) -> f64 {
        self.slope
    }
}

/// A quantity (capacity or power) varying piecewise linearly with outdoor temperature.
pub(crate) trait Profile {
    /// The segment in force at `temperature`
    fn segment_at(&self, temperature: f64) -> Line;

    fn at(&self, temperature: f64) -> f64 {
        let segment = self.segment_at(temperature);
        segment.value + segment.slope * (temperature - segment.temperature)
    }
}

impl Profile for Line {
    fn segment_at(&self, _temperature: f64) -> Line {
        *self
    }
}

/// Maximum-stage heating profile, which dips between the low-temperature rating point and
/// the upper edge of the frosting band while the outdoor coil defrosts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FrostedProfile {
    clear: Line,
    frosted: Line,
    frost_band: (f64, f64),
}

impl FrostedProfile {
    pub(crate) fn new(clear: Line, frosted: Line, frost_band: (f64, f64)) -> Self {
        Self {
            clear,
            frosted,
            frost_band,
        }
    }
}

impl Profile for FrostedProfile {
    fn segment_at(&self, temperature: f64) -> Line {
        let (lower, upper) = self.frost_band;
        if lower < temperature && temperature < upper {
            self.frosted
        } else {
            self.clear
        }
    }
}

/// Line through `value` at `temperature` whose slope is blended between the neighbouring
/// envelopes according to where `value` sits between them.
pub(crate) fn blended_line(
    temperature: f64,
    value: f64,
    low: &Line,
    high: &impl Profile,
) -> Line {
    let low_value = low.at(temperature);
    let position = (value - low_value) / (high.at(temperature) - low_value);
    let slope = low.slope() * (1. - position) + high.segment_at(temperature).slope() * position;

    Line::new(temperature, value, slope)
}

/// Building load as a straight line in outdoor temperature, zero at `zero_load_temperature`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct LoadLine {
    zero_load_temperature: f64,
    load_per_degree: f64,
}

impl LoadLine {
    /// Load reaching `sized_load` at `sizing_temperature`
    pub(crate) fn new(
        zero_load_temperature: f64,
        sizing_temperature: f64,
        sized_load: f64,
    ) -> Self {
        Self {
            zero_load_temperature,
            load_per_degree: sized_load / (sizing_temperature - zero_load_temperature),
        }
    }

    pub(crate) fn load_at(&self, temperature: f64) -> f64 {
        self.load_per_degree * (temperature - self.zero_load_temperature)
    }

    /// Outdoor temperature at which the load meets `capacity`, searched for in `bracket`.
    pub(crate) fn balance_with(
        &self,
        capacity: &impl Profile,
        bracket: (f64, f64),
    ) -> Result<f64, DerivationError> {
        Ok(balance_temperature(
            |temperature| self.load_at(temperature) - capacity.at(temperature),
            bracket.0,
            bracket.1,
        )?)
    }
}

/// Efficiency as a quadratic in outdoor temperature, fitted through three points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct QuadraticFit {
    a: f64,
    b: f64,
    c: f64,
}

impl QuadraticFit {
    pub(crate) fn through(points: [(f64, f64); 3]) -> Self {
        let [(t1, e1), (t2, e2), (t3, e3)] = points;
        let first_slope = (e2 - e1) / (t2 - t1);
        let second_slope = (e3 - e2) / (t3 - t2);

        let c = (second_slope - first_slope) / (t3 - t1);
        let b = first_slope - c * (t1 + t2);
        let a = e1 - b * t1 - c * t1.powi(2);

        Self { a, b, c }
    }

    pub(crate) fn at(&self, temperature: f64) -> f64 {
        self.a + self.b * temperature + self.c * temperature.powi(2)
    }
}

/// How the equipment meets the load in one temperature bin.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum BinRegime {
    /// The lowest stage cycles on and off
    Cycling,
    /// Two-stage equipment alternates between its stages
    Alternating,
    /// Variable-speed equipment modulates to match the load
    Modulating,
    /// The maximum stage runs continuously
    FullCapacity,
}

/// Energy consumed by a stage cycling to deliver `load_fraction` of its capacity
pub(crate) fn cycling_energy(load_fraction: f64, power: f64, degradation_coefficient: f64) -> f64 {
    load_fraction * power / (1. - degradation_coefficient * (1. - load_fraction))
}

/// Share of the time spent on the lower stage when alternating between two capacities
pub(crate) fn low_stage_fraction(load: f64, low_capacity: f64, high_capacity: f64) -> f64 {
    (high_capacity - load) / (high_capacity - low_capacity)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BinResult {
    /// Outdoor temperature, in degF
    pub temperature: f64,
    pub fractional_hours: f64,
    /// Load delivered, per unit of nominal capacity
    pub load: f64,
    /// Compressor and fan energy, per unit of nominal capacity
    pub energy: f64,
    /// Supplementary resistance heat (heating only)
    pub resistance_energy: f64,
    pub regime: BinRegime,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeasonalDiagnostics {
    pub bins: Vec<BinResult>,
    /// Where the load line crosses the minimum, intermediate and maximum stage envelopes
    /// (variable-speed equipment only), in degF
    pub balance_temperatures: Option<[f64; 3]>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeasonalResult {
    pub seasonal_metric: f64,
    pub diagnostics: SeasonalDiagnostics,
}

/// A seasonal rating procedure bound to one set of stages and curves.
pub trait SeasonalBinIntegrator {
    /// Replay the rating procedure for a trial full-load efficiency of the maximum stage.
    fn integrate(&self, max_stage_efficiency: f64) -> SeasonalResult;
}
