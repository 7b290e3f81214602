use crate::compare_floats::max_of_2;
use crate::core::catalog::{CompressorLockout, HeatingBins, ModeCatalog};
use crate::core::coil_performance::envelope::{
    blended_line, cycling_energy, low_stage_fraction, BinRegime, BinResult, FrostedProfile, Line,
    LoadLine, Profile, QuadraticFit, RatingCondition, SeasonalBinIntegrator, SeasonalDiagnostics,
    SeasonalResult,
};
use crate::core::coil_performance::seasonal_cooling::{line_through, rating_condition};
use crate::core::coil_performance::stages::PendingStage;
use crate::core::curves::DomainPolicy;
use crate::core::units::BTU_PER_WATT_HOUR;
use crate::errors::DerivationError;
use crate::input::CoilMode;

/// Capacity and power of the maximum stage at the intermediate temperature while frosting,
/// relative to straight-line interpolation between its low and high temperature points
const FROST_CAPACITY_FACTOR: f64 = 0.9;
const FROST_POWER_FACTOR: f64 = 0.985;
/// Outdoor temperature (degF) above which the outdoor coil no longer frosts
const FROST_LIMIT_TEMPERATURE: f64 = 45.;
/// Span below the zero-load temperature searched for balance points, in degF
const BALANCE_SEARCH_SPAN: f64 = 165.;

const MODE: CoilMode = CoilMode::Heating;

/// Share of the heat pump's output credited in a bin, given the compressor lockout.
fn lockout_credit(temperature: f64, cop: f64, lockout: &CompressorLockout) -> f64 {
    if temperature <= lockout.cutout_temperature || cop < 1. {
        0.
    } else if temperature <= lockout.cut_in_temperature {
        0.5
    } else {
        1.
    }
}

/// The seasonal heating (HSPF) bin procedure for one set of stages.
#[derive(Clone, Debug)]
pub struct SeasonalHeatingIntegrator<'a> {
    bins: &'a HeatingBins,
    lockout: CompressorLockout,
    degradation_coefficient: f64,
    /// Maximum stage at the high and low rating temperatures
    maximum: [RatingCondition; 2],
    /// Minimum stage at the high and minimum-stage high rating temperatures
    minimum: Option<[RatingCondition; 2]>,
    intermediate: Option<RatingCondition>,
    load_line: LoadLine,
    high_capacity: FrostedProfile,
    low_capacity: Option<Line>,
    balance_temperatures: Option<[f64; 3]>,
}

impl<'a> SeasonalHeatingIntegrator<'a> {
    /// Evaluate the rating points of `stages` and the balance points of the load line.
    ///
    /// Arguments:
    /// * `stages` - the stages of the coil, lowest capacity first
    /// * `mode_catalog` - curves of the coil
    /// * `bins` - bins and rating conditions of the procedure
    /// * `lockout` - compressor cutout and cut-in temperatures
    /// * `degradation_coefficient` - cycling degradation (Cd) of the coil
    /// * `policy` - what to do when a rating condition lies outside a curve's valid range
    pub fn new(
        stages: &[PendingStage],
        mode_catalog: &ModeCatalog,
        bins: &'a HeatingBins,
        lockout: CompressorLockout,
        degradation_coefficient: f64,
        policy: DomainPolicy,
    ) -> Result<Self, DerivationError> {
        let rate = |index: usize, outdoor_temperature: f64| {
            rating_condition(
                stages,
                mode_catalog,
                index,
                bins.indoor_temperature,
                outdoor_temperature,
                policy,
            )
        };

        let max_index = stages.len().checked_sub(1).ok_or_else(|| {
            DerivationError::InvalidInput("no stages to rate".to_owned())
        })?;

        let maximum = [
            rate(max_index, bins.high_temperature)?,
            rate(max_index, bins.low_temperature)?,
        ];
        let minimum = if max_index >= 1 {
            Some([
                rate(0, bins.high_temperature)?,
                rate(0, bins.min_stage_high_temperature)?,
            ])
        } else {
            None
        };
        let intermediate = if max_index >= 2 {
            Some(rate(max_index.div_ceil(3), bins.intermediate_temperature)?)
        } else {
            None
        };

        let load_line = LoadLine::new(
            bins.zero_load_temperature,
            bins.design_temperature,
            bins.design_load_factor * maximum[0].net_capacity(MODE),
        );
        let high_capacity = frosted_profile(
            bins,
            &maximum,
            |condition| condition.net_capacity(MODE),
            FROST_CAPACITY_FACTOR,
        );
        let low_capacity = minimum
            .as_ref()
            .map(|minimum| line_through(minimum, |condition| condition.net_capacity(MODE)));

        let balance_temperatures = match (&intermediate, &low_capacity) {
            (Some(intermediate), Some(low_capacity)) => {
                let intermediate_capacity = blended_line(
                    intermediate.temperature(),
                    intermediate.net_capacity(MODE),
                    low_capacity,
                    &high_capacity,
                );
                let bracket = (
                    bins.zero_load_temperature - BALANCE_SEARCH_SPAN,
                    bins.zero_load_temperature,
                );

                Some([
                    load_line.balance_with(low_capacity, bracket)?,
                    load_line.balance_with(&intermediate_capacity, bracket)?,
                    load_line.balance_with(&high_capacity, bracket)?,
                ])
            }
            _ => None,
        };

        Ok(Self {
            bins,
            lockout,
            degradation_coefficient,
            maximum,
            minimum,
            intermediate,
            load_line,
            high_capacity,
            low_capacity,
            balance_temperatures,
        })
    }

    /// COP as a function of outdoor temperature for variable-speed equipment.
    fn efficiency_fit(
        &self,
        low_power: Option<&Line>,
        high_power: &FrostedProfile,
        max_stage_efficiency: f64,
    ) -> Option<QuadraticFit> {
        let (Some(balance), Some(intermediate), Some(low_capacity), Some(low_power)) = (
            self.balance_temperatures,
            &self.intermediate,
            &self.low_capacity,
            low_power,
        ) else {
            return None;
        };

        let intermediate_capacity = blended_line(
            intermediate.temperature(),
            intermediate.net_capacity(MODE),
            low_capacity,
            &self.high_capacity,
        );
        let intermediate_power = blended_line(
            intermediate.temperature(),
            intermediate.net_power(MODE, max_stage_efficiency),
            low_power,
            high_power,
        );
        fn cop(temperature: f64, capacity: &impl Profile, power: &impl Profile) -> (f64, f64) {
            (temperature, capacity.at(temperature) / power.at(temperature))
        }

        Some(QuadraticFit::through([
            cop(balance[0], low_capacity, low_power),
            cop(balance[1], &intermediate_capacity, &intermediate_power),
            cop(balance[2], &self.high_capacity, high_power),
        ]))
    }
}

/// Maximum-stage profile of a quantity, dipping to the frosted intermediate point inside the
/// frosting band.
fn frosted_profile(
    bins: &HeatingBins,
    maximum: &[RatingCondition; 2],
    quantity: impl Fn(&RatingCondition) -> f64,
    frost_factor: f64,
) -> FrostedProfile {
    let clear = line_through(maximum, &quantity);
    let [high, low] = maximum;
    let (high_value, low_value) = (quantity(high), quantity(low));

    let position = (bins.intermediate_temperature - bins.low_temperature)
        / (bins.high_temperature - bins.low_temperature);
    let frosted_value = frost_factor * (low_value + position * (high_value - low_value));
    let frosted = Line::through(
        (bins.low_temperature, low_value),
        (bins.intermediate_temperature, frosted_value),
    );

    FrostedProfile::new(
        clear,
        frosted,
        (bins.low_temperature, FROST_LIMIT_TEMPERATURE),
    )
}

impl SeasonalBinIntegrator for SeasonalHeatingIntegrator<'_> {
    fn integrate(&self, max_stage_efficiency: f64) -> SeasonalResult {
        let power = |condition: &RatingCondition| condition.net_power(MODE, max_stage_efficiency);
        let high_power = frosted_profile(self.bins, &self.maximum, power, FROST_POWER_FACTOR);
        let low_power = self
            .minimum
            .as_ref()
            .map(|minimum| line_through(minimum, power));
        let fit = self.efficiency_fit(low_power.as_ref(), &high_power, max_stage_efficiency);
        let cd = self.degradation_coefficient;

        let bins = self
            .bins
            .temperatures
            .iter()
            .zip(&self.bins.fractional_hours)
            .map(|(&temperature, &fractional_hours)| {
                let load = max_of_2(self.load_line.load_at(temperature), 0.);
                let credit = |cop: f64| lockout_credit(temperature, cop, &self.lockout);
                let high_capacity = self.high_capacity.at(temperature);
                let high_power = high_power.at(temperature);

                // above the maximum stage envelope the shortfall is met by resistance heat
                let full_capacity = || {
                    let credit = credit(high_capacity / high_power);
                    (
                        high_power * credit,
                        load - high_capacity * credit,
                        BinRegime::FullCapacity,
                    )
                };

                let (energy, resistance_energy, regime) =
                    match (&self.low_capacity, &low_power) {
                        _ if load >= high_capacity => full_capacity(),
                        (Some(low_capacity), Some(low_power)) => {
                            let low_capacity = low_capacity.at(temperature);
                            let low_power = low_power.at(temperature);

                            if load <= low_capacity {
                                let credit = credit(low_capacity / low_power);
                                let energy =
                                    cycling_energy(load / low_capacity, low_power, cd) * credit;
                                (energy, load * (1. - credit), BinRegime::Cycling)
                            } else if let Some(fit) = &fit {
                                let cop = fit.at(temperature);
                                let credit = credit(cop);
                                (load / cop * credit, load * (1. - credit), BinRegime::Modulating)
                            } else {
                                let low_fraction =
                                    low_stage_fraction(load, low_capacity, high_capacity);
                                let power =
                                    low_fraction * low_power + (1. - low_fraction) * high_power;
                                let credit = credit(load / power);
                                (power * credit, load * (1. - credit), BinRegime::Alternating)
                            }
                        }
                        _ => {
                            let load_fraction = load / high_capacity;
                            let credit = credit(high_capacity / high_power);
                            (
                                cycling_energy(load_fraction, high_power, cd) * credit,
                                load - load_fraction * high_capacity * credit,
                                BinRegime::Cycling,
                            )
                        }
                    };

                BinResult {
                    temperature,
                    fractional_hours,
                    load,
                    energy,
                    resistance_energy,
                    regime,
                }
            })
            .collect::<Vec<_>>();

        let total_load: f64 = bins.iter().map(|bin| bin.load * bin.fractional_hours).sum();
        let total_energy: f64 = bins
            .iter()
            .map(|bin| (bin.energy + bin.resistance_energy) * bin.fractional_hours)
            .sum();

        SeasonalResult {
            seasonal_metric: BTU_PER_WATT_HOUR * total_load / total_energy,
            diagnostics: SeasonalDiagnostics {
                bins,
                balance_temperatures: self.balance_temperatures,
            },
        }
    }
}
