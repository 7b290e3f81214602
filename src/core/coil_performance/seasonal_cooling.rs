use crate::compare_floats::max_of_2;
use crate::core::catalog::{CoolingBins, ModeCatalog};
use crate::core::coil_performance::envelope::{
    blended_line, cycling_energy, low_stage_fraction, BinRegime, BinResult, Line, LoadLine,
    Profile, QuadraticFit, RatingCondition, SeasonalBinIntegrator, SeasonalDiagnostics,
    SeasonalResult,
};
use crate::core::coil_performance::stages::PendingStage;
use crate::core::curves::DomainPolicy;
use crate::core::units::BTU_PER_WATT_HOUR;
use crate::errors::DerivationError;
use crate::input::CoilMode;

/// Span above the zero-load temperature searched for balance points, in degF
const BALANCE_SEARCH_SPAN: f64 = 300.;

const MODE: CoilMode = CoilMode::Cooling;

/// The seasonal cooling (SEER) bin procedure for one set of stages.
#[derive(Clone, Debug)]
pub struct SeasonalCoolingIntegrator<'a> {
    bins: &'a CoolingBins,
    degradation_coefficient: f64,
    /// Maximum stage at the full-load and mid rating temperatures
    maximum: [RatingCondition; 2],
    /// Minimum stage at the mid and low rating temperatures
    minimum: Option<[RatingCondition; 2]>,
    intermediate: Option<RatingCondition>,
    load_line: LoadLine,
    high_capacity: Line,
    low_capacity: Option<Line>,
    balance_temperatures: Option<[f64; 3]>,
}

impl<'a> SeasonalCoolingIntegrator<'a> {
    /// Evaluate the rating points of `stages` and the balance points of the load line.
    ///
    /// Arguments:
    /// * `stages` - the stages of the coil, lowest capacity first
    /// * `mode_catalog` - curves of the coil
    /// * `bins` - bins and rating conditions of the procedure
    /// * `degradation_coefficient` - cycling degradation (Cd) of the coil
    /// * `policy` - what to do when a rating condition lies outside a curve's valid range
    pub fn new(
        stages: &[PendingStage],
        mode_catalog: &ModeCatalog,
        bins: &'a CoolingBins,
        degradation_coefficient: f64,
        policy: DomainPolicy,
    ) -> Result<Self, DerivationError> {
        let rate = |index: usize, outdoor_temperature: f64| {
            rating_condition(
                stages,
                mode_catalog,
                index,
                bins.indoor_wet_bulb,
                outdoor_temperature,
                policy,
            )
        };

        let max_index = stages.len().checked_sub(1).ok_or_else(|| {
            DerivationError::InvalidInput("no stages to rate".to_owned())
        })?;

        let maximum = [
            rate(max_index, bins.full_load_temperature)?,
            rate(max_index, bins.mid_temperature)?,
        ];
        let minimum = if max_index >= 1 {
            Some([rate(0, bins.mid_temperature)?, rate(0, bins.low_temperature)?])
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
            bins.full_load_temperature,
            maximum[0].net_capacity(MODE) / bins.sizing_factor,
        );
        let high_capacity = line_through(&maximum, |condition| condition.net_capacity(MODE));
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
                    bins.zero_load_temperature,
                    bins.zero_load_temperature + BALANCE_SEARCH_SPAN,
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

    /// EER as a function of outdoor temperature for variable-speed equipment, fitted
    /// through the (balance temperature, EER) points of the three envelopes.
    fn efficiency_fit(
        &self,
        low_power: Option<&Line>,
        high_power: &Line,
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
        let eer = |temperature: f64, capacity: &Line, power: &Line| {
            (
                temperature,
                BTU_PER_WATT_HOUR * capacity.at(temperature) / power.at(temperature),
            )
        };

        Some(QuadraticFit::through([
            eer(balance[0], low_capacity, low_power),
            eer(balance[1], &intermediate_capacity, &intermediate_power),
            eer(balance[2], &self.high_capacity, high_power),
        ]))
    }
}

impl SeasonalBinIntegrator for SeasonalCoolingIntegrator<'_> {
    fn integrate(&self, max_stage_efficiency: f64) -> SeasonalResult {
        let power = |condition: &RatingCondition| condition.net_power(MODE, max_stage_efficiency);
        let high_power = line_through(&self.maximum, power);
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
                let high_capacity = self.high_capacity.at(temperature);
                let high_power = high_power.at(temperature);

                let (load, energy, regime) = match (&self.low_capacity, &low_power) {
                    _ if load >= high_capacity => {
                        (high_capacity, high_power, BinRegime::FullCapacity)
                    }
                    (Some(low_capacity), Some(low_power)) => {
                        let low_capacity = low_capacity.at(temperature);
                        let low_power = low_power.at(temperature);

                        if load <= low_capacity {
                            let energy = cycling_energy(load / low_capacity, low_power, cd);
                            (load, energy, BinRegime::Cycling)
                        } else if let Some(fit) = &fit {
                            let energy = load * BTU_PER_WATT_HOUR / fit.at(temperature);
                            (load, energy, BinRegime::Modulating)
                        } else {
                            let low_fraction =
                                low_stage_fraction(load, low_capacity, high_capacity);
                            let energy =
                                low_fraction * low_power + (1. - low_fraction) * high_power;
                            (load, energy, BinRegime::Alternating)
                        }
                    }
                    _ => {
                        let energy = cycling_energy(load / high_capacity, high_power, cd);
                        (load, energy, BinRegime::Cycling)
                    }
                };

                BinResult {
                    temperature,
                    fractional_hours,
                    load,
                    energy,
                    resistance_energy: 0.,
                    regime,
                }
            })
            .collect::<Vec<_>>();

        let total_load: f64 = bins.iter().map(|bin| bin.load * bin.fractional_hours).sum();
        let total_energy: f64 = bins.iter().map(|bin| bin.energy * bin.fractional_hours).sum();

        SeasonalResult {
            seasonal_metric: BTU_PER_WATT_HOUR * total_load / total_energy,
            diagnostics: SeasonalDiagnostics {
                bins,
                balance_temperatures: self.balance_temperatures,
            },
        }
    }
}

pub(crate) fn rating_condition(
    stages: &[PendingStage],
    mode_catalog: &ModeCatalog,
    index: usize,
    indoor_temperature: f64,
    outdoor_temperature: f64,
    policy: DomainPolicy,
) -> Result<RatingCondition, DerivationError> {
    let stage = &stages[index];
    let curves = mode_catalog.curves_for_stage(index).ok_or_else(|| {
        DerivationError::InvalidInput(format!("no performance curves for stage {index}"))
    })?;

    Ok(RatingCondition::new(
        stage,
        curves,
        indoor_temperature,
        outdoor_temperature,
        policy,
    )?)
}

/// Line through a quantity at two rating conditions
pub(crate) fn line_through(
    conditions: &[RatingCondition; 2],
    quantity: impl Fn(&RatingCondition) -> f64,
) -> Line {
    let [first, second] = conditions;
    Line::through(
        (first.temperature(), quantity(first)),
        (second.temperature(), quantity(second)),
    )
}
