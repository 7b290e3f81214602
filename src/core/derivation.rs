use crate::core::catalog::{ArchetypeCatalog, Catalog, StageCurves};
use crate::core::coil_performance::degradation::{degradation_coefficient, PartLoadCurve};
use crate::core::coil_performance::envelope::{
    SeasonalBinIntegrator, SeasonalDiagnostics, SeasonalResult,
};
use crate::core::coil_performance::seasonal_cooling::SeasonalCoolingIntegrator;
use crate::core::coil_performance::seasonal_heating::SeasonalHeatingIntegrator;
use crate::core::coil_performance::stages::{
    build_pending_stages, finish_with_efficiencies, finish_with_max_stage_efficiency, Stage,
};
use crate::core::curves::UnitBasis;
use crate::core::solvers::{solve_max_stage_efficiency, EfficiencySolution, FallbackCorrelation};
use crate::errors::{ConfigurationError, DerivationError};
use crate::input::{CoilMode, EquipmentArchetype, MetricKind, RatedMetric, RatingSpec};
use rayon::prelude::*;
use serde::Serialize;
use std::ops::RangeInclusive;
use tracing::debug;

impl EquipmentArchetype {
    /// Numbers of capacity stages the archetype can be modelled with.
    pub fn stage_counts(&self) -> RangeInclusive<usize> {
        match self {
            Self::SingleStageAirConditioner
            | Self::SingleStageHeatPump
            | Self::RoomAirConditioner => 1..=1,
            Self::TwoStageAirConditioner | Self::TwoStageHeatPump => 2..=2,
            Self::VariableSpeedAirConditioner
            | Self::VariableSpeedHeatPump
            | Self::MiniSplitHeatPump => 3..=10,
            Self::GroundSourceHeatPump => 1..=2,
        }
    }

    /// Number of stages used when the rating does not say.
    pub fn default_stage_count(&self) -> usize {
        match self {
            Self::VariableSpeedAirConditioner | Self::VariableSpeedHeatPump => 4,
            Self::MiniSplitHeatPump => 10,
            _ => *self.stage_counts().start(),
        }
    }

    pub fn accepts(&self, metric: MetricKind) -> bool {
        match self {
            Self::SingleStageAirConditioner
            | Self::TwoStageAirConditioner
            | Self::VariableSpeedAirConditioner => metric.mode() == CoilMode::Cooling,
            Self::SingleStageHeatPump
            | Self::TwoStageHeatPump
            | Self::VariableSpeedHeatPump
            | Self::MiniSplitHeatPump => true,
            // rated at full load only
            Self::RoomAirConditioner => metric == MetricKind::Eer,
            Self::GroundSourceHeatPump => !metric.is_seasonal(),
        }
    }
}

/// Simulation parameters derived for one coil of one equipment instance.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DerivedPerformance {
    pub archetype: EquipmentArchetype,
    pub mode: CoilMode,
    /// Lowest capacity first
    pub stages: Vec<Stage>,
    pub degradation_coefficient: f64,
    pub part_load_curve: PartLoadCurve,
    /// Performance curves of each stage, in the Celsius basis
    pub curves: Vec<StageCurves>,
    /// Outcome of matching a seasonal rating; absent for directly rated equipment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<EfficiencySolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<SeasonalDiagnostics>,
}

impl DerivedPerformance {
    /// Whether the maximum-stage efficiency came from the fallback correlation rather than
    /// from matching the seasonal rating
    pub fn is_estimated(&self) -> bool {
        self.solution
            .as_ref()
            .is_some_and(|solution| !solution.is_converged())
    }
}

/// Derives stage parameters from published ratings against a shared catalog.
#[derive(Clone, Copy, Debug)]
pub struct PerformanceDeriver<'a> {
    catalog: &'a Catalog,
}

impl<'a> PerformanceDeriver<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Derive every spec in `specs` in parallel. Results keep the order of `specs`.
    pub fn derive_all(
        &self,
        specs: &[RatingSpec],
    ) -> Vec<Result<DerivedPerformance, DerivationError>> {
        specs.par_iter().map(|spec| self.derive(spec)).collect()
    }

    pub fn derive(&self, spec: &RatingSpec) -> Result<DerivedPerformance, DerivationError> {
        let archetype = spec.archetype;
        let metric = spec.metric.kind();
        let mode = metric.mode();

        self.catalog.validate()?;
        let (entry, num_stages) = self.validate(spec)?;
        let mode_catalog = entry
            .mode(mode)
            .ok_or(ConfigurationError::MissingCurves { archetype, mode })?;
        if !mode_catalog.supports_stage_count(num_stages) {
            return Err(ConfigurationError::IncompatibleStageCount {
                archetype,
                stages: num_stages,
            }
            .into());
        }

        let bounds = spec.stage_bounds.unwrap_or(mode_catalog.bounds);
        let net_shr = match mode {
            CoilMode::Cooling => Some(spec.rated_net_shr.unwrap_or(entry.default_net_shr)),
            CoilMode::Heating => None,
        };
        let seasonal_rating = match spec.metric {
            RatedMetric::Seer(rating) | RatedMetric::Hspf(rating) => Some(rating),
            RatedMetric::Eer(_) | RatedMetric::Cop(_) => None,
        };
        let degradation_coefficient = degradation_coefficient(mode, num_stages, seasonal_rating);

        let pending = build_pending_stages(
            num_stages,
            &bounds,
            &mode_catalog.ratios,
            spec.rated_fan_power,
            net_shr,
        )?;

        let (stages, solution, diagnostics) = match &spec.metric {
            RatedMetric::Eer(efficiencies) | RatedMetric::Cop(efficiencies) => (
                finish_with_efficiencies(pending, mode, efficiencies.values())?,
                None,
                None,
            ),
            RatedMetric::Seer(target) => {
                let integrator = SeasonalCoolingIntegrator::new(
                    &pending,
                    mode_catalog,
                    &self.catalog.bins.cooling,
                    degradation_coefficient,
                    entry.domain_policy,
                )?;
                let (solution, diagnostics) =
                    solve_seasonal(&integrator, *target, FallbackCorrelation::EerFromSeer)?;
                (
                    finish_with_max_stage_efficiency(pending, mode, solution.efficiency)?,
                    Some(solution),
                    Some(diagnostics),
                )
            }
            RatedMetric::Hspf(target) => {
                let lockout = spec
                    .compressor_lockout
                    .unwrap_or(self.catalog.bins.heating.default_lockout);
                let integrator = SeasonalHeatingIntegrator::new(
                    &pending,
                    mode_catalog,
                    &self.catalog.bins.heating,
                    lockout,
                    degradation_coefficient,
                    entry.domain_policy,
                )?;
                let (solution, diagnostics) =
                    solve_seasonal(&integrator, *target, FallbackCorrelation::CopFromHspf)?;
                (
                    finish_with_max_stage_efficiency(pending, mode, solution.efficiency)?,
                    Some(solution),
                    Some(diagnostics),
                )
            }
        };

        let curves = (0..num_stages)
            .map(|index| {
                mode_catalog
                    .curves_for_stage(index)
                    .map(|curves| curves.to_basis(UnitBasis::Celsius))
                    .ok_or_else(|| {
                        DerivationError::InvalidInput(format!(
                            "no performance curves for stage {index}"
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DerivedPerformance {
            archetype,
            mode,
            stages,
            degradation_coefficient,
            part_load_curve: PartLoadCurve::new(degradation_coefficient),
            curves,
            solution,
            diagnostics,
        })
    }

    /// Reject a spec before any computation, returning its catalog entry and stage count.
    fn validate(
        &self,
        spec: &RatingSpec,
    ) -> Result<(&'a ArchetypeCatalog, usize), DerivationError> {
        let archetype = spec.archetype;
        let metric = spec.metric.kind();

        if let Some(value) = spec
            .metric
            .values()
            .iter()
            .find(|value| !(value.is_finite() && **value > 0.))
        {
            return Err(ConfigurationError::NonPositiveRating {
                metric,
                value: *value,
            }
            .into());
        }
        if !(spec.rated_fan_power.is_finite() && spec.rated_fan_power >= 0.) {
            return Err(ConfigurationError::InvalidFanPower(spec.rated_fan_power).into());
        }
        if !archetype.accepts(metric) {
            return Err(ConfigurationError::UnsupportedMetric { archetype, metric }.into());
        }

        let num_stages = spec
            .num_stages
            .unwrap_or_else(|| archetype.default_stage_count());
        if !archetype.stage_counts().contains(&num_stages) {
            return Err(ConfigurationError::IncompatibleStageCount {
                archetype,
                stages: num_stages,
            }
            .into());
        }
        if let Some(lockout) = spec.compressor_lockout {
            lockout.validate()?;
        }

        Ok((self.catalog.archetype(archetype)?, num_stages))
    }
}

/// Match `target` with the integrator, returning the solution and the diagnostics of the
/// procedure at the chosen efficiency. A converged solution reuses the result of its final
/// iterate; an estimated one is replayed once at the fallback efficiency.
fn solve_seasonal(
    integrator: &impl SeasonalBinIntegrator,
    target: f64,
    correlation: FallbackCorrelation,
) -> Result<(EfficiencySolution, SeasonalDiagnostics), DerivationError> {
    let mut latest: Option<(f64, SeasonalResult)> = None;
    let solution = solve_max_stage_efficiency(target, correlation, |efficiency| {
        let result = integrator.integrate(efficiency);
        let seasonal_metric = result.seasonal_metric;
        latest = Some((efficiency, result));
        Ok(seasonal_metric)
    })?;
    let diagnostics = match latest {
        Some((efficiency, result)) if efficiency == solution.efficiency => result.diagnostics,
        _ => integrator.integrate(solution.efficiency).diagnostics,
    };

    if let Some(balance_temperatures) = diagnostics.balance_temperatures {
        debug!(
            "{} balance temperatures (minimum, intermediate, maximum stage): {balance_temperatures:?}",
            correlation.metric()
        );
    }

    Ok((solution, diagnostics))
}
