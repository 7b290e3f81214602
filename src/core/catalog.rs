use crate::compare_floats::{is_strictly_increasing, max_of_2, min_of_2};
use crate::core::curves::{
    BiquadraticCurve, DomainPolicy, SingleVariableCurve, UnitBasis, ValidRange,
};
use crate::errors::ConfigurationError;
use crate::input::{CoilMode, EquipmentArchetype};
use anyhow::bail;
use indexmap::IndexMap;
use interp::{interp, InterpMode};
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Read};

/// Lowest rated airflow (cfm/ton) at which the gross SHR ceiling stays above 0.60
pub const MIN_AIRFLOW_PER_TON: f64 = (0.6 - 0.3821066 + 0.01) / 0.001050652;

/// Range of capacity and airflow the stages of one coil are spread across.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StageBounds {
    pub min_capacity_fraction: f64,
    pub max_capacity_fraction: f64,
    /// in cfm/ton
    pub min_airflow_per_ton: f64,
    /// in cfm/ton
    pub max_airflow_per_ton: f64,
}

impl StageBounds {
    pub fn new(
        min_capacity_fraction: f64,
        max_capacity_fraction: f64,
        min_airflow_per_ton: f64,
        max_airflow_per_ton: f64,
    ) -> Self {
        Self {
            min_capacity_fraction,
            max_capacity_fraction,
            min_airflow_per_ton,
            max_airflow_per_ton,
        }
    }

    /// Bounds of single-stage equipment, which always runs at one point
    pub fn fixed(capacity_fraction: f64, airflow_per_ton: f64) -> Self {
        Self::new(
            capacity_fraction,
            capacity_fraction,
            airflow_per_ton,
            airflow_per_ton,
        )
    }

    pub(crate) fn capacity_ratio_at(&self, position: f64) -> f64 {
        self.min_capacity_fraction
            + (self.max_capacity_fraction - self.min_capacity_fraction) * position
    }

    pub(crate) fn airflow_per_ton_at(&self, position: f64) -> f64 {
        self.min_airflow_per_ton + (self.max_airflow_per_ton - self.min_airflow_per_ton) * position
    }

    /// Check the bounds can be spread across `num_stages` strictly increasing stages.
    pub(crate) fn validate(&self, num_stages: usize) -> Result<(), ConfigurationError> {
        let values = [
            self.min_capacity_fraction,
            self.max_capacity_fraction,
            self.min_airflow_per_ton,
            self.max_airflow_per_ton,
        ];
        if values.iter().any(|value| !value.is_finite() || *value <= 0.) {
            return Err(ConfigurationError::InvalidBounds(format!(
                "all bounds must be positive and finite, got {self:?}"
            )));
        }
        if self.min_airflow_per_ton < MIN_AIRFLOW_PER_TON {
            return Err(ConfigurationError::InvalidBounds(format!(
                "minimum airflow of {} cfm/ton is below {MIN_AIRFLOW_PER_TON:.1} cfm/ton",
                self.min_airflow_per_ton
            )));
        }

        let increasing = if num_stages > 1 {
            self.min_capacity_fraction < self.max_capacity_fraction
                && self.min_airflow_per_ton < self.max_airflow_per_ton
        } else {
            self.min_capacity_fraction <= self.max_capacity_fraction
                && self.min_airflow_per_ton <= self.max_airflow_per_ton
        };
        if !increasing {
            return Err(ConfigurationError::InvalidBounds(format!(
                "minimum bounds must lie below maximum bounds for {num_stages} stages, got {self:?}"
            )));
        }

        Ok(())
    }
}

/// Outdoor temperatures (degF) at which a heat pump compressor switches off and back on.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompressorLockout {
    pub cutout_temperature: f64,
    pub cut_in_temperature: f64,
}

impl CompressorLockout {
    pub(crate) fn validate(&self) -> Result<(), ConfigurationError> {
        if self.cutout_temperature.is_finite()
            && self.cut_in_temperature.is_finite()
            && self.cutout_temperature <= self.cut_in_temperature
        {
            Ok(())
        } else {
            Err(ConfigurationError::InvalidBounds(format!(
                "compressor cutout must not exceed cut-in temperature, got {self:?}"
            )))
        }
    }
}

/// Efficiency and fan power of lower stages relative to the maximum stage, keyed by
/// normalized stage position (0 for the minimum stage, 1 for the maximum).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizedRatioTable {
    pub positions: Vec<f64>,
    pub efficiency_ratios: Vec<f64>,
    pub fan_power_ratios: Vec<f64>,
}

impl NormalizedRatioTable {
    pub fn uniform() -> Self {
        Self {
            positions: vec![0., 1.],
            efficiency_ratios: vec![1., 1.],
            fan_power_ratios: vec![1., 1.],
        }
    }

    pub fn efficiency_ratio_at(&self, position: f64) -> f64 {
        interpolate(&self.positions, &self.efficiency_ratios, position)
    }

    pub fn fan_power_ratio_at(&self, position: f64) -> f64 {
        interpolate(&self.positions, &self.fan_power_ratios, position)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |reason: &str| Err(ConfigurationError::InvalidCatalog(reason.to_owned()));

        if self.positions.len() < 2
            || self.efficiency_ratios.len() != self.positions.len()
            || self.fan_power_ratios.len() != self.positions.len()
        {
            return invalid("ratio table needs at least two points and equal-length columns");
        }
        if !is_strictly_increasing(&self.positions)
            || self.positions.first() != Some(&0.)
            || self.positions.last() != Some(&1.)
        {
            return invalid("ratio table positions must increase strictly from 0 to 1");
        }
        if self.efficiency_ratio_at(1.) != 1. || self.fan_power_ratio_at(1.) != 1. {
            return invalid("ratio table must be 1.0 at the maximum stage");
        }
        if self
            .efficiency_ratios
            .iter()
            .chain(&self.fan_power_ratios)
            .any(|ratio| !ratio.is_finite() || *ratio <= 0.)
        {
            return invalid("ratio table entries must be positive");
        }

        Ok(())
    }
}

/// Piecewise-linear interpolation, holding the end values outside the tabulated range.
fn interpolate(positions: &[f64], ratios: &[f64], position: f64) -> f64 {
    let position = match (positions.first(), positions.last()) {
        (Some(&first), Some(&last)) => max_of_2(min_of_2(position, last), first),
        _ => position,
    };

    interp(positions, ratios, position, &InterpMode::FirstLast)
}

/// Performance curves of one capacity stage.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StageCurves {
    pub capacity_ft: BiquadraticCurve,
    pub eir_ft: BiquadraticCurve,
    pub capacity_fflow: SingleVariableCurve,
    pub eir_fflow: SingleVariableCurve,
}

impl StageCurves {
    pub fn to_basis(&self, basis: UnitBasis) -> Self {
        Self {
            capacity_ft: self.capacity_ft.to_basis(basis),
            eir_ft: self.eir_ft.to_basis(basis),
            capacity_fflow: self.capacity_fflow.clone(),
            eir_fflow: self.eir_fflow.clone(),
        }
    }
}

/// Everything needed to lay out and rate the stages of one coil (cooling or heating).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModeCatalog {
    pub bounds: StageBounds,
    pub ratios: NormalizedRatioTable,
    /// Either one entry shared by all stages, or one entry per stage
    pub curves: Vec<StageCurves>,
}

impl ModeCatalog {
    /// Curves of stage `index`, if the catalog has curves for that many stages.
    pub fn curves_for_stage(&self, index: usize) -> Option<&StageCurves> {
        match self.curves.as_slice() {
            [shared] => Some(shared),
            per_stage => per_stage.get(index),
        }
    }

    pub(crate) fn supports_stage_count(&self, num_stages: usize) -> bool {
        self.curves.len() == 1 || self.curves.len() == num_stages
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.curves.is_empty() {
            return Err(ConfigurationError::InvalidCatalog(
                "mode catalog has no curves".to_owned(),
            ));
        }
        self.ratios.validate()?;
        self.bounds.validate(self.curves.len())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArchetypeCatalog {
    #[serde(default)]
    pub cooling: Option<ModeCatalog>,
    #[serde(default)]
    pub heating: Option<ModeCatalog>,
    pub default_net_shr: f64,
    #[serde(default)]
    pub domain_policy: DomainPolicy,
}

impl ArchetypeCatalog {
    pub fn mode(&self, mode: CoilMode) -> Option<&ModeCatalog> {
        match mode {
            CoilMode::Cooling => self.cooling.as_ref(),
            CoilMode::Heating => self.heating.as_ref(),
        }
    }
}

/// Bins and rating conditions of the seasonal cooling procedure (degF).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CoolingBins {
    pub temperatures: Vec<f64>,
    pub fractional_hours: Vec<f64>,
    pub indoor_wet_bulb: f64,
    /// Maximum stage rating point, which also sizes the load line
    pub full_load_temperature: f64,
    /// Shared by maximum and minimum stages
    pub mid_temperature: f64,
    pub intermediate_temperature: f64,
    /// Minimum stage low-temperature rating point
    pub low_temperature: f64,
    /// Outdoor temperature at which the building needs no cooling
    pub zero_load_temperature: f64,
    pub sizing_factor: f64,
}

/// Bins and rating conditions of the seasonal heating procedure (degF).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HeatingBins {
    pub temperatures: Vec<f64>,
    pub fractional_hours: Vec<f64>,
    pub indoor_temperature: f64,
    /// Maximum stage high-temperature point, which also sizes the load line
    pub high_temperature: f64,
    pub low_temperature: f64,
    pub intermediate_temperature: f64,
    /// Minimum stage high-temperature point
    pub min_stage_high_temperature: f64,
    pub zero_load_temperature: f64,
    pub design_temperature: f64,
    pub design_load_factor: f64,
    pub default_lockout: CompressorLockout,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BinTable {
    pub cooling: CoolingBins,
    pub heating: HeatingBins,
}

impl BinTable {
    fn validate(&self) -> Result<(), ConfigurationError> {
        for (temperatures, weights) in [
            (&self.cooling.temperatures, &self.cooling.fractional_hours),
            (&self.heating.temperatures, &self.heating.fractional_hours),
        ] {
            if temperatures.is_empty() || temperatures.len() != weights.len() {
                return Err(ConfigurationError::InvalidCatalog(
                    "bin temperatures and fractional hours must have equal, non-zero length"
                        .to_owned(),
                ));
            }
            if weights.iter().any(|weight| *weight < 0.) {
                return Err(ConfigurationError::InvalidCatalog(
                    "bin fractional hours must be non-negative".to_owned(),
                ));
            }
        }

        self.heating.default_lockout.validate()
    }
}

impl Default for BinTable {
    fn default() -> Self {
        Self {
            cooling: CoolingBins {
                temperatures: vec![67., 72., 77., 82., 87., 92., 97., 102.],
                fractional_hours: vec![0.214, 0.231, 0.216, 0.161, 0.104, 0.052, 0.018, 0.004],
                indoor_wet_bulb: 67.,
                full_load_temperature: 95.,
                mid_temperature: 82.,
                intermediate_temperature: 87.,
                low_temperature: 67.,
                zero_load_temperature: 65.,
                sizing_factor: 1.1,
            },
            heating: HeatingBins {
                temperatures: vec![
                    62., 57., 52., 47., 42., 37., 32., 27., 22., 17., 12., 7., 2., -3., -8.,
                ],
                fractional_hours: vec![
                    0.132, 0.111, 0.103, 0.093, 0.100, 0.109, 0.126, 0.087, 0.055, 0.036, 0.026,
                    0.013, 0.006, 0.002, 0.001,
                ],
                indoor_temperature: 70.,
                high_temperature: 47.,
                low_temperature: 17.,
                intermediate_temperature: 35.,
                min_stage_high_temperature: 62.,
                zero_load_temperature: 65.,
                design_temperature: 5.,
                design_load_factor: 0.77,
                default_lockout: CompressorLockout {
                    cutout_temperature: 10.,
                    cut_in_temperature: 14.,
                },
            },
        }
    }
}

/// Read-only reference data shared by every derivation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    pub archetypes: IndexMap<EquipmentArchetype, ArchetypeCatalog>,
    pub bins: BinTable,
}

impl Catalog {
    pub fn from_json(json: impl Read) -> anyhow::Result<Self> {
        let reader = BufReader::new(json);
        let catalog: Catalog = serde_json::from_reader(reader)?;

        if let Err(e) = catalog.validate() {
            bail!("Catalog failed validation: {e}");
        }

        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (archetype, entry) in &self.archetypes {
            if entry.cooling.is_none() && entry.heating.is_none() {
                return Err(ConfigurationError::InvalidCatalog(format!(
                    "{archetype} has neither cooling nor heating data"
                )));
            }
            if !(entry.default_net_shr > 0. && entry.default_net_shr <= 1.) {
                return Err(ConfigurationError::InvalidCatalog(format!(
                    "{archetype} default net SHR must lie in (0, 1]"
                )));
            }
            for mode in [&entry.cooling, &entry.heating].into_iter().flatten() {
                mode.validate()?;
            }
        }

        self.bins.validate()
    }

    pub fn archetype(
        &self,
        archetype: EquipmentArchetype,
    ) -> Result<&ArchetypeCatalog, ConfigurationError> {
        self.archetypes
            .get(&archetype)
            .ok_or(ConfigurationError::MissingArchetype(archetype))
    }
}

const COOLING_CAPACITY_FFLOW: [f64; 3] = [0.718605468, 0.410099989, -0.128705457];
const COOLING_EIR_FFLOW: [f64; 3] = [1.32299905, -0.477711207, 0.154712157];
const HEATING_CAPACITY_FFLOW: [f64; 3] = [0.694045465, 0.474207981, -0.168253446];
const HEATING_EIR_FFLOW: [f64; 3] = [2.185418751, -1.942827919, 0.757409168];
const CONSTANT_FFLOW: [f64; 3] = [1., 0., 0.];

const DEFAULT_NET_SHR: f64 = 0.73;

fn fahrenheit_stage(
    capacity_ft: [f64; 6],
    eir_ft: [f64; 6],
    capacity_fflow: [f64; 3],
    eir_fflow: [f64; 3],
) -> StageCurves {
    StageCurves {
        capacity_ft: BiquadraticCurve::new(capacity_ft, UnitBasis::Fahrenheit),
        eir_ft: BiquadraticCurve::new(eir_ft, UnitBasis::Fahrenheit),
        capacity_fflow: SingleVariableCurve::quadratic(capacity_fflow),
        eir_fflow: SingleVariableCurve::quadratic(eir_fflow),
    }
}

fn cooling_stage(capacity_ft: [f64; 6], eir_ft: [f64; 6]) -> StageCurves {
    fahrenheit_stage(capacity_ft, eir_ft, COOLING_CAPACITY_FFLOW, COOLING_EIR_FFLOW)
}

fn single_speed_cooling_curves() -> StageCurves {
    cooling_stage(
        [3.670270705, -0.098652414, 0.000955906, 0.006552414, -0.0000156, -0.000131877],
        [-3.302695861, 0.137871531, -0.001056996, -0.012573945, 0.000214638, -0.000145054],
    )
}

fn two_speed_cooling_curves() -> Vec<StageCurves> {
    vec![
        cooling_stage(
            [3.940185508, -0.104723455, 0.001019298, 0.006471171, -0.00000953, -0.000161658],
            [-3.877526888, 0.164566276, -0.001272755, -0.019956043, 0.000256512, -0.000133539],
        ),
        cooling_stage(
            [3.109456535, -0.085520461, 0.000863238, 0.00863049, -0.0000210, -0.000140186],
            [-1.990708931, 0.093969249, -0.00073335, -0.009062553, 0.000165099, -0.0000997],
        ),
    ]
}

fn mini_split_cooling_curves() -> StageCurves {
    cooling_stage(
        [
            0.7531983499655835,
            0.003618193903031667,
            0.0,
            0.006574385031351544,
            -6.87181191015432e-05,
            0.0,
        ],
        [
            -0.06376924779982301,
            -0.0013360593470367282,
            1.413060577993827e-05,
            0.019433076486584752,
            -4.91395947154321e-05,
            -4.909341249475308e-05,
        ],
    )
}

fn air_source_heating_curves() -> StageCurves {
    fahrenheit_stage(
        [0.566333415, -0.000744164, -0.0000103, 0.009414634, 0.0000506, -0.00000675],
        [0.718398423, 0.003498178, 0.000142202, -0.005724331, 0.00014085, -0.000215321],
        HEATING_CAPACITY_FFLOW,
        HEATING_EIR_FFLOW,
    )
}

/// Ground-source curves take absolute temperatures over 283.15 K: indoor temperature first,
/// then entering water temperature.
fn ground_source_curves(
    capacity_ft: [f64; 6],
    eir_ft: [f64; 6],
    indoor_range: ValidRange,
    entering_water_range: ValidRange,
) -> StageCurves {
    let curve = |coefficients| {
        BiquadraticCurve::new(coefficients, UnitBasis::GroundSourceNormalized)
            .with_ranges(indoor_range, entering_water_range)
    };

    StageCurves {
        capacity_ft: curve(capacity_ft),
        eir_ft: curve(eir_ft),
        capacity_fflow: SingleVariableCurve::quadratic(CONSTANT_FFLOW),
        eir_fflow: SingleVariableCurve::quadratic(CONSTANT_FFLOW),
    }
}

fn single_stage_mode(curves: StageCurves, airflow_per_ton: f64) -> ModeCatalog {
    ModeCatalog {
        bounds: StageBounds::fixed(1., airflow_per_ton),
        ratios: NormalizedRatioTable::uniform(),
        curves: vec![curves],
    }
}

fn two_stage_ratios() -> NormalizedRatioTable {
    NormalizedRatioTable {
        positions: vec![0., 1.],
        efficiency_ratios: vec![1.05, 1.],
        fan_power_ratios: vec![0.85, 1.],
    }
}

fn variable_speed_ratios() -> NormalizedRatioTable {
    NormalizedRatioTable {
        positions: vec![0., 1. / 3., 2. / 3., 1.],
        efficiency_ratios: vec![1.25, 1.15, 1.07, 1.],
        fan_power_ratios: vec![0.6, 0.75, 0.88, 1.],
    }
}

fn two_stage_mode(curves: Vec<StageCurves>) -> ModeCatalog {
    ModeCatalog {
        bounds: StageBounds::new(0.72, 1., 340., 400.),
        ratios: two_stage_ratios(),
        curves,
    }
}

fn variable_speed_mode(curves: StageCurves) -> ModeCatalog {
    ModeCatalog {
        bounds: StageBounds::new(0.36, 1., 300., 400.),
        ratios: variable_speed_ratios(),
        curves: vec![curves],
    }
}

fn archetype_entry(cooling: Option<ModeCatalog>, heating: Option<ModeCatalog>) -> ArchetypeCatalog {
    ArchetypeCatalog {
        cooling,
        heating,
        default_net_shr: DEFAULT_NET_SHR,
        domain_policy: DomainPolicy::Clamp,
    }
}

impl Default for Catalog {
    fn default() -> Self {
        let single_stage_cooling = || single_stage_mode(single_speed_cooling_curves(), 394.2);
        let ground_source_bounds = StageBounds::new(0.72, 1., 340., 400.);

        let archetypes = IndexMap::from([
            (
                EquipmentArchetype::SingleStageAirConditioner,
                archetype_entry(Some(single_stage_cooling()), None),
            ),
            (
                EquipmentArchetype::TwoStageAirConditioner,
                archetype_entry(Some(two_stage_mode(two_speed_cooling_curves())), None),
            ),
            (
                EquipmentArchetype::VariableSpeedAirConditioner,
                archetype_entry(Some(variable_speed_mode(single_speed_cooling_curves())), None),
            ),
            (
                EquipmentArchetype::SingleStageHeatPump,
                archetype_entry(
                    Some(single_stage_cooling()),
                    Some(single_stage_mode(air_source_heating_curves(), 384.1)),
                ),
            ),
            (
                EquipmentArchetype::TwoStageHeatPump,
                archetype_entry(
                    Some(two_stage_mode(two_speed_cooling_curves())),
                    Some(two_stage_mode(vec![air_source_heating_curves()])),
                ),
            ),
            (
                EquipmentArchetype::VariableSpeedHeatPump,
                archetype_entry(
                    Some(variable_speed_mode(single_speed_cooling_curves())),
                    Some(variable_speed_mode(air_source_heating_curves())),
                ),
            ),
            (
                EquipmentArchetype::MiniSplitHeatPump,
                archetype_entry(
                    Some(ModeCatalog {
                        bounds: StageBounds::new(0.4, 1.2, 250., 400.),
                        ratios: variable_speed_ratios(),
                        curves: vec![mini_split_cooling_curves()],
                    }),
                    Some(ModeCatalog {
                        bounds: StageBounds::new(0.3, 1.2, 250., 400.),
                        ratios: variable_speed_ratios(),
                        curves: vec![air_source_heating_curves()],
                    }),
                ),
            ),
            (
                EquipmentArchetype::RoomAirConditioner,
                archetype_entry(
                    Some(single_stage_mode(single_speed_cooling_curves(), 350.)),
                    None,
                ),
            ),
            (
                EquipmentArchetype::GroundSourceHeatPump,
                archetype_entry(
                    Some(ModeCatalog {
                        bounds: ground_source_bounds,
                        ratios: two_stage_ratios(),
                        curves: vec![ground_source_curves(
                            [-3.91606454, 7.04667703, 0., -2.27179286, 0., 0.],
                            [-3.8784003, 0., 0., 4.6329003, 0., 0.],
                            ValidRange::new(1.0, 1.07848),
                            ValidRange::new(0.94114, 1.11772),
                        )],
                    }),
                    Some(ModeCatalog {
                        bounds: ground_source_bounds,
                        ratios: two_stage_ratios(),
                        curves: vec![ground_source_curves(
                            [-5.21543879, -1.07455765, 0., 7.6013407, 0., 0.],
                            [4.0729375, 0., 0., -3.1854375, 0., 0.],
                            ValidRange::new(1.01962, 1.05886),
                            ValidRange::new(0.88228, 1.07848),
                        )],
                    }),
                ),
            ),
        ]);

        Self {
            archetypes,
            bins: BinTable::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use strum::IntoEnumIterator;

    #[fixture]
    fn catalog() -> Catalog {
        Catalog::default()
    }

    #[rstest]
    fn should_validate_default_catalog(catalog: Catalog) {
        assert_eq!(catalog.validate(), Ok(()));
    }

    #[rstest]
    fn should_cover_every_archetype(catalog: Catalog) {
        for archetype in EquipmentArchetype::iter() {
            assert!(catalog.archetype(archetype).is_ok(), "{archetype} missing");
        }
    }

    #[rstest]
    fn should_report_missing_archetype(mut catalog: Catalog) {
        catalog
            .archetypes
            .shift_remove(&EquipmentArchetype::RoomAirConditioner);

        assert_eq!(
            catalog.archetype(EquipmentArchetype::RoomAirConditioner),
            Err(ConfigurationError::MissingArchetype(
                EquipmentArchetype::RoomAirConditioner
            ))
        );
    }

    #[rstest]
    #[case(-0.2, 1.25)]
    #[case(0., 1.25)]
    #[case(1. / 6., 1.2)]
    #[case(0.5, 1.11)]
    #[case(1., 1.)]
    #[case(1.5, 1.)]
    fn should_interpolate_variable_speed_efficiency_ratios(
        #[case] position: f64,
        #[case] expected: f64,
    ) {
        assert_relative_eq!(
            variable_speed_ratios().efficiency_ratio_at(position),
            expected,
            max_relative = 1e-9
        );
    }

    #[rstest]
    fn should_interpolate_fan_power_ratios() {
        assert_relative_eq!(
            two_stage_ratios().fan_power_ratio_at(0.5),
            0.925,
            max_relative = 1e-9
        );
    }

    #[rstest]
    fn should_share_single_curve_set_across_stages(catalog: Catalog) {
        let mode = catalog
            .archetype(EquipmentArchetype::VariableSpeedHeatPump)
            .unwrap()
            .mode(CoilMode::Heating)
            .unwrap();

        assert!(mode.supports_stage_count(7));
        assert_eq!(mode.curves_for_stage(6), mode.curves_for_stage(0));
    }

    #[rstest]
    fn should_keep_per_stage_curves_separate(catalog: Catalog) {
        let mode = catalog
            .archetype(EquipmentArchetype::TwoStageAirConditioner)
            .unwrap()
            .mode(CoilMode::Cooling)
            .unwrap();

        assert!(mode.supports_stage_count(2));
        assert!(!mode.supports_stage_count(3));
        assert_ne!(mode.curves_for_stage(0), mode.curves_for_stage(1));
        assert!(mode.curves_for_stage(2).is_none());
    }

    #[rstest]
    fn should_have_no_heating_for_air_conditioners(catalog: Catalog) {
        assert!(catalog
            .archetype(EquipmentArchetype::SingleStageAirConditioner)
            .unwrap()
            .mode(CoilMode::Heating)
            .is_none());
    }

    #[rstest]
    #[case(StageBounds::new(0.4, 1.2, 250., 400.), 10, true)]
    #[case(StageBounds::fixed(1., 394.2), 1, true)]
    #[case(StageBounds::fixed(1., 394.2), 2, false)]
    #[case(StageBounds::new(0.4, 1.2, 200., 400.), 4, false)]
    #[case(StageBounds::new(1.2, 0.4, 250., 400.), 4, false)]
    #[case(StageBounds::new(0., 1., 300., 400.), 4, false)]
    fn should_validate_stage_bounds(
        #[case] bounds: StageBounds,
        #[case] num_stages: usize,
        #[case] valid: bool,
    ) {
        assert_eq!(bounds.validate(num_stages).is_ok(), valid);
    }

    #[rstest]
    fn should_reject_ratio_table_not_normalized_at_maximum_stage(mut catalog: Catalog) {
        catalog
            .archetypes
            .get_mut(&EquipmentArchetype::TwoStageHeatPump)
            .unwrap()
            .heating
            .as_mut()
            .unwrap()
            .ratios
            .efficiency_ratios = vec![1.05, 0.98];

        assert!(matches!(
            catalog.validate(),
            Err(ConfigurationError::InvalidCatalog(_))
        ));
    }

    #[rstest]
    fn should_load_catalog_from_json(catalog: Catalog) {
        let json = serde_json::to_string(&catalog).unwrap();

        let loaded = Catalog::from_json(json.as_bytes()).unwrap();

        assert_eq!(
            loaded.archetypes.keys().collect::<Vec<_>>(),
            catalog.archetypes.keys().collect::<Vec<_>>()
        );
        assert_eq!(loaded.bins.heating.temperatures, catalog.bins.heating.temperatures);
        assert_eq!(
            loaded.archetypes[&EquipmentArchetype::GroundSourceHeatPump]
                .cooling
                .as_ref()
                .unwrap()
                .curves[0]
                .capacity_ft
                .basis(),
            UnitBasis::GroundSourceNormalized
        );
    }

    #[rstest]
    fn should_reject_invalid_catalog_json(mut catalog: Catalog) {
        catalog.bins.cooling.fractional_hours.pop();
        let json = serde_json::to_string(&catalog).unwrap();

        assert!(Catalog::from_json(json.as_bytes()).is_err());
    }

    #[rstest]
    fn should_place_minimum_airflow_where_shr_ceiling_reaches_floor() {
        assert_relative_eq!(
            0.3821066 + 0.001050652 * MIN_AIRFLOW_PER_TON - 0.01,
            0.6,
            max_relative = 1e-12
        );
    }
}
