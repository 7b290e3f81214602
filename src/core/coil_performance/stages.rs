use crate::core::catalog::{NormalizedRatioTable, StageBounds};
use crate::core::coil_performance::sensible_heat_ratio::gross_shr_from_net;
use crate::core::units::{BTU_PER_WATT_HOUR, FAN_POWER_PER_CAPACITY, WATTS_PER_TON};
use crate::errors::{ConfigurationError, DerivationError};
use crate::input::CoilMode;
use serde::Serialize;

/// Rated EIR of a cooling stage from its net EER (Btu/Wh) and fan power (W/cfm)
pub fn eir_from_eer(eer: f64, fan_power: f64) -> f64 {
    let fan = fan_power * FAN_POWER_PER_CAPACITY;
    (1. - fan) / (eer / BTU_PER_WATT_HOUR) - fan
}

pub fn eer_from_eir(eir: f64, fan_power: f64) -> f64 {
    let fan = fan_power * FAN_POWER_PER_CAPACITY;
    BTU_PER_WATT_HOUR * (1. - fan) / (eir + fan)
}

/// Rated EIR of a heating stage from its net COP and fan power (W/cfm)
pub fn eir_from_cop(cop: f64, fan_power: f64) -> f64 {
    let fan = fan_power * FAN_POWER_PER_CAPACITY;
    (1. + fan) / cop - fan
}

pub fn cop_from_eir(eir: f64, fan_power: f64) -> f64 {
    let fan = fan_power * FAN_POWER_PER_CAPACITY;
    (1. + fan) / (eir + fan)
}

pub fn rated_eir(mode: CoilMode, efficiency: f64, fan_power: f64) -> f64 {
    match mode {
        CoilMode::Cooling => eir_from_eer(efficiency, fan_power),
        CoilMode::Heating => eir_from_cop(efficiency, fan_power),
    }
}

/// Normalized position of stage `index` between the minimum (0) and maximum (1) stage
pub fn stage_position(index: usize, num_stages: usize) -> f64 {
    if num_stages <= 1 {
        1.
    } else {
        index as f64 / (num_stages - 1) as f64
    }
}

/// A stage laid out between its bounds whose rated EIR is not yet known.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingStage {
    index: usize,
    capacity_ratio: f64,
    airflow_per_ton: f64,
    efficiency_ratio: f64,
    gross_shr: Option<f64>,
    rated_fan_power: f64,
}

impl PendingStage {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn capacity_ratio(&self) -> f64 {
        self.capacity_ratio
    }

    pub fn airflow_per_ton(&self) -> f64 {
        self.airflow_per_ton
    }

    /// Full-load efficiency of this stage relative to the maximum stage
    pub fn efficiency_ratio(&self) -> f64 {
        self.efficiency_ratio
    }

    pub fn gross_shr(&self) -> Option<f64> {
        self.gross_shr
    }

    pub fn rated_fan_power(&self) -> f64 {
        self.rated_fan_power
    }

    /// Fan power per unit of nominal (one ton, maximum stage) capacity, in W/W
    pub fn normalized_fan_power(&self) -> f64 {
        self.rated_fan_power * self.airflow_per_ton * self.capacity_ratio / WATTS_PER_TON
    }

    /// Rated EIR of this stage if the maximum stage has full-load efficiency
    /// `max_stage_efficiency` (EER for cooling, COP for heating).
    pub fn eir_for(&self, mode: CoilMode, max_stage_efficiency: f64) -> f64 {
        rated_eir(
            mode,
            max_stage_efficiency * self.efficiency_ratio,
            self.rated_fan_power,
        )
    }

    /// Fix the rated EIR, giving the finished stage.
    pub fn finish(self, rated_eir: f64) -> Result<Stage, DerivationError> {
        if !(rated_eir.is_finite() && rated_eir > 0.) {
            return Err(DerivationError::NonPositiveEir {
                stage: self.index,
                eir: rated_eir,
            });
        }

        Ok(Stage {
            index: self.index,
            capacity_ratio: self.capacity_ratio,
            airflow_per_ton: self.airflow_per_ton,
            rated_eir,
            gross_shr: self.gross_shr,
            rated_fan_power: self.rated_fan_power,
        })
    }
}

/// One capacity stage of a coil, ready to parameterise a simulation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Stage {
    index: usize,
    capacity_ratio: f64,
    airflow_per_ton: f64,
    rated_eir: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    gross_shr: Option<f64>,
    rated_fan_power: f64,
}

impl Stage {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Capacity relative to the nominal capacity of the equipment
    pub fn capacity_ratio(&self) -> f64 {
        self.capacity_ratio
    }

    /// Rated airflow in cfm/ton
    pub fn airflow_per_ton(&self) -> f64 {
        self.airflow_per_ton
    }

    pub fn rated_eir(&self) -> f64 {
        self.rated_eir
    }

    /// Gross sensible heat ratio, cooling stages only
    pub fn gross_shr(&self) -> Option<f64> {
        self.gross_shr
    }

    /// Rated fan power in W/cfm
    pub fn rated_fan_power(&self) -> f64 {
        self.rated_fan_power
    }
}

/// Lay out `num_stages` stages between `bounds`.
///
/// Arguments:
/// * `num_stages` - number of capacity stages, at least 1
/// * `bounds` - capacity and airflow of the minimum and maximum stages
/// * `ratios` - efficiency and fan power of each stage relative to the maximum stage
/// * `fan_power` - rated fan power of the maximum stage, in W/cfm
/// * `net_shr` - rated net SHR; cooling stages only
pub fn build_pending_stages(
    num_stages: usize,
    bounds: &StageBounds,
    ratios: &NormalizedRatioTable,
    fan_power: f64,
    net_shr: Option<f64>,
) -> Result<Vec<PendingStage>, DerivationError> {
    if num_stages == 0 {
        return Err(ConfigurationError::InvalidBounds(
            "at least one capacity stage is needed".to_owned(),
        )
        .into());
    }
    bounds.validate(num_stages)?;

    (0..num_stages)
        .map(|index| {
            let position = stage_position(index, num_stages);
            let airflow_per_ton = bounds.airflow_per_ton_at(position);
            let rated_fan_power = fan_power * ratios.fan_power_ratio_at(position);

            Ok(PendingStage {
                index,
                capacity_ratio: bounds.capacity_ratio_at(position),
                airflow_per_ton,
                efficiency_ratio: ratios.efficiency_ratio_at(position),
                gross_shr: net_shr
                    .map(|net_shr| gross_shr_from_net(net_shr, rated_fan_power, airflow_per_ton))
                    .transpose()?,
                rated_fan_power,
            })
        })
        .collect()
}

/// Finish stages rated directly by full-load efficiency (EER or COP).
///
/// A single efficiency belongs to the maximum stage and is scaled by each stage's efficiency
/// ratio; otherwise there must be one efficiency per stage.
pub fn finish_with_efficiencies(
    pending: Vec<PendingStage>,
    mode: CoilMode,
    efficiencies: &[f64],
) -> Result<Vec<Stage>, DerivationError> {
    match efficiencies {
        [max_stage_efficiency] => {
            finish_with_max_stage_efficiency(pending, mode, *max_stage_efficiency)
        }
        per_stage if per_stage.len() == pending.len() => pending
            .into_iter()
            .zip(per_stage)
            .map(|(stage, efficiency)| {
                let eir = rated_eir(mode, *efficiency, stage.rated_fan_power);
                stage.finish(eir)
            })
            .collect(),
        per_stage => Err(ConfigurationError::PerStageLengthMismatch {
            expected: pending.len(),
            found: per_stage.len(),
        }
        .into()),
    }
}

pub fn finish_with_max_stage_efficiency(
    pending: Vec<PendingStage>,
    mode: CoilMode,
    max_stage_efficiency: f64,
) -> Result<Vec<Stage>, DerivationError> {
    pending
        .into_iter()
        .map(|stage| {
            let eir = stage.eir_for(mode, max_stage_efficiency);
            stage.finish(eir)
        })
        .collect()
}
