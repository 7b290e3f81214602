use crate::core::catalog::{CompressorLockout, StageBounds};
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Read};
use strum_macros::{Display, EnumIter};

pub fn ingest_rating_specs(json: impl Read) -> Result<Vec<RatingSpec>, anyhow::Error> {
    let reader = BufReader::new(json);

    Ok(serde_json::from_reader(reader)?)
}

#[derive(Clone, Copy, Debug, Deserialize, Display, EnumIter, Eq, Hash, PartialEq, Serialize)]
pub enum EquipmentArchetype {
    SingleStageAirConditioner,
    TwoStageAirConditioner,
    VariableSpeedAirConditioner,
    SingleStageHeatPump,
    TwoStageHeatPump,
    VariableSpeedHeatPump,
    MiniSplitHeatPump,
    RoomAirConditioner,
    GroundSourceHeatPump,
}

#[derive(Clone, Copy, Debug, Deserialize, Display, EnumIter, Eq, Hash, PartialEq, Serialize)]
pub enum CoilMode {
    #[strum(to_string = "cooling")]
    Cooling,
    #[strum(to_string = "heating")]
    Heating,
}

#[derive(Clone, Copy, Debug, Deserialize, Display, EnumIter, Eq, Hash, PartialEq, Serialize)]
pub enum MetricKind {
    #[strum(to_string = "SEER")]
    Seer,
    #[strum(to_string = "HSPF")]
    Hspf,
    #[strum(to_string = "EER")]
    Eer,
    #[strum(to_string = "COP")]
    Cop,
}

impl MetricKind {
    pub fn mode(&self) -> CoilMode {
        match self {
            MetricKind::Seer | MetricKind::Eer => CoilMode::Cooling,
            MetricKind::Hspf | MetricKind::Cop => CoilMode::Heating,
        }
    }

    /// Whether the rating integrates a whole season, so has no closed-form inverse
    pub fn is_seasonal(&self) -> bool {
        matches!(self, MetricKind::Seer | MetricKind::Hspf)
    }
}

/// Full-load efficiency quoted either once (for the maximum stage) or for every stage.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StageEfficiencies {
    Single(f64),
    PerStage(Vec<f64>),
}

impl StageEfficiencies {
    pub(crate) fn values(&self) -> &[f64] {
        match self {
            StageEfficiencies::Single(value) => std::slice::from_ref(value),
            StageEfficiencies::PerStage(values) => values,
        }
    }
}

/// The published rating an equipment instance is characterised by.
/// SEER and EER are in Btu/Wh, HSPF in Btu/Wh and COP dimensionless.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum RatedMetric {
    Seer(f64),
    Hspf(f64),
    Eer(StageEfficiencies),
    Cop(StageEfficiencies),
}

impl RatedMetric {
    pub fn kind(&self) -> MetricKind {
        match self {
            RatedMetric::Seer(_) => MetricKind::Seer,
            RatedMetric::Hspf(_) => MetricKind::Hspf,
            RatedMetric::Eer(_) => MetricKind::Eer,
            RatedMetric::Cop(_) => MetricKind::Cop,
        }
    }

    pub fn mode(&self) -> CoilMode {
        self.kind().mode()
    }

    /// All numeric values carried by the rating
    pub(crate) fn values(&self) -> &[f64] {
        match self {
            RatedMetric::Seer(value) | RatedMetric::Hspf(value) => std::slice::from_ref(value),
            RatedMetric::Eer(efficiencies) | RatedMetric::Cop(efficiencies) => {
                efficiencies.values()
            }
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RatingSpec {
    pub archetype: EquipmentArchetype,
    /// Number of capacity stages; the archetype's default when absent
    #[serde(default)]
    pub num_stages: Option<usize>,
    pub metric: RatedMetric,
    /// Rated indoor fan power, in W/cfm
    pub rated_fan_power: f64,
    /// Rated net sensible heat ratio, cooling only
    #[serde(default)]
    pub rated_net_shr: Option<f64>,
    #[serde(default)]
    pub stage_bounds: Option<StageBounds>,
    #[serde(default)]
    pub compressor_lockout: Option<CompressorLockout>,
}

impl RatingSpec {
    pub fn new(archetype: EquipmentArchetype, metric: RatedMetric, rated_fan_power: f64) -> Self {
        Self {
            archetype,
            num_stages: None,
            metric,
            rated_fan_power,
            rated_net_shr: None,
            stage_bounds: None,
            compressor_lockout: None,
        }
    }

    pub fn with_stages(mut self, num_stages: usize) -> Self {
        self.num_stages = Some(num_stages);
        self
    }

    pub fn with_net_shr(mut self, rated_net_shr: f64) -> Self {
        self.rated_net_shr = Some(rated_net_shr);
        self
    }

    pub fn with_stage_bounds(mut self, stage_bounds: StageBounds) -> Self {
        self.stage_bounds = Some(stage_bounds);
        self
    }
}
