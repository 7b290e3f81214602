use crate::core::units::BelowAbsoluteZeroError;
use crate::input::{CoilMode, EquipmentArchetype, MetricKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DerivationError {
    #[error("Rating specification was rejected: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Performance curve could not be evaluated: {0}")]
    Curve(#[from] CurveError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Building load line never crosses the capacity envelope: {0}")]
    NoBalancePoint(#[from] roots::SearchError),
    #[error("Stage {stage} ended up with a non-positive rated EIR ({eir})")]
    NonPositiveEir { stage: usize, eir: f64 },
}

/// Errors in the rating specification or catalog, raised before any computation.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("{metric} rating must be a positive, finite number (got {value})")]
    NonPositiveRating { metric: MetricKind, value: f64 },
    #[error("Rated fan power must be non-negative and finite (got {0} W/cfm)")]
    InvalidFanPower(f64),
    #[error("{archetype} equipment cannot be rated by {metric}")]
    UnsupportedMetric {
        archetype: EquipmentArchetype,
        metric: MetricKind,
    },
    #[error("No catalog entry for {0} equipment")]
    MissingArchetype(EquipmentArchetype),
    #[error("Catalog has no {mode} curves for {archetype} equipment")]
    MissingCurves {
        archetype: EquipmentArchetype,
        mode: CoilMode,
    },
    #[error("{archetype} equipment does not support {stages} capacity stages")]
    IncompatibleStageCount {
        archetype: EquipmentArchetype,
        stages: usize,
    },
    #[error("Expected one rated efficiency per stage ({expected}), found {found}")]
    PerStageLengthMismatch { expected: usize, found: usize },
    #[error("Invalid stage bounds: {0}")]
    InvalidBounds(String),
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum CurveError {
    #[error("Input {value} lies outside the valid range [{min}, {max}] of the curve")]
    InvalidCurveDomain { value: f64, min: f64, max: f64 },
    #[error(transparent)]
    BelowAbsoluteZero(#[from] BelowAbsoluteZeroError),
}
