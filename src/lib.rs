#![allow(clippy::too_many_arguments)]

mod compare_floats;
pub mod core;
pub mod errors;
pub mod input;

pub use crate::core::catalog::Catalog;
pub use crate::core::derivation::{DerivedPerformance, PerformanceDeriver};
pub use crate::core::solvers::{EfficiencySolution, FallbackCorrelation, SolutionQuality};
pub use crate::errors::{ConfigurationError, CurveError, DerivationError};
pub use crate::input::{RatedMetric, RatingSpec};
use crate::input::ingest_rating_specs;
use anyhow::Context;
use std::io::Read;

/// Derive stage parameters for every rating spec in a JSON array read from `input`.
///
/// Fails on the first spec that cannot be derived; specs matched only by the fallback
/// correlation are returned flagged rather than failing.
pub fn run_derivation(
    input: impl Read,
    catalog: &Catalog,
) -> Result<Vec<DerivedPerformance>, anyhow::Error> {
    let specs = ingest_rating_specs(input)?;

    PerformanceDeriver::new(catalog)
        .derive_all(&specs)
        .into_iter()
        .zip(&specs)
        .enumerate()
        .map(|(i, (result, spec))| {
            result.with_context(|| {
                format!(
                    "Could not derive performance of rating spec {i} ({} rated by {})",
                    spec.archetype,
                    spec.metric.kind()
                )
            })
        })
        .collect()
}
