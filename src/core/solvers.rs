use crate::errors::{ConfigurationError, DerivationError};
use crate::input::MetricKind;
use roots::{find_root_brent, SimpleConvergency};
use serde::Serialize;
use tracing::{debug, warn};

pub const ITERATION_CAP: usize = 50;
pub const TOLERANCE: f64 = 0.001;
const FIRST_STEP: f64 = 0.1;

/// Zero of `func` between `low` and `high`, which must bracket it.
pub(crate) fn balance_temperature(
    func: impl Fn(f64) -> f64,
    low: f64,
    high: f64,
) -> Result<f64, roots::SearchError> {
    let mut convergency = SimpleConvergency {
        eps: 1e-9,
        max_iter: 100,
    };

    find_root_brent::<f64, _>(low, high, func, &mut convergency)
}

/// Published correlation between a seasonal rating and the full-load efficiency of the
/// maximum stage, used as the starting guess and when iteration fails.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum FallbackCorrelation {
    /// `EER = 0.547 SEER - 0.104`
    EerFromSeer,
    /// `COP47 = 0.0353 HSPF^2 + 0.0331 HSPF + 0.9447`
    CopFromHspf,
}

impl FallbackCorrelation {
    pub fn metric(&self) -> MetricKind {
        match self {
            Self::EerFromSeer => MetricKind::Seer,
            Self::CopFromHspf => MetricKind::Hspf,
        }
    }

    pub fn estimate(&self, seasonal_rating: f64) -> f64 {
        match self {
            Self::EerFromSeer => 0.547 * seasonal_rating - 0.104,
            Self::CopFromHspf => {
                0.0353 * seasonal_rating.powi(2) + 0.0331 * seasonal_rating + 0.9447
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum SolutionQuality {
    Converged {
        iterations: usize,
    },
    /// The fallback correlation was substituted
    Estimated {
        iterations: usize,
        last_residual: f64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EfficiencySolution {
    /// Full-load efficiency of the maximum stage (EER or COP)
    pub efficiency: f64,
    pub quality: SolutionQuality,
    /// Number of times the seasonal metric was computed
    pub evaluations: usize,
}

impl EfficiencySolution {
    pub fn is_converged(&self) -> bool {
        matches!(self.quality, SolutionQuality::Converged { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Guess {
    efficiency: f64,
    residual: f64,
}

/// Bookkeeping of one solve. Residuals are target minus computed, so they fall as the
/// efficiency rises.
#[derive(Debug)]
struct SolverState {
    previous: Option<Guess>,
    current: Guess,
    /// Highest guess known to fall short of the target
    low: Option<Guess>,
    /// Lowest guess known to overshoot the target
    high: Option<Guess>,
    iteration_count: usize,
    converged: bool,
}

impl SolverState {
    fn new(initial: Guess) -> Self {
        let mut state = Self {
            previous: None,
            current: initial,
            low: None,
            high: None,
            iteration_count: 0,
            converged: false,
        };
        state.update_bracket(initial);
        state.converged = initial.residual.abs() < TOLERANCE;
        state
    }

    fn update_bracket(&mut self, guess: Guess) {
        if guess.residual > 0. && self.low.map_or(true, |low| guess.efficiency > low.efficiency) {
            self.low = Some(guess);
        }
        if guess.residual < 0. && self.high.map_or(true, |high| guess.efficiency < high.efficiency)
        {
            self.high = Some(guess);
        }
    }

    fn record(&mut self, guess: Guess) {
        self.iteration_count += 1;
        self.update_bracket(guess);
        self.previous = Some(self.current);
        self.current = guess;
        self.converged = guess.residual.abs() < TOLERANCE;
    }

    fn next_efficiency(&self) -> f64 {
        let current = self.current;
        let candidate = match self.previous {
            Some(previous) if previous.residual != current.residual => {
                current.efficiency
                    - current.residual * (current.efficiency - previous.efficiency)
                        / (current.residual - previous.residual)
            }
            _ if current.residual > 0. => current.efficiency + FIRST_STEP,
            _ => current.efficiency - FIRST_STEP,
        };

        let candidate = match (self.low, self.high) {
            (Some(low), Some(high)) => {
                let (lower, upper) = if low.efficiency < high.efficiency {
                    (low.efficiency, high.efficiency)
                } else {
                    (high.efficiency, low.efficiency)
                };
                if lower < candidate && candidate < upper {
                    candidate
                } else {
                    (lower + upper) / 2.
                }
            }
            _ => candidate,
        };

        if candidate > 0. {
            candidate
        } else {
            current.efficiency / 2.
        }
    }
}

/// Find the maximum-stage full-load efficiency at which `seasonal_metric` reproduces
/// `target`.
///
/// Iterates with the secant method, bisecting once the target is bracketed, for at most
/// `ITERATION_CAP` iterations. Failure to converge is not an error: the fallback correlation
/// is returned flagged as an estimate.
///
/// Arguments:
/// * `target` - the published seasonal rating (SEER or HSPF)
/// * `correlation` - the correlation giving the starting guess and the fallback
/// * `seasonal_metric` - the seasonal rating computed for a trial efficiency
pub fn solve_max_stage_efficiency(
    target: f64,
    correlation: FallbackCorrelation,
    mut seasonal_metric: impl FnMut(f64) -> Result<f64, DerivationError>,
) -> Result<EfficiencySolution, DerivationError> {
    if !(target.is_finite() && target > 0.) {
        return Err(ConfigurationError::NonPositiveRating {
            metric: correlation.metric(),
            value: target,
        }
        .into());
    }

    let fallback = correlation.estimate(target);
    let initial_efficiency = if fallback > 0. { fallback } else { target };

    let mut evaluations = 0;
    let mut residual_at = |efficiency: f64| -> Result<f64, DerivationError> {
        evaluations += 1;
        Ok(target - seasonal_metric(efficiency)?)
    };

    let initial_residual = residual_at(initial_efficiency)?;
    let mut state = SolverState::new(Guess {
        efficiency: initial_efficiency,
        residual: initial_residual,
    });

    while !state.converged && state.iteration_count < ITERATION_CAP {
        if !state.current.residual.is_finite() {
            break;
        }
        let efficiency = state.next_efficiency();
        let residual = residual_at(efficiency)?;
        state.record(Guess {
            efficiency,
            residual,
        });
        debug!(
            "{} iteration {}: efficiency {efficiency}, residual {residual}",
            correlation.metric(),
            state.iteration_count
        );
    }

    let quality = if state.converged {
        SolutionQuality::Converged {
            iterations: state.iteration_count,
        }
    } else {
        warn!(
            "Could not match {} of {target} after {} iterations, falling back to correlation estimate of {fallback}",
            correlation.metric(),
            state.iteration_count
        );
        SolutionQuality::Estimated {
            iterations: state.iteration_count,
            last_residual: state.current.residual,
        }
    };

    Ok(EfficiencySolution {
        efficiency: if state.converged {
            state.current.efficiency
        } else {
            fallback
        },
        quality,
        evaluations,
    })
}
