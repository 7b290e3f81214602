use crate::core::units::{fahrenheit_to_kelvin, FahrenheitMapping};
use crate::errors::CurveError;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::debug;

/// Reference temperature of the ground-source normalized scale, in K
pub const GROUND_SOURCE_REFERENCE_TEMPERATURE: f64 = 283.15;

/// The temperature scale a set of biquadratic coefficients expects its inputs in.
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum UnitBasis {
    #[default]
    Fahrenheit,
    Celsius,
    /// Absolute temperature divided by a 283.15 K reference
    GroundSourceNormalized,
}

impl UnitBasis {
    fn fahrenheit_mapping(&self) -> FahrenheitMapping {
        match self {
            UnitBasis::Fahrenheit => FahrenheitMapping::IDENTITY,
            UnitBasis::Celsius => FahrenheitMapping::CELSIUS,
            UnitBasis::GroundSourceNormalized => {
                FahrenheitMapping::normalized_kelvin(GROUND_SOURCE_REFERENCE_TEMPERATURE)
            }
        }
    }

    /// Express a temperature in degF on this basis.
    pub fn from_fahrenheit(&self, temp_f: f64) -> Result<f64, CurveError> {
        match self {
            UnitBasis::GroundSourceNormalized => {
                Ok(fahrenheit_to_kelvin(temp_f)? / GROUND_SOURCE_REFERENCE_TEMPERATURE)
            }
            _ => Ok(self.fahrenheit_mapping().from_fahrenheit(temp_f)),
        }
    }

    /// Linear substitution `v_self = scale * v_to + offset` carrying a value on basis `to`
    /// onto this basis.
    fn substitution_from(&self, to: UnitBasis) -> (f64, f64) {
        let this = self.fahrenheit_mapping();
        let other = to.fahrenheit_mapping();

        (
            other.scale / this.scale,
            (other.offset - this.offset) / this.scale,
        )
    }
}

/// What to do with a curve input lying outside its valid range.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum DomainPolicy {
    #[default]
    Clamp,
    Fail,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ValidRange {
    pub min: f64,
    pub max: f64,
}

impl ValidRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn apply(&self, value: f64, policy: DomainPolicy) -> Result<f64, CurveError> {
        if (self.min..=self.max).contains(&value) {
            return Ok(value);
        }

        match policy {
            DomainPolicy::Clamp => {
                let clamped = value.clamp(self.min, self.max);
                debug!(
                    "Curve input {value} clamped to {clamped} (valid range [{}, {}])",
                    self.min, self.max
                );
                Ok(clamped)
            }
            DomainPolicy::Fail => Err(CurveError::InvalidCurveDomain {
                value,
                min: self.min,
                max: self.max,
            }),
        }
    }

    /// Re-express the range under the substitution `v = scale * u + offset`.
    fn substituted(&self, scale: f64, offset: f64) -> Self {
        Self {
            min: (self.min - offset) / scale,
            max: (self.max - offset) / scale,
        }
    }
}

fn apply_range(
    range: Option<&ValidRange>,
    value: f64,
    policy: DomainPolicy,
) -> Result<f64, CurveError> {
    match range {
        Some(range) => range.apply(value, policy),
        None => Ok(value),
    }
}

/// Performance modifier of two temperatures, `a + b x + c x^2 + d y + e y^2 + f x y`.
///
/// For coil curves `x` is the indoor (entering wet-bulb or dry-bulb) temperature and `y`
/// the outdoor (or entering water) temperature.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BiquadraticCurve {
    coefficients: [f64; 6],
    #[serde(default)]
    basis: UnitBasis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x_range: Option<ValidRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    y_range: Option<ValidRange>,
}

impl BiquadraticCurve {
    pub fn new(coefficients: [f64; 6], basis: UnitBasis) -> Self {
        Self {
            coefficients,
            basis,
            x_range: None,
            y_range: None,
        }
    }

    pub fn with_ranges(mut self, x_range: ValidRange, y_range: ValidRange) -> Self {
        self.x_range = Some(x_range);
        self.y_range = Some(y_range);
        self
    }

    pub fn coefficients(&self) -> &[f64; 6] {
        &self.coefficients
    }

    pub fn basis(&self) -> UnitBasis {
        self.basis
    }

    pub fn x_range(&self) -> Option<&ValidRange> {
        self.x_range.as_ref()
    }

    pub fn y_range(&self) -> Option<&ValidRange> {
        self.y_range.as_ref()
    }

    /// Evaluate the curve with inputs already expressed in the curve's own basis.
    pub fn evaluate(&self, x: f64, y: f64, policy: DomainPolicy) -> Result<f64, CurveError> {
        let x = apply_range(self.x_range.as_ref(), x, policy)?;
        let y = apply_range(self.y_range.as_ref(), y, policy)?;
        let [a, b, c, d, e, f] = self.coefficients;

        Ok(a + b * x + c * x.powi(2) + d * y + e * y.powi(2) + f * x * y)
    }

    /// Evaluate the curve at temperatures given in degF.
    ///
    /// Arguments:
    /// * `x_f` - indoor temperature, in degF
    /// * `y_f` - outdoor or entering water temperature, in degF
    /// * `policy` - how to treat inputs outside the curve's valid ranges
    pub fn evaluate_fahrenheit(
        &self,
        x_f: f64,
        y_f: f64,
        policy: DomainPolicy,
    ) -> Result<f64, CurveError> {
        self.evaluate(
            self.basis.from_fahrenheit(x_f)?,
            self.basis.from_fahrenheit(y_f)?,
            policy,
        )
    }

    /// The same curve expressed on another unit basis, valid ranges included.
    pub fn to_basis(&self, to: UnitBasis) -> Self {
        let (scale, offset) = self.basis.substitution_from(to);

        Self {
            coefficients: convert_coefficients(&self.coefficients, self.basis, to),
            basis: to,
            x_range: self.x_range.map(|range| range.substituted(scale, offset)),
            y_range: self.y_range.map(|range| range.substituted(scale, offset)),
        }
    }
}

/// Re-derive biquadratic coefficients for another temperature basis.
///
/// Both inputs are substituted by `v = p u + q`, where `v` is on the `from` basis and `u`
/// on the `to` basis, and the polynomial is expanded back into the six-term form.
pub fn convert_coefficients(coefficients: &[f64; 6], from: UnitBasis, to: UnitBasis) -> [f64; 6] {
    if from == to {
        return *coefficients;
    }

    let (p, q) = from.substitution_from(to);
    let [a, b, c, d, e, f] = *coefficients;

    [
        a + b * q + c * q.powi(2) + d * q + e * q.powi(2) + f * q.powi(2),
        b * p + 2. * c * p * q + f * p * q,
        c * p.powi(2),
        d * p + 2. * e * p * q + f * p * q,
        e * p.powi(2),
        f * p.powi(2),
    ]
}

/// Modifier of a single dimensionless input, such as the flow fraction.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", deny_unknown_fields)]
pub enum SingleVariableCurve {
    Quadratic {
        coefficients: [f64; 3],
        #[serde(default, skip_serializing_if = "Option::is_none")]
        range: Option<ValidRange>,
    },
    Cubic {
        coefficients: [f64; 4],
        #[serde(default, skip_serializing_if = "Option::is_none")]
        range: Option<ValidRange>,
    },
}

impl SingleVariableCurve {
    pub fn quadratic(coefficients: [f64; 3]) -> Self {
        Self::Quadratic {
            coefficients,
            range: None,
        }
    }

    pub fn evaluate(&self, x: f64, policy: DomainPolicy) -> Result<f64, CurveError> {
        Ok(match self {
            SingleVariableCurve::Quadratic {
                coefficients: [a, b, c],
                range,
            } => {
                let x = apply_range(range.as_ref(), x, policy)?;
                a + b * x + c * x.powi(2)
            }
            SingleVariableCurve::Cubic {
                coefficients: [a, b, c, d],
                range,
            } => {
                let x = apply_range(range.as_ref(), x, policy)?;
                a + b * x + c * x.powi(2) + d * x.powi(3)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn cooling_capacity_curve() -> BiquadraticCurve {
        BiquadraticCurve::new(
            [
                3.670270705,
                -0.098652414,
                0.000955906,
                0.006552414,
                -0.0000156,
                -0.000131877,
            ],
            UnitBasis::Fahrenheit,
        )
    }

    #[fixture]
    fn ground_source_capacity_curve() -> BiquadraticCurve {
        BiquadraticCurve::new(
            [-3.91606454, 7.04667703, 0., -2.27179286, 0., 0.],
            UnitBasis::GroundSourceNormalized,
        )
        .with_ranges(ValidRange::new(1.0, 1.07848), ValidRange::new(0.94114, 1.11772))
    }

    #[rstest]
    fn should_be_close_to_unity_at_rating_conditions(cooling_capacity_curve: BiquadraticCurve) {
        assert_relative_eq!(
            cooling_capacity_curve
                .evaluate(67., 95., DomainPolicy::Clamp)
                .unwrap(),
            1.0,
            max_relative = 1e-2
        );
    }

    #[rstest]
    fn should_expand_fahrenheit_coefficients_into_celsius(
        cooling_capacity_curve: BiquadraticCurve,
    ) {
        let [a, b, c, d, e, f] = *cooling_capacity_curve.coefficients();
        let converted = convert_coefficients(
            cooling_capacity_curve.coefficients(),
            UnitBasis::Fahrenheit,
            UnitBasis::Celsius,
        );

        assert_relative_eq!(
            converted[0],
            a + 32. * (b + d) + 1024. * (c + e + f),
            max_relative = 1e-10
        );
        assert_relative_eq!(converted[1], 1.8 * (b + 64. * c + 32. * f), max_relative = 1e-10);
        assert_relative_eq!(converted[2], 3.24 * c, max_relative = 1e-10);
        assert_relative_eq!(converted[3], 1.8 * (d + 64. * e + 32. * f), max_relative = 1e-10);
        assert_relative_eq!(converted[4], 3.24 * e, max_relative = 1e-10);
        assert_relative_eq!(converted[5], 3.24 * f, max_relative = 1e-10);
    }

    #[rstest]
    #[case(67., 95.)]
    #[case(62., 82.)]
    #[case(70., 17.)]
    fn should_give_same_modifier_on_either_basis(
        cooling_capacity_curve: BiquadraticCurve,
        #[case] x_f: f64,
        #[case] y_f: f64,
    ) {
        let celsius = cooling_capacity_curve.to_basis(UnitBasis::Celsius);

        assert_eq!(celsius.basis(), UnitBasis::Celsius);
        assert_relative_eq!(
            celsius
                .evaluate((x_f - 32.) / 1.8, (y_f - 32.) / 1.8, DomainPolicy::Clamp)
                .unwrap(),
            cooling_capacity_curve
                .evaluate(x_f, y_f, DomainPolicy::Clamp)
                .unwrap(),
            max_relative = 1e-9
        );
    }

    #[rstest]
    fn should_evaluate_ground_source_curve_from_fahrenheit(
        ground_source_capacity_curve: BiquadraticCurve,
    ) {
        let from_fahrenheit = ground_source_capacity_curve
            .evaluate_fahrenheit(50., 60., DomainPolicy::Fail)
            .unwrap();
        let direct = ground_source_capacity_curve
            .evaluate(1.0, (60. + 459.67) / 1.8 / 283.15, DomainPolicy::Fail)
            .unwrap();

        assert_relative_eq!(from_fahrenheit, direct, max_relative = 1e-12);
    }

    #[rstest]
    fn should_carry_ground_source_curve_and_ranges_into_celsius(
        ground_source_capacity_curve: BiquadraticCurve,
    ) {
        let celsius = ground_source_capacity_curve.to_basis(UnitBasis::Celsius);

        assert_relative_eq!(celsius.x_range().unwrap().min, 10., max_relative = 1e-3);
        assert_relative_eq!(celsius.y_range().unwrap().max, 43.33, max_relative = 1e-3);
        assert_relative_eq!(
            celsius.evaluate(15., 20., DomainPolicy::Fail).unwrap(),
            ground_source_capacity_curve
                .evaluate_fahrenheit(59., 68., DomainPolicy::Fail)
                .unwrap(),
            max_relative = 1e-9
        );
    }

    #[rstest]
    fn should_clamp_or_fail_outside_valid_range(ground_source_capacity_curve: BiquadraticCurve) {
        let clamped = ground_source_capacity_curve
            .evaluate(1.0, 2.0, DomainPolicy::Clamp)
            .unwrap();
        let at_bound = ground_source_capacity_curve
            .evaluate(1.0, 1.11772, DomainPolicy::Clamp)
            .unwrap();

        assert_eq!(clamped, at_bound);
        assert_eq!(
            ground_source_capacity_curve.evaluate(1.0, 2.0, DomainPolicy::Fail),
            Err(CurveError::InvalidCurveDomain {
                value: 2.0,
                min: 0.94114,
                max: 1.11772
            })
        );
    }

    #[rstest]
    fn should_reject_temperatures_below_absolute_zero(
        ground_source_capacity_curve: BiquadraticCurve,
    ) {
        assert!(matches!(
            ground_source_capacity_curve.evaluate_fahrenheit(50., -500., DomainPolicy::Clamp),
            Err(CurveError::BelowAbsoluteZero(_))
        ));
    }

    #[rstest]
    fn should_leave_coefficients_alone_on_same_basis(cooling_capacity_curve: BiquadraticCurve) {
        assert_eq!(
            cooling_capacity_curve.to_basis(UnitBasis::Fahrenheit),
            cooling_capacity_curve
        );
    }

    #[rstest]
    #[case(SingleVariableCurve::quadratic([0.718605468, 0.410099989, -0.128705457]), 1.0, 1.0)]
    #[case(SingleVariableCurve::quadratic([1., 2., 3.]), 2., 17.)]
    #[case(SingleVariableCurve::Cubic { coefficients: [1., 1., 1., 1.], range: None }, 2., 15.)]
    fn should_evaluate_single_variable_curves(
        #[case] curve: SingleVariableCurve,
        #[case] x: f64,
        #[case] expected: f64,
    ) {
        assert_relative_eq!(
            curve.evaluate(x, DomainPolicy::Fail).unwrap(),
            expected,
            max_relative = 1e-6
        );
    }

    #[rstest]
    fn should_clamp_single_variable_curve_input() {
        let curve = SingleVariableCurve::Cubic {
            coefficients: [0., 1., 0., 0.],
            range: Some(ValidRange::new(0.5, 1.5)),
        };

        assert_eq!(curve.evaluate(3., DomainPolicy::Clamp).unwrap(), 1.5);
        assert!(curve.evaluate(3., DomainPolicy::Fail).is_err());
    }
}
