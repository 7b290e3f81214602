use itertools::Itertools;

pub fn min_of_2<T: PartialOrd + Copy>(first: T, second: T) -> T {
    if first < second {
        first
    } else {
        second
    }
}

pub fn max_of_2<T: PartialOrd + Copy>(first: T, second: T) -> T {
    if first > second {
        first
    } else {
        second
    }
}

/// Bound `value` above by `upper`, then below by `lower`; the lower bound wins when the two
/// bounds cross.
pub(crate) fn clamp_to_band(value: f64, lower: f64, upper: f64) -> f64 {
    max_of_2(min_of_2(value, upper), lower)
}

pub fn is_strictly_increasing<'a>(values: impl IntoIterator<Item = &'a f64>) -> bool {
    values.into_iter().tuple_windows().all(|(a, b)| a < b)
}
