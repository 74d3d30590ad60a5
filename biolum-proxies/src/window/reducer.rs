use crate::{ProxyError, ProxyResult};
use biolum_common::{Real, Sample};
use std::str::FromStr;

/// Statistic computed over the samples of each window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Reducer {
    Mean,
    Median,
    Min,
    Max,
}

impl Reducer {
    /// Parses a reducer selector, failing on anything but the four known names.
    pub fn from_name(name: &str) -> ProxyResult<Self> {
        Self::from_str(name).map_err(|_| ProxyError::UnknownReducer(name.to_owned()))
    }

    /// Reduces a window, skipping missing samples.
    /// Returns `None` when every sample in the window is missing.
    pub fn reduce(&self, window: &[Sample]) -> Sample {
        let present = window.iter().flatten().copied();
        match self {
            Reducer::Mean => {
                let (sum, count) = present.fold((0.0, 0usize), |(sum, count), value| {
                    (sum + value, count + 1)
                });
                (count > 0).then(|| sum / count as Real)
            }
            Reducer::Median => median(&mut present.collect::<Vec<_>>()),
            Reducer::Min => present.reduce(Real::min),
            Reducer::Max => present.reduce(Real::max),
        }
    }
}

/// Median of `values`, averaging the two central values for even lengths.
/// The slice is reordered in the process.
pub(crate) fn median(values: &mut [Real]) -> Option<Real> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(Real::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values.get(mid).copied()
    } else {
        Some((values.get(mid - 1)? + values.get(mid)?) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn parse_names() {
        assert_eq!(Reducer::from_name("mean"), Ok(Reducer::Mean));
        assert_eq!(Reducer::from_name("median"), Ok(Reducer::Median));
        assert_eq!(Reducer::from_name("min"), Ok(Reducer::Min));
        assert_eq!(Reducer::from_name("max"), Ok(Reducer::Max));
        assert_eq!(Reducer::Median.to_string(), "median");
    }

    #[test]
    fn unknown_name() {
        assert_eq!(
            Reducer::from_name("mode"),
            Err(ProxyError::UnknownReducer("mode".to_owned()))
        );
    }

    #[test]
    fn skips_missing() {
        let window = [Some(1.0), None, Some(4.0), Some(2.0), None];
        assert_approx_eq!(Reducer::Mean.reduce(&window).unwrap(), 7.0 / 3.0);
        assert_eq!(Reducer::Median.reduce(&window), Some(2.0));
        assert_eq!(Reducer::Min.reduce(&window), Some(1.0));
        assert_eq!(Reducer::Max.reduce(&window), Some(4.0));
    }

    #[test]
    fn all_missing() {
        let window = [None, None, None];
        for reducer in [Reducer::Mean, Reducer::Median, Reducer::Min, Reducer::Max] {
            assert_eq!(reducer.reduce(&window), None);
        }
        assert_eq!(Reducer::Mean.reduce(&[]), None);
    }

    #[test]
    fn even_median() {
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&mut [5.0]), Some(5.0));
        assert_eq!(median(&mut []), None);
    }
}
