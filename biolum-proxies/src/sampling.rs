//! Diagnostics on the spacing of a timestamp vector.
//!
//! The windowed stages assume equally spaced samples. These checks never
//! reject data, they only warn when the assumption is visibly broken.
use crate::{ProxyError, ProxyResult, window::median};
use biolum_common::{Real, SAMPLING_TOLERANCE, Timestamp};
use itertools::Itertools;
use tracing::warn;

#[derive(Clone, Debug, PartialEq)]
pub struct SamplingReport {
    /// Median of the consecutive timestamp differences.
    pub median_interval: Real,
    /// Largest absolute departure of any interval from the median interval.
    pub max_deviation: Real,
}

impl SamplingReport {
    /// Returns `None` if there are fewer than two timestamps.
    pub fn from_timestamps(timestamps: &[Timestamp]) -> Option<Self> {
        let mut intervals = intervals(timestamps);
        let median_interval = median(&mut intervals)?;
        let max_deviation = intervals
            .iter()
            .map(|dt| (dt - median_interval).abs())
            .fold(0.0, Real::max);
        Some(Self {
            median_interval,
            max_deviation,
        })
    }

    pub fn sample_rate(&self) -> Real {
        1.0 / self.median_interval
    }

    pub fn is_regular(&self) -> bool {
        self.max_deviation <= SAMPLING_TOLERANCE * self.median_interval
    }

    /// Warns if any interval strays more than 1% from the median interval.
    pub fn check_regular(&self, name: &str) -> bool {
        let regular = self.is_regular();
        if !regular {
            warn!(
                "Irregular sampling in '{name}': intervals deviate by up to {:.3e} s from the median of {:.3e} s, windows are approximate",
                self.max_deviation, self.median_interval
            );
        }
        regular
    }

    /// Warns if the detected rate is more than 1% away from `expected_hz`.
    pub fn check_rate(&self, name: &str, expected_hz: Real) -> bool {
        let rate = self.sample_rate();
        let matches = ((rate - expected_hz) / expected_hz).abs() <= SAMPLING_TOLERANCE;
        if !matches {
            warn!("Series '{name}' is sampled at {rate:.3} Hz, expected {expected_hz} Hz");
        }
        matches
    }
}

pub(crate) fn intervals(timestamps: &[Timestamp]) -> Vec<Real> {
    timestamps
        .iter()
        .tuple_windows()
        .map(|(prev, next)| next - prev)
        .collect()
}

/// Fails with the index of the first timestamp not greater than its predecessor.
pub fn ensure_increasing(timestamps: &[Timestamp]) -> ProxyResult<()> {
    match timestamps
        .iter()
        .tuple_windows()
        .position(|(prev, next)| next <= prev || next.is_nan())
    {
        Some(index) => Err(ProxyError::NonIncreasingTimestamps(index + 1)),
        None => Ok(()),
    }
}
