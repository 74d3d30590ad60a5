//! Fixed-width sliding-window statistics over a sampled series.
//!
//! The window width is given in time units and converted to a point count
//! using the median sampling interval, so the computation is exact only for
//! equally spaced samples. Windows shrink at both ends of the series.
pub mod reducer;

use crate::{ProxyError, ProxyResult, error::ensure_length, sampling::SamplingReport};
use biolum_common::{Real, Sample, Timestamp};
use rayon::prelude::*;
use tracing::warn;

pub(crate) use reducer::median;
pub use reducer::Reducer;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowSmoother {
    width: Real,
    reducer: Reducer,
}

impl WindowSmoother {
    pub fn new(width: Real, reducer: Reducer) -> ProxyResult<Self> {
        if width.is_finite() && width >= 0.0 {
            Ok(Self { width, reducer })
        } else {
            Err(ProxyError::InvalidParameter {
                name: "window width",
                value: width,
            })
        }
    }

    /// Number of points either side of the centre of each window, or `None`
    /// (with a warning) if the series spans less time than the window.
    ///
    /// Without timestamps the samples are taken to sit at unit spacing.
    pub fn half_window(&self, len: usize, timestamps: Option<&[Timestamp]>) -> Option<usize> {
        let (span, report) = match timestamps {
            Some(timestamps) => (
                timestamps
                    .first()
                    .zip(timestamps.last())
                    .map_or(0.0, |(first, last)| last - first),
                SamplingReport::from_timestamps(timestamps),
            ),
            None => (len.saturating_sub(1) as Real, None),
        };
        if span < self.width {
            warn!(
                "Window of {} ({}) exceeds the series span of {span}, output is missing",
                self.width, self.reducer
            );
            return None;
        }
        let median_interval = match timestamps {
            Some(_) => report.map(|report| report.median_interval),
            None => Some(1.0),
        };
        Some(median_interval.map_or(0, |dt| half_points(self.width, dt)))
    }

    /// Applies the reducer at every position of `values`.
    ///
    /// The output has the same length and order as the input. Positions whose
    /// window holds only missing samples are missing.
    #[tracing::instrument(skip_all, level = "trace", fields(width = self.width, reducer = %self.reducer))]
    pub fn smooth(
        &self,
        values: &[Sample],
        timestamps: Option<&[Timestamp]>,
    ) -> ProxyResult<Vec<Sample>> {
        if let Some(timestamps) = timestamps {
            ensure_length("timestamps", values.len(), timestamps.len())?;
        }
        let Some(half) = self.half_window(values.len(), timestamps) else {
            return Ok(vec![None; values.len()]);
        };
        let last = values.len().saturating_sub(1);
        Ok((0..values.len())
            .into_par_iter()
            .map(|i| {
                let start = i.saturating_sub(half);
                let end = i.saturating_add(half).min(last);
                values
                    .get(start..=end)
                    .and_then(|window| self.reducer.reduce(window))
            })
            .collect())
    }
}

/// Interval estimates carry rounding error (1/60 is not representable), so a
/// ratio within 1e-9 of the next integer is counted as that integer.
fn half_points(width: Real, interval: Real) -> usize {
    const ROUNDING_SLACK: Real = 1e-9;
    (width / 2.0 / interval + ROUNDING_SLACK).floor() as usize
}

/// Convenience wrapper around [WindowSmoother::smooth].
pub fn smooth(
    values: &[Sample],
    timestamps: Option<&[Timestamp]>,
    width: Real,
    reducer: Reducer,
) -> ProxyResult<Vec<Sample>> {
    WindowSmoother::new(width, reducer)?.smooth(values, timestamps)
}
