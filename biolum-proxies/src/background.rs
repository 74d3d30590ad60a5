//! Baseline and envelope of the bioluminescence signal.
//!
//! Each baseline is a robust window statistic followed by a mean window of the
//! same width, which removes the stair steps left by the first pass.
use crate::{
    ProxyResult,
    error::ensure_length,
    parameters::BackgroundParameters,
    window::{Reducer, WindowSmoother},
};
use biolum_common::{Real, Sample, Timestamp};
use serde::Serialize;
use tracing::debug;

/// Baselines aligned with the bioluminescence timestamps.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BackgroundEnvelope {
    /// Median background, attributed to non-flashing dinoflagellates.
    pub median: Vec<Sample>,
    /// Minimum background, the lower bound of the envelope.
    pub lower: Vec<Sample>,
    /// Lower bound reflected about the median, at least `envelope_minimum` above it.
    pub upper: Vec<Sample>,
}

impl BackgroundEnvelope {
    pub fn len(&self) -> usize {
        self.median.len()
    }

    pub fn is_empty(&self) -> bool {
        self.median.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct BackgroundEnvelopeEstimator {
    window: Real,
    envelope_minimum: Real,
}

impl BackgroundEnvelopeEstimator {
    pub fn new(parameters: &BackgroundParameters) -> Self {
        Self {
            window: parameters.window,
            envelope_minimum: parameters.envelope_minimum,
        }
    }

    /// Window statistic `reducer` smoothed by a mean window of the same width.
    fn baseline(
        &self,
        intensity: &[Sample],
        timestamps: &[Timestamp],
        reducer: Reducer,
    ) -> ProxyResult<Vec<Sample>> {
        let first_pass = WindowSmoother::new(self.window, reducer)?;
        let second_pass = WindowSmoother::new(self.window, Reducer::Mean)?;
        let reduced = first_pass.smooth(intensity, Some(timestamps))?;
        second_pass.smooth(&reduced, Some(timestamps))
    }

    #[tracing::instrument(skip_all, fields(samples = intensity.len()))]
    pub fn estimate(
        &self,
        intensity: &[Sample],
        timestamps: &[Timestamp],
    ) -> ProxyResult<BackgroundEnvelope> {
        ensure_length("timestamps", intensity.len(), timestamps.len())?;

        let median = self.baseline(intensity, timestamps, Reducer::Median)?;
        let lower = self.baseline(intensity, timestamps, Reducer::Min)?;
        let upper: Vec<Sample> = median
            .iter()
            .zip(&lower)
            .map(|(median, lower)| Some(self.upper_bound((*median)?, (*lower)?)))
            .collect();

        debug!(
            "Background undefined at {} of {} samples",
            upper.iter().filter(|upper| upper.is_none()).count(),
            upper.len()
        );
        Ok(BackgroundEnvelope {
            median,
            lower,
            upper,
        })
    }

    fn upper_bound(&self, median: Real, lower: Real) -> Real {
        let reflected = 2.0 * median - lower;
        if reflected - median < self.envelope_minimum {
            median + self.envelope_minimum
        } else {
            reflected
        }
    }
}
