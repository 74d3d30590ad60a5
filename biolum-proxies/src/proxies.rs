//! Aggregation of the 60 Hz classification into 1 Hz zooplankton and
//! dinoflagellate proxies.
//!
//! The dinoflagellate proxy averages over each whole second. The other three
//! proxies use a centred window of `window_proxies` seconds around each step.
use crate::{
    ProxyResult,
    background::BackgroundEnvelope,
    error::ensure_length,
    flash::{FlashClass, FlashSet},
    parameters::ProxyParameters,
    record::BioluminescenceRecord,
};
use biolum_common::{NOMINAL_SAMPLE_RATE_HZ, Real, Sample, Timestamp};
use itertools::multiunzip;
use rayon::prelude::*;
use serde::Serialize;
use std::ops::Range;
use tracing::debug;

/// Proxies on a grid of whole seconds.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProxySeries {
    pub time: Vec<i64>,
    /// Minimum background per unit flow.
    pub dinoflagellate: Vec<Sample>,
    /// Low intensity flashes per unit volume sampled.
    pub larvacean: Vec<Sample>,
    /// High intensity flashes per unit volume sampled.
    pub copepod: Vec<Sample>,
    /// Largest height above the median background.
    pub jelly: Vec<Sample>,
}

impl ProxySeries {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq)]
struct ProxyStep {
    dinoflagellate: Sample,
    larvacean: Sample,
    copepod: Sample,
    jelly: Sample,
}

/// Borrowed view of the aligned 60 Hz series.
struct Aligned<'a> {
    time: &'a [Timestamp],
    intensity: &'a [Sample],
    flashes: &'a [FlashClass],
    median: &'a [Sample],
    lower: &'a [Sample],
    flow: &'a [Sample],
}

impl Aligned<'_> {
    /// Indices of the samples with `start <= t < end`, or `start <= t <= end`
    /// if `inclusive`.
    fn span(&self, start: Real, end: Real, inclusive: bool) -> Range<usize> {
        let lo = self.time.partition_point(|t| *t < start);
        let hi = if inclusive {
            self.time.partition_point(|t| *t <= end)
        } else {
            self.time.partition_point(|t| *t < end)
        };
        lo..hi.max(lo)
    }

    /// Flow at `i`, skipping missing and non-positive readings.
    fn positive_flow(&self, i: usize) -> Option<Real> {
        self.flow
            .get(i)
            .copied()
            .flatten()
            .filter(|flow| *flow > 0.0)
    }

    fn dinoflagellate(&self, second: Range<usize>) -> Sample {
        mean(second.filter_map(|i| {
            let lower = self.lower.get(i).copied().flatten()?;
            Some(lower / self.positive_flow(i)?)
        }))
    }

    fn windowed(&self, window: Range<usize>) -> (Sample, Sample, Sample) {
        if window.is_empty() {
            return (None, None, None);
        }
        let samples = window.len() as Real;
        let volume_sampled = mean(window.clone().filter_map(|i| self.positive_flow(i)))
            .map(|flow| flow * samples / NOMINAL_SAMPLE_RATE_HZ)
            .filter(|volume| *volume > 0.0);

        let flashes = self.flashes.get(window.clone()).unwrap_or_default();
        let per_volume = |class: FlashClass| {
            let count = flashes.iter().filter(|c| **c == class).count() as Real;
            volume_sampled.map(|volume| count / volume)
        };

        let jelly = window
            .filter_map(|i| {
                Some(self.intensity.get(i).copied().flatten()? - self.median.get(i).copied().flatten()?)
            })
            .reduce(Real::max);

        (
            per_volume(FlashClass::LowIntensity),
            per_volume(FlashClass::HighIntensity),
            jelly,
        )
    }
}

fn mean(values: impl Iterator<Item = Real>) -> Sample {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as Real)
}

#[derive(Clone, Debug)]
pub struct ProxyAggregator {
    window_proxies: Real,
    default_flow_rate: Real,
}

impl ProxyAggregator {
    pub fn new(parameters: &ProxyParameters) -> Self {
        Self {
            window_proxies: parameters.window_proxies,
            default_flow_rate: parameters.default_flow_rate,
        }
    }

    /// Builds the 1 Hz proxies from `floor` of the first timestamp to `floor`
    /// of the last, inclusive.
    #[tracing::instrument(skip_all, fields(samples = record.len()))]
    pub fn aggregate(
        &self,
        record: &BioluminescenceRecord,
        flashes: &FlashSet,
        background: &BackgroundEnvelope,
    ) -> ProxyResult<ProxySeries> {
        ensure_length("intensity", record.len(), record.intensity.len())?;
        ensure_length("flashes", record.len(), flashes.len())?;
        ensure_length("median background", record.len(), background.median.len())?;
        ensure_length("lower background", record.len(), background.lower.len())?;

        let flow = record.flow_or(self.default_flow_rate);
        ensure_length("flow", record.len(), flow.len())?;

        let aligned = Aligned {
            time: &record.time,
            intensity: &record.intensity,
            flashes: flashes.classes(),
            median: &background.median,
            lower: &background.lower,
            flow: &flow,
        };

        let grid: Vec<i64> = match record.time.first().zip(record.time.last()) {
            Some((first, last)) => (first.floor() as i64..=last.floor() as i64).collect(),
            None => Vec::new(),
        };
        debug!("Aggregating onto {} one second steps", grid.len());

        let half_window = self.window_proxies / 2.0;
        let steps: Vec<ProxyStep> = grid
            .par_iter()
            .map(|second| {
                let t = *second as Real;
                let dinoflagellate = aligned.dinoflagellate(aligned.span(t, t + 1.0, false));
                let (larvacean, copepod, jelly) =
                    aligned.windowed(aligned.span(t - half_window, t + half_window, true));
                ProxyStep {
                    dinoflagellate,
                    larvacean,
                    copepod,
                    jelly,
                }
            })
            .collect();

        let (dinoflagellate, larvacean, copepod, jelly): (Vec<_>, Vec<_>, Vec<_>, Vec<_>) = multiunzip(
            steps
                .into_iter()
                .map(|step| (step.dinoflagellate, step.larvacean, step.copepod, step.jelly)),
        );
        Ok(ProxySeries {
            time: grid,
            dinoflagellate,
            larvacean,
            copepod,
            jelly,
        })
    }
}
