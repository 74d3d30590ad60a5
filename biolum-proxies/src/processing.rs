use crate::{
    ProxyError, ProxyResult,
    background::{BackgroundEnvelope, BackgroundEnvelopeEstimator},
    flash::{FlashClass, FlashClassifier, FlashSet, LocalMaxima, PeakFinder},
    parameters::{PipelineParameters, UnmixParameters},
    proxies::{ProxyAggregator, ProxySeries},
    record::BioluminescenceRecord,
    unmix::{PhytoplanktonSeries, unmix},
};
use biolum_common::NOMINAL_SAMPLE_RATE_HZ;
use serde::Serialize;
use tracing::info;

/// Everything derived from one bioluminescence record.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub background: BackgroundEnvelope,
    pub flashes: FlashSet,
    pub proxies: ProxySeries,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phytoplankton: Option<PhytoplanktonSeries>,
}

pub struct Pipeline<P: PeakFinder = LocalMaxima> {
    estimator: BackgroundEnvelopeEstimator,
    classifier: FlashClassifier<P>,
    aggregator: ProxyAggregator,
}

impl Pipeline<LocalMaxima> {
    pub fn new(parameters: &PipelineParameters) -> ProxyResult<Self> {
        Self::with_finder(LocalMaxima, parameters)
    }
}

impl<P: PeakFinder> Pipeline<P> {
    pub fn with_finder(finder: P, parameters: &PipelineParameters) -> ProxyResult<Self> {
        parameters.validate()?;
        Ok(Self {
            estimator: BackgroundEnvelopeEstimator::new(&parameters.background),
            classifier: FlashClassifier::with_finder(finder, &parameters.flash),
            aggregator: ProxyAggregator::new(&parameters.proxies),
        })
    }

    /// Background, flashes and 1 Hz proxies of `record`.
    #[tracing::instrument(skip_all, fields(samples = record.len()))]
    pub fn zooplankton(&self, record: &BioluminescenceRecord) -> ProxyResult<PipelineOutput> {
        record.validate()?;
        if let Some(report) = record.sampling() {
            report.check_regular("time");
            report.check_rate("intensity", NOMINAL_SAMPLE_RATE_HZ);
        }

        let background = self.estimator.estimate(&record.intensity, &record.time)?;
        let flashes =
            self.classifier
                .classify(&record.intensity, &background.median, &background.upper)?;
        let proxies = self.aggregator.aggregate(record, &flashes, &background)?;

        info!(
            "{} samples: {} low and {} high intensity flashes, {} proxy steps",
            record.len(),
            flashes.count(FlashClass::LowIntensity),
            flashes.count(FlashClass::HighIntensity),
            proxies.len()
        );
        Ok(PipelineOutput {
            background,
            flashes,
            proxies,
            phytoplankton: None,
        })
    }

    /// Runs [Self::zooplankton] then unmixes the record's fluorescence
    /// against the median background just computed.
    pub fn run(
        &self,
        record: &BioluminescenceRecord,
        unmix_parameters: Option<&UnmixParameters>,
    ) -> ProxyResult<PipelineOutput> {
        let mut output = self.zooplankton(record)?;
        if let Some(parameters) = unmix_parameters {
            output.phytoplankton = Some(phytoplankton(record, &output.background, parameters)?);
        }
        Ok(output)
    }
}

/// Unmixes the fluorescence of `record` using the median background of the
/// same record as the dinoflagellate signal.
pub fn phytoplankton(
    record: &BioluminescenceRecord,
    background: &BackgroundEnvelope,
    parameters: &UnmixParameters,
) -> ProxyResult<PhytoplanktonSeries> {
    let fluorescence = record
        .fluorescence
        .as_deref()
        .filter(|fluorescence| !fluorescence.is_empty())
        .ok_or(ProxyError::MissingSeries("fluorescence"))?;
    unmix(fluorescence, &background.median, parameters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use biolum_common::{Real, Sample, Timestamp};

    fn flat_record(seconds: usize) -> BioluminescenceRecord {
        let n = seconds * 60;
        let time: Vec<Timestamp> = (0..n).map(|i| i as Real / 60.0).collect();
        BioluminescenceRecord::new(time, vec![Some(1e10); n]).unwrap()
    }

    #[test]
    fn invalid_parameters() {
        let mut parameters = PipelineParameters::default();
        parameters.proxies.window_proxies = -1.0;
        assert!(Pipeline::new(&parameters).is_err());
    }

    #[test]
    fn flat_record_has_no_flashes() {
        let record = flat_record(20);
        let output = Pipeline::new(&PipelineParameters::default())
            .unwrap()
            .zooplankton(&record)
            .unwrap();
        assert_eq!(output.flashes.count(FlashClass::NoFlash), record.len());
        assert_eq!(output.proxies.time.first(), Some(&0));
        assert_eq!(output.proxies.time.last(), Some(&19));
        assert!(output.proxies.copepod.iter().all(|c| *c == Some(0.0)));
        assert_eq!(output.phytoplankton, None);
    }

    #[test]
    fn unmixing_requires_fluorescence() {
        let record = flat_record(10);
        let pipeline = Pipeline::new(&PipelineParameters::default()).unwrap();
        let parameters = UnmixParameters::uncalibrated(1e9).unwrap();
        assert_eq!(
            pipeline.run(&record, Some(&parameters)),
            Err(ProxyError::MissingSeries("fluorescence"))
        );
    }

    #[test]
    fn unmixing_uses_median_background() {
        let record = flat_record(10)
            .with_fluorescence(vec![Some(4.0); 600])
            .unwrap();
        let pipeline = Pipeline::new(&PipelineParameters::default()).unwrap();
        let parameters = UnmixParameters::uncalibrated(1e9).unwrap();
        let output = pipeline.run(&record, Some(&parameters)).unwrap();
        let phytoplankton = output.phytoplankton.unwrap();
        assert_eq!(phytoplankton.len(), 600);
        // median background is 1e10, i.e. 10 fluorescence units of dinoflagellates
        let middle: Vec<Sample> = phytoplankton.hdinos[290..310].to_vec();
        for hdinos in middle {
            assert!((hdinos.unwrap() - 6.0).abs() < 1e-6);
        }
    }
}
