//! Detection and classification of bioluminescence flashes.
//!
//! A flash is a local maximum of the intensity lying strictly above the upper
//! envelope. Its height above the median background decides whether it is
//! counted as a low or a high intensity flash.
pub mod peak_finder;

use crate::{ProxyResult, error::ensure_length, parameters::FlashParameters};
use biolum_common::{Real, Sample};
use serde::Serialize;
use tracing::debug;

pub use peak_finder::{LocalMaxima, PeakFinder};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlashClass {
    #[default]
    NoFlash,
    LowIntensity,
    HighIntensity,
}

impl FlashClass {
    pub fn is_flash(&self) -> bool {
        !matches!(self, FlashClass::NoFlash)
    }
}

/// One [FlashClass] per sample of the bioluminescence series.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FlashSet {
    classes: Vec<FlashClass>,
}

impl FlashSet {
    pub fn classes(&self) -> &[FlashClass] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn low_intensity(&self) -> impl Iterator<Item = bool> + '_ {
        self.classes
            .iter()
            .map(|class| *class == FlashClass::LowIntensity)
    }

    pub fn high_intensity(&self) -> impl Iterator<Item = bool> + '_ {
        self.classes
            .iter()
            .map(|class| *class == FlashClass::HighIntensity)
    }

    pub fn count(&self, class: FlashClass) -> usize {
        self.classes.iter().filter(|c| **c == class).count()
    }
}

impl From<Vec<FlashClass>> for FlashSet {
    fn from(classes: Vec<FlashClass>) -> Self {
        Self { classes }
    }
}

#[derive(Clone, Debug)]
pub struct FlashClassifier<P: PeakFinder = LocalMaxima> {
    finder: P,
    min_peak_height: Real,
    flash_threshold: Real,
}

impl FlashClassifier<LocalMaxima> {
    pub fn new(parameters: &FlashParameters) -> Self {
        Self::with_finder(LocalMaxima, parameters)
    }
}

impl<P: PeakFinder> FlashClassifier<P> {
    pub fn with_finder(finder: P, parameters: &FlashParameters) -> Self {
        Self {
            finder,
            min_peak_height: parameters.min_peak_height,
            flash_threshold: parameters.flash_threshold,
        }
    }

    /// Class of a detected peak of height `value`, given the background at
    /// the same position.
    fn classify_peak(&self, value: Real, median: Sample, upper: Sample) -> FlashClass {
        match median.zip(upper) {
            Some((median, upper)) if value > upper => {
                if value - median <= self.flash_threshold {
                    FlashClass::LowIntensity
                } else {
                    FlashClass::HighIntensity
                }
            }
            _ => FlashClass::NoFlash,
        }
    }

    /// Classifies every sample of `intensity`.
    ///
    /// Peaks are searched for among the non-missing samples only, as if the
    /// missing ones had been removed from the series.
    #[tracing::instrument(skip_all, fields(samples = intensity.len()))]
    pub fn classify(
        &self,
        intensity: &[Sample],
        median: &[Sample],
        upper: &[Sample],
    ) -> ProxyResult<FlashSet> {
        ensure_length("median background", intensity.len(), median.len())?;
        ensure_length("upper envelope", intensity.len(), upper.len())?;

        let (positions, values): (Vec<usize>, Vec<Real>) = intensity
            .iter()
            .enumerate()
            .filter_map(|(i, value)| value.map(|value| (i, value)))
            .unzip();

        let peaks = self.finder.find_peaks(&values, self.min_peak_height);
        debug!("{} candidate peaks", peaks.len());

        let mut classes = vec![FlashClass::NoFlash; intensity.len()];
        for (position, value) in peaks
            .into_iter()
            .filter_map(|peak| positions.get(peak).zip(values.get(peak)))
        {
            if let Some(class) = classes.get_mut(*position) {
                *class = self.classify_peak(
                    *value,
                    median.get(*position).copied().flatten(),
                    upper.get(*position).copied().flatten(),
                );
            }
        }
        Ok(FlashSet { classes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProxyError;

    fn classifier(flash_threshold: Real) -> FlashClassifier {
        FlashClassifier::new(&FlashParameters {
            flash_threshold,
            min_peak_height: 0.0,
        })
    }

    fn samples(values: &[Real]) -> Vec<Sample> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn peaks_above_envelope() {
        let intensity = samples(&[1.0, 5.0, 1.0, 3.0, 1.0, 20.0, 1.0, 4.0, 1.0]);
        let median = vec![Some(1.0); 9];
        let upper = vec![Some(4.0); 9];
        let flashes = classifier(10.0)
            .classify(&intensity, &median, &upper)
            .unwrap();
        assert_eq!(
            flashes.classes(),
            &[
                FlashClass::NoFlash,
                FlashClass::LowIntensity,
                FlashClass::NoFlash,
                FlashClass::NoFlash,
                FlashClass::NoFlash,
                FlashClass::HighIntensity,
                FlashClass::NoFlash,
                // touching the envelope is not enough
                FlashClass::NoFlash,
                FlashClass::NoFlash,
            ]
        );
        assert_eq!(flashes.count(FlashClass::LowIntensity), 1);
        assert_eq!(flashes.count(FlashClass::HighIntensity), 1);
    }

    #[test]
    fn threshold_tie_is_low_intensity() {
        let intensity = samples(&[0.0, 12.0, 0.0, 12.5, 0.0]);
        let median = vec![Some(2.0); 5];
        let upper = vec![Some(3.0); 5];
        let flashes = classifier(10.0)
            .classify(&intensity, &median, &upper)
            .unwrap();
        assert_eq!(flashes.classes()[1], FlashClass::LowIntensity);
        assert_eq!(flashes.classes()[3], FlashClass::HighIntensity);
    }

    #[test]
    fn missing_samples_are_skipped() {
        // With the gap removed, index 3 is a peak between 2.0 and 1.0.
        let intensity = vec![Some(1.0), Some(2.0), None, Some(9.0), Some(1.0)];
        let median = vec![Some(1.0); 5];
        let upper = vec![Some(3.0), Some(3.0), None, Some(3.0), Some(3.0)];
        let flashes = classifier(100.0)
            .classify(&intensity, &median, &upper)
            .unwrap();
        let low: Vec<bool> = flashes.low_intensity().collect();
        assert_eq!(low, vec![false, false, false, true, false]);
        assert!(flashes.high_intensity().all(|high| !high));
    }

    #[test]
    fn missing_envelope_is_not_a_flash() {
        let intensity = samples(&[0.0, 10.0, 0.0]);
        let flashes = classifier(1.0)
            .classify(&intensity, &[None; 3], &[None; 3])
            .unwrap();
        assert_eq!(flashes.count(FlashClass::NoFlash), 3);
    }

    #[test]
    fn min_peak_height_filters_peaks() {
        let intensity = samples(&[0.0, 10.0, 0.0, 20.0, 0.0]);
        let median = vec![Some(0.0); 5];
        let upper = vec![Some(1.0); 5];
        let flashes = FlashClassifier::new(&FlashParameters {
            flash_threshold: 100.0,
            min_peak_height: 15.0,
        })
        .classify(&intensity, &median, &upper)
        .unwrap();
        assert!(!flashes.classes()[1].is_flash());
        assert!(flashes.classes()[3].is_flash());
    }

    #[derive(Default)]
    struct EveryOther;

    impl PeakFinder for EveryOther {
        fn find_peaks(&self, values: &[Real], _min_height: Real) -> Vec<usize> {
            (0..values.len()).step_by(2).collect()
        }
    }

    #[test]
    fn custom_finder() {
        let intensity = samples(&[5.0, 5.0, 5.0, 5.0]);
        let median = vec![Some(0.0); 4];
        let upper = vec![Some(1.0); 4];
        let flashes = FlashClassifier::with_finder(EveryOther, &FlashParameters::default())
            .classify(&intensity, &median, &upper)
            .unwrap();
        assert_eq!(flashes.count(FlashClass::LowIntensity), 2);
        assert!(flashes.classes()[0].is_flash());
        assert!(!flashes.classes()[1].is_flash());
    }

    #[test]
    fn mismatched_lengths() {
        let intensity = samples(&[0.0, 10.0, 0.0]);
        assert_eq!(
            classifier(1.0).classify(&intensity, &[None; 2], &[None; 3]),
            Err(ProxyError::LengthMismatch {
                name: "median background",
                expected: 3,
                found: 2
            })
        );
    }
}
