use biolum_common::{NOMINAL_SAMPLE_RATE_HZ, Real, Sample, Timestamp};
use biolum_proxies::{BioluminescenceRecord, ProxyError};
use clap::Args;
use rand::Rng;
use rand_distr::{Bernoulli, BernoulliError, Distribution, Exp, ExpError, Normal, NormalError};
use std::f64::consts::TAU;
use thiserror::Error;
use tracing::debug;

/// Flashes are cut off after this many decay constants.
const FLASH_HORIZON: Real = 10.0;

#[derive(Debug, Error)]
pub(crate) enum SimulationError {
    #[error("Invalid Normal Distribution: {0}")]
    NormalDistribution(#[from] NormalError),
    #[error("Invalid Exponential Distribution: {0}")]
    ExpDistribution(#[from] ExpError),
    #[error("Invalid Probability: {0}")]
    Probability(#[from] BernoulliError),
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: Real },
    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: Real },
    #[error("Invalid Record: {0}")]
    Record(#[from] ProxyError),
}

#[derive(Debug, Clone, Args)]
pub(crate) struct SimulationParameters {
    /// Length of the record in seconds
    #[clap(long, default_value = "600")]
    pub(crate) seconds: Real,

    /// Samples per second
    #[clap(long, default_value_t = NOMINAL_SAMPLE_RATE_HZ)]
    pub(crate) sample_rate: Real,

    /// Timestamp of the first sample
    #[clap(long, default_value = "0")]
    pub(crate) start_time: Timestamp,

    /// Mean level of the background bioluminescence
    #[clap(long, default_value = "2e10")]
    pub(crate) background: Real,

    /// Amplitude of the slow background oscillation, as a fraction of the mean level
    #[clap(long, default_value = "0.3")]
    pub(crate) background_amplitude: Real,

    /// Period in seconds of the slow background oscillation
    #[clap(long, default_value = "900")]
    pub(crate) background_period: Real,

    /// Standard deviation of the Gaussian noise on the intensity
    #[clap(long, default_value = "1e9")]
    pub(crate) noise: Real,

    /// Mean number of flashes per second
    #[clap(long, default_value = "0.2")]
    pub(crate) flash_rate: Real,

    /// Probability that a flash belongs to the high intensity population
    #[clap(long, default_value = "0.2")]
    pub(crate) high_fraction: Real,

    /// Mean height of low intensity flashes
    #[clap(long, default_value = "5e10")]
    pub(crate) low_height: Real,

    /// Mean height of high intensity flashes
    #[clap(long, default_value = "3e11")]
    pub(crate) high_height: Real,

    /// Exponential decay constant of a flash, in seconds
    #[clap(long, default_value = "0.05")]
    pub(crate) flash_decay: Real,

    /// Mean flow rate through the sensor
    #[clap(long, default_value = "0.36")]
    pub(crate) flow: Real,

    /// Standard deviation of the flow rate
    #[clap(long, default_value = "0.01")]
    pub(crate) flow_noise: Real,

    /// Background intensity per unit of dinoflagellate fluorescence
    #[clap(long, default_value = "2e9")]
    pub(crate) fluorescence_ratio: Real,

    /// Fluorescence of the other phytoplankton
    #[clap(long, default_value = "5")]
    pub(crate) other_fluorescence: Real,

    /// Standard deviation of the Gaussian noise on the fluorescence
    #[clap(long, default_value = "0.2")]
    pub(crate) fluorescence_noise: Real,

    /// Probability that any intensity sample is missing
    #[clap(long, default_value = "0")]
    pub(crate) missing: Real,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            seconds: 600.0,
            sample_rate: NOMINAL_SAMPLE_RATE_HZ,
            start_time: 0.0,
            background: 2e10,
            background_amplitude: 0.3,
            background_period: 900.0,
            noise: 1e9,
            flash_rate: 0.2,
            high_fraction: 0.2,
            low_height: 5e10,
            high_height: 3e11,
            flash_decay: 0.05,
            flow: 0.36,
            flow_noise: 0.01,
            fluorescence_ratio: 2e9,
            other_fluorescence: 5.0,
            fluorescence_noise: 0.2,
            missing: 0.0,
        }
    }
}

fn positive(name: &'static str, value: Real) -> Result<Real, SimulationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(SimulationError::NonPositive { name, value })
    }
}

fn non_negative(name: &'static str, value: Real) -> Result<Real, SimulationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(SimulationError::Negative { name, value })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Flash {
    pub(crate) time: Timestamp,
    pub(crate) height: Real,
}

pub(crate) struct Simulation {
    parameters: SimulationParameters,
    intensity_noise: Normal<Real>,
    inter_arrival: Exp<Real>,
    high: Bernoulli,
    low_height: Exp<Real>,
    high_height: Exp<Real>,
    flow: Normal<Real>,
    fluorescence_noise: Normal<Real>,
    missing: Bernoulli,
}

impl Simulation {
    pub(crate) fn new(parameters: &SimulationParameters) -> Result<Self, SimulationError> {
        positive("sample-rate", parameters.sample_rate)?;
        positive("background-period", parameters.background_period)?;
        positive("flash-decay", parameters.flash_decay)?;
        positive("fluorescence-ratio", parameters.fluorescence_ratio)?;
        Ok(Self {
            parameters: parameters.clone(),
            intensity_noise: Normal::new(0.0, non_negative("noise", parameters.noise)?)?,
            inter_arrival: Exp::new(parameters.flash_rate)?,
            high: Bernoulli::new(parameters.high_fraction)?,
            low_height: Exp::new(1.0 / positive("low-height", parameters.low_height)?)?,
            high_height: Exp::new(1.0 / positive("high-height", parameters.high_height)?)?,
            flow: Normal::new(
                parameters.flow,
                non_negative("flow-noise", parameters.flow_noise)?,
            )?,
            fluorescence_noise: Normal::new(
                0.0,
                non_negative("fluorescence-noise", parameters.fluorescence_noise)?,
            )?,
            missing: Bernoulli::new(parameters.missing)?,
        })
    }

    fn sample_count(&self) -> usize {
        (self.parameters.seconds * self.parameters.sample_rate)
            .round()
            .max(0.0) as usize
    }

    pub(crate) fn timestamps(&self) -> Vec<Timestamp> {
        let SimulationParameters {
            start_time,
            sample_rate,
            ..
        } = self.parameters;
        (0..self.sample_count())
            .map(|i| start_time + i as Real / sample_rate)
            .collect()
    }

    /// Background level at time `t`, before noise.
    pub(crate) fn background(&self, t: Timestamp) -> Real {
        let phase = TAU * (t - self.parameters.start_time) / self.parameters.background_period;
        self.parameters.background * (1.0 + self.parameters.background_amplitude * phase.sin())
    }

    /// Flash onsets as a Poisson process over the record, in time order.
    pub(crate) fn flashes<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Flash> {
        let end = self.parameters.start_time + self.parameters.seconds;
        let mut flashes = Vec::new();
        let mut time = self.parameters.start_time + self.inter_arrival.sample(rng);
        while time < end {
            let height = if self.high.sample(rng) {
                self.high_height.sample(rng)
            } else {
                self.low_height.sample(rng)
            };
            flashes.push(Flash { time, height });
            time += self.inter_arrival.sample(rng);
        }
        flashes
    }

    /// Sum of the decaying flashes still lit at time `t`.
    fn flash_intensity(&self, flashes: &[Flash], t: Timestamp) -> Real {
        let decay = self.parameters.flash_decay;
        let first = flashes.partition_point(|flash| flash.time < t - FLASH_HORIZON * decay);
        let last = flashes.partition_point(|flash| flash.time <= t);
        flashes
            .get(first..last)
            .unwrap_or_default()
            .iter()
            .map(|flash| flash.height * (-(t - flash.time) / decay).exp())
            .sum()
    }

    pub(crate) fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<BioluminescenceRecord, SimulationError> {
        let time = self.timestamps();
        let flashes = self.flashes(rng);
        debug!("{} flashes over {} samples", flashes.len(), time.len());

        let intensity: Vec<Sample> = time
            .iter()
            .map(|&t| {
                let value = self.background(t)
                    + self.intensity_noise.sample(rng)
                    + self.flash_intensity(&flashes, t);
                (!self.missing.sample(rng)).then_some(value.max(0.0))
            })
            .collect();
        let flow: Vec<Sample> = time
            .iter()
            .map(|_| Some(self.flow.sample(rng).max(0.0)))
            .collect();
        let fluorescence: Vec<Sample> = time
            .iter()
            .map(|&t| {
                Some(
                    self.background(t) / self.parameters.fluorescence_ratio
                        + self.parameters.other_fluorescence
                        + self.fluorescence_noise.sample(rng),
                )
            })
            .collect();

        Ok(BioluminescenceRecord::new(time, intensity)?
            .with_flow(flow)?
            .with_fluorescence(fluorescence)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::{SeedableRng, rngs::StdRng};

    fn quiet() -> SimulationParameters {
        SimulationParameters {
            seconds: 60.0,
            noise: 0.0,
            flow_noise: 0.0,
            fluorescence_noise: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn record_shape() {
        let simulation = Simulation::new(&quiet()).unwrap();
        let record = simulation
            .generate(&mut StdRng::seed_from_u64(1))
            .unwrap();
        assert_eq!(record.len(), 3600);
        assert_eq!(record.flow.as_ref().map(Vec::len), Some(3600));
        assert_eq!(record.fluorescence.as_ref().map(Vec::len), Some(3600));
        assert_approx_eq!(record.time[60], 1.0);
        assert!(record.validate().is_ok());
        assert!(record.intensity.iter().all(Option::is_some));
    }

    #[test]
    fn seeded_runs_repeat() {
        let simulation = Simulation::new(&SimulationParameters::default()).unwrap();
        let first = simulation.generate(&mut StdRng::seed_from_u64(7)).unwrap();
        let second = simulation.generate(&mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn flashes_are_ordered_and_inside_the_record() {
        let parameters = SimulationParameters {
            flash_rate: 2.0,
            ..quiet()
        };
        let simulation = Simulation::new(&parameters).unwrap();
        let flashes = simulation.flashes(&mut StdRng::seed_from_u64(3));
        assert!(!flashes.is_empty());
        assert!(flashes.windows(2).all(|w| w[0].time <= w[1].time));
        assert!(flashes.iter().all(|f| (0.0..60.0).contains(&f.time)));
        assert!(flashes.iter().all(|f| f.height >= 0.0));
    }

    #[test]
    fn no_flashes_leaves_the_background() {
        let parameters = SimulationParameters {
            flash_rate: 0.0,
            ..quiet()
        };
        let simulation = Simulation::new(&parameters).unwrap();
        let record = simulation
            .generate(&mut StdRng::seed_from_u64(5))
            .unwrap();
        for (t, value) in record.time.iter().zip(&record.intensity) {
            assert_approx_eq!(value.unwrap(), simulation.background(*t), 1.0);
        }
        let fluorescence = record.fluorescence.unwrap();
        assert_approx_eq!(fluorescence[0].unwrap(), 2e10 / 2e9 + 5.0);
    }

    #[test]
    fn flash_decays_exponentially() {
        let simulation = Simulation::new(&quiet()).unwrap();
        let flashes = [Flash {
            time: 1.0,
            height: 1e11,
        }];
        assert_eq!(simulation.flash_intensity(&flashes, 0.99), 0.0);
        assert_approx_eq!(simulation.flash_intensity(&flashes, 1.0), 1e11, 1.0);
        assert_approx_eq!(
            simulation.flash_intensity(&flashes, 1.05),
            1e11 * (-1.0f64).exp(),
            1.0
        );
        assert_eq!(simulation.flash_intensity(&flashes, 2.0), 0.0);
    }

    #[test]
    fn missing_samples() {
        let parameters = SimulationParameters {
            missing: 1.0,
            ..quiet()
        };
        let record = Simulation::new(&parameters)
            .unwrap()
            .generate(&mut StdRng::seed_from_u64(9))
            .unwrap();
        assert!(record.intensity.iter().all(Option::is_none));
    }

    #[test]
    fn invalid_parameters() {
        for parameters in [
            SimulationParameters {
                sample_rate: 0.0,
                ..Default::default()
            },
            SimulationParameters {
                noise: -1.0,
                ..Default::default()
            },
            SimulationParameters {
                flow_noise: -0.01,
                ..Default::default()
            },
            SimulationParameters {
                fluorescence_noise: -0.2,
                ..Default::default()
            },
            SimulationParameters {
                high_fraction: 1.5,
                ..Default::default()
            },
            SimulationParameters {
                flash_decay: 0.0,
                ..Default::default()
            },
        ] {
            assert!(Simulation::new(&parameters).is_err());
        }
    }

    #[test]
    fn negative_noise_is_rejected() {
        let parameters = SimulationParameters {
            noise: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            Simulation::new(&parameters),
            Err(SimulationError::Negative { name: "noise", .. })
        ));
        let parameters = SimulationParameters {
            noise: 0.0,
            flow_noise: 0.0,
            fluorescence_noise: 0.0,
            ..Default::default()
        };
        assert!(Simulation::new(&parameters).is_ok());
    }
}
