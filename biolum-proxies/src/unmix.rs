//! Decomposition of fluorescence into dinoflagellate and other phytoplankton
//! contributions, using background bioluminescence as the dinoflagellate
//! signal.
//!
//! Background bioluminescence divided by `ratio_adinos` is the fluorescence
//! dinoflagellates would produce if they were all autotrophic. Whichever of
//! that and the measured fluorescence is smaller is attributed to autotrophic
//! dinoflagellates. The excess of the former is heterotrophic dinoflagellates,
//! the excess of the latter other phytoplankton, so at most one of those two
//! is nonzero.
use crate::{ProxyResult, error::ensure_length, parameters::UnmixParameters};
use biolum_common::{Real, Sample};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FluoBiolumSample {
    pub fluorescence: Real,
    pub background: Real,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PhytoplanktonProxies {
    /// Autotrophic dinoflagellates.
    pub adinos: Real,
    /// Heterotrophic dinoflagellates.
    pub hdinos: Real,
    /// Other phytoplankton.
    pub aother: Real,
}

impl FluoBiolumSample {
    pub fn unmix(&self, parameters: &UnmixParameters) -> PhytoplanktonProxies {
        let fluo_dinos = self.background / parameters.ratio_adinos();
        let adinos = self.fluorescence.min(fluo_dinos);
        let cal_factor = parameters.cal_factor();
        PhytoplanktonProxies {
            adinos: adinos / cal_factor,
            hdinos: (fluo_dinos - adinos) / cal_factor,
            aother: (self.fluorescence - adinos) / cal_factor,
        }
    }
}

/// Unmixed series, aligned with the inputs.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PhytoplanktonSeries {
    pub adinos: Vec<Sample>,
    pub hdinos: Vec<Sample>,
    pub aother: Vec<Sample>,
}

impl PhytoplanktonSeries {
    pub fn len(&self) -> usize {
        self.adinos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adinos.is_empty()
    }
}

/// Unmixes paired fluorescence and background series.
/// A missing value in either input makes all three outputs missing.
#[tracing::instrument(skip_all, fields(samples = fluorescence.len()))]
pub fn unmix(
    fluorescence: &[Sample],
    background: &[Sample],
    parameters: &UnmixParameters,
) -> ProxyResult<PhytoplanktonSeries> {
    ensure_length("background bioluminescence", fluorescence.len(), background.len())?;

    let mut series = PhytoplanktonSeries {
        adinos: Vec::with_capacity(fluorescence.len()),
        hdinos: Vec::with_capacity(fluorescence.len()),
        aother: Vec::with_capacity(fluorescence.len()),
    };
    for (fluorescence, background) in fluorescence.iter().zip(background) {
        let proxies = fluorescence
            .zip(*background)
            .map(|(fluorescence, background)| {
                FluoBiolumSample {
                    fluorescence,
                    background,
                }
                .unmix(parameters)
            });
        series.adinos.push(proxies.map(|p| p.adinos));
        series.hdinos.push(proxies.map(|p| p.hdinos));
        series.aother.push(proxies.map(|p| p.aother));
    }
    Ok(series)
}
