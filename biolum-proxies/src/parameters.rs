use crate::{ProxyError, ProxyResult};
use biolum_common::Real;
use clap::Args;

pub const DEFAULT_WINDOW: Real = 5.0;
pub const DEFAULT_ENVELOPE_MINIMUM: Real = 1.5e10;
pub const DEFAULT_FLASH_THRESHOLD: Real = 1e11;
pub const DEFAULT_MIN_PEAK_HEIGHT: Real = 0.0;
pub const DEFAULT_WINDOW_PROXIES: Real = 15.0;
pub const DEFAULT_FLOW_RATE: Real = 1.0;
pub const DEFAULT_CAL_FACTOR: Real = 1.0;

#[derive(Debug, Clone, Args)]
pub struct BackgroundParameters {
    /// Width in seconds of the background estimation window
    #[clap(long, default_value_t = DEFAULT_WINDOW)]
    pub window: Real,

    /// Minimum distance between the median background and the upper envelope
    #[clap(long, default_value_t = DEFAULT_ENVELOPE_MINIMUM)]
    pub envelope_minimum: Real,
}

impl Default for BackgroundParameters {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            envelope_minimum: DEFAULT_ENVELOPE_MINIMUM,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct FlashParameters {
    /// Height above the median background separating low and high intensity flashes
    #[clap(long, default_value_t = DEFAULT_FLASH_THRESHOLD)]
    pub flash_threshold: Real,

    /// Minimum intensity of a local maximum for it to be considered
    #[clap(long, default_value_t = DEFAULT_MIN_PEAK_HEIGHT)]
    pub min_peak_height: Real,
}

impl Default for FlashParameters {
    fn default() -> Self {
        Self {
            flash_threshold: DEFAULT_FLASH_THRESHOLD,
            min_peak_height: DEFAULT_MIN_PEAK_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ProxyParameters {
    /// Width in seconds of the window used for the zooplankton proxies
    #[clap(long, default_value_t = DEFAULT_WINDOW_PROXIES)]
    pub window_proxies: Real,

    /// Flow rate assumed when the record carries no flow series
    #[clap(long, default_value_t = DEFAULT_FLOW_RATE)]
    pub default_flow_rate: Real,
}

impl Default for ProxyParameters {
    fn default() -> Self {
        Self {
            window_proxies: DEFAULT_WINDOW_PROXIES,
            default_flow_rate: DEFAULT_FLOW_RATE,
        }
    }
}

#[derive(Default, Debug, Clone, Args)]
pub struct PipelineParameters {
    #[command(flatten)]
    pub background: BackgroundParameters,

    #[command(flatten)]
    pub flash: FlashParameters,

    #[command(flatten)]
    pub proxies: ProxyParameters,
}

impl PipelineParameters {
    pub fn validate(&self) -> ProxyResult<()> {
        positive("window", self.background.window)?;
        non_negative("envelope_minimum", self.background.envelope_minimum)?;
        finite("flash_threshold", self.flash.flash_threshold)?;
        finite("min_peak_height", self.flash.min_peak_height)?;
        positive("window_proxies", self.proxies.window_proxies)?;
        positive("default_flow_rate", self.proxies.default_flow_rate)
    }
}

/// Constants of the fluorescence unmixing.
///
/// `ratio_adinos` converts background bioluminescence into fluorescence
/// units. It depends on the dataset, so there is no default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnmixParameters {
    ratio_adinos: Real,
    cal_factor: Real,
}

impl UnmixParameters {
    pub fn new(ratio_adinos: Real, cal_factor: Real) -> ProxyResult<Self> {
        positive("ratio_adinos", ratio_adinos)?;
        finite("cal_factor", cal_factor)?;
        if cal_factor == 0.0 {
            return Err(ProxyError::InvalidParameter {
                name: "cal_factor",
                value: cal_factor,
            });
        }
        Ok(Self {
            ratio_adinos,
            cal_factor,
        })
    }

    pub fn uncalibrated(ratio_adinos: Real) -> ProxyResult<Self> {
        Self::new(ratio_adinos, DEFAULT_CAL_FACTOR)
    }

    pub fn ratio_adinos(&self) -> Real {
        self.ratio_adinos
    }

    pub fn cal_factor(&self) -> Real {
        self.cal_factor
    }
}

#[derive(Debug, Clone, Args)]
pub struct UnmixArgs {
    /// Ratio converting background bioluminescence to fluorescence units,
    /// required to unmix a fluorescence series
    #[clap(long)]
    pub ratio_adinos: Option<Real>,

    /// Calibration factor dividing the unmixed proxies
    #[clap(long, default_value_t = DEFAULT_CAL_FACTOR)]
    pub cal_factor: Real,
}

impl UnmixArgs {
    /// `None` when no ratio was supplied.
    pub fn parameters(&self) -> Option<ProxyResult<UnmixParameters>> {
        self.ratio_adinos
            .map(|ratio_adinos| UnmixParameters::new(ratio_adinos, self.cal_factor))
    }
}

fn finite(name: &'static str, value: Real) -> ProxyResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ProxyError::InvalidParameter { name, value })
    }
}

fn non_negative(name: &'static str, value: Real) -> ProxyResult<()> {
    finite(name, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ProxyError::InvalidParameter { name, value })
    }
}

fn positive(name: &'static str, value: Real) -> ProxyResult<()> {
    finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ProxyError::InvalidParameter { name, value })
    }
}
