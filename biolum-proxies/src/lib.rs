//! This crate derives plankton proxies from a bioluminescence record
//! sampled at 60 Hz, and optionally a fluorescence series sampled alongside.
//!
//! Typical usage may look like:
//! ```ignore
//! let record = BioluminescenceRecord::new(time, intensity)?.with_flow(flow)?;
//! let output = Pipeline::new(&PipelineParameters::default())?.zooplankton(&record)?;
//! // output.background   median background and envelope, per sample
//! // output.flashes      low/high intensity flash per sample
//! // output.proxies      dinoflagellate, larvacean, copepod and jelly proxies at 1 Hz
//! ```
//! The stages are usable on their own: [window::smooth],
//! [background::BackgroundEnvelopeEstimator], [flash::FlashClassifier],
//! [proxies::ProxyAggregator] and [unmix::unmix].

pub mod background;
pub mod error;
pub mod flash;
pub mod parameters;
pub mod processing;
pub mod proxies;
pub mod record;
pub mod sampling;
#[cfg(test)]
mod testing;
pub mod unmix;
pub mod window;

pub use error::{ProxyError, ProxyResult};
pub use processing::{Pipeline, PipelineOutput};
pub use record::BioluminescenceRecord;
