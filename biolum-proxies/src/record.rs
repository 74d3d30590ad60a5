use crate::{
    ProxyError, ProxyResult,
    error::ensure_length,
    sampling::{SamplingReport, ensure_increasing},
};
use biolum_common::{Real, Sample, Timestamp};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Bioluminescence intensity with the series sampled alongside it.
///
/// In JSON a missing sample is `null`. `flow` and `fluorescence` may be
/// omitted entirely.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BioluminescenceRecord {
    /// Seconds, strictly increasing.
    pub time: Vec<Timestamp>,
    /// Photons per second.
    pub intensity: Vec<Sample>,
    /// Volume of water sampled per second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<Vec<Sample>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fluorescence: Option<Vec<Sample>>,
}

impl BioluminescenceRecord {
    pub fn new(time: Vec<Timestamp>, intensity: Vec<Sample>) -> ProxyResult<Self> {
        let record = Self {
            time,
            intensity,
            ..Default::default()
        };
        record.validate()?;
        Ok(record)
    }

    pub fn with_flow(self, flow: Vec<Sample>) -> ProxyResult<Self> {
        ensure_length("flow", self.len(), flow.len())?;
        Ok(Self {
            flow: Some(flow),
            ..self
        })
    }

    pub fn with_fluorescence(self, fluorescence: Vec<Sample>) -> ProxyResult<Self> {
        ensure_length("fluorescence", self.len(), fluorescence.len())?;
        Ok(Self {
            fluorescence: Some(fluorescence),
            ..self
        })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Checks the structural invariants of the record. Records built from
    /// deserialized JSON should be validated before use.
    pub fn validate(&self) -> ProxyResult<()> {
        if self.time.is_empty() {
            return Err(ProxyError::MissingSeries("time"));
        }
        if self.intensity.is_empty() {
            return Err(ProxyError::MissingSeries("intensity"));
        }
        ensure_length("intensity", self.len(), self.intensity.len())?;
        if let Some(flow) = &self.flow {
            ensure_length("flow", self.len(), flow.len())?;
        }
        if let Some(fluorescence) = &self.fluorescence {
            ensure_length("fluorescence", self.len(), fluorescence.len())?;
        }
        if let Some(index) = self.time.iter().position(|t| !t.is_finite()) {
            return Err(ProxyError::NonFiniteTimestamp(index));
        }
        ensure_increasing(&self.time)
    }

    /// The flow series, or `default_rate` at every sample if there is none.
    pub fn flow_or(&self, default_rate: Real) -> Cow<'_, [Sample]> {
        match &self.flow {
            Some(flow) => Cow::Borrowed(flow),
            None => Cow::Owned(vec![Some(default_rate); self.len()]),
        }
    }

    pub fn sampling(&self) -> Option<SamplingReport> {
        SamplingReport::from_timestamps(&self.time)
    }
}
