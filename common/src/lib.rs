pub mod tracer;

/// Scalar type used for every intensity, flow and time value.
pub type Real = f64;

/// A single value of a series, `None` where the instrument recorded nothing.
pub type Sample = Option<Real>;

/// Seconds since an arbitrary epoch chosen by the caller.
pub type Timestamp = Real;

/// Nominal acquisition rate of the bioluminescence sensor.
pub const NOMINAL_SAMPLE_RATE_HZ: Real = 60.0;

/// Relative deviation tolerated before a sampling warning is raised.
pub const SAMPLING_TOLERANCE: Real = 0.01;

pub use tracer::{TracerEngine, TracerOptions};
