use biolum_common::Real;

/// Locates local maxima in a series without missing values.
pub trait PeakFinder: Send + Sync {
    /// Returns the indices into `values` of local maxima at least `min_height`
    /// high, in increasing order. A series without peaks yields an empty vector.
    fn find_peaks(&self, values: &[Real], min_height: Real) -> Vec<usize>;
}

/// Local maxima by comparison with the neighbouring samples.
///
/// A flat-topped maximum is reported once, at the middle of its plateau
/// (rounded down). The first and last samples are never peaks.
#[derive(Default, Clone, Copy, Debug)]
pub struct LocalMaxima;

impl PeakFinder for LocalMaxima {
    fn find_peaks(&self, values: &[Real], min_height: Real) -> Vec<usize> {
        let mut peaks = Vec::new();
        let Some(last) = values.len().checked_sub(1) else {
            return peaks;
        };
        let mut i = 1;
        while i < last {
            if values[i - 1] < values[i] {
                let mut ahead = i + 1;
                while ahead < last && values[ahead] == values[i] {
                    ahead += 1;
                }
                if values[ahead] < values[i] {
                    let peak = (i + ahead - 1) / 2;
                    if values[peak] >= min_height {
                        peaks.push(peak);
                    }
                    i = ahead;
                }
            }
            i += 1;
        }
        peaks
    }
}
