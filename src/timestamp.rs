/// Sensor clock ticks per millisecond. Timestamps are in 100 ns units.
const TICKS_TO_MILLISECONDS: f64 = 1e-4;

/// Finds the candidate closest in time to `query`.
///
/// The candidates don't need to be sorted. Ties resolve to the lowest index.
///
/// # Returns
///
/// * The index of the closest candidate, `None` only if there're no candidates.
pub fn match_timestamp(query: u64, candidates: &[u64]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .min_by_key(|(_, candidate)| candidate.abs_diff(query))
        .map(|(index, _)| index)
}

/// Average frame rate of a stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameRate {
    /// Mean time between consecutive frames, in milliseconds.
    pub mean_delta_ms: f64,
    pub fps: f64,
}

impl FrameRate {
    /// Computes the frame rate from the stream's timestamps, in recording order.
    /// Returns `None` if there're less than 2 timestamps.
    pub fn from_timestamps(timestamps: &[u64]) -> Option<Self> {
        if timestamps.len() < 2 {
            return None;
        }
        let total: f64 = timestamps
            .windows(2)
            .map(|pair| pair[1] as f64 - pair[0] as f64)
            .sum();
        let mean_delta_ms = total / (timestamps.len() - 1) as f64 * TICKS_TO_MILLISECONDS;
        Some(Self {
            mean_delta_ms,
            fps: 1.0 / (mean_delta_ms * 1e-3),
        })
    }
}

impl std::fmt::Display for FrameRate {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:.3} ms ({:.2} fps)", self.mean_delta_ms, self.fps)
    }
}
