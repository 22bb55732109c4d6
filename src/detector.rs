// SmartWake - Sleep Phase Detector
//
// Decides whether the recorded activity history shows a single transient
// peak that has just passed: the middle third of the history holds more
// spikes than the history as a whole and than the third before it, and at
// least as many as the most recent third.

use crate::error::WakeError;
use crate::events::Sample;
use crate::fastmath::approx_sqrt;
use crate::ring_buffer::RingBuffer;

const BIN_COUNT: usize = 3;

/// Statistics behind one detector verdict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakReport {
    pub mean: f32,
    pub std_dev: f32,
    pub threshold: f32,
    /// Spike rate of the most recent third.
    pub newest_rate: f32,
    pub middle_rate: f32,
    pub oldest_rate: f32,
    /// Spike rate over the whole history.
    pub global_rate: f32,
    pub local_max: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SleepPhaseDetector {
    window: usize,
    threshold_k: f32,
}

impl SleepPhaseDetector {
    pub fn new(window: usize, threshold_k: f32) -> Self {
        Self { window, threshold_k }
    }

    /// Epochs required before a verdict can be produced.
    pub fn min_samples(&self) -> usize {
        (2 * self.window).max(BIN_COUNT)
    }

    /// `true` when the history is at a local activity maximum. Too little
    /// history is a plain `false`.
    pub fn is_local_max(&self, history: &RingBuffer<Sample>) -> bool {
        match self.evaluate(history) {
            Ok(report) => {
                log::debug!("Detector: {:?}", report);
                report.local_max
            }
            Err(e) => {
                log::debug!("Detector: {}", e);
                false
            }
        }
    }

    pub fn evaluate(&self, history: &RingBuffer<Sample>) -> Result<PeakReport, WakeError> {
        let len = history.len();
        let needed = self.min_samples();
        if len < needed {
            return Err(WakeError::InsufficientData {
                needed,
                available: len,
            });
        }

        let n = len as f32;
        let mean = history.iter().map(f32::from).sum::<f32>() / n;
        let variance = history
            .iter()
            .map(|s| {
                let d = f32::from(s) - mean;
                d * d
            })
            .sum::<f32>()
            / n;
        let std_dev = approx_sqrt(variance);
        let threshold = mean + self.threshold_k * std_dev;

        // Bins are laid out newest first; a remainder of len % 3 of the
        // oldest samples is left out of the bins but counts globally.
        let width = len / BIN_COUNT;
        let mut bins = [0usize; BIN_COUNT];
        let mut total = 0usize;
        for (i, sample) in history.iter().enumerate() {
            if f32::from(sample) > threshold {
                total += 1;
                if i < width * BIN_COUNT {
                    bins[i / width] += 1;
                }
            }
        }

        let rate = |count: usize| count as f32 / width as f32;
        let newest_rate = rate(bins[0]);
        let middle_rate = rate(bins[1]);
        let oldest_rate = rate(bins[2]);
        let global_rate = total as f32 / n;

        let local_max =
            middle_rate > global_rate && middle_rate > oldest_rate && middle_rate >= newest_rate;

        Ok(PeakReport {
            mean,
            std_dev,
            threshold,
            newest_rate,
            middle_rate,
            oldest_rate,
            global_rate,
            local_max,
        })
    }
}
