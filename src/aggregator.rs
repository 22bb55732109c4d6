// SmartWake - Motion Aggregator
//
// Turns raw accelerometer batches into one activity score per epoch:
//   1. drop batches that overlap a vibration pulse,
//   2. remove the 1 g gravity component along each reading's direction,
//   3. count per-axis zero crossings of the residual (with a dead band),
//   4. every `readings_per_epoch` readings push the clamped count.

use crate::config::GRAVITY_MG;
use crate::events::{MotionReading, Sample};
use crate::fastmath::magnitude;
use crate::ring_buffer::RingBuffer;

/// Per-epoch running state, reset after each emitted sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpochAccumulator {
    pub crossings: u16,
    pub readings: u32,
}

impl EpochAccumulator {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Outcome of feeding one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Readings were folded in; `emitted` epoch scores were pushed.
    Accepted { emitted: usize },
    /// The batch overlapped a vibration pulse and was ignored.
    Discarded,
}

#[derive(Debug, Clone)]
pub struct MotionAggregator {
    readings_per_epoch: u32,
    deadband_mg: f32,
    acc: EpochAccumulator,
    /// Last sign seen outside the dead band, per axis (true = positive).
    last_sign: [Option<bool>; 3],
}

impl MotionAggregator {
    pub fn new(readings_per_epoch: u32, deadband_mg: f32) -> Self {
        Self {
            readings_per_epoch: readings_per_epoch.max(1),
            deadband_mg,
            acc: EpochAccumulator::default(),
            last_sign: [None; 3],
        }
    }

    pub fn accumulator(&self) -> EpochAccumulator {
        self.acc
    }

    pub fn process_batch(
        &mut self,
        batch: &[MotionReading],
        history: &mut RingBuffer<Sample>,
    ) -> BatchOutcome {
        if batch.iter().any(|r| r.vibrating) {
            log::debug!("Vibration invalidated batch of {} readings", batch.len());
            return BatchOutcome::Discarded;
        }

        let mut emitted = 0;
        for reading in batch {
            let crossings = self.crossings_for(reading);
            self.acc.crossings = self.acc.crossings.saturating_add(crossings);
            self.acc.readings += 1;

            if self.acc.readings >= self.readings_per_epoch {
                let score = self.acc.crossings.min(Sample::MAX as u16) as Sample;
                history.push(score);
                log::debug!("Epoch score {} ({} buffered)", score, history.len());
                self.acc.reset();
                emitted += 1;
            }
        }

        BatchOutcome::Accepted { emitted }
    }

    /// Zero crossings contributed by one reading across the three axes.
    fn crossings_for(&mut self, reading: &MotionReading) -> u16 {
        let raw = [reading.x as f32, reading.y as f32, reading.z as f32];
        let len = magnitude(raw[0], raw[1], raw[2]);
        if len == 0.0 {
            return 0;
        }

        let mut crossings = 0;
        for (axis, &value) in raw.iter().enumerate() {
            let residual = value - value / len * GRAVITY_MG;
            if residual.abs() <= self.deadband_mg {
                continue;
            }

            let positive = residual > 0.0;
            if let Some(previous) = self.last_sign[axis] {
                if previous != positive {
                    crossings += 1;
                }
            }
            self.last_sign[axis] = Some(positive);
        }
        crossings
    }
}
