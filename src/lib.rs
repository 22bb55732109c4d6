// SmartWake - Smart Alarm Core
//
// Platform-independent part of the firmware: motion aggregation, the
// bounded activity history, light-sleep peak detection and the wake
// scheduler. Everything here runs on the host so it can be tested and
// replayed by the simulator; the ESP-IDF binary only adds drivers and tasks.

pub mod aggregator;
pub mod alarm;
pub mod config;
pub mod detector;
pub mod error;
pub mod events;
pub mod fastmath;
pub mod ring_buffer;
pub mod scheduler;
pub mod settings;

pub use aggregator::{BatchOutcome, EpochAccumulator, MotionAggregator};
pub use alarm::{AlarmSequence, AlarmSession, AlarmState, AlarmStep};
pub use config::WakeConfig;
pub use detector::{PeakReport, SleepPhaseDetector};
pub use error::WakeError;
pub use events::{AlarmEvent, MotionReading, Sample, WorkerEvent};
pub use fastmath::approx_sqrt;
pub use ring_buffer::RingBuffer;
pub use scheduler::{FireReason, SamplingState, WakeScheduler, WakeSink};
pub use settings::{AlarmStore, AlarmTime, MemoryAlarmStore};
