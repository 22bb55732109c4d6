// SmartWake - System Events & Data Types

use chrono::NaiveDateTime;

/// One activity score per epoch.
pub type Sample = u8;

// ---------------------------------------------------------------------------
// Motion Data (3-axis accelerometer reading, milli-g)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionReading {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    /// The vibration motor was running while this reading was taken.
    pub vibrating: bool,
}

impl MotionReading {
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z, vibrating: false }
    }

    pub const fn during_vibration(mut self) -> Self {
        self.vibrating = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Worker Events - everything the background scheduler reacts to
// ---------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A batch of readings from the motion source.
    MotionBatch(Vec<MotionReading>),
    /// Minute tick with the current wall-clock time.
    Tick(NaiveDateTime),
    /// The stored alarm time or enabled flag changed.
    DeadlineChanged(NaiveDateTime),
}

// ---------------------------------------------------------------------------
// Alarm Events - sent to the foreground alarm task via channel
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmEvent {
    /// The scheduler decided it is time to wake up.
    Fire,
    /// The scheduler moved the deadline; refresh anything derived from it.
    DeadlineUpdated,
    /// Single button click detected.
    ButtonClick,
    /// Long button press detected.
    ButtonLongPress,
}
