// SmartWake - Hardware, Timing & Detection Configuration
// Target: Seeed Studio Xiao ESP32-C3 (RISC-V)

use chrono::TimeDelta;

// ---------------------------------------------------------------------------
// GPIO Pin Definitions (Xiao ESP32-C3 pinout)
// ---------------------------------------------------------------------------
pub const PIN_BUTTON: i32 = 3; // D1/A1 - User button (INPUT_PULLUP, active LOW)
pub const PIN_HAPTIC: i32 = 4; // D2/A2 - Vibration motor control
pub const PIN_I2C_SDA: i32 = 6; // D4    - I2C data line
pub const PIN_I2C_SCL: i32 = 7; // D5    - I2C clock line

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_MPU6050: u8 = 0x68;
pub const I2C_TIMEOUT_TICKS: u32 = 1000; // FreeRTOS ticks

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes)
// ---------------------------------------------------------------------------
pub const STACK_SENSOR: usize = 4096;
pub const STACK_WORKER: usize = 8192;
pub const STACK_CLOCK: usize = 3072;
pub const STACK_ALARM: usize = 4096;

// ---------------------------------------------------------------------------
// Motion sampling
// ---------------------------------------------------------------------------
pub const SENSOR_SAMPLE_INTERVAL_MS: u64 = 100; // 10 Hz
pub const READINGS_PER_BATCH: usize = 25; // one batch every 2.5 s
pub const READINGS_PER_EPOCH: u32 = 600; // 60 s of readings at 10 Hz
pub const GRAVITY_MG: f32 = 1000.0;
pub const ZERO_CROSSING_DEADBAND_MG: f32 = 15.0;
pub const ACCEL_SCALE_2G: f32 = 16.384; // LSB/mg at ±2 g

// ---------------------------------------------------------------------------
// History & detection
// ---------------------------------------------------------------------------
pub const HISTORY_CAPACITY: usize = 300; // epochs (5 hours of one-minute scores)
pub const DETECTOR_WINDOW: usize = 50;
pub const DETECTOR_THRESHOLD_K: f32 = 1.0;

// ---------------------------------------------------------------------------
// Scheduling (minutes)
// ---------------------------------------------------------------------------
pub const WAKE_WINDOW_MINUTES: i64 = 30;
pub const RECORDING_BEFORE_WINDOW_MINUTES: i64 = 6 * 60;
pub const SNOOZE_MINUTES: i64 = 9;
pub const CLOCK_POLL_INTERVAL_MS: u64 = 1000;

// ---------------------------------------------------------------------------
// Alarm defaults & input
// ---------------------------------------------------------------------------
pub const DEFAULT_ALARM_HOUR: u8 = 8;
pub const DEFAULT_ALARM_MINUTE: u8 = 15;
pub const ALARM_TIME_STEP_MINUTES: i32 = 5;
pub const UI_POLL_INTERVAL_MS: u64 = 10;
pub const DEBOUNCE_MS: u64 = 50;
pub const LONG_PRESS_MS: u64 = 1500;

// ---------------------------------------------------------------------------
// Vibration sequence
// ---------------------------------------------------------------------------
pub const VIBE_PULSE_MS: u32 = 50;
pub const VIBE_GAP_MS: u32 = 100;
pub const ALARM_PATTERN_SECS: [u8; 16] = [5, 4, 4, 3, 3, 3, 2, 2, 2, 2, 1, 1, 1, 1, 1, 30];
pub const ALARM_REPEAT: usize = 6;

/// Tunables for the smart-wake pipeline.
///
/// The detector sensitivity is not settled, so the threshold multiplier and
/// window are carried here instead of being baked into the detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WakeConfig {
    /// Epoch scores kept while recording.
    pub history_capacity: usize,
    /// Raw readings folded into one epoch score.
    pub readings_per_epoch: u32,
    /// Residual band (mg) that must be left before a sign change counts.
    pub deadband_mg: f32,
    /// Minimum history is `2 * detector_window` epochs.
    pub detector_window: usize,
    /// Spike threshold is `mean + k * std`.
    pub threshold_k: f32,
    /// How early before the deadline the alarm may fire on detected motion.
    pub wake_window: TimeDelta,
    /// How early before the deadline sampling starts.
    pub recording_lead: TimeDelta,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            history_capacity: HISTORY_CAPACITY,
            readings_per_epoch: READINGS_PER_EPOCH,
            deadband_mg: ZERO_CROSSING_DEADBAND_MG,
            detector_window: DETECTOR_WINDOW,
            threshold_k: DETECTOR_THRESHOLD_K,
            wake_window: TimeDelta::minutes(WAKE_WINDOW_MINUTES),
            recording_lead: TimeDelta::minutes(WAKE_WINDOW_MINUTES + RECORDING_BEFORE_WINDOW_MINUTES),
        }
    }
}

