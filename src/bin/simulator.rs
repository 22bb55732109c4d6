//! Host simulator for the SmartWake scheduler.
//!
//! Replays one synthetic night through [`WakeScheduler`] without hardware:
//! a minute tick drives the clock and, while the scheduler is recording, a
//! full epoch of accelerometer readings follows each tick. Movement follows a
//! 90 minute sleep cycle, so the detector has peaks to find.
//!
//! ```text
//! cargo run --bin smartwake-sim
//! RUST_LOG=smartwake=debug cargo run --bin smartwake-sim
//! ```

use std::f32::consts::TAU;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use log::info;

use smartwake::config::{WakeConfig, GRAVITY_MG, READINGS_PER_BATCH};
use smartwake::events::MotionReading;
use smartwake::scheduler::{FireReason, SamplingState, WakeScheduler, WakeSink};
use smartwake::settings::{AlarmTime, MemoryAlarmStore};

// ---------------------------------------------------------------------------
// Night parameters
// ---------------------------------------------------------------------------

/// Minutes per simulated sleep cycle.
const SLEEP_CYCLE_MINUTES: f32 = 90.0;

/// Peak crossings per epoch at the lightest point of a cycle.
const PEAK_CROSSINGS: f32 = 24.0;

/// Lateral swing of the wrist when it moves, in milli-g.
const SWING_MG: i16 = 600;

/// Hours simulated before giving up.
const MAX_NIGHT_HOURS: i64 = 12;

// ---------------------------------------------------------------------------
// Mock data generation
// ---------------------------------------------------------------------------

/// Generates one epoch of readings with a crossing count that follows the
/// sleep cycle.
struct MockWrist {
    readings_per_epoch: usize,
}

impl MockWrist {
    fn new(readings_per_epoch: usize) -> Self {
        Self { readings_per_epoch }
    }

    /// Target zero crossings for the epoch starting `minutes` into the night.
    fn crossings_at(&self, minutes: i64) -> usize {
        let phase = (minutes as f32 / SLEEP_CYCLE_MINUTES) * TAU;
        // Deep sleep is still; only the upper half of the cycle moves.
        let level = (phase.sin() * PEAK_CROSSINGS).max(0.0);
        level as usize
    }

    /// Readings whose x residual flips sign `crossings` times.
    fn epoch(&self, crossings: usize) -> Vec<MotionReading> {
        let z = GRAVITY_MG as i16;
        if crossings == 0 {
            return vec![MotionReading::new(0, 0, z); self.readings_per_epoch];
        }

        let run = (self.readings_per_epoch / (crossings + 1)).max(1);
        (0..self.readings_per_epoch)
            .map(|i| {
                let x = if (i / run) % 2 == 0 { SWING_MG } else { -SWING_MG };
                MotionReading::new(x, 0, z)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

#[derive(Default)]
struct LogSink {
    now: Option<NaiveDateTime>,
}

impl WakeSink for LogSink {
    fn start_sampling(&mut self) {
        info!("[{}] accelerometer on", stamp(self.now));
    }

    fn stop_sampling(&mut self) {
        info!("[{}] accelerometer off", stamp(self.now));
    }

    fn fire_alarm(&mut self) {
        info!("[{}] *** ALARM ***", stamp(self.now));
    }

    fn notify_peer(&mut self) {}
}

fn stamp(now: Option<NaiveDateTime>) -> String {
    now.map(|t| t.format("%H:%M").to_string()).unwrap_or_else(|| "--:--".into())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = WakeConfig::default();
    let alarm = AlarmTime::new(7, 0)?;
    let bedtime = NaiveDate::from_ymd_opt(2024, 3, 9)
        .and_then(|d| d.and_hms_opt(23, 0, 0))
        .ok_or_else(|| anyhow::anyhow!("invalid bedtime"))?;

    info!("Starting SmartWake simulator");
    info!(
        "Alarm {}, wake window {} min, recording lead {} min",
        alarm,
        config.wake_window.num_minutes(),
        config.recording_lead.num_minutes()
    );

    let wrist = MockWrist::new(config.readings_per_epoch as usize);
    let mut scheduler = WakeScheduler::new(
        config,
        MemoryAlarmStore::armed(alarm),
        LogSink::default(),
        bedtime,
    );

    let mut outcome: Option<(NaiveDateTime, FireReason)> = None;

    for minute in 0..MAX_NIGHT_HOURS * 60 {
        let now = bedtime + TimeDelta::minutes(minute);
        scheduler.sink_mut().now = Some(now);

        if let Some(reason) = scheduler.on_tick(now) {
            outcome = Some((now, reason));
            break;
        }

        if scheduler.sampling_state() == SamplingState::Recording {
            let readings = wrist.epoch(wrist.crossings_at(minute));
            for batch in readings.chunks(READINGS_PER_BATCH) {
                scheduler.on_motion_batch(batch);
            }
        }
    }

    match outcome {
        Some((at, reason)) => {
            let early = alarm.next_occurrence(bedtime) - at;
            info!(
                "Woke at {} ({:?}), {} min before the alarm; next deadline {:?}",
                at.format("%H:%M"),
                reason,
                early.num_minutes(),
                scheduler.deadline()
            );
        }
        None => info!("Alarm never fired within {} hours", MAX_NIGHT_HOURS),
    }

    Ok(())
}
