// SmartWake - Wake Scheduler
//
// Background state machine driven by minute ticks. Owns the alarm deadline
// and, while recording, the history buffer and motion aggregator.
//
//            now >= deadline - lead
//   Idle ─────────────────────────────► Recording
//    ▲                                     │
//    │  deadline moved later (abort)       │
//    ├─────────────────────────────────────┤
//    │  now >= deadline, or inside the     │
//    │  wake window at a local maximum     │
//    └──────────────── fire ───────────────┘

use chrono::{NaiveDateTime, TimeDelta};

use crate::aggregator::{BatchOutcome, MotionAggregator};
use crate::config::WakeConfig;
use crate::detector::SleepPhaseDetector;
use crate::error::WakeError;
use crate::events::{MotionReading, Sample};
use crate::ring_buffer::RingBuffer;
use crate::settings::{load_deadline, AlarmStore};

/// Platform actions requested by the scheduler.
pub trait WakeSink {
    /// Subscribe to motion batches.
    fn start_sampling(&mut self);
    /// Unsubscribe from motion batches.
    fn stop_sampling(&mut self);
    /// Wake the wearer. Called once per deadline.
    fn fire_alarm(&mut self);
    /// Tell the foreground side the deadline moved.
    fn notify_peer(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingState {
    Idle,
    Recording,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireReason {
    /// The hard deadline was reached.
    Deadline,
    /// A light-sleep peak was detected inside the wake window.
    LightSleep,
}

/// State that exists only while recording.
#[derive(Debug)]
struct RecordingSession {
    history: RingBuffer<Sample>,
    aggregator: MotionAggregator,
}

pub struct WakeScheduler<S: AlarmStore, K: WakeSink> {
    config: WakeConfig,
    detector: SleepPhaseDetector,
    store: S,
    sink: K,
    deadline: Option<NaiveDateTime>,
    session: Option<RecordingSession>,
    /// Deadline for which the history buffer could not be allocated.
    degraded_for: Option<NaiveDateTime>,
}

impl<S: AlarmStore, K: WakeSink> WakeScheduler<S, K> {
    /// Build the scheduler and load the first deadline from `store`.
    pub fn new(config: WakeConfig, store: S, sink: K, now: NaiveDateTime) -> Self {
        let mut scheduler = Self {
            detector: SleepPhaseDetector::new(config.detector_window, config.threshold_k),
            config,
            store,
            sink,
            deadline: None,
            session: None,
            degraded_for: None,
        };
        scheduler.reload_deadline(now);
        scheduler
    }

    pub fn sampling_state(&self) -> SamplingState {
        if self.session.is_some() {
            SamplingState::Recording
        } else {
            SamplingState::Idle
        }
    }

    pub fn deadline(&self) -> Option<NaiveDateTime> {
        self.deadline
    }

    /// Epoch scores held by the current recording session.
    pub fn buffered_epochs(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.history.len())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    /// Re-read the stored alarm after the peer changed it.
    pub fn on_deadline_changed(&mut self, now: NaiveDateTime) {
        self.reload_deadline(now);
    }

    pub fn on_motion_batch(&mut self, batch: &[MotionReading]) -> Option<BatchOutcome> {
        let Some(session) = self.session.as_mut() else {
            log::debug!("Motion batch while idle, ignoring");
            return None;
        };
        Some(session.aggregator.process_batch(batch, &mut session.history))
    }

    /// Minute tick. Returns why the alarm fired, if it did.
    pub fn on_tick(&mut self, now: NaiveDateTime) -> Option<FireReason> {
        let Some(deadline) = self.deadline else {
            if self.session.is_some() {
                log::info!("Alarm disabled while recording");
                self.stop_recording();
            }
            return None;
        };

        if now >= deadline {
            self.fire(now, FireReason::Deadline);
            return Some(FireReason::Deadline);
        }

        if let Some(session) = self.session.as_ref() {
            if now >= deadline - self.config.wake_window
                && self.detector.is_local_max(&session.history)
            {
                self.fire(now, FireReason::LightSleep);
                return Some(FireReason::LightSleep);
            }
        }

        let recording_start = deadline - self.config.recording_lead;
        if self.session.is_some() && now < recording_start {
            log::info!("Deadline moved to {}, stopping early recording", deadline);
            self.stop_recording();
        } else if self.session.is_none()
            && now >= recording_start
            && self.degraded_for != Some(deadline)
        {
            if let Err(e) = self.start_recording() {
                log::error!("{}; falling back to time-only wake at {}", e, deadline);
                self.degraded_for = Some(deadline);
            }
        }

        None
    }

    fn reload_deadline(&mut self, now: NaiveDateTime) {
        match load_deadline(&self.store, now) {
            Ok(deadline) => {
                match deadline {
                    Some(d) => log::info!("Next alarm at {}", d),
                    None => log::info!("No alarm scheduled"),
                }
                self.deadline = deadline;
            }
            // Keep whatever deadline we had; a scheduler with none never rings.
            Err(e) => log::error!(
                "Could not read alarm settings, keeping deadline {:?}: {:?}",
                self.deadline,
                e
            ),
        }
    }

    fn start_recording(&mut self) -> Result<(), WakeError> {
        let history = RingBuffer::with_capacity(self.config.history_capacity)?;
        let aggregator =
            MotionAggregator::new(self.config.readings_per_epoch, self.config.deadband_mg);
        self.session = Some(RecordingSession {
            history,
            aggregator,
        });
        self.sink.start_sampling();
        log::info!("Motion recording ON");
        Ok(())
    }

    fn stop_recording(&mut self) {
        if self.session.take().is_some() {
            self.sink.stop_sampling();
            log::info!("Motion recording OFF");
        }
    }

    fn fire(&mut self, now: NaiveDateTime, reason: FireReason) {
        self.stop_recording();
        log::info!("Alarm triggered ({:?}) at {}", reason, now);
        self.sink.fire_alarm();

        if let Some(deadline) = self.deadline {
            if let Err(e) = self.store.set_last_fired(deadline) {
                log::warn!("Could not record fired deadline {}: {:?}", deadline, e);
            }
            let mut next = deadline + TimeDelta::days(1);
            while next <= now {
                next += TimeDelta::days(1);
            }
            self.deadline = Some(next);
            self.degraded_for = None;
            log::debug!(
                "Next alarm in {} hours",
                (next - now).num_hours()
            );
            self.sink.notify_peer();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{AlarmTime, MemoryAlarmStore};
    use chrono::NaiveDate;

    #[derive(Debug, Default)]
    struct RecordingSink {
        starts: usize,
        stops: usize,
        fires: usize,
        notifies: usize,
    }

    impl WakeSink for RecordingSink {
        fn start_sampling(&mut self) {
            self.starts += 1;
        }
        fn stop_sampling(&mut self) {
            self.stops += 1;
        }
        fn fire_alarm(&mut self) {
            self.fires += 1;
        }
        fn notify_peer(&mut self) {
            self.notifies += 1;
        }
    }

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn config() -> WakeConfig {
        WakeConfig {
            history_capacity: 60,
            readings_per_epoch: 4,
            deadband_mg: 15.0,
            detector_window: 5,
            threshold_k: 1.0,
            wake_window: TimeDelta::minutes(30),
            recording_lead: TimeDelta::minutes(90),
        }
    }

    /// Alarm at 07:00 on day 10, scheduler created at 00:00.
    fn scheduler() -> WakeScheduler<MemoryAlarmStore, RecordingSink> {
        let store = MemoryAlarmStore::armed(AlarmTime::new(7, 0).unwrap());
        WakeScheduler::new(config(), store, RecordingSink::default(), at(10, 0, 0))
    }

    fn epoch(scheduler: &mut WakeScheduler<MemoryAlarmStore, RecordingSink>, active: bool) {
        let push = |x: i16| MotionReading::new(x, 0, 1000);
        let batch: Vec<MotionReading> = if active {
            vec![push(600), push(-600), push(600), push(-600)]
        } else {
            vec![push(0); 4]
        };
        scheduler.on_motion_batch(&batch);
    }

    #[test]
    fn test_loads_next_deadline() {
        let s = scheduler();
        assert_eq!(s.deadline(), Some(at(10, 7, 0)));
        assert_eq!(s.sampling_state(), SamplingState::Idle);
    }

    #[test]
    fn test_recording_starts_exactly_at_lead_time() {
        let mut s = scheduler();
        // D - L = 05:30
        s.on_tick(at(10, 5, 29));
        assert_eq!(s.sampling_state(), SamplingState::Idle);

        s.on_tick(at(10, 5, 30));
        assert_eq!(s.sampling_state(), SamplingState::Recording);
        assert_eq!(s.sink().starts, 1);

        s.on_tick(at(10, 5, 31));
        assert_eq!(s.sink().starts, 1);
    }

    #[test]
    fn test_motion_ignored_while_idle() {
        let mut s = scheduler();
        assert_eq!(s.on_motion_batch(&[MotionReading::new(0, 0, 1000)]), None);
        assert_eq!(s.buffered_epochs(), 0);
    }

    #[test]
    fn test_deadline_pushed_later_aborts_recording() {
        let mut s = scheduler();
        s.on_tick(at(10, 5, 30));
        for _ in 0..5 {
            epoch(&mut s, false);
        }
        assert_eq!(s.buffered_epochs(), 5);

        s.store_mut()
            .set_alarm_time(AlarmTime::new(9, 0).unwrap())
            .unwrap();
        s.on_deadline_changed(at(10, 5, 40));
        assert_eq!(s.deadline(), Some(at(10, 9, 0)));

        assert_eq!(s.on_tick(at(10, 5, 41)), None);
        assert_eq!(s.sampling_state(), SamplingState::Idle);
        assert_eq!(s.buffered_epochs(), 0);
        assert_eq!(s.sink().stops, 1);
        assert_eq!(s.sink().fires, 0);

        // Old deadline passes without a trigger.
        assert_eq!(s.on_tick(at(10, 7, 0)), None);
        assert_eq!(s.sink().fires, 0);

        // Recording restarts with an empty history for the new deadline.
        s.on_tick(at(10, 7, 30));
        assert_eq!(s.sampling_state(), SamplingState::Recording);
        assert_eq!(s.buffered_epochs(), 0);
    }

    #[test]
    fn test_hard_deadline_fires_once_and_reschedules() {
        let mut s = scheduler();
        let mut fired_at = Vec::new();
        let mut now = at(10, 0, 0);
        while now < at(10, 12, 0) {
            if s.sampling_state() == SamplingState::Recording {
                epoch(&mut s, false);
            }
            if s.on_tick(now).is_some() {
                fired_at.push(now);
            }
            now += TimeDelta::minutes(1);
        }

        assert_eq!(fired_at, vec![at(10, 7, 0)]);
        assert_eq!(s.sink().fires, 1);
        assert_eq!(s.sink().notifies, 1);
        assert_eq!(s.deadline(), Some(at(11, 7, 0)));
        assert_eq!(s.sampling_state(), SamplingState::Idle);
        assert_eq!(s.sink().starts, s.sink().stops);
    }

    #[test]
    fn test_skipped_ticks_still_fire() {
        let mut s = scheduler();
        assert_eq!(s.on_tick(at(10, 7, 3)), Some(FireReason::Deadline));
        assert_eq!(s.deadline(), Some(at(11, 7, 0)));
        assert_eq!(s.on_tick(at(10, 7, 4)), None);
    }

    #[test]
    fn test_long_outage_fires_once() {
        let mut s = scheduler();
        assert_eq!(s.on_tick(at(13, 8, 0)), Some(FireReason::Deadline));
        assert_eq!(s.deadline(), Some(at(14, 7, 0)));
        assert_eq!(s.on_tick(at(13, 8, 1)), None);
        assert_eq!(s.sink().fires, 1);
    }

    #[test]
    fn test_light_sleep_peak_fires_early() {
        let mut s = scheduler();
        s.on_tick(at(10, 5, 30));

        // 10 quiet, 10 with a burst in the middle, 10 quiet epochs.
        for i in 0..30 {
            epoch(&mut s, (13..17).contains(&i));
        }
        assert_eq!(s.buffered_epochs(), 30);

        // Peak is visible but we are not yet inside the wake window.
        assert_eq!(s.on_tick(at(10, 6, 29)), None);
        assert_eq!(s.sampling_state(), SamplingState::Recording);

        assert_eq!(s.on_tick(at(10, 6, 30)), Some(FireReason::LightSleep));
        assert_eq!(s.sampling_state(), SamplingState::Idle);
        assert_eq!(s.deadline(), Some(at(11, 7, 0)));

        assert_eq!(s.on_tick(at(10, 7, 0)), None);
        assert_eq!(s.sink().fires, 1);
    }

    #[test]
    fn test_disabling_alarm_stops_recording() {
        let mut s = scheduler();
        s.on_tick(at(10, 6, 0));
        assert_eq!(s.sampling_state(), SamplingState::Recording);

        s.store_mut().set_alarm_enabled(false).unwrap();
        s.on_deadline_changed(at(10, 6, 1));
        assert_eq!(s.deadline(), None);

        assert_eq!(s.on_tick(at(10, 7, 0)), None);
        assert_eq!(s.sampling_state(), SamplingState::Idle);
        assert_eq!(s.sink().fires, 0);
    }

    #[test]
    fn test_allocation_failure_degrades_to_time_only() {
        let store = MemoryAlarmStore::armed(AlarmTime::new(7, 0).unwrap());
        let config = WakeConfig {
            history_capacity: usize::MAX,
            ..config()
        };
        let mut s = WakeScheduler::new(config, store, RecordingSink::default(), at(10, 0, 0));

        s.on_tick(at(10, 6, 0));
        assert_eq!(s.sampling_state(), SamplingState::Idle);
        s.on_tick(at(10, 6, 1));
        assert_eq!(s.sink().starts, 0);

        assert_eq!(s.on_tick(at(10, 7, 0)), Some(FireReason::Deadline));
        assert_eq!(s.sink().fires, 1);
    }

    #[test]
    fn test_reload_after_early_fire_does_not_ring_twice() {
        let mut s = scheduler();
        s.on_tick(at(10, 5, 30));
        for i in 0..30 {
            epoch(&mut s, (13..17).contains(&i));
        }
        assert_eq!(s.on_tick(at(10, 6, 30)), Some(FireReason::LightSleep));
        assert_eq!(s.store().last_fired().unwrap(), Some(at(10, 7, 0)));

        // Settings unchanged, but the peer asks for a re-read.
        s.on_deadline_changed(at(10, 6, 40));
        assert_eq!(s.deadline(), Some(at(11, 7, 0)));

        assert_eq!(s.on_tick(at(10, 7, 0)), None);
        assert_eq!(s.sink().fires, 1);
    }

    #[test]
    fn test_restart_after_early_fire_keeps_next_day() {
        let mut s = scheduler();
        s.on_tick(at(10, 5, 30));
        for i in 0..30 {
            epoch(&mut s, (13..17).contains(&i));
        }
        s.on_tick(at(10, 6, 30));

        let store = s.store().clone();
        let restarted = WakeScheduler::new(config(), store, RecordingSink::default(), at(10, 6, 45));
        assert_eq!(restarted.deadline(), Some(at(11, 7, 0)));
    }

    /// Store whose reads can be made to fail.
    #[derive(Debug, Default)]
    struct FlakyStore {
        inner: MemoryAlarmStore,
        failing: bool,
    }

    impl AlarmStore for FlakyStore {
        fn alarm_time(&self) -> anyhow::Result<Option<AlarmTime>> {
            if self.failing {
                anyhow::bail!("flash read error");
            }
            self.inner.alarm_time()
        }
        fn set_alarm_time(&mut self, time: AlarmTime) -> anyhow::Result<()> {
            self.inner.set_alarm_time(time)
        }
        fn clear_alarm_time(&mut self) -> anyhow::Result<()> {
            self.inner.clear_alarm_time()
        }
        fn alarm_enabled(&self) -> anyhow::Result<bool> {
            if self.failing {
                anyhow::bail!("flash read error");
            }
            self.inner.alarm_enabled()
        }
        fn set_alarm_enabled(&mut self, enabled: bool) -> anyhow::Result<()> {
            self.inner.set_alarm_enabled(enabled)
        }
        fn last_fired(&self) -> anyhow::Result<Option<NaiveDateTime>> {
            self.inner.last_fired()
        }
        fn set_last_fired(&mut self, deadline: NaiveDateTime) -> anyhow::Result<()> {
            self.inner.set_last_fired(deadline)
        }
    }

    #[test]
    fn test_store_failure_keeps_deadline_and_recording() {
        let store = FlakyStore {
            inner: MemoryAlarmStore::armed(AlarmTime::new(7, 0).unwrap()),
            failing: false,
        };
        let mut s = WakeScheduler::new(config(), store, RecordingSink::default(), at(10, 0, 0));
        s.on_tick(at(10, 6, 0));
        assert_eq!(s.sampling_state(), SamplingState::Recording);

        s.store_mut().failing = true;
        s.on_deadline_changed(at(10, 6, 1));
        assert_eq!(s.deadline(), Some(at(10, 7, 0)));

        assert_eq!(s.on_tick(at(10, 6, 2)), None);
        assert_eq!(s.sampling_state(), SamplingState::Recording);
        assert_eq!(s.sink().stops, 0);
        assert_eq!(s.on_tick(at(10, 7, 0)), Some(FireReason::Deadline));
    }

    #[test]
    fn test_store_failure_at_startup_leaves_no_deadline() {
        let store = FlakyStore {
            inner: MemoryAlarmStore::armed(AlarmTime::new(7, 0).unwrap()),
            failing: true,
        };
        let mut s = WakeScheduler::new(config(), store, RecordingSink::default(), at(10, 0, 0));
        assert_eq!(s.deadline(), None);

        // Once the store recovers, a reload picks the alarm up.
        s.store_mut().failing = false;
        s.on_deadline_changed(at(10, 0, 1));
        assert_eq!(s.deadline(), Some(at(10, 7, 0)));
    }
}
