// SmartWake - Foreground Alarm
//
// The ringing alarm is a finite, restartable sequence of vibration steps.
// The alarm task pulls one step at a time, plays its pulse pattern and
// waits `delay` before pulling the next, so pausing (snooze) or stopping is
// just a matter of not pulling anymore.

use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta};

use crate::config::{ALARM_PATTERN_SECS, ALARM_REPEAT, SNOOZE_MINUTES, VIBE_GAP_MS, VIBE_PULSE_MS};

/// Alternating on/off durations in milliseconds, starting with "on".
pub type PulsePattern = &'static [u32];

pub const SINGLE_PULSE: PulsePattern = &[VIBE_PULSE_MS];
pub const DOUBLE_PULSE: PulsePattern = &[VIBE_PULSE_MS, VIBE_GAP_MS, VIBE_PULSE_MS];
pub const TRIPLE_PULSE: PulsePattern = &[
    VIBE_PULSE_MS * 2,
    VIBE_GAP_MS,
    VIBE_PULSE_MS * 2,
    VIBE_GAP_MS,
    VIBE_PULSE_MS * 2,
];

const PATTERNS: [PulsePattern; 3] = [SINGLE_PULSE, DOUBLE_PULSE, TRIPLE_PULSE];

/// One buzz followed by a pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmStep {
    pub pattern: PulsePattern,
    pub delay: Duration,
}

/// Progressive alarm: gaps shrink within each round and the pulse pattern
/// gets stronger every round, for `ALARM_REPEAT` rounds.
#[derive(Debug, Clone, Default)]
pub struct AlarmSequence {
    step: usize,
}

impl AlarmSequence {
    pub const LEN: usize = ALARM_PATTERN_SECS.len() * ALARM_REPEAT;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn restart(&mut self) {
        self.step = 0;
    }

    pub fn position(&self) -> usize {
        self.step
    }
}

impl Iterator for AlarmSequence {
    type Item = AlarmStep;

    fn next(&mut self) -> Option<AlarmStep> {
        if self.step >= Self::LEN {
            return None;
        }

        let round = self.step / ALARM_PATTERN_SECS.len();
        let step = AlarmStep {
            pattern: PATTERNS[round % PATTERNS.len()],
            delay: Duration::from_secs(ALARM_PATTERN_SECS[self.step % ALARM_PATTERN_SECS.len()] as u64),
        };
        self.step += 1;
        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = Self::LEN.saturating_sub(self.step);
        (left, Some(left))
    }
}

impl ExactSizeIterator for AlarmSequence {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    Ringing,
    Snoozed { until: NaiveDateTime },
    Dismissed,
}

/// One alarm from the moment it fires until it is dismissed.
#[derive(Debug, Clone)]
pub struct AlarmSession {
    state: AlarmState,
    sequence: AlarmSequence,
}

impl AlarmSession {
    pub fn ring() -> Self {
        log::debug!("Alarm fired, starting vibes");
        Self {
            state: AlarmState::Ringing,
            sequence: AlarmSequence::new(),
        }
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == AlarmState::Dismissed
    }

    /// Next vibration step while ringing. A sequence that runs out ends the
    /// session.
    pub fn next_step(&mut self) -> Option<AlarmStep> {
        if self.state != AlarmState::Ringing {
            return None;
        }
        let step = self.sequence.next();
        if step.is_none() {
            log::info!("Alarm sequence exhausted, giving up");
            self.state = AlarmState::Dismissed;
        }
        step
    }

    pub fn stop(&mut self) {
        if self.state != AlarmState::Dismissed {
            log::info!("Alarm stopped");
            self.state = AlarmState::Dismissed;
        }
    }

    /// Silence the alarm and ring again after the snooze delay.
    pub fn snooze(&mut self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        if self.state == AlarmState::Dismissed {
            return None;
        }
        let until = now + TimeDelta::minutes(SNOOZE_MINUTES);
        log::info!("Alarm snoozed until {}", until);
        self.state = AlarmState::Snoozed { until };
        Some(until)
    }

    /// The alarm screen went away; an alarm still ringing is snoozed rather
    /// than lost.
    pub fn close(&mut self, now: NaiveDateTime) {
        if self.state == AlarmState::Ringing {
            self.snooze(now);
        }
    }

    /// Re-ring a snoozed alarm once its time has come. Returns `true` when
    /// the session started ringing again.
    pub fn poll(&mut self, now: NaiveDateTime) -> bool {
        match self.state {
            AlarmState::Snoozed { until } if now >= until => {
                self.state = AlarmState::Ringing;
                self.sequence.restart();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_sequence_is_finite() {
        let steps: Vec<AlarmStep> = AlarmSequence::new().collect();
        assert_eq!(steps.len(), 96);
        assert_eq!(AlarmSequence::new().len(), 96);
    }

    #[test]
    fn test_sequence_escalates_per_round() {
        let steps: Vec<AlarmStep> = AlarmSequence::new().collect();

        assert_eq!(steps[0].pattern, SINGLE_PULSE);
        assert_eq!(steps[0].delay, Duration::from_secs(5));
        assert_eq!(steps[15].delay, Duration::from_secs(30));
        assert_eq!(steps[16].pattern, DOUBLE_PULSE);
        assert_eq!(steps[16].delay, Duration::from_secs(5));
        assert_eq!(steps[32].pattern, TRIPLE_PULSE);
        assert_eq!(steps[48].pattern, SINGLE_PULSE);
    }

    #[test]
    fn test_patterns_follow_configured_pulse_width() {
        assert_eq!(SINGLE_PULSE, &[VIBE_PULSE_MS]);
        assert!(PATTERNS
            .iter()
            .all(|p| p.iter().step_by(2).all(|&on| on % VIBE_PULSE_MS == 0)));
    }

    #[test]
    fn test_sequence_restarts() {
        let mut seq = AlarmSequence::new();
        seq.by_ref().take(20).for_each(drop);
        assert_eq!(seq.position(), 20);
        seq.restart();
        assert_eq!(seq.next().map(|s| s.pattern), Some(SINGLE_PULSE));
    }

    #[test]
    fn test_snooze_rings_again_later() {
        let mut session = AlarmSession::ring();
        assert!(session.next_step().is_some());

        let until = session.snooze(at(7, 0)).unwrap();
        assert_eq!(until, at(7, 9));
        assert_eq!(session.next_step(), None);

        assert!(!session.poll(at(7, 8)));
        assert!(session.poll(at(7, 9)));
        assert_eq!(session.state(), AlarmState::Ringing);
        assert_eq!(session.next_step().map(|s| s.delay), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_stop_is_final() {
        let mut session = AlarmSession::ring();
        session.stop();
        assert!(session.is_finished());
        assert_eq!(session.snooze(at(7, 0)), None);
        assert!(!session.poll(at(9, 0)));
        assert_eq!(session.next_step(), None);
    }

    #[test]
    fn test_closing_while_ringing_snoozes() {
        let mut session = AlarmSession::ring();
        session.close(at(7, 0));
        assert_eq!(session.state(), AlarmState::Snoozed { until: at(7, 9) });
    }

    #[test]
    fn test_exhausted_sequence_dismisses() {
        let mut session = AlarmSession::ring();
        let mut count = 0;
        while session.next_step().is_some() {
            count += 1;
        }
        assert_eq!(count, AlarmSequence::LEN);
        assert!(session.is_finished());
    }
}
