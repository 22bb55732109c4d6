// SmartWake - Alarm Settings
//
// The alarm is persisted as scalar key/value pairs (hour, minute, enabled),
// plus the last deadline that fired. Deadlines are derived from those and
// never land on or before one that already fired.

use anyhow::{bail, Result};
use chrono::{NaiveDateTime, NaiveTime, TimeDelta};

use crate::config::{DEFAULT_ALARM_HOUR, DEFAULT_ALARM_MINUTE};

/// Persistent keys, shared by every [`AlarmStore`] backend.
pub const KEY_ALARM_HOUR: &str = "alarm_hour";
pub const KEY_ALARM_MINUTE: &str = "alarm_min";
pub const KEY_ALARM_ON: &str = "alarm_on";
pub const KEY_LAST_FIRED: &str = "last_fired";

const MINUTES_PER_DAY: i32 = 24 * 60;

/// Time of day the alarm is set for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AlarmTime {
    hour: u8,
    minute: u8,
}

impl AlarmTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            bail!("invalid alarm time {:02}:{:02}", hour, minute);
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    fn as_naive_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, 0).unwrap_or_default()
    }

    /// First occurrence of this time of day at or after `now`.
    pub fn next_occurrence(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.as_naive_time());
        if today >= now {
            today
        } else {
            today + TimeDelta::days(1)
        }
    }

    /// The same alarm moved by `delta_minutes`, wrapping around midnight.
    pub fn shifted(&self, delta_minutes: i32) -> Self {
        let total = (self.hour as i32 * 60 + self.minute as i32 + delta_minutes)
            .rem_euclid(MINUTES_PER_DAY);
        Self {
            hour: (total / 60) as u8,
            minute: (total % 60) as u8,
        }
    }
}

impl Default for AlarmTime {
    fn default() -> Self {
        Self {
            hour: DEFAULT_ALARM_HOUR,
            minute: DEFAULT_ALARM_MINUTE,
        }
    }
}

impl core::fmt::Display for AlarmTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Durable alarm settings shared by the foreground and background sides.
pub trait AlarmStore {
    fn alarm_time(&self) -> Result<Option<AlarmTime>>;
    fn set_alarm_time(&mut self, time: AlarmTime) -> Result<()>;
    fn clear_alarm_time(&mut self) -> Result<()>;
    fn alarm_enabled(&self) -> Result<bool>;
    fn set_alarm_enabled(&mut self, enabled: bool) -> Result<()>;
    /// Deadline of the most recent trigger.
    fn last_fired(&self) -> Result<Option<NaiveDateTime>>;
    fn set_last_fired(&mut self, deadline: NaiveDateTime) -> Result<()>;
}

/// Volatile store for host builds and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryAlarmStore {
    time: Option<AlarmTime>,
    enabled: bool,
    last_fired: Option<NaiveDateTime>,
}

impl MemoryAlarmStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn armed(time: AlarmTime) -> Self {
        Self {
            time: Some(time),
            enabled: true,
            last_fired: None,
        }
    }
}

impl AlarmStore for MemoryAlarmStore {
    fn alarm_time(&self) -> Result<Option<AlarmTime>> {
        Ok(self.time)
    }

    fn set_alarm_time(&mut self, time: AlarmTime) -> Result<()> {
        self.time = Some(time);
        Ok(())
    }

    fn clear_alarm_time(&mut self) -> Result<()> {
        self.time = None;
        Ok(())
    }

    fn alarm_enabled(&self) -> Result<bool> {
        Ok(self.enabled)
    }

    fn set_alarm_enabled(&mut self, enabled: bool) -> Result<()> {
        self.enabled = enabled;
        Ok(())
    }

    fn last_fired(&self) -> Result<Option<NaiveDateTime>> {
        Ok(self.last_fired)
    }

    fn set_last_fired(&mut self, deadline: NaiveDateTime) -> Result<()> {
        self.last_fired = Some(deadline);
        Ok(())
    }
}

/// Next deadline, or `None` when the alarm is off or has no time set.
///
/// A deadline that already fired (early, on a light-sleep peak) is skipped
/// so a reload or restart cannot ring it a second time.
pub fn load_deadline(store: &impl AlarmStore, now: NaiveDateTime) -> Result<Option<NaiveDateTime>> {
    if !store.alarm_enabled()? {
        return Ok(None);
    }
    let Some(time) = store.alarm_time()? else {
        return Ok(None);
    };
    let mut deadline = time.next_occurrence(now);
    if let Some(fired) = store.last_fired()? {
        while deadline <= fired {
            deadline += TimeDelta::days(1);
        }
    }
    Ok(Some(deadline))
}

/// Seed the default alarm time on first boot.
pub fn ensure_alarm_time(store: &mut impl AlarmStore) -> Result<AlarmTime> {
    match store.alarm_time()? {
        Some(time) => Ok(time),
        None => {
            let time = AlarmTime::default();
            store.set_alarm_time(time)?;
            log::info!("No alarm time stored, defaulting to {}", time);
            Ok(time)
        }
    }
}

/// Turn the alarm on or off. Enabling without a stored time sets 00:00.
pub fn set_alarm_enabled(store: &mut impl AlarmStore, enabled: bool) -> Result<()> {
    log::debug!("Alarm turned {}", if enabled { "ON" } else { "OFF" });
    store.set_alarm_enabled(enabled)?;
    if enabled && store.alarm_time()?.is_none() {
        store.set_alarm_time(AlarmTime::new(0, 0)?)?;
    }
    Ok(())
}

/// Read-modify-write the stored alarm by `delta_minutes`.
pub fn change_alarm_time(store: &mut impl AlarmStore, delta_minutes: i32) -> Result<AlarmTime> {
    let current = store.alarm_time()?.unwrap_or_default();
    let updated = current.shifted(delta_minutes);
    store.set_alarm_time(updated)?;
    Ok(updated)
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
    fn test_rejects_out_of_range() {
        assert!(AlarmTime::new(24, 0).is_err());
        assert!(AlarmTime::new(7, 60).is_err());
        assert!(AlarmTime::new(23, 59).is_ok());
    }

    #[test]
    fn test_next_occurrence_rolls_forward() {
        let alarm = AlarmTime::new(7, 30).unwrap();
        assert_eq!(alarm.next_occurrence(at(6, 0)), at(7, 30));
        assert_eq!(alarm.next_occurrence(at(7, 30)), at(7, 30));
        assert_eq!(
            alarm.next_occurrence(at(7, 31)),
            at(7, 30) + TimeDelta::days(1)
        );
    }

    #[test]
    fn test_shift_wraps_midnight() {
        let alarm = AlarmTime::new(23, 58).unwrap();
        assert_eq!(alarm.shifted(5), AlarmTime::new(0, 3).unwrap());
        assert_eq!(
            AlarmTime::new(0, 2).unwrap().shifted(-5),
            AlarmTime::new(23, 57).unwrap()
        );
        assert_eq!(alarm.shifted(-MINUTES_PER_DAY), alarm);
    }

    #[test]
    fn test_enabling_seeds_midnight() {
        let mut store = MemoryAlarmStore::new();
        set_alarm_enabled(&mut store, true).unwrap();
        assert_eq!(store.alarm_time().unwrap(), Some(AlarmTime::new(0, 0).unwrap()));
        assert!(store.alarm_enabled().unwrap());
    }

    #[test]
    fn test_load_deadline_respects_enabled_flag() {
        let mut store = MemoryAlarmStore::armed(AlarmTime::new(6, 45).unwrap());
        assert_eq!(load_deadline(&store, at(1, 0)).unwrap(), Some(at(6, 45)));

        set_alarm_enabled(&mut store, false).unwrap();
        assert_eq!(load_deadline(&store, at(1, 0)).unwrap(), None);
    }

    #[test]
    fn test_change_alarm_time_persists() {
        let mut store = MemoryAlarmStore::armed(AlarmTime::new(6, 45).unwrap());
        let updated = change_alarm_time(&mut store, 20).unwrap();
        assert_eq!(updated.to_string(), "07:05");
        assert_eq!(store.alarm_time().unwrap(), Some(updated));
    }

    #[test]
    fn test_default_seeded_once() {
        let mut store = MemoryAlarmStore::new();
        assert_eq!(ensure_alarm_time(&mut store).unwrap(), AlarmTime::default());
        store.set_alarm_time(AlarmTime::new(5, 0).unwrap()).unwrap();
        assert_eq!(ensure_alarm_time(&mut store).unwrap(), AlarmTime::new(5, 0).unwrap());
    }

    #[test]
    fn test_cleared_time_means_no_deadline() {
        let mut store = MemoryAlarmStore::armed(AlarmTime::new(6, 45).unwrap());
        store.clear_alarm_time().unwrap();
        assert_eq!(load_deadline(&store, at(1, 0)).unwrap(), None);
    }

    #[test]
    fn test_fired_deadline_is_skipped() {
        let mut store = MemoryAlarmStore::armed(AlarmTime::new(7, 0).unwrap());
        store.set_last_fired(at(7, 0)).unwrap();
        assert_eq!(
            load_deadline(&store, at(6, 40)).unwrap(),
            Some(at(7, 0) + TimeDelta::days(1))
        );
        // A later time on the same day is a new deadline.
        store.set_alarm_time(AlarmTime::new(7, 30).unwrap()).unwrap();
        assert_eq!(load_deadline(&store, at(6, 40)).unwrap(), Some(at(7, 30)));
    }
}
