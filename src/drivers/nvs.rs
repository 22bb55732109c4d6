// SmartWake - NVS-backed Alarm Settings

use anyhow::Result;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

use chrono::{DateTime, NaiveDateTime};
use smartwake::settings::{
    AlarmStore, AlarmTime, KEY_ALARM_HOUR, KEY_ALARM_MINUTE, KEY_ALARM_ON, KEY_LAST_FIRED,
};

const NVS_NAMESPACE: &str = "smartwake";

pub struct NvsAlarmStore {
    nvs: EspNvs<NvsDefault>,
}

impl NvsAlarmStore {
    /// Open the settings namespace. Each task opens its own handle on the
    /// shared partition.
    pub fn open(partition: EspDefaultNvsPartition) -> Result<Self> {
        Ok(Self {
            nvs: EspNvs::new(partition, NVS_NAMESPACE, true)?,
        })
    }
}

impl AlarmStore for NvsAlarmStore {
    fn alarm_time(&self) -> Result<Option<AlarmTime>> {
        let hour = self.nvs.get_u8(KEY_ALARM_HOUR)?;
        let minute = self.nvs.get_u8(KEY_ALARM_MINUTE)?;
        match (hour, minute) {
            (Some(h), Some(m)) => Ok(Some(AlarmTime::new(h, m)?)),
            _ => Ok(None),
        }
    }

    fn set_alarm_time(&mut self, time: AlarmTime) -> Result<()> {
        self.nvs.set_u8(KEY_ALARM_HOUR, time.hour())?;
        self.nvs.set_u8(KEY_ALARM_MINUTE, time.minute())?;
        Ok(())
    }

    fn clear_alarm_time(&mut self) -> Result<()> {
        self.nvs.remove(KEY_ALARM_HOUR)?;
        self.nvs.remove(KEY_ALARM_MINUTE)?;
        Ok(())
    }

    fn alarm_enabled(&self) -> Result<bool> {
        Ok(self.nvs.get_u8(KEY_ALARM_ON)?.is_some_and(|v| v != 0))
    }

    fn set_alarm_enabled(&mut self, enabled: bool) -> Result<()> {
        self.nvs.set_u8(KEY_ALARM_ON, enabled as u8)?;
        Ok(())
    }

    // Local wall-clock time, stored as seconds since the epoch.
    fn last_fired(&self) -> Result<Option<NaiveDateTime>> {
        Ok(self
            .nvs
            .get_i64(KEY_LAST_FIRED)?
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|t| t.naive_utc()))
    }

    fn set_last_fired(&mut self, deadline: NaiveDateTime) -> Result<()> {
        self.nvs.set_i64(KEY_LAST_FIRED, deadline.and_utc().timestamp())?;
        Ok(())
    }
}
