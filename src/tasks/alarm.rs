// SmartWake - Alarm Task
//
// Foreground side: owns the haptic motor and the button. Plays the alarm
// sequence when the worker fires, handles stop/snooze, and lets the button
// adjust the alarm while nothing is ringing.

use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Local;
use esp_idf_hal::gpio::{AnyInputPin, Input, PinDriver};
use smartwake::alarm::{AlarmSession, AlarmState, DOUBLE_PULSE, SINGLE_PULSE};
use smartwake::config::*;
use smartwake::events::{AlarmEvent, WorkerEvent};
use smartwake::settings::{self, AlarmStore};

use crate::drivers::haptic::HapticDriver;
use crate::input::InputManager;

pub struct AlarmTaskIo {
    pub button_pin: PinDriver<'static, AnyInputPin, Input>,
    pub haptic: HapticDriver<'static>,
}

pub fn alarm_task<S: AlarmStore>(
    io: AlarmTaskIo,
    mut store: S,
    alarm_rx: Receiver<AlarmEvent>,
    alarm_tx: Sender<AlarmEvent>,
    worker_tx: Sender<WorkerEvent>,
) {
    log::info!("Alarm task started");

    let AlarmTaskIo { button_pin, mut haptic } = io;
    let mut input = InputManager::new(button_pin, alarm_tx);
    let mut session: Option<AlarmSession> = None;
    let mut next_pulse = Instant::now();

    let poll_interval = Duration::from_millis(UI_POLL_INTERVAL_MS);

    loop {
        // 1. Poll the button (handles debounce + press detection internally).
        input.update();

        // 2. Drain all pending events (non-blocking).
        while let Ok(event) = alarm_rx.try_recv() {
            let now = Local::now().naive_local();
            let active = session.as_mut().filter(|s| !s.is_finished());
            match (event, active) {
                (AlarmEvent::Fire, _) => {
                    log::info!("Alarm is going off! Time to wake up!!");
                    session = Some(AlarmSession::ring());
                    next_pulse = Instant::now();
                }

                (AlarmEvent::DeadlineUpdated, _) => log::debug!("Worker rescheduled the alarm"),

                (AlarmEvent::ButtonClick, Some(active)) => {
                    active.snooze(now);
                    haptic.trigger();
                }

                (AlarmEvent::ButtonLongPress, Some(active)) => {
                    active.stop();
                    haptic.play(DOUBLE_PULSE);
                }

                // Nothing ringing: the button edits the alarm.
                (AlarmEvent::ButtonClick, None) => {
                    haptic.trigger();
                    match settings::change_alarm_time(&mut store, ALARM_TIME_STEP_MINUTES) {
                        Ok(time) => log::info!("Alarm moved to {}", time),
                        Err(e) => log::error!("Could not store alarm time: {:?}", e),
                    }
                    let _ = worker_tx.send(WorkerEvent::DeadlineChanged(now));
                }

                (AlarmEvent::ButtonLongPress, None) => {
                    let enabled = !store.alarm_enabled().unwrap_or(false);
                    if let Err(e) = settings::set_alarm_enabled(&mut store, enabled) {
                        log::error!("Could not store alarm state: {:?}", e);
                    }
                    log::info!("Alarm {}", if enabled { "enabled" } else { "disabled" });
                    haptic.play(if enabled { DOUBLE_PULSE } else { SINGLE_PULSE });
                    let _ = worker_tx.send(WorkerEvent::DeadlineChanged(now));
                }
            }
        }

        // 3. Drive the ringing alarm.
        if let Some(active) = session.as_mut() {
            if active.poll(Local::now().naive_local()) {
                next_pulse = Instant::now();
            }

            if active.state() == AlarmState::Ringing && Instant::now() >= next_pulse {
                if let Some(step) = active.next_step() {
                    haptic.play(step.pattern);
                    next_pulse = Instant::now() + step.delay;
                }
            }

            if active.is_finished() {
                session = None;
            }
        }

        thread::sleep(poll_interval);
    }
}
