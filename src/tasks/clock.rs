// SmartWake - Clock Task
//
// Emits one tick per wall-clock minute. A late wake-up still produces a
// single tick carrying the real time; the scheduler compares with `>=`.

use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, Timelike};

use smartwake::config::CLOCK_POLL_INTERVAL_MS;
use smartwake::events::WorkerEvent;

pub fn clock_task(worker_tx: Sender<WorkerEvent>) {
    log::info!("Clock task started");

    let poll = Duration::from_millis(CLOCK_POLL_INTERVAL_MS);
    let mut last_minute: Option<NaiveDateTime> = None;

    loop {
        let now = Local::now().naive_local();
        let minute = now.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(now);

        if last_minute != Some(minute) {
            last_minute = Some(minute);
            if worker_tx.send(WorkerEvent::Tick(minute)).is_err() {
                log::warn!("Worker channel closed - exiting clock task");
                return;
            }
        }

        thread::sleep(poll);
    }
}
