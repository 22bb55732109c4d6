// SmartWake - Background Worker Task
//
// Owns the wake scheduler. Motion batches, minute ticks and settings
// notifications arrive on one channel and are handled one at a time, so the
// scheduler needs no locking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use chrono::Local;

use smartwake::config::WakeConfig;
use smartwake::events::{AlarmEvent, WorkerEvent};
use smartwake::scheduler::{WakeScheduler, WakeSink};
use smartwake::settings::AlarmStore;

/// Scheduler actions mapped onto the firmware's tasks.
struct TaskSink {
    sampling: Arc<AtomicBool>,
    alarm_tx: Sender<AlarmEvent>,
}

impl WakeSink for TaskSink {
    fn start_sampling(&mut self) {
        self.sampling.store(true, Ordering::SeqCst);
    }

    fn stop_sampling(&mut self) {
        self.sampling.store(false, Ordering::SeqCst);
    }

    fn fire_alarm(&mut self) {
        if self.alarm_tx.send(AlarmEvent::Fire).is_err() {
            log::error!("Alarm task gone - cannot ring");
        }
    }

    fn notify_peer(&mut self) {
        let _ = self.alarm_tx.send(AlarmEvent::DeadlineUpdated);
    }
}

pub fn worker_task<S: AlarmStore>(
    store: S,
    worker_rx: Receiver<WorkerEvent>,
    alarm_tx: Sender<AlarmEvent>,
    sampling: Arc<AtomicBool>,
) {
    log::info!("Worker task started");

    let sink = TaskSink { sampling, alarm_tx };
    let mut scheduler = WakeScheduler::new(
        WakeConfig::default(),
        store,
        sink,
        Local::now().naive_local(),
    );

    while let Ok(event) = worker_rx.recv() {
        match event {
            WorkerEvent::MotionBatch(batch) => {
                scheduler.on_motion_batch(&batch);
            }
            WorkerEvent::Tick(now) => {
                if let Some(reason) = scheduler.on_tick(now) {
                    log::info!(
                        "Woke wearer ({:?}), next alarm {:?}",
                        reason,
                        scheduler.deadline()
                    );
                }
            }
            WorkerEvent::DeadlineChanged(now) => scheduler.on_deadline_changed(now),
        }
    }

    log::warn!("Worker channel closed - exiting worker task");
}
