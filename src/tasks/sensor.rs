// SmartWake - Sensor Task
//
// Reads the accelerometer at 10 Hz while the scheduler has sampling enabled
// and forwards batches of readings to the worker. The MPU6050 sleeps the rest
// of the time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use smartwake::config::*;
use smartwake::events::{MotionReading, WorkerEvent};

use crate::drivers::imu::{Mpu6050, SharedBus};

const IDLE_POLL_MS: u64 = 1000;

pub fn sensor_task(
    bus: SharedBus,
    worker_tx: Sender<WorkerEvent>,
    sampling: Arc<AtomicBool>,
    vibrating: Arc<AtomicBool>,
) {
    log::info!("Sensor task started");

    let imu = Mpu6050::new(bus);
    if let Err(e) = imu.init() {
        log::error!("MPU6050 init failed in sensor task: {}", e);
        return;
    }

    let interval = Duration::from_millis(SENSOR_SAMPLE_INTERVAL_MS);
    let mut awake = false;
    let mut batch: Vec<MotionReading> = Vec::with_capacity(READINGS_PER_BATCH);

    loop {
        let wanted = sampling.load(Ordering::SeqCst);
        if wanted != awake {
            match imu.set_sleep(!wanted) {
                Ok(()) => {
                    awake = wanted;
                    batch.clear();
                    log::info!("Accelerometer {}", if awake { "ON" } else { "OFF" });
                }
                Err(e) => log::warn!("IMU power change failed: {}", e),
            }
        }

        if !awake {
            thread::sleep(Duration::from_millis(IDLE_POLL_MS));
            continue;
        }

        let tick_start = Instant::now();

        match imu.read_motion() {
            Ok(mut reading) => {
                reading.vibrating = vibrating.load(Ordering::SeqCst);
                batch.push(reading);
            }
            Err(e) => log::warn!("IMU read error: {}", e),
        }

        if batch.len() >= READINGS_PER_BATCH {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(READINGS_PER_BATCH));
            if worker_tx.send(WorkerEvent::MotionBatch(full)).is_err() {
                // Receiver dropped - worker has exited. Shut down cleanly.
                log::warn!("Worker channel closed - exiting sensor task");
                return;
            }
        }

        // Sleep for the remainder of the sampling interval to maintain 10 Hz.
        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }
}
