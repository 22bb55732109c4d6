// SmartWake - Firmware Entry Point
//
// Boot sequence:
//   1. Open NVS and make sure an alarm time exists.
//   2. Bring up the shared I2C bus and check the MPU6050.
//   3. Spawn sensor, clock, worker, and alarm tasks.
//
// The accelerometer stays asleep until the worker decides the wearer is
// close enough to the alarm to start recording.
//
// Nothing here sets the wall clock: there is no RTC and no network for
// SNTP, so `Local::now()` counts from the epoch at power-on until the time
// is written through `settimeofday` by whatever provisions the device.
// Alarm deadlines are only meaningful once that has happened.

mod drivers;
mod input;
mod tasks;

use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use esp_idf_hal::gpio::{AnyInputPin, AnyOutputPin, Input, InputPin, Output, OutputPin, PinDriver};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::prelude::*;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use smartwake::config::*;
use smartwake::settings::{self, AlarmStore};

use crate::drivers::haptic::HapticDriver;
use crate::drivers::imu::Mpu6050;
use crate::drivers::nvs::NvsAlarmStore;
use crate::tasks::alarm::AlarmTaskIo;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------
fn main() -> anyhow::Result<()> {
    // Link esp-idf-sys runtime patches and initialise logging.
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("SmartWake firmware starting…");

    // ---- Peripherals ------------------------------------------------------
    let peripherals = Peripherals::take()?;

    // ---- Settings ---------------------------------------------------------
    let nvs_partition = EspDefaultNvsPartition::take()?;
    let mut boot_store = NvsAlarmStore::open(nvs_partition.clone())?;
    let alarm_time = settings::ensure_alarm_time(&mut boot_store)?;
    log::info!(
        "Alarm set to {} ({})",
        alarm_time,
        if boot_store.alarm_enabled().unwrap_or(false) {
            "enabled"
        } else {
            "disabled"
        }
    );

    // ---- I2C bus ----------------------------------------------------------
    let i2c_config = I2cConfig::new().baudrate(400u32.kHz().into());
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio6, // SDA
        peripherals.pins.gpio7, // SCL
        &i2c_config,
    )?;
    // SAFETY: The I2C peripheral is a singleton obtained from `Peripherals::take()`.
    // It will live for the entire programme duration (embedded firmware never exits).
    let i2c_bus: &'static Mutex<I2cDriver<'static>> =
        Box::leak(Box::new(Mutex::new(unsafe { core::mem::transmute(i2c) })));

    // ---- Component self-test ----------------------------------------------
    let imu_ok = Mpu6050::new(i2c_bus).is_connected();
    if !imu_ok {
        log::error!("Boot check FAILED - IMU not responding");
        // Continue anyway: the alarm still rings at the set time.
    }

    // ---- Channels ---------------------------------------------------------
    let (worker_tx, worker_rx) = mpsc::channel();
    let (alarm_tx, alarm_rx) = mpsc::channel();

    // ---- Shared state -----------------------------------------------------
    let sampling = Arc::new(AtomicBool::new(false));
    let vibrating = Arc::new(AtomicBool::new(false));

    // ---- Prepare GPIO handles for tasks -----------------------------------
    let button = PinDriver::input(peripherals.pins.gpio3.downgrade_input())?;
    configure_pullup(&button);
    // SAFETY: GPIO peripheral lives forever, same argument as I2C above.
    let button_static: PinDriver<'static, AnyInputPin, Input> =
        unsafe { core::mem::transmute(button) };

    let haptic_pin = PinDriver::output(peripherals.pins.gpio4.downgrade_output())?;
    let haptic_static: PinDriver<'static, AnyOutputPin, Output> =
        unsafe { core::mem::transmute(haptic_pin) };

    // ---- Spawn tasks (map to FreeRTOS tasks via std::thread) ---------------

    // Sensor task - tightest timing while recording.
    let sensor_tx = worker_tx.clone();
    let sensor_sampling = Arc::clone(&sampling);
    let sensor_vibrating = Arc::clone(&vibrating);
    thread::Builder::new()
        .name("sensor".into())
        .stack_size(STACK_SENSOR)
        .spawn(move || {
            tasks::sensor::sensor_task(i2c_bus, sensor_tx, sensor_sampling, sensor_vibrating);
        })?;

    // Clock task - minute ticks for the scheduler.
    let clock_tx = worker_tx.clone();
    thread::Builder::new()
        .name("clock".into())
        .stack_size(STACK_CLOCK)
        .spawn(move || {
            tasks::clock::clock_task(clock_tx);
        })?;

    // Worker task - owns the wake scheduler.
    let worker_store = NvsAlarmStore::open(nvs_partition.clone())?;
    let worker_alarm_tx = alarm_tx.clone();
    let worker_sampling = Arc::clone(&sampling);
    thread::Builder::new()
        .name("worker".into())
        .stack_size(STACK_WORKER)
        .spawn(move || {
            tasks::worker::worker_task(worker_store, worker_rx, worker_alarm_tx, worker_sampling);
        })?;

    // Alarm task (button + haptic)
    let io = AlarmTaskIo {
        button_pin: button_static,
        haptic: HapticDriver::new(haptic_static, Arc::clone(&vibrating)),
    };
    thread::Builder::new()
        .name("alarm".into())
        .stack_size(STACK_ALARM)
        .spawn(move || {
            tasks::alarm::alarm_task(io, boot_store, alarm_rx, alarm_tx, worker_tx);
        })?;

    // Main thread has nothing left to do - park it forever.
    loop {
        thread::sleep(Duration::from_secs(60));
    }
}

// ---------------------------------------------------------------------------
// Boot helpers
// ---------------------------------------------------------------------------

/// Configure internal pull-up on the button. `PinDriver::input` only sets
/// the direction, so the pull mode goes through the raw API.
fn configure_pullup(_pin: &PinDriver<'_, AnyInputPin, Input>) {
    unsafe {
        esp_idf_sys::gpio_set_pull_mode(
            PIN_BUTTON,
            esp_idf_sys::gpio_pull_mode_t_GPIO_PULLUP_ONLY,
        );
    }
}
