// SmartWake - Haptic Motor Driver
//
// GPIO-driven vibration motor. While the motor runs, the shared `vibrating`
// flag is raised so the sensor task can tag (and the aggregator drop) the
// readings it contaminates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};

use smartwake::alarm::{PulsePattern, SINGLE_PULSE};

pub struct HapticDriver<'d> {
    pin: PinDriver<'d, AnyOutputPin, Output>,
    vibrating: Arc<AtomicBool>,
}

impl<'d> HapticDriver<'d> {
    pub fn new(pin: PinDriver<'d, AnyOutputPin, Output>, vibrating: Arc<AtomicBool>) -> Self {
        Self { pin, vibrating }
    }

    /// Single short pulse - tactile feedback for button clicks.
    pub fn trigger(&mut self) {
        self.play(SINGLE_PULSE);
    }

    /// Play alternating on/off segments (blocks the calling thread).
    pub fn play(&mut self, pattern: PulsePattern) {
        self.vibrating.store(true, Ordering::SeqCst);
        for (i, &ms) in pattern.iter().enumerate() {
            if i % 2 == 0 {
                let _ = self.pin.set_high();
            } else {
                let _ = self.pin.set_low();
            }
            thread::sleep(Duration::from_millis(ms as u64));
        }
        let _ = self.pin.set_low();
        self.vibrating.store(false, Ordering::SeqCst);
    }
}
