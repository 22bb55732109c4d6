// SmartWake - Button Input Manager
//
// Debounced button handler with click and long-press detection. Designed to
// be polled at ~100 Hz from the alarm task.

use std::sync::mpsc::Sender;
use std::time::Instant;

use esp_idf_hal::gpio::{AnyInputPin, Input, PinDriver};

use smartwake::config::*;
use smartwake::events::AlarmEvent;

pub struct InputManager<'d> {
    pin: PinDriver<'d, AnyInputPin, Input>,
    alarm_tx: Sender<AlarmEvent>,

    // Debounce state
    last_raw: bool,
    last_debounce: Instant,

    // Press tracking
    press_start: Option<Instant>,
    button_down: bool,
}

impl<'d> InputManager<'d> {
    pub fn new(pin: PinDriver<'d, AnyInputPin, Input>, alarm_tx: Sender<AlarmEvent>) -> Self {
        Self {
            pin,
            alarm_tx,
            last_raw: true, // pull-up → idle HIGH
            last_debounce: Instant::now(),
            press_start: None,
            button_down: false,
        }
    }

    /// Call every ~10 ms from the alarm task loop.
    pub fn update(&mut self) {
        let current = self.pin.is_high(); // true = released (pull-up)
        let now = Instant::now();

        // ---- debounce filter ----
        if current != self.last_raw {
            self.last_debounce = now;
        }
        self.last_raw = current;

        let stable_ms = now.duration_since(self.last_debounce).as_millis() as u64;
        if stable_ms < DEBOUNCE_MS {
            return;
        }

        let pressed = !current; // active LOW

        if pressed && !self.button_down {
            self.button_down = true;
            self.press_start = Some(now);
        }

        if !pressed && self.button_down {
            self.button_down = false;
            let hold_ms = self
                .press_start
                .take()
                .map(|t| now.duration_since(t).as_millis() as u64)
                .unwrap_or(0);

            let event = if hold_ms >= LONG_PRESS_MS {
                AlarmEvent::ButtonLongPress
            } else {
                AlarmEvent::ButtonClick
            };
            let _ = self.alarm_tx.send(event);
        }
    }
}
