//! Two-button input: debounced edge detection over sysfs GPIO lines.
//!
//! The [`Debouncer`] is pure state-plus-clock logic so it can be tested
//! without hardware; [`ButtonPad`] wraps it around the physical lines and
//! runs the sampling loop on its own thread.

use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use linux_embedded_hal::sysfs_gpio::{Direction, Pin};

use crate::app::Event;

/// Minimum gap between accepted presses of the same button.
const DEBOUNCE_DELAY: Duration = Duration::from_millis(50);

/// Sampling cadence of the button worker.
const SAMPLE_INTERVAL: Duration = Duration::from_millis(10);

/// Which of the two panel buttons fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonId {
    /// Cycle selection
    A,
    /// Confirm selection
    B,
}

#[derive(Debug, Default)]
struct LineState {
    pressed: bool,
    last_accepted: Option<Instant>,
}

impl LineState {
    /// Accept a released-to-pressed transition outside the debounce window.
    fn accept(&mut self, now: Instant, pressed: bool) -> bool {
        let edge = pressed
            && !self.pressed
            && self
                .last_accepted
                .map_or(true, |t| now.duration_since(t) > DEBOUNCE_DELAY);
        if edge {
            self.last_accepted = Some(now);
        }
        self.pressed = pressed;
        edge
    }
}

/// Debounced press-edge detector for both buttons.
#[derive(Debug, Default)]
pub struct Debouncer {
    a: LineState,
    b: LineState,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample of both logical levels (true = pressed).
    ///
    /// Returns at most one edge; A wins when both fire in the same sample.
    /// B is left untouched in that case so its held press still edges on
    /// the following sample instead of being swallowed.
    pub fn update(&mut self, now: Instant, a_pressed: bool, b_pressed: bool) -> Option<ButtonId> {
        if self.a.accept(now, a_pressed) {
            return Some(ButtonId::A);
        }
        if self.b.accept(now, b_pressed) {
            return Some(ButtonId::B);
        }
        None
    }
}

/// The two physical panel buttons.
pub struct ButtonPad {
    a: Pin,
    b: Pin,
    debouncer: Debouncer,
}

impl ButtonPad {
    pub fn new(a_gpio: u64, b_gpio: u64) -> Result<Self> {
        Ok(Self {
            a: init_input_pin(a_gpio)
                .with_context(|| format!("initializing button A on GPIO {a_gpio}"))?,
            b: init_input_pin(b_gpio)
                .with_context(|| format!("initializing button B on GPIO {b_gpio}"))?,
            debouncer: Debouncer::new(),
        })
    }

    /// Sample both lines once. Lines are active low with hardware pull-ups;
    /// a failed read counts as released, so a dead line never edges.
    fn poll(&mut self) -> Option<ButtonId> {
        let a_pressed = self.a.get_value().map(|v| v == 0).unwrap_or(false);
        let b_pressed = self.b.get_value().map(|v| v == 0).unwrap_or(false);
        self.debouncer.update(Instant::now(), a_pressed, b_pressed)
    }

    /// Spawn the sampling loop, forwarding press edges into the event queue.
    pub fn spawn(mut self, tx: Sender<Event>) -> JoinHandle<()> {
        thread::spawn(move || loop {
            if let Some(button) = self.poll() {
                tracing::debug!("Button {:?} pressed", button);
                if tx.send(Event::Button(button)).is_err() {
                    return;
                }
            }
            thread::sleep(SAMPLE_INTERVAL);
        })
    }
}

fn init_input_pin(gpio: u64) -> Result<Pin> {
    let pin = Pin::new(gpio);
    pin.export()?;
    // sysfs needs a moment between export and direction change
    thread::sleep(Duration::from_millis(10));
    pin.set_direction(Direction::In)?;
    Ok(pin)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_press_edge_fires_once() {
        let mut d = Debouncer::new();
        let t0 = Instant::now();
        assert_eq!(d.update(t0, true, false), Some(ButtonId::A));
        // held down: no repeat
        assert_eq!(d.update(t0 + ms(10), true, false), None);
        assert_eq!(d.update(t0 + ms(20), true, false), None);
    }

    #[test]
    fn test_release_never_fires() {
        let mut d = Debouncer::new();
        let t0 = Instant::now();
        d.update(t0, true, false);
        assert_eq!(d.update(t0 + ms(100), false, false), None);
    }

    #[test]
    fn test_bounce_within_window_suppressed() {
        let mut d = Debouncer::new();
        let t0 = Instant::now();
        assert_eq!(d.update(t0, true, false), Some(ButtonId::A));
        assert_eq!(d.update(t0 + ms(10), false, false), None);
        // re-press inside the 50 ms window: bounce, swallowed
        assert_eq!(d.update(t0 + ms(20), true, false), None);
        assert_eq!(d.update(t0 + ms(30), false, false), None);
        // next press after the window is a real one
        assert_eq!(d.update(t0 + ms(100), true, false), Some(ButtonId::A));
    }

    #[test]
    fn test_a_wins_simultaneous_edges() {
        let mut d = Debouncer::new();
        let t0 = Instant::now();
        assert_eq!(d.update(t0, true, true), Some(ButtonId::A));
    }

    #[test]
    fn test_simultaneous_b_press_fires_next_sample() {
        let mut d = Debouncer::new();
        let t0 = Instant::now();
        // A takes the tied sample, the still-held B edges on the next one
        assert_eq!(d.update(t0, true, true), Some(ButtonId::A));
        assert_eq!(d.update(t0 + ms(10), true, true), Some(ButtonId::B));
        // both held from here on: no repeats
        assert_eq!(d.update(t0 + ms(20), true, true), None);
    }

    #[test]
    fn test_buttons_debounce_independently() {
        let mut d = Debouncer::new();
        let t0 = Instant::now();
        assert_eq!(d.update(t0, true, false), Some(ButtonId::A));
        // B edging inside A's window is still accepted
        assert_eq!(d.update(t0 + ms(10), true, true), Some(ButtonId::B));
    }
}
