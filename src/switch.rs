//! Push-button press-duration classifier.
//!
//! Converts how long the (active-low) button has been held into
//! "duration units": a press shorter than one threshold is length 1, every
//! further threshold crossed adds one. Two read-once latches report the
//! length reached by the press still in progress and the final length of the
//! press that just ended.

use embedded_hal::digital::InputPin;

use crate::debouncer::Debouncer;

/// Debounced button with press-length reporting.
#[derive(Debug)]
pub struct Switch<P> {
    debouncer: Debouncer<P>,
    threshold_samples: u32,
    counter: u32,
    current_press_length: u8,
    current_press_length_prev: u8,
    last_press_length: u8,
    waiting_for_release: bool,
}

impl<P: InputPin> Switch<P> {
    /// Creates a switch on an active-low input.
    ///
    /// # Arguments
    /// * `pin` - The button input, low while pressed
    /// * `threshold_samples` - Samples per duration unit
    /// * `debounce_samples` - Samples a level change must persist
    ///
    /// # Errors
    /// Returns the pin's error if the initial read fails.
    pub fn new(pin: P, threshold_samples: u32, debounce_samples: u16) -> Result<Self, P::Error> {
        Ok(Self {
            debouncer: Debouncer::new(pin, debounce_samples)?,
            threshold_samples,
            counter: 0,
            current_press_length: 0,
            current_press_length_prev: 0,
            last_press_length: 0,
            waiting_for_release: false,
        })
    }

    /// Clears every counter and ignores the button until it is seen released.
    ///
    /// Used when a hold has been consumed as an action so the same hold
    /// cannot trigger a second one.
    pub fn reset_press_state(&mut self) {
        self.counter = 0;
        self.current_press_length = 0;
        self.current_press_length_prev = 0;
        self.last_press_length = 0;
        self.waiting_for_release = true;
    }

    /// Samples the button. Call once per loop iteration.
    ///
    /// # Errors
    /// Returns the pin's error if the read fails.
    pub fn sample(&mut self) -> Result<(), P::Error> {
        self.debouncer.sample()?;

        let pressed = !self.debouncer.get();

        if !pressed {
            self.waiting_for_release = false;
        }

        if self.waiting_for_release {
            return Ok(());
        }

        if pressed {
            self.counter = self.counter.saturating_add(1);

            let length = clamp_length(self.push_length());
            if length > self.current_press_length_prev {
                self.current_press_length_prev = length;
                self.current_press_length = length;
            }
        } else {
            self.current_press_length_prev = 0;
            self.current_press_length = 0;
            self.last_press_length = clamp_length(self.push_length());
            self.counter = 0;
        }
        Ok(())
    }

    /// Live length of the press in progress, 0 while released.
    ///
    /// Not a latch: only meant for feedback while the button is down.
    #[must_use]
    pub fn push_length(&self) -> u32 {
        if self.counter > 0 {
            self.counter / self.threshold_samples.max(1) + 1
        } else {
            0
        }
    }

    /// Duration unit just reached by the press in progress, then 0 until the
    /// next unit is reached.
    pub fn report_current_press_length(&mut self) -> u8 {
        core::mem::take(&mut self.current_press_length)
    }

    /// Final length of the last finished press, then 0 until the next release.
    pub fn report_last_press_length(&mut self) -> u8 {
        core::mem::take(&mut self.last_press_length)
    }

    /// Sets the number of samples per duration unit.
    pub fn set_threshold_samples(&mut self, samples: u32) {
        self.threshold_samples = samples;
    }

    /// Sets the debouncer threshold.
    pub fn set_debounce_samples(&mut self, samples: u16) {
        self.debouncer.set_debounce_samples(samples);
    }

    /// Samples per duration unit.
    #[must_use]
    pub fn threshold_samples(&self) -> u32 {
        self.threshold_samples
    }

    /// Debouncer threshold.
    #[must_use]
    pub fn debounce_samples(&self) -> u16 {
        self.debouncer.debounce_samples()
    }

    /// True while the button has to be released before presses count again.
    #[must_use]
    pub fn waiting_for_release(&self) -> bool {
        self.waiting_for_release
    }
}

fn clamp_length(length: u32) -> u8 {
    u8::try_from(length).unwrap_or(u8::MAX)
}
