//! Hysteresis filter for a noisy digital input.

use embedded_hal::digital::InputPin;

/// Debounced view of one input line.
///
/// A new level is accepted only after it disagreed with the current stable
/// level for more than `debounce_samples` consecutive samples; any agreeing
/// sample restarts the count.
#[derive(Debug)]
pub struct Debouncer<P> {
    pin: P,
    debounce_samples: u16,
    counter: u16,
    debounced_value: bool,
}

impl<P: InputPin> Debouncer<P> {
    /// Creates a debouncer whose stable level starts at the pin's current level.
    ///
    /// # Errors
    /// Returns the pin's error if the initial read fails.
    pub fn new(mut pin: P, debounce_samples: u16) -> Result<Self, P::Error> {
        let debounced_value = pin.is_high()?;
        Ok(Self {
            pin,
            debounce_samples,
            counter: 0,
            debounced_value,
        })
    }

    /// Reads the line once and updates the stable level. Call once per loop iteration.
    ///
    /// # Errors
    /// Returns the pin's error if the read fails.
    pub fn sample(&mut self) -> Result<(), P::Error> {
        let value = self.pin.is_high()?;

        if value == self.debounced_value {
            self.counter = 0;
        } else if self.counter < self.debounce_samples {
            self.counter += 1;
        } else {
            self.debounced_value = value;
        }
        Ok(())
    }

    /// Last accepted stable level (`true` = high).
    #[must_use]
    pub fn get(&self) -> bool {
        self.debounced_value
    }

    /// Retunes the threshold. Takes effect on the next sample.
    pub fn set_debounce_samples(&mut self, samples: u16) {
        self.debounce_samples = samples;
    }

    /// Current threshold.
    #[must_use]
    pub fn debounce_samples(&self) -> u16 {
        self.debounce_samples
    }

    /// Gives the pin back.
    pub fn release(self) -> P {
        self.pin
    }
}
