//! Self-calibrating loop timebase.
//!
//! The polling loop has no hardware timer, so its speed is measured against
//! the RTC: [`LoopCalibrator::calibrate`] is fed the time read in every
//! iteration and counts how many iterations fit between two changes of the
//! seconds field. That count converts milliseconds into iteration counts
//! ([`Timebase`]) and drives the blink primitive [`LoopCalibrator::lit`].

use crate::time::ClockValue;

/// Counts loop iterations per RTC second.
#[derive(Clone, Debug, Default)]
pub struct LoopCalibrator {
    cycles_per_second: u32,
    cycles: u32,
    prev_seconds: Option<u8>,
}

impl LoopCalibrator {
    /// Creates an uncalibrated calibrator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cycles_per_second: 0,
            cycles: 0,
            prev_seconds: None,
        }
    }

    /// Returns to the uncalibrated state.
    ///
    /// Needed after the RTC time was changed: the running second is no
    /// longer a whole second.
    pub fn reset(&mut self) {
        debug!("calibrator: reset");
        *self = Self::new();
    }

    /// Call exactly once per loop iteration with the time read in that iteration.
    pub fn calibrate(&mut self, now: &ClockValue) {
        self.cycles = self.cycles.saturating_add(1);

        match self.prev_seconds {
            // First observation after reset: nothing to compare against yet.
            None => {
                self.cycles = 0;
                self.prev_seconds = Some(now.seconds);
            }
            Some(prev) if prev != now.seconds => {
                if self.cycles_per_second == 0 {
                    debug!("calibrator: {} cycles per second", self.cycles);
                }
                self.cycles_per_second = self.cycles;
                self.cycles = 0;
                self.prev_seconds = Some(now.seconds);
            }
            Some(_) => {}
        }
    }

    /// True once a second boundary has been observed since the last reset.
    #[must_use]
    pub const fn calibrated(&self) -> bool {
        self.cycles_per_second > 0
    }

    /// Loop iterations counted during the last full second, 0 when uncalibrated.
    #[must_use]
    pub const fn cycles_per_second(&self) -> u32 {
        self.cycles_per_second
    }

    /// Iterations counted since the last second boundary.
    #[must_use]
    pub const fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Conversion service for the current calibration, `None` when uncalibrated.
    #[must_use]
    pub const fn timebase(&self) -> Option<Timebase> {
        if self.calibrated() {
            Some(Timebase {
                cycles_per_second: self.cycles_per_second,
            })
        } else {
            None
        }
    }

    /// Blink primitive.
    ///
    /// Splits the current second into `modulo` equal sub-periods and returns
    /// true during the even ones, so `lit(2)` is on for the first half of
    /// every second. Returns true (steady on) while the sub-period length is
    /// zero, which covers the uncalibrated state.
    #[must_use]
    pub fn lit(&self, modulo: u8) -> bool {
        let period = match modulo {
            0 => 0,
            m => self.cycles_per_second / u32::from(m),
        };
        if period == 0 {
            return true;
        }
        (self.cycles / period) % 2 == 0
    }
}

/// Read-only "iterations per second" snapshot handed to the components
/// that convert durations.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timebase {
    cycles_per_second: u32,
}

impl Timebase {
    /// Wraps a measured iteration rate.
    #[must_use]
    pub const fn new(cycles_per_second: u32) -> Self {
        Self { cycles_per_second }
    }

    /// Loop iterations per second.
    #[must_use]
    pub const fn cycles_per_second(&self) -> u32 {
        self.cycles_per_second
    }

    /// Number of loop iterations that take `ms` milliseconds (rounded down).
    #[must_use]
    pub fn cycles_for_ms(&self, ms: u32) -> u32 {
        let cycles = u64::from(ms) * u64::from(self.cycles_per_second) / 1000;
        u32::try_from(cycles).unwrap_or(u32::MAX)
    }
}
