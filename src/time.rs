//! Time-of-day value type.
//!
//! [`ClockValue`] is the hours/minutes/seconds triple the whole firmware
//! passes around. It is read fresh from the RTC once per loop iteration;
//! setup mode keeps a second, mutable copy that is edited digit by digit and
//! written back when setup completes.

use chrono::{NaiveTime, Timelike};

/// Seconds in one day.
pub const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// Time of day with one-second resolution.
///
/// Fields are public so setup mode can edit them directly; call
/// [`ClockValue::sanitize`] (clamping) or [`ClockValue::update_modulo`]
/// (wrapping) to bring an edited value back into range.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockValue {
    /// Hours (0-23)
    pub hours: u8,
    /// Minutes (0-59)
    pub minutes: u8,
    /// Seconds (0-59)
    pub seconds: u8,
}

impl ClockValue {
    /// Midnight, 00:00:00.
    pub const MIDNIGHT: ClockValue = ClockValue::new(0, 0, 0);

    /// Creates a value from its fields without range checks.
    #[must_use]
    pub const fn new(hours: u8, minutes: u8, seconds: u8) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    /// Builds a value from seconds since midnight, wrapping at one day.
    #[must_use]
    pub const fn from_seconds_since_midnight(seconds: u32) -> Self {
        let seconds = seconds % SECONDS_PER_DAY;
        Self {
            hours: (seconds / 3600) as u8,
            minutes: ((seconds / 60) % 60) as u8,
            seconds: (seconds % 60) as u8,
        }
    }

    /// Seconds elapsed since midnight, `0..86400` for in-range values.
    #[must_use]
    pub const fn seconds_since_midnight(&self) -> u32 {
        self.seconds as u32 + 60 * self.minutes as u32 + 3600 * self.hours as u32
    }

    /// Clamps every field to its maximum (23:59:59).
    pub fn sanitize(&mut self) {
        self.hours = self.hours.min(23);
        self.minutes = self.minutes.min(59);
        self.seconds = self.seconds.min(59);
    }

    /// Wraps every field independently modulo its range.
    pub fn update_modulo(&mut self) {
        self.hours %= 24;
        self.minutes %= 60;
        self.seconds %= 60;
    }

    /// Copy of `self` after [`ClockValue::sanitize`].
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.sanitize();
        self
    }

    /// True when every field is in range.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.hours < 24 && self.minutes < 60 && self.seconds < 60
    }

    /// The same time of day as a chrono `NaiveTime`, `None` when out of range.
    #[must_use]
    pub fn to_naive_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(
            u32::from(self.hours),
            u32::from(self.minutes),
            u32::from(self.seconds),
        )
    }
}

impl From<NaiveTime> for ClockValue {
    fn from(time: NaiveTime) -> Self {
        // A leap second shows up as second 59 with nanoseconds >= 1e9.
        Self::from_seconds_since_midnight(time.num_seconds_from_midnight())
    }
}

impl core::fmt::Display for ClockValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// Source of wall-clock time for the clock state machine.
///
/// Implemented by [`crate::Ds1302`]; tests substitute a fake.
pub trait TimeKeeper {
    /// Error reported by the underlying transport.
    type Error;

    /// Reads the current time of day.
    fn time(&mut self) -> Result<ClockValue, Self::Error>;

    /// Sets the current time of day.
    fn set_time(&mut self, time: &ClockValue) -> Result<(), Self::Error>;
}
