//! Firmware core for a four-digit seven-segment clock.
//!
//! The clock has no hardware timer: a single polling loop reads a DS1302
//! real-time clock over a bit-banged 3-wire link, measures its own speed
//! against the RTC's seconds field, and derives every duration (debounce
//! time, button hold units, beep length, blink rate) from that measurement.
//!
//! # Components
//!
//! - [`ClockValue`] - hours/minutes/seconds value type
//! - [`LoopCalibrator`] - loop iterations per RTC second, blink primitive
//! - [`Debouncer`] - hysteresis filter over one input line
//! - [`Switch`] - press-duration classifier on top of the debouncer
//! - [`Display`] - multiplexed 4-digit seven-segment driver
//! - [`Ds1302`] - DS1302 protocol driver
//! - [`Clock`] - the mode/state machine tying everything together
//!
//! All hardware lines are `embedded-hal` 1.0 pins handed to the component
//! that owns them, so every component can be driven by fakes on the host.
//!
//! # Example
//!
//! ```rust,ignore
//! use leet_clock::{Clock, ClockConfig, Config, Display, Ds1302};
//!
//! let mut rtc = Ds1302::new(sclk, io, ce, delay);
//! rtc.init(&Config::default())?;
//!
//! let display = Display::new(digit_pins, segment_pins, dp_pin)?;
//! let mut clock = Clock::new(ClockConfig::default(), rtc, button, display, buzzer, trigger)?;
//! clock.run()?;
//! ```
//!
//! # Features
//!
//! - `log` - debug logging through the `log` crate
//! - `defmt` - debug logging through `defmt`, and `defmt::Format` for public types
#![no_std]

// Logging macros. With neither backend enabled they only borrow their
// arguments so call sites compile identically in every configuration.
cfg_if::cfg_if! {
    if #[cfg(feature = "defmt")] {
        macro_rules! debug {
            ($($arg:tt)*) => { defmt::debug!($($arg)*) };
        }
        macro_rules! trace {
            ($($arg:tt)*) => { defmt::trace!($($arg)*) };
        }
    } else if #[cfg(feature = "log")] {
        macro_rules! debug {
            ($($arg:tt)*) => { log::debug!($($arg)*) };
        }
        macro_rules! trace {
            ($($arg:tt)*) => { log::trace!($($arg)*) };
        }
    } else {
        macro_rules! debug {
            ($fmt:literal $(, $arg:expr)* $(,)?) => {{
                let _ = ($( & $arg, )*);
            }};
        }
        macro_rules! trace {
            ($fmt:literal $(, $arg:expr)* $(,)?) => {{
                let _ = ($( & $arg, )*);
            }};
        }
    }
}

pub mod calibrator;
pub mod clock;
pub mod datetime;
pub mod debouncer;
pub mod display;
pub mod registers;
pub mod rtc;
pub mod switch;
pub mod time;

#[cfg(test)]
pub(crate) mod testing;

pub use calibrator::{LoopCalibrator, Timebase};
pub use clock::{
    Clock, ClockConfig, ClockError, ClockMode, DisplayMode, DisplayOverride, DisplayPrecision,
    SetupDigit,
};
pub use datetime::DS1302DateTimeError;
pub use debouncer::Debouncer;
pub use display::{Display, Glyph};
pub use registers::*;
pub use rtc::{Config, Ds1302, Error, IoPin};
pub use switch::Switch;
pub use time::{ClockValue, TimeKeeper};
