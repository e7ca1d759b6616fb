//! DS1302 driver over a bit-banged 3-wire link.
//!
//! Every access is a framed transaction: chip-enable high, a command byte,
//! one data byte per register (eight for a clock burst), chip-enable low.
//! Bits are shifted least significant first. The chip samples the data line
//! on rising clock edges and drives it after falling edges, so reads switch
//! the data line to input once the command has been sent.
//!
//! The protocol has no acknowledgement or checksum. A disturbed transaction
//! simply yields a wrong value; only pin errors are reported.
//!
//! # Example
//!
//! ```rust,ignore
//! use leet_clock::{Config, Ds1302};
//!
//! let mut rtc = Ds1302::new(sclk, io, ce, delay);
//! rtc.init(&Config::default())?;
//!
//! let now = rtc.time()?;
//! let datetime = rtc.datetime()?;
//! ```

use chrono::NaiveDateTime;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin, PinState};
use paste::paste;

use crate::datetime::{
    convert_hours, convert_minutes, convert_seconds, date_value, hours_value, minutes_value,
    month_value, seconds_value, year_value, DS1302DateTime, DS1302DateTimeError, CLOCK_BURST_LEN,
};
use crate::time::{ClockValue, TimeKeeper};
use crate::{
    Command, Control, Date, Day, Direction, Hours, Minutes, Month, Register, Seconds,
    TimeRepresentation, TrickleCharger, Year, RAM_SIZE,
};

/// Delay before every clock edge, in microseconds.
const CLOCK_SETUP_US: u32 = 5;
/// Delay after every clock edge, in microseconds.
const CLOCK_HOLD_US: u32 = 10;
/// Delay after every chip-enable change, in microseconds.
const CHIP_ENABLE_US: u32 = 1;

/// A bidirectional data line.
///
/// The driver owns the line's direction: it switches to output before
/// shifting a command out and back to input when done.
pub trait IoPin: InputPin + OutputPin {
    /// Turns the line into an input.
    fn set_as_input(&mut self) -> Result<(), Self::Error>;
    /// Turns the line into an output.
    fn set_as_output(&mut self) -> Result<(), Self::Error>;
}

/// Settings applied by [`Ds1302::init`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Trickle charger setting, `None` leaves the register untouched
    pub trickle_charger: Option<TrickleCharger>,
}

/// Error type for DS1302 operations.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// A pin operation failed
    Pin(E),
    /// Date/time registers could not be converted
    DateTime(DS1302DateTimeError),
    /// RAM index outside `0..RAM_SIZE`
    InvalidRamAddress(u8),
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::Pin(e)
    }
}

/// DS1302 Real-Time Clock driver.
///
/// Owns the clock, data, and chip-enable lines plus a delay source for the
/// bit timing. Nothing is cached: every call is a live transaction.
pub struct Ds1302<SCLK, IO, CE, D> {
    sclk: SCLK,
    io: IO,
    ce: CE,
    delay: D,
}

impl<SCLK, IO, CE, D, E> Ds1302<SCLK, IO, CE, D>
where
    SCLK: OutputPin<Error = E>,
    IO: IoPin<Error = E>,
    CE: OutputPin<Error = E>,
    D: DelayNs,
{
    /// Creates a new driver instance. No pin is touched until [`Ds1302::init`].
    ///
    /// # Arguments
    /// * `sclk` - Serial clock output
    /// * `io` - Bidirectional data line
    /// * `ce` - Chip enable output
    /// * `delay` - Busy-wait delay for the bit timing
    pub fn new(sclk: SCLK, io: IO, ce: CE, delay: D) -> Self {
        Self {
            sclk,
            io,
            ce,
            delay,
        }
    }

    /// Brings the chip into a usable state.
    ///
    /// Clears write protection (otherwise every later write is silently
    /// ignored), clears the clock-halt flag so the oscillator runs, and
    /// switches the hours register to 24-hour mode keeping the hour digits.
    ///
    /// # Errors
    /// Returns `Error::Pin` if any line operation fails.
    pub fn init(&mut self, config: &Config) -> Result<(), Error<E>> {
        self.sclk.set_low()?;
        self.io.set_low()?;
        self.ce.set_low()?;
        self.io.set_as_input()?;

        self.set_control_register(Control::default())?;

        let mut seconds = self.seconds_register()?;
        debug!("DS1302: seconds register {}", u8::from(seconds));
        seconds.set_clock_halt(false);
        self.set_seconds_register(seconds)?;

        let mut hours = self.hours_register()?;
        debug!("DS1302: hours register {}", u8::from(hours));
        hours.set_time_representation(TimeRepresentation::TwentyFourHour);
        self.set_hours_register(hours)?;

        if let Some(trickle_charger) = config.trickle_charger {
            debug!("DS1302: trickle charger {}", u8::from(trickle_charger));
            self.set_trickle_charger_register(trickle_charger)?;
        }
        Ok(())
    }

    /// Gives the lines and the delay back.
    pub fn release(self) -> (SCLK, IO, CE, D) {
        (self.sclk, self.io, self.ce, self.delay)
    }

    fn clk(&mut self, level: bool) -> Result<(), E> {
        self.delay.delay_us(CLOCK_SETUP_US);
        self.sclk.set_state(PinState::from(level))?;
        self.delay.delay_us(CLOCK_HOLD_US);
        Ok(())
    }

    fn open_channel(&mut self) -> Result<(), E> {
        self.ce.set_high()?;
        self.delay.delay_us(CHIP_ENABLE_US);
        Ok(())
    }

    fn close_channel(&mut self) -> Result<(), E> {
        self.ce.set_low()?;
        self.delay.delay_us(CHIP_ENABLE_US);
        Ok(())
    }

    /// Shifts the command and then `data` out, every bit latched on a rising edge.
    fn write_transaction(&mut self, command: Command, data: &[u8]) -> Result<(), E> {
        trace!("DS1302: write {} {:?}", u8::from(command), data);
        self.open_channel()?;
        self.io.set_as_output()?;

        for byte in core::iter::once(u8::from(command)).chain(data.iter().copied()) {
            for bit in 0..8 {
                self.io.set_state(PinState::from((byte >> bit) & 1 == 1))?;
                self.clk(true)?;
                self.clk(false)?;
            }
        }

        self.io.set_low()?;
        self.io.set_as_input()?;
        self.close_channel()
    }

    /// Shifts the command out, then fills `data` with bits driven by the
    /// chip after each falling edge.
    fn read_transaction(&mut self, command: Command, data: &mut [u8]) -> Result<(), E> {
        self.open_channel()?;
        self.io.set_as_output()?;

        let command = u8::from(command);
        for bit in 0..8 {
            self.clk(false)?;
            self.io.set_state(PinState::from((command >> bit) & 1 == 1))?;
            self.clk(true)?;
        }

        self.io.set_low()?;
        self.io.set_as_input()?;

        for byte in data.iter_mut() {
            *byte = 0;
            for bit in 0..8 {
                self.clk(true)?;
                self.clk(false)?;
                if self.io.is_high()? {
                    *byte |= 1 << bit;
                }
            }
        }

        self.close_channel()?;
        trace!("DS1302: read {} {:?}", command, &*data);
        Ok(())
    }

    fn read_register(&mut self, register: Register) -> Result<u8, Error<E>> {
        let mut data = [0];
        self.read_transaction(Command::clock(register, Direction::Read), &mut data)?;
        Ok(data[0])
    }

    fn write_register(&mut self, register: Register, value: u8) -> Result<(), Error<E>> {
        self.write_transaction(Command::clock(register, Direction::Write), &[value])?;
        Ok(())
    }

    /// Seconds (0-59). The clock-halt flag is ignored.
    ///
    /// # Errors
    /// Returns `Error::Pin` if any line operation fails.
    pub fn seconds(&mut self) -> Result<u8, Error<E>> {
        Ok(seconds_value(self.seconds_register()?))
    }

    /// Writes the seconds register. This also restarts a halted clock.
    ///
    /// # Errors
    /// Returns `Error::DateTime` if `seconds` is above 59, `Error::Pin` if any
    /// line operation fails.
    pub fn set_seconds(&mut self, seconds: u8) -> Result<(), Error<E>> {
        let value = convert_seconds(u32::from(seconds)).map_err(Error::DateTime)?;
        self.set_seconds_register(value)
    }

    /// Minutes (0-59).
    ///
    /// # Errors
    /// Returns `Error::Pin` if any line operation fails.
    pub fn minutes(&mut self) -> Result<u8, Error<E>> {
        Ok(minutes_value(self.minutes_register()?))
    }

    /// Writes the minutes register.
    ///
    /// # Errors
    /// Returns `Error::DateTime` if `minutes` is above 59, `Error::Pin` if any
    /// line operation fails.
    pub fn set_minutes(&mut self, minutes: u8) -> Result<(), Error<E>> {
        let value = convert_minutes(u32::from(minutes)).map_err(Error::DateTime)?;
        self.set_minutes_register(value)
    }

    /// Hour of day (0-23), decoded from either register format.
    ///
    /// # Errors
    /// Returns `Error::Pin` if any line operation fails.
    pub fn hours(&mut self) -> Result<u8, Error<E>> {
        Ok(hours_value(self.hours_register()?))
    }

    /// Writes the hours register in 24-hour format.
    ///
    /// # Errors
    /// Returns `Error::DateTime` if `hours` is above 23, `Error::Pin` if any
    /// line operation fails.
    pub fn set_hours(&mut self, hours: u8) -> Result<(), Error<E>> {
        let value = convert_hours(u32::from(hours), TimeRepresentation::TwentyFourHour)
            .map_err(Error::DateTime)?;
        self.set_hours_register(value)
    }

    /// Day of month (1-31).
    ///
    /// # Errors
    /// Returns `Error::Pin` if any line operation fails.
    pub fn day_of_month(&mut self) -> Result<u8, Error<E>> {
        Ok(date_value(self.date_register()?))
    }

    /// Month (1-12).
    ///
    /// # Errors
    /// Returns `Error::Pin` if any line operation fails.
    pub fn month(&mut self) -> Result<u8, Error<E>> {
        Ok(month_value(self.month_register()?))
    }

    /// Day of week (1-7).
    ///
    /// # Errors
    /// Returns `Error::Pin` if any line operation fails.
    pub fn day_of_week(&mut self) -> Result<u8, Error<E>> {
        Ok(self.day_register()?.day())
    }

    /// Full year, 2000-2099.
    ///
    /// # Errors
    /// Returns `Error::Pin` if any line operation fails.
    pub fn year(&mut self) -> Result<u16, Error<E>> {
        Ok(year_value(self.year_register()?))
    }

    /// True while the oscillator runs (clock-halt flag clear).
    ///
    /// # Errors
    /// Returns `Error::Pin` if any line operation fails.
    pub fn is_running(&mut self) -> Result<bool, Error<E>> {
        Ok(!self.seconds_register()?.clock_halt())
    }

    /// Starts or halts the oscillator, keeping the seconds.
    ///
    /// # Errors
    /// Returns `Error::Pin` if any line operation fails.
    pub fn set_running(&mut self, running: bool) -> Result<(), Error<E>> {
        let mut seconds = self.seconds_register()?;
        seconds.set_clock_halt(!running);
        self.set_seconds_register(seconds)
    }

    /// Enables or disables write protection of all other registers.
    ///
    /// # Errors
    /// Returns `Error::Pin` if any line operation fails.
    pub fn set_write_protect(&mut self, protect: bool) -> Result<(), Error<E>> {
        let mut control = Control::default();
        control.set_write_protect(protect);
        self.set_control_register(control)
    }

    /// Reads the current date and time with one clock burst.
    ///
    /// # Errors
    /// Returns `Error::DateTime` if the registers do not hold a valid date,
    /// `Error::Pin` if any line operation fails.
    pub fn datetime(&mut self) -> Result<NaiveDateTime, Error<E>> {
        let mut data = [0; CLOCK_BURST_LEN];
        self.read_transaction(
            Command::clock(Register::ClockBurst, Direction::Read),
            &mut data,
        )?;
        let raw = DS1302DateTime::from(data);
        if raw.clock_halted() {
            debug!("DS1302: clock halted");
        }
        raw.into_datetime().map_err(Error::DateTime)
    }

    /// Sets date and time with one clock burst. Also starts the clock and
    /// leaves writes enabled.
    ///
    /// # Errors
    /// Returns `Error::DateTime` if `datetime` is outside 2000-2099,
    /// `Error::Pin` if any line operation fails.
    pub fn set_datetime(&mut self, datetime: &NaiveDateTime) -> Result<(), Error<E>> {
        let raw = DS1302DateTime::from_datetime(datetime, TimeRepresentation::TwentyFourHour)
            .map_err(Error::DateTime)?;
        let data: [u8; CLOCK_BURST_LEN] = (&raw).into();
        self.write_transaction(
            Command::clock(Register::ClockBurst, Direction::Write),
            &data,
        )?;
        Ok(())
    }

    /// Reads one byte of battery-backed RAM.
    ///
    /// # Errors
    /// Returns `Error::InvalidRamAddress` if `index` is not below [`RAM_SIZE`],
    /// `Error::Pin` if any line operation fails.
    pub fn read_ram(&mut self, index: u8) -> Result<u8, Error<E>> {
        if index >= RAM_SIZE {
            return Err(Error::InvalidRamAddress(index));
        }
        let mut data = [0];
        self.read_transaction(Command::ram(index, Direction::Read), &mut data)?;
        Ok(data[0])
    }

    /// Writes one byte of battery-backed RAM.
    ///
    /// # Errors
    /// Returns `Error::InvalidRamAddress` if `index` is not below [`RAM_SIZE`],
    /// `Error::Pin` if any line operation fails.
    pub fn write_ram(&mut self, index: u8, value: u8) -> Result<(), Error<E>> {
        if index >= RAM_SIZE {
            return Err(Error::InvalidRamAddress(index));
        }
        self.write_transaction(Command::ram(index, Direction::Write), &[value])?;
        Ok(())
    }
}

// Raw register access
macro_rules! impl_register_access {
    ($(($name:ident, $register:expr, $typ:ty)),+) => {
        impl<SCLK, IO, CE, D, E> Ds1302<SCLK, IO, CE, D>
        where
            SCLK: OutputPin<Error = E>,
            IO: IoPin<Error = E>,
            CE: OutputPin<Error = E>,
            D: DelayNs,
        {
            $(
                paste! {
                    #[doc = concat!("Reads the raw ", stringify!($name), " register.")]
                    #[doc = "\n\n# Errors"]
                    #[doc = "Returns `Error::Pin` if any line operation fails."]
                    pub fn [<$name _register>](&mut self) -> Result<$typ, Error<E>> {
                        Ok(<$typ>::from(self.read_register($register)?))
                    }

                    #[doc = concat!("Writes the raw ", stringify!($name), " register.")]
                    #[doc = "\n\n# Errors"]
                    #[doc = "Returns `Error::Pin` if any line operation fails."]
                    pub fn [<set_ $name _register>](
                        &mut self,
                        value: $typ,
                    ) -> Result<(), Error<E>> {
                        self.write_register($register, value.into())
                    }
                }
            )+
        }
    }
}

impl_register_access!(
    (seconds, Register::Seconds, Seconds),
    (minutes, Register::Minutes, Minutes),
    (hours, Register::Hours, Hours),
    (date, Register::Date, Date),
    (month, Register::Month, Month),
    (day, Register::Day, Day),
    (year, Register::Year, Year),
    (control, Register::Control, Control),
    (trickle_charger, Register::TrickleCharger, TrickleCharger)
);

impl<SCLK, IO, CE, D, E> TimeKeeper for Ds1302<SCLK, IO, CE, D>
where
    SCLK: OutputPin<Error = E>,
    IO: IoPin<Error = E>,
    CE: OutputPin<Error = E>,
    D: DelayNs,
{
    type Error = Error<E>;

    /// Reads hours, minutes, and seconds as three separate transactions.
    fn time(&mut self) -> Result<ClockValue, Self::Error> {
        Ok(ClockValue::new(self.hours()?, self.minutes()?, self.seconds()?))
    }

    /// Writes hours, minutes, and seconds as three separate transactions.
    fn set_time(&mut self, time: &ClockValue) -> Result<(), Self::Error> {
        debug!("DS1302: set time {}:{}:{}", time.hours, time.minutes, time.seconds);
        self.set_hours(time.hours)?;
        self.set_minutes(time.minutes)?;
        self.set_seconds(time.seconds)
    }
}
