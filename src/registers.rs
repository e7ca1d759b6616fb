//! Register definitions and bitfield structures for the DS1302 RTC.
//!
//! This module contains the register map, the command byte layout, and
//! bitfield definitions for every clock register of the DS1302.

use bitfield::bitfield;

/// Number of general-purpose battery-backed RAM bytes.
pub const RAM_SIZE: u8 = 31;

/// Register indices of the clock bank (bits 5..1 of the command byte).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Seconds register (0-59) and clock-halt flag
    Seconds = 0,
    /// Minutes register (0-59)
    Minutes = 1,
    /// Hours register (1-12 + AM/PM or 0-23)
    Hours = 2,
    /// Date register (1-31)
    Date = 3,
    /// Month register (1-12)
    Month = 4,
    /// Day of week register (1-7)
    Day = 5,
    /// Year register (0-99)
    Year = 6,
    /// Control register (write-protect)
    Control = 7,
    /// Trickle charger register
    TrickleCharger = 8,
    /// Burst access to all eight clock registers
    ClockBurst = 31,
}
impl From<Register> for u8 {
    /// Converts a `Register` to its index.
    fn from(v: Register) -> Self {
        v as u8
    }
}

/// Storage bank selected by a command (bit 6).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bank {
    /// Clock/calendar registers
    Clock = 0,
    /// General-purpose RAM
    Ram = 1,
}
impl From<u8> for Bank {
    /// Creates a `Bank` from a raw register value.
    ///
    /// # Panics
    /// Panics if the value is not 0 or 1.
    fn from(v: u8) -> Self {
        match v {
            0 => Bank::Clock,
            1 => Bank::Ram,
            _ => panic!("Invalid value for Bank: {}", v),
        }
    }
}
impl From<Bank> for u8 {
    /// Converts a `Bank` to its raw register value.
    fn from(v: Bank) -> Self {
        v as u8
    }
}

/// Transfer direction selected by a command (bit 0).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Host writes data bytes after the command
    Write = 0,
    /// Chip drives data bytes after the command
    Read = 1,
}
impl From<u8> for Direction {
    /// Creates a `Direction` from a raw register value.
    ///
    /// # Panics
    /// Panics if the value is not 0 or 1.
    fn from(v: u8) -> Self {
        match v {
            0 => Direction::Write,
            1 => Direction::Read,
            _ => panic!("Invalid value for Direction: {}", v),
        }
    }
}
impl From<Direction> for u8 {
    /// Converts a `Direction` to its raw register value.
    fn from(v: Direction) -> Self {
        v as u8
    }
}

/// Time representation format for the DS1302.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeRepresentation {
    /// 24-hour format (0-23)
    TwentyFourHour = 0,
    /// 12-hour format (1-12 + AM/PM)
    TwelveHour = 1,
}
impl From<u8> for TimeRepresentation {
    /// Creates a `TimeRepresentation` from a raw register value.
    ///
    /// # Panics
    /// Panics if the value is not 0 or 1.
    fn from(v: u8) -> Self {
        match v {
            0 => TimeRepresentation::TwentyFourHour,
            1 => TimeRepresentation::TwelveHour,
            _ => panic!("Invalid value for TimeRepresentation: {}", v),
        }
    }
}
impl From<TimeRepresentation> for u8 {
    /// Converts a `TimeRepresentation` to its raw register value.
    fn from(v: TimeRepresentation) -> Self {
        v as u8
    }
}

/// Diode selection of the trickle charger (DS bits).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrickleDiodes {
    /// No diode selected, charger path open
    Disabled = 0b00,
    /// One diode in the charge path
    One = 0b01,
    /// Two diodes in the charge path
    Two = 0b10,
}
impl From<u8> for TrickleDiodes {
    /// Creates a `TrickleDiodes` from a raw register value; 0b11 also leaves the path open.
    fn from(v: u8) -> Self {
        match v {
            0b01 => TrickleDiodes::One,
            0b10 => TrickleDiodes::Two,
            _ => TrickleDiodes::Disabled,
        }
    }
}
impl From<TrickleDiodes> for u8 {
    /// Converts a `TrickleDiodes` to its raw register value.
    fn from(v: TrickleDiodes) -> Self {
        v as u8
    }
}

/// Resistor selection of the trickle charger (RS bits).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrickleResistor {
    /// No resistor selected, charger path open
    Disabled = 0b00,
    /// 2 kOhm
    R2k = 0b01,
    /// 4 kOhm
    R4k = 0b10,
    /// 8 kOhm
    R8k = 0b11,
}
impl From<u8> for TrickleResistor {
    /// Creates a `TrickleResistor` from a raw register value.
    fn from(v: u8) -> Self {
        match v & 0b11 {
            0b01 => TrickleResistor::R2k,
            0b10 => TrickleResistor::R4k,
            0b11 => TrickleResistor::R8k,
            _ => TrickleResistor::Disabled,
        }
    }
}
impl From<TrickleResistor> for u8 {
    /// Converts a `TrickleResistor` to its raw register value.
    fn from(v: TrickleResistor) -> Self {
        v as u8
    }
}

// This macro generates the From<u8> and Into<u8> implementations for the
// register type
macro_rules! from_register_u8 {
    ($typ:ty) => {
        impl From<u8> for $typ {
            fn from(v: u8) -> Self {
                paste::paste!([< $typ >](v))
            }
        }
        impl From<$typ> for u8 {
            fn from(v: $typ) -> Self {
                v.0
            }
        }
    };
}

bitfield! {
    /// Command byte sent at the start of every transaction.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Command(u8);
    impl Debug;
    /// Must be set for the chip to accept the command
    pub enable, set_enable: 7;
    /// Clock registers or RAM
    pub from into Bank, bank, set_bank: 6, 6;
    /// Register or RAM index (31 = burst)
    pub address, set_address: 5, 1;
    /// Read or write
    pub from into Direction, direction, set_direction: 0, 0;
}
from_register_u8!(Command);

impl Command {
    /// Builds a command for `address` in `bank`.
    #[must_use]
    pub fn new(bank: Bank, address: u8, direction: Direction) -> Self {
        let mut command = Command(0);
        command.set_enable(true);
        command.set_bank(bank);
        command.set_address(address);
        command.set_direction(direction);
        command
    }

    /// Command for a clock register.
    #[must_use]
    pub fn clock(register: Register, direction: Direction) -> Self {
        Self::new(Bank::Clock, register.into(), direction)
    }

    /// Command for a RAM byte.
    #[must_use]
    pub fn ram(index: u8, direction: Direction) -> Self {
        Self::new(Bank::Ram, index, direction)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Command {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Command({} {} {})",
            self.direction(),
            self.bank(),
            self.address()
        );
    }
}

bitfield! {
    /// Seconds register (0-59) with BCD encoding and clock-halt flag.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Seconds(u8);
    impl Debug;
    /// Clock halt: oscillator stopped while set
    pub clock_halt, set_clock_halt: 7;
    /// Tens place of seconds (0-5)
    pub ten_seconds, set_ten_seconds: 6, 4;
    /// Ones place of seconds (0-9)
    pub seconds, set_seconds: 3, 0;
}
from_register_u8!(Seconds);

#[cfg(feature = "defmt")]
impl defmt::Format for Seconds {
    fn format(&self, f: defmt::Formatter) {
        let seconds = 10 * self.ten_seconds() + self.seconds();
        defmt::write!(f, "Seconds({}s", seconds);
        if self.clock_halt() {
            defmt::write!(f, ", halted");
        }
        defmt::write!(f, ")");
    }
}

bitfield! {
    /// Minutes register (0-59) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Minutes(u8);
    impl Debug;
    /// Tens place of minutes (0-5)
    pub ten_minutes, set_ten_minutes: 6, 4;
    /// Ones place of minutes (0-9)
    pub minutes, set_minutes: 3, 0;
}
from_register_u8!(Minutes);

bitfield! {
    /// Hours register with format selection and BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Hours(u8);
    impl Debug;
    /// Time representation format (12/24 hour)
    pub from into TimeRepresentation, time_representation, set_time_representation: 7, 7;
    /// PM flag (12-hour) or 20-hour bit (24-hour)
    pub pm_or_twenty_hours, set_pm_or_twenty_hours: 5, 5;
    /// Tens place of hours
    pub ten_hours, set_ten_hours: 4, 4;
    /// Ones place of hours
    pub hours, set_hours: 3, 0;
}
from_register_u8!(Hours);

#[cfg(feature = "defmt")]
impl defmt::Format for Hours {
    fn format(&self, f: defmt::Formatter) {
        let hours = 10 * self.ten_hours() + self.hours();
        match self.time_representation() {
            TimeRepresentation::TwentyFourHour => {
                let hours = hours + 20 * self.pm_or_twenty_hours();
                defmt::write!(f, "Hours({}h 24h)", hours);
            }
            TimeRepresentation::TwelveHour => {
                let is_pm = self.pm_or_twenty_hours() != 0;
                defmt::write!(f, "Hours({}h {})", hours, if is_pm { "PM" } else { "AM" });
            }
        }
    }
}

bitfield! {
    /// Date register (1-31) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Date(u8);
    impl Debug;
    /// Tens place of date (0-3)
    pub ten_date, set_ten_date: 5, 4;
    /// Ones place of date (0-9)
    pub date, set_date: 3, 0;
}
from_register_u8!(Date);

bitfield! {
    /// Month register (1-12) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Month(u8);
    impl Debug;
    /// Tens place of month (0-1)
    pub ten_month, set_ten_month: 4, 4;
    /// Ones place of month (0-9)
    pub month, set_month: 3, 0;
}
from_register_u8!(Month);

bitfield! {
    /// Day of week register (1-7).
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Day(u8);
    impl Debug;
    /// Day of week (1-7)
    pub day, set_day: 2, 0;
}
from_register_u8!(Day);

bitfield! {
    /// Year register (0-99) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Year(u8);
    impl Debug;
    /// Tens place of year (0-9)
    pub ten_year, set_ten_year: 7, 4;
    /// Ones place of year (0-9)
    pub year, set_year: 3, 0;
}
from_register_u8!(Year);

bitfield! {
    /// Control register.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Control(u8);
    impl Debug;
    /// Write protect: every other register ignores writes while set
    pub write_protect, set_write_protect: 7;
}
from_register_u8!(Control);

#[cfg(feature = "defmt")]
impl defmt::Format for Control {
    fn format(&self, f: defmt::Formatter) {
        if self.write_protect() {
            defmt::write!(f, "Control(write protected)");
        } else {
            defmt::write!(f, "Control(writable)");
        }
    }
}

bitfield! {
    /// Trickle charger register.
    ///
    /// Charging is enabled only when the TCS nibble is 0b1010 and both a
    /// diode and a resistor are selected.
    #[derive(Clone, Copy, PartialEq)]
    pub struct TrickleCharger(u8);
    impl Debug;
    /// Trickle charge select (0b1010 enables)
    pub trickle_charge_select, set_trickle_charge_select: 7, 4;
    /// Diode selection
    pub from into TrickleDiodes, diodes, set_diodes: 3, 2;
    /// Resistor selection
    pub from into TrickleResistor, resistor, set_resistor: 1, 0;
}
from_register_u8!(TrickleCharger);

impl TrickleCharger {
    /// TCS pattern that turns the charger on.
    pub const ENABLE_PATTERN: u8 = 0b1010;

    /// Charger on with the given diode and resistor selection.
    #[must_use]
    pub fn enabled(diodes: TrickleDiodes, resistor: TrickleResistor) -> Self {
        let mut tc = TrickleCharger(0);
        tc.set_trickle_charge_select(Self::ENABLE_PATTERN);
        tc.set_diodes(diodes);
        tc.set_resistor(resistor);
        tc
    }

    /// Charger off (the chip's power-on value).
    #[must_use]
    pub fn disabled() -> Self {
        TrickleCharger(0b0101_1100)
    }

    /// True when the register actually closes the charge path.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.trickle_charge_select() == Self::ENABLE_PATTERN
            && self.diodes() != TrickleDiodes::Disabled
            && self.resistor() != TrickleResistor::Disabled
    }
}

impl Default for TrickleCharger {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TrickleCharger {
    fn format(&self, f: defmt::Formatter) {
        if self.is_enabled() {
            defmt::write!(
                f,
                "TrickleCharger({} diodes, {})",
                self.diodes(),
                self.resistor()
            );
        } else {
            defmt::write!(f, "TrickleCharger(off)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_bytes() {
        assert_eq!(
            u8::from(Command::clock(Register::Seconds, Direction::Read)),
            0x81
        );
        assert_eq!(
            u8::from(Command::clock(Register::Seconds, Direction::Write)),
            0x80
        );
        assert_eq!(
            u8::from(Command::clock(Register::Hours, Direction::Write)),
            0x84
        );
        assert_eq!(
            u8::from(Command::clock(Register::Year, Direction::Read)),
            0x8D
        );
        assert_eq!(
            u8::from(Command::clock(Register::Control, Direction::Write)),
            0x8E
        );
        assert_eq!(
            u8::from(Command::clock(Register::TrickleCharger, Direction::Write)),
            0x90
        );
        assert_eq!(
            u8::from(Command::clock(Register::ClockBurst, Direction::Read)),
            0xBF
        );
        assert_eq!(u8::from(Command::ram(0, Direction::Read)), 0xC1);
        assert_eq!(u8::from(Command::ram(30, Direction::Write)), 0xFC);
    }

    #[test]
    fn test_command_fields() {
        let command = Command::from(0xC3);
        assert!(command.enable());
        assert_eq!(command.bank(), Bank::Ram);
        assert_eq!(command.address(), 1);
        assert_eq!(command.direction(), Direction::Read);

        let command = Command::from(0x04);
        assert!(!command.enable());
        assert_eq!(command.bank(), Bank::Clock);
        assert_eq!(command.address(), 2);
        assert_eq!(command.direction(), Direction::Write);
    }

    #[test]
    #[should_panic(expected = "Invalid value for Direction: 2")]
    fn test_invalid_direction_conversion() {
        let _ = Direction::from(2);
    }

    #[test]
    fn test_seconds_register_conversions() {
        let seconds = Seconds::from(0x59);
        assert!(!seconds.clock_halt());
        assert_eq!(seconds.ten_seconds(), 5);
        assert_eq!(seconds.seconds(), 9);
        assert_eq!(u8::from(seconds), 0x59);

        // Clock halted at 30 seconds
        let seconds = Seconds::from(0xB0);
        assert!(seconds.clock_halt());
        assert_eq!(seconds.ten_seconds(), 3);
        assert_eq!(seconds.seconds(), 0);

        let mut seconds = seconds;
        seconds.set_clock_halt(false);
        assert_eq!(u8::from(seconds), 0x30);
    }

    #[test]
    fn test_minutes_register_conversions() {
        let minutes = Minutes::from(0x37);
        assert_eq!(minutes.ten_minutes(), 3);
        assert_eq!(minutes.minutes(), 7);
        assert_eq!(u8::from(minutes), 0x37);
    }

    #[test]
    fn test_hours_register_conversions() {
        // 23 hours in 24-hour mode
        let hours = Hours::from(0x23);
        assert_eq!(
            hours.time_representation(),
            TimeRepresentation::TwentyFourHour
        );
        assert_eq!(hours.pm_or_twenty_hours(), 1);
        assert_eq!(hours.ten_hours(), 0);
        assert_eq!(hours.hours(), 3);

        // 12 PM in 12-hour mode
        let hours = Hours::from(0xB2);
        assert_eq!(hours.time_representation(), TimeRepresentation::TwelveHour);
        assert_eq!(hours.pm_or_twenty_hours(), 1);
        assert_eq!(hours.ten_hours(), 1);
        assert_eq!(hours.hours(), 2);

        let mut hours = hours;
        hours.set_time_representation(TimeRepresentation::TwentyFourHour);
        assert_eq!(u8::from(hours), 0x32);
    }

    #[test]
    fn test_calendar_register_conversions() {
        let date = Date::from(0x31);
        assert_eq!(date.ten_date(), 3);
        assert_eq!(date.date(), 1);

        let month = Month::from(0x12);
        assert_eq!(month.ten_month(), 1);
        assert_eq!(month.month(), 2);

        let day = Day::from(0x07);
        assert_eq!(day.day(), 7);

        let year = Year::from(0x99);
        assert_eq!(year.ten_year(), 9);
        assert_eq!(year.year(), 9);
    }

    #[test]
    fn test_control_register_conversions() {
        assert!(Control::from(0x80).write_protect());
        assert!(!Control::from(0x00).write_protect());

        let mut control = Control::default();
        control.set_write_protect(true);
        assert_eq!(u8::from(control), 0x80);
    }

    #[test]
    fn test_trickle_charger() {
        let tc = TrickleCharger::enabled(TrickleDiodes::One, TrickleResistor::R2k);
        assert_eq!(u8::from(tc), 0xA5);
        assert!(tc.is_enabled());

        let tc = TrickleCharger::enabled(TrickleDiodes::Two, TrickleResistor::R8k);
        assert_eq!(u8::from(tc), 0xAB);
        assert_eq!(tc.diodes(), TrickleDiodes::Two);
        assert_eq!(tc.resistor(), TrickleResistor::R8k);

        assert_eq!(u8::from(TrickleCharger::default()), 0x5C);
        assert!(!TrickleCharger::disabled().is_enabled());

        // Right pattern but no resistor: path stays open
        assert!(!TrickleCharger::from(0xA4).is_enabled());
        // 0b11 diode code is not a valid selection
        assert_eq!(TrickleCharger::from(0xAD).diodes(), TrickleDiodes::Disabled);
    }
}
