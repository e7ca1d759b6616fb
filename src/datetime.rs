//! BCD conversion and `DateTime` utilities for the DS1302 RTC.
//!
//! This module holds the field-level BCD encoders used by the single-register
//! accessors and the burst representation of the eight clock registers,
//! which converts to and from chrono's `NaiveDateTime`.
//!
//! # Register Model
//!
//! A clock burst transfers the registers in address order:
//! - Seconds, Minutes, Hours, Date, Month, Day, Year, Control
//!
//! The chip has no century bit, so only the years 2000-2099 are representable.
//!
//! # Error Handling
//!
//! Conversion errors are reported via [`DS1302DateTimeError`].

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::{Control, Date, Day, Hours, Minutes, Month, Seconds, TimeRepresentation, Year};

/// Number of registers moved by a clock burst.
pub(crate) const CLOCK_BURST_LEN: usize = 8;

/// Errors that can occur during DS1302 date/time conversion or validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DS1302DateTimeError {
    /// The provided or decoded date/time is invalid (e.g., out of range, not representable)
    InvalidDateTime,
    /// The year is not before 2100 (the DS1302 only stores two year digits)
    YearNotBefore2100,
    /// The year is not after 1999
    YearNotAfter1999,
}

/// Splits `value` into BCD (ones, tens), rejecting values above `max_value`.
pub(crate) fn make_bcd(value: u32, max_value: u32) -> Result<(u8, u8), DS1302DateTimeError> {
    if value > max_value {
        return Err(DS1302DateTimeError::InvalidDateTime);
    }
    let ones = u8::try_from(value % 10).map_err(|_| DS1302DateTimeError::InvalidDateTime)?;
    let tens = u8::try_from(value / 10).map_err(|_| DS1302DateTimeError::InvalidDateTime)?;
    Ok((ones, tens))
}

/// Seconds register for `seconds`, clock running.
pub(crate) fn convert_seconds(seconds: u32) -> Result<Seconds, DS1302DateTimeError> {
    let (ones, tens) = make_bcd(seconds, 59)?;
    let mut value = Seconds::default();
    value.set_seconds(ones);
    value.set_ten_seconds(tens);
    Ok(value)
}

pub(crate) fn convert_minutes(minutes: u32) -> Result<Minutes, DS1302DateTimeError> {
    let (ones, tens) = make_bcd(minutes, 59)?;
    let mut value = Minutes::default();
    value.set_minutes(ones);
    value.set_ten_minutes(tens);
    Ok(value)
}

pub(crate) fn convert_hours(
    hour: u32,
    time_representation: TimeRepresentation,
) -> Result<Hours, DS1302DateTimeError> {
    if hour > 23 {
        return Err(DS1302DateTimeError::InvalidDateTime);
    }
    let mut value = Hours::default();
    value.set_time_representation(time_representation);

    match time_representation {
        TimeRepresentation::TwentyFourHour => {
            let ones = u8::try_from(hour % 10).map_err(|_| DS1302DateTimeError::InvalidDateTime)?;
            value.set_hours(ones);
            value.set_ten_hours(u8::from((10..20).contains(&hour)));
            value.set_pm_or_twenty_hours(u8::from(hour >= 20));
        }
        TimeRepresentation::TwelveHour => {
            let (hour12, is_pm) = match hour {
                0 => (12, false),
                1..=11 => (hour, false),
                12 => (12, true),
                _ => (hour - 12, true),
            };
            let (ones, tens) = make_bcd(hour12, 12)?;
            value.set_hours(ones);
            value.set_ten_hours(tens);
            value.set_pm_or_twenty_hours(u8::from(is_pm));
        }
    }
    Ok(value)
}

fn convert_day(weekday: u32) -> Result<Day, DS1302DateTimeError> {
    if !(1..=7).contains(&weekday) {
        return Err(DS1302DateTimeError::InvalidDateTime);
    }
    let mut value = Day::default();
    value.set_day(u8::try_from(weekday).map_err(|_| DS1302DateTimeError::InvalidDateTime)?);
    Ok(value)
}

fn convert_date(date: u32) -> Result<Date, DS1302DateTimeError> {
    let (ones, tens) = make_bcd(date, 31)?;
    let mut value = Date::default();
    value.set_date(ones);
    value.set_ten_date(tens);
    Ok(value)
}

fn convert_month(month: u32) -> Result<Month, DS1302DateTimeError> {
    let (ones, tens) = make_bcd(month, 12)?;
    let mut value = Month::default();
    value.set_month(ones);
    value.set_ten_month(tens);
    Ok(value)
}

fn convert_year(year: i32) -> Result<Year, DS1302DateTimeError> {
    if year > 2099 {
        debug!("year {} is too late, must be before 2100", year);
        return Err(DS1302DateTimeError::YearNotBefore2100);
    }
    if year < 2000 {
        debug!("year {} is too early, must be after 1999", year);
        return Err(DS1302DateTimeError::YearNotAfter1999);
    }
    let offset = u32::try_from(year - 2000).map_err(|_| DS1302DateTimeError::InvalidDateTime)?;
    let (ones, tens) = make_bcd(offset, 99)?;
    let mut value = Year::default();
    value.set_year(ones);
    value.set_ten_year(tens);
    Ok(value)
}

pub(crate) fn seconds_value(seconds: Seconds) -> u8 {
    10 * seconds.ten_seconds() + seconds.seconds()
}

pub(crate) fn minutes_value(minutes: Minutes) -> u8 {
    10 * minutes.ten_minutes() + minutes.minutes()
}

/// Hour of day (0-23) in either representation.
pub(crate) fn hours_value(hours: Hours) -> u8 {
    let value = 10 * hours.ten_hours() + hours.hours();
    match hours.time_representation() {
        TimeRepresentation::TwentyFourHour => value + 20 * hours.pm_or_twenty_hours(),
        TimeRepresentation::TwelveHour => {
            let is_pm = hours.pm_or_twenty_hours() != 0;
            match (value, is_pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, false) => h,
                (h, true) => h + 12,
            }
        }
    }
}

pub(crate) fn date_value(date: Date) -> u8 {
    10 * date.ten_date() + date.date()
}

pub(crate) fn month_value(month: Month) -> u8 {
    10 * month.ten_month() + month.month()
}

pub(crate) fn year_value(year: Year) -> u16 {
    2000 + u16::from(10 * year.ten_year() + year.year())
}

/// The eight clock registers as moved by one burst transfer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct DS1302DateTime {
    seconds: Seconds,
    minutes: Minutes,
    hours: Hours,
    date: Date,
    month: Month,
    day: Day,
    year: Year,
    control: Control,
}

impl DS1302DateTime {
    /// Encodes `datetime` with the clock running and writes enabled.
    ///
    /// The weekday register is numbered 1 (Sunday) to 7 (Saturday).
    pub(crate) fn from_datetime(
        datetime: &NaiveDateTime,
        time_representation: TimeRepresentation,
    ) -> Result<Self, DS1302DateTimeError> {
        let raw = DS1302DateTime {
            seconds: convert_seconds(datetime.second())?,
            minutes: convert_minutes(datetime.minute())?,
            hours: convert_hours(datetime.hour(), time_representation)?,
            date: convert_date(datetime.day())?,
            month: convert_month(datetime.month())?,
            day: convert_day(datetime.weekday().number_from_sunday())?,
            year: convert_year(datetime.year())?,
            control: Control::default(),
        };

        let bytes: [u8; CLOCK_BURST_LEN] = (&raw).into();
        debug!("raw={:?}", bytes);

        Ok(raw)
    }

    pub(crate) fn into_datetime(self) -> Result<NaiveDateTime, DS1302DateTimeError> {
        let seconds = u32::from(seconds_value(self.seconds));
        let minutes = u32::from(minutes_value(self.minutes));
        let hours = u32::from(hours_value(self.hours));
        let year = i32::from(year_value(self.year));
        let month = u32::from(month_value(self.month));
        let date = u32::from(date_value(self.date));

        NaiveDate::from_ymd_opt(year, month, date)
            .and_then(|d| d.and_hms_opt(hours, minutes, seconds))
            .ok_or(DS1302DateTimeError::InvalidDateTime)
    }

    /// True when the burst was read from a halted clock.
    pub(crate) fn clock_halted(&self) -> bool {
        self.seconds.clock_halt()
    }
}

impl From<[u8; CLOCK_BURST_LEN]> for DS1302DateTime {
    fn from(data: [u8; CLOCK_BURST_LEN]) -> Self {
        DS1302DateTime {
            seconds: Seconds(data[0]),
            minutes: Minutes(data[1]),
            hours: Hours(data[2]),
            date: Date(data[3]),
            month: Month(data[4]),
            day: Day(data[5]),
            year: Year(data[6]),
            control: Control(data[7]),
        }
    }
}

impl From<&DS1302DateTime> for [u8; CLOCK_BURST_LEN] {
    fn from(dt: &DS1302DateTime) -> [u8; CLOCK_BURST_LEN] {
        [
            dt.seconds.0,
            dt.minutes.0,
            dt.hours.0,
            dt.date.0,
            dt.month.0,
            dt.day.0,
            dt.year.0,
            dt.control.0,
        ]
    }
}
