//! Clock orchestrator.
//!
//! [`Clock`] owns every component and runs one loop iteration per
//! [`Clock::step`]:
//!
//! 1. read the time from the RTC (exactly once per iteration)
//! 2. drive the trigger output
//! 3. drive the buzzer from the pending beep
//! 4. sample the button and act on press lengths
//! 5. render the current mode and scan one display digit
//! 6. feed the calibrator
//!
//! Every duration is derived from the calibrator, so nothing here depends
//! on how fast the loop runs.

use core::convert::Infallible;

use embedded_hal::digital::{InputPin, OutputPin, PinState};

use crate::calibrator::LoopCalibrator;
use crate::display::{Display, Glyph, DIGITS};
use crate::switch::Switch;
use crate::time::{ClockValue, TimeKeeper, SECONDS_PER_DAY};

/// Countdown switches to the mm:ss view this many seconds before the target.
const COUNTDOWN_WINDOW_S: u32 = 600;
/// The colon speeds up during the last seconds of the countdown.
const FAST_BLINK_S: u32 = 20;
/// The target digits blink for this long after the target is reached.
const CELEBRATION_S: u32 = 60;
/// Short beeps sound while fewer seconds than this are left.
const FINAL_BEEPS_S: u32 = 5;
/// Decimal point marking the countdown display mode.
const COUNTDOWN_DP: usize = 3;

/// Tunable constants of the clock.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    /// Time of day the countdown runs to and the trigger fires at
    pub target: ClockValue,
    /// Click at 60 and 30 seconds before the target
    pub click_ms: u32,
    /// Beeps during the last seconds before the target
    pub short_beep_ms: u32,
    /// Beep when the target is reached
    pub long_beep_ms: u32,
    /// How long a button level must persist to be accepted
    pub bouncing_time_ms: u32,
    /// Length of one press duration unit
    pub button_unit_ms: u32,
    /// Debounce and duration unit sample counts used until the loop is calibrated
    pub initial_samples: u16,
    /// Display mode after power-up
    pub display_mode: DisplayMode,
    /// Beeper state after power-up
    pub beeper_enabled: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            target: ClockValue::new(13, 37, 0),
            click_ms: 4,
            short_beep_ms: 100,
            long_beep_ms: 400,
            bouncing_time_ms: 5,
            button_unit_ms: 1000,
            initial_samples: 1000,
            display_mode: DisplayMode::Countdown,
            beeper_enabled: true,
        }
    }
}

/// Top-level state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockMode {
    /// Shows the time or the countdown
    DisplayClock,
    /// Turns the beeper on or off
    BeepSetup,
    /// Edits the time digit by digit
    TimeSetup,
}

/// What [`ClockMode::DisplayClock`] shows.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayMode {
    /// Time left until the target
    Countdown,
    /// Wall time
    Normal,
}

impl DisplayMode {
    /// The other display mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            DisplayMode::Countdown => DisplayMode::Normal,
            DisplayMode::Normal => DisplayMode::Countdown,
        }
    }
}

/// Resolution of the time shown in [`ClockMode::DisplayClock`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayPrecision {
    /// HH:MM
    HoursMinutes,
    /// SS in the two right digits
    Seconds,
}

impl DisplayPrecision {
    /// The other precision.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            DisplayPrecision::HoursMinutes => DisplayPrecision::Seconds,
            DisplayPrecision::Seconds => DisplayPrecision::HoursMinutes,
        }
    }
}

/// Label shown while the button is held, announcing what a release would do.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayOverride {
    /// No label, the regular view is shown
    None,
    /// Release switches to the normal display mode
    Norm,
    /// Release switches to the countdown display mode
    Leet,
    /// Release enters beep setup
    Beep,
    /// Release enters time setup
    Set,
}

impl DisplayOverride {
    /// Glyphs of the label, `None` when no label is shown.
    #[must_use]
    pub const fn label(self) -> Option<[Glyph; DIGITS]> {
        match self {
            DisplayOverride::None => None,
            DisplayOverride::Norm => Some([Glyph::N, Glyph::O, Glyph::R, Glyph::Blank]),
            DisplayOverride::Leet => Some([Glyph::L, Glyph::E, Glyph::E, Glyph::T]),
            DisplayOverride::Beep => Some([Glyph::B, Glyph::E, Glyph::E, Glyph::P]),
            DisplayOverride::Set => Some([Glyph::S, Glyph::E, Glyph::T, Glyph::Blank]),
        }
    }
}

/// Digit edited in [`ClockMode::TimeSetup`], in editing order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SetupDigit {
    /// Tens of hours
    Hours10,
    /// Ones of hours
    Hours1,
    /// Tens of minutes
    Minutes10,
    /// Ones of minutes
    Minutes1,
}

impl SetupDigit {
    /// Display position of the digit.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The digit edited after this one, `None` after the last.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            SetupDigit::Hours10 => Some(SetupDigit::Hours1),
            SetupDigit::Hours1 => Some(SetupDigit::Minutes10),
            SetupDigit::Minutes10 => Some(SetupDigit::Minutes1),
            SetupDigit::Minutes1 => None,
        }
    }
}

/// Errors from one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError<RtcE, PinE> {
    /// Reading or setting the time failed
    Rtc(RtcE),
    /// Driving or reading a line failed
    Pin(PinE),
}

/// The clock: RTC, button, display, buzzer, and trigger output.
///
/// Button, display, buzzer, and trigger lines share one pin error type.
pub struct Clock<T, BTN, DIG, SEG, OUT> {
    config: ClockConfig,
    rtc: T,
    button: Switch<BTN>,
    display: Display<DIG, SEG>,
    buzzer: OUT,
    trigger: OUT,
    calibrator: LoopCalibrator,
    now: ClockValue,
    clock_mode: ClockMode,
    display_mode: DisplayMode,
    display_precision: DisplayPrecision,
    display_override: DisplayOverride,
    setup_digit: SetupDigit,
    setup_time: ClockValue,
    requested_beep: u32,
    last_beep_time: Option<ClockValue>,
    beeper_enabled: bool,
}

impl<T, BTN, DIG, SEG, OUT, E> Clock<T, BTN, DIG, SEG, OUT>
where
    T: TimeKeeper,
    BTN: InputPin<Error = E>,
    DIG: OutputPin<Error = E>,
    SEG: OutputPin<Error = E>,
    OUT: OutputPin<Error = E>,
{
    /// Assembles the clock and switches the display on.
    ///
    /// # Arguments
    /// * `config` - Tunable constants
    /// * `rtc` - Time source, already initialized
    /// * `button` - Push button input, low while pressed
    /// * `display` - Display driver
    /// * `buzzer` - Buzzer output, high = sound
    /// * `trigger` - Output held high during the target minute
    ///
    /// # Errors
    /// Returns `ClockError::Pin` if reading the button or driving an output fails.
    pub fn new(
        config: ClockConfig,
        rtc: T,
        button: BTN,
        mut display: Display<DIG, SEG>,
        mut buzzer: OUT,
        mut trigger: OUT,
    ) -> Result<Self, ClockError<T::Error, E>> {
        let button = Switch::new(
            button,
            u32::from(config.initial_samples),
            config.initial_samples,
        )
        .map_err(ClockError::Pin)?;
        buzzer.set_low().map_err(ClockError::Pin)?;
        trigger.set_low().map_err(ClockError::Pin)?;
        display.set_enabled(true);

        Ok(Self {
            config,
            rtc,
            button,
            display,
            buzzer,
            trigger,
            calibrator: LoopCalibrator::new(),
            now: ClockValue::MIDNIGHT,
            clock_mode: ClockMode::DisplayClock,
            display_mode: config.display_mode,
            display_precision: DisplayPrecision::HoursMinutes,
            display_override: DisplayOverride::None,
            setup_digit: SetupDigit::Hours10,
            setup_time: ClockValue::MIDNIGHT,
            requested_beep: 0,
            last_beep_time: None,
            beeper_enabled: config.beeper_enabled,
        })
    }

    /// Runs the loop forever.
    ///
    /// # Errors
    /// Returns the first error of [`Clock::step`].
    pub fn run(&mut self) -> Result<Infallible, ClockError<T::Error, E>> {
        loop {
            self.step()?;
        }
    }

    /// Runs one loop iteration.
    ///
    /// # Errors
    /// Returns `ClockError::Rtc` if the time source fails, `ClockError::Pin`
    /// if a line fails.
    pub fn step(&mut self) -> Result<(), ClockError<T::Error, E>> {
        self.now = self.rtc.time().map_err(ClockError::Rtc)?;

        let target = self.config.target;
        let triggered = self.clock_mode == ClockMode::DisplayClock
            && self.now.hours == target.hours
            && self.now.minutes == target.minutes;
        self.trigger
            .set_state(PinState::from(triggered))
            .map_err(ClockError::Pin)?;

        self.buzzer
            .set_state(PinState::from(self.requested_beep > 0))
            .map_err(ClockError::Pin)?;
        self.requested_beep = self.requested_beep.saturating_sub(1);

        self.handle_button()?;
        self.update_display().map_err(ClockError::Pin)?;

        self.calibrator.calibrate(&self.now);
        Ok(())
    }

    fn handle_button(&mut self) -> Result<(), ClockError<T::Error, E>> {
        if let Some(timebase) = self.calibrator.timebase() {
            let debounce = timebase.cycles_for_ms(self.config.bouncing_time_ms);
            self.button
                .set_debounce_samples(u16::try_from(debounce).unwrap_or(u16::MAX));
            self.button
                .set_threshold_samples(timebase.cycles_for_ms(self.config.button_unit_ms));
        }
        self.button.sample().map_err(ClockError::Pin)?;

        if self.clock_mode == ClockMode::DisplayClock {
            self.display_override = match self.button.push_length() {
                0 => DisplayOverride::None,
                1 => self.display_override,
                2 => match self.display_mode {
                    DisplayMode::Countdown => DisplayOverride::Norm,
                    DisplayMode::Normal => DisplayOverride::Leet,
                },
                3 => DisplayOverride::Beep,
                _ => DisplayOverride::Set,
            };
        }

        let last = self.button.report_last_press_length();
        let current = self.button.report_current_press_length();

        match self.clock_mode {
            ClockMode::DisplayClock => match last {
                0 => {}
                1 => self.display_precision = self.display_precision.toggled(),
                2 => self.display_mode = self.display_mode.toggled(),
                3 => self.set_mode(ClockMode::BeepSetup),
                _ => {
                    self.setup_time = self.now;
                    self.setup_digit = SetupDigit::Hours10;
                    self.set_mode(ClockMode::TimeSetup);
                }
            },
            ClockMode::BeepSetup => {
                if last == 1 {
                    self.beeper_enabled = !self.beeper_enabled;
                    debug!("clock: beeper enabled {}", self.beeper_enabled);
                } else if current > 1 {
                    self.button.reset_press_state();
                    self.set_mode(ClockMode::DisplayClock);
                }
            }
            ClockMode::TimeSetup => {
                if last == 1 {
                    self.increment_setup_digit();
                } else if last >= 2 && self.setup_digit == SetupDigit::Minutes1 {
                    self.commit_setup_time()?;
                } else if current >= 2 {
                    if let Some(next) = self.setup_digit.next() {
                        self.setup_digit = next;
                        self.setup_time.seconds = 0;
                        self.setup_time.sanitize();
                        self.button.reset_press_state();
                    }
                }
            }
        }
        Ok(())
    }

    fn set_mode(&mut self, mode: ClockMode) {
        debug!("clock: mode {:?}", mode);
        self.clock_mode = mode;
    }

    fn increment_setup_digit(&mut self) {
        let time = &mut self.setup_time;
        let (mut h10, mut h1) = (time.hours / 10, time.hours % 10);
        let (mut m10, mut m1) = (time.minutes / 10, time.minutes % 10);

        match self.setup_digit {
            SetupDigit::Hours10 => {
                h10 = (h10 + 1) % 3;
                if h10 == 2 {
                    h1 = h1.min(3);
                }
            }
            SetupDigit::Hours1 => {
                let wrap = if h10 == 2 { 4 } else { 10 };
                h1 = (h1 + 1) % wrap;
            }
            SetupDigit::Minutes10 => m10 = (m10 + 1) % 6,
            SetupDigit::Minutes1 => m1 = (m1 + 1) % 10,
        }

        time.hours = h10 * 10 + h1;
        time.minutes = m10 * 10 + m1;
    }

    fn commit_setup_time(&mut self) -> Result<(), ClockError<T::Error, E>> {
        self.setup_time.seconds = 0;
        self.setup_time.sanitize();
        debug!(
            "clock: set time {}:{}:{}",
            self.setup_time.hours,
            self.setup_time.minutes,
            self.setup_time.seconds
        );
        self.rtc
            .set_time(&self.setup_time)
            .map_err(ClockError::Rtc)?;

        // The running second was cut short, calibration starts over from the new time.
        self.now = self.setup_time;
        self.calibrator.reset();
        self.button.reset_press_state();
        self.set_mode(ClockMode::DisplayClock);
        Ok(())
    }

    /// Schedules the buzzer for `ms` milliseconds. Overlapping requests keep the longer one.
    fn request_beep(&mut self, ms: u32) {
        if !self.beeper_enabled {
            return;
        }
        if let Some(timebase) = self.calibrator.timebase() {
            let cycles = timebase.cycles_for_ms(ms);
            trace!("clock: beep {} ms, {} cycles", ms, cycles);
            self.requested_beep = self.requested_beep.max(cycles);
        }
    }

    fn update_display(&mut self) -> Result<(), E> {
        match self.clock_mode {
            ClockMode::DisplayClock => self.show_clock(),
            ClockMode::BeepSetup => self.show_beep_setup(),
            ClockMode::TimeSetup => self.show_time_setup(),
        }
        self.display.update()
    }

    fn show_clock(&mut self) {
        if let Some(label) = self.display_override.label() {
            self.display.set_all_digits_enabled(true);
            self.display.set_digits(label);
            self.display.set_all_dps(false);
            return;
        }

        self.display
            .set_dp(COUNTDOWN_DP, self.display_mode == DisplayMode::Countdown);
        match self.display_mode {
            DisplayMode::Countdown => self.show_countdown(),
            DisplayMode::Normal => {
                self.print_time(self.now, self.display_precision);
                self.display.set_colon(self.calibrator.lit(2));
            }
        }
        self.display.set_all_digits_enabled(true);
    }

    fn show_countdown(&mut self) {
        let now = self.now.seconds_since_midnight() % SECONDS_PER_DAY;
        let target = self.config.target.seconds_since_midnight() % SECONDS_PER_DAY;
        let time_left = (target + SECONDS_PER_DAY - 1 - now) % SECONDS_PER_DAY;
        let time_since = (now + SECONDS_PER_DAY - target) % SECONDS_PER_DAY;

        if time_left < COUNTDOWN_WINDOW_S {
            let minutes = (time_left / 60) as u8;
            let seconds = (time_left % 60) as u8;
            let tens = match minutes / 10 {
                0 => Glyph::Minus,
                n => Glyph::Digit(n),
            };
            self.display.set_digits([
                tens,
                Glyph::Digit(minutes % 10),
                Glyph::Digit(seconds / 10),
                Glyph::Digit(seconds % 10),
            ]);

            let colon = if time_left > FAST_BLINK_S {
                self.calibrator.lit(2)
            } else {
                // 2 more sub-periods every 2 seconds
                self.calibrator
                    .lit(((FAST_BLINK_S - time_left) / 2 * 2 + 2) as u8)
            };
            self.display.set_colon(colon);

            if self.last_beep_time != Some(self.now) {
                if time_left == 60 || time_left == 30 {
                    self.request_beep(self.config.click_ms);
                    self.last_beep_time = Some(self.now);
                } else if time_left < FINAL_BEEPS_S {
                    self.request_beep(self.config.short_beep_ms);
                    self.last_beep_time = Some(self.now);
                }
            }
        } else if time_since < CELEBRATION_S {
            if time_since == 0 && self.last_beep_time != Some(self.now) {
                self.request_beep(self.config.long_beep_ms);
                self.last_beep_time = Some(self.now);
            }

            let blink = self.calibrator.lit(4);
            if blink {
                self.print_time(self.config.target, DisplayPrecision::HoursMinutes);
            } else {
                self.display.set_all_digits(Glyph::Blank);
            }
            self.display.set_colon(blink);
        } else {
            self.print_time(
                ClockValue::from_seconds_since_midnight(time_left),
                self.display_precision,
            );
            self.display.set_colon(self.calibrator.lit(2));
        }
    }

    fn show_beep_setup(&mut self) {
        let label = if self.beeper_enabled {
            [Glyph::Blank, Glyph::O, Glyph::N, Glyph::Blank]
        } else {
            [Glyph::Blank, Glyph::O, Glyph::F, Glyph::F]
        };
        self.display.set_digits(label);
        self.display.set_all_dps(false);
        self.display.set_all_digits_enabled(true);
    }

    fn show_time_setup(&mut self) {
        self.print_time(self.setup_time, DisplayPrecision::HoursMinutes);
        self.display.set_all_dps(false);
        self.display.set_colon(true);

        let blink = self.calibrator.lit(10);
        let selected = self.setup_digit.index();
        for index in 0..DIGITS {
            self.display
                .set_digit_enabled(index, blink || index != selected);
        }
    }

    fn print_time(&mut self, time: ClockValue, precision: DisplayPrecision) {
        let digits = match precision {
            DisplayPrecision::HoursMinutes => [
                Glyph::Digit(time.hours / 10),
                Glyph::Digit(time.hours % 10),
                Glyph::Digit(time.minutes / 10),
                Glyph::Digit(time.minutes % 10),
            ],
            DisplayPrecision::Seconds => [
                Glyph::Blank,
                Glyph::Blank,
                Glyph::Digit(time.seconds / 10),
                Glyph::Digit(time.seconds % 10),
            ],
        };
        self.display.set_digits(digits);
    }

    /// Time read in the last iteration.
    pub fn now(&self) -> ClockValue {
        self.now
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    pub fn clock_mode(&self) -> ClockMode {
        self.clock_mode
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn display_precision(&self) -> DisplayPrecision {
        self.display_precision
    }

    pub fn display_override(&self) -> DisplayOverride {
        self.display_override
    }

    pub fn setup_digit(&self) -> SetupDigit {
        self.setup_digit
    }

    /// Working copy edited in time setup.
    pub fn setup_time(&self) -> ClockValue {
        self.setup_time
    }

    pub fn beeper_enabled(&self) -> bool {
        self.beeper_enabled
    }

    /// Iterations the buzzer still has to sound.
    pub fn requested_beep(&self) -> u32 {
        self.requested_beep
    }

    pub fn calibrator(&self) -> &LoopCalibrator {
        &self.calibrator
    }

    pub fn display(&self) -> &Display<DIG, SEG> {
        &self.display
    }

    pub fn button(&self) -> &Switch<BTN> {
        &self.button
    }

    /// Gives the time source back.
    pub fn release(self) -> T {
        self.rtc
    }
}
