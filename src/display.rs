//! Multiplexed 4-digit seven-segment display.
//!
//! The seven segment lines and the decimal-point line are shared by all
//! digits; one digit-select line per digit picks which digit shows them.
//! Every [`Display::update`] call moves on to the next digit, so calling it
//! once per loop iteration sweeps the whole display fast enough for
//! persistence of vision.

use embedded_hal::digital::{OutputPin, PinState};

/// Number of digits.
pub const DIGITS: usize = 4;

/// Number of segment lines (a to g).
pub const SEGMENTS: usize = 7;

/// Slot of the decimal point used as the colon between hours and minutes.
pub const COLON: usize = 1;

/// Segment patterns, bit 0 = segment a ... bit 6 = segment g.
const SEGMENT_TABLE: [u8; 23] = [
    0x3f, // 0
    0x06, // 1
    0x5b, // 2
    0x4f, // 3
    0x66, // 4
    0x6d, // 5
    0x7d, // 6
    0x07, // 7
    0x7f, // 8
    0x6f, // 9
    0x40, // -
    0x00, // blank
    0x6d, // S
    0x79, // E
    0x78, // t
    0x54, // n
    0x5c, // o
    0x50, // r
    0x38, // L
    0x5e, // d
    0x73, // P
    0x7c, // b
    0x71, // F
];

/// What one digit shows.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Glyph {
    /// Numeral 0-9, anything larger renders blank
    Digit(u8),
    /// Middle bar
    Minus,
    /// All segments off
    #[default]
    Blank,
    S,
    E,
    T,
    N,
    O,
    R,
    L,
    D,
    P,
    B,
    F,
}

impl Glyph {
    const fn table_index(self) -> usize {
        match self {
            Glyph::Digit(n) if n <= 9 => n as usize,
            Glyph::Digit(_) | Glyph::Blank => 11,
            Glyph::Minus => 10,
            Glyph::S => 12,
            Glyph::E => 13,
            Glyph::T => 14,
            Glyph::N => 15,
            Glyph::O => 16,
            Glyph::R => 17,
            Glyph::L => 18,
            Glyph::D => 19,
            Glyph::P => 20,
            Glyph::B => 21,
            Glyph::F => 22,
        }
    }

    /// Segment pattern, bit 0 = segment a ... bit 6 = segment g.
    #[must_use]
    pub const fn segments(self) -> u8 {
        SEGMENT_TABLE[self.table_index()]
    }
}

impl From<u8> for Glyph {
    fn from(value: u8) -> Self {
        Glyph::Digit(value)
    }
}

/// Display driver owning the digit-select, segment, and decimal-point lines.
///
/// Digit and segment lines are active high. Content, decimal points, and
/// per-digit enables are buffered; nothing reaches the lines before
/// [`Display::update`].
pub struct Display<DIG, SEG> {
    digit_pins: [DIG; DIGITS],
    segment_pins: [SEG; SEGMENTS],
    dp_pin: SEG,
    digits: [Glyph; DIGITS],
    dps: [bool; DIGITS],
    digits_enabled: [bool; DIGITS],
    enabled: bool,
    cursor: usize,
}

impl<DIG, SEG, E> Display<DIG, SEG>
where
    DIG: OutputPin<Error = E>,
    SEG: OutputPin<Error = E>,
{
    /// Creates a disabled, blank display and drives every line low.
    ///
    /// # Arguments
    /// * `digit_pins` - Digit-select lines, leftmost digit first
    /// * `segment_pins` - Segment lines a to g
    /// * `dp_pin` - Decimal-point line
    ///
    /// # Errors
    /// Returns the pin error if driving a line fails.
    pub fn new(
        digit_pins: [DIG; DIGITS],
        segment_pins: [SEG; SEGMENTS],
        dp_pin: SEG,
    ) -> Result<Self, E> {
        let mut display = Self {
            digit_pins,
            segment_pins,
            dp_pin,
            digits: [Glyph::Blank; DIGITS],
            dps: [false; DIGITS],
            digits_enabled: [true; DIGITS],
            enabled: false,
            cursor: 0,
        };
        for pin in display.digit_pins.iter_mut() {
            pin.set_low()?;
        }
        for pin in display.segment_pins.iter_mut() {
            pin.set_low()?;
        }
        display.dp_pin.set_low()?;
        Ok(display)
    }

    /// Back to defaults: disabled, blank, no decimal points, all digits enabled.
    pub fn reset(&mut self) {
        self.enabled = false;
        self.digits = [Glyph::Blank; DIGITS];
        self.dps = [false; DIGITS];
        self.digits_enabled = [true; DIGITS];
        self.cursor = 0;
    }

    /// Master enable. While disabled no digit is ever selected.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Sets one digit. Indices past the last digit are ignored.
    pub fn set_digit(&mut self, index: usize, glyph: impl Into<Glyph>) {
        if let Some(slot) = self.digits.get_mut(index) {
            *slot = glyph.into();
        }
    }

    pub fn set_all_digits(&mut self, glyph: impl Into<Glyph>) {
        self.digits = [glyph.into(); DIGITS];
    }

    /// Sets all four digits, leftmost first.
    pub fn set_digits(&mut self, glyphs: [Glyph; DIGITS]) {
        self.digits = glyphs;
    }

    /// Lights or clears the decimal point after digit `index`.
    pub fn set_dp(&mut self, index: usize, lit: bool) {
        if let Some(slot) = self.dps.get_mut(index) {
            *slot = lit;
        }
    }

    pub fn set_all_dps(&mut self, lit: bool) {
        self.dps = [lit; DIGITS];
    }

    /// Same as `set_dp(COLON, lit)`.
    pub fn set_colon(&mut self, lit: bool) {
        self.set_dp(COLON, lit);
    }

    /// Blanks or unblanks one digit without touching what it stores.
    pub fn set_digit_enabled(&mut self, index: usize, enabled: bool) {
        if let Some(slot) = self.digits_enabled.get_mut(index) {
            *slot = enabled;
        }
    }

    pub fn set_all_digits_enabled(&mut self, enabled: bool) {
        self.digits_enabled = [enabled; DIGITS];
    }

    /// Shows the next digit.
    ///
    /// Deselects every digit, puts the next digit's segments and decimal
    /// point on the shared lines (all off if that digit is blanked), then
    /// selects that digit unless the display is disabled. At most one digit
    /// is selected at any moment.
    ///
    /// # Errors
    /// Returns the pin error if driving a line fails.
    pub fn update(&mut self) -> Result<(), E> {
        self.cursor = if self.cursor + 1 >= DIGITS {
            0
        } else {
            self.cursor + 1
        };

        for pin in self.digit_pins.iter_mut() {
            pin.set_low()?;
        }

        let lit = self.digits_enabled[self.cursor];
        let segments = self.digits[self.cursor].segments();
        for (bit, pin) in self.segment_pins.iter_mut().enumerate() {
            pin.set_state(PinState::from(lit && segments & (1 << bit) != 0))?;
        }
        self.dp_pin
            .set_state(PinState::from(lit && self.dps[self.cursor]))?;

        if self.enabled {
            self.digit_pins[self.cursor].set_high()?;
        }
        Ok(())
    }

    /// Buffered glyphs, leftmost first.
    #[must_use]
    pub fn digits(&self) -> &[Glyph; DIGITS] {
        &self.digits
    }

    #[must_use]
    pub fn dps(&self) -> &[bool; DIGITS] {
        &self.dps
    }

    #[must_use]
    pub fn digits_enabled(&self) -> &[bool; DIGITS] {
        &self.digits_enabled
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Digit shown by the last `update`.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Line, Probe};

    struct Rig {
        display: Display<Line, Line>,
        digits: [Line; DIGITS],
        segments: [Line; SEGMENTS],
        dp: Line,
        probe: Probe,
    }

    fn rig() -> Rig {
        let probe = Probe::new();
        let digits: [Line; DIGITS] = core::array::from_fn(|_| probe.line());
        let segments: [Line; SEGMENTS] = core::array::from_fn(|_| Line::new(true));
        let dp = Line::new(true);
        let display = Display::new(digits.clone(), segments.clone(), dp.clone()).unwrap();
        Rig {
            display,
            digits,
            segments,
            dp,
            probe,
        }
    }

    impl Rig {
        fn selected(&self) -> Option<usize> {
            let active: [bool; DIGITS] = core::array::from_fn(|i| self.digits[i].get());
            assert!(active.iter().filter(|&&a| a).count() <= 1);
            active.iter().position(|&a| a)
        }

        fn segment_bits(&self) -> u8 {
            self.segments
                .iter()
                .enumerate()
                .filter(|(_, line)| line.get())
                .fold(0, |bits, (bit, _)| bits | 1 << bit)
        }

        /// Updates until `index` is the shown digit.
        fn show(&mut self, index: usize) {
            for _ in 0..DIGITS {
                self.display.update().unwrap();
                if self.display.cursor() == index {
                    return;
                }
            }
            unreachable!();
        }
    }

    #[test]
    fn test_glyph_table() {
        let digits: [u8; 10] = core::array::from_fn(|n| Glyph::Digit(n as u8).segments());
        assert_eq!(
            digits,
            [0x3f, 0x06, 0x5b, 0x4f, 0x66, 0x6d, 0x7d, 0x07, 0x7f, 0x6f]
        );
        assert_eq!(Glyph::Minus.segments(), 0x40);
        assert_eq!(Glyph::Blank.segments(), 0x00);
        assert_eq!(Glyph::Digit(10).segments(), 0x00);

        let letters = [
            (Glyph::S, 0x6d),
            (Glyph::E, 0x79),
            (Glyph::T, 0x78),
            (Glyph::N, 0x54),
            (Glyph::O, 0x5c),
            (Glyph::R, 0x50),
            (Glyph::L, 0x38),
            (Glyph::D, 0x5e),
            (Glyph::P, 0x73),
            (Glyph::B, 0x7c),
            (Glyph::F, 0x71),
        ];
        for (glyph, segments) in letters {
            assert_eq!(glyph.segments(), segments, "{glyph:?}");
        }
    }

    #[test]
    fn test_new_is_dark() {
        let mut rig = rig();
        assert!(rig.segments.iter().all(|s| !s.get()));
        assert!(!rig.dp.get());
        assert!(!rig.display.enabled());
        assert_eq!(rig.display.digits(), &[Glyph::Blank; DIGITS]);

        for _ in 0..DIGITS {
            rig.display.update().unwrap();
            assert_eq!(rig.selected(), None);
        }
    }

    #[test]
    fn test_update_visits_each_digit_once() {
        let mut rig = rig();
        rig.display.set_enabled(true);
        rig.probe.reset();

        let mut visits = [0; DIGITS];
        for _ in 0..DIGITS {
            rig.display.update().unwrap();
            let selected = rig.selected().unwrap();
            assert_eq!(selected, rig.display.cursor());
            visits[selected] += 1;
        }
        assert_eq!(visits, [1; DIGITS]);
        assert_eq!(rig.probe.max_active(), 1);

        // Keeps cycling 1, 2, 3, 0
        let order: [usize; 8] = core::array::from_fn(|_| {
            rig.display.update().unwrap();
            rig.display.cursor()
        });
        assert_eq!(order, [1, 2, 3, 0, 1, 2, 3, 0]);
        assert_eq!(rig.probe.max_active(), 1);
    }

    #[test]
    fn test_update_drives_segments() {
        let mut rig = rig();
        rig.display.set_enabled(true);
        rig.display.set_digits([
            Glyph::Digit(1),
            Glyph::Digit(3),
            Glyph::Digit(3),
            Glyph::Digit(7),
        ]);
        rig.display.set_colon(true);

        for (index, expected) in [(0, 0x06), (1, 0x4f), (2, 0x4f), (3, 0x07)] {
            rig.show(index);
            assert_eq!(rig.selected(), Some(index));
            assert_eq!(rig.segment_bits(), expected);
            assert_eq!(rig.dp.get(), index == COLON);
        }
    }

    #[test]
    fn test_disabled_digit_is_blank_but_kept() {
        let mut rig = rig();
        rig.display.set_enabled(true);
        rig.display.set_all_digits(Glyph::Digit(8));
        rig.display.set_all_dps(true);
        rig.display.set_digit_enabled(2, false);

        rig.show(2);
        assert_eq!(rig.segment_bits(), 0);
        assert!(!rig.dp.get());
        assert_eq!(rig.display.digits()[2], Glyph::Digit(8));

        rig.show(3);
        assert_eq!(rig.segment_bits(), 0x7f);
        assert!(rig.dp.get());

        rig.display.set_all_digits_enabled(true);
        rig.show(2);
        assert_eq!(rig.segment_bits(), 0x7f);
    }

    #[test]
    fn test_master_disable_selects_nothing() {
        let mut rig = rig();
        rig.display.set_all_digits(Glyph::Minus);
        rig.display.set_enabled(true);
        rig.show(1);
        assert_eq!(rig.selected(), Some(1));

        rig.display.set_enabled(false);
        rig.display.update().unwrap();
        assert_eq!(rig.selected(), None);
        // Segments are still driven, only the select line stays off.
        assert_eq!(rig.segment_bits(), 0x40);
    }

    #[test]
    fn test_out_of_range_indices_are_ignored() {
        let mut rig = rig();
        rig.display.set_digit(4, Glyph::E);
        rig.display.set_dp(7, true);
        rig.display.set_digit_enabled(DIGITS, false);
        assert_eq!(rig.display.digits(), &[Glyph::Blank; DIGITS]);
        assert_eq!(rig.display.dps(), &[false; DIGITS]);
        assert_eq!(rig.display.digits_enabled(), &[true; DIGITS]);
    }

    #[test]
    fn test_reset() {
        let mut rig = rig();
        rig.display.set_enabled(true);
        rig.display.set_digit(0, Glyph::L);
        rig.display.set_dp(3, true);
        rig.display.set_all_digits_enabled(false);
        rig.display.update().unwrap();

        rig.display.reset();
        assert!(!rig.display.enabled());
        assert_eq!(rig.display.digits(), &[Glyph::Blank; DIGITS]);
        assert_eq!(rig.display.dps(), &[false; DIGITS]);
        assert_eq!(rig.display.digits_enabled(), &[true; DIGITS]);
        assert_eq!(rig.display.cursor(), 0);
    }
}
