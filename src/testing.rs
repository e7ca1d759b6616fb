//! Host-side fakes shared by the unit tests.
//!
//! - [`Line`]: a digital line whose level is shared between clones, optionally
//!   tracked in a [`Probe`] group that records how many lines were high at once
//! - [`Ds1302Sim`]: a DS1302 that decodes the 3-wire bit stream
//! - [`FakeRtc`]: a settable [`TimeKeeper`]
//! - [`CountingDelay`]: a delay that only adds up the requested time

extern crate alloc;

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use crate::rtc::IoPin;
use crate::time::{ClockValue, TimeKeeper};
use crate::{Bank, Command, Direction, Register, RAM_SIZE};

/// Records the highest number of simultaneously high lines in a group.
#[derive(Clone, Default)]
pub(crate) struct Probe {
    levels: Rc<RefCell<Vec<Rc<Cell<bool>>>>>,
    max_active: Rc<Cell<usize>>,
}

impl Probe {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A new low line belonging to this group.
    pub(crate) fn line(&self) -> Line {
        let line = Line::new(false);
        self.levels.borrow_mut().push(line.level.clone());
        Line {
            probe: Some(self.clone()),
            ..line
        }
    }

    pub(crate) fn max_active(&self) -> usize {
        self.max_active.get()
    }

    pub(crate) fn reset(&self) {
        self.max_active.set(self.active());
    }

    fn active(&self) -> usize {
        self.levels.borrow().iter().filter(|l| l.get()).count()
    }

    fn record(&self) {
        self.max_active.set(self.max_active.get().max(self.active()));
    }
}

/// Fake digital line. Clones share the level.
#[derive(Clone)]
pub(crate) struct Line {
    level: Rc<Cell<bool>>,
    probe: Option<Probe>,
}

impl Line {
    pub(crate) fn new(level: bool) -> Self {
        Self {
            level: Rc::new(Cell::new(level)),
            probe: None,
        }
    }

    pub(crate) fn get(&self) -> bool {
        self.level.get()
    }

    /// Drives the level from the test side, e.g. a button.
    pub(crate) fn set(&self, level: bool) {
        self.level.set(level);
    }

    fn write(&mut self, level: bool) {
        self.level.set(level);
        if let Some(probe) = &self.probe {
            probe.record();
        }
    }
}

impl ErrorType for Line {
    type Error = Infallible;
}

impl OutputPin for Line {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true);
        Ok(())
    }
}

impl InputPin for Line {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level.get())
    }
}

/// Delay that sums up the requested time instead of waiting.
#[derive(Clone, Default)]
pub(crate) struct CountingDelay {
    total_ns: Rc<Cell<u64>>,
}

impl CountingDelay {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn total_us(&self) -> u64 {
        self.total_ns.get() / 1000
    }
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns.set(self.total_ns.get() + u64::from(ns));
    }
}

/// Time source whose time is set by the test. Clones share state.
#[derive(Clone, Default)]
pub(crate) struct FakeRtc {
    now: Rc<Cell<ClockValue>>,
    writes: Rc<RefCell<Vec<ClockValue>>>,
}

impl FakeRtc {
    pub(crate) fn new(now: ClockValue) -> Self {
        let rtc = Self::default();
        rtc.now.set(now);
        rtc
    }

    /// Advances by one second, wrapping at midnight.
    pub(crate) fn tick(&self) {
        let next = self.now.get().seconds_since_midnight() + 1;
        self.now.set(ClockValue::from_seconds_since_midnight(next));
    }

    /// Every value passed to `set_time`, oldest first.
    pub(crate) fn writes(&self) -> Vec<ClockValue> {
        self.writes.borrow().clone()
    }
}

impl TimeKeeper for FakeRtc {
    type Error = Infallible;

    fn time(&mut self) -> Result<ClockValue, Self::Error> {
        Ok(self.now.get())
    }

    fn set_time(&mut self, time: &ClockValue) -> Result<(), Self::Error> {
        self.now.set(*time);
        self.writes.borrow_mut().push(*time);
        Ok(())
    }
}

const CLOCK_REGISTERS: usize = 9;
const CONTROL_INDEX: usize = 7;
const BURST_INDEX: u8 = 31;

#[derive(Default)]
struct SimState {
    registers: [u8; CLOCK_REGISTERS],
    ram: [u8; RAM_SIZE as usize],
    sclk: bool,
    ce: bool,
    io_output: bool,
    io_host: bool,
    io_chip: bool,
    shift: u8,
    bits: u8,
    command: Option<Command>,
    byte_index: usize,
    ignored: bool,
}

impl SimState {
    fn write_protected(&self) -> bool {
        self.registers[CONTROL_INDEX] & 0x80 != 0
    }

    fn set_ce(&mut self, level: bool) {
        if level && !self.ce {
            self.shift = 0;
            self.bits = 0;
            self.command = None;
            self.byte_index = 0;
            self.ignored = false;
        }
        self.ce = level;
    }

    fn set_sclk(&mut self, level: bool) {
        let rising = level && !self.sclk;
        let falling = !level && self.sclk;
        self.sclk = level;
        if !self.ce || self.ignored {
            return;
        }
        if rising {
            self.rising_edge();
        } else if falling {
            self.falling_edge();
        }
    }

    fn rising_edge(&mut self) {
        if let Some(command) = self.command {
            if command.direction() == Direction::Read {
                return;
            }
        }
        if self.io_host {
            self.shift |= 1 << self.bits;
        }
        self.bits += 1;
        if self.bits < 8 {
            return;
        }
        let byte = self.shift;
        self.shift = 0;
        self.bits = 0;

        match self.command {
            None => {
                let command = Command::from(byte);
                if !command.enable() {
                    self.ignored = true;
                }
                self.command = Some(command);
            }
            Some(command) => {
                self.store(command, byte);
                self.byte_index += 1;
            }
        }
    }

    fn falling_edge(&mut self) {
        let Some(command) = self.command else {
            return;
        };
        if command.direction() != Direction::Read {
            return;
        }
        let byte = self.load(command);
        self.io_chip = (byte >> self.bits) & 1 == 1;
        self.bits += 1;
        if self.bits == 8 {
            self.bits = 0;
            self.byte_index += 1;
        }
    }

    fn index(&self, command: Command) -> usize {
        if command.address() == BURST_INDEX {
            self.byte_index
        } else if self.byte_index == 0 {
            usize::from(command.address())
        } else {
            usize::MAX
        }
    }

    fn load(&self, command: Command) -> u8 {
        let index = self.index(command);
        match command.bank() {
            Bank::Clock => self.registers.get(index).copied().unwrap_or(0),
            Bank::Ram => self.ram.get(index).copied().unwrap_or(0),
        }
    }

    fn store(&mut self, command: Command, byte: u8) {
        let index = self.index(command);
        let is_control = command.bank() == Bank::Clock && command.address() == CONTROL_INDEX as u8;
        if self.write_protected() && !is_control {
            return;
        }
        let slot = match command.bank() {
            // A burst moves the eight time and control registers.
            Bank::Clock if command.address() == BURST_INDEX && index > CONTROL_INDEX => None,
            Bank::Clock => self.registers.get_mut(index),
            Bank::Ram => self.ram.get_mut(index),
        };
        if let Some(slot) = slot {
            *slot = byte;
        }
    }
}

/// A DS1302 that decodes the bit stream of its three lines.
///
/// Starts write protected and halted, like a chip after a battery change.
#[derive(Clone)]
pub(crate) struct Ds1302Sim {
    state: Rc<RefCell<SimState>>,
}

impl Ds1302Sim {
    pub(crate) fn new() -> Self {
        let mut state = SimState::default();
        state.registers = [0x80, 0x00, 0x00, 0x01, 0x01, 0x01, 0x00, 0x80, 0x5C];
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    pub(crate) fn pins(&self) -> (SimSclk, SimIo, SimCe) {
        (
            SimSclk(self.state.clone()),
            SimIo(self.state.clone()),
            SimCe(self.state.clone()),
        )
    }

    pub(crate) fn peek(&self, register: Register) -> u8 {
        self.state.borrow().registers[usize::from(u8::from(register))]
    }

    pub(crate) fn poke(&self, register: Register, value: u8) {
        self.state.borrow_mut().registers[usize::from(u8::from(register))] = value;
    }

    pub(crate) fn peek_ram(&self, index: u8) -> u8 {
        self.state.borrow().ram[usize::from(index)]
    }

    pub(crate) fn io_is_output(&self) -> bool {
        self.state.borrow().io_output
    }
}

pub(crate) struct SimSclk(Rc<RefCell<SimState>>);
pub(crate) struct SimIo(Rc<RefCell<SimState>>);
pub(crate) struct SimCe(Rc<RefCell<SimState>>);

impl ErrorType for SimSclk {
    type Error = Infallible;
}

impl OutputPin for SimSclk {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().set_sclk(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().set_sclk(true);
        Ok(())
    }
}

impl ErrorType for SimCe {
    type Error = Infallible;
}

impl OutputPin for SimCe {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().set_ce(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().set_ce(true);
        Ok(())
    }
}

impl ErrorType for SimIo {
    type Error = Infallible;
}

impl OutputPin for SimIo {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().io_host = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().io_host = true;
        Ok(())
    }
}

impl InputPin for SimIo {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let state = self.0.borrow();
        Ok(if state.io_output {
            state.io_host
        } else {
            state.io_chip
        })
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

impl IoPin for SimIo {
    fn set_as_input(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().io_output = false;
        Ok(())
    }

    fn set_as_output(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().io_output = true;
        Ok(())
    }
}
