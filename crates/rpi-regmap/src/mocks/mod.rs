//! In-memory register backend for tests.
//!
//! [`MockRegisters`] stands in for one mapped 4 KiB window. It behaves like
//! the hardware where the clock protocols depend on it:
//!
//! - clock-manager CTL/DIV writes without `0x5A` in bits 31:24 are dropped
//! - CTL.BUSY is read-only and follows CTL.ENAB after `busy_lag` reads of
//!   the CTL register
//! - GPSET/GPCLR writes update GPLEV
//!
//! Every access is appended to a [`Journal`] that two windows can share, so
//! tests can assert the order of writes across the GPIO and clock windows.

#![cfg(any(test, feature = "mock"))]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config::BLOCK_SIZE;
use crate::register::{offset, Register, RegisterBlock, CTL_BUSY, CTL_ENAB, PASSWD, PASSWORD};
use crate::types::ClockChannel;
use crate::RegisterMap;

/// Which peripheral a mock window models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    /// GPIO controller.
    Gpio,
    /// Clock manager.
    ClockManager,
}

/// One recorded register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEvent {
    /// A read and the value it returned.
    Read {
        /// Window accessed.
        window: WindowKind,
        /// Byte offset within the window.
        offset: usize,
        /// Value returned.
        value: u32,
    },
    /// A write as issued by software, whether or not the mock accepted it.
    Write {
        /// Window accessed.
        window: WindowKind,
        /// Byte offset within the window.
        offset: usize,
        /// Value written.
        value: u32,
    },
}

/// Shared access log.
pub type Journal = Rc<RefCell<Vec<MockEvent>>>;

/// Simulated register window.
#[derive(Debug)]
pub struct MockRegisters {
    kind: WindowKind,
    words: Vec<Cell<u32>>,
    journal: Journal,
    busy_lag: u32,
    countdown: [Cell<u32>; 3],
    stalled: bool,
}

impl MockRegisters {
    fn new(kind: WindowKind, journal: Journal) -> Self {
        Self {
            kind,
            words: (0..BLOCK_SIZE / 4).map(|_| Cell::new(0)).collect(),
            journal,
            busy_lag: 0,
            countdown: Default::default(),
            stalled: false,
        }
    }

    /// Zeroed GPIO window with its own journal.
    #[must_use]
    pub fn gpio() -> Self {
        Self::new(WindowKind::Gpio, Journal::default())
    }

    /// Zeroed clock-manager window with its own journal.
    #[must_use]
    pub fn clock_manager() -> Self {
        Self::new(WindowKind::ClockManager, Journal::default())
    }

    /// GPIO and clock-manager windows sharing one journal.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let journal = Journal::default();
        (
            Self::new(WindowKind::Gpio, Rc::clone(&journal)),
            Self::new(WindowKind::ClockManager, journal),
        )
    }

    /// Number of CTL reads before BUSY follows ENAB.
    #[must_use]
    pub fn with_busy_lag(mut self, reads: u32) -> Self {
        self.busy_lag = reads;
        self
    }

    /// Freeze BUSY at its current value.
    #[must_use]
    pub fn stalled(mut self) -> Self {
        self.stalled = true;
        self
    }

    /// Handle to the access log.
    #[must_use]
    pub fn journal(&self) -> Journal {
        Rc::clone(&self.journal)
    }

    /// Current word at `offset` without recording an access.
    #[must_use]
    pub fn peek(&self, offset: usize) -> u32 {
        self.word(offset).map_or(0, Cell::get)
    }

    /// Overwrite the word at `offset` without recording an access or
    /// applying any hardware rule.
    pub fn poke(&mut self, offset: usize, value: u32) {
        if let Some(word) = self.word(offset) {
            word.set(value);
        }
    }

    fn word(&self, offset: usize) -> Option<&Cell<u32>> {
        if offset % 4 != 0 {
            return None;
        }
        self.words.get(offset / 4)
    }

    fn record(&self, event: MockEvent) {
        self.journal.borrow_mut().push(event);
    }

    /// Clock channel whose CTL register lives at `offset`.
    fn ctl_channel(offset: usize) -> Option<ClockChannel> {
        ClockChannel::ALL.into_iter().find(|&ch| Register::CmGpCtl(ch).offset() == offset)
    }

    fn is_protected(offset: usize) -> bool {
        ClockChannel::ALL.into_iter().any(|ch| {
            Register::CmGpCtl(ch).offset() == offset || Register::CmGpDiv(ch).offset() == offset
        })
    }

    /// Move BUSY toward ENAB on a CTL read.
    fn settle_busy(&self, ch: ClockChannel, word: &Cell<u32>) {
        let ctl = word.get();
        let enab = ctl & CTL_ENAB.mask() != 0;
        let busy = ctl & CTL_BUSY.mask() != 0;
        if self.stalled || enab == busy {
            return;
        }
        let Some(countdown) = self.countdown.get(usize::from(ch.index())) else {
            return;
        };
        let remaining = countdown.get();
        if remaining > 0 {
            countdown.set(remaining.saturating_sub(1));
        } else {
            word.set(ctl ^ CTL_BUSY.mask());
        }
    }

    fn write_clock(&self, offset: usize, value: u32, word: &Cell<u32>) {
        if Self::is_protected(offset) && (value & PASSWD.mask()) != PASSWORD.wrapping_shl(PASSWD.shift) {
            return;
        }
        match Self::ctl_channel(offset) {
            Some(ch) => {
                let old = word.get();
                let new = (value & !CTL_BUSY.mask()) | (old & CTL_BUSY.mask());
                if (old ^ new) & CTL_ENAB.mask() != 0 {
                    if let Some(countdown) = self.countdown.get(usize::from(ch.index())) {
                        countdown.set(self.busy_lag);
                    }
                }
                word.set(new);
            }
            None => word.set(value),
        }
    }

    fn write_gpio(&self, offset: usize, value: u32, word: &Cell<u32>) {
        let bank = |base: usize| offset.checked_sub(base).filter(|d| *d < 8).map(|d| d / 4);
        if let Some(n) = bank(offset::GPSET0) {
            if let Some(lev) = self.word(offset::GPLEV0.saturating_add(n.saturating_mul(4))) {
                lev.set(lev.get() | value);
            }
        } else if let Some(n) = bank(offset::GPCLR0) {
            if let Some(lev) = self.word(offset::GPLEV0.saturating_add(n.saturating_mul(4))) {
                lev.set(lev.get() & !value);
            }
        }
        word.set(value);
    }
}

impl RegisterBlock for MockRegisters {
    fn read(&self, offset: usize) -> u32 {
        let value = match self.word(offset) {
            Some(word) => {
                if self.kind == WindowKind::ClockManager {
                    if let Some(ch) = Self::ctl_channel(offset) {
                        self.settle_busy(ch, word);
                    }
                }
                word.get()
            }
            None => 0,
        };
        self.record(MockEvent::Read { window: self.kind, offset, value });
        value
    }

    fn write(&mut self, offset: usize, value: u32) {
        self.record(MockEvent::Write { window: self.kind, offset, value });
        let Some(word) = self.word(offset) else {
            return;
        };
        match self.kind {
            WindowKind::Gpio => self.write_gpio(offset, value, word),
            WindowKind::ClockManager => self.write_clock(offset, value, word),
        }
    }
}

/// Register map over a mock pair sharing one journal.
#[must_use]
pub fn mock_register_map() -> (RegisterMap<MockRegisters, MockRegisters>, Journal) {
    let (gpio, clock) = MockRegisters::pair();
    let journal = gpio.journal();
    (RegisterMap::new(gpio, clock), journal)
}

/// Writes recorded in `journal`, in order, as `(window, offset, value)`.
#[must_use]
pub fn writes(journal: &Journal) -> Vec<(WindowKind, usize, u32)> {
    journal
        .borrow()
        .iter()
        .filter_map(|event| match *event {
            MockEvent::Write { window, offset, value } => Some((window, offset, value)),
            MockEvent::Read { .. } => None,
        })
        .collect()
}
