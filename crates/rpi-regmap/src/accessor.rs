//! Peripheral register accessor.
//!
//! [`RegisterMap`] pairs a GPIO window with a clock-manager window and
//! exposes one getter/setter per hardware field. It is generic over
//! [`RegisterBlock`] so the same code drives `/dev/mem` mappings and the
//! in-memory mock.
//!
//! Setters take typed values ([`FunctionSelect`], [`Mash`],
//! [`ClockSource`]), so the only free-form inputs are the two 12-bit
//! divisor fields, which are truncated to their width. Getters return the raw
//! unsigned field value as read from hardware.

use crate::register::{
    read_field, write_field, Field, Register, RegisterBlock, CTL_BUSY, CTL_ENAB, CTL_MASH,
    CTL_SRC, DIV_DIVF, DIV_DIVI, PASSWD,
};
use crate::types::{BusyState, ClockChannel, ClockSource, FunctionSelect, GpioPin, Mash};

/// Field-level access to the GPIO controller and clock manager.
#[derive(Debug)]
pub struct RegisterMap<G, C> {
    gpio: G,
    clock: C,
}

impl<G, C> RegisterMap<G, C> {
    /// Wrap a GPIO window and a clock-manager window.
    pub fn new(gpio: G, clock: C) -> Self {
        Self { gpio, clock }
    }

    /// GPIO window.
    pub fn gpio(&self) -> &G {
        &self.gpio
    }

    /// Clock-manager window.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// GPIO window, mutably, for seeding test state. Writes through it
    /// bypass the field rules.
    #[cfg(any(test, feature = "mock"))]
    pub fn gpio_mut(&mut self) -> &mut G {
        &mut self.gpio
    }

    /// Clock-manager window, mutably, for seeding test state. Writes through
    /// it bypass the field rules, including password injection.
    #[cfg(any(test, feature = "mock"))]
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Split back into the two windows.
    pub fn into_parts(self) -> (G, C) {
        (self.gpio, self.clock)
    }
}

impl<G: RegisterBlock, C: RegisterBlock> RegisterMap<G, C> {
    // ── GPFSEL ───────────────────────────────────────────────────────────────

    /// Set GPFSEL.FSEL of `pin`.
    pub fn set_function(&mut self, pin: GpioPin, fsel: FunctionSelect) {
        write_field(&mut self.gpio, Register::Gpfsel(pin), Field::fsel(pin), fsel.bits());
    }

    /// GPFSEL.FSEL of `pin` (3-bit code).
    pub fn function(&self, pin: GpioPin) -> u32 {
        read_field(&self.gpio, Register::Gpfsel(pin), Field::fsel(pin))
    }

    // ── GPSET / GPCLR / GPLEV ────────────────────────────────────────────────

    /// Drive `pin` high through GPSETn.
    ///
    /// GPSET is write-one-to-set: only the pin's bit is written and zeros have
    /// no effect, so no read-modify-write is performed.
    pub fn set_high(&mut self, pin: GpioPin) {
        self.gpio.write(Register::Gpset(pin).offset(), bank_bit(pin));
    }

    /// Drive `pin` low through GPCLRn (write-one-to-clear).
    pub fn set_low(&mut self, pin: GpioPin) {
        self.gpio.write(Register::Gpclr(pin).offset(), bank_bit(pin));
    }

    /// Level of `pin` from GPLEVn.
    pub fn level(&self, pin: GpioPin) -> bool {
        self.gpio.read(Register::Gplev(pin).offset()) & bank_bit(pin) != 0
    }

    // ── CM_GPnCTL ────────────────────────────────────────────────────────────

    /// Set CM_GPnCTL.MASH.
    pub fn set_mash(&mut self, ch: ClockChannel, mash: Mash) {
        write_field(&mut self.clock, Register::CmGpCtl(ch), CTL_MASH, mash.bits());
    }

    /// Set CM_GPnCTL.ENAB.
    pub fn set_enable(&mut self, ch: ClockChannel, enable: bool) {
        write_field(&mut self.clock, Register::CmGpCtl(ch), CTL_ENAB, u32::from(enable));
    }

    /// Set CM_GPnCTL.SRC.
    pub fn set_source(&mut self, ch: ClockChannel, src: ClockSource) {
        write_field(&mut self.clock, Register::CmGpCtl(ch), CTL_SRC, src.bits());
    }

    /// CM_GPnCTL.MASH
    pub fn mash(&self, ch: ClockChannel) -> u32 {
        read_field(&self.clock, Register::CmGpCtl(ch), CTL_MASH)
    }

    /// CM_GPnCTL.BUSY (read-only; 1 while the generator runs).
    pub fn busy(&self, ch: ClockChannel) -> u32 {
        read_field(&self.clock, Register::CmGpCtl(ch), CTL_BUSY)
    }

    /// CM_GPnCTL.ENAB
    pub fn enable(&self, ch: ClockChannel) -> u32 {
        read_field(&self.clock, Register::CmGpCtl(ch), CTL_ENAB)
    }

    /// CM_GPnCTL.SRC
    pub fn source(&self, ch: ClockChannel) -> u32 {
        read_field(&self.clock, Register::CmGpCtl(ch), CTL_SRC)
    }

    /// BUSY decoded as a [`BusyState`].
    pub fn busy_state(&self, ch: ClockChannel) -> BusyState {
        BusyState::from_bit(self.busy(ch))
    }

    // ── CM_GPnDIV ────────────────────────────────────────────────────────────

    /// Set CM_GPnDIV.DIVI. Bits above 12 are discarded.
    pub fn set_divisor_integer(&mut self, ch: ClockChannel, divi: u32) {
        write_field(&mut self.clock, Register::CmGpDiv(ch), DIV_DIVI, divi);
    }

    /// Set CM_GPnDIV.DIVF. Bits above 12 are discarded.
    pub fn set_divisor_fraction(&mut self, ch: ClockChannel, divf: u32) {
        write_field(&mut self.clock, Register::CmGpDiv(ch), DIV_DIVF, divf);
    }

    /// CM_GPnDIV.DIVI
    pub fn divisor_integer(&self, ch: ClockChannel) -> u32 {
        read_field(&self.clock, Register::CmGpDiv(ch), DIV_DIVI)
    }

    /// CM_GPnDIV.DIVF
    pub fn divisor_fraction(&self, ch: ClockChannel) -> u32 {
        read_field(&self.clock, Register::CmGpDiv(ch), DIV_DIVF)
    }

    /// Raw CTL/DIV pair of a channel.
    pub fn clock_snapshot(&self, ch: ClockChannel) -> ClockSnapshot {
        ClockSnapshot {
            channel: ch,
            ctl: self.clock.read(Register::CmGpCtl(ch).offset()),
            div: self.clock.read(Register::CmGpDiv(ch).offset()),
        }
    }
}

/// Bit of `pin` within its 32-pin GPSET/GPCLR/GPLEV bank.
fn bank_bit(pin: GpioPin) -> u32 {
    1u32.wrapping_shl(u32::from(pin.get() % 32))
}

/// Raw register contents of one clock channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSnapshot {
    /// Channel the registers belong to.
    pub channel: ClockChannel,
    /// CM_GPnCTL
    pub ctl: u32,
    /// CM_GPnDIV
    pub div: u32,
}

impl ClockSnapshot {
    fn field(raw: u32, field: Field) -> u32 {
        (raw & field.mask()).wrapping_shr(field.shift)
    }

    /// CTL.PASSWD as read back (hardware reads it as zero; mocks keep it).
    pub fn ctl_password(&self) -> u32 {
        Self::field(self.ctl, PASSWD)
    }

    /// CTL.MASH
    pub fn mash(&self) -> u32 {
        Self::field(self.ctl, CTL_MASH)
    }

    /// CTL.BUSY
    pub fn busy(&self) -> bool {
        Self::field(self.ctl, CTL_BUSY) != 0
    }

    /// CTL.ENAB
    pub fn enabled(&self) -> bool {
        Self::field(self.ctl, CTL_ENAB) != 0
    }

    /// CTL.SRC
    pub fn source(&self) -> u32 {
        Self::field(self.ctl, CTL_SRC)
    }

    /// DIV.DIVI
    pub fn divisor_integer(&self) -> u32 {
        Self::field(self.div, DIV_DIVI)
    }

    /// DIV.DIVF
    pub fn divisor_fraction(&self) -> u32 {
        Self::field(self.div, DIV_DIVF)
    }

    /// True when the channel is stopped, grounded and zeroed.
    pub fn is_inert(&self) -> bool {
        !self.busy()
            && !self.enabled()
            && self.mash() == Mash::Integer.bits()
            && self.source() == ClockSource::Ground.bits()
            && self.divisor_integer() == 0
            && self.divisor_fraction() == 0
    }
}

impl core::fmt::Display for ClockSnapshot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let source = ClockSource::try_from(self.source()).map_or("reserved", ClockSource::name);
        write!(
            f,
            "{}: CTL={:#010x} DIV={:#010x} enab={} busy={} mash={} src={} divi={} divf={}",
            self.channel,
            self.ctl,
            self.div,
            u8::from(self.enabled()),
            u8::from(self.busy()),
            self.mash(),
            source,
            self.divisor_integer(),
            self.divisor_fraction(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockRegisters;

    fn map() -> RegisterMap<MockRegisters, MockRegisters> {
        RegisterMap::new(MockRegisters::gpio(), MockRegisters::clock_manager())
    }

    fn pin(n: u8) -> GpioPin {
        GpioPin::new(n).unwrap()
    }

    #[test]
    fn fsel_neighbours_untouched() {
        let mut regs = map();
        regs.gpio.poke(0x04, 0xFFFF_FFFF);
        regs.set_function(pin(15), FunctionSelect::Input);
        assert_eq!(regs.gpio.peek(0x04), 0xFFFC_7FFF);
        assert_eq!(regs.function(pin(15)), 0);
        assert_eq!(regs.function(pin(14)), 7);
    }

    #[test]
    fn level_uses_bank_one_above_31() {
        let mut regs = map();
        regs.set_high(pin(33));
        assert_eq!(regs.gpio.peek(0x20), 0b10);
        regs.set_low(pin(0));
        assert_eq!(regs.gpio.peek(0x28), 0b1);
        regs.gpio.poke(0x38, 1 << 21);
        assert!(regs.level(pin(53)));
        assert!(!regs.level(pin(52)));
    }

    #[test]
    fn snapshot_decodes_fields() {
        let snap = ClockSnapshot { channel: ClockChannel::Gp0, ctl: 0x5A00_0291, div: 0x5A03_2000 };
        assert_eq!(snap.mash(), 1);
        assert!(snap.busy());
        assert!(snap.enabled());
        assert_eq!(snap.source(), 1);
        assert_eq!(snap.divisor_integer(), 50);
        assert_eq!(snap.divisor_fraction(), 0);
        assert!(!snap.is_inert());
        assert_eq!(
            snap.to_string(),
            "GP0: CTL=0x5a000291 DIV=0x5a032000 enab=1 busy=1 mash=1 src=osc divi=50 divf=0"
        );
    }
}
