//! Register layout and the generic read-modify-write routine.
//!
//! Every hardware field is described by a [`Field`] (shift, width, access)
//! living in a [`Register`] (offset within its window, password
//! protection). [`write_field`] is the only place that composes a register
//! write, so the password injection for the clock-manager registers happens
//! in exactly one code path.
//!
//! # Layout
//!
//! | Register            | Window | Offset            | Fields                                   |
//! |---------------------|--------|-------------------|------------------------------------------|
//! | GPFSELn (n = pin/10)| GPIO   | `0x00 + 4n`       | FSEL[(pin%10)*3 +: 3]                    |
//! | GPSETn (n = pin/32) | GPIO   | `0x1C + 4n`       | write-one-to-set                         |
//! | GPCLRn              | GPIO   | `0x28 + 4n`       | write-one-to-clear                       |
//! | GPLEVn              | GPIO   | `0x34 + 4n`       | pin level (RO)                           |
//! | CM_GPnCTL           | CM     | `0x70 + 8n`       | PASSWD[31:24] MASH[10:9] BUSY[7] ENAB[4] SRC[3:0] |
//! | CM_GPnDIV           | CM     | `0x74 + 8n`       | PASSWD[31:24] DIVI[23:12] DIVF[11:0]     |

use crate::types::{ClockChannel, GpioPin};

/// Clock-manager password, required in bits 31:24 of every CM_GPnCTL and
/// CM_GPnDIV write. Writes without it are ignored by the hardware.
pub const PASSWORD: u32 = 0x5A;

/// Byte offsets of register bank 0 within each window.
pub mod offset {
    /// GPIO Function Select 0
    pub const GPFSEL0: usize = 0x00;
    /// GPIO Pin Output Set 0
    pub const GPSET0: usize = 0x1C;
    /// GPIO Pin Output Clear 0
    pub const GPCLR0: usize = 0x28;
    /// GPIO Pin Level 0
    pub const GPLEV0: usize = 0x34;
    /// Clock Manager General Purpose Clock 0 Control
    pub const CM_GP0CTL: usize = 0x70;
    /// Clock Manager General Purpose Clock 0 Divisor
    pub const CM_GP0DIV: usize = 0x74;
}

/// Bytes between consecutive clock channels (CTL/DIV pair = two words).
const CM_CHANNEL_STRIDE: usize = 8;

/// Smallest window that still holds every register: CM_GP2DIV ends at 0x88.
pub const MIN_WINDOW_LEN: usize = 0x88;

/// A 32-bit register window.
///
/// Implementations provide volatile word access at byte `offset` from the
/// window base. Offsets are always word-aligned and produced by [`Register`],
/// so they stay inside one 4 KiB block.
pub trait RegisterBlock {
    /// Read the register at `offset`.
    fn read(&self, offset: usize) -> u32;

    /// Write `value` to the register at `offset`.
    fn write(&mut self, offset: usize, value: u32);
}

impl<T: RegisterBlock + ?Sized> RegisterBlock for &mut T {
    fn read(&self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    fn write(&mut self, offset: usize, value: u32) {
        (**self).write(offset, value);
    }
}

/// One hardware register, identified by family and peripheral index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// GPFSELn holding the function select of `pin`.
    Gpfsel(GpioPin),
    /// GPSETn bank holding `pin`.
    Gpset(GpioPin),
    /// GPCLRn bank holding `pin`.
    Gpclr(GpioPin),
    /// GPLEVn bank holding `pin`.
    Gplev(GpioPin),
    /// CM_GPnCTL of a clock channel.
    CmGpCtl(ClockChannel),
    /// CM_GPnDIV of a clock channel.
    CmGpDiv(ClockChannel),
}

impl Register {
    /// Byte offset of this register within its window.
    #[must_use]
    pub fn offset(self) -> usize {
        let word = |base: usize, index: u8| base.saturating_add(usize::from(index).saturating_mul(4));
        match self {
            Self::Gpfsel(pin) => word(offset::GPFSEL0, pin.get() / 10),
            Self::Gpset(pin) => word(offset::GPSET0, pin.get() / 32),
            Self::Gpclr(pin) => word(offset::GPCLR0, pin.get() / 32),
            Self::Gplev(pin) => word(offset::GPLEV0, pin.get() / 32),
            Self::CmGpCtl(ch) => offset::CM_GP0CTL
                .saturating_add(usize::from(ch.index()).saturating_mul(CM_CHANNEL_STRIDE)),
            Self::CmGpDiv(ch) => offset::CM_GP0DIV
                .saturating_add(usize::from(ch.index()).saturating_mul(CM_CHANNEL_STRIDE)),
        }
    }

    /// Whether writes must carry [`PASSWORD`] in bits 31:24.
    #[must_use]
    pub const fn password_protected(self) -> bool {
        matches!(self, Self::CmGpCtl(_) | Self::CmGpDiv(_))
    }

    /// Register family name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gpfsel(_) => "GPFSEL",
            Self::Gpset(_) => "GPSET",
            Self::Gpclr(_) => "GPCLR",
            Self::Gplev(_) => "GPLEV",
            Self::CmGpCtl(_) => "CM_GPnCTL",
            Self::CmGpDiv(_) => "CM_GPnDIV",
        }
    }
}

/// Whether software may write a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Read/write.
    ReadWrite,
    /// Hardware-derived, read-only.
    ReadOnly,
}

/// A bit-packed field inside a 32-bit register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Field name for logs.
    pub name: &'static str,
    /// Bit position of the field's LSB.
    pub shift: u32,
    /// Width in bits.
    pub width: u32,
    /// Software access.
    pub access: Access,
}

impl Field {
    const fn rw(name: &'static str, shift: u32, width: u32) -> Self {
        Self { name, shift, width, access: Access::ReadWrite }
    }

    /// In-place mask of the field.
    #[must_use]
    pub const fn mask(self) -> u32 {
        let ones = if self.width >= 32 {
            u32::MAX
        } else {
            1u32.wrapping_shl(self.width).wrapping_sub(1)
        };
        ones.wrapping_shl(self.shift)
    }

    /// Largest value the field can hold.
    #[must_use]
    pub const fn max_value(self) -> u32 {
        self.mask().wrapping_shr(self.shift)
    }

    /// FSEL field of `pin` inside its GPFSEL register.
    #[must_use]
    pub const fn fsel(pin: GpioPin) -> Self {
        // (pin % 10) * 3 is at most 27
        let slot = (pin.get() % 10) as u32;
        Self::rw("FSEL", slot.wrapping_mul(3), 3)
    }
}

/// CM_GPnCTL.PASSWD / CM_GPnDIV.PASSWD
pub const PASSWD: Field = Field::rw("PASSWD", 24, 8);
/// CM_GPnCTL.MASH
pub const CTL_MASH: Field = Field::rw("MASH", 9, 2);
/// CM_GPnCTL.BUSY
pub const CTL_BUSY: Field = Field { name: "BUSY", shift: 7, width: 1, access: Access::ReadOnly };
/// CM_GPnCTL.ENAB
pub const CTL_ENAB: Field = Field::rw("ENAB", 4, 1);
/// CM_GPnCTL.SRC
pub const CTL_SRC: Field = Field::rw("SRC", 0, 4);
/// CM_GPnDIV.DIVI
pub const DIV_DIVI: Field = Field::rw("DIVI", 12, 12);
/// CM_GPnDIV.DIVF
pub const DIV_DIVF: Field = Field::rw("DIVF", 0, 12);

/// Read `field` out of `reg`.
pub fn read_field<B: RegisterBlock + ?Sized>(block: &B, reg: Register, field: Field) -> u32 {
    (block.read(reg.offset()) & field.mask()).wrapping_shr(field.shift)
}

/// Read-modify-write `field` of `reg` to `value`.
///
/// Bits of `value` above the field width are discarded (mask semantics, no
/// saturation). All bits outside the field keep their current value, except
/// that password-protected registers always receive [`PASSWORD`] in bits
/// 31:24. Read-only fields are left untouched.
pub fn write_field<B: RegisterBlock + ?Sized>(block: &mut B, reg: Register, field: Field, value: u32) {
    if field.access == Access::ReadOnly {
        tracing::warn!(register = reg.name(), field = field.name, "write to read-only field ignored");
        return;
    }

    let mut mask = field.mask();
    let mut bits = value.wrapping_shl(field.shift) & field.mask();
    if reg.password_protected() {
        mask |= PASSWD.mask();
        bits |= PASSWORD.wrapping_shl(PASSWD.shift);
    }

    let offset = reg.offset();
    let old = block.read(offset);
    let new = bits | (old & !mask);
    tracing::trace!(
        register = reg.name(),
        field = field.name,
        offset,
        old = format_args!("{old:#010x}"),
        new = format_args!("{new:#010x}"),
        "register write"
    );
    block.write(offset, new);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Word(u32);

    impl RegisterBlock for Word {
        fn read(&self, _offset: usize) -> u32 {
            self.0
        }

        fn write(&mut self, _offset: usize, value: u32) {
            self.0 = value;
        }
    }

    fn pin(n: u8) -> GpioPin {
        GpioPin::new(n).unwrap()
    }

    #[test]
    fn min_window_len_covers_last_register() {
        let last = Register::CmGpDiv(ClockChannel::Gp2).offset();
        assert_eq!(last + 4, MIN_WINDOW_LEN);
        assert!(Register::Gplev(pin(53)).offset() + 4 <= MIN_WINDOW_LEN);
    }

    #[test]
    fn masks_match_hardware_layout() {
        assert_eq!(PASSWD.mask(), 0xFF00_0000);
        assert_eq!(CTL_MASH.mask(), 0x0000_0600);
        assert_eq!(CTL_BUSY.mask(), 0x0000_0080);
        assert_eq!(CTL_ENAB.mask(), 0x0000_0010);
        assert_eq!(CTL_SRC.mask(), 0x0000_000F);
        assert_eq!(DIV_DIVI.mask(), 0x00FF_F000);
        assert_eq!(DIV_DIVF.mask(), 0x0000_0FFF);
        assert_eq!(Field::fsel(pin(4)).mask(), 0x0000_7000);
        assert_eq!(Field::fsel(pin(19)).mask(), 0x3800_0000);
        assert_eq!(DIV_DIVI.max_value(), 0xFFF);
    }

    #[test]
    fn offsets() {
        assert_eq!(Register::Gpfsel(pin(9)).offset(), 0x00);
        assert_eq!(Register::Gpfsel(pin(10)).offset(), 0x04);
        assert_eq!(Register::Gpfsel(pin(53)).offset(), 0x14);
        assert_eq!(Register::Gpset(pin(31)).offset(), 0x1C);
        assert_eq!(Register::Gpset(pin(32)).offset(), 0x20);
        assert_eq!(Register::Gplev(pin(53)).offset(), 0x38);
        assert_eq!(Register::CmGpCtl(ClockChannel::Gp0).offset(), 0x70);
        assert_eq!(Register::CmGpDiv(ClockChannel::Gp0).offset(), 0x74);
        assert_eq!(Register::CmGpCtl(ClockChannel::Gp2).offset(), 0x80);
        assert_eq!(Register::CmGpDiv(ClockChannel::Gp1).offset(), 0x7C);
    }

    #[test]
    fn write_preserves_bits_outside_mask() {
        let mut reg = Word(0xFFFF_FFFF);
        write_field(&mut reg, Register::Gpfsel(pin(4)), Field::fsel(pin(4)), 0);
        assert_eq!(reg.0, 0xFFFF_8FFF);
    }

    #[test]
    fn protected_write_injects_password() {
        let mut reg = Word(0x0000_0211);
        write_field(&mut reg, Register::CmGpCtl(ClockChannel::Gp0), CTL_ENAB, 0);
        assert_eq!(reg.0, 0x5A00_0201);
    }

    #[test]
    fn protected_write_overrides_stale_password_bits() {
        let mut reg = Word(0xA500_0000);
        write_field(&mut reg, Register::CmGpDiv(ClockChannel::Gp1), DIV_DIVF, 0x123);
        assert_eq!(reg.0, 0x5A00_0123);
    }

    #[test]
    fn oversized_value_is_truncated_not_saturated() {
        let mut reg = Word(0);
        write_field(&mut reg, Register::CmGpDiv(ClockChannel::Gp0), DIV_DIVI, 0x1001);
        assert_eq!(read_field(&reg, Register::CmGpDiv(ClockChannel::Gp0), DIV_DIVI), 0x001);
    }

    #[test]
    fn read_only_field_is_not_written() {
        let mut reg = Word(0x0000_0080);
        write_field(&mut reg, Register::CmGpCtl(ClockChannel::Gp0), CTL_BUSY, 0);
        assert_eq!(reg.0, 0x0000_0080);
    }
}
