//! Peripheral-index and field-value newtypes.
//!
//! Each type carries the legal range of one hardware field, so a setter that
//! takes one cannot be handed an out-of-domain value:
//! - `GpioPin`: 0–53
//! - `ClockChannel`: GPCLK0–GPCLK2
//! - `FunctionSelect`: the eight GPFSEL codes (note the non-monotonic ALT encoding)
//! - `Mash`, `ClockSource`: CM_GPnCTL enumerations
//!
//! Raw values coming back from hardware are converted with `TryFrom<u32>`.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParameterError;

// ── GpioPin ──────────────────────────────────────────────────────────────────

/// A BCM GPIO pin number, validated to 0–53.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct GpioPin(u8);

impl GpioPin {
    /// Number of GPIO pins on the controller.
    pub const COUNT: u8 = 54;

    /// Create a pin, rejecting numbers above 53.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::PinOutOfRange`] if `pin >= 54`.
    pub const fn new(pin: u8) -> Result<Self, ParameterError> {
        if pin < Self::COUNT {
            Ok(Self(pin))
        } else {
            Err(ParameterError::PinOutOfRange(pin))
        }
    }

    /// Return the raw pin number.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Iterate over all 54 pins in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT).map(Self)
    }
}

impl TryFrom<u8> for GpioPin {
    type Error = ParameterError;

    fn try_from(pin: u8) -> Result<Self, Self::Error> {
        Self::new(pin)
    }
}

impl fmt::Display for GpioPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{}", self.0)
    }
}

// ── ClockChannel ─────────────────────────────────────────────────────────────

/// General-purpose clock channel (CM_GP0..CM_GP2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockChannel {
    /// GPCLK0
    Gp0 = 0,
    /// GPCLK1
    Gp1 = 1,
    /// GPCLK2
    Gp2 = 2,
}

impl ClockChannel {
    /// All channels in register order.
    pub const ALL: [Self; 3] = [Self::Gp0, Self::Gp1, Self::Gp2];

    /// Channel index 0–2.
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ClockChannel {
    type Error = ParameterError;

    fn try_from(ch: u8) -> Result<Self, Self::Error> {
        match ch {
            0 => Ok(Self::Gp0),
            1 => Ok(Self::Gp1),
            2 => Ok(Self::Gp2),
            other => Err(ParameterError::ChannelOutOfRange(other)),
        }
    }
}

impl fmt::Display for ClockChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GP{}", self.index())
    }
}

// ── FunctionSelect ───────────────────────────────────────────────────────────

/// GPFSEL function-select code for one pin.
///
/// The alternate-function codes are not in numeric order: ALT4 is `0b011`
/// and ALT5 is `0b010`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionSelect {
    /// Pin is an input.
    Input = 0b000,
    /// Pin is an output.
    Output = 0b001,
    /// Alternate function 0.
    Alt0 = 0b100,
    /// Alternate function 1.
    Alt1 = 0b101,
    /// Alternate function 2.
    Alt2 = 0b110,
    /// Alternate function 3.
    Alt3 = 0b111,
    /// Alternate function 4.
    Alt4 = 0b011,
    /// Alternate function 5.
    Alt5 = 0b010,
}

impl FunctionSelect {
    /// Every code, in encoding order 0–7.
    pub const ALL: [Self; 8] = [
        Self::Input,
        Self::Output,
        Self::Alt5,
        Self::Alt4,
        Self::Alt0,
        Self::Alt1,
        Self::Alt2,
        Self::Alt3,
    ];

    /// Raw 3-bit encoding.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// True for the six alternate functions.
    #[must_use]
    pub const fn is_alternate(self) -> bool {
        !matches!(self, Self::Input | Self::Output)
    }
}

impl fmt::Display for FunctionSelect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Alt0 => "alt0",
            Self::Alt1 => "alt1",
            Self::Alt2 => "alt2",
            Self::Alt3 => "alt3",
            Self::Alt4 => "alt4",
            Self::Alt5 => "alt5",
        })
    }
}

impl TryFrom<u32> for FunctionSelect {
    type Error = ParameterError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            0b000 => Ok(Self::Input),
            0b001 => Ok(Self::Output),
            0b010 => Ok(Self::Alt5),
            0b011 => Ok(Self::Alt4),
            0b100 => Ok(Self::Alt0),
            0b101 => Ok(Self::Alt1),
            0b110 => Ok(Self::Alt2),
            0b111 => Ok(Self::Alt3),
            value => Err(ParameterError::UnknownCode { field: "FSEL", value }),
        }
    }
}

// ── Mash ─────────────────────────────────────────────────────────────────────

/// CM_GPnCTL.MASH: noise-shaping order of the fractional divider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mash {
    /// Integer division; DIVF is ignored.
    #[default]
    Integer = 0,
    /// 1-stage MASH (equivalent to a non-MASH fractional divider).
    OneStage = 1,
    /// 2-stage MASH.
    TwoStage = 2,
    /// 3-stage MASH.
    ThreeStage = 3,
}

impl Mash {
    /// Every mode, in encoding order.
    pub const ALL: [Self; 4] = [Self::Integer, Self::OneStage, Self::TwoStage, Self::ThreeStage];

    /// Raw 2-bit encoding.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Mash {
    type Error = ParameterError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            0 => Ok(Self::Integer),
            1 => Ok(Self::OneStage),
            2 => Ok(Self::TwoStage),
            3 => Ok(Self::ThreeStage),
            value => Err(ParameterError::UnknownCode { field: "MASH", value }),
        }
    }
}

// ── ClockSource ──────────────────────────────────────────────────────────────

/// CM_GPnCTL.SRC: clock generator input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClockSource {
    /// Grounded (no clock).
    #[default]
    Ground = 0,
    /// Crystal oscillator (19.2 MHz on BCM2835–BCM2837, 54 MHz on BCM2711).
    Oscillator = 1,
    /// testdebug0
    TestDebug0 = 2,
    /// testdebug1
    TestDebug1 = 3,
    /// PLLA per
    PllA = 4,
    /// PLLC per
    PllC = 5,
    /// PLLD per
    PllD = 6,
    /// HDMI auxiliary
    HdmiAux = 7,
}

impl ClockSource {
    /// Every defined source, in encoding order.
    pub const ALL: [Self; 8] = [
        Self::Ground,
        Self::Oscillator,
        Self::TestDebug0,
        Self::TestDebug1,
        Self::PllA,
        Self::PllC,
        Self::PllD,
        Self::HdmiAux,
    ];

    /// Raw 4-bit encoding.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Short lowercase name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ground => "gnd",
            Self::Oscillator => "osc",
            Self::TestDebug0 => "dbg0",
            Self::TestDebug1 => "dbg1",
            Self::PllA => "plla",
            Self::PllC => "pllc",
            Self::PllD => "plld",
            Self::HdmiAux => "hdmi",
        }
    }
}

impl TryFrom<u32> for ClockSource {
    type Error = ParameterError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|src| src.bits() == bits)
            .ok_or(ParameterError::UnknownCode { field: "SRC", value: bits })
    }
}

impl FromStr for ClockSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|src| src.name() == lower)
            .ok_or_else(|| format!("unknown clock source `{s}` (expected gnd, osc, dbg0, dbg1, plla, pllc, plld, hdmi)"))
    }
}

impl fmt::Display for ClockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── BusyState ────────────────────────────────────────────────────────────────

/// CM_GPnCTL.BUSY as observed by the sequencing protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyState {
    /// Clock generator is not running.
    Idle,
    /// Clock generator is running.
    Running,
}

impl BusyState {
    /// Decode the 1-bit BUSY field.
    #[must_use]
    pub const fn from_bit(bit: u32) -> Self {
        if bit & 1 == 0 {
            Self::Idle
        } else {
            Self::Running
        }
    }
}

impl fmt::Display for BusyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Running => "running",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_range_is_0_to_53() {
        assert_eq!(GpioPin::new(53).map(GpioPin::get), Ok(53));
        assert_eq!(GpioPin::new(54), Err(ParameterError::PinOutOfRange(54)));
        assert_eq!(GpioPin::all().count(), 54);
    }

    #[test]
    fn channel_rejects_3() {
        assert_eq!(ClockChannel::try_from(2), Ok(ClockChannel::Gp2));
        assert_eq!(
            ClockChannel::try_from(3),
            Err(ParameterError::ChannelOutOfRange(3))
        );
    }

    #[test]
    fn function_select_alt_encoding() {
        assert_eq!(FunctionSelect::Alt0.bits(), 4);
        assert_eq!(FunctionSelect::Alt4.bits(), 3);
        assert_eq!(FunctionSelect::Alt5.bits(), 2);
        for (bits, fsel) in (0u32..).zip(FunctionSelect::ALL) {
            assert_eq!(fsel.bits(), bits);
            assert_eq!(FunctionSelect::try_from(bits), Ok(fsel));
        }
        assert!(FunctionSelect::try_from(8).is_err());
    }

    #[test]
    fn source_parses_short_names() {
        assert_eq!("osc".parse::<ClockSource>(), Ok(ClockSource::Oscillator));
        assert_eq!("PLLD".parse::<ClockSource>(), Ok(ClockSource::PllD));
        assert!("xtal".parse::<ClockSource>().is_err());
        assert!(ClockSource::try_from(8).is_err());
    }

    #[test]
    fn mash_decodes_all_two_bit_values() {
        for mash in Mash::ALL {
            assert_eq!(Mash::try_from(mash.bits()), Ok(mash));
        }
        assert!(Mash::try_from(4).is_err());
    }
}
