//! Register-driven GPIO pins with type-state encoding.
//!
//! A [`Pin`] borrows the [`RegisterMap`] mutably, so while a pin handle is
//! alive nothing else can reprogram the registers under it. Converting the
//! mode writes GPFSEL; level operations use GPSET/GPCLR/GPLEV.
//!
//! The pins implement the `embedded-hal` 1.0 digital traits, so generic
//! drivers can toggle a Raspberry Pi pin through the mapped window:
//!
//! ```no_run
//! use embedded_hal::digital::OutputPin;
//! use rpi_regmap::{GpioPin, RegisterWindows, RegmapConfig};
//!
//! # fn main() -> rpi_regmap::Result<()> {
//! let mut windows = RegisterWindows::initialize(&RegmapConfig::default())?;
//! let mut led = windows.registers().pin(GpioPin::new(17)?).into_output();
//! led.set_high().ok();
//! drop(led);
//! windows.finalize()?;
//! # Ok(())
//! # }
//! ```

use core::convert::Infallible;
use core::marker::PhantomData;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};

pub use embedded_hal::digital::PinState;

use crate::accessor::RegisterMap;
use crate::register::RegisterBlock;
use crate::types::{FunctionSelect, GpioPin};

/// Mode has not been written yet.
pub struct Unconfigured;

/// Input mode marker
pub struct Input;

/// Output mode marker
pub struct Output;

/// Pin routed to an alternate function; level access is not available.
pub struct Alternate;

/// Pin mode marker trait
pub trait PinMode {}

impl PinMode for Unconfigured {}
impl PinMode for Input {}
impl PinMode for Output {}
impl PinMode for Alternate {}

/// GPIO pin with type-state encoding
pub struct Pin<'a, G, C, MODE: PinMode> {
    regs: &'a mut RegisterMap<G, C>,
    pin: GpioPin,
    _mode: PhantomData<MODE>,
}

impl<G: RegisterBlock, C: RegisterBlock> RegisterMap<G, C> {
    /// Borrow `pin` for mode and level control. Registers are not touched
    /// until the mode is set.
    pub fn pin(&mut self, pin: GpioPin) -> Pin<'_, G, C, Unconfigured> {
        Pin { regs: self, pin, _mode: PhantomData }
    }
}

/// Typestate transitions
impl<'a, G: RegisterBlock, C: RegisterBlock, MODE: PinMode> Pin<'a, G, C, MODE> {
    /// Pin number.
    pub fn number(&self) -> GpioPin {
        self.pin
    }

    fn into_mode<NEW: PinMode>(self, fsel: FunctionSelect) -> Pin<'a, G, C, NEW> {
        self.regs.set_function(self.pin, fsel);
        Pin { regs: self.regs, pin: self.pin, _mode: PhantomData }
    }

    /// Convert to input mode
    pub fn into_input(self) -> Pin<'a, G, C, Input> {
        self.into_mode(FunctionSelect::Input)
    }

    /// Convert to output mode
    pub fn into_output(self) -> Pin<'a, G, C, Output> {
        self.into_mode(FunctionSelect::Output)
    }

    /// Convert to output mode, driving `state` before the output is enabled
    /// so the pin never glitches to the previous latch value.
    pub fn into_output_in_state(self, state: PinState) -> Pin<'a, G, C, Output> {
        match state {
            PinState::High => self.regs.set_high(self.pin),
            PinState::Low => self.regs.set_low(self.pin),
        }
        self.into_output()
    }

    /// Route the pin to an alternate function.
    ///
    /// `Input` and `Output` are not alternate functions; use
    /// [`into_input`](Self::into_input) / [`into_output`](Self::into_output).
    pub fn into_alternate(self, fsel: FunctionSelect) -> Option<Pin<'a, G, C, Alternate>> {
        fsel.is_alternate().then(|| self.into_mode(fsel))
    }
}

impl<G, C, MODE: PinMode> ErrorType for Pin<'_, G, C, MODE> {
    type Error = Infallible;
}

impl<G: RegisterBlock, C: RegisterBlock> OutputPin for Pin<'_, G, C, Output> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.regs.set_low(self.pin);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.regs.set_high(self.pin);
        Ok(())
    }
}

impl<G: RegisterBlock, C: RegisterBlock> StatefulOutputPin for Pin<'_, G, C, Output> {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.regs.level(self.pin))
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.regs.level(self.pin))
    }
}

impl<G: RegisterBlock, C: RegisterBlock> InputPin for Pin<'_, G, C, Input> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.regs.level(self.pin))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.regs.level(self.pin))
    }
}
