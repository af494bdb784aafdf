//! GPIO pin → general-purpose clock routing.
//!
//! Only a handful of pins can carry a GPCLK output, each through one fixed
//! alternate function:
//!
//! | Pin | Channel | Function |
//! |-----|---------|----------|
//! | 4   | GP0     | ALT0     |
//! | 5   | GP1     | ALT0     |
//! | 6   | GP2     | ALT0     |
//! | 20  | GP0     | ALT5     |
//! | 21  | GP1     | ALT5     |
//! | 32  | GP0     | ALT0     |
//! | 34  | GP0     | ALT0     |
//! | 42  | GP1     | ALT0     |
//! | 43  | GP2     | ALT0     |
//! | 44  | GP1     | ALT0     |

use crate::error::ParameterError;
use crate::types::{ClockChannel, FunctionSelect, GpioPin};

/// Clock channel and alternate function that route a pin to the clock manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockBinding {
    /// Channel driving the pin.
    pub channel: ClockChannel,
    /// Function select that connects the pin to `channel`.
    pub function: FunctionSelect,
}

const fn bind(channel: ClockChannel, function: FunctionSelect) -> Option<ClockBinding> {
    Some(ClockBinding { channel, function })
}

const GP0_ALT0: Option<ClockBinding> = bind(ClockChannel::Gp0, FunctionSelect::Alt0);
const GP1_ALT0: Option<ClockBinding> = bind(ClockChannel::Gp1, FunctionSelect::Alt0);
const GP2_ALT0: Option<ClockBinding> = bind(ClockChannel::Gp2, FunctionSelect::Alt0);
const GP0_ALT5: Option<ClockBinding> = bind(ClockChannel::Gp0, FunctionSelect::Alt5);
const GP1_ALT5: Option<ClockBinding> = bind(ClockChannel::Gp1, FunctionSelect::Alt5);

#[rustfmt::skip]
static BINDINGS: [Option<ClockBinding>; GpioPin::COUNT as usize] = [
    // 0-9
    None, None, None, None, GP0_ALT0, GP1_ALT0, GP2_ALT0, None, None, None,
    // 10-19
    None, None, None, None, None, None, None, None, None, None,
    // 20-29
    GP0_ALT5, GP1_ALT5, None, None, None, None, None, None, None, None,
    // 30-39
    None, None, GP0_ALT0, None, GP0_ALT0, None, None, None, None, None,
    // 40-49
    None, None, GP1_ALT0, GP2_ALT0, GP1_ALT0, None, None, None, None, None,
    // 50-53
    None, None, None, None,
];

/// Clock routing of `pin`, or `None` if it cannot carry a GPCLK output.
#[must_use]
pub fn clock_binding(pin: GpioPin) -> Option<ClockBinding> {
    BINDINGS.get(usize::from(pin.get())).copied().flatten()
}

/// Like [`clock_binding`], but an unbound pin is an error.
///
/// # Errors
///
/// [`ParameterError::NoClockBinding`] if `pin` has no GPCLK route.
pub fn require_clock_binding(pin: GpioPin) -> Result<ClockBinding, ParameterError> {
    clock_binding(pin).ok_or(ParameterError::NoClockBinding(pin.get()))
}

/// Iterate over every pin that has a clock route, in pin order.
pub fn bound_pins() -> impl Iterator<Item = (GpioPin, ClockBinding)> {
    GpioPin::all().filter_map(|pin| clock_binding(pin).map(|binding| (pin, binding)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(n: u8) -> GpioPin {
        GpioPin::new(n).unwrap()
    }

    #[test]
    fn pin4_is_gp0_alt0() {
        assert_eq!(
            clock_binding(pin(4)),
            Some(ClockBinding { channel: ClockChannel::Gp0, function: FunctionSelect::Alt0 })
        );
    }

    #[test]
    fn pin20_uses_alt5() {
        let binding = clock_binding(pin(20)).unwrap();
        assert_eq!(binding.function, FunctionSelect::Alt5);
        assert_eq!(binding.function.bits(), 0b010);
    }

    #[test]
    fn exactly_ten_pins_are_bound() {
        let pins: Vec<u8> = bound_pins().map(|(p, _)| p.get()).collect();
        assert_eq!(pins, [4, 5, 6, 20, 21, 32, 34, 42, 43, 44]);
    }

    #[test]
    fn every_binding_is_an_alternate_function() {
        assert!(bound_pins().all(|(_, b)| b.function.is_alternate()));
    }

    #[test]
    fn unbound_pin_is_parameter_error() {
        assert_eq!(require_clock_binding(pin(0)), Err(ParameterError::NoClockBinding(0)));
        assert_eq!(require_clock_binding(pin(53)), Err(ParameterError::NoClockBinding(53)));
    }
}
