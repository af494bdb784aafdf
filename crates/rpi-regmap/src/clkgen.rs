//! General-purpose clock generator sequencing.
//!
//! The clock manager must not be reconfigured while a generator is running,
//! so both protocols first stop the channel and wait for BUSY to clear.
//!
//! ```text
//! enable(pin, params)                    disable(pin)
//!   binding = clock_binding(pin)?          binding = clock_binding(pin)?
//!   ENAB = 0; wait BUSY == 0               ENAB = 0; wait BUSY == 0
//!   FSEL = binding.function                FSEL = input
//!   MASH, SRC, DIVI, DIVF                  MASH = integer, SRC = gnd
//!   ENAB = 1; wait BUSY == 1               DIVI = 0, DIVF = 0
//! ```
//!
//! [`ClockGenerator`] runs the protocols on an already-mapped register map.
//! The free functions [`enable`], [`disable`] and [`status`] map the windows
//! for the duration of one call.

use serde::{Deserialize, Serialize};

use crate::accessor::{ClockSnapshot, RegisterMap};
use crate::binding::require_clock_binding;
use crate::config::RegmapConfig;
use crate::error::{Error, Result};
use crate::poll::PollPolicy;
use crate::register::RegisterBlock;
use crate::types::{BusyState, ClockChannel, ClockSource, FunctionSelect, GpioPin, Mash};
use crate::window::{MappedWindow, RegisterWindows};

/// Denominator of the fractional divisor.
const DIVF_SCALE: u64 = 4096;

// ── ClockParams ──────────────────────────────────────────────────────────────

/// Output configuration of one clock generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockParams {
    /// Divider noise shaping.
    pub mash: Mash,
    /// Generator input.
    pub source: ClockSource,
    /// Integer part of the divisor (12 bits).
    pub divi: u32,
    /// Fractional part of the divisor in 1/4096 steps (12 bits).
    pub divf: u32,
}

impl ClockParams {
    /// Integer division of `source` by `divi`.
    #[must_use]
    pub const fn new(source: ClockSource, divi: u32) -> Self {
        Self { mash: Mash::Integer, source, divi, divf: 0 }
    }

    /// Set the MASH mode.
    #[must_use]
    pub const fn with_mash(mut self, mash: Mash) -> Self {
        self.mash = mash;
        self
    }

    /// Set the fractional divisor.
    #[must_use]
    pub const fn with_fraction(mut self, divf: u32) -> Self {
        self.divf = divf;
        self
    }

    /// Nominal output frequency for a source running at `source_hz`.
    ///
    /// `source_hz / (divi + divf / 4096)`; DIVF is ignored in integer mode.
    /// With MASH the output dithers around this value. Returns `None` for a
    /// zero divisor.
    #[must_use]
    pub fn frequency_hz(&self, source_hz: u64) -> Option<u64> {
        let divf = if self.mash == Mash::Integer { 0 } else { u64::from(self.divf & 0xFFF) };
        let divisor = u64::from(self.divi & 0xFFF).checked_mul(DIVF_SCALE)?.checked_add(divf)?;
        source_hz.checked_mul(DIVF_SCALE)?.checked_div(divisor)
    }
}

// ── ClockGenerator ───────────────────────────────────────────────────────────

/// Clock protocols over a mapped register map.
#[derive(Debug)]
pub struct ClockGenerator<'a, G, C> {
    regs: &'a mut RegisterMap<G, C>,
    poll: PollPolicy,
}

impl<'a, G: RegisterBlock, C: RegisterBlock> ClockGenerator<'a, G, C> {
    /// Drive `regs`, waiting on BUSY according to `poll`.
    pub fn new(regs: &'a mut RegisterMap<G, C>, poll: PollPolicy) -> Self {
        Self { regs, poll }
    }

    /// Route `pin` to its clock channel and start the generator.
    ///
    /// Returns the channel that now drives `pin`.
    ///
    /// # Errors
    ///
    /// - [`ParameterError::NoClockBinding`](crate::ParameterError::NoClockBinding)
    ///   if `pin` cannot carry a clock; no register is touched
    /// - [`Error::BusyTimeout`] if the generator does not stop or start
    ///   within the poll bound
    pub fn enable(&mut self, pin: GpioPin, params: &ClockParams) -> Result<ClockChannel> {
        let binding = require_clock_binding(pin)?;
        let ch = binding.channel;

        self.stop(ch)?;

        self.regs.set_function(pin, binding.function);
        self.regs.set_mash(ch, params.mash);
        self.regs.set_source(ch, params.source);
        self.regs.set_divisor_integer(ch, params.divi);
        self.regs.set_divisor_fraction(ch, params.divf);

        self.regs.set_enable(ch, true);
        self.wait(ch, BusyState::Running)?;

        tracing::info!(
            pin = pin.get(),
            channel = %ch,
            source = %params.source,
            mash = params.mash.bits(),
            divi = params.divi,
            divf = params.divf,
            "clock started"
        );
        Ok(ch)
    }

    /// Stop the generator driving `pin` and return both to their reset state.
    ///
    /// Idempotent: a second call leaves the same register contents.
    ///
    /// # Errors
    ///
    /// - [`ParameterError::NoClockBinding`](crate::ParameterError::NoClockBinding)
    ///   if `pin` cannot carry a clock; no register is touched
    /// - [`Error::BusyTimeout`] if the generator does not stop
    pub fn disable(&mut self, pin: GpioPin) -> Result<ClockChannel> {
        let ch = require_clock_binding(pin)?.channel;

        self.stop(ch)?;

        self.regs.set_function(pin, FunctionSelect::Input);
        self.regs.set_mash(ch, Mash::Integer);
        self.regs.set_source(ch, ClockSource::Ground);
        self.regs.set_divisor_integer(ch, 0);
        self.regs.set_divisor_fraction(ch, 0);

        tracing::info!(pin = pin.get(), channel = %ch, "clock stopped");
        Ok(ch)
    }

    /// Register contents of the channel bound to `pin`.
    ///
    /// # Errors
    ///
    /// [`ParameterError::NoClockBinding`](crate::ParameterError::NoClockBinding)
    /// if `pin` cannot carry a clock.
    pub fn status(&self, pin: GpioPin) -> Result<ClockSnapshot> {
        let ch = require_clock_binding(pin)?.channel;
        Ok(self.regs.clock_snapshot(ch))
    }

    fn stop(&mut self, ch: ClockChannel) -> Result<()> {
        self.regs.set_enable(ch, false);
        self.wait(ch, BusyState::Idle)
    }

    fn wait(&self, ch: ClockChannel, target: BusyState) -> Result<()> {
        let polls = self
            .poll
            .poll_until(|| self.regs.busy_state(ch) == target)
            .map_err(|exhausted| Error::BusyTimeout {
                channel: ch,
                waiting_for: target,
                polls: exhausted.polls,
            })?;
        tracing::trace!(channel = %ch, state = %target, polls, "busy settled");
        Ok(())
    }
}

// ── One-shot operations ──────────────────────────────────────────────────────

/// Map the windows, start the clock on `pin`, unmap.
///
/// # Errors
///
/// Parameter errors are reported before the device is opened. Otherwise the
/// protocol's error takes precedence over a failure to unmap; the windows
/// are released on every path.
pub fn enable(config: &RegmapConfig, pin: GpioPin, params: &ClockParams) -> Result<ClockChannel> {
    require_clock_binding(pin)?;
    with_windows(config, |regs| ClockGenerator::new(regs, config.poll).enable(pin, params))
}

/// Map the windows, stop the clock on `pin`, unmap.
///
/// # Errors
///
/// As for [`enable`].
pub fn disable(config: &RegmapConfig, pin: GpioPin) -> Result<ClockChannel> {
    require_clock_binding(pin)?;
    with_windows(config, |regs| ClockGenerator::new(regs, config.poll).disable(pin))
}

/// Map the windows, read the channel bound to `pin`, unmap.
///
/// # Errors
///
/// As for [`enable`].
pub fn status(config: &RegmapConfig, pin: GpioPin) -> Result<ClockSnapshot> {
    require_clock_binding(pin)?;
    with_windows(config, |regs| ClockGenerator::new(regs, config.poll).status(pin))
}

fn with_windows<T>(
    config: &RegmapConfig,
    op: impl FnOnce(&mut RegisterMap<MappedWindow, MappedWindow>) -> Result<T>,
) -> Result<T> {
    let mut windows = RegisterWindows::initialize(config)?;
    let outcome = op(windows.registers());
    let finalized = windows.finalize();
    let value = outcome?;
    finalized?;
    Ok(value)
}
