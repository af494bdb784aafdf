//! Error types.
//!
//! Two kinds of failure exist:
//!
//! - [`ParameterError`]: the caller asked for something outside the hardware's
//!   domain (pin 54, a pin with no clock binding, an undefined field code).
//!   Detected before any register is touched.
//! - [`ObjectError`]: the operating environment refused an operation
//!   (opening the memory device, mapping, unmapping, closing). Only the
//!   window manager produces these; once a window is mapped, register reads
//!   and writes cannot fail.
//!
//! [`Error`] joins both with the busy-poll timeout raised by the clock
//! generator protocols.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::{BusyState, ClockChannel};

/// A caller-supplied value is outside the hardware's domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParameterError {
    /// GPIO pin number above 53.
    #[error("GPIO pin {0} out of range (0-53)")]
    PinOutOfRange(u8),
    /// Clock channel number above 2.
    #[error("clock channel {0} out of range (0-2)")]
    ChannelOutOfRange(u8),
    /// The pin cannot be routed to any general-purpose clock channel.
    #[error("GPIO pin {0} has no general-purpose clock binding")]
    NoClockBinding(u8),
    /// A raw field value does not name a defined encoding.
    #[error("{field} value {value:#x} is not a defined encoding")]
    UnknownCode {
        /// Field name, e.g. `"MASH"`.
        field: &'static str,
        /// The rejected raw value.
        value: u32,
    },
}

/// An operation against the operating environment failed.
#[derive(Debug, Error)]
pub enum ObjectError {
    /// The register windows are already mapped by this process.
    #[error("register windows are already mapped")]
    AlreadyMapped,
    /// The physical-memory device could not be opened.
    #[error("failed to open {}", path.display())]
    Open {
        /// Device path that was opened.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// `mmap` failed for one window.
    #[error("failed to map {len:#x} bytes at physical address {base:#010x}")]
    Map {
        /// Physical base address of the window.
        base: u64,
        /// Requested mapping length.
        len: usize,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// `munmap` failed for one window.
    #[error("failed to unmap window at physical address {base:#010x}")]
    Unmap {
        /// Physical base address of the window.
        base: u64,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The device handle could not be closed after mapping.
    #[error("failed to close physical-memory device")]
    Close {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The configured mapping length cannot hold every register.
    #[error("window length {len:#x} is smaller than the register span {required:#x}")]
    WindowTooSmall {
        /// Configured mapping length.
        len: usize,
        /// Bytes needed to reach the last register.
        required: usize,
    },
    /// The physical address does not fit in the platform's file offset type.
    #[error("physical address {0:#x} is not representable as a file offset")]
    AddressOverflow(u64),
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    /// See [`ParameterError`].
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    /// See [`ObjectError`].
    #[error(transparent)]
    Object(#[from] ObjectError),
    /// The BUSY flag of a clock channel did not reach the expected state
    /// within the configured poll bound.
    #[error("clock channel {channel} not {waiting_for} after {polls} polls")]
    BusyTimeout {
        /// Channel being polled.
        channel: ClockChannel,
        /// State the protocol was waiting for.
        waiting_for: BusyState,
        /// Number of reads performed.
        polls: u32,
    },
}

/// Result alias defaulting to the crate [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;
