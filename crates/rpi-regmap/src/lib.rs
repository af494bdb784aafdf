//! Register-mapped peripheral control for Raspberry Pi
//!
//! Maps the GPIO controller and clock manager out of `/dev/mem` and drives
//! their registers directly from userspace: pin function select, pin levels
//! and the three general-purpose clock generators (GPCLK0-2).
//!
//! # Architecture Layers
//!
//! ```text
//! gpclk CLI / application
//!         ↓
//! clkgen (enable/disable sequencing, busy polling)
//!         ↓
//! accessor::RegisterMap (one getter/setter per field)     gpio::Pin (embedded-hal)
//!         ↓
//! register (layout + generic read-modify-write, password injection)
//!         ↓
//! window::RegisterWindows (mmap of /dev/mem)  |  mocks::MockRegisters
//! ```
//!
//! # Modules
//!
//! - [`window`] - Register window manager (map / unmap)
//! - [`accessor`] - Peripheral register accessor
//! - [`clkgen`] - Clock generator enable/disable protocols
//! - [`binding`] - Pin → clock channel routing table
//! - [`gpio`] - Type-state pins implementing `embedded-hal` traits
//! - [`config`] - SoC presets and mapping configuration
//!
//! # Features
//!
//! - `mock` (off by default): in-memory register backend
//!   (`mocks::MockRegisters`) and the raw `gpio_mut`/`clock_mut` window
//!   handles used to seed test state
//!
//! # Example
//!
//! ```no_run
//! use rpi_regmap::{clkgen, ClockParams, ClockSource, GpioPin, Mash, RegmapConfig};
//!
//! # fn main() -> rpi_regmap::Result<()> {
//! let config = RegmapConfig::from_env();
//! let params = ClockParams::new(ClockSource::Oscillator, 50).with_mash(Mash::OneStage);
//! clkgen::enable(&config, GpioPin::new(4)?, &params)?;
//! # Ok(())
//! # }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::arithmetic_side_effects,
        clippy::indexing_slicing
    )
)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing over println! in lib code
// Pedantic lints suppressed for this register-access crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors — callers decide
#![allow(clippy::module_name_repetitions)]

pub mod accessor;
pub mod binding;
pub mod clkgen;
pub mod config;
pub mod error;
pub mod gpio;
pub mod mocks;
pub mod poll;
pub mod register;
pub mod types;
pub mod window;

pub use accessor::{ClockSnapshot, RegisterMap};
pub use binding::{clock_binding, ClockBinding};
pub use clkgen::{ClockGenerator, ClockParams};
pub use config::{RegmapConfig, Soc};
pub use error::{Error, ObjectError, ParameterError, Result};
pub use gpio::{Pin, PinState};
pub use poll::PollPolicy;
pub use register::{RegisterBlock, PASSWORD};
pub use types::{BusyState, ClockChannel, ClockSource, FunctionSelect, GpioPin, Mash};
pub use window::{MappedWindow, RegisterWindows};
