//! Register window manager.
//!
//! Maps the GPIO controller and clock manager blocks out of the
//! physical-memory device and owns both mappings until they are released.
//!
//! # Lifecycle
//!
//! ```text
//! RegisterWindows::initialize(&config)
//!     open(device, O_RDWR | O_SYNC)
//!     mmap(gpio_base,  block_len, PROT_READ | PROT_WRITE, MAP_SHARED)
//!     mmap(clock_base, block_len, PROT_READ | PROT_WRITE, MAP_SHARED)
//!     close(device)                    <- handle is never retained
//!         ↓
//! windows.registers()  -> &mut RegisterMap<MappedWindow, MappedWindow>
//!         ↓
//! windows.finalize()                   <- munmap each window independently
//! ```
//!
//! Only one `RegisterWindows` may exist per process at a time; a second
//! `initialize` before the first is finalized (or dropped) fails with
//! [`ObjectError::AlreadyMapped`]. Any failure during `initialize` releases
//! whatever was already mapped, so no half-initialized value is ever
//! returned.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, IntoRawFd};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::accessor::RegisterMap;
use crate::config::RegmapConfig;
use crate::error::ObjectError;
use crate::register::{RegisterBlock, MIN_WINDOW_LEN};

/// Set while a `RegisterWindows` is alive.
static WINDOWS_MAPPED: AtomicBool = AtomicBool::new(false);

/// Process-wide ownership token for the mapped windows.
#[derive(Debug)]
struct WindowClaim(());

impl WindowClaim {
    fn acquire() -> Result<Self, ObjectError> {
        WINDOWS_MAPPED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(()))
            .map_err(|_| ObjectError::AlreadyMapped)
    }
}

impl Drop for WindowClaim {
    fn drop(&mut self) {
        WINDOWS_MAPPED.store(false, Ordering::Release);
    }
}

/// One mapped block of physical address space.
///
/// Unmapped on [`MappedWindow::unmap`] or drop. Accesses are volatile 32-bit
/// reads and writes.
///
/// Windows are only created by [`RegisterWindows::initialize`], which holds
/// the process-wide claim:
///
/// ```compile_fail
/// let file = std::fs::File::open("/dev/mem").unwrap();
/// let _ = rpi_regmap::MappedWindow::map(&file, 0x3F20_0000, 4096);
/// ```
#[derive(Debug)]
pub struct MappedWindow {
    base: NonNull<u32>,
    len: usize,
    phys: u64,
}

// SAFETY: the mapping is plain shared memory; moving the owner to another
// thread does not invalidate it. `&mut self` on writes serializes mutation.
unsafe impl Send for MappedWindow {}

impl MappedWindow {
    /// Map `len` bytes of `file` starting at physical address `phys`.
    ///
    /// # Errors
    ///
    /// [`ObjectError::AddressOverflow`] if `phys` does not fit `off_t`,
    /// [`ObjectError::Map`] if `mmap` fails (e.g. `phys` not page-aligned,
    /// insufficient privilege).
    pub(crate) fn map(file: &File, phys: u64, len: usize) -> Result<Self, ObjectError> {
        let offset = libc::off_t::try_from(phys).map_err(|_| ObjectError::AddressOverflow(phys))?;

        // SAFETY: requesting a fresh shared mapping at a kernel-chosen address;
        // no existing memory is aliased. The fd is valid for the call.
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                offset,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(ObjectError::Map { base: phys, len, source: io::Error::last_os_error() });
        }
        let base = NonNull::new(addr.cast::<u32>()).ok_or_else(|| ObjectError::Map {
            base: phys,
            len,
            source: io::Error::from(io::ErrorKind::AddrNotAvailable),
        })?;

        tracing::debug!(phys = format_args!("{phys:#010x}"), len, "window mapped");
        Ok(Self { base, len, phys })
    }

    /// Physical base address of the window.
    #[must_use]
    pub fn phys_base(&self) -> u64 {
        self.phys
    }

    /// Mapping length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True only for a zero-length mapping, which `mmap` never produces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove the mapping.
    ///
    /// # Errors
    ///
    /// [`ObjectError::Unmap`] if `munmap` fails. The window is consumed
    /// either way and must not be used again.
    pub fn unmap(self) -> Result<(), ObjectError> {
        let this = std::mem::ManuallyDrop::new(self);
        this.release()
    }

    fn release(&self) -> Result<(), ObjectError> {
        // SAFETY: `base`/`len` describe a mapping created by `map` that has not
        // been released yet; callers never touch it afterwards.
        let rc = unsafe { libc::munmap(self.base.as_ptr().cast(), self.len) };
        if rc == -1 {
            return Err(ObjectError::Unmap { base: self.phys, source: io::Error::last_os_error() });
        }
        tracing::debug!(phys = format_args!("{:#010x}", self.phys), "window unmapped");
        Ok(())
    }

    fn word_ptr(&self, offset: usize) -> Option<*mut u32> {
        let in_bounds = offset % 4 == 0 && offset.checked_add(4).is_some_and(|end| end <= self.len);
        // SAFETY: bounds and alignment were checked, so the pointer stays
        // inside the mapping.
        in_bounds.then(|| unsafe { self.base.as_ptr().add(offset / 4) })
    }
}

impl RegisterBlock for MappedWindow {
    fn read(&self, offset: usize) -> u32 {
        match self.word_ptr(offset) {
            // SAFETY: in-bounds, aligned word of a live read/write mapping.
            Some(word) => unsafe { ptr::read_volatile(word) },
            None => {
                tracing::warn!(offset, phys = self.phys, "read outside window ignored");
                0
            }
        }
    }

    fn write(&mut self, offset: usize, value: u32) {
        match self.word_ptr(offset) {
            // SAFETY: in-bounds, aligned word of a live read/write mapping.
            Some(word) => unsafe { ptr::write_volatile(word, value) },
            None => tracing::warn!(offset, phys = self.phys, "write outside window ignored"),
        }
    }
}

impl Drop for MappedWindow {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::warn!(error = %err, "implicit unmap failed");
        }
    }
}

/// The process's mapped GPIO and clock-manager windows.
pub struct RegisterWindows {
    registers: RegisterMap<MappedWindow, MappedWindow>,
    // Dropped after `registers` so the claim outlives both mappings.
    _claim: WindowClaim,
}

impl RegisterWindows {
    /// Open `config.device`, map both windows and close the device.
    ///
    /// # Errors
    ///
    /// - [`ObjectError::AlreadyMapped`] if another `RegisterWindows` is alive
    /// - [`ObjectError::WindowTooSmall`] if `config.block_len` does not reach
    ///   CM_GP2DIV
    /// - [`ObjectError::Open`] if the device cannot be opened
    /// - [`ObjectError::Map`] / [`ObjectError::AddressOverflow`] if either
    ///   mapping fails
    /// - [`ObjectError::Close`] if the device handle cannot be closed
    ///
    /// On every error path any window that was mapped is released first.
    pub fn initialize(config: &RegmapConfig) -> Result<Self, ObjectError> {
        if config.block_len < MIN_WINDOW_LEN {
            return Err(ObjectError::WindowTooSmall { len: config.block_len, required: MIN_WINDOW_LEN });
        }
        let claim = WindowClaim::acquire()?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(&config.device)
            .map_err(|source| ObjectError::Open { path: config.device.clone(), source })?;

        let mapped = MappedWindow::map(&file, config.gpio_base, config.block_len).and_then(|gpio| {
            MappedWindow::map(&file, config.clock_base, config.block_len).map(|clock| (gpio, clock))
        });
        // Close before inspecting the mapping result: the handle is released on
        // every path, and its close error is reported only if mapping succeeded.
        let closed = close(file);
        let (gpio, clock) = mapped?;
        closed?;

        tracing::debug!(
            device = %config.device.display(),
            gpio = format_args!("{:#010x}", config.gpio_base),
            clock = format_args!("{:#010x}", config.clock_base),
            "register windows initialized"
        );
        Ok(Self { registers: RegisterMap::new(gpio, clock), _claim: claim })
    }

    /// Accessor over both windows.
    pub fn registers(&mut self) -> &mut RegisterMap<MappedWindow, MappedWindow> {
        &mut self.registers
    }

    /// Unmap both windows.
    ///
    /// Each window is released independently; a failure on one does not keep
    /// the other mapped.
    ///
    /// # Errors
    ///
    /// The first [`ObjectError::Unmap`] encountered.
    pub fn finalize(self) -> Result<(), ObjectError> {
        let Self { registers, _claim: claim } = self;
        let (gpio, clock) = registers.into_parts();
        let gpio_result = gpio.unmap();
        let clock_result = clock.unmap();
        drop(claim);
        gpio_result.and(clock_result)
    }
}

impl core::fmt::Debug for RegisterWindows {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegisterWindows")
            .field("gpio", &self.registers.gpio().phys_base())
            .field("clock", &self.registers.clock().phys_base())
            .finish()
    }
}

/// Close `file`, reporting the OS error that `File`'s drop would discard.
fn close(file: File) -> Result<(), ObjectError> {
    let fd = file.into_raw_fd();
    // SAFETY: `fd` came from `into_raw_fd`, so we own it and close it once.
    if unsafe { libc::close(fd) } == -1 {
        return Err(ObjectError::Close { source: io::Error::last_os_error() });
    }
    Ok(())
}
