//! Register window configuration.
//!
//! Physical addresses depend on the SoC: the ARM-side peripheral base moved
//! between board generations while the block offsets stayed fixed.
//!
//! | SoC            | Boards                 | Peripheral base |
//! |----------------|------------------------|-----------------|
//! | BCM2835        | Pi 1, Zero             | `0x2000_0000`   |
//! | BCM2836/BCM2837| Pi 2, Pi 3             | `0x3F00_0000`   |
//! | BCM2711        | Pi 4, Pi 400, CM4      | `0xFE00_0000`   |
//!
//! GPIO controller = base + `0x20_0000`, clock manager = base + `0x10_1000`.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::poll::PollPolicy;

/// Default physical-memory device.
pub const DEFAULT_DEVICE: &str = "/dev/mem";

/// Mapping length of each window: one 4 KiB page.
pub const BLOCK_SIZE: usize = 4096;

/// Offset of the GPIO controller from the peripheral base.
pub const GPIO_OFFSET: u64 = 0x20_0000;

/// Offset of the clock manager from the peripheral base.
pub const CLOCK_MANAGER_OFFSET: u64 = 0x10_1000;

/// Environment variable overriding [`RegmapConfig::device`].
pub const ENV_DEVICE: &str = "RPI_MEM_DEVICE";

/// Environment variable selecting the [`Soc`].
pub const ENV_SOC: &str = "RPI_SOC";

/// Broadcom SoC generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Soc {
    /// Pi 1 / Zero.
    Bcm2835,
    /// Pi 2.
    Bcm2836,
    /// Pi 3.
    #[default]
    Bcm2837,
    /// Pi 4.
    Bcm2711,
}

impl Soc {
    /// ARM physical address of the peripheral block.
    #[must_use]
    pub const fn peripheral_base(self) -> u64 {
        match self {
            Self::Bcm2835 => 0x2000_0000,
            Self::Bcm2836 | Self::Bcm2837 => 0x3F00_0000,
            Self::Bcm2711 => 0xFE00_0000,
        }
    }

    /// Physical address of the GPIO controller.
    #[must_use]
    pub const fn gpio_base(self) -> u64 {
        self.peripheral_base() | GPIO_OFFSET
    }

    /// Physical address of the clock manager.
    #[must_use]
    pub const fn clock_base(self) -> u64 {
        self.peripheral_base() | CLOCK_MANAGER_OFFSET
    }

    /// Every preset, oldest first.
    pub const ALL: [Self; 4] = [Self::Bcm2835, Self::Bcm2836, Self::Bcm2837, Self::Bcm2711];

    /// Preset whose GPIO controller sits at `gpio_base`.
    ///
    /// BCM2836 and BCM2837 share addresses; the older one is returned.
    #[must_use]
    pub fn from_gpio_base(gpio_base: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|soc| soc.gpio_base() == gpio_base)
    }

    /// Frequency of the crystal oscillator clock source.
    #[must_use]
    pub const fn oscillator_hz(self) -> u64 {
        match self {
            Self::Bcm2711 => 54_000_000,
            Self::Bcm2835 | Self::Bcm2836 | Self::Bcm2837 => 19_200_000,
        }
    }
}

impl FromStr for Soc {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bcm2835" | "pi1" | "pi0" => Ok(Self::Bcm2835),
            "bcm2836" | "pi2" => Ok(Self::Bcm2836),
            "bcm2837" | "pi3" => Ok(Self::Bcm2837),
            "bcm2711" | "pi4" => Ok(Self::Bcm2711),
            other => Err(format!("unknown SoC `{other}` (expected bcm2835, bcm2836, bcm2837, bcm2711)")),
        }
    }
}

/// Where and how to map the register windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegmapConfig {
    /// Physical-memory device to map from.
    pub device: PathBuf,
    /// Physical address of the GPIO controller block.
    pub gpio_base: u64,
    /// Physical address of the clock manager block.
    pub clock_base: u64,
    /// Length of each mapping.
    pub block_len: usize,
    /// BUSY-flag polling for the clock protocols.
    pub poll: PollPolicy,
}

impl RegmapConfig {
    /// Configuration for `soc` using `/dev/mem`.
    #[must_use]
    pub fn for_soc(soc: Soc) -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEVICE),
            gpio_base: soc.gpio_base(),
            clock_base: soc.clock_base(),
            block_len: BLOCK_SIZE,
            poll: PollPolicy::default(),
        }
    }

    /// Defaults overridden by `RPI_SOC` and `RPI_MEM_DEVICE`.
    ///
    /// Unknown `RPI_SOC` values are ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        let soc = match std::env::var(ENV_SOC) {
            Ok(value) => value.parse().unwrap_or_else(|err: String| {
                tracing::warn!(%err, "ignoring {ENV_SOC}");
                Soc::default()
            }),
            Err(_) => Soc::default(),
        };
        let mut config = Self::for_soc(soc);
        if let Some(device) = std::env::var_os(ENV_DEVICE) {
            config.device = PathBuf::from(device);
        }
        config
    }

    /// Replace the device path.
    #[must_use]
    pub fn with_device(mut self, device: impl Into<PathBuf>) -> Self {
        self.device = device.into();
        self
    }

    /// Replace the polling policy.
    #[must_use]
    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }
}

impl Default for RegmapConfig {
    fn default() -> Self {
        Self::for_soc(Soc::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcm2837_matches_legacy_constants() {
        assert_eq!(Soc::Bcm2837.gpio_base(), 0x3F20_0000);
        assert_eq!(Soc::Bcm2837.clock_base(), 0x3F10_1000);
    }

    #[test]
    fn bcm2711_addresses() {
        assert_eq!(Soc::Bcm2711.gpio_base(), 0xFE20_0000);
        assert_eq!(Soc::Bcm2711.clock_base(), 0xFE10_1000);
    }

    #[test]
    fn bases_are_page_aligned() {
        for soc in Soc::ALL {
            assert_eq!(soc.gpio_base() % BLOCK_SIZE as u64, 0);
            assert_eq!(soc.clock_base() % BLOCK_SIZE as u64, 0);
        }
    }

    #[test]
    fn soc_recovered_from_gpio_base() {
        assert_eq!(Soc::from_gpio_base(0xFE20_0000), Some(Soc::Bcm2711));
        assert_eq!(Soc::from_gpio_base(0x2020_0000), Some(Soc::Bcm2835));
        assert_eq!(Soc::from_gpio_base(0x3F20_0000).map(Soc::oscillator_hz), Some(19_200_000));
        assert_eq!(Soc::from_gpio_base(0x2_0000), None);
    }

    #[test]
    fn oscillator_moved_to_54mhz_on_bcm2711() {
        assert_eq!(Soc::Bcm2837.oscillator_hz(), 19_200_000);
        assert_eq!(Soc::Bcm2711.oscillator_hz(), 54_000_000);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: RegmapConfig =
            serde_json::from_str(r#"{ "device": "/tmp/mem", "poll": { "max_polls": 5 } }"#).unwrap();
        assert_eq!(config.device, PathBuf::from("/tmp/mem"));
        assert_eq!(config.gpio_base, 0x3F20_0000);
        assert_eq!(config.poll.max_polls, Some(5));
    }

    #[test]
    fn default_config() {
        let config = RegmapConfig::default();
        assert_eq!(config.device, PathBuf::from("/dev/mem"));
        assert_eq!(config.block_len, 4096);
        assert_eq!(config.poll, PollPolicy::default());
    }

    // ── from_env ─────────────────────────────────────────────────────────────

    /// The process environment is shared; tests that change it run one at a time.
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn with_env(soc: Option<&str>, device: Option<&str>, check: impl FnOnce()) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for (key, value) in [(ENV_SOC, soc), (ENV_DEVICE, device)] {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
        check();
        std::env::remove_var(ENV_SOC);
        std::env::remove_var(ENV_DEVICE);
    }

    #[test]
    fn from_env_without_variables_is_default() {
        with_env(None, None, || assert_eq!(RegmapConfig::from_env(), RegmapConfig::default()));
    }

    #[test]
    fn from_env_overrides_device() {
        with_env(None, Some("/tmp/fake-mem"), || {
            let config = RegmapConfig::from_env();
            assert_eq!(config.device, PathBuf::from("/tmp/fake-mem"));
            assert_eq!(config.gpio_base, Soc::Bcm2837.gpio_base());
        });
    }

    #[test]
    fn from_env_selects_soc() {
        with_env(Some("pi4"), None, || {
            let config = RegmapConfig::from_env();
            assert_eq!(config.gpio_base, 0xFE20_0000);
            assert_eq!(config.clock_base, 0xFE10_1000);
            assert_eq!(config.device, PathBuf::from(DEFAULT_DEVICE));
        });
    }

    #[test]
    fn from_env_ignores_unknown_soc() {
        with_env(Some("bcm2712"), Some("/tmp/fake-mem"), || {
            let config = RegmapConfig::from_env();
            assert_eq!(config, RegmapConfig::default().with_device("/tmp/fake-mem"));
        });
    }

    #[test]
    fn soc_parses_board_aliases() {
        assert_eq!("pi4".parse::<Soc>(), Ok(Soc::Bcm2711));
        assert_eq!("BCM2835".parse::<Soc>(), Ok(Soc::Bcm2835));
        assert!("bcm2712".parse::<Soc>().is_err());
    }
}
