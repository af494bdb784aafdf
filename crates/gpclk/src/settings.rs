use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rpi_regmap::{PollPolicy, RegmapConfig, Soc};

/// Where the registers live and how long to wait on them.
///
/// Precedence: command-line flag / environment variable, then the JSON
/// config file, then the BCM2837 defaults.
#[derive(Args, Default)]
pub struct Settings {
    /// JSON file with a register map configuration
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// SoC preset: bcm2835, bcm2836, bcm2837, bcm2711 (or pi0-pi4)
    #[arg(long, global = true, env = "RPI_SOC")]
    pub soc: Option<Soc>,

    /// Physical-memory device
    #[arg(long, global = true, env = "RPI_MEM_DEVICE", value_name = "PATH")]
    pub device: Option<PathBuf>,

    /// Give up after this many BUSY reads; 0 waits forever
    #[arg(long, global = true, value_name = "N")]
    pub max_polls: Option<u32>,
}

impl Settings {
    /// Build the register map configuration.
    pub fn resolve(&self) -> Result<RegmapConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("Failed to parse {}", path.display()))?
            }
            None => RegmapConfig::default(),
        };

        if let Some(soc) = self.soc {
            config.gpio_base = soc.gpio_base();
            config.clock_base = soc.clock_base();
        }
        if let Some(device) = &self.device {
            config.device.clone_from(device);
        }
        if let Some(n) = self.max_polls {
            config.poll = PollPolicy::bounded(n).with_backoff(config.poll.backoff);
        }

        tracing::debug!(
            device = %config.device.display(),
            gpio = format_args!("{:#010x}", config.gpio_base),
            clock = format_args!("{:#010x}", config.clock_base),
            "configuration resolved"
        );
        Ok(config)
    }
}
