// Desktop/tooling crate — unwrap/expect/panic acceptable in non-embedded code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod commands;
mod settings;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use settings::Settings;

#[derive(Parser)]
#[command(name = "gpclk")]
#[command(about = "Raspberry Pi general-purpose clock control", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Route a pin to its clock channel and start the generator
    Enable {
        /// BCM GPIO pin (4, 5, 6, 20, 21, 32, 34, 42, 43 or 44)
        #[arg(long)]
        pin: u8,
        /// MASH stages (0 = integer division)
        #[arg(long, default_value_t = 0)]
        mash: u32,
        /// Clock source: gnd, osc, dbg0, dbg1, plla, pllc, plld, hdmi
        #[arg(long, default_value = "osc")]
        source: rpi_regmap::ClockSource,
        /// Integer part of the divisor (12 bits)
        #[arg(long)]
        divi: u32,
        /// Fractional part of the divisor in 1/4096 steps (12 bits)
        #[arg(long, default_value_t = 0)]
        divf: u32,
    },
    /// Stop the generator and return the pin to input
    Disable {
        /// BCM GPIO pin
        #[arg(long)]
        pin: u8,
    },
    /// Print the clock registers of the channel bound to a pin
    Status {
        /// BCM GPIO pin
        #[arg(long)]
        pin: u8,
    },
    /// List the pins that can carry a clock output
    Pins,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Enable { pin, mash, source, divi, divf } => {
            commands::enable(&cli.settings, pin, mash, source, divi, divf)
        }
        Commands::Disable { pin } => commands::disable(&cli.settings, pin),
        Commands::Status { pin } => commands::status(&cli.settings, pin),
        Commands::Pins => {
            commands::pins();
            Ok(())
        }
    }
}
