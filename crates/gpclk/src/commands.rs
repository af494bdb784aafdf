use anyhow::{bail, Context, Result};
use colored::Colorize;
use rpi_regmap::binding::bound_pins;
use rpi_regmap::{clkgen, ClockParams, ClockSnapshot, ClockSource, GpioPin, Mash, RegmapConfig, Soc};

use crate::settings::Settings;

/// Largest value of a 12-bit divisor field.
const DIVISOR_MAX: u32 = 0xFFF;

pub fn enable(settings: &Settings, pin: u8, mash: u32, source: ClockSource, divi: u32, divf: u32) -> Result<()> {
    let pin = GpioPin::new(pin)?;
    let mash = Mash::try_from(mash).context("--mash must be 0-3")?;
    if divi == 0 || divi > DIVISOR_MAX {
        bail!("--divi must be 1-{DIVISOR_MAX}");
    }
    if divf > DIVISOR_MAX {
        bail!("--divf must be 0-{DIVISOR_MAX}");
    }
    let params = ClockParams { mash, source, divi, divf };
    let config = settings.resolve()?;

    let ch = clkgen::enable(&config, pin, &params).with_context(|| format!("Failed to start clock on {pin}"))?;

    println!("{}", format!("✓ {ch} running on {pin}").green().bold());
    println!("  source {source}, mash {}, divisor {divi} + {divf}/4096", mash.bits());
    if let Some(hz) = output_hz(&config, &params) {
        println!("  ≈ {hz} Hz");
    }
    Ok(())
}

/// Nominal output frequency, when the source is the oscillator and the
/// configured addresses identify the SoC.
fn output_hz(config: &RegmapConfig, params: &ClockParams) -> Option<u64> {
    if params.source != ClockSource::Oscillator {
        return None;
    }
    let soc = Soc::from_gpio_base(config.gpio_base)?;
    params.frequency_hz(soc.oscillator_hz())
}

pub fn disable(settings: &Settings, pin: u8) -> Result<()> {
    let pin = GpioPin::new(pin)?;
    let config = settings.resolve()?;

    let ch = clkgen::disable(&config, pin).with_context(|| format!("Failed to stop clock on {pin}"))?;

    println!("{}", format!("✓ {ch} stopped, {pin} is an input").green().bold());
    Ok(())
}

pub fn status(settings: &Settings, pin: u8) -> Result<()> {
    let pin = GpioPin::new(pin)?;
    let config = settings.resolve()?;

    let snap = clkgen::status(&config, pin).with_context(|| format!("Failed to read clock for {pin}"))?;

    println!("{}", describe(&snap));
    println!("  {snap}");
    Ok(())
}

pub fn pins() {
    println!("{}", "Clock-capable pins:".cyan().bold());
    for (pin, binding) in bound_pins() {
        println!("  {pin:<7} {}  {}", binding.channel, binding.function);
    }
}

fn describe(snap: &ClockSnapshot) -> String {
    match (snap.enabled(), snap.busy()) {
        (true, true) => format!("● {} running", snap.channel).green().bold().to_string(),
        (true, false) => format!("◐ {} starting", snap.channel).yellow().bold().to_string(),
        (false, true) => format!("◐ {} stopping", snap.channel).yellow().bold().to_string(),
        (false, false) => format!("○ {} stopped", snap.channel).dimmed().to_string(),
    }
}
