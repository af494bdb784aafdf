//! Field layout tests against the recording mock.
//! Every setter must touch only its own bits, and every clock-manager write
//! must carry the password.

#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::indexing_slicing)]

use rpi_regmap::mocks::MockRegisters;
use rpi_regmap::register::Register;
use rpi_regmap::{ClockChannel, ClockSource, FunctionSelect, GpioPin, Mash, RegisterMap, PASSWORD};

fn regs() -> RegisterMap<MockRegisters, MockRegisters> {
    RegisterMap::new(MockRegisters::gpio(), MockRegisters::clock_manager())
}

// ── GPFSEL ───────────────────────────────────────────────────────────────────

#[test]
fn fsel_round_trips_for_every_pin_and_code() {
    let mut regs = regs();
    for pin in GpioPin::all() {
        let offset = Register::Gpfsel(pin).offset();
        let shift = u32::from(pin.get() % 10) * 3;
        let field = 0b111u32 << shift;
        for fsel in FunctionSelect::ALL {
            for sentinel in [0x0000_0000, 0xFFFF_FFFF, 0x2492_4924] {
                regs.gpio_mut().poke(offset, sentinel);
                regs.set_function(pin, fsel);
                assert_eq!(regs.function(pin), fsel.bits(), "{pin} {fsel:?}");
                let word = regs.gpio().peek(offset);
                assert_eq!(word & !field, sentinel & !field, "{pin}: neighbours changed");
            }
        }
    }
}

#[test]
fn fsel_register_index_is_pin_div_10() {
    let mut regs = regs();
    regs.set_function(GpioPin::new(29).unwrap(), FunctionSelect::Alt3);
    regs.set_function(GpioPin::new(30).unwrap(), FunctionSelect::Output);
    assert_eq!(regs.gpio().peek(0x08), 0b111 << 27);
    assert_eq!(regs.gpio().peek(0x0C), 0b001);
}

#[test]
fn pin_4_alt0_lands_in_bits_12_to_14() {
    let mut regs = regs();
    regs.set_function(GpioPin::new(4).unwrap(), FunctionSelect::Alt0);
    assert_eq!(regs.gpio().peek(0x00), 0x4 << 12);
}

// ── CM_GPnCTL ────────────────────────────────────────────────────────────────

#[test]
fn ctl_fields_round_trip_for_every_channel() {
    let mut regs = regs();
    for ch in ClockChannel::ALL {
        for mash in Mash::ALL {
            for src in ClockSource::ALL {
                for enab in [false, true] {
                    regs.set_mash(ch, mash);
                    regs.set_source(ch, src);
                    regs.set_enable(ch, enab);
                    assert_eq!(regs.mash(ch), mash.bits());
                    assert_eq!(regs.source(ch), src.bits());
                    assert_eq!(regs.enable(ch), u32::from(enab));
                    let ctl = regs.clock().peek(Register::CmGpCtl(ch).offset());
                    assert_eq!(ctl >> 24, PASSWORD, "{ch}: password missing");
                }
            }
        }
    }
}

#[test]
fn channels_do_not_alias() {
    let mut regs = regs();
    regs.set_source(ClockChannel::Gp1, ClockSource::PllD);
    regs.set_divisor_integer(ClockChannel::Gp1, 7);
    assert_eq!(regs.source(ClockChannel::Gp0), 0);
    assert_eq!(regs.source(ClockChannel::Gp2), 0);
    assert_eq!(regs.divisor_integer(ClockChannel::Gp0), 0);
    assert_eq!(regs.divisor_integer(ClockChannel::Gp2), 0);
    assert_eq!(regs.clock().peek(0x78), 0x5A00_0006);
    assert_eq!(regs.clock().peek(0x7C), 0x5A00_7000);
}

#[test]
fn busy_reads_hardware_state() {
    let mut regs = regs();
    regs.clock_mut().poke(0x80, 0x0000_0090);
    assert_eq!(regs.busy(ClockChannel::Gp2), 1);
    assert_eq!(regs.busy(ClockChannel::Gp0), 0);
}

#[test]
fn write_without_password_is_ignored_by_clock_manager() {
    let mut regs = regs();
    rpi_regmap::RegisterBlock::write(regs.clock_mut(), 0x74, 0x0003_2000);
    assert_eq!(regs.divisor_integer(ClockChannel::Gp0), 0);
    regs.set_divisor_integer(ClockChannel::Gp0, 50);
    assert_eq!(regs.divisor_integer(ClockChannel::Gp0), 50);
}

// ── GPSET / GPCLR / GPLEV ────────────────────────────────────────────────────

#[test]
fn set_and_clear_write_single_bit_without_reading() {
    let (gpio, clock) = MockRegisters::pair();
    let journal = gpio.journal();
    let mut regs = RegisterMap::new(gpio, clock);
    regs.set_high(GpioPin::new(4).unwrap());
    regs.set_low(GpioPin::new(45).unwrap());
    let events = journal.borrow();
    assert_eq!(
        *events,
        [
            rpi_regmap::mocks::MockEvent::Write {
                window: rpi_regmap::mocks::WindowKind::Gpio,
                offset: 0x1C,
                value: 1 << 4,
            },
            rpi_regmap::mocks::MockEvent::Write {
                window: rpi_regmap::mocks::WindowKind::Gpio,
                offset: 0x2C,
                value: 1 << 13,
            },
        ]
    );
}
