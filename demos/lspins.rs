// Copyright (c) 2024 The board-gpio Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! List the pins of a board description, in the style of lsgpio.
//!
//! The register layer is simulated, so every pin reports the power-on state.
//!
//! ```text
//! cargo run --example lspins -- demos/boards/tiny.toml --numbering physical
//! ```

use std::path::PathBuf;

use anyhow::Context;
use board_gpio::config::{BoardConfig, ConfigLoader, GpioConfig};
use board_gpio::sim::SimRegisters;
use board_gpio::{GpioContext, NumberingScheme, PinCaps, WindowId};
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, StructOpt)]
struct Cli {
    /// Board description (TOML)
    board: PathBuf,
    /// Context settings (TOML)
    #[structopt(long)]
    config: Option<PathBuf>,
    /// Numbering scheme, overrides the settings file
    #[structopt(short, long)]
    numbering: Option<NumberingScheme>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .compact()
        .init();

    let args = Cli::from_args();

    let board = BoardConfig::load(&args.board)
        .and_then(|c| c.build())
        .with_context(|| format!("loading {}", args.board.display()))?;
    let mut config = match &args.config {
        Some(path) => {
            GpioConfig::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => GpioConfig::default(),
    };
    if let Some(numbering) = args.numbering {
        config.numbering = numbering;
    }

    let regs = SimRegisters::with_pins(
        WindowId::from_base(0),
        board.pins().iter().map(|p| p.native()),
    );
    let mut gpio = GpioContext::open_with(board, regs, &config)?;

    println!(
        "Board: \"{}\", {} {} pins",
        gpio.board().name(),
        gpio.count()?,
        gpio.numbering()?
    );

    let mut cursor = gpio.cursor()?;
    while cursor.has_next() {
        let pin = cursor.next_pin()?;
        let info = gpio.pin_info(pin)?;
        let (native, name, caps) = (info.native(), info.name().to_owned(), info.caps());
        let at = info
            .position()
            .map_or_else(|| "-".to_owned(), |p| p.to_string());

        let mut flags = vec![];
        if caps.contains(PinCaps::PWM) {
            flags.push("pwm");
        }
        let usage = if !flags.is_empty() {
            format!("[{}]", flags.join(" "))
        } else {
            "".to_owned()
        };

        let mode = gpio.mode(pin)?;
        let level = if gpio.read(pin)? { 1 } else { 0 };
        println!(
            "\tpin {pin:>3}: native {native:>3} {at:<10} {name:<8} {mode:<6} {level} {usage}",
            name = if name.is_empty() { "unnamed" } else { &name },
        );
    }

    gpio.close()?;
    Ok(())
}
