use std::io;

use clap::Parser;
use embedded_io::Read;
use embedded_io_adapters::std::FromStd;
use log::info;
use quadruped_link::{
    CommandLink, JOINT_COUNT, MotionController,
    config::{Config, DEFAULT_CONFIG_FILE},
    device::{
        Device,
        std::{LoggingPwm, ThreadDelay, logging_controller, open_serial_port},
    },
    joint::Variant,
};

/// Runs the device command loop with logged PWM outputs.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,
    /// Serial port to read commands from (standard input when omitted)
    #[arg(long)]
    port: Option<String>,
    #[arg(long)]
    baud: Option<u32>,
    /// Board wiring: standard or mirrored
    #[arg(long, value_parser = parse_variant)]
    variant: Option<Variant>,
    #[arg(long)]
    settle_ms: Option<u32>,
}

fn parse_variant(text: &str) -> Result<Variant, String> {
    match text {
        "standard" => Ok(Variant::Standard),
        "mirrored" => Ok(Variant::Mirrored),
        other => Err(format!("unknown variant '{other}'")),
    }
}

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let mut config = Config::load(&args.config)?.device;
    if args.port.is_some() {
        config.port = args.port;
    }
    config.baud_rate = args.baud.unwrap_or(config.baud_rate);
    config.variant = args.variant.unwrap_or(config.variant);
    config.settle_delay_ms = args.settle_ms.unwrap_or(config.settle_delay_ms);
    info!("Device config: {:?}", config);

    let controller = logging_controller(config.variant, config.settle_delay_ms)?;
    match &config.port {
        Some(port_name) => {
            let port = open_serial_port(port_name, config.baud_rate)?;
            serve(port, controller, config.wave_repeats);
        }
        None => serve(FromStd::new(io::stdin()), controller, config.wave_repeats),
    }
    Ok(())
}

fn serve<R: Read>(
    port: R,
    controller: MotionController<LoggingPwm, ThreadDelay, JOINT_COUNT>,
    wave_repeats: u8,
) {
    let mut device = Device::new(CommandLink::new(port), controller).with_wave_repeats(wave_repeats);
    device.run();
}
