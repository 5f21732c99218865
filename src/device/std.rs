use std::{convert::Infallible, thread, time::Duration};

use embedded_hal::{
    delay::DelayNs,
    pwm::{ErrorType, SetDutyCycle},
};
use embedded_io_adapters::std::FromStd;
use log::{debug, info};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::{
    JOINT_COUNT, MotionController, ServoError,
    joint::{ServoConfig, Variant},
};

pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Blocking delay on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl DelayNs for ThreadDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }
}

/// Stand-in PWM output for hosts without servo hardware: every write is logged.
#[derive(Debug, Clone, Copy)]
pub struct LoggingPwm {
    pin: u8,
    duty: u16,
}

impl LoggingPwm {
    pub fn new(config: &ServoConfig) -> Self {
        Self {
            pin: config.pin,
            duty: 0,
        }
    }

    pub fn duty(&self) -> u16 {
        self.duty
    }
}

impl ErrorType for LoggingPwm {
    type Error = Infallible;
}

impl SetDutyCycle for LoggingPwm {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        debug!("GP{} duty_u16({})", self.pin, duty);
        self.duty = duty;
        Ok(())
    }
}

/// Controller over logging outputs, wired as `variant` describes.
pub fn logging_controller(
    variant: Variant,
    settle_delay_ms: u32,
) -> Result<MotionController<LoggingPwm, ThreadDelay, JOINT_COUNT>, ServoError> {
    let configs = variant.servo_configs();
    let outputs = configs.map(|config| LoggingPwm::new(&config));
    Ok(MotionController::new(outputs, configs, ThreadDelay)?.with_settle_delay(settle_delay_ms))
}

pub fn open_serial_port(
    port_name: &str,
    baud_rate: u32,
) -> Result<FromStd<Box<dyn SerialPort>>, serialport::Error> {
    let port = create_serial_port(port_name, baud_rate)?;
    Ok(FromStd::new(port))
}

fn create_serial_port(
    port_name: &str,
    baud_rate: u32,
) -> Result<Box<dyn SerialPort>, serialport::Error> {
    let port = serialport::new(port_name, baud_rate)
        // reads block until the next line shows up
        .timeout(Duration::from_secs(3600))
        .data_bits(DataBits::Eight)
        .stop_bits(StopBits::One)
        .parity(Parity::None)
        .flow_control(FlowControl::None)
        .open()?;

    info!("Port opened successfully: {} at {} baud", port_name, baud_rate);
    Ok(port)
}
