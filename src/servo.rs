use embedded_hal::pwm::{Error as _, SetDutyCycle};
use log::debug;

use crate::{
    MAX_DEGREES, ServoError,
    joint::{PWM_PERIOD_US, ServoConfig},
};

/// Full scale of the 16-bit duty register.
pub const DUTY_FULL_SCALE: u16 = u16::MAX;

/// Duty value holding `degrees` for a servo with the given pulse range.
///
/// `round(((min + degrees/180 * (max - min)) / 20000) * 65535)`, evaluated in integers so the
/// result is exact and identical on targets without an FPU. `degrees` must already be in range.
pub fn duty_for(config: &ServoConfig, degrees: u8) -> u16 {
    let min = config.min_pulse_us as u64;
    let span = config.max_pulse_us.saturating_sub(config.min_pulse_us) as u64;
    let degrees_max = MAX_DEGREES as u64;
    // pulse * 180, kept scaled to avoid dividing early
    let pulse_scaled = min * degrees_max + degrees as u64 * span;
    let numerator = pulse_scaled * DUTY_FULL_SCALE as u64;
    let denominator = degrees_max * PWM_PERIOD_US as u64;
    let duty = (2 * numerator + denominator) / (2 * denominator);
    duty.min(DUTY_FULL_SCALE as u64) as u16
}

/// One joint: a PWM output and the angle last written to it.
pub struct ServoChannel<P> {
    index: u8,
    pwm: P,
    config: ServoConfig,
    position: u8,
}

impl<P: SetDutyCycle> ServoChannel<P> {
    pub fn new(index: u8, pwm: P, config: ServoConfig) -> Result<Self, ServoError> {
        validate(index, &config)?;
        Ok(Self::from_validated(index, pwm, config))
    }

    pub(crate) fn from_validated(index: u8, pwm: P, config: ServoConfig) -> Self {
        Self {
            index,
            pwm,
            config,
            position: 0,
        }
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn config(&self) -> &ServoConfig {
        &self.config
    }

    pub fn output(&self) -> &P {
        &self.pwm
    }

    pub fn duty_of(&self, degrees: u8) -> u16 {
        duty_for(&self.config, degrees)
    }

    /// Drives the output to `degrees`. Out-of-range angles leave the channel untouched.
    pub fn set_position(&mut self, degrees: i32) -> Result<(), ServoError> {
        if !(0..=MAX_DEGREES).contains(&degrees) {
            return Err(ServoError::OutOfRange {
                channel: self.index,
                degrees,
            });
        }
        let degrees = degrees as u8;
        let duty = self.duty_of(degrees);
        debug!(
            "Channel {} (pin {}): {} degrees -> duty {}",
            self.index, self.config.pin, degrees, duty
        );
        self.pwm
            .set_duty_cycle_fraction(duty, DUTY_FULL_SCALE)
            .map_err(|e| ServoError::Pwm {
                channel: self.index,
                kind: e.kind(),
            })?;
        self.position = degrees;
        Ok(())
    }

    /// Drops the signal to zero duty so an idle servo stops hunting. The angle is kept.
    pub fn release(&mut self) -> Result<(), ServoError> {
        self.pwm.set_duty_cycle_fully_off().map_err(|e| ServoError::Pwm {
            channel: self.index,
            kind: e.kind(),
        })
    }

    pub fn position(&self) -> u8 {
        self.position
    }
}

pub(crate) fn validate(index: u8, config: &ServoConfig) -> Result<(), ServoError> {
    if config.min_pulse_us >= config.max_pulse_us || config.max_pulse_us as u32 > PWM_PERIOD_US {
        return Err(ServoError::InvalidPulseRange {
            channel: index,
            min_us: config.min_pulse_us,
            max_us: config.max_pulse_us,
        });
    }
    Ok(())
}
