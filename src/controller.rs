use embedded_hal::{delay::DelayNs, pwm::SetDutyCycle};
use log::{info, warn};

use crate::{
    ServoError,
    joint::ServoConfig,
    servo::{ServoChannel, validate},
};

pub const DEFAULT_SETTLE_DELAY_MS: u32 = 100;

/// Applies whole-body poses one channel at a time.
///
/// For every channel, in index order, `update` writes the new duty, waits the settle delay
/// and then drops the duty to zero. A channel is always settled and released before the next
/// channel is written. The call returns only once every channel has been handled, so a caller
/// polling for commands between updates never sees a half-applied vector in flight.
pub struct MotionController<P, D, const N: usize> {
    channels: [ServoChannel<P>; N],
    delay: D,
    settle_delay_ms: u32,
}

impl<P: SetDutyCycle, D: DelayNs, const N: usize> MotionController<P, D, N> {
    /// Builds one channel per output; `outputs[i]` is driven with `configs[i]`.
    pub fn new(outputs: [P; N], configs: &[ServoConfig; N], delay: D) -> Result<Self, ServoError> {
        for (index, config) in configs.iter().enumerate() {
            validate(index as u8, config)?;
        }
        let mut index = 0;
        let channels = outputs.map(|pwm| {
            let channel = ServoChannel::from_validated(index as u8, pwm, configs[index]);
            index += 1;
            channel
        });
        Ok(Self {
            channels,
            delay,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
        })
    }

    pub fn with_settle_delay(mut self, settle_delay_ms: u32) -> Self {
        self.settle_delay_ms = settle_delay_ms;
        self
    }

    pub fn settle_delay_ms(&self) -> u32 {
        self.settle_delay_ms
    }

    pub fn channel_count(&self) -> usize {
        N
    }

    pub fn channels(&self) -> &[ServoChannel<P>; N] {
        &self.channels
    }

    /// Moves every joint to `angles[i]`.
    ///
    /// A wrong length is rejected before any output is touched. An out-of-range angle stops
    /// the update at that channel: earlier channels keep their new angles, the offending
    /// channel and all later ones keep their previous angles.
    pub fn update<A: Copy + Into<i32>>(&mut self, angles: &[A]) -> Result<(), ServoError> {
        if angles.len() != N {
            warn!("Rejected pose with {} angles, expected {}", angles.len(), N);
            return Err(ServoError::DimensionMismatch {
                expected: N,
                found: angles.len(),
            });
        }
        for (channel, &angle) in self.channels.iter_mut().zip(angles) {
            if let Err(e) = channel.set_position(angle.into()) {
                warn!("Pose aborted: {}", e);
                return Err(e);
            }
            self.delay.delay_ms(self.settle_delay_ms);
            if let Err(e) = channel.release() {
                warn!("Pose aborted: {}", e);
                return Err(e);
            }
        }
        info!("Applied pose {:?}", self.positions());
        Ok(())
    }

    /// Waits on the controller's timer without touching any output.
    pub fn hold(&mut self, ms: u32) {
        if ms > 0 {
            self.delay.delay_ms(ms);
        }
    }

    pub fn positions(&self) -> [u8; N] {
        core::array::from_fn(|index| self.channels[index].position())
    }
}
