#![cfg_attr(not(feature = "std"), no_std)]

use core::fmt;

pub mod controller;
pub mod device;
pub mod gait;
pub mod joint;
pub mod link;
pub mod servo;

#[cfg(feature = "std")]
pub mod config;

#[cfg(feature = "std")]
pub mod host;

#[cfg(feature = "ui")]
pub mod ui;

#[cfg(test)]
pub(crate) mod mock;

pub use controller::MotionController;
pub use gait::{GaitKind, GaitScript};
pub use joint::JOINT_COUNT;
pub use link::{Command, CommandLink, LinkError};
pub use servo::ServoChannel;

pub const MAX_DEGREES: i32 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ServoError {
    #[error("Channel {channel}: {degrees} degrees is outside 0..=180")]
    OutOfRange { channel: u8, degrees: i32 },
    #[error("Expected {expected} joint angles, received {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("Invalid pulse range on channel {channel}: {min_us}..{max_us} us")]
    InvalidPulseRange { channel: u8, min_us: u16, max_us: u16 },
    #[error("PWM error on channel {channel}: {kind:?}")]
    Pwm {
        channel: u8,
        kind: embedded_hal::pwm::ErrorKind,
    },
}

/// Eight joint angles in degrees, ordered as `joint::JOINTS`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionVector([u8; JOINT_COUNT]);

impl PositionVector {
    pub const fn new(angles: [u8; JOINT_COUNT]) -> Self {
        Self(angles)
    }

    pub fn angles(&self) -> &[u8; JOINT_COUNT] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<u8> {
        self.0.get(index).copied()
    }

    /// Sets one joint, clamping to the servo range.
    pub fn set(&mut self, index: usize, degrees: i32) {
        if let Some(slot) = self.0.get_mut(index) {
            *slot = degrees.clamp(0, MAX_DEGREES) as u8;
        }
    }
}

impl From<[u8; JOINT_COUNT]> for PositionVector {
    fn from(angles: [u8; JOINT_COUNT]) -> Self {
        Self(angles)
    }
}

impl TryFrom<&[i32]> for PositionVector {
    type Error = ServoError;

    fn try_from(values: &[i32]) -> Result<Self, Self::Error> {
        if values.len() != JOINT_COUNT {
            return Err(ServoError::DimensionMismatch {
                expected: JOINT_COUNT,
                found: values.len(),
            });
        }
        let mut angles = [0u8; JOINT_COUNT];
        for (channel, (&value, slot)) in values.iter().zip(angles.iter_mut()).enumerate() {
            if !(0..=MAX_DEGREES).contains(&value) {
                return Err(ServoError::OutOfRange {
                    channel: channel as u8,
                    degrees: value,
                });
            }
            *slot = value as u8;
        }
        Ok(Self(angles))
    }
}

/// Wire form without the trailing newline: `a0,a1,...,a7`.
impl fmt::Display for PositionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, angle) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{angle}")?;
        }
        Ok(())
    }
}
