//! Device side: the cooperative command loop.
//!
//! One line is read, fully applied (every settle delay, whole gait scripts included) and only
//! then is the transport polled again. Nothing preempts or cancels a command in progress.

#[cfg(feature = "std")]
pub mod std;

use embedded_hal::{delay::DelayNs, pwm::SetDutyCycle};
use embedded_io::Read;
use log::{error, info, warn};

use crate::{
    Command, CommandLink, GaitKind, GaitScript, JOINT_COUNT, LinkError, MotionController,
    ServoError, gait::DEFAULT_WAVE_REPEATS,
};

/// Pause before polling again after a transport read error.
pub const IO_RETRY_MS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A position command was applied to every channel.
    Applied,
    /// A gait script ran to completion.
    GaitCompleted(GaitKind),
    /// Blank line.
    Idle,
    /// The line did not parse and was dropped.
    Dropped(LinkError),
    /// The controller refused or aborted the command.
    Rejected(ServoError),
}

pub struct Device<R, P, D> {
    link: CommandLink<R>,
    controller: MotionController<P, D, JOINT_COUNT>,
    wave_repeats: u8,
}

impl<R, P, D> Device<R, P, D>
where
    R: Read,
    P: SetDutyCycle,
    D: DelayNs,
{
    pub fn new(link: CommandLink<R>, controller: MotionController<P, D, JOINT_COUNT>) -> Self {
        Self {
            link,
            controller,
            wave_repeats: DEFAULT_WAVE_REPEATS,
        }
    }

    pub fn with_wave_repeats(mut self, repeats: u8) -> Self {
        self.wave_repeats = repeats;
        self
    }

    pub fn controller(&self) -> &MotionController<P, D, JOINT_COUNT> {
        &self.controller
    }

    fn script(&self, gait: GaitKind) -> GaitScript {
        match gait {
            GaitKind::Wave => gait.script().with_repeats(self.wave_repeats),
            GaitKind::Stand => gait.script(),
        }
    }

    /// Reads and executes one line.
    ///
    /// Only transport failures are returned as errors; anything wrong with the command itself
    /// is reported through the outcome.
    pub fn step(&mut self) -> Result<Outcome, LinkError> {
        let command = match self.link.next_command() {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(Outcome::Idle),
            Err(e) if e.is_malformed_line() => return Ok(Outcome::Dropped(e)),
            Err(e) => return Err(e),
        };
        let outcome = match command {
            Command::Position(angles) => match self.controller.update(angles.as_slice()) {
                Ok(()) => Outcome::Applied,
                Err(e) => Outcome::Rejected(e),
            },
            Command::Gait(gait) => {
                info!("Starting {}...", gait.keyword());
                match self.script(gait).run(&mut self.controller) {
                    Ok(()) => Outcome::GaitCompleted(gait),
                    Err(e) => Outcome::Rejected(e),
                }
            }
        };
        Ok(outcome)
    }

    /// Serves commands until the transport closes.
    pub fn run(&mut self) {
        info!("Starting main loop...");
        loop {
            match self.step() {
                Ok(Outcome::Rejected(e)) => warn!("Command rejected: {}", e),
                Ok(_) => {}
                Err(LinkError::Closed) => {
                    info!("Command link closed");
                    return;
                }
                Err(e) => {
                    error!("Error receiving command: {}", e);
                    self.controller.hold(IO_RETRY_MS);
                }
            }
        }
    }

    pub fn into_parts(self) -> (CommandLink<R>, MotionController<P, D, JOINT_COUNT>) {
        (self.link, self.controller)
    }
}
