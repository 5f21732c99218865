//! Canned movements built from whole-body poses.

use core::iter;

use embedded_hal::{delay::DelayNs, pwm::SetDutyCycle};
use log::{info, warn};

use crate::{JOINT_COUNT, MotionController, PositionVector, ServoError};

pub const STAND_POSE: PositionVector = PositionVector::new([0, 55, 0, 139, 0, 142, 0, 55]);

/// Front right leg raised, the other three braced.
const WAVE_SEED: PositionVector = PositionVector::new([0, 113, 0, 139, 90, 170, 0, 55]);
const WAVE_UP: PositionVector = PositionVector::new([0, 113, 0, 139, 170, 142, 0, 55]);
const WAVE_DOWN: PositionVector = PositionVector::new([0, 113, 0, 139, 170, 102, 0, 55]);

pub const WAVE_PHASE_MS: u32 = 100;
pub const DEFAULT_WAVE_REPEATS: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaitStep {
    pub pose: PositionVector,
    pub hold_ms: u32,
}

impl GaitStep {
    pub const fn new(pose: PositionVector, hold_ms: u32) -> Self {
        Self { pose, hold_ms }
    }
}

const STAND_STEPS: [GaitStep; 1] = [GaitStep::new(STAND_POSE, 0)];
const WAVE_LEAD_IN: [GaitStep; 1] = [GaitStep::new(WAVE_SEED, WAVE_PHASE_MS)];
const WAVE_CYCLE: [GaitStep; 2] = [
    GaitStep::new(WAVE_UP, WAVE_PHASE_MS),
    GaitStep::new(WAVE_DOWN, WAVE_PHASE_MS),
];

/// Gait names accepted on the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaitKind {
    Stand,
    Wave,
}

impl GaitKind {
    /// Maps a protocol keyword. `circle_wave` and `wave` both select the wave.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "stand" => Some(GaitKind::Stand),
            "wave" | "circle_wave" => Some(GaitKind::Wave),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            GaitKind::Stand => "stand",
            GaitKind::Wave => "circle_wave",
        }
    }

    pub fn script(&self) -> GaitScript {
        match self {
            GaitKind::Stand => GaitScript::stand(),
            GaitKind::Wave => GaitScript::wave(),
        }
    }
}

/// `lead_in`, then `cycle` repeated `repeats` times, then `lead_out`.
#[derive(Debug, Clone, Copy)]
pub struct GaitScript {
    name: &'static str,
    lead_in: &'static [GaitStep],
    cycle: &'static [GaitStep],
    repeats: u8,
    lead_out: &'static [GaitStep],
}

impl GaitScript {
    pub const fn stand() -> Self {
        Self {
            name: "stand",
            lead_in: &STAND_STEPS,
            cycle: &[],
            repeats: 0,
            lead_out: &[],
        }
    }

    pub const fn wave() -> Self {
        Self {
            name: "wave",
            lead_in: &WAVE_LEAD_IN,
            cycle: &WAVE_CYCLE,
            repeats: DEFAULT_WAVE_REPEATS,
            lead_out: &STAND_STEPS,
        }
    }

    pub const fn with_repeats(mut self, repeats: u8) -> Self {
        self.repeats = repeats;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn repeats(&self) -> u8 {
        self.repeats
    }

    pub fn steps(&self) -> impl Iterator<Item = &'static GaitStep> {
        let (lead_in, cycle, lead_out) = (self.lead_in, self.cycle, self.lead_out);
        lead_in
            .iter()
            .chain(
                iter::repeat(cycle)
                    .take(self.repeats as usize)
                    .flat_map(|steps| steps.iter()),
            )
            .chain(lead_out.iter())
    }

    /// Final pose the script leaves the body in.
    pub fn final_pose(&self) -> Option<PositionVector> {
        self.steps().last().map(|step| step.pose)
    }

    /// Plays every step to completion. A failing step stops the script where it is.
    pub fn run<P, D>(
        &self,
        controller: &mut MotionController<P, D, JOINT_COUNT>,
    ) -> Result<(), ServoError>
    where
        P: SetDutyCycle,
        D: DelayNs,
    {
        info!("Running gait '{}' ({} repeats)", self.name, self.repeats);
        for step in self.steps() {
            if let Err(e) = controller.update(step.pose.angles()) {
                warn!("Gait '{}' stopped: {}", self.name, e);
                return Err(e);
            }
            controller.hold(step.hold_ms);
        }
        Ok(())
    }
}
