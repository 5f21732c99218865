//! Joint table shared by host and device.
//!
//! Index `i` of every position vector refers to `JOINTS[i]` on both ends of the link. The
//! hardware rows (`Variant::servo_configs`) follow the same order, so a build only ever
//! differs in pins and pulse ranges, never in joint identity.

pub const JOINT_COUNT: usize = 8;

/// PWM period for hobby servos at 50 Hz.
pub const PWM_PERIOD_US: u32 = 20_000;
pub const PWM_FREQUENCY_HZ: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    FrontLeft,
    BackLeft,
    FrontRight,
    BackRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Hip,
    Ankle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Joint {
    pub name: &'static str,
    pub leg: Leg,
    pub role: Role,
}

pub const JOINTS: [Joint; JOINT_COUNT] = [
    Joint { name: "Front Left Hip", leg: Leg::FrontLeft, role: Role::Hip },
    Joint { name: "Front Left Ankle", leg: Leg::FrontLeft, role: Role::Ankle },
    Joint { name: "Back Left Hip", leg: Leg::BackLeft, role: Role::Hip },
    Joint { name: "Back Left Ankle", leg: Leg::BackLeft, role: Role::Ankle },
    Joint { name: "Front Right Hip", leg: Leg::FrontRight, role: Role::Hip },
    Joint { name: "Front Right Ankle", leg: Leg::FrontRight, role: Role::Ankle },
    Joint { name: "Back Right Hip", leg: Leg::BackRight, role: Role::Hip },
    Joint { name: "Back Right Ankle", leg: Leg::BackRight, role: Role::Ankle },
];

/// Index of the joint with the given display name.
pub fn index_of(name: &str) -> Option<usize> {
    JOINTS.iter().position(|joint| joint.name == name)
}

/// Pin and pulse range for one servo output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoConfig {
    pub pin: u8,
    pub min_pulse_us: u16,
    pub max_pulse_us: u16,
}

impl ServoConfig {
    pub const fn new(pin: u8, min_pulse_us: u16, max_pulse_us: u16) -> Self {
        Self {
            pin,
            min_pulse_us,
            max_pulse_us,
        }
    }
}

/// Deployed board wirings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "kebab-case"))]
pub enum Variant {
    /// GP0..GP7 in joint order, 500-2500 us servos.
    #[default]
    Standard,
    /// Left legs on GP0..GP3, right legs on GP15..GP12, 1000-2000 us servos.
    Mirrored,
}

const STANDARD: [ServoConfig; JOINT_COUNT] = [
    ServoConfig::new(0, 500, 2500),
    ServoConfig::new(1, 500, 2500),
    ServoConfig::new(2, 500, 2500),
    ServoConfig::new(3, 500, 2500),
    ServoConfig::new(4, 500, 2500),
    ServoConfig::new(5, 500, 2500),
    ServoConfig::new(6, 500, 2500),
    ServoConfig::new(7, 500, 2500),
];

const MIRRORED: [ServoConfig; JOINT_COUNT] = [
    ServoConfig::new(0, 1000, 2000),
    ServoConfig::new(1, 1000, 2000),
    ServoConfig::new(2, 1000, 2000),
    ServoConfig::new(3, 1000, 2000),
    ServoConfig::new(15, 1000, 2000),
    ServoConfig::new(14, 1000, 2000),
    ServoConfig::new(13, 1000, 2000),
    ServoConfig::new(12, 1000, 2000),
];

impl Variant {
    pub fn servo_configs(&self) -> &'static [ServoConfig; JOINT_COUNT] {
        match self {
            Variant::Standard => &STANDARD,
            Variant::Mirrored => &MIRRORED,
        }
    }
}
