//! Host side: pose editing, named states and the outbound link.
//!
//! Every action writes at most one line and never waits for an answer. The device sends
//! nothing back, so a lost line is simply lost.

pub mod store;

use embedded_io::Write;
use embedded_io_adapters::std::FromStd;
use log::{error, info};
use serialport::SerialPort;

use crate::{
    GaitKind, JOINT_COUNT, LinkError, PositionVector,
    device::std::open_serial_port,
    gait::STAND_POSE,
    link::{encode_gait, encode_pose, write_line},
};
use store::{StateStore, StoreError};

/// Outbound half of the link. Built without a port when none could be opened, in which
/// case every send fails with `TransportUnavailable`.
pub struct HostLink<W> {
    port: Option<W>,
}

pub type SerialLink = HostLink<FromStd<Box<dyn SerialPort>>>;

/// Opens `port_name`; a missing port is logged and yields a disconnected link.
pub fn connect(port_name: &str, baud_rate: u32) -> SerialLink {
    match open_serial_port(port_name, baud_rate) {
        Ok(port) => {
            info!("Connected to {} at {} baud", port_name, baud_rate);
            HostLink::new(port)
        }
        Err(e) => {
            error!("Couldn't open {}: {}", port_name, e);
            HostLink::disconnected()
        }
    }
}

impl<W: Write> HostLink<W> {
    pub fn new(port: W) -> Self {
        Self { port: Some(port) }
    }

    pub fn disconnected() -> Self {
        Self { port: None }
    }

    pub fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    pub fn send_pose(&mut self, pose: &PositionVector) -> Result<(), LinkError> {
        self.send(&encode_pose(pose))
    }

    pub fn send_gait(&mut self, gait: GaitKind) -> Result<(), LinkError> {
        self.send(&encode_gait(gait))
    }

    fn send(&mut self, line: &str) -> Result<(), LinkError> {
        let Some(port) = self.port.as_mut() else {
            error!("Not sending {:?}: serial port is not connected", line.trim_end());
            return Err(LinkError::TransportUnavailable);
        };
        write_line(port, line)?;
        info!("Command sent: {:?}", line);
        Ok(())
    }

    pub fn port(&self) -> Option<&W> {
        self.port.as_ref()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Please enter a name for the state")]
    MissingName,
    #[error("No saved state found for '{0}'")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Link(#[from] LinkError),
}

/// Everything one host operator can do: edit the pose, recall and save it, send it.
pub struct HostSession<W> {
    pose: PositionVector,
    selected: usize,
    state_name: String,
    store: StateStore,
    link: HostLink<W>,
}

impl<W: Write> HostSession<W> {
    /// Starts from the stand pose and reads the existing states so saving never drops them.
    pub fn new(mut store: StateStore, link: HostLink<W>) -> Self {
        if let Err(e) = store.load() {
            error!("Starting with no saved states: {}", e);
        }
        Self {
            pose: STAND_POSE,
            selected: 0,
            state_name: String::new(),
            store,
            link,
        }
    }

    pub fn pose(&self) -> &PositionVector {
        &self.pose
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn link(&self) -> &HostLink<W> {
        &self.link
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select_next(&mut self) {
        if self.selected < JOINT_COUNT - 1 {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Nudges the selected joint, clamped to 0..=180.
    pub fn adjust(&mut self, delta: i32) {
        let current = self.pose.get(self.selected).unwrap_or(0) as i32;
        self.pose.set(self.selected, current + delta);
    }

    pub fn set_angle(&mut self, index: usize, degrees: i32) {
        self.pose.set(index, degrees);
    }

    pub fn state_name(&self) -> &str {
        &self.state_name
    }

    pub fn state_name_mut(&mut self) -> &mut String {
        &mut self.state_name
    }

    /// Puts the editor on the rest pose. Nothing is sent.
    pub fn stand(&mut self) {
        self.pose = STAND_POSE;
    }

    pub fn send_pose(&mut self) -> Result<(), SessionError> {
        Ok(self.link.send_pose(&self.pose)?)
    }

    /// Asks the device to run its wave; the device returns to standing on its own.
    pub fn wave(&mut self) -> Result<(), SessionError> {
        self.link.send_gait(GaitKind::Wave)?;
        self.pose = STAND_POSE;
        Ok(())
    }

    pub fn save_state(&mut self) -> Result<(), SessionError> {
        let name = self.state_name.trim();
        if name.is_empty() {
            return Err(SessionError::MissingName);
        }
        self.store.save(name, self.pose)?;
        info!("State '{}' saved", name);
        Ok(())
    }

    /// Re-reads the state file and copies the named pose into the editor. Joints the saved
    /// state has no value for keep their current angle.
    pub fn load_state(&mut self) -> Result<(), SessionError> {
        let name = self.state_name.trim().to_string();
        if name.is_empty() {
            return Err(SessionError::MissingName);
        }
        self.store.load()?;
        let saved = *self
            .store
            .get(&name)
            .ok_or_else(|| SessionError::NotFound(name.clone()))?;
        saved.apply_to(&mut self.pose);
        info!("State '{}' loaded", name);
        Ok(())
    }
}
