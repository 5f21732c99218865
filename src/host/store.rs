//! Named poses saved on the host.
//!
//! The file is a JSON object of `{ name: { "Front Left Hip": 0, ... } }`. It is rewritten
//! whole on every save. The store assumes it is the only writer of its file; two processes
//! saving to the same path will overwrite each other's states.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use log::{error, info, warn};
use serde_json::{Map, Value};

use crate::{
    JOINT_COUNT, MAX_DEGREES, PositionVector,
    joint::{JOINTS, index_of},
};

pub const DEFAULT_STATE_FILE: &str = "states.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("State name must not be empty")]
    EmptyName,
    #[error("Cannot read state file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Cannot write state file {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("Cannot deserialise state file: {0}")]
    Deserialize(serde_json::Error),
    #[error("Cannot serialise states: {0}")]
    Serialize(serde_json::Error),
}

/// Angle as found on disk. Older files hold the slider text (`"55"`) instead of a number.
fn angle_of(value: &Value) -> Option<u8> {
    let degrees = match value {
        Value::Number(number) => number.as_i64()?,
        Value::String(text) => text.trim().parse().ok()?,
        _ => return None,
    };
    (0..=MAX_DEGREES as i64)
        .contains(&degrees)
        .then_some(degrees as u8)
}

/// A saved state. Joints with no usable value on disk are `None`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SavedPose([Option<u8>; JOINT_COUNT]);

impl SavedPose {
    /// Reads one state entry. Unknown joints and bad angles are logged and left out; only an
    /// entry that is not a joint map at all is refused.
    fn from_value(name: &str, value: &Value) -> Option<Self> {
        let joints = value.as_object()?;
        let mut angles = [None; JOINT_COUNT];
        for (joint, angle) in joints {
            let Some(index) = index_of(joint) else {
                warn!("State '{}': unknown joint '{}'", name, joint);
                continue;
            };
            angles[index] = angle_of(angle);
            if angles[index].is_none() {
                warn!("State '{}': invalid angle {} for {}", name, angle, joint);
            }
        }
        Some(Self(angles))
    }

    fn to_value(pose: &PositionVector) -> Value {
        let joints: Map<String, Value> = JOINTS
            .iter()
            .zip(pose.angles())
            .map(|(joint, &angle)| (joint.name.to_string(), Value::from(angle)))
            .collect();
        Value::Object(joints)
    }

    pub fn angle(&self, index: usize) -> Option<u8> {
        self.0.get(index).copied().flatten()
    }

    /// The full pose, when every joint has a value.
    pub fn complete(&self) -> Option<PositionVector> {
        let mut angles = [0u8; JOINT_COUNT];
        for (slot, angle) in angles.iter_mut().zip(self.0) {
            *slot = angle?;
        }
        Some(PositionVector::new(angles))
    }

    /// Copies the stored joints onto `pose`. Joints without a value keep their current angle.
    /// Returns how many were missing.
    pub fn apply_to(&self, pose: &mut PositionVector) -> usize {
        let mut missing = 0;
        for (index, (joint, angle)) in JOINTS.iter().zip(self.0).enumerate() {
            match angle {
                Some(angle) => pose.set(index, angle as i32),
                None => {
                    warn!("No value found for {} in loaded state", joint.name);
                    missing += 1;
                }
            }
        }
        missing
    }
}

impl From<PositionVector> for SavedPose {
    fn from(pose: PositionVector) -> Self {
        Self((*pose.angles()).map(Some))
    }
}

pub struct StateStore {
    path: PathBuf,
    /// File contents as read, written back on save so entries this store cannot use survive.
    raw: Map<String, Value>,
    states: BTreeMap<String, SavedPose>,
}

impl StateStore {
    /// Store backed by `path`. Nothing is read until `load`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            raw: Map::new(),
            states: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the in-memory states with the file contents and returns how many were read.
    ///
    /// A missing file is created empty. A file that cannot be read or is not a JSON object
    /// leaves the store empty and is not touched, so its contents stay available for manual
    /// repair. Entries that are not joint maps are skipped but kept in the file.
    pub fn load(&mut self) -> Result<usize, StoreError> {
        self.raw.clear();
        self.states.clear();
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(
                    "States file {} not found, creating file with empty states...",
                    self.path.display()
                );
                self.persist()?;
                return Ok(0);
            }
            Err(source) => {
                error!("Cannot read {}: {}", self.path.display(), source);
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let raw = serde_json::from_str::<Map<String, Value>>(&text).map_err(|e| {
            warn!(
                "There was an issue with deserialising {}: {}",
                self.path.display(),
                e
            );
            StoreError::Deserialize(e)
        })?;
        for (name, value) in &raw {
            match SavedPose::from_value(name, value) {
                Some(pose) => {
                    self.states.insert(name.clone(), pose);
                }
                None => warn!("Skipping state '{}': not a joint map", name),
            }
        }
        self.raw = raw;
        info!("Loaded {} states from {}", self.states.len(), self.path.display());
        Ok(self.states.len())
    }

    /// Adds or replaces `name`, then rewrites the whole file.
    pub fn save(&mut self, name: &str, pose: PositionVector) -> Result<(), StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::EmptyName);
        }
        self.raw.insert(name.to_string(), SavedPose::to_value(&pose));
        self.states.insert(name.to_string(), pose.into());
        self.persist()
    }

    pub fn get(&self, name: &str) -> Option<&SavedPose> {
        self.states.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn persist(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.raw).map_err(|e| {
            error!("There was an issue with serialising the states: {}", e);
            StoreError::Serialize(e)
        })?;
        fs::write(&self.path, json).map_err(|source| {
            error!("Cannot write {}: {}", self.path.display(), source);
            StoreError::Write {
                path: self.path.clone(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const POSE: PositionVector = PositionVector::new([0, 113, 0, 139, 170, 102, 0, 55]);

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("states.json");

        let mut store = StateStore::new(&path);
        store.save("pose1", POSE).unwrap();

        let mut reloaded = StateStore::new(&path);
        assert_eq!(reloaded.load().unwrap(), 1);
        assert_eq!(reloaded.get("pose1").and_then(SavedPose::complete), Some(POSE));
        assert_eq!(reloaded.get("pose2"), None);
    }

    #[test]
    fn missing_file_is_initialised_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("states.json");

        let mut store = StateStore::new(&path);
        assert_eq!(store.load().unwrap(), 0);
        assert!(store.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn resave_overwrites_and_keeps_others() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("states.json");
        let mut store = StateStore::new(&path);
        store.save("a", PositionVector::new([1; 8])).unwrap();
        store.save("b", PositionVector::new([2; 8])).unwrap();
        store.save("a", PositionVector::new([3; 8])).unwrap();

        let mut reloaded = StateStore::new(&path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.names().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(reloaded.get("a"), Some(&SavedPose::from(PositionVector::new([3; 8]))));
        assert_eq!(reloaded.get("b"), Some(&SavedPose::from(PositionVector::new([2; 8]))));
    }

    #[test]
    fn file_is_keyed_by_joint_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("states.json");
        let mut store = StateStore::new(&path);
        store.save("wave", POSE).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["wave"]["Front Right Hip"], 170);
        assert_eq!(json["wave"]["Back Right Ankle"], 55);
    }

    #[test]
    fn accepts_text_angles() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("states.json");
        let joints: Vec<String> = JOINTS
            .iter()
            .enumerate()
            .map(|(i, joint)| format!("\"{}\": \"{}\"", joint.name, i * 10))
            .collect();
        fs::write(&path, format!("{{\"default\": {{{}}}}}", joints.join(", "))).unwrap();

        let mut store = StateStore::new(&path);
        assert_eq!(store.load().unwrap(), 1);
        assert_eq!(
            store.get("default").and_then(SavedPose::complete),
            Some(PositionVector::new([0, 10, 20, 30, 40, 50, 60, 70]))
        );
    }

    #[test]
    fn corrupt_file_leaves_store_empty_and_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("states.json");
        let mut store = StateStore::new(&path);
        store.save("stale", POSE).unwrap();
        fs::write(&path, "{\"pose1\": [1, 2").unwrap();

        assert!(matches!(store.load(), Err(StoreError::Deserialize(_))));
        assert!(store.is_empty());
        assert_eq!(store.get("stale"), None);
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"pose1\": [1, 2");
    }

    #[test]
    fn partial_pose_loads_and_survives_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("states.json");
        let full: Vec<String> = JOINTS
            .iter()
            .map(|joint| format!("\"{}\": 90", joint.name))
            .collect();
        fs::write(
            &path,
            format!(
                "{{\"a\": {{{}}}, \"b\": {{\"Front Left Hip\": \"5\"}}}}",
                full.join(", ")
            ),
        )
        .unwrap();

        let mut store = StateStore::new(&path);
        assert_eq!(store.load().unwrap(), 2);
        assert_eq!(
            store.get("a").and_then(SavedPose::complete),
            Some(PositionVector::new([90; 8]))
        );
        let partial = store.get("b").unwrap();
        assert_eq!(partial.angle(0), Some(5));
        assert_eq!(partial.angle(1), None);
        assert_eq!(partial.complete(), None);

        store.save("c", POSE).unwrap();
        let mut reloaded = StateStore::new(&path);
        assert_eq!(reloaded.load().unwrap(), 3);
        assert_eq!(reloaded.names().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(
            reloaded.get("a").and_then(SavedPose::complete),
            Some(PositionVector::new([90; 8]))
        );
    }

    #[test]
    fn bad_joints_are_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("states.json");
        fs::write(
            &path,
            r#"{"odd": {"Tail": 10, "Front Left Hip": 200, "Back Left Hip": "12"}, "junk": [1, 2]}"#,
        )
        .unwrap();

        let mut store = StateStore::new(&path);
        assert_eq!(store.load().unwrap(), 1);
        let odd = store.get("odd").unwrap();
        assert_eq!(odd.angle(0), None);
        assert_eq!(odd.angle(2), Some(12));
        assert_eq!(store.get("junk"), None);

        store.save("new", POSE).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["junk"], serde_json::json!([1, 2]));
        assert_eq!(json["odd"]["Tail"], 10);
    }

    #[test]
    fn apply_keeps_missing_joints() {
        let mut angles = [None; JOINT_COUNT];
        angles[1] = Some(77);
        let saved = SavedPose(angles);
        let mut pose = PositionVector::new([1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(saved.apply_to(&mut pose), 7);
        assert_eq!(pose.angles(), &[1, 77, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn empty_name_is_rejected() {
        let dir = tempdir().unwrap();
        let mut store = StateStore::new(dir.path().join("states.json"));
        assert!(matches!(store.save("  ", POSE), Err(StoreError::EmptyName)));
        assert!(store.is_empty());
    }
}
