//! Virtual users
//!
//! A user is owned by exactly one scenario task. Its devices and its store
//! are never shared, so nothing here locks.

use crate::device::Device;
use crate::store::ConditionStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserKind {
    Normal,
    Maniac,
    Company,
}

impl UserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserKind::Normal => "normal",
            UserKind::Maniac => "maniac",
            UserKind::Company => "company",
        }
    }
}

impl fmt::Display for UserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct VirtualUser {
    pub user_id: String,
    pub kind: UserKind,
    /// Creation order as first confirmed by a successful read
    devices: Vec<Device>,
    index: HashMap<String, usize>,
    conditions: ConditionStore,
}

impl VirtualUser {
    /// Pure construction, no I/O
    pub fn new(kind: UserKind) -> Self {
        Self::with_id(format!("{}-{}", kind.as_str(), Uuid::new_v4().simple()), kind)
    }

    pub fn with_id(user_id: impl Into<String>, kind: UserKind) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            devices: Vec::new(),
            index: HashMap::new(),
            conditions: ConditionStore::new(),
        }
    }

    /// Call only once the target has confirmed the device exists
    pub fn add_device(&mut self, device: Device) {
        self.index.insert(device.uuid.clone(), self.devices.len());
        self.devices.push(device);
    }

    pub fn device(&self, uuid: &str) -> Option<&Device> {
        self.index.get(uuid).map(|&i| &self.devices[i])
    }

    pub fn device_mut(&mut self, uuid: &str) -> Option<&mut Device> {
        match self.index.get(uuid) {
            Some(&i) => self.devices.get_mut(i),
            None => None,
        }
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Devices newest-first, the order the list API returns them
    pub fn devices_newest_first(&self) -> impl Iterator<Item = &Device> + '_ {
        self.devices.iter().rev()
    }

    pub fn conditions(&self) -> &ConditionStore {
        &self.conditions
    }

    /// Pull every device's buffered readings into the stores. Call between
    /// action phases, never while a range query result is being compared.
    pub fn drain_generated_conditions(&mut self) -> usize {
        let mut moved = 0;
        for device in &mut self.devices {
            moved += device.drain_into(&mut self.conditions);
        }
        moved
    }

    /// Oldest of the devices' latest readings; `fallback` when any device
    /// has produced nothing yet
    pub fn oldest_latest_timestamp(&self, fallback: i64) -> i64 {
        let mut oldest: Option<i64> = None;
        for device in &self.devices {
            match device.conditions().back() {
                Some(latest) => {
                    oldest = Some(oldest.map_or(latest.timestamp, |o| o.min(latest.timestamp)));
                }
                None => return fallback,
            }
        }
        oldest.unwrap_or(fallback)
    }
}
