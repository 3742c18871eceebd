//! Simulated devices owned by virtual users

use crate::condition::Condition;
use crate::store::ConditionStore;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::debug;
use uuid::Builder;

/// Personality fixed at creation; drives how often flags are raised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Character {
    Cheerful,
    Timid,
    Careless,
    Stubborn,
    Calm,
    Lonely,
    Meticulous,
    Lazy,
}

/// Per-tick transition probabilities
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterProfile {
    pub dirty: f64,
    pub overweight: f64,
    pub broken: f64,
    pub recover: f64,
    pub sit_toggle: f64,
}

impl Character {
    pub const ALL: [Character; 8] = [
        Character::Cheerful,
        Character::Timid,
        Character::Careless,
        Character::Stubborn,
        Character::Calm,
        Character::Lonely,
        Character::Meticulous,
        Character::Lazy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Character::Cheerful => "cheerful",
            Character::Timid => "timid",
            Character::Careless => "careless",
            Character::Stubborn => "stubborn",
            Character::Calm => "calm",
            Character::Lonely => "lonely",
            Character::Meticulous => "meticulous",
            Character::Lazy => "lazy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }

    pub fn random(rng: &mut impl Rng) -> Self {
        *Self::ALL.choose(rng).unwrap_or(&Character::Calm)
    }

    pub fn profile(&self) -> CharacterProfile {
        let (dirty, overweight, broken, recover, sit_toggle) = match self {
            Character::Cheerful => (0.05, 0.05, 0.01, 0.30, 0.50),
            Character::Timid => (0.02, 0.02, 0.01, 0.40, 0.10),
            Character::Careless => (0.15, 0.10, 0.05, 0.20, 0.40),
            Character::Stubborn => (0.05, 0.10, 0.02, 0.10, 0.20),
            Character::Calm => (0.02, 0.02, 0.005, 0.50, 0.05),
            Character::Lonely => (0.08, 0.02, 0.02, 0.25, 0.30),
            Character::Meticulous => (0.01, 0.01, 0.005, 0.60, 0.20),
            Character::Lazy => (0.10, 0.15, 0.03, 0.15, 0.05),
        };
        CharacterProfile {
            dirty,
            overweight,
            broken,
            recover,
            sit_toggle,
        }
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal from the scenario to a device's generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStateChange {
    /// Registration confirmed; pending readings may be released
    None,
    /// Registration failed; discard pending readings and stop
    Delete,
}

/// Generator-side ends of a device's channels
#[derive(Debug)]
pub struct GeneratorStreams {
    pub conditions_tx: mpsc::Sender<Condition>,
    pub state_rx: mpsc::Receiver<DeviceStateChange>,
}

#[derive(Debug)]
pub struct Device {
    pub uuid: String,
    pub name: String,
    pub catalog_id: String,
    pub character: Character,
    /// Owning user's id
    pub owner_id: String,
    /// Uploaded icon, `None` means the target's default icon
    pub image: Option<Vec<u8>>,
    /// Numeric id assigned by the target, known after the first list read
    pub server_id: Option<i64>,
    conditions: ConditionStore,
    conditions_rx: mpsc::Receiver<Condition>,
    state_tx: mpsc::Sender<DeviceStateChange>,
}

const NAME_PREFIXES: &[&str] = &["isu", "chair", "seat", "stool", "throne", "bench"];

impl Device {
    pub fn new(
        uuid: String,
        name: String,
        catalog_id: String,
        character: Character,
        owner_id: String,
        capacity: usize,
    ) -> (Self, GeneratorStreams) {
        let (conditions_tx, conditions_rx) = mpsc::channel(capacity.max(1));
        let (state_tx, state_rx) = mpsc::channel(1);
        let device = Self {
            uuid,
            name,
            catalog_id,
            character,
            owner_id,
            image: None,
            server_id: None,
            conditions: ConditionStore::new(),
            conditions_rx,
            state_tx,
        };
        (
            device,
            GeneratorStreams {
                conditions_tx,
                state_rx,
            },
        )
    }

    pub fn new_random(
        owner_id: &str,
        rng: &mut impl Rng,
        capacity: usize,
    ) -> (Self, GeneratorStreams) {
        let uuid = Builder::from_random_bytes(rng.gen()).into_uuid().to_string();
        let prefix = NAME_PREFIXES.choose(rng).copied().unwrap_or("isu");
        let name = format!("{}-{:04}", prefix, rng.gen_range(0..10_000));
        let catalog_id = format!("catalog-{:03}", rng.gen_range(0..100));
        let character = Character::random(rng);
        let (mut device, streams) =
            Self::new(uuid, name, catalog_id, character, owner_id.to_string(), capacity);
        if rng.gen_bool(0.5) {
            device.image = Some(random_jpeg(rng));
        }
        (device, streams)
    }

    /// Ground truth for this device alone
    pub fn conditions(&self) -> &ConditionStore {
        &self.conditions
    }

    /// Tell the generator the target accepted the device
    pub fn confirm(&self) -> bool {
        self.state_tx.try_send(DeviceStateChange::None).is_ok()
    }

    /// Tell the generator to discard pending readings and stop; consumes the
    /// device so nothing it buffered can reach a store
    pub fn rollback(self) {
        if self.state_tx.try_send(DeviceStateChange::Delete).is_err() {
            debug!("Generator for {} already stopped", self.uuid);
        }
    }

    /// Move every buffered reading into this device's store and `user_store`.
    /// Returns the number of readings moved.
    pub fn drain_into(&mut self, user_store: &mut ConditionStore) -> usize {
        let mut moved = 0;
        loop {
            match self.conditions_rx.try_recv() {
                Ok(condition) => {
                    user_store.insert(condition.clone());
                    self.conditions.insert(condition);
                    moved += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        moved
    }
}

/// Small payload with a JPEG SOI/APP0 prefix, enough for byte-exact icon checks
fn random_jpeg(rng: &mut impl Rng) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    let len = rng.gen_range(64..256);
    bytes.extend((0..len).map(|_| rng.gen::<u8>()));
    bytes.extend([0xFF, 0xD9]);
    bytes
}
