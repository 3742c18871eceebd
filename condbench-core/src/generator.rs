//! Synthetic condition generator
//!
//! One task per device. Each tick produces a reading stamped with the
//! current virtual time. Readings stay pending until the scenario confirms
//! the device, then flow through the device's bounded channel; a full
//! channel blocks the generator instead of dropping data.

use crate::clock::VirtualClock;
use crate::condition::{Condition, ConditionFlags, ConditionLevel};
use crate::device::{Character, DeviceStateChange, GeneratorStreams};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Delivers readings to the target on the device's behalf
#[async_trait::async_trait]
pub trait ConditionPoster: Send + Sync {
    async fn post(&self, device_uuid: &str, conditions: &[Condition]) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy)]
pub struct GeneratorSettings {
    /// Real time between readings
    pub interval: Duration,
    /// Unconfirmed readings held before ticking pauses
    pub pending_capacity: usize,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            pending_capacity: 64,
        }
    }
}

const INFO_MESSAGES: &[&str] = &["all good", "sitting comfortably", "nothing to report"];
const WARNING_MESSAGES: &[&str] = &["needs a wipe", "creaking a little", "load is heavy"];
const CRITICAL_MESSAGES: &[&str] = &["needs repair", "do not sit", "call support"];

/// Seeded Markov chain over the three condition flags
#[derive(Debug, Clone)]
pub struct ConditionGenerator {
    device_uuid: String,
    character: Character,
    rng: StdRng,
    flags: ConditionFlags,
    is_sitting: bool,
    last_timestamp: i64,
}

impl ConditionGenerator {
    pub fn new(device_uuid: impl Into<String>, character: Character, seed: u64) -> Self {
        Self {
            device_uuid: device_uuid.into(),
            character,
            rng: StdRng::seed_from_u64(seed),
            flags: ConditionFlags::default(),
            is_sitting: false,
            last_timestamp: i64::MIN,
        }
    }

    pub fn device_uuid(&self) -> &str {
        &self.device_uuid
    }

    /// Next reading at `timestamp`, clamped so a device's readings never go
    /// back in time
    pub fn next_condition(&mut self, timestamp: i64) -> Condition {
        let timestamp = timestamp.max(self.last_timestamp);
        self.last_timestamp = timestamp;

        let profile = self.character.profile();
        let step = |rng: &mut StdRng, raised: bool, rate: f64| {
            if raised {
                !rng.gen_bool(profile.recover)
            } else {
                rng.gen_bool(rate)
            }
        };
        self.flags.is_dirty = step(&mut self.rng, self.flags.is_dirty, profile.dirty);
        self.flags.is_overweight = step(&mut self.rng, self.flags.is_overweight, profile.overweight);
        self.flags.is_broken = step(&mut self.rng, self.flags.is_broken, profile.broken);
        if self.rng.gen_bool(profile.sit_toggle) {
            self.is_sitting = !self.is_sitting;
        }

        let messages = match self.flags.level() {
            ConditionLevel::Info => INFO_MESSAGES,
            ConditionLevel::Warning => WARNING_MESSAGES,
            ConditionLevel::Critical => CRITICAL_MESSAGES,
        };
        let message = messages.choose(&mut self.rng).copied().unwrap_or("");

        Condition {
            device_uuid: self.device_uuid.clone(),
            timestamp,
            is_sitting: self.is_sitting,
            flags: self.flags,
            message: message.to_string(),
        }
    }

    /// `count` readings starting at `start`, `step` seconds apart
    pub fn generate_series(&mut self, start: i64, step: i64, count: usize) -> Vec<Condition> {
        (0..count)
            .map(|i| self.next_condition(start + step * i as i64))
            .collect()
    }

    /// Tick until cancelled, deleted, or the device is dropped.
    ///
    /// With a poster attached a reading is kept only once the post succeeds.
    pub async fn run(
        mut self,
        streams: GeneratorStreams,
        clock: VirtualClock,
        settings: GeneratorSettings,
        cancel: CancellationToken,
        poster: Option<Arc<dyn ConditionPoster>>,
    ) {
        let GeneratorStreams {
            conditions_tx,
            mut state_rx,
        } = streams;

        let mut ticker = tokio::time::interval(settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut confirmed = false;
        let mut pending: Vec<Condition> = Vec::new();

        loop {
            let can_tick = confirmed || pending.len() < settings.pending_capacity;

            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                state = state_rx.recv() => match state {
                    Some(DeviceStateChange::None) => {
                        if confirmed {
                            continue;
                        }
                        confirmed = true;
                        debug!("Device {} confirmed, releasing {} readings", self.device_uuid, pending.len());
                        for condition in pending.drain(..) {
                            if !forward(&conditions_tx, condition, &cancel).await {
                                return;
                            }
                        }
                    }
                    Some(DeviceStateChange::Delete) => {
                        debug!("Device {} deleted, discarding {} readings", self.device_uuid, pending.len());
                        pending.clear();
                        break;
                    }
                    // device dropped
                    None => break,
                },

                _ = ticker.tick(), if can_tick => {
                    let condition = self.next_condition(clock.virtual_unix_now());

                    if let Some(poster) = &poster {
                        if let Err(e) = poster.post(&self.device_uuid, std::slice::from_ref(&condition)).await {
                            trace!("Post for {} rejected: {}", self.device_uuid, e);
                            continue;
                        }
                    }

                    if confirmed {
                        if !forward(&conditions_tx, condition, &cancel).await {
                            break;
                        }
                    } else {
                        pending.push(condition);
                    }
                }
            }
        }
    }
}

/// Blocking send that still honours cancellation. `false` means stop.
async fn forward(
    tx: &mpsc::Sender<Condition>,
    condition: Condition,
    cancel: &CancellationToken,
) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        sent = tx.send(condition) => sent.is_ok(),
    }
}
