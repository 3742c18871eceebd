//! Accelerated virtual clock
//!
//! Maps real elapsed time onto a virtual timeline:
//! `virtual = virtual_start + (real - real_start) * multiplier`.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VirtualClock {
    real_start: DateTime<Utc>,
    virtual_start: DateTime<Utc>,
    multiplier: u32,
}

impl VirtualClock {
    /// A zero multiplier is clamped to 1 so virtual time always advances
    pub fn new(real_start: DateTime<Utc>, virtual_start: DateTime<Utc>, multiplier: u32) -> Self {
        Self {
            real_start,
            virtual_start,
            multiplier: multiplier.max(1),
        }
    }

    /// Clock whose real start is now
    pub fn starting_now(virtual_start: DateTime<Utc>, multiplier: u32) -> Self {
        Self::new(Utc::now(), virtual_start, multiplier)
    }

    pub fn real_start(&self) -> DateTime<Utc> {
        self.real_start
    }

    pub fn virtual_start(&self) -> DateTime<Utc> {
        self.virtual_start
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    pub fn to_virtual_time(&self, real: DateTime<Utc>) -> DateTime<Utc> {
        let elapsed_ms = (real - self.real_start).num_milliseconds();
        let scaled_ms = elapsed_ms.saturating_mul(i64::from(self.multiplier));
        let scaled = Duration::try_milliseconds(scaled_ms).unwrap_or(if scaled_ms < 0 {
            Duration::MIN
        } else {
            Duration::MAX
        });
        self.virtual_start
            .checked_add_signed(scaled)
            .unwrap_or(if scaled < Duration::zero() {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            })
    }

    pub fn now_virtual(&self) -> DateTime<Utc> {
        self.to_virtual_time(Utc::now())
    }

    /// Current virtual time as unix seconds
    pub fn virtual_unix_now(&self) -> i64 {
        self.now_virtual().timestamp()
    }
}
