//! Time-ordered document identifiers
//!
//! Identifiers are UUIDv7 strings: 48 bits of Unix milliseconds, a 12-bit
//! per-millisecond counter in the `rand_a` bits, then random bits. The
//! hyphenated lowercase form sorts lexicographically in generation order.
//!
//! Within one generator the sequence is strictly increasing even when the
//! wall clock stalls or steps backwards: the generator keeps its last
//! millisecond and bumps the counter, advancing the logical millisecond
//! when the counter overflows.

use std::sync::Mutex;

use chrono::Utc;
use uuid::{Builder, Uuid};

const MAX_COUNTER: u16 = 0x0FFF;

#[derive(Debug)]
struct GenState {
    last_ms: u64,
    counter: u16,
}

/// Thread-safe, monotonic identifier generator
#[derive(Debug)]
pub struct IdGenerator {
    state: Mutex<GenState>,
}

impl IdGenerator {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(GenState {
                last_ms: 0,
                counter: 0,
            }),
        }
    }

    /// Returns a new identifier.
    pub fn next(&self) -> String {
        let now_ms = Utc::now().timestamp_millis().max(0) as u64;
        self.next_at(now_ms).to_string()
    }

    fn next_at(&self, now_ms: u64) -> Uuid {
        // The state is two integers; a panic elsewhere cannot leave it invalid.
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if now_ms > state.last_ms {
            state.last_ms = now_ms;
            state.counter = 0;
        } else if state.counter < MAX_COUNTER {
            state.counter += 1;
        } else {
            state.last_ms += 1;
            state.counter = 0;
        }

        let mut bytes: [u8; 10] = rand::random();
        bytes[0] = ((state.counter >> 8) as u8) & 0x0F;
        bytes[1] = state.counter as u8;

        Builder::from_unix_timestamp_millis(state.last_ms, &bytes).into_uuid()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

static GENERATOR: IdGenerator = IdGenerator::new();

/// Next identifier from the process-wide generator
pub fn next_id() -> String {
    GENERATOR.next()
}
