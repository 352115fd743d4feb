//! Chronologically sortable record keys.
//!
//! A key is 8 characters of millisecond timestamp followed by 12 random
//! characters, all drawn from an alphabet that sorts in ASCII order. Keys
//! minted within the same millisecond reuse the previous random tail plus
//! one, so lexical key order always equals creation order on one generator.

use crate::core::{RecordKey, Result, SharedClock};
use std::sync::Mutex;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";
const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

struct KeyState {
    last_millis: i64,
    last_random: [u8; RANDOM_CHARS],
}

pub struct PushKeyGenerator {
    clock: SharedClock,
    state: Mutex<KeyState>,
}

impl PushKeyGenerator {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            state: Mutex::new(KeyState {
                last_millis: i64::MIN,
                last_random: [0; RANDOM_CHARS],
            }),
        }
    }

    pub fn next_key(&self) -> Result<RecordKey> {
        let mut state = self.state.lock()?;

        // Never let the clock run backwards relative to the previous key.
        let now = self.clock.now_millis().max(state.last_millis);
        if now == state.last_millis {
            increment(&mut state.last_random);
        } else {
            state.last_millis = now;
            state.last_random = random_tail();
        }

        let mut key = String::with_capacity(TIME_CHARS + RANDOM_CHARS);
        let mut time = now.max(0) as u64;
        let mut time_chars = [0u8; TIME_CHARS];
        for slot in time_chars.iter_mut().rev() {
            *slot = PUSH_CHARS[(time % 64) as usize];
            time /= 64;
        }
        key.extend(time_chars.iter().map(|&c| c as char));
        key.extend(state.last_random.iter().map(|&i| PUSH_CHARS[i as usize] as char));

        RecordKey::new(key)
    }
}

fn random_tail() -> [u8; RANDOM_CHARS] {
    let bytes = uuid::Uuid::new_v4().into_bytes();
    let mut tail = [0u8; RANDOM_CHARS];
    for (slot, byte) in tail.iter_mut().zip(bytes.iter()) {
        *slot = byte % 64;
    }
    tail
}

fn increment(tail: &mut [u8; RANDOM_CHARS]) {
    for digit in tail.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}
