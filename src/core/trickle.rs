// Copyright (c) 2026 Hearthnet
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Trickle timer (RFC 6206 shape) governing summary broadcasts per endpoint.
//!
//! Intervals double from Imin to Imax while traffic stays consistent; any
//! inconsistency snaps the interval back to Imin. Within each interval a
//! fire time `t` is drawn uniformly from `[I/2, I)`; the transmission at `t`
//! is suppressed when at least `k` consistent messages were already heard.

use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};

/// Trickle constants. Imax is a concrete interval, not a doubling count.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TrickleParams {
    /// Minimum interval in milliseconds.
    pub imin_ms: u64,
    /// Maximum interval in milliseconds.
    pub imax_ms: u64,
    /// Redundancy constant.
    pub k: u32,
}

impl Default for TrickleParams {
    fn default() -> Self {
        Self {
            imin_ms: 200,
            imax_ms: 40_000,
            k: 1,
        }
    }
}

/// Per-endpoint Trickle state.
#[derive(Clone, Debug)]
pub struct Trickle {
    params: TrickleParams,
    /// Current interval length.
    interval_ms: u64,
    /// Absolute fire time within the current interval.
    fire_at: u64,
    /// Absolute end of the current interval.
    interval_end: u64,
    /// Consistent messages heard this interval.
    consistent_count: u32,
    fired: bool,
}

/// Draw a value uniformly-ish from `[lo, hi)`; falls back to the midpoint if
/// the system RNG fails.
fn rand_range(rng: &SystemRandom, lo: u64, hi: u64) -> u64 {
    let span = hi.saturating_sub(lo).max(1);
    let mut b = [0u8; 8];
    if rng.fill(&mut b).is_err() {
        return lo + span / 2;
    }
    lo + u64::from_be_bytes(b) % span
}

impl Trickle {
    /// Start a timer at the minimum interval.
    pub fn new(params: TrickleParams, now: u64, rng: &SystemRandom) -> Self {
        let mut t = Self {
            params,
            interval_ms: params.imin_ms,
            fire_at: 0,
            interval_end: 0,
            consistent_count: 0,
            fired: false,
        };
        t.begin_interval(now, rng);
        t
    }

    fn begin_interval(&mut self, now: u64, rng: &SystemRandom) {
        let i = self.interval_ms;
        self.fire_at = now + rand_range(rng, i / 2, i);
        self.interval_end = now + i;
        self.consistent_count = 0;
        self.fired = false;
    }

    /// A message consistent with local state was heard.
    pub fn note_consistent(&mut self) {
        self.consistent_count = self.consistent_count.saturating_add(1);
    }

    /// An inconsistent message was heard: snap back to Imin unless already there.
    pub fn note_inconsistent(&mut self, now: u64, rng: &SystemRandom) {
        if self.interval_ms > self.params.imin_ms {
            self.reset(now, rng);
        }
    }

    /// External inconsistency (local publish, peer change): restart at Imin.
    pub fn reset(&mut self, now: u64, rng: &SystemRandom) {
        self.interval_ms = self.params.imin_ms;
        self.begin_interval(now, rng);
    }

    /// Advance the timer to `now`. Returns true when a transmission is due:
    /// the fire time passed with fewer than `k` consistent messages heard.
    pub fn poll(&mut self, now: u64, rng: &SystemRandom) -> bool {
        let mut send = false;
        if !self.fired && now >= self.fire_at {
            self.fired = true;
            send = self.consistent_count < self.params.k;
        }
        if now >= self.interval_end {
            self.interval_ms = (self.interval_ms * 2).min(self.params.imax_ms);
            self.begin_interval(now, rng);
        }
        send
    }

    /// Next instant `poll` needs to run: the pending fire time, else the
    /// interval boundary.
    pub fn next_deadline(&self) -> u64 {
        if self.fired {
            self.interval_end
        } else {
            self.fire_at.min(self.interval_end)
        }
    }

    /// Current interval length in milliseconds.
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng() -> SystemRandom {
        SystemRandom::new()
    }

    #[test]
    fn first_fire_lands_in_first_half_open_interval() {
        let rng = rng();
        for _ in 0..32 {
            let t = Trickle::new(TrickleParams::default(), 1000, &rng);
            assert!(t.fire_at >= 1100 && t.fire_at < 1200, "t={}", t.fire_at);
        }
    }

    #[test]
    fn interval_doubles_up_to_imax() {
        let rng = rng();
        let params = TrickleParams {
            imin_ms: 100,
            imax_ms: 400,
            k: 1,
        };
        let mut t = Trickle::new(params, 0, &rng);
        for expect in [200u64, 400, 400, 400] {
            let now = t.interval_end;
            t.poll(now, &rng);
            assert_eq!(t.interval_ms(), expect);
        }
    }

    #[test]
    fn consistent_traffic_suppresses_send() {
        let rng = rng();
        let mut t = Trickle::new(TrickleParams::default(), 0, &rng);
        t.note_consistent();
        assert!(!t.poll(t.fire_at, &rng));
    }

    #[test]
    fn quiet_interval_sends_once() {
        let rng = rng();
        let mut t = Trickle::new(TrickleParams::default(), 0, &rng);
        let fire = t.fire_at;
        assert!(t.poll(fire, &rng));
        // Second poll within the same interval stays silent.
        assert!(!t.poll(fire + 1, &rng));
    }

    #[test]
    fn inconsistency_snaps_back_to_imin() {
        let rng = rng();
        let mut t = Trickle::new(TrickleParams::default(), 0, &rng);
        // Ride the doubling up for a few intervals.
        let mut now = 0;
        for _ in 0..4 {
            now = now.max(t.interval_end);
            t.poll(now, &rng);
        }
        assert!(t.interval_ms() > 200);
        t.note_inconsistent(now, &rng);
        assert_eq!(t.interval_ms(), 200);
        // At Imin already: a further inconsistency does not restart the interval.
        let fire = t.fire_at;
        t.note_inconsistent(now, &rng);
        assert_eq!(t.fire_at, fire);
    }
}
