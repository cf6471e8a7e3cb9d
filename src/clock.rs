/*
 * This file is part of Energyfan.
 *
 * Copyright (C) 2025 Energyfan contributors
 *
 * Energyfan is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Energyfan is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Energyfan. If not, see <https://www.gnu.org/licenses/>.
 */

//! Time source for the supervisor.
//!
//! Sleeps are always cancellable: a fired [`CancelToken`] cuts a sleep short
//! instead of waiting out the rest of a tick.

use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;

pub const DEFAULT_SLEEP_SLICE: Duration = Duration::from_millis(50);

pub trait Clock: Send + Sync {
    /// Monotonic time since the clock was created
    fn now(&self) -> Duration;

    /// Sleep for `duration`. Returns `false` if `cancel` fired first.
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> bool;
}

/// Wall clock that sleeps in short slices, checking the token between them
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
    slice: Duration,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::with_slice(DEFAULT_SLEEP_SLICE)
    }

    pub fn with_slice(slice: Duration) -> Self {
        Self {
            origin: Instant::now(),
            slice: slice.max(Duration::from_millis(1)),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return true;
            }
            thread::sleep(left.min(self.slice));
        }
    }
}

#[derive(Debug, Default)]
struct ManualState {
    now: Duration,
    cancel_at: Option<(Duration, CancelToken)>,
    sleeps: Vec<Duration>,
}

/// Virtual clock for tests. Sleeping advances virtual time instantly.
#[derive(Debug, Default)]
pub struct ManualClock {
    state: Mutex<ManualState>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Fire `token` when virtual time reaches `at`. The sleep spanning `at`
    /// stops there.
    pub fn cancel_at(&self, at: Duration, token: CancelToken) {
        self.lock().cancel_at = Some((at, token));
    }

    pub fn advance(&self, by: Duration) {
        self.lock().now += by;
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.lock().now
    }

    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> bool {
        let mut st = self.lock();
        st.sleeps.push(duration);
        if cancel.is_cancelled() {
            return false;
        }
        let wake = st.now + duration;
        if let Some((at, token)) = st.cancel_at.clone() {
            if at <= wake {
                st.now = st.now.max(at);
                st.cancel_at = None;
                token.cancel();
                if cancel.is_cancelled() {
                    return false;
                }
            }
        }
        st.now = wake;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_sleeps_full_duration() {
        let clock = SystemClock::with_slice(Duration::from_millis(5));
        let start = clock.now();
        assert!(clock.sleep(Duration::from_millis(20), &CancelToken::new()));
        assert!(clock.now() - start >= Duration::from_millis(20));
    }

    #[test]
    fn test_system_clock_cancel_preempts_sleep() {
        let clock = SystemClock::with_slice(Duration::from_millis(10));
        let token = CancelToken::new();
        let remote = token.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            remote.cancel();
        });
        let started = Instant::now();
        assert!(!clock.sleep(Duration::from_secs(10), &token));
        assert!(started.elapsed() < Duration::from_secs(5));
        canceller.join().unwrap();
    }

    #[test]
    fn test_system_clock_already_cancelled() {
        let clock = SystemClock::new();
        let token = CancelToken::new();
        token.cancel();
        assert!(!clock.sleep(Duration::from_secs(1), &token));
    }

    #[test]
    fn test_manual_clock_advances_on_sleep() {
        let clock = ManualClock::new();
        assert!(clock.sleep(Duration::from_millis(1500), &CancelToken::new()));
        assert_eq!(clock.now(), Duration::from_millis(1500));
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(1500)]);
    }

    #[test]
    fn test_manual_clock_scheduled_cancel_stops_sleep() {
        let clock = ManualClock::new();
        let token = CancelToken::new();
        clock.cancel_at(Duration::from_millis(2500), token.clone());

        assert!(clock.sleep(Duration::from_millis(1000), &token));
        assert!(clock.sleep(Duration::from_millis(1000), &token));
        assert!(!clock.sleep(Duration::from_millis(1000), &token));
        assert!(token.is_cancelled());
        assert_eq!(clock.now(), Duration::from_millis(2500));
    }

    #[test]
    fn test_manual_clock_cancel_of_unrelated_token() {
        let clock = ManualClock::new();
        let other = CancelToken::new();
        clock.cancel_at(Duration::from_millis(10), other.clone());
        assert!(clock.sleep(Duration::from_millis(100), &CancelToken::new()));
        assert!(other.is_cancelled());
        assert_eq!(clock.now(), Duration::from_millis(100));
    }
}
