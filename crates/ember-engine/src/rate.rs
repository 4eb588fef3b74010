//! Rolling-hour action rate limiter.
//!
//! Admission is checked against a rolling 60-minute window of prior
//! admissions, never a calendar hour. The check-and-admit step is atomic
//! under the window's lock, so concurrent workers can never overshoot the
//! cap. Timestamps use [`tokio::time::Instant`] so paused-clock tests
//! drive the window deterministically.

use std::collections::VecDeque;
use std::time::Duration;

use dashmap::DashMap;
use ember_settings::RateLimitScope;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

const WINDOW: Duration = Duration::from_secs(3600);

/// Shared rate limiter; constructed once per engine and handed to every
/// worker explicitly.
pub struct RateLimiter {
    cap: u32,
    scope: RateLimitScope,
    global: Mutex<VecDeque<Instant>>,
    per_profile: DashMap<String, Mutex<VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Create a limiter admitting at most `cap` actions per rolling hour.
    ///
    /// With [`RateLimitScope::Global`] one window covers every profile;
    /// with [`RateLimitScope::PerProfile`] each profile gets its own.
    #[must_use]
    pub fn new(cap: u32, scope: RateLimitScope) -> Self {
        Self {
            cap,
            scope,
            global: Mutex::new(VecDeque::new()),
            per_profile: DashMap::new(),
        }
    }

    /// Try to admit one action for `profile_id` right now.
    ///
    /// Returns `false` when the window is at capacity. Denial is a backoff
    /// signal, not an error; the caller retries after its cooldown.
    pub fn try_acquire(&self, profile_id: &str) -> bool {
        let admitted = match self.scope {
            RateLimitScope::Global => Self::admit(&self.global, self.cap),
            RateLimitScope::PerProfile => {
                let window = self
                    .per_profile
                    .entry(profile_id.to_string())
                    .or_insert_with(|| Mutex::new(VecDeque::new()));
                Self::admit(window.value(), self.cap)
            }
        };
        if !admitted {
            debug!(profile_id, cap = self.cap, "rate limit denied");
        }
        admitted
    }

    /// Number of admissions currently inside the window for `profile_id`.
    pub fn in_window(&self, profile_id: &str) -> usize {
        let now = Instant::now();
        match self.scope {
            RateLimitScope::Global => {
                let mut window = self.global.lock();
                Self::prune(&mut window, now);
                window.len()
            }
            RateLimitScope::PerProfile => self.per_profile.get(profile_id).map_or(0, |entry| {
                let mut window = entry.lock();
                Self::prune(&mut window, now);
                window.len()
            }),
        }
    }

    fn admit(window: &Mutex<VecDeque<Instant>>, cap: u32) -> bool {
        let now = Instant::now();
        let mut window = window.lock();
        Self::prune(&mut window, now);
        if window.len() >= cap as usize {
            return false;
        }
        window.push_back(now);
        true
    }

    fn prune(window: &mut VecDeque<Instant>, now: Instant) {
        while let Some(front) = window.front() {
            if now.duration_since(*front) >= WINDOW {
                let _ = window.pop_front();
            } else {
                break;
            }
        }
    }
}
