use std::{
    collections::{HashMap, VecDeque},
    time::{Duration, Instant},
};

use crate::domain::UserId;

// ============== Rate Limiter (Sliding Window) ==============

/// Per-user sliding-window rate limiter.
///
/// Every attempt is recorded before the decision, so a user who keeps sending
/// while limited stays limited until they pause for a full window.
///
/// Only the newest `max_requests + 1` timestamps are kept per user: the decision
/// depends solely on whether more than `max_requests` attempts fall inside the
/// window, and older entries always expire first.
///
/// The user map is not swept. A user's entries are purged on that user's next
/// attempt, so memory grows with the number of distinct users seen.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    enabled: bool,
    max_requests: usize,
    window: Duration,
    history: HashMap<UserId, VecDeque<Instant>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub recent: usize,
    pub max: usize,
    pub window: Duration,
}

impl RateLimiter {
    pub fn new(enabled: bool, max_requests: u32, window: Duration) -> Self {
        Self {
            enabled,
            max_requests: max_requests as usize,
            window,
            history: HashMap::new(),
        }
    }

    pub fn check_at(&mut self, user_id: UserId, now: Instant) -> bool {
        if !self.enabled {
            return true;
        }

        let window = self.window;
        let keep = self.max_requests + 1;
        let entry = self.history.entry(user_id).or_default();
        entry.push_back(now);

        let mut fresh: VecDeque<Instant> = entry
            .iter()
            .copied()
            .filter(|t| now.saturating_duration_since(*t) <= window)
            .collect();
        while fresh.len() > keep {
            fresh.pop_front();
        }
        *entry = fresh;

        entry.len() <= self.max_requests
    }

    pub fn status(&self, user_id: UserId) -> RateLimitStatus {
        RateLimitStatus {
            recent: self.history.get(&user_id).map(VecDeque::len).unwrap_or(0),
            max: self.max_requests,
            window: self.window,
        }
    }

    /// Number of users with retained history.
    pub fn tracked_users(&self) -> usize {
        self.history.len()
    }
}
