use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// A sliding-window order-rate limiter, per §4.7's "throttle (max orders per time window)".
///
/// Driven by an explicit `now` on every call rather than a wall-clock `Instant`, so it is
/// equally deterministic under a backtest's virtual time and a live deployment's real time.
#[derive(Debug, Clone)]
pub struct Throttle {
    max_orders: usize,
    window: Duration,
    timestamps: VecDeque<DateTime<Utc>>,
}

impl Throttle {
    pub fn new(max_orders: usize, window: Duration) -> Self {
        Self { max_orders, window, timestamps: VecDeque::new() }
    }

    /// Evict timestamps older than `window`, then record `now` only if the window has
    /// headroom. Returns `true` if the order is allowed through.
    pub fn try_acquire(&mut self, now: DateTime<Utc>) -> bool {
        let cutoff = now - self.window;
        while matches!(self.timestamps.front(), Some(ts) if *ts < cutoff) {
            self.timestamps.pop_front();
        }

        if self.timestamps.len() >= self.max_orders {
            return false;
        }

        self.timestamps.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(seconds: i64) -> DateTime<Utc> {
        DateTime::UNIX_EPOCH + Duration::seconds(seconds)
    }

    #[test]
    fn test_allows_up_to_max_orders_within_window() {
        let mut throttle = Throttle::new(2, Duration::seconds(10));
        assert!(throttle.try_acquire(t(0)));
        assert!(throttle.try_acquire(t(1)));
        assert!(!throttle.try_acquire(t(2)));
    }

    #[test]
    fn test_window_expiry_frees_capacity() {
        let mut throttle = Throttle::new(1, Duration::seconds(10));
        assert!(throttle.try_acquire(t(0)));
        assert!(!throttle.try_acquire(t(5)));
        assert!(throttle.try_acquire(t(11)));
    }
}
