use chrono::Utc;
use std::collections::BTreeMap;
use tracing::debug;

/// A named, fired timer or time alert event, emitted by [`Clock::advance_time`] /
/// [`TestClock::set_time`] in fire order (§4.1: ties broken by registration order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeEvent {
    pub name: String,
    pub ts_event: i64,
}

/// Determines how an [`Engine`](crate) or [`crate::bus::MessageBus`] consumer obtains the
/// current time and schedules callbacks.
///
/// * [`LiveClock`] wraps wall-clock time for live trading.
/// * [`TestClock`] only advances via explicit [`TestClock::set_time`] /
///   [`TestClock::advance_time`], used for deterministic backtesting.
pub trait Clock {
    /// Current time in nanoseconds since the Unix epoch.
    fn now_ns(&self) -> i64;

    /// Schedule a one-shot alert named `name` to fire at `ts`.
    fn set_time_alert(&mut self, name: impl Into<String>, ts: i64);

    /// Schedule a recurring timer named `name` firing every `interval_ns`, starting at `start`
    /// and (optionally) stopping at `stop`.
    fn set_timer(&mut self, name: impl Into<String>, interval_ns: i64, start: i64, stop: Option<i64>);

    /// Cancel a previously scheduled timer or alert by name. A no-op if unknown.
    fn cancel(&mut self, name: &str);

    /// Names of all timers and alerts currently scheduled.
    fn timer_names(&self) -> Vec<String>;
}

#[derive(Debug, Clone)]
struct Timer {
    name: String,
    interval_ns: i64,
    next_fire: i64,
    stop: Option<i64>,
    registration_order: u64,
}

#[derive(Debug, Clone)]
struct Alert {
    name: String,
    ts: i64,
    registration_order: u64,
}

/// A [`Clock`] that only advances via explicit [`TestClock::set_time`] /
/// [`TestClock::advance_time`] calls, firing every scheduled timer/alert whose fire time is
/// `<= ` the new instant, in order of fire time with registration order as the tie-break.
///
/// This is the clock used by the backtest event loop: virtual time advances exactly as fast as
/// the replayed data does, making runs reproducible given the same data and seed.
#[derive(Debug, Default)]
pub struct TestClock {
    now_ns: i64,
    timers: Vec<Timer>,
    alerts: Vec<Alert>,
    registration_counter: u64,
}

impl TestClock {
    pub fn new(start_ns: i64) -> Self {
        Self {
            now_ns: start_ns,
            ..Default::default()
        }
    }

    /// Jump directly to `ts_ns`, firing everything due along the way, and return the fired
    /// events in fire order.
    pub fn set_time(&mut self, ts_ns: i64) -> Vec<TimeEvent> {
        debug_assert!(ts_ns >= self.now_ns, "TestClock time must be non-decreasing");
        self.now_ns = ts_ns;
        self.drain_due()
    }

    /// Advance time by `delta_ns`, firing everything due along the way.
    pub fn advance_time(&mut self, delta_ns: i64) -> Vec<TimeEvent> {
        self.set_time(self.now_ns + delta_ns)
    }

    fn drain_due(&mut self) -> Vec<TimeEvent> {
        let now = self.now_ns;

        let mut due: Vec<(i64, u64, TimeEvent)> = Vec::new();

        self.alerts.retain(|alert| {
            if alert.ts <= now {
                due.push((
                    alert.ts,
                    alert.registration_order,
                    TimeEvent {
                        name: alert.name.clone(),
                        ts_event: alert.ts,
                    },
                ));
                false
            } else {
                true
            }
        });

        for timer in self.timers.iter_mut() {
            while timer.next_fire <= now && timer.stop.is_none_or(|stop| timer.next_fire <= stop) {
                due.push((
                    timer.next_fire,
                    timer.registration_order,
                    TimeEvent {
                        name: timer.name.clone(),
                        ts_event: timer.next_fire,
                    },
                ));
                timer.next_fire += timer.interval_ns;
            }
        }

        self.timers.retain(|timer| {
            timer.stop.is_none_or(|stop| timer.next_fire <= stop)
        });

        due.sort_by_key(|(fire_time, order, _)| (*fire_time, *order));
        due.into_iter().map(|(_, _, event)| event).collect()
    }
}

impl Clock for TestClock {
    fn now_ns(&self) -> i64 {
        self.now_ns
    }

    fn set_time_alert(&mut self, name: impl Into<String>, ts: i64) {
        let name = name.into();
        self.registration_counter += 1;
        debug!(name, ts, "TestClock scheduling time alert");
        self.alerts.push(Alert {
            name,
            ts,
            registration_order: self.registration_counter,
        });
    }

    fn set_timer(&mut self, name: impl Into<String>, interval_ns: i64, start: i64, stop: Option<i64>) {
        let name = name.into();
        self.registration_counter += 1;
        debug!(name, interval_ns, start, ?stop, "TestClock scheduling timer");
        self.timers.push(Timer {
            name,
            interval_ns,
            next_fire: start,
            stop,
            registration_order: self.registration_counter,
        });
    }

    fn cancel(&mut self, name: &str) {
        self.timers.retain(|timer| timer.name != name);
        self.alerts.retain(|alert| alert.name != name);
    }

    fn timer_names(&self) -> Vec<String> {
        self.timers
            .iter()
            .map(|timer| timer.name.clone())
            .chain(self.alerts.iter().map(|alert| alert.name.clone()))
            .collect()
    }
}

/// A [`Clock`] wrapping wall-clock time, scheduling via a `BTreeMap` of due times checked by
/// the host event loop on each tick (the host, not this struct, owns the actual OS timer /
/// `tokio::time::sleep`).
#[derive(Debug, Default)]
pub struct LiveClock {
    alerts: BTreeMap<i64, Vec<String>>,
    timers: Vec<Timer>,
    registration_counter: u64,
}

impl LiveClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check for and remove any timers/alerts now due, returning them in fire order. The host
    /// event loop calls this on each wakeup.
    pub fn poll_due(&mut self) -> Vec<TimeEvent> {
        let now = self.now_ns();
        let mut due = Vec::new();

        let due_keys: Vec<i64> = self.alerts.range(..=now).map(|(ts, _)| *ts).collect();
        for ts in due_keys {
            if let Some(names) = self.alerts.remove(&ts) {
                for name in names {
                    due.push(TimeEvent { name, ts_event: ts });
                }
            }
        }

        for timer in self.timers.iter_mut() {
            while timer.next_fire <= now && timer.stop.is_none_or(|stop| timer.next_fire <= stop) {
                due.push(TimeEvent {
                    name: timer.name.clone(),
                    ts_event: timer.next_fire,
                });
                timer.next_fire += timer.interval_ns;
            }
        }
        self.timers.retain(|timer| timer.stop.is_none_or(|stop| timer.next_fire <= stop));

        due
    }
}

impl Clock for LiveClock {
    fn now_ns(&self) -> i64 {
        Utc::now()
            .timestamp_nanos_opt()
            .expect("system time out of range for i64 nanoseconds")
    }

    fn set_time_alert(&mut self, name: impl Into<String>, ts: i64) {
        self.registration_counter += 1;
        self.alerts.entry(ts).or_default().push(name.into());
    }

    fn set_timer(&mut self, name: impl Into<String>, interval_ns: i64, start: i64, stop: Option<i64>) {
        self.registration_counter += 1;
        self.timers.push(Timer {
            name: name.into(),
            interval_ns,
            next_fire: start,
            stop,
            registration_order: self.registration_counter,
        });
    }

    fn cancel(&mut self, name: &str) {
        self.timers.retain(|timer| timer.name != name);
        self.alerts.retain(|_, names| {
            names.retain(|n| n != name);
            !names.is_empty()
        });
    }

    fn timer_names(&self) -> Vec<String> {
        self.timers
            .iter()
            .map(|timer| timer.name.clone())
            .chain(self.alerts.values().flatten().cloned())
            .collect()
    }
}
