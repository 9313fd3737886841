// throttle.rs - Rate limiting for host driven input
//
// Timestamps are milliseconds from the host's monotonic clock.

/// Lets a value through at most once per interval. Values arriving too early
/// are held back; only the latest is kept and it fires once the interval has
/// passed (leading + trailing edge, like lodash `throttle`).
pub struct Throttle<T> {
    interval: f64,
    last: Option<f64>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval: interval_ms.max(0.0),
            last: None,
            pending: None,
        }
    }

    #[inline]
    fn open(&self, now: f64) -> bool {
        self.last.is_none_or(|last| now - last >= self.interval)
    }

    /// Returns the value if it may fire now, otherwise parks it
    pub fn offer(&mut self, value: T, now: f64) -> Option<T> {
        if self.open(now) {
            self.last = Some(now);
            self.pending = None;
            Some(value)
        } else {
            self.pending = Some(value);
            None
        }
    }

    /// Trailing edge: releases the parked value once allowed
    pub fn poll(&mut self, now: f64) -> Option<T> {
        if self.pending.is_some() && self.open(now) {
            self.last = Some(now);
            self.pending.take()
        } else {
            None
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// Caps simulation ticks per second regardless of the display refresh rate.
pub struct FrameLimiter {
    interval: f64,
    then: Option<f64>,
}

impl FrameLimiter {
    pub fn new(fps: f32) -> Self {
        Self {
            interval: 1000.0 / fps as f64,
            then: None,
        }
    }

    /// True when a tick is due. Leftover time carries over so the average
    /// rate stays on target.
    pub fn ready(&mut self, now: f64) -> bool {
        let Some(then) = self.then else {
            self.then = Some(now);
            return true;
        };

        let elapsed = now - then;
        if elapsed > self.interval {
            self.then = Some(now - elapsed % self.interval);
            true
        } else {
            false
        }
    }
}
