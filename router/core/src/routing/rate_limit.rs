//! Fixed-Window Rate Limiter
//!
//! Counts requests per routing context (caller, app, tenant...) in fixed
//! windows. Requests over the limit are rejected outright; there is no
//! queueing and no token bucket.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::config::RateLimitConfig;

/// Rejection produced when a context has used up its window
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("rate limit exceeded for '{context}': {limit} requests per window, retry in {}ms", .retry_after.as_millis())]
pub struct RateLimitExceeded {
    /// Routing context that hit the limit
    pub context: String,
    /// Requests allowed per window
    pub limit: u32,
    /// Time until the window resets
    pub retry_after: Duration,
}

#[derive(Debug)]
struct RateWindow {
    count: u32,
    window_reset_time: Instant,
}

/// Per-context fixed-window counters
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, Arc<Mutex<RateWindow>>>,
    config: RateLimitConfig,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl RateLimiter {
    /// Create a limiter
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            config,
        }
    }

    fn window_for(&self, context: &str, now: Instant) -> Arc<Mutex<RateWindow>> {
        let window = self.config.window();
        self.windows
            .entry(context.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(RateWindow {
                    count: 0,
                    window_reset_time: now + window,
                }))
            })
            .clone()
    }

    /// Count one request against `context`, rejecting it when over the limit
    pub fn check(&self, context: &str) -> Result<(), RateLimitExceeded> {
        if !self.config.enabled {
            return Ok(());
        }

        let now = Instant::now();
        let cell = self.window_for(context, now);
        let mut window = cell.lock();

        if now >= window.window_reset_time {
            window.count = 0;
            window.window_reset_time = now + self.config.window();
        }

        if window.count >= self.config.requests_per_window {
            let retry_after = window.window_reset_time.saturating_duration_since(now);
            tracing::warn!(
                context = %context,
                limit = self.config.requests_per_window,
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limit exceeded"
            );
            return Err(RateLimitExceeded {
                context: context.to_string(),
                limit: self.config.requests_per_window,
                retry_after,
            });
        }

        window.count += 1;
        Ok(())
    }

    /// Requests still allowed in the current window
    #[must_use]
    pub fn remaining(&self, context: &str) -> u32 {
        let limit = self.config.requests_per_window;
        let Some(cell) = self.windows.get(context).map(|w| w.clone()) else {
            return limit;
        };
        let window = cell.lock();
        if Instant::now() >= window.window_reset_time {
            limit
        } else {
            limit.saturating_sub(window.count)
        }
    }

    /// Drop all windows
    pub fn clear(&self) {
        self.windows.clear();
    }
}
