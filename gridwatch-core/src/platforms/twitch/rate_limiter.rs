// File: gridwatch-core/src/platforms/twitch/rate_limiter.rs
//
// Token-bucket admission control in front of every Helix call.

use std::future::Future;
use std::time::Duration;

use http::StatusCode;
use parking_lot::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace, warn};

use gridwatch_common::models::RateBudget;
use crate::config::RateLimiterConfig;
use crate::http::HttpResponse;
use crate::utils::time::{deadline_after, instant_from_epoch};
use crate::Error;

const HEADER_LIMIT: &str = "ratelimit-limit";
const HEADER_REMAINING: &str = "ratelimit-remaining";
const HEADER_RESET: &str = "ratelimit-reset";
const HEADER_RETRY_AFTER: &str = "retry-after";

/// Upstream wait hints are honoured up to this many windows.
const MAX_WAIT_WINDOWS: u32 = 5;

/// Shared request budget for one upstream identity.
///
/// The local counter is decremented before each send so a burst of
/// concurrent callers cannot all slip through before any response headers
/// arrive. Response headers then replace the local estimate, less the
/// calls still in flight that the server may not have counted yet.
pub struct RateLimiter {
    config: RateLimiterConfig,
    ledger: Mutex<Ledger>,
}

struct Ledger {
    budget: RateBudget,
    in_flight: u32,
}

/// Marks one dispatched call; released when the call settles or is dropped.
struct InFlight<'a> {
    ledger: &'a Mutex<Ledger>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut ledger = self.ledger.lock();
        ledger.in_flight = ledger.in_flight.saturating_sub(1);
    }
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            ledger: Mutex::new(Ledger {
                budget: RateBudget::full(config.limit, config.window),
                in_flight: 0,
            }),
            config,
        }
    }

    pub fn budget(&self) -> RateBudget {
        self.ledger.lock().budget
    }

    fn max_wait(&self) -> Duration {
        self.config.window.saturating_mul(MAX_WAIT_WINDOWS)
    }

    /// Runs `call` once a slot is available.
    ///
    /// A 429 is retried transparently (up to `quota_retries` times) after
    /// the advertised wait. Any other non-2xx becomes `UpstreamHttp`;
    /// transport errors are returned as-is. Neither of those consumes the
    /// slot unless the server reported its own budget.
    pub async fn execute<F, Fut>(&self, mut call: F) -> Result<HttpResponse, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<HttpResponse, Error>>,
    {
        let mut quota_retries = 0;
        loop {
            let slot = self.acquire().await;

            let resp = match call().await {
                Ok(resp) => resp,
                Err(e) => {
                    self.refund();
                    return Err(e);
                }
            };

            if resp.status == StatusCode::TOO_MANY_REQUESTS {
                let resume_at = self.note_quota_exceeded(&resp);
                drop(slot);
                if quota_retries >= self.config.quota_retries {
                    warn!("Upstream quota still exhausted after {} retries", quota_retries);
                    return Err(Error::QuotaExceeded);
                }
                quota_retries += 1;
                warn!(
                    "Upstream quota exceeded; retrying in {:?}",
                    resume_at.saturating_duration_since(Instant::now())
                );
                sleep_until(resume_at).await;
                continue;
            }

            let reported = self.apply_headers(&resp);
            if resp.is_success() {
                return Ok(resp);
            }
            if !reported {
                self.refund();
            }
            return Err(Error::UpstreamHttp {
                status: resp.status.as_u16(),
                body: resp.body,
            });
        }
    }

    /// Takes one slot, suspending until the window resets if none is left.
    /// Every caller suspended on the same window wakes at the same deadline.
    async fn acquire(&self) -> InFlight<'_> {
        loop {
            let resume_at = {
                let mut ledger = self.ledger.lock();
                let now = Instant::now();
                let budget = &mut ledger.budget;
                if now >= budget.reset_at {
                    budget.remaining = budget.limit;
                    budget.reset_at = now + self.config.window;
                }
                if budget.remaining > 0 {
                    budget.remaining -= 1;
                    trace!("Rate slot taken, {} left", budget.remaining);
                    ledger.in_flight += 1;
                    None
                } else {
                    Some(budget.reset_at + self.config.resume_buffer)
                }
            };

            match resume_at {
                None => return InFlight { ledger: &self.ledger },
                Some(deadline) => {
                    debug!(
                        "Rate budget exhausted; suspending for {:?}",
                        deadline.saturating_duration_since(Instant::now())
                    );
                    sleep_until(deadline).await;
                }
            }
        }
    }

    fn refund(&self) {
        let mut ledger = self.ledger.lock();
        let budget = &mut ledger.budget;
        if budget.remaining < budget.limit {
            budget.remaining += 1;
        }
    }

    /// Applies `Ratelimit-*` headers. Returns false when none were present.
    /// Must be called while the caller's own slot is still in flight.
    fn apply_headers(&self, resp: &HttpResponse) -> bool {
        let limit = resp.header(HEADER_LIMIT).and_then(|v| v.parse::<u32>().ok());
        let remaining = resp.header(HEADER_REMAINING).and_then(|v| v.parse::<i64>().ok());
        let reset = resp.header(HEADER_RESET).and_then(|v| v.parse::<i64>().ok());
        if limit.is_none() && remaining.is_none() && reset.is_none() {
            return false;
        }

        let max_wait = self.max_wait();
        let mut ledger = self.ledger.lock();
        let others = ledger.in_flight.saturating_sub(1);
        let budget = &mut ledger.budget;
        if let Some(limit) = limit {
            budget.limit = limit;
        }
        if let Some(remaining) = remaining {
            if remaining < 0 {
                warn!("Upstream reported negative remaining budget ({}); clamping", remaining);
            }
            let reported = remaining.clamp(0, budget.limit as i64) as u32;
            budget.remaining = reported.saturating_sub(others);
        }
        if let Some(epoch) = reset {
            budget.reset_at = instant_from_epoch(epoch, max_wait);
        }
        true
    }

    /// Empties the budget and moves the reset to the provider's hint.
    /// Returns when the retry may be sent.
    fn note_quota_exceeded(&self, resp: &HttpResponse) -> Instant {
        let max_wait = self.max_wait();
        let retry_after = resp
            .header(HEADER_RETRY_AFTER)
            .and_then(|v| v.parse::<u64>().ok())
            .map(|secs| deadline_after(Duration::from_secs(secs), max_wait));
        let reset = resp
            .header(HEADER_RESET)
            .and_then(|v| v.parse::<i64>().ok())
            .map(|epoch| instant_from_epoch(epoch, max_wait));
        let limit = resp.header(HEADER_LIMIT).and_then(|v| v.parse::<u32>().ok());

        let mut ledger = self.ledger.lock();
        let budget = &mut ledger.budget;
        if let Some(limit) = limit {
            budget.limit = limit;
        }
        budget.remaining = 0;
        budget.reset_at = retry_after
            .or(reset)
            .unwrap_or_else(|| deadline_after(self.config.window, max_wait));
        budget.reset_at + self.config.resume_buffer
    }
}
