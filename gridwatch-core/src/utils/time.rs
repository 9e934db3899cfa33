use std::time::Duration;
use chrono::Utc;
use tokio::time::Instant;

/// Returns the current epoch seconds.
pub fn current_epoch() -> i64 {
    Utc::now().timestamp()
}

/// `now + delay`, with `delay` clamped to `max_ahead`.
pub fn deadline_after(delay: Duration, max_ahead: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay.min(max_ahead)).unwrap_or(now)
}

/// Maps an absolute epoch-seconds deadline (as sent in `Ratelimit-Reset`)
/// onto the monotonic clock, never further out than `max_ahead`.
/// Deadlines in the past map to `now`.
pub fn instant_from_epoch(epoch: i64, max_ahead: Duration) -> Instant {
    let delta = epoch.saturating_sub(current_epoch());
    if delta <= 0 {
        Instant::now()
    } else {
        deadline_after(Duration::from_secs(delta as u64), max_ahead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP: Duration = Duration::from_secs(60);

    #[test]
    fn past_epoch_maps_to_now() {
        let before = Instant::now();
        let at = instant_from_epoch(0, CAP);
        assert!(at >= before);
        assert!(at <= Instant::now());
    }

    #[test]
    fn future_epoch_maps_forward() {
        let at = instant_from_epoch(current_epoch() + 30, CAP);
        let ahead = at.saturating_duration_since(Instant::now());
        assert!(ahead > Duration::from_secs(28));
        assert!(ahead <= Duration::from_secs(30));
    }

    #[test]
    fn far_future_epoch_is_capped() {
        let at = instant_from_epoch(i64::MAX, CAP);
        assert!(at.saturating_duration_since(Instant::now()) <= CAP);
    }

    #[test]
    fn huge_delay_is_capped() {
        let at = deadline_after(Duration::from_secs(u64::MAX), CAP);
        assert!(at.saturating_duration_since(Instant::now()) <= CAP);
    }
}
