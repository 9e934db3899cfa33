use tokio::time::Instant;

/// Snapshot of the upstream request budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBudget {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: Instant,
}

impl RateBudget {
    /// Optimistic starting point: a full bucket that resets one window from now.
    pub fn full(limit: u32, window: std::time::Duration) -> Self {
        Self {
            limit,
            remaining: limit,
            reset_at: Instant::now() + window,
        }
    }
}
