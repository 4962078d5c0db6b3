use super::RevalidationTrigger;

/// Fetch history of one key, as far as the policy cares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchTimeline {
    pub in_flight: bool,
    /// Completion time of the last successful fetch.
    pub last_completed_ms: Option<i64>,
}

/// What to do with a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevalidationDecision {
    Fetch,
    /// A fetch for the key is already running; its result will be used.
    SkipInFlight,
    /// The last fetch completed inside the dedupe window.
    SkipDeduped,
}

/// Pure decision rules for the revalidation scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevalidationPolicy {
    pub dedupe_interval_ms: u64,
}

impl Default for RevalidationPolicy {
    fn default() -> Self {
        Self {
            dedupe_interval_ms: 5_000,
        }
    }
}

impl RevalidationPolicy {
    pub fn new(dedupe_interval_ms: u64) -> Self {
        Self { dedupe_interval_ms }
    }

    pub fn decide(
        &self,
        trigger: RevalidationTrigger,
        timeline: &FetchTimeline,
        now_ms: i64,
    ) -> RevalidationDecision {
        if !trigger.is_background() {
            return RevalidationDecision::Fetch;
        }
        if timeline.in_flight {
            return RevalidationDecision::SkipInFlight;
        }
        match timeline.last_completed_ms {
            Some(last) if now_ms.saturating_sub(last) < self.dedupe_interval_ms as i64 => {
                RevalidationDecision::SkipDeduped
            }
            _ => RevalidationDecision::Fetch,
        }
    }
}
