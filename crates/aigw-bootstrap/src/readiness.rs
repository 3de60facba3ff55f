//! Bounded readiness polling for the model-serving dependency.
//!
//! A plain counted retry loop with a fixed interval. Probe errors and "not
//! ready yet" are the same thing; only exhausting the attempt budget is
//! terminal. Readiness is monotonic within a run and recomputed from scratch
//! on every run.

use std::time::Duration;

/// Per-dependency readiness lifecycle. `Ready` never reverts within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    Unknown,
    Polling,
    Ready { attempts: u32 },
    TimedOut { attempts: u32 },
}

impl ReadinessState {
    pub fn label(&self) -> &'static str {
        match self {
            ReadinessState::Unknown => "unknown",
            ReadinessState::Polling => "polling",
            ReadinessState::Ready { .. } => "ready",
            ReadinessState::TimedOut { .. } => "timed-out",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ReadinessState::Ready { .. })
    }
}

/// Poll schedule. Always bounded; the constructors clamp operator overrides so
/// an unbounded loop cannot be configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPlan {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPlan {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_attempts: 30,
        }
    }
}

impl PollPlan {
    pub const MIN_INTERVAL_SECS: u64 = 1;
    pub const MAX_INTERVAL_SECS: u64 = 30;
    pub const MIN_ATTEMPTS: u32 = 1;
    pub const MAX_ATTEMPTS: u32 = 120;

    /// Builds a plan from operator-supplied values, clamped into bounds.
    pub fn bounded(interval_secs: u64, max_attempts: u32) -> Self {
        Self {
            interval: Duration::from_secs(
                interval_secs.clamp(Self::MIN_INTERVAL_SECS, Self::MAX_INTERVAL_SECS),
            ),
            max_attempts: max_attempts.clamp(Self::MIN_ATTEMPTS, Self::MAX_ATTEMPTS),
        }
    }
}

/// Runs the probe until it succeeds or the budget is spent. Stops immediately
/// on the first success (the probe itself validates full API availability) and
/// never sleeps after the final attempt.
pub fn poll_until_ready(
    mut probe: impl FnMut() -> bool,
    plan: PollPlan,
    mut sleeper: impl FnMut(Duration),
) -> ReadinessState {
    for attempt in 1..=plan.max_attempts {
        tracing::debug!(
            attempt,
            max = plan.max_attempts,
            state = ReadinessState::Polling.label(),
            "probing dependency"
        );
        if probe() {
            return ReadinessState::Ready { attempts: attempt };
        }
        if attempt < plan.max_attempts {
            sleeper(plan.interval);
        }
    }
    ReadinessState::TimedOut {
        attempts: plan.max_attempts,
    }
}
