use chrono::{DateTime, SubsecRound, Utc};

/// Fractional-second digits kept by the ledger (`TIMESTAMPTZ` is microseconds).
pub const LEDGER_PRECISION: u16 = 6;

/// Source of the current time.
///
/// Injected so that due dates and deadline timers can be driven
/// deterministically in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// `now` truncated to the precision the ledger stores.
    ///
    /// Timestamps that are persisted and later compared by equality, such as
    /// the due date armed on the overdue scheduler, must come from here so that
    /// the armed value and the stored value are the same instant.
    fn ledger_now(&self) -> DateTime<Utc> {
        self.now().trunc_subsecs(LEDGER_PRECISION)
    }
}

/// Wall-clock time at microsecond precision.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(LEDGER_PRECISION)
    }
}
