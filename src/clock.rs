use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

/// Source of "now" for quote timestamps, swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Interpret a zone-less provider timestamp. Providers report local
    /// market-close times without an offset; the system clock reads them as
    /// local time.
    fn resolve_naive(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        naive.and_utc()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn resolve_naive(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| naive.and_utc())
    }
}

/// Clock pinned to a single instant; zone-less times are taken as UTC.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}
