use chrono::{DateTime, Utc};

/// Time source for services, fixed in tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }
}

/// Deterministic timestamp for tests (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` pinned to [`fixed_now`].
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

//
// ─── COUNTDOWN ────────────────────────────────────────────────────────────────
//

/// Whole-second countdown for a timed attempt.
///
/// Remaining time saturates at zero; callers decide what expiry means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    total_seconds: u32,
    remaining_seconds: u32,
}

impl Countdown {
    #[must_use]
    pub fn from_minutes(minutes: u32) -> Self {
        Self::from_seconds(minutes.saturating_mul(60))
    }

    #[must_use]
    pub fn from_seconds(seconds: u32) -> Self {
        Self {
            total_seconds: seconds,
            remaining_seconds: seconds,
        }
    }

    /// Advance by one second and return what is left.
    pub fn tick(&mut self) -> u32 {
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        self.remaining_seconds
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    #[must_use]
    pub fn total_seconds(&self) -> u32 {
        self.total_seconds
    }

    /// Seconds already used, never more than the total.
    #[must_use]
    pub fn elapsed_seconds(&self) -> u32 {
        self.total_seconds - self.remaining_seconds
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining_seconds == 0
    }

    /// `MM:SS`, minutes not wrapped at the hour.
    #[must_use]
    pub fn display(&self) -> String {
        let minutes = self.remaining_seconds / 60;
        let seconds = self.remaining_seconds % 60;
        format!("{minutes:02}:{seconds:02}")
    }
}
