use chrono::{DateTime, Duration, Utc};

/// How long a just-answered card stays out of the draw while it is kept in session.
pub const SESSION_WINDOW_MINUTES: i64 = 30;

/// How far in the past freshly bootstrapped or recovered cards are placed.
pub const RECOVERY_OFFSET_MINUTES: i64 = 60;

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
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

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// Visible due date for a card that stays in play after being answered.
#[must_use]
pub fn session_window_end(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::minutes(SESSION_WINDOW_MINUTES)
}

/// Timestamp used to make cards immediately due.
#[must_use]
pub fn recovery_due_at(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::minutes(RECOVERY_OFFSET_MINUTES)
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

//
// ─── SERDE HELPERS ─────────────────────────────────────────────────────────────
//

/// Epoch-millisecond encoding where "never" is written as `0`.
pub mod millis_or_zero {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.map_or(0, |t| t.timestamp_millis()))
    }

    /// # Errors
    ///
    /// Returns an error if the value is not an integer or is out of range.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let millis = i64::deserialize(deserializer)?;
        if millis <= 0 {
            return Ok(None);
        }
        DateTime::<Utc>::from_timestamp_millis(millis)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {millis}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let mut clock = fixed_clock();
        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), fixed_now() + Duration::minutes(5));
    }

    #[test]
    fn default_clock_ignores_advance() {
        let mut clock = Clock::default();
        let before = clock.now();
        clock.advance(Duration::days(3));
        assert!(clock.now() - before < Duration::days(1));
    }

    #[test]
    fn window_is_ahead_and_recovery_is_behind() {
        let now = fixed_now();
        assert!(session_window_end(now) > now);
        assert!(recovery_due_at(now) < now);
    }
}
