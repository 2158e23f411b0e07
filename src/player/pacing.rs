use std::time::Duration;

/// Time left to sleep once a frame took `elapsed` out of `interval`.
/// A late frame gets no sleep and no catch-up credit.
pub fn remaining_budget(elapsed: Duration, interval: Duration) -> Option<Duration> {
    interval.checked_sub(elapsed).filter(|left| !left.is_zero())
}
