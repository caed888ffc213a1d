//! Reconnection backoff for the realtime socket.

use std::time::Duration;

pub const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

/// Delays to wait before each reconnect attempt of one episode.
///
/// Doubles from one second up to the cap and ends after
/// [`MAX_RETRY_ATTEMPTS`] items.
#[derive(Debug, Clone)]
pub struct Backoff {
    attempts: u32,
    next: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            attempts: 0,
            next: INITIAL_RETRY_DELAY,
        }
    }
}

impl Backoff {
    /// Attempts handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.attempts >= MAX_RETRY_ATTEMPTS {
            return None;
        }
        self.attempts += 1;
        let delay = self.next;
        self.next = (delay * 2).min(MAX_RETRY_DELAY);
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_up_to_the_cap_then_stop() {
        let mut backoff = Backoff::default();
        let delays: Vec<u64> = backoff.by_ref().map(|d| d.as_secs()).collect();

        assert_eq!(delays.len(), MAX_RETRY_ATTEMPTS as usize);
        assert_eq!(&delays[..6], &[1, 2, 4, 8, 16, 30]);
        assert!(delays.iter().all(|d| *d <= MAX_RETRY_DELAY.as_secs()));
        assert_eq!(backoff.attempts(), MAX_RETRY_ATTEMPTS);
        assert_eq!(backoff.next(), None);
    }
}
