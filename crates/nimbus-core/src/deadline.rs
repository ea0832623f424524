//! Cancellation derived from the platform execution deadline.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Default safety margin subtracted from the platform deadline.
pub const DEFAULT_DEADLINE_BUFFER: Duration = Duration::from_secs(3);

/// Derives a cooperative cancellation signal from the platform-reported
/// deadline for each invocation.
///
/// The signal fires at `deadline - buffer` so user code has a window to
/// finish or abort cleanly before the platform enforces the hard timeout.
#[derive(Debug, Clone)]
pub struct DeadlineProvider {
    buffer: Duration,
}

impl DeadlineProvider {
    /// Create a provider with the given safety buffer.
    pub fn new(buffer: Duration) -> Self {
        Self { buffer }
    }

    /// The configured safety buffer.
    pub fn buffer(&self) -> Duration {
        self.buffer
    }

    /// Arm a deadline token for one invocation.
    ///
    /// The token cancels at `deadline - buffer`, or immediately if that
    /// instant has already passed. `None` yields an unbounded token that
    /// never fires (local/test invocations without a platform deadline).
    pub fn acquire(&self, deadline: Option<Instant>) -> DeadlineToken {
        match deadline {
            Some(deadline) => DeadlineToken::arm(deadline, self.buffer),
            None => DeadlineToken::unbounded(),
        }
    }
}

impl Default for DeadlineProvider {
    fn default() -> Self {
        Self::new(DEFAULT_DEADLINE_BUFFER)
    }
}

/// One-shot cancellation signal for a single invocation.
///
/// Cancellation is advisory: handlers and middleware observe it through
/// [`DeadlineToken::cancellation`] clones; nothing preempts user code that
/// ignores it. Dropping the token releases the backing timer, so completing
/// an invocation never leaks a timer into the host process.
#[derive(Debug)]
pub struct DeadlineToken {
    token: CancellationToken,
    fires_at: Option<Instant>,
    timer: Option<JoinHandle<()>>,
}

impl DeadlineToken {
    fn arm(deadline: Instant, buffer: Duration) -> Self {
        let token = CancellationToken::new();
        let fires_at = deadline.checked_sub(buffer).unwrap_or_else(Instant::now);

        if fires_at <= Instant::now() {
            token.cancel();
            return Self {
                token,
                fires_at: Some(fires_at),
                timer: None,
            };
        }

        let timer_token = token.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(fires_at).await;
            timer_token.cancel();
        });

        Self {
            token,
            fires_at: Some(fires_at),
            timer: Some(timer),
        }
    }

    fn unbounded() -> Self {
        Self {
            token: CancellationToken::new(),
            fires_at: None,
            timer: None,
        }
    }

    /// Clone of the underlying cancellation signal for handler code.
    pub fn cancellation(&self) -> CancellationToken {
        self.token.clone()
    }

    /// The instant at which this token fires, if bounded.
    pub fn fires_at(&self) -> Option<Instant> {
        self.fires_at
    }

    /// Whether the signal has already fired.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for DeadlineToken {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_at_deadline_minus_buffer() {
        let provider = DeadlineProvider::new(Duration::from_secs(3));
        let deadline = Instant::now() + Duration::from_secs(10);
        let token = provider.acquire(Some(deadline));

        tokio::time::sleep(Duration::from_millis(6_900)).await;
        assert!(!token.is_cancelled());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_past_deadline_cancels_immediately() {
        let provider = DeadlineProvider::new(Duration::from_secs(3));
        let deadline = Instant::now() + Duration::from_secs(1);

        // Buffer exceeds remaining time: cancelled before any sleep.
        let token = provider.acquire(Some(deadline));
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_timer() {
        let provider = DeadlineProvider::default();
        let deadline = Instant::now() + Duration::from_secs(30);
        let token = provider.acquire(Some(deadline));
        let signal = token.cancellation();
        drop(token);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_unbounded_token_never_fires() {
        let provider = DeadlineProvider::default();
        let token = provider.acquire(None);

        assert!(token.fires_at().is_none());
        assert!(!token.is_cancelled());
    }
}
