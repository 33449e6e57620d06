//! Two-way race between cancellable waiters
//!
//! Each waiter runs as its own tokio task with its own
//! [`CancellationToken`]. The first to finish wins; the other is cancelled
//! and awaited before [`race`] returns, so no waiter is still running when
//! the caller acts on the outcome. A loser that had already finished before
//! it observed cancellation is reported too.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::hardware::HardwareError;

/// How a waiter ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The awaited event happened
    Finished,
    /// The waiter saw its token cancelled and gave up
    Cancelled,
}

/// Which waiters finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceOutcome {
    pub first: bool,
    pub second: bool,
}

/// Errors that can occur while racing
#[derive(Debug, thiserror::Error)]
pub enum RaceError {
    #[error("waiter failed: {0}")]
    Waiter(#[from] HardwareError),

    #[error("waiter task panicked or was aborted: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("no waiter finished")]
    NoWinner,
}

type WaiterResult = Result<Completion, HardwareError>;

/// Run `first` and `second` concurrently until one finishes
///
/// Each closure receives the token it must watch at every poll boundary.
/// Dropping the returned future cancels both waiters.
pub async fn race<A, FA, B, FB>(first: A, second: B) -> Result<RaceOutcome, RaceError>
where
    A: FnOnce(CancellationToken) -> FA,
    FA: Future<Output = WaiterResult> + Send + 'static,
    B: FnOnce(CancellationToken) -> FB,
    FB: Future<Output = WaiterResult> + Send + 'static,
{
    let scope = CancellationToken::new();
    let _guard = scope.clone().drop_guard();

    let first_token = scope.child_token();
    let second_token = scope.child_token();
    let mut first_task = tokio::spawn(first(first_token.clone()));
    let mut second_task = tokio::spawn(second(second_token.clone()));

    let (first_result, second_result) = tokio::select! {
        result = &mut first_task => {
            debug!("first waiter resolved, cancelling second");
            second_token.cancel();
            (result, second_task.await)
        }
        result = &mut second_task => {
            debug!("second waiter resolved, cancelling first");
            first_token.cancel();
            (first_task.await, result)
        }
    };

    let outcome = RaceOutcome {
        first: first_result?? == Completion::Finished,
        second: second_result?? == Completion::Finished,
    };

    if !outcome.first && !outcome.second {
        return Err(RaceError::NoWinner);
    }
    Ok(outcome)
}

/// Sleep for `period` unless `token` is cancelled first
///
/// Returns `false` on cancellation. Waiters call this between polls.
pub async fn pause(token: &CancellationToken, period: std::time::Duration) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(period) => true,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use tokio_test::{assert_err, assert_ok};

    use super::*;

    /// Finishes after `ticks` pauses of 10ms
    async fn ticker(
        token: CancellationToken,
        ticks: usize,
        seen: Arc<AtomicUsize>,
    ) -> WaiterResult {
        for _ in 0..ticks {
            if !pause(&token, Duration::from_millis(10)).await {
                return Ok(Completion::Cancelled);
            }
            seen.fetch_add(1, Ordering::SeqCst);
        }
        Ok(Completion::Finished)
    }

    #[tokio::test(start_paused = true)]
    async fn test_faster_waiter_wins() {
        let slow_ticks = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&slow_ticks);

        let outcome = race(
            |t| ticker(t, 2, Arc::new(AtomicUsize::new(0))),
            move |t| ticker(t, 100, seen),
        )
        .await;

        let outcome = assert_ok!(outcome);
        assert_eq!(outcome, RaceOutcome { first: true, second: false });

        // The loser never ticks again after the race resolved.
        let frozen = slow_ticks.load(Ordering::SeqCst);
        assert!(frozen <= 2);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(slow_ticks.load(Ordering::SeqCst), frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_waiter_can_win() {
        let outcome = race(
            |t| ticker(t, 50, Arc::new(AtomicUsize::new(0))),
            |t| ticker(t, 1, Arc::new(AtomicUsize::new(0))),
        )
        .await;

        assert_eq!(assert_ok!(outcome), RaceOutcome { first: false, second: true });
    }

    #[tokio::test(start_paused = true)]
    async fn test_simultaneous_finish_reports_both() {
        let outcome = race(
            |_t| async { Ok::<_, HardwareError>(Completion::Finished) },
            |_t| async { Ok::<_, HardwareError>(Completion::Finished) },
        )
        .await;

        assert_eq!(assert_ok!(outcome), RaceOutcome { first: true, second: true });
    }

    #[tokio::test(start_paused = true)]
    async fn test_loser_cancelled_before_race_returns() {
        let cancelled = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&cancelled);

        race(
            |_t| async { Ok::<_, HardwareError>(Completion::Finished) },
            move |t: CancellationToken| async move {
                t.cancelled().await;
                flag.fetch_add(1, Ordering::SeqCst);
                Ok::<_, HardwareError>(Completion::Cancelled)
            },
        )
        .await
        .unwrap();

        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_error_propagates() {
        let outcome = race(
            |_t| async { Err::<Completion, _>(HardwareError::Disconnected("reader".to_string())) },
            |t| ticker(t, 100, Arc::new(AtomicUsize::new(0))),
        )
        .await;

        assert!(matches!(assert_err!(outcome), RaceError::Waiter(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_race_cancels_waiters() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let first = Arc::clone(&ticks);
        let second = Arc::clone(&ticks);

        let racing = race(move |t| ticker(t, 1000, first), move |t| ticker(t, 1000, second));
        let timed_out = tokio::time::timeout(Duration::from_millis(55), racing).await;
        assert!(timed_out.is_err());

        tokio::task::yield_now().await;
        let frozen = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), frozen);
    }
}
