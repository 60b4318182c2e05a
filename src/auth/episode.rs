//! Refresh episode: the single-flight state behind the coordinator.
//!
//! At most one refresh call is in flight. The first request to fail
//! authorization becomes the episode leader; every request that fails while
//! the leader is working parks a one-shot waiter and receives the leader's
//! outcome. The check-and-set of `in_progress` and the enqueue happen under
//! one lock that is never held across an `.await`.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::error::AuthError;

/// Outcome shared with every waiter: the new access token or the refresh error.
pub type RefreshOutcome = Result<String, AuthError>;

type PendingWaiter = oneshot::Sender<RefreshOutcome>;

#[derive(Default)]
struct EpisodeState {
    in_progress: bool,
    /// Non-empty only while `in_progress`.
    waiters: Vec<PendingWaiter>,
}

/// Role handed out by [`RefreshEpisode::join`].
pub enum Ticket {
    /// This caller must perform the refresh and then call
    /// [`LeaderGuard::finish`].
    Leader(LeaderGuard),
    /// A refresh is already running; await the leader's outcome.
    Waiter(oneshot::Receiver<RefreshOutcome>),
}

/// Process-wide refresh episode, cheap to clone.
#[derive(Clone, Default)]
pub struct RefreshEpisode {
    state: Arc<Mutex<EpisodeState>>,
}

impl RefreshEpisode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically either start a new episode or enqueue behind the running one.
    pub fn join(&self) -> Ticket {
        let mut state = self.state.lock();
        if state.in_progress {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            Ticket::Waiter(rx)
        } else {
            state.in_progress = true;
            Ticket::Leader(LeaderGuard {
                episode: self.clone(),
                finished: false,
            })
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.state.lock().in_progress
    }

    /// End the episode and hand back its waiters in enqueue order.
    fn close(&self) -> Vec<PendingWaiter> {
        let mut state = self.state.lock();
        state.in_progress = false;
        std::mem::take(&mut state.waiters)
    }
}

/// Proof of episode leadership.
///
/// Dropping the guard without calling [`finish`](Self::finish), e.g. because
/// the leader's future was cancelled, ends the episode and rejects its
/// waiters with [`AuthError::RefreshAbandoned`] so nobody waits forever.
pub struct LeaderGuard {
    episode: RefreshEpisode,
    finished: bool,
}

impl LeaderGuard {
    /// Close the episode and deliver `outcome` to every waiter in enqueue
    /// order. Returns how many waiters were resolved.
    pub fn finish(mut self, outcome: &RefreshOutcome) -> usize {
        self.finished = true;
        let waiters = self.episode.close();
        let count = waiters.len();
        for waiter in waiters {
            // a waiter whose caller went away is simply skipped
            let _ = waiter.send(outcome.clone());
        }
        count
    }
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let waiters = self.episode.close();
        if !waiters.is_empty() {
            tracing::warn!(
                waiters = waiters.len(),
                "Refresh leader dropped mid-episode; rejecting waiters"
            );
        }
        for waiter in waiters {
            let _ = waiter.send(Err(AuthError::RefreshAbandoned));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_leader(ticket: Ticket) -> LeaderGuard {
        match ticket {
            Ticket::Leader(guard) => guard,
            Ticket::Waiter(_) => panic!("expected leader"),
        }
    }

    fn expect_waiter(ticket: Ticket) -> oneshot::Receiver<RefreshOutcome> {
        match ticket {
            Ticket::Waiter(rx) => rx,
            Ticket::Leader(_) => panic!("expected waiter"),
        }
    }

    #[tokio::test]
    async fn test_first_caller_leads_and_others_wait() {
        let episode = RefreshEpisode::new();
        let leader = expect_leader(episode.join());
        let w1 = expect_waiter(episode.join());
        let w2 = expect_waiter(episode.join());

        assert!(episode.is_in_progress());

        let resolved = leader.finish(&Ok("T2".to_string()));

        assert_eq!(resolved, 2);
        assert!(!episode.is_in_progress());
        assert_eq!(w1.await.unwrap(), Ok("T2".to_string()));
        assert_eq!(w2.await.unwrap(), Ok("T2".to_string()));
    }

    #[tokio::test]
    async fn test_failure_is_fanned_out() {
        let episode = RefreshEpisode::new();
        let leader = expect_leader(episode.join());
        let waiter = expect_waiter(episode.join());

        leader.finish(&Err(AuthError::refresh_failed("revoked")));

        assert_eq!(
            waiter.await.unwrap(),
            Err(AuthError::refresh_failed("revoked"))
        );
    }

    #[tokio::test]
    async fn test_new_episode_after_resolution() {
        let episode = RefreshEpisode::new();
        expect_leader(episode.join()).finish(&Ok("T2".to_string()));

        // no memory beyond its own lifetime
        let _second = expect_leader(episode.join());
        assert!(episode.is_in_progress());
    }

    #[tokio::test]
    async fn test_dropped_leader_rejects_waiters() {
        let episode = RefreshEpisode::new();
        let leader = expect_leader(episode.join());
        let waiter = expect_waiter(episode.join());

        drop(leader);

        assert!(!episode.is_in_progress());
        assert_eq!(waiter.await.unwrap(), Err(AuthError::RefreshAbandoned));
    }

    #[tokio::test]
    async fn test_waiter_gone_does_not_block_others() {
        let episode = RefreshEpisode::new();
        let leader = expect_leader(episode.join());
        drop(expect_waiter(episode.join()));
        let kept = expect_waiter(episode.join());

        assert_eq!(leader.finish(&Ok("T".to_string())), 2);
        assert_eq!(kept.await.unwrap(), Ok("T".to_string()));
    }
}
