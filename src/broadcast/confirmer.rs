// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Broadcast Confirmer
//!
//! Submits a signed transaction and polls for its inclusion.
//!
//! ## Strategy
//!
//! 1. Broadcast once. No hash or a non-zero CheckTx code ends in
//!    `SubmissionRejected`; submission is never retried. A transport error
//!    is inconclusive: when the hash is known locally the tx is polled like
//!    an accepted one, otherwise it is reported as rejected.
//! 2. Up to `max_attempts` times: sleep `poll_interval`, then query by hash.
//!    Included with code 0 is success, included with any other code is
//!    failure, anything else stays pending. Query errors are logged and
//!    still count as an attempt.
//! 3. When attempts run out, or the cancellation token fires, the outcome is
//!    `TimedOut`. The transaction itself is never retracted.
//!
//! Uses `tokio_util::sync::CancellationToken` for shutdown, following the
//! same pattern as the background pollers.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::outcome::{classify_poll, classify_submission, BroadcastOutcome, PollVerdict};
use super::types::ChainClient;

/// Default number of status queries before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// Default delay before each status query.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Bounded-retry policy for confirmation polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmPolicy {
    pub max_attempts: u32,
    pub poll_interval: Duration,
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ConfirmPolicy {
    /// Wall-clock budget spent sleeping between queries.
    pub fn budget(&self) -> Duration {
        self.poll_interval.saturating_mul(self.max_attempts)
    }
}

/// Broadcasts transactions through a [`ChainClient`] and waits for a verdict.
pub struct BroadcastConfirmer<C> {
    client: C,
    policy: ConfirmPolicy,
}

impl<C: ChainClient> BroadcastConfirmer<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            policy: ConfirmPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ConfirmPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn policy(&self) -> ConfirmPolicy {
        self.policy
    }

    /// Broadcast and wait for a terminal outcome.
    pub async fn broadcast_and_confirm(&self, tx: &C::SignedTx) -> BroadcastOutcome {
        self.broadcast_and_confirm_until(tx, &CancellationToken::new(), |_| {})
            .await
    }

    /// Broadcast and wait, stopping early when `shutdown` is cancelled.
    ///
    /// `observe` sees every pending step and the terminal outcome.
    pub async fn broadcast_and_confirm_until<F>(
        &self,
        tx: &C::SignedTx,
        shutdown: &CancellationToken,
        mut observe: F,
    ) -> BroadcastOutcome
    where
        F: FnMut(&BroadcastOutcome) + Send,
    {
        let response = match self.client.broadcast(tx).await {
            Ok(response) => response,
            Err(e) => {
                // The node may still have the tx; keep tracking it by its own hash.
                if let Some(tx_hash) = C::local_tx_hash(tx) {
                    warn!(
                        tx_hash = %tx_hash,
                        error = %e,
                        "Broadcast submission inconclusive, polling by local hash"
                    );
                    return self.confirm(&tx_hash, shutdown, observe).await;
                }
                warn!(error = %e, "Broadcast submission failed");
                let outcome = BroadcastOutcome::SubmissionRejected {
                    tx_hash: None,
                    code: None,
                    raw_log: Some(e.to_string()),
                };
                observe(&outcome);
                return outcome;
            }
        };

        let tx_hash = match classify_submission(&response) {
            Ok(hash) => hash,
            Err(outcome) => {
                warn!(
                    tx_hash = ?outcome.tx_hash(),
                    code = response.code,
                    raw_log = ?response.raw_log,
                    "Broadcast rejected at submission"
                );
                observe(&outcome);
                return outcome;
            }
        };

        info!(tx_hash = %tx_hash, "Broadcast accepted, waiting for inclusion");
        self.confirm(&tx_hash, shutdown, observe).await
    }

    /// Poll an already-broadcast transaction until it reaches a verdict.
    pub async fn confirm<F>(
        &self,
        tx_hash: &str,
        shutdown: &CancellationToken,
        mut observe: F,
    ) -> BroadcastOutcome
    where
        F: FnMut(&BroadcastOutcome) + Send,
    {
        let max_attempts = self.policy.max_attempts;
        observe(&BroadcastOutcome::Pending {
            tx_hash: tx_hash.to_string(),
            attempts: 0,
        });

        for attempt in 1..=max_attempts {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    return self.stop_observing(tx_hash, attempt - 1, &mut observe);
                }
                _ = tokio::time::sleep(self.policy.poll_interval) => {}
            }

            let queried = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    return self.stop_observing(tx_hash, attempt - 1, &mut observe);
                }
                queried = self.client.tx_info(tx_hash) => queried,
            };

            match queried {
                Ok(status) => match classify_poll(status.as_ref()) {
                    PollVerdict::Success { height } => {
                        info!(tx_hash = %tx_hash, height, attempt, "Transaction included successfully");
                        let outcome = BroadcastOutcome::ConfirmedSuccess {
                            tx_hash: tx_hash.to_string(),
                            height,
                        };
                        observe(&outcome);
                        return outcome;
                    }
                    PollVerdict::Failure {
                        height,
                        code,
                        raw_log,
                    } => {
                        warn!(
                            tx_hash = %tx_hash,
                            height,
                            code,
                            raw_log = ?raw_log,
                            "Transaction included with failure code"
                        );
                        let outcome = BroadcastOutcome::ConfirmedFailure {
                            tx_hash: tx_hash.to_string(),
                            height,
                            code,
                            raw_log,
                        };
                        observe(&outcome);
                        return outcome;
                    }
                    PollVerdict::Pending => {
                        info!(tx_hash = %tx_hash, attempt, max_attempts, "Transaction pending");
                    }
                },
                Err(e) => {
                    warn!(
                        tx_hash = %tx_hash,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Status query failed, will retry"
                    );
                }
            }

            observe(&BroadcastOutcome::Pending {
                tx_hash: tx_hash.to_string(),
                attempts: attempt,
            });
        }

        warn!(
            tx_hash = %tx_hash,
            attempts = max_attempts,
            budget_secs = self.policy.budget().as_secs(),
            "Timed out waiting for inclusion; check later by hash"
        );
        let outcome = BroadcastOutcome::TimedOut {
            tx_hash: tx_hash.to_string(),
            attempts: max_attempts,
        };
        observe(&outcome);
        outcome
    }

    fn stop_observing<F>(&self, tx_hash: &str, attempts: u32, observe: &mut F) -> BroadcastOutcome
    where
        F: FnMut(&BroadcastOutcome),
    {
        info!(tx_hash = %tx_hash, attempts, "Confirmation cancelled; transaction stays broadcast");
        let outcome = BroadcastOutcome::TimedOut {
            tx_hash: tx_hash.to_string(),
            attempts,
        };
        observe(&outcome);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::types::{BroadcastResponse, ChainClientError, TxInfo};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct ScriptedChain {
        submission: Result<BroadcastResponse, ChainClientError>,
        polls: Mutex<VecDeque<Result<Option<TxInfo>, ChainClientError>>>,
        broadcasts: AtomicU32,
        queries: AtomicU32,
    }

    impl ScriptedChain {
        fn accepting(polls: Vec<Result<Option<TxInfo>, ChainClientError>>) -> Self {
            Self::new(
                Ok(BroadcastResponse {
                    txhash: Some("HASH".to_string()),
                    code: 0,
                    raw_log: None,
                }),
                polls,
            )
        }

        fn new(
            submission: Result<BroadcastResponse, ChainClientError>,
            polls: Vec<Result<Option<TxInfo>, ChainClientError>>,
        ) -> Self {
            Self {
                submission,
                polls: Mutex::new(polls.into()),
                broadcasts: AtomicU32::new(0),
                queries: AtomicU32::new(0),
            }
        }
    }

    impl ChainClient for ScriptedChain {
        type SignedTx = Vec<u8>;

        fn local_tx_hash(tx: &Vec<u8>) -> Option<String> {
            String::from_utf8(tx.clone()).ok().filter(|hash| !hash.is_empty())
        }

        async fn broadcast(&self, _tx: &Vec<u8>) -> Result<BroadcastResponse, ChainClientError> {
            self.broadcasts.fetch_add(1, Ordering::SeqCst);
            self.submission.clone()
        }

        async fn tx_info(&self, _tx_hash: &str) -> Result<Option<TxInfo>, ChainClientError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.polls.lock().unwrap().pop_front().unwrap_or(Ok(None))
        }
    }

    fn included(height: u64, code: u32) -> Result<Option<TxInfo>, ChainClientError> {
        Ok(Some(TxInfo {
            height,
            code,
            raw_log: (code != 0).then(|| "out of gas".to_string()),
        }))
    }

    fn fast(max_attempts: u32) -> ConfirmPolicy {
        ConfirmPolicy {
            max_attempts,
            poll_interval: Duration::ZERO,
        }
    }

    #[test]
    fn default_policy_matches_one_minute_budget() {
        let policy = ConfirmPolicy::default();
        assert_eq!(policy.max_attempts, 20);
        assert_eq!(policy.budget(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn missing_hash_is_rejected_without_polling() {
        let chain = ScriptedChain::new(
            Ok(BroadcastResponse {
                txhash: None,
                code: 2,
                raw_log: Some("tx parse error".to_string()),
            }),
            vec![],
        );
        let confirmer = BroadcastConfirmer::new(chain).with_policy(fast(20));

        let outcome = confirmer.broadcast_and_confirm(&vec![1, 2, 3]).await;
        assert_eq!(
            outcome,
            BroadcastOutcome::SubmissionRejected {
                tx_hash: None,
                code: Some(2),
                raw_log: Some("tx parse error".to_string()),
            }
        );
        assert_eq!(confirmer.client().queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transport_failure_keeps_polling_by_local_hash() {
        let timed_out = || Err(ChainClientError::Transport("operation timed out".to_string()));

        let chain = ScriptedChain::new(timed_out(), vec![Ok(None), included(88, 0)]);
        let confirmer = BroadcastConfirmer::new(chain).with_policy(fast(20));
        let outcome = confirmer.broadcast_and_confirm(&b"LOCALHASH".to_vec()).await;
        assert_eq!(
            outcome,
            BroadcastOutcome::ConfirmedSuccess {
                tx_hash: "LOCALHASH".to_string(),
                height: 88,
            }
        );
        assert_eq!(confirmer.client().queries.load(Ordering::SeqCst), 2);

        let chain = ScriptedChain::new(timed_out(), vec![]);
        let confirmer = BroadcastConfirmer::new(chain).with_policy(fast(2));
        let outcome = confirmer.broadcast_and_confirm(&b"LOCALHASH".to_vec()).await;
        assert_eq!(outcome.tx_hash(), Some("LOCALHASH"));
        assert_eq!(outcome.state_name(), "timed-out");
        assert_eq!(confirmer.client().broadcasts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transport_failure_without_local_hash_is_rejection() {
        let chain = ScriptedChain::new(
            Err(ChainClientError::Transport("connection refused".to_string())),
            vec![],
        );
        let confirmer = BroadcastConfirmer::new(chain).with_policy(fast(20));

        let outcome = confirmer.broadcast_and_confirm(&vec![]).await;
        assert_eq!(outcome.state_name(), "submission-rejected");
        assert!(outcome.raw_log().unwrap().contains("connection refused"));
        assert_eq!(confirmer.client().broadcasts.load(Ordering::SeqCst), 1);
        assert_eq!(confirmer.client().queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn success_on_third_poll_stops_immediately() {
        let chain = ScriptedChain::accepting(vec![Ok(None), included(0, 0), included(1234, 0)]);
        let confirmer = BroadcastConfirmer::new(chain).with_policy(fast(20));

        let outcome = confirmer.broadcast_and_confirm(&vec![]).await;
        assert_eq!(
            outcome,
            BroadcastOutcome::ConfirmedSuccess {
                tx_hash: "HASH".to_string(),
                height: 1234,
            }
        );
        assert_eq!(confirmer.client().queries.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_zero_code_is_failure_never_success() {
        let chain = ScriptedChain::accepting(vec![included(77, 11)]);
        let confirmer = BroadcastConfirmer::new(chain).with_policy(fast(20));

        let outcome = confirmer.broadcast_and_confirm(&vec![]).await;
        assert!(!outcome.is_success());
        assert_eq!(
            outcome,
            BroadcastOutcome::ConfirmedFailure {
                tx_hash: "HASH".to_string(),
                height: 77,
                code: 11,
                raw_log: Some("out of gas".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn stops_after_exactly_max_attempts() {
        let chain = ScriptedChain::accepting(vec![]);
        let confirmer = BroadcastConfirmer::new(chain).with_policy(fast(5));

        let outcome = confirmer.broadcast_and_confirm(&vec![]).await;
        assert_eq!(
            outcome,
            BroadcastOutcome::TimedOut {
                tx_hash: "HASH".to_string(),
                attempts: 5,
            }
        );
        assert_eq!(confirmer.client().queries.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn query_errors_are_transient_and_counted() {
        let transient = || Err(ChainClientError::Transport("timeout".to_string()));
        let chain = ScriptedChain::accepting(vec![transient(), transient(), included(9, 0)]);
        let confirmer = BroadcastConfirmer::new(chain).with_policy(fast(20));

        let outcome = confirmer.broadcast_and_confirm(&vec![]).await;
        assert!(outcome.is_success());
        assert_eq!(confirmer.client().queries.load(Ordering::SeqCst), 3);

        let chain = ScriptedChain::accepting(vec![transient(), transient()]);
        let confirmer = BroadcastConfirmer::new(chain).with_policy(fast(2));
        let outcome = confirmer.broadcast_and_confirm(&vec![]).await;
        assert_eq!(outcome.state_name(), "timed-out");
        assert_eq!(confirmer.client().queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancellation_reports_timed_out_without_verdict() {
        let chain = ScriptedChain::accepting(vec![included(5, 0)]);
        let confirmer = BroadcastConfirmer::new(chain).with_policy(fast(20));
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let outcome = confirmer
            .broadcast_and_confirm_until(&vec![], &shutdown, |_| {})
            .await;
        assert_eq!(
            outcome,
            BroadcastOutcome::TimedOut {
                tx_hash: "HASH".to_string(),
                attempts: 0,
            }
        );
        assert_eq!(confirmer.client().broadcasts.load(Ordering::SeqCst), 1);
        assert_eq!(confirmer.client().queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_during_sleep_interrupts_wait() {
        let chain = ScriptedChain::accepting(vec![]);
        let confirmer = BroadcastConfirmer::new(chain).with_policy(ConfirmPolicy {
            max_attempts: 3,
            poll_interval: Duration::from_secs(3600),
        });
        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let outcome = confirmer
            .broadcast_and_confirm_until(&vec![], &shutdown, |_| {})
            .await;
        assert_eq!(outcome.state_name(), "timed-out");
        assert_eq!(confirmer.client().queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn observer_sees_pending_steps_then_verdict() {
        let chain = ScriptedChain::accepting(vec![Ok(None), included(3, 0)]);
        let confirmer = BroadcastConfirmer::new(chain).with_policy(fast(20));
        let mut seen = Vec::new();

        confirmer
            .broadcast_and_confirm_until(&vec![], &CancellationToken::new(), |o| {
                seen.push(o.clone())
            })
            .await;

        let states: Vec<_> = seen.iter().map(|o| o.state_name()).collect();
        assert_eq!(states, vec!["pending", "pending", "confirmed-success"]);
        assert_eq!(
            seen[1],
            BroadcastOutcome::Pending {
                tx_hash: "HASH".to_string(),
                attempts: 1,
            }
        );
    }
}
