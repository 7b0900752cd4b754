//! Waiting for the clearnode's indexer to observe a deposit.
//!
//! The clearnode is polled at a fixed interval until the home channel
//! reaches the expected state or the deadline passes. Dropping the returned
//! future cancels the wait together with the in-flight poll.
use std::time::Duration;

use primitives::{Address, Config, DepositResult, HomeChannel};
use slog::{debug, warn, Logger};
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::{
    clearnode::ChannelStateStore,
    error::{DepositError, LastSeen},
};

/// [`interval`] panics on a zero period.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceOptions {
    /// The overall deadline of the wait
    pub timeout: Duration,
    /// Raised to 1ms when shorter
    pub poll_interval: Duration,
}

impl From<&Config> for ConvergenceOptions {
    fn from(config: &Config) -> Self {
        Self {
            timeout: config.convergence_timeout(),
            poll_interval: config.poll_interval(),
        }
    }
}

/// Waits until the clearnode reports an **open** home channel for the `owner` and `asset`.
///
/// - Not indexed (yet), pending channels and transient clearnode failures are retried.
/// - A misconfigured asset fails right away with [`DepositError::Clearnode`].
/// - Fails with [`DepositError::ConvergenceTimeout`] once `options.timeout` elapses.
pub async fn await_home_channel<S: ChannelStateStore + ?Sized>(
    store: &S,
    owner: Address,
    asset: &str,
    options: ConvergenceOptions,
    logger: &Logger,
) -> Result<HomeChannel, DepositError> {
    poll_until(store, owner, asset, options, logger, HomeChannel::is_open).await
}

/// Waits until the home channel is open and reflects the state submitted by `deposit`.
///
/// Unlike [`await_home_channel`] this does not return the pre-checkpoint
/// record of an already open channel.
pub async fn await_deposit<S: ChannelStateStore + ?Sized>(
    store: &S,
    owner: Address,
    asset: &str,
    deposit: &DepositResult,
    options: ConvergenceOptions,
    logger: &Logger,
) -> Result<HomeChannel, DepositError> {
    poll_until(store, owner, asset, options, logger, |channel| {
        channel.is_open()
            && channel.channel_id == deposit.channel_id
            && channel.version >= deposit.state_version
    })
    .await
}

async fn poll_until<S, P>(
    store: &S,
    owner: Address,
    asset: &str,
    options: ConvergenceOptions,
    logger: &Logger,
    converged: P,
) -> Result<HomeChannel, DepositError>
where
    S: ChannelStateStore + ?Sized,
    P: Fn(&HomeChannel) -> bool,
{
    let mut last_seen = LastSeen::Nothing;
    let mut ticker = interval(options.poll_interval.max(MIN_POLL_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let polling = async {
        loop {
            // the first tick completes immediately
            ticker.tick().await;

            match store.home_channel(owner, asset).await {
                Ok(Some(channel)) if converged(&channel) => return Ok(channel),
                Ok(Some(channel)) => {
                    debug!(logger, "Home channel not converged yet"; "module" => "convergence", "channel_id" => %channel.channel_id, "status" => %channel.status, "version" => channel.version);

                    last_seen = LastSeen::Channel(Box::new(channel));
                }
                Ok(None) => {
                    debug!(logger, "Home channel not indexed yet"; "module" => "convergence", "owner" => %owner, "asset" => asset);

                    last_seen = LastSeen::NotIndexed;
                }
                Err(err) if err.is_transient() => {
                    warn!(logger, "Polling the home channel failed, retrying"; "module" => "convergence", "error" => %err);

                    last_seen = LastSeen::Error(err.to_string());
                }
                Err(err) => return Err(DepositError::Clearnode(err)),
            }
        }
    };

    let outcome = timeout(options.timeout, polling).await;

    match outcome {
        Ok(result) => result,
        Err(_elapsed) => {
            warn!(logger, "Home channel did not converge in time"; "module" => "convergence", "owner" => %owner, "asset" => asset, "last_seen" => %last_seen);

            Err(DepositError::ConvergenceTimeout {
                timeout: options.timeout,
                last_seen,
            })
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use primitives::{
        test_util::{discard_logger, home_channel, OWNER},
        BigNum, ChannelId, ChannelStatus, DepositMode, TransactionHash,
    };

    use super::*;
    use crate::clearnode::Error;

    #[derive(Debug, Clone, Copy)]
    enum Step {
        NotIndexed,
        Pending,
        Open { version: u64 },
        Unavailable,
        Rejected,
        Misconfigured,
    }

    /// Answers with the scripted steps in order, repeating the last one.
    struct ScriptedStore {
        steps: Mutex<Vec<Step>>,
        polls: AtomicUsize,
    }

    impl ScriptedStore {
        fn new(mut steps: Vec<Step>) -> Self {
            steps.reverse();

            Self {
                steps: Mutex::new(steps),
                polls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChannelStateStore for ScriptedStore {
        async fn home_channel(
            &self,
            _owner: Address,
            _asset: &str,
        ) -> Result<Option<HomeChannel>, Error> {
            self.polls.fetch_add(1, Ordering::SeqCst);

            let step = {
                let mut steps = self.steps.lock().unwrap();
                if steps.len() > 1 {
                    steps.pop().unwrap()
                } else {
                    steps[0]
                }
            };

            let channel = |version: u64, status: ChannelStatus| HomeChannel {
                status,
                ..home_channel(ChannelId::from([9_u8; 32]), version, BigNum::from(1_u64))
            };

            match step {
                Step::NotIndexed => Ok(None),
                Step::Pending => Ok(Some(channel(0, ChannelStatus::Pending))),
                Step::Open { version } => Ok(Some(channel(version, ChannelStatus::Open))),
                Step::Unavailable => Err(Error::Unavailable {
                    status: 503,
                    message: "indexer restarting".into(),
                }),
                Step::Rejected => Err(Error::Rejected {
                    status: 403,
                    message: "owner is blocked".into(),
                }),
                Step::Misconfigured => Err(Error::Misconfigured("MST has no token".into())),
            }
        }
    }

    fn options(timeout_ms: u64) -> ConvergenceOptions {
        ConvergenceOptions {
            timeout: Duration::from_millis(timeout_ms),
            poll_interval: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn converges_once_the_indexer_catches_up() {
        let store = ScriptedStore::new(vec![
            Step::NotIndexed,
            Step::Unavailable,
            Step::Pending,
            Step::Open { version: 0 },
        ]);

        let channel = await_home_channel(&store, *OWNER, "MST", options(5_000), &discard_logger())
            .await
            .expect("Should converge");

        assert!(channel.is_open());
        assert_eq!(4, store.polls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn times_out_with_the_last_seen_state() {
        let store = ScriptedStore::new(vec![Step::Unavailable, Step::Pending]);

        let error = await_home_channel(&store, *OWNER, "MST", options(100), &discard_logger())
            .await
            .expect_err("Should time out");

        match error {
            DepositError::ConvergenceTimeout { timeout, last_seen } => {
                assert_eq!(Duration::from_millis(100), timeout);
                assert!(
                    matches!(&last_seen, LastSeen::Channel(channel) if channel.status == ChannelStatus::Pending),
                    "unexpected last seen: {last_seen}"
                );
            }
            other => panic!("Expected a timeout, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn misconfigured_asset_fails_at_once() {
        let store = ScriptedStore::new(vec![Step::Misconfigured]);

        let error = await_home_channel(&store, *OWNER, "MST", options(5_000), &discard_logger())
            .await
            .expect_err("Should fail");

        assert!(matches!(
            error,
            DepositError::Clearnode(Error::Misconfigured(_))
        ));
        assert_eq!(1, store.polls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn rejected_request_fails_at_once() {
        let store = ScriptedStore::new(vec![Step::Rejected]);

        let error = await_home_channel(&store, *OWNER, "MST", options(5_000), &discard_logger())
            .await
            .expect_err("Should fail");

        assert!(matches!(
            error,
            DepositError::Clearnode(Error::Rejected { status: 403, .. })
        ));
        assert_eq!(1, store.polls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn zero_poll_interval_still_polls() {
        let store = ScriptedStore::new(vec![Step::NotIndexed, Step::Open { version: 0 }]);
        let options = ConvergenceOptions {
            timeout: Duration::from_millis(1_000),
            poll_interval: Duration::ZERO,
        };

        let channel = await_home_channel(&store, *OWNER, "MST", options, &discard_logger())
            .await
            .expect("Should converge");

        assert!(channel.is_open());
        assert_eq!(2, store.polls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn deposit_times_out_on_the_previous_version() {
        let store = ScriptedStore::new(vec![Step::Open { version: 0 }]);
        let deposit = DepositResult {
            transaction_hash: TransactionHash::from([1_u8; 32]),
            mode: DepositMode::Checkpoint,
            channel_id: ChannelId::from([9_u8; 32]),
            state_version: 1,
        };

        let error = await_deposit(
            &store,
            *OWNER,
            "MST",
            &deposit,
            options(100),
            &discard_logger(),
        )
        .await
        .expect_err("Version 1 is never indexed");

        match error {
            DepositError::ConvergenceTimeout {
                last_seen: LastSeen::Channel(channel),
                ..
            } => {
                assert_eq!(0, channel.version);
                assert!(channel.is_open());
            }
            other => panic!("Expected a timeout with the open channel, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn deposit_waits_for_the_checkpoint_version() {
        let store = ScriptedStore::new(vec![
            Step::Open { version: 0 },
            Step::Open { version: 0 },
            Step::Open { version: 1 },
        ]);
        let deposit = DepositResult {
            transaction_hash: TransactionHash::from([1_u8; 32]),
            mode: DepositMode::Checkpoint,
            channel_id: ChannelId::from([9_u8; 32]),
            state_version: 1,
        };

        let channel = await_deposit(
            &store,
            *OWNER,
            "MST",
            &deposit,
            options(5_000),
            &discard_logger(),
        )
        .await
        .expect("Should converge");

        assert_eq!(1, channel.version);
        assert_eq!(3, store.polls.load(Ordering::SeqCst));
    }
}
