//! Lease expiry sweeper for message bags.
//!
//! Borrowed messages sit in `processing` until the borrower acks or returns
//! them. If the borrower dies, the entry would stay leased forever; the
//! sweeper re-promotes such entries to `available` after a configurable
//! lease TTL.
//!
//! Staleness is detected without backend metadata: the sweeper remembers
//! when it first observed each processing key, and an entry still present a
//! full TTL after first observation is reclaimed. Re-promotion moves the
//! entry back under its original available key, which preserves the
//! one-state-at-a-time invariant for the message citation.
//!
//! The core tolerates the sweeper by design: `return_message` and
//! `delete_message` report a clean lease-expired error when the sweeper got
//! there first, and the sweeper itself backs off when an ack wins the
//! delete race.

use std::collections::HashMap;
use std::time::Duration;

use nebula_repository_storage::{MessageState, Namespace, OpContext, StorageDriver, WriteMode, keys};
use nebula_repository_types::Citation;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::facade::{FacadeError, Result, StorageFacade};

/// Sweeper timing configuration.
#[derive(Debug, Clone, Copy)]
pub struct SweeperConfig {
    /// How long a message may stay in `processing` before reclamation.
    pub lease_ttl: Duration,
    /// Delay between sweeps.
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self { lease_ttl: Duration::from_secs(60), interval: Duration::from_secs(15) }
    }
}

/// Re-promotes stale `processing` entries of one bag.
#[derive(Debug)]
pub struct LeaseSweeper<D> {
    facade: std::sync::Arc<StorageFacade<D>>,
    bag: Citation,
    config: SweeperConfig,
    /// First time each processing key (relative to the state prefix) was
    /// observed by this sweeper.
    first_seen: HashMap<String, Instant>,
}

impl<D: StorageDriver + 'static> LeaseSweeper<D> {
    /// Creates a sweeper for one bag.
    #[must_use]
    pub fn new(
        facade: std::sync::Arc<StorageFacade<D>>,
        bag: Citation,
        config: SweeperConfig,
    ) -> Self {
        Self { facade, bag, config, first_seen: HashMap::new() }
    }

    /// Runs one sweep, returning how many messages were re-promoted.
    ///
    /// # Errors
    ///
    /// Propagates facade errors; an individual entry lost to a concurrent
    /// ack is skipped, not an error.
    pub async fn sweep_once(&mut self, ctx: &OpContext) -> Result<usize> {
        let driver = self.facade.driver();
        let proc_prefix = keys::bag_prefix(&self.bag, MessageState::Processing);
        let avail_prefix = keys::bag_prefix(&self.bag, MessageState::Available);

        let leased = self.facade.list_messages(ctx, &self.bag, MessageState::Processing).await?;

        // Forget keys that were acked or returned since the last sweep.
        self.first_seen.retain(|key, _| leased.contains(key));

        let now = Instant::now();
        let mut reclaimed = 0;
        for suffix in leased {
            let observed = *self.first_seen.entry(suffix.clone()).or_insert(now);
            if now.duration_since(observed) < self.config.lease_ttl {
                continue;
            }

            let proc_key = format!("{proc_prefix}/{suffix}");
            let avail_key = format!("{avail_prefix}/{suffix}");

            let Some(bytes) = wrap(
                driver.read(ctx, Namespace::Messages, &proc_key).await,
                "sweep",
                &proc_key,
            )?
            else {
                self.first_seen.remove(&suffix);
                continue;
            };
            if !wrap(
                driver.delete(ctx, Namespace::Messages, &proc_key).await,
                "sweep",
                &proc_key,
            )? {
                // An ack or return won the race; nothing to reclaim.
                self.first_seen.remove(&suffix);
                continue;
            }
            wrap(
                driver
                    .write(ctx, Namespace::Messages, &avail_key, bytes, WriteMode::Overwrite, None)
                    .await,
                "sweep",
                &avail_key,
            )?;
            self.first_seen.remove(&suffix);
            reclaimed += 1;
            tracing::info!(bag = %self.bag, key = %suffix, "reclaimed expired message lease");
        }
        Ok(reclaimed)
    }

    /// Spawns the sweep loop on the runtime.
    ///
    /// The task sweeps every `interval` until `cancel` fires. Sweep failures
    /// are logged and do not stop the loop.
    pub fn spawn(mut self, cancel: CancellationToken) -> JoinHandle<()> {
        let ctx = OpContext::new().with_cancellation(cancel.clone());
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        match self.sweep_once(&ctx).await {
                            Ok(0) => {},
                            Ok(reclaimed) => {
                                tracing::debug!(bag = %self.bag, reclaimed, "sweep complete");
                            },
                            Err(error) => {
                                tracing::warn!(bag = %self.bag, %error, "sweep failed");
                            },
                        }
                    },
                }
            }
        })
    }
}

/// Wraps a driver result with sweep context.
fn wrap<T>(
    result: std::result::Result<T, nebula_repository_storage::DriverError>,
    operation: &'static str,
    key: &str,
) -> Result<T> {
    result.map_err(|source| FacadeError::Storage {
        operation,
        namespace: Namespace::Messages,
        key: key.to_string(),
        source,
    })
}
