use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{info, warn};

use crate::domain::FirewallPolicy;

use super::loader::{PolicyError, PolicyLoader};

/// Watch the policy file and broadcast changed snapshots.
pub struct PolicyWatcher {
    loader: PolicyLoader,
    check_interval: Duration,
}

impl PolicyWatcher {
    /// Create a new policy watcher.
    pub fn new(loader: PolicyLoader, check_interval: Duration) -> Self {
        PolicyWatcher {
            loader,
            check_interval,
        }
    }

    /// Load the initial policy and start polling for changes.
    ///
    /// The initial load must succeed. Later load failures are logged and the
    /// previous snapshot stays current.
    pub fn start(
        self,
    ) -> Result<
        (
            watch::Receiver<Arc<FirewallPolicy>>,
            tokio::task::JoinHandle<()>,
        ),
        PolicyError,
    > {
        let initial = self.loader.load()?;
        info!(
            path = %self.loader.policy_path().display(),
            channel_mode = %initial.channel_mode,
            forward_mode = %initial.forward_mode,
            rules = initial.rules.apply,
            "Loaded firewall policy"
        );

        let (tx, rx) = watch::channel(Arc::new(initial));

        let handle = tokio::spawn(async move {
            let mut interval = interval(self.check_interval);
            // First tick completes immediately.
            interval.tick().await;

            loop {
                interval.tick().await;

                match self.check_for_updates(&tx) {
                    Ok(true) => info!("Policy reloaded successfully"),
                    Ok(false) => {}
                    Err(e) => warn!(error = %e, "Error checking for policy updates, keeping previous policy"),
                }
            }
        });

        Ok((rx, handle))
    }

    /// Reload and broadcast when the parsed policy differs from the current one.
    fn check_for_updates(
        &self,
        tx: &watch::Sender<Arc<FirewallPolicy>>,
    ) -> Result<bool, PolicyError> {
        let policy = self.loader.load()?;

        if **tx.borrow() == policy {
            return Ok(false);
        }

        let previous = tx.borrow().clone();
        if previous.channel_mode != policy.channel_mode || previous.forward_mode != policy.forward_mode {
            info!(
                channel_mode = %policy.channel_mode,
                forward_mode = %policy.forward_mode,
                "Policy mode changed"
            );
        }

        let _ = tx.send(Arc::new(policy));

        Ok(true)
    }
}
