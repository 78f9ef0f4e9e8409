//! Session supervision: connect, intercept, restart.
//!
//! A session is one connection to the node with its interceptors and
//! observers. It ends as soon as any of them ends; the others are cancelled
//! and awaited before the supervisor reconnects. A policy reload that moves a
//! domain into or out of passthrough also ends the session, and the next one
//! starts without delay.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::domain::FirewallPolicy;
use crate::enrichment::Enricher;
use crate::interceptor::{
    cancelled, run_channel_acceptor, run_channel_observer, run_htlc_interceptor,
    run_htlc_observer, InterceptorContext,
};
use crate::node::{Connector, NodeError};
use crate::rules::RuleEngine;

/// Default wait between sessions.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

const POLICY_WATCH: &str = "policy_watch";

/// What ended a session.
#[derive(Debug)]
pub enum SessionEnd {
    /// A task returned
    Task {
        name: &'static str,
        result: Result<(), NodeError>,
    },
    /// A task panicked
    Panicked(String),
}

pub struct Supervisor {
    connector: Arc<dyn Connector>,
    policy: watch::Receiver<Arc<FirewallPolicy>>,
    rules: Arc<RuleEngine>,
    enricher: Arc<Enricher>,
    reconnect_delay: Duration,
}

type TaskResult = (&'static str, Result<(), NodeError>);

/// Which domains are passthrough, as `(channel, forward)`.
fn passthrough(policy: &FirewallPolicy) -> (bool, bool) {
    (
        policy.channel_mode.is_passthrough(),
        policy.forward_mode.is_passthrough(),
    )
}

/// Returns once the published policy's passthrough set differs from
/// `started_with`, or when the session is cancelled.
async fn watch_passthrough(
    mut policy: watch::Receiver<Arc<FirewallPolicy>>,
    started_with: (bool, bool),
    mut cancel: watch::Receiver<bool>,
) -> Result<(), NodeError> {
    loop {
        tokio::select! {
            changed = policy.changed() => {
                if changed.is_err() {
                    // No more reloads; wait for the session to end.
                    cancelled(&mut cancel).await;
                    return Ok(());
                }
            }
            _ = cancelled(&mut cancel) => return Ok(()),
        }

        let current = passthrough(&policy.borrow());
        if current != started_with {
            info!(
                channel_passthrough = current.0,
                forward_passthrough = current.1,
                "Passthrough setting changed, restarting session"
            );
            return Ok(());
        }
    }
}

fn named<F>(name: &'static str, task: F) -> impl Future<Output = TaskResult>
where
    F: Future<Output = Result<(), NodeError>>,
{
    async move { (name, task.await) }
}

impl Supervisor {
    pub fn new(
        connector: Arc<dyn Connector>,
        policy: watch::Receiver<Arc<FirewallPolicy>>,
        rules: Arc<RuleEngine>,
        enricher: Arc<Enricher>,
    ) -> Self {
        Supervisor {
            connector,
            policy,
            rules,
            enricher,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Run sessions forever.
    pub async fn run(&self) {
        loop {
            let end = self.run_session().await;
            let policy_changed = matches!(
                &end,
                Ok(SessionEnd::Task {
                    name: POLICY_WATCH,
                    result: Ok(())
                })
            );

            match end {
                Ok(SessionEnd::Task { name, result: Ok(()) }) => {
                    info!(task = name, "Session ended")
                }
                Ok(SessionEnd::Task { name, result: Err(e) }) => {
                    warn!(task = name, error = %e, "Session ended")
                }
                Ok(SessionEnd::Panicked(e)) => error!(error = %e, "Session ended by panic"),
                Err(e) => error!(error = %e, "Could not start session"),
            }

            if policy_changed {
                continue;
            }

            info!(
                delay_secs = self.reconnect_delay.as_secs_f64(),
                "Reconnecting after delay"
            );
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// One connection lifetime. Returns once every task has stopped.
    pub async fn run_session(&self) -> Result<SessionEnd, NodeError> {
        let node = self.connector.connect().await?;
        let identity = node.get_info().await?;
        info!(
            alias = %identity.alias,
            pubkey = %identity.identity_pubkey,
            version = %identity.version,
            "Connected to node"
        );

        let policy = self.policy.borrow().clone();
        let ctx = InterceptorContext {
            node: node.clone(),
            own_pubkey: Arc::from(identity.identity_pubkey.as_str()),
            policy: self.policy.clone(),
            rules: self.rules.clone(),
            enricher: self.enricher.clone(),
        };

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let mut tasks: JoinSet<TaskResult> = JoinSet::new();

        if policy.channel_mode.is_passthrough() {
            info!("Channel mode is passthrough, not intercepting channel requests");
        } else {
            tasks.spawn(named(
                "channel_acceptor",
                run_channel_acceptor(ctx.clone(), cancel_rx.clone()),
            ));
        }

        if policy.forward_mode.is_passthrough() {
            info!("Forward mode is passthrough, not intercepting HTLCs");
        } else {
            tasks.spawn(named(
                "htlc_interceptor",
                run_htlc_interceptor(ctx.clone(), cancel_rx.clone()),
            ));
        }

        tasks.spawn(named(
            "channel_observer",
            run_channel_observer(node.clone(), cancel_rx.clone()),
        ));
        tasks.spawn(named(
            "htlc_observer",
            run_htlc_observer(node, cancel_rx.clone()),
        ));
        tasks.spawn(named(
            POLICY_WATCH,
            watch_passthrough(self.policy.clone(), passthrough(&policy), cancel_rx),
        ));

        // Observers always run, so the set is never empty here.
        let end = match tasks.join_next().await {
            Some(Ok((name, result))) => SessionEnd::Task { name, result },
            Some(Err(join_error)) => SessionEnd::Panicked(join_error.to_string()),
            None => SessionEnd::Task {
                name: "none",
                result: Ok(()),
            },
        };

        let _ = cancel_tx.send(true);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((task, Err(e))) => warn!(task, error = %e, "Task stopped with error"),
                Ok((task, Ok(()))) => info!(task, "Task stopped"),
                Err(e) => error!(error = %e, "Task panicked"),
            }
        }

        Ok(end)
    }
}
