//! Interception loops and the observers running beside them.

pub mod channel;
pub mod htlc;
pub mod observer;

pub use channel::run_channel_acceptor;
pub use htlc::run_htlc_interceptor;
pub use observer::{run_channel_observer, run_htlc_observer};

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::domain::{FirewallPolicy, NodeStats, PeerInfo, ShortChannelId};
use crate::enrichment::Enricher;
use crate::node::{remote_pubkey, trim_pubkey, NodeClient};
use crate::rules::RuleEngine;

/// Everything a decision needs, shared by all loops of one session.
#[derive(Clone)]
pub struct InterceptorContext {
    pub node: Arc<dyn NodeClient>,
    /// Our own identity pubkey
    pub own_pubkey: Arc<str>,
    pub policy: watch::Receiver<Arc<FirewallPolicy>>,
    pub rules: Arc<RuleEngine>,
    pub enricher: Arc<Enricher>,
}

impl InterceptorContext {
    /// Current policy snapshot.
    pub fn policy(&self) -> Arc<FirewallPolicy> {
        self.policy.borrow().clone()
    }

    /// Graph stats of `pubkey`, zeroed when the node is unknown.
    pub async fn node_stats(&self, pubkey: &str) -> NodeStats {
        match self.node.get_node_info(pubkey).await {
            Ok(info) => NodeStats {
                alias: info.node.map(|node| node.alias).unwrap_or_default(),
                total_capacity: info.total_capacity,
                num_channels: info.num_channels,
            },
            Err(e) => {
                debug!(pubkey = %pubkey, error = %e, "Node info unavailable");
                NodeStats::default()
            }
        }
    }

    /// Alias of `pubkey`, or its trimmed form when unknown.
    pub async fn alias_or_trimmed(&self, pubkey: &str) -> String {
        match self.node.get_node_alias(pubkey).await {
            Ok(alias) if !alias.is_empty() => alias,
            _ => trim_pubkey(pubkey),
        }
    }

    /// Remote end of channel `chan_id`. When the channel is unknown the
    /// pubkey is empty and the alias is the channel id.
    pub async fn resolve_peer(&self, chan_id: u64) -> PeerInfo {
        let edge = match self.node.get_chan_info(chan_id).await {
            Ok(edge) => edge,
            Err(e) => {
                let scid = ShortChannelId(chan_id);
                warn!(chan_id = %scid, error = %e, "Error getting pubkey for channel");
                return PeerInfo {
                    pubkey: String::new(),
                    alias: scid.to_string(),
                };
            }
        };

        let pubkey = remote_pubkey(&edge, &self.own_pubkey).to_string();
        let alias = self.alias_or_trimmed(&pubkey).await;
        PeerInfo { pubkey, alias }
    }
}

/// Resolves once the session is cancelled or its cancel sender is gone.
pub async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let _ = cancel.wait_for(|stop| *stop).await;
}
