//! Log-only subscribers to the node's channel and HTLC event streams.

use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::domain::ShortChannelId;
use crate::node::proto::lnrpc::channel_event_update::Channel as ChannelUpdate;
use crate::node::proto::lnrpc::channel_point::FundingTxid;
use crate::node::proto::lnrpc::{ChannelEventUpdate, ChannelPoint};
use crate::node::proto::routerrpc::htlc_event::{Event as HtlcUpdate, EventType};
use crate::node::proto::routerrpc::HtlcEvent;
use crate::node::{EventStream, NodeClient, NodeError};

use super::cancelled;

async fn observe<T>(
    subscription: impl std::future::Future<Output = Result<EventStream<T>, NodeError>>,
    mut cancel: watch::Receiver<bool>,
    name: &'static str,
    mut log: impl FnMut(&T),
) -> Result<(), NodeError> {
    let mut events = tokio::select! {
        events = subscription => events?,
        _ = cancelled(&mut cancel) => return Ok(()),
    };

    info!(stream = name, "Subscribed to node events");

    loop {
        tokio::select! {
            next = events.next() => match next {
                Some(event) => log(&event?),
                None => return Err(NodeError::StreamClosed),
            },
            _ = cancelled(&mut cancel) => return Ok(()),
        }
    }
}

pub async fn run_channel_observer(
    node: Arc<dyn NodeClient>,
    cancel: watch::Receiver<bool>,
) -> Result<(), NodeError> {
    observe(node.subscribe_channel_events(), cancel, "channel_events", |update| {
        log_channel_event(update);
    })
    .await
}

pub async fn run_htlc_observer(
    node: Arc<dyn NodeClient>,
    cancel: watch::Receiver<bool>,
) -> Result<(), NodeError> {
    observe(node.subscribe_htlc_events(), cancel, "htlc_events", |event| {
        log_htlc_event(event);
    })
    .await
}

/// `txid:index`, with the txid in its usual (reversed) hex form.
pub fn channel_point_string(point: &ChannelPoint) -> String {
    let txid = match &point.funding_txid {
        Some(FundingTxid::FundingTxidStr(txid)) => txid.clone(),
        Some(FundingTxid::FundingTxidBytes(bytes)) => {
            let mut bytes = bytes.clone();
            bytes.reverse();
            hex::encode(bytes)
        }
        None => String::new(),
    };
    format!("{}:{}", txid, point.output_index)
}

/// Log one channel event and return its kind.
pub fn log_channel_event(update: &ChannelEventUpdate) -> &'static str {
    match &update.channel {
        Some(ChannelUpdate::OpenChannel(channel)) => {
            info!(
                chan_id = %ShortChannelId(channel.chan_id),
                remote_pubkey = %channel.remote_pubkey,
                capacity = channel.capacity,
                private = channel.private,
                initiator = channel.initiator,
                "Channel opened"
            );
            "open"
        }
        Some(ChannelUpdate::ClosedChannel(summary)) => {
            info!(
                chan_id = %ShortChannelId(summary.chan_id),
                remote_pubkey = %summary.remote_pubkey,
                capacity = summary.capacity,
                settled_balance = summary.settled_balance,
                closing_tx = %summary.closing_tx_hash,
                "Channel closed"
            );
            "closed"
        }
        Some(ChannelUpdate::ActiveChannel(point)) => {
            info!(channel_point = %channel_point_string(point), "Channel active");
            "active"
        }
        Some(ChannelUpdate::InactiveChannel(point)) => {
            info!(channel_point = %channel_point_string(point), "Channel inactive");
            "inactive"
        }
        Some(ChannelUpdate::PendingOpenChannel(pending)) => {
            let mut txid = pending.txid.clone();
            txid.reverse();
            let channel_point = format!("{}:{}", hex::encode(txid), pending.output_index);
            info!(channel_point = %channel_point, "Channel pending open");
            "pending_open"
        }
        Some(ChannelUpdate::FullyResolvedChannel(point)) => {
            info!(channel_point = %channel_point_string(point), "Channel fully resolved");
            "fully_resolved"
        }
        None => {
            debug!(update_type = update.r#type, "Channel event without payload");
            "unknown"
        }
    }
}

/// Log one HTLC event if it concerns a forward; returns its kind.
pub fn log_htlc_event(event: &HtlcEvent) -> Option<&'static str> {
    if !matches!(EventType::try_from(event.event_type), Ok(EventType::Forward)) {
        return None;
    }

    let in_chan_id = ShortChannelId(event.incoming_channel_id);
    let out_chan_id = ShortChannelId(event.outgoing_channel_id);

    let kind = match &event.event {
        Some(HtlcUpdate::SettleEvent(settle)) => {
            info!(
                in_chan_id = %in_chan_id,
                out_chan_id = %out_chan_id,
                in_htlc_id = event.incoming_htlc_id,
                out_htlc_id = event.outgoing_htlc_id,
                "HTLC settled"
            );
            debug!(preimage = %hex::encode(&settle.preimage), "HTLC preimage");
            "settle"
        }
        Some(HtlcUpdate::ForwardEvent(forward)) => {
            let info = forward.info.clone().unwrap_or_default();
            info!(
                in_chan_id = %in_chan_id,
                out_chan_id = %out_chan_id,
                in_htlc_id = event.incoming_htlc_id,
                out_htlc_id = event.outgoing_htlc_id,
                in_amt_msat = info.incoming_amt_msat,
                out_amt_msat = info.outgoing_amt_msat,
                "HTLC forwarded"
            );
            "forward"
        }
        Some(HtlcUpdate::ForwardFailEvent(_)) => {
            info!(
                in_chan_id = %in_chan_id,
                out_chan_id = %out_chan_id,
                in_htlc_id = event.incoming_htlc_id,
                out_htlc_id = event.outgoing_htlc_id,
                "HTLC forward failed"
            );
            "forward_fail"
        }
        Some(HtlcUpdate::LinkFailEvent(link_fail)) => {
            info!(
                in_chan_id = %in_chan_id,
                out_chan_id = %out_chan_id,
                in_htlc_id = event.incoming_htlc_id,
                out_htlc_id = event.outgoing_htlc_id,
                failure = %link_fail.failure_string,
                "HTLC link failed"
            );
            "link_fail"
        }
        None => return None,
    };

    Some(kind)
}
