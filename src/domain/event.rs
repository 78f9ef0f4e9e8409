use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::enrichment::NodeReputation;
use crate::node::proto::lnrpc::ChannelAcceptRequest;
use crate::node::proto::routerrpc::ForwardHtlcInterceptRequest;

use super::scid::ShortChannelId;

/// Bit 0 of `channel_flags`: the channel will be announced.
const ANNOUNCE_CHANNEL_FLAG: u32 = 1;

/// Graph statistics of a remote node. Zeroed when the node is unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeStats {
    pub alias: String,
    pub total_capacity: i64,
    pub num_channels: u32,
}

/// A channel counterparty as seen from our node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeerInfo {
    pub pubkey: String,
    pub alias: String,
}

/// Incoming channel open request, as presented to rule scripts.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelAcceptEvent {
    pub received_at: DateTime<Utc>,
    /// Requester pubkey (hex)
    pub pubkey: String,
    pub alias: String,
    pub total_capacity: i64,
    pub num_channels: u32,
    pub funding_amt: u64,
    pub push_amt: u64,
    pub channel_flags: u32,
    pub private: bool,
    /// Pending channel id (hex)
    pub pending_chan_id: String,
    pub csv_delay: u32,
    pub max_accepted_htlcs: u32,
    pub channel_reserve: u64,
    pub max_value_in_flight: u64,
    pub min_htlc: u64,
    pub dust_limit: u64,
    pub fee_per_kw: u64,
    pub reputation: NodeReputation,
}

impl ChannelAcceptEvent {
    pub fn new(
        request: &ChannelAcceptRequest,
        stats: NodeStats,
        reputation: NodeReputation,
    ) -> Self {
        ChannelAcceptEvent {
            received_at: Utc::now(),
            pubkey: hex::encode(&request.node_pubkey),
            alias: stats.alias,
            total_capacity: stats.total_capacity,
            num_channels: stats.num_channels,
            funding_amt: request.funding_amt,
            push_amt: request.push_amt,
            channel_flags: request.channel_flags,
            private: request.channel_flags & ANNOUNCE_CHANNEL_FLAG == 0,
            pending_chan_id: hex::encode(&request.pending_chan_id),
            csv_delay: request.csv_delay,
            max_accepted_htlcs: request.max_accepted_htlcs,
            channel_reserve: request.channel_reserve,
            max_value_in_flight: request.max_value_in_flight,
            min_htlc: request.min_htlc,
            dust_limit: request.dust_limit,
            fee_per_kw: request.fee_per_kw,
            reputation,
        }
    }
}

/// Held HTLC awaiting a forward decision, as presented to rule scripts.
#[derive(Debug, Clone, Serialize)]
pub struct HtlcForwardEvent {
    pub received_at: DateTime<Utc>,
    pub incoming_chan_id: u64,
    pub outgoing_chan_id: u64,
    pub htlc_id: u64,
    /// `BxTxO` form of the incoming channel id
    pub incoming_channel: String,
    /// `BxTxO` form of the requested outgoing channel id
    pub outgoing_channel: String,
    pub incoming_amount_msat: u64,
    pub outgoing_amount_msat: u64,
    pub incoming_expiry: u32,
    pub outgoing_expiry: u32,
    pub payment_hash: String,
    pub from: PeerInfo,
    pub to: PeerInfo,
}

impl HtlcForwardEvent {
    pub fn new(request: &ForwardHtlcInterceptRequest, from: PeerInfo, to: PeerInfo) -> Self {
        let key = request.incoming_circuit_key.unwrap_or_default();
        HtlcForwardEvent {
            received_at: Utc::now(),
            incoming_chan_id: key.chan_id,
            outgoing_chan_id: request.outgoing_requested_chan_id,
            htlc_id: key.htlc_id,
            incoming_channel: ShortChannelId(key.chan_id).to_string(),
            outgoing_channel: ShortChannelId(request.outgoing_requested_chan_id).to_string(),
            incoming_amount_msat: request.incoming_amount_msat,
            outgoing_amount_msat: request.outgoing_amount_msat,
            incoming_expiry: request.incoming_expiry,
            outgoing_expiry: request.outgoing_expiry,
            payment_hash: hex::encode(&request.payment_hash),
            from,
            to,
        }
    }

    /// Routing fee earned by this forward, zero when negative.
    pub fn fee_msat(&self) -> u64 {
        self.incoming_amount_msat
            .saturating_sub(self.outgoing_amount_msat)
    }
}

/// Which interception point produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ChannelAccept,
    HtlcForward,
}

impl EventKind {
    /// Name of the global the event is bound to, and of its script file.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::ChannelAccept => "ChannelAccept",
            EventKind::HtlcForward => "HtlcForward",
        }
    }

    pub fn script_file(&self) -> String {
        format!("{}.lua", self.name())
    }
}

/// Single input type of the rule evaluator.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum FirewallEvent<'a> {
    ChannelAccept(&'a ChannelAcceptEvent),
    HtlcForward(&'a HtlcForwardEvent),
}

impl FirewallEvent<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            FirewallEvent::ChannelAccept(_) => EventKind::ChannelAccept,
            FirewallEvent::HtlcForward(_) => EventKind::HtlcForward,
        }
    }
}
