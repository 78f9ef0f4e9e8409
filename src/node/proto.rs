//! LND wire messages.
//!
//! Only the fields the firewall reads or writes are declared; tags match
//! `lightning.proto` and `router.proto`, unknown fields are skipped by the
//! decoder.

pub mod lnrpc {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GetInfoRequest {}

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GetInfoResponse {
        #[prost(string, tag = "1")]
        pub identity_pubkey: ::prost::alloc::string::String,
        #[prost(string, tag = "2")]
        pub alias: ::prost::alloc::string::String,
        #[prost(uint32, tag = "3")]
        pub num_pending_channels: u32,
        #[prost(uint32, tag = "4")]
        pub num_active_channels: u32,
        #[prost(uint32, tag = "6")]
        pub block_height: u32,
        #[prost(bool, tag = "9")]
        pub synced_to_chain: bool,
        #[prost(string, tag = "14")]
        pub version: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct NodeInfoRequest {
        #[prost(string, tag = "1")]
        pub pub_key: ::prost::alloc::string::String,
        #[prost(bool, tag = "2")]
        pub include_channels: bool,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct LightningNode {
        #[prost(uint32, tag = "1")]
        pub last_update: u32,
        #[prost(string, tag = "2")]
        pub pub_key: ::prost::alloc::string::String,
        #[prost(string, tag = "3")]
        pub alias: ::prost::alloc::string::String,
        #[prost(string, tag = "5")]
        pub color: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct NodeInfo {
        #[prost(message, optional, tag = "1")]
        pub node: ::core::option::Option<LightningNode>,
        #[prost(uint32, tag = "2")]
        pub num_channels: u32,
        #[prost(int64, tag = "3")]
        pub total_capacity: i64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ChanInfoRequest {
        #[prost(uint64, tag = "1")]
        pub chan_id: u64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ChannelEdge {
        #[prost(uint64, tag = "1")]
        pub channel_id: u64,
        #[prost(string, tag = "2")]
        pub chan_point: ::prost::alloc::string::String,
        #[prost(string, tag = "4")]
        pub node1_pub: ::prost::alloc::string::String,
        #[prost(string, tag = "5")]
        pub node2_pub: ::prost::alloc::string::String,
        #[prost(int64, tag = "6")]
        pub capacity: i64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ChannelAcceptRequest {
        #[prost(bytes = "vec", tag = "1")]
        pub node_pubkey: ::prost::alloc::vec::Vec<u8>,
        #[prost(bytes = "vec", tag = "2")]
        pub chain_hash: ::prost::alloc::vec::Vec<u8>,
        #[prost(bytes = "vec", tag = "3")]
        pub pending_chan_id: ::prost::alloc::vec::Vec<u8>,
        #[prost(uint64, tag = "4")]
        pub funding_amt: u64,
        #[prost(uint64, tag = "5")]
        pub push_amt: u64,
        #[prost(uint64, tag = "6")]
        pub dust_limit: u64,
        #[prost(uint64, tag = "7")]
        pub max_value_in_flight: u64,
        #[prost(uint64, tag = "8")]
        pub channel_reserve: u64,
        #[prost(uint64, tag = "9")]
        pub min_htlc: u64,
        #[prost(uint64, tag = "10")]
        pub fee_per_kw: u64,
        #[prost(uint32, tag = "11")]
        pub csv_delay: u32,
        #[prost(uint32, tag = "12")]
        pub max_accepted_htlcs: u32,
        #[prost(uint32, tag = "13")]
        pub channel_flags: u32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ChannelAcceptResponse {
        #[prost(bool, tag = "1")]
        pub accept: bool,
        #[prost(bytes = "vec", tag = "2")]
        pub pending_chan_id: ::prost::alloc::vec::Vec<u8>,
        #[prost(string, tag = "3")]
        pub error: ::prost::alloc::string::String,
        #[prost(string, tag = "4")]
        pub upfront_shutdown: ::prost::alloc::string::String,
        #[prost(uint32, tag = "5")]
        pub csv_delay: u32,
        #[prost(uint64, tag = "6")]
        pub reserve_sat: u64,
        #[prost(uint64, tag = "7")]
        pub in_flight_max_msat: u64,
        #[prost(uint32, tag = "8")]
        pub max_htlc_count: u32,
        #[prost(uint64, tag = "9")]
        pub min_htlc_in: u64,
        #[prost(uint32, tag = "10")]
        pub min_accept_depth: u32,
        #[prost(bool, tag = "11")]
        pub zero_conf: bool,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ChannelEventSubscription {}

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Channel {
        #[prost(bool, tag = "1")]
        pub active: bool,
        #[prost(string, tag = "2")]
        pub remote_pubkey: ::prost::alloc::string::String,
        #[prost(string, tag = "3")]
        pub channel_point: ::prost::alloc::string::String,
        #[prost(uint64, tag = "4")]
        pub chan_id: u64,
        #[prost(int64, tag = "5")]
        pub capacity: i64,
        #[prost(int64, tag = "6")]
        pub local_balance: i64,
        #[prost(int64, tag = "7")]
        pub remote_balance: i64,
        #[prost(bool, tag = "17")]
        pub private: bool,
        #[prost(bool, tag = "18")]
        pub initiator: bool,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ChannelCloseSummary {
        #[prost(string, tag = "1")]
        pub channel_point: ::prost::alloc::string::String,
        #[prost(uint64, tag = "2")]
        pub chan_id: u64,
        #[prost(string, tag = "4")]
        pub closing_tx_hash: ::prost::alloc::string::String,
        #[prost(string, tag = "5")]
        pub remote_pubkey: ::prost::alloc::string::String,
        #[prost(int64, tag = "6")]
        pub capacity: i64,
        #[prost(int64, tag = "8")]
        pub settled_balance: i64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ChannelPoint {
        #[prost(uint32, tag = "3")]
        pub output_index: u32,
        #[prost(oneof = "channel_point::FundingTxid", tags = "1, 2")]
        pub funding_txid: ::core::option::Option<channel_point::FundingTxid>,
    }

    pub mod channel_point {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum FundingTxid {
            #[prost(bytes, tag = "1")]
            FundingTxidBytes(::prost::alloc::vec::Vec<u8>),
            #[prost(string, tag = "2")]
            FundingTxidStr(::prost::alloc::string::String),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct PendingUpdate {
        #[prost(bytes = "vec", tag = "1")]
        pub txid: ::prost::alloc::vec::Vec<u8>,
        #[prost(uint32, tag = "2")]
        pub output_index: u32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ChannelEventUpdate {
        #[prost(enumeration = "channel_event_update::UpdateType", tag = "5")]
        pub r#type: i32,
        #[prost(oneof = "channel_event_update::Channel", tags = "1, 2, 3, 4, 6, 7")]
        pub channel: ::core::option::Option<channel_event_update::Channel>,
    }

    pub mod channel_event_update {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Channel {
            #[prost(message, tag = "1")]
            OpenChannel(super::Channel),
            #[prost(message, tag = "2")]
            ClosedChannel(super::ChannelCloseSummary),
            #[prost(message, tag = "3")]
            ActiveChannel(super::ChannelPoint),
            #[prost(message, tag = "4")]
            InactiveChannel(super::ChannelPoint),
            #[prost(message, tag = "6")]
            PendingOpenChannel(super::PendingUpdate),
            #[prost(message, tag = "7")]
            FullyResolvedChannel(super::ChannelPoint),
        }

        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum UpdateType {
            OpenChannel = 0,
            ClosedChannel = 1,
            ActiveChannel = 2,
            InactiveChannel = 3,
            PendingOpenChannel = 4,
            FullyResolvedChannel = 5,
        }
    }
}

pub mod routerrpc {
    #[derive(Clone, Copy, PartialEq, Eq, Hash, ::prost::Message)]
    pub struct CircuitKey {
        #[prost(uint64, tag = "1")]
        pub chan_id: u64,
        #[prost(uint64, tag = "2")]
        pub htlc_id: u64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ForwardHtlcInterceptRequest {
        #[prost(message, optional, tag = "1")]
        pub incoming_circuit_key: ::core::option::Option<CircuitKey>,
        #[prost(bytes = "vec", tag = "2")]
        pub payment_hash: ::prost::alloc::vec::Vec<u8>,
        #[prost(uint64, tag = "3")]
        pub outgoing_amount_msat: u64,
        #[prost(uint32, tag = "4")]
        pub outgoing_expiry: u32,
        #[prost(uint64, tag = "5")]
        pub incoming_amount_msat: u64,
        #[prost(uint32, tag = "6")]
        pub incoming_expiry: u32,
        #[prost(uint64, tag = "7")]
        pub outgoing_requested_chan_id: u64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ForwardHtlcInterceptResponse {
        #[prost(message, optional, tag = "1")]
        pub incoming_circuit_key: ::core::option::Option<CircuitKey>,
        #[prost(enumeration = "ResolveHoldForwardAction", tag = "2")]
        pub action: i32,
        #[prost(bytes = "vec", tag = "3")]
        pub preimage: ::prost::alloc::vec::Vec<u8>,
        #[prost(bytes = "vec", tag = "4")]
        pub failure_message: ::prost::alloc::vec::Vec<u8>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum ResolveHoldForwardAction {
        Settle = 0,
        Fail = 1,
        Resume = 2,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SubscribeHtlcEventsRequest {}

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct HtlcInfo {
        #[prost(uint32, tag = "1")]
        pub incoming_timelock: u32,
        #[prost(uint32, tag = "2")]
        pub outgoing_timelock: u32,
        #[prost(uint64, tag = "3")]
        pub incoming_amt_msat: u64,
        #[prost(uint64, tag = "4")]
        pub outgoing_amt_msat: u64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ForwardEvent {
        #[prost(message, optional, tag = "1")]
        pub info: ::core::option::Option<HtlcInfo>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ForwardFailEvent {}

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SettleEvent {
        #[prost(bytes = "vec", tag = "1")]
        pub preimage: ::prost::alloc::vec::Vec<u8>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct LinkFailEvent {
        #[prost(message, optional, tag = "1")]
        pub info: ::core::option::Option<HtlcInfo>,
        #[prost(string, tag = "4")]
        pub failure_string: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct HtlcEvent {
        #[prost(uint64, tag = "1")]
        pub incoming_channel_id: u64,
        #[prost(uint64, tag = "2")]
        pub outgoing_channel_id: u64,
        #[prost(uint64, tag = "3")]
        pub incoming_htlc_id: u64,
        #[prost(uint64, tag = "4")]
        pub outgoing_htlc_id: u64,
        #[prost(uint64, tag = "5")]
        pub timestamp_ns: u64,
        #[prost(enumeration = "htlc_event::EventType", tag = "6")]
        pub event_type: i32,
        #[prost(oneof = "htlc_event::Event", tags = "7, 8, 9, 10")]
        pub event: ::core::option::Option<htlc_event::Event>,
    }

    pub mod htlc_event {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum EventType {
            Unknown = 0,
            Send = 1,
            Receive = 2,
            Forward = 3,
        }

        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Event {
            #[prost(message, tag = "7")]
            ForwardEvent(super::ForwardEvent),
            #[prost(message, tag = "8")]
            ForwardFailEvent(super::ForwardFailEvent),
            #[prost(message, tag = "9")]
            SettleEvent(super::SettleEvent),
            #[prost(message, tag = "10")]
            LinkFailEvent(super::LinkFailEvent),
        }
    }
}
