pub mod lnd;
pub mod mock;
pub mod proto;

pub use lnd::{LndClient, LndConnector};
pub use mock::{MockConnector, MockHandles, MockNode};

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

use proto::lnrpc::{
    ChannelAcceptRequest, ChannelAcceptResponse, ChannelEdge, ChannelEventUpdate,
    GetInfoResponse, NodeInfo,
};
use proto::routerrpc::{ForwardHtlcInterceptRequest, ForwardHtlcInterceptResponse, HtlcEvent};

/// Default bound on every unary lookup against the node.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors talking to the node.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("rpc failed: {0}")]
    Status(#[from] tonic::Status),

    #[error("rpc timed out after {0:?}")]
    Timeout(Duration),

    #[error("credentials: {0}")]
    Credentials(String),

    #[error("stream closed by node")]
    StreamClosed,

    #[error("node info not available for {0}")]
    NodeNotFound(String),
}

/// Inbound stream of messages from the node.
pub type EventStream<T> = BoxStream<'static, Result<T, NodeError>>;

/// Both halves of a bidirectional interceptor stream.
///
/// `requests` yields what the node asks, `responses` carries our answers.
/// Dropping `responses` closes the outbound half.
pub struct Duplex<Req, Resp> {
    pub requests: EventStream<Req>,
    pub responses: mpsc::Sender<Resp>,
}

impl<Req, Resp> Duplex<Req, Resp> {
    /// Send one response; a closed outbound half is a stream failure.
    pub async fn send(&mut self, response: Resp) -> Result<(), NodeError> {
        self.responses
            .send(response)
            .await
            .map_err(|_| NodeError::StreamClosed)
    }
}

pub type ChannelAcceptor = Duplex<ChannelAcceptRequest, ChannelAcceptResponse>;
pub type HtlcInterceptor = Duplex<ForwardHtlcInterceptRequest, ForwardHtlcInterceptResponse>;

/// Control-plane operations the firewall needs from a Lightning node.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Identity of the local node.
    async fn get_info(&self) -> Result<GetInfoResponse, NodeError>;

    /// Graph info (alias, capacity, channel count) for a node pubkey.
    async fn get_node_info(&self, pubkey: &str) -> Result<NodeInfo, NodeError>;

    /// Both endpoints of a channel.
    async fn get_chan_info(&self, chan_id: u64) -> Result<ChannelEdge, NodeError>;

    async fn channel_acceptor(&self) -> Result<ChannelAcceptor, NodeError>;

    async fn htlc_interceptor(&self) -> Result<HtlcInterceptor, NodeError>;

    async fn subscribe_channel_events(&self) -> Result<EventStream<ChannelEventUpdate>, NodeError>;

    async fn subscribe_htlc_events(&self) -> Result<EventStream<HtlcEvent>, NodeError>;

    /// Alias of a node, failing when the node is unknown to the graph.
    async fn get_node_alias(&self, pubkey: &str) -> Result<String, NodeError> {
        let info = self.get_node_info(pubkey).await?;
        info.node
            .map(|node| node.alias)
            .ok_or_else(|| NodeError::NodeNotFound(pubkey.to_string()))
    }
}

/// Opens fresh node sessions. One call per supervisor iteration.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn NodeClient>, NodeError>;
}

/// The endpoint of `edge` that is not `own_pubkey`.
pub fn remote_pubkey<'a>(edge: &'a ChannelEdge, own_pubkey: &str) -> &'a str {
    if edge.node1_pub != own_pubkey {
        &edge.node1_pub
    } else {
        &edge.node2_pub
    }
}

/// Short display form of a hex pubkey: first and last four characters.
pub fn trim_pubkey(pubkey: &str) -> String {
    const SIDE: usize = 4;
    if pubkey.len() > SIDE * 2 && pubkey.is_ascii() {
        format!("{}..{}", &pubkey[..SIDE], &pubkey[pubkey.len() - SIDE..])
    } else {
        pubkey.to_string()
    }
}
