//! In-process node used by tests and benches.

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio_stream::wrappers::ReceiverStream;

use super::proto::lnrpc::{
    ChannelAcceptRequest, ChannelAcceptResponse, ChannelEdge, ChannelEventUpdate,
    GetInfoResponse, LightningNode, NodeInfo,
};
use super::proto::routerrpc::{ForwardHtlcInterceptRequest, ForwardHtlcInterceptResponse, HtlcEvent};
use super::{
    ChannelAcceptor, Connector, Duplex, EventStream, HtlcInterceptor, NodeClient, NodeError,
};

const BUFFER: usize = 64;

/// Test-side ends of every stream a [`MockNode`] serves.
///
/// Dropping a request sender ends the matching stream on the firewall side.
pub struct MockHandles {
    pub channel_requests: mpsc::Sender<Result<ChannelAcceptRequest, NodeError>>,
    pub channel_responses: mpsc::Receiver<ChannelAcceptResponse>,
    pub htlc_requests: mpsc::Sender<Result<ForwardHtlcInterceptRequest, NodeError>>,
    pub htlc_responses: mpsc::Receiver<ForwardHtlcInterceptResponse>,
    pub channel_events: mpsc::Sender<Result<ChannelEventUpdate, NodeError>>,
    pub htlc_events: mpsc::Sender<Result<HtlcEvent, NodeError>>,
}

/// Node whose graph is a pair of maps and whose streams are tokio channels.
///
/// Every stream can be opened once; a second open fails with
/// [`NodeError::StreamClosed`], like a node that went away.
pub struct MockNode {
    identity: GetInfoResponse,
    nodes: Mutex<HashMap<String, NodeInfo>>,
    edges: Mutex<HashMap<u64, ChannelEdge>>,
    held_channels: Mutex<HashMap<u64, Arc<Notify>>>,
    channel_acceptor: Mutex<Option<ChannelAcceptor>>,
    htlc_interceptor: Mutex<Option<HtlcInterceptor>>,
    channel_events: Mutex<Option<EventStream<ChannelEventUpdate>>>,
    htlc_events: Mutex<Option<EventStream<HtlcEvent>>>,
}

fn duplex<Req, Resp>() -> (
    Duplex<Req, Resp>,
    mpsc::Sender<Result<Req, NodeError>>,
    mpsc::Receiver<Resp>,
)
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    let (req_tx, req_rx) = mpsc::channel(BUFFER);
    let (resp_tx, resp_rx) = mpsc::channel(BUFFER);
    let duplex = Duplex {
        requests: ReceiverStream::new(req_rx).boxed(),
        responses: resp_tx,
    };
    (duplex, req_tx, resp_rx)
}

fn events<T: Send + 'static>() -> (EventStream<T>, mpsc::Sender<Result<T, NodeError>>) {
    let (tx, rx) = mpsc::channel(BUFFER);
    (ReceiverStream::new(rx).boxed(), tx)
}

impl MockNode {
    /// Create a node with the given identity pubkey.
    pub fn new(identity_pubkey: &str) -> (Arc<Self>, MockHandles) {
        let (acceptor, channel_requests, channel_responses) = duplex();
        let (interceptor, htlc_requests, htlc_responses) = duplex();
        let (channel_stream, channel_events) = events();
        let (htlc_stream, htlc_events) = events();

        let node = MockNode {
            identity: GetInfoResponse {
                identity_pubkey: identity_pubkey.to_string(),
                alias: "mock".to_string(),
                ..Default::default()
            },
            nodes: Mutex::new(HashMap::new()),
            edges: Mutex::new(HashMap::new()),
            held_channels: Mutex::new(HashMap::new()),
            channel_acceptor: Mutex::new(Some(acceptor)),
            htlc_interceptor: Mutex::new(Some(interceptor)),
            channel_events: Mutex::new(Some(channel_stream)),
            htlc_events: Mutex::new(Some(htlc_stream)),
        };

        let handles = MockHandles {
            channel_requests,
            channel_responses,
            htlc_requests,
            htlc_responses,
            channel_events,
            htlc_events,
        };

        (Arc::new(node), handles)
    }

    pub fn identity_pubkey(&self) -> &str {
        &self.identity.identity_pubkey
    }

    /// Register a graph node.
    pub fn add_node(&self, pubkey: &str, alias: &str, total_capacity: i64, num_channels: u32) {
        let info = NodeInfo {
            node: Some(LightningNode {
                pub_key: pubkey.to_string(),
                alias: alias.to_string(),
                ..Default::default()
            }),
            num_channels,
            total_capacity,
        };
        self.nodes.lock().insert(pubkey.to_string(), info);
    }

    /// Register a channel between us and `peer`.
    pub fn add_channel(&self, chan_id: u64, peer: &str) {
        let edge = ChannelEdge {
            channel_id: chan_id,
            node1_pub: self.identity.identity_pubkey.clone(),
            node2_pub: peer.to_string(),
            ..Default::default()
        };
        self.edges.lock().insert(chan_id, edge);
    }

    /// Hold every `get_chan_info(chan_id)` until the returned gate is notified.
    pub fn hold_channel(&self, chan_id: u64) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.held_channels.lock().insert(chan_id, gate.clone());
        gate
    }
}

fn take<T>(slot: &Mutex<Option<T>>) -> Result<T, NodeError> {
    slot.lock().take().ok_or(NodeError::StreamClosed)
}

#[async_trait]
impl NodeClient for MockNode {
    async fn get_info(&self) -> Result<GetInfoResponse, NodeError> {
        Ok(self.identity.clone())
    }

    async fn get_node_info(&self, pubkey: &str) -> Result<NodeInfo, NodeError> {
        self.nodes
            .lock()
            .get(pubkey)
            .cloned()
            .ok_or_else(|| tonic::Status::not_found(format!("unknown node {}", pubkey)).into())
    }

    async fn get_chan_info(&self, chan_id: u64) -> Result<ChannelEdge, NodeError> {
        let gate = self.held_channels.lock().get(&chan_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.edges
            .lock()
            .get(&chan_id)
            .cloned()
            .ok_or_else(|| tonic::Status::not_found(format!("unknown channel {}", chan_id)).into())
    }

    async fn channel_acceptor(&self) -> Result<ChannelAcceptor, NodeError> {
        take(&self.channel_acceptor)
    }

    async fn htlc_interceptor(&self) -> Result<HtlcInterceptor, NodeError> {
        take(&self.htlc_interceptor)
    }

    async fn subscribe_channel_events(&self) -> Result<EventStream<ChannelEventUpdate>, NodeError> {
        take(&self.channel_events)
    }

    async fn subscribe_htlc_events(&self) -> Result<EventStream<HtlcEvent>, NodeError> {
        take(&self.htlc_events)
    }
}

/// Connector handing out one prepared node, then failing.
pub struct MockConnector {
    node: Mutex<Option<Arc<MockNode>>>,
    attempts: AtomicUsize,
}

impl MockConnector {
    pub fn new(node: Arc<MockNode>) -> Self {
        MockConnector {
            node: Mutex::new(Some(node)),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Number of `connect` calls so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Arc<dyn NodeClient>, NodeError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.node.lock().take() {
            Some(node) => Ok(node as Arc<dyn NodeClient>),
            None => Err(tonic::Status::unavailable("connection refused").into()),
        }
    }
}
