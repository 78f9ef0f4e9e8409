//! LND gRPC client.

pub mod auth;

pub use auth::{load_macaroon, load_tls_config, MacaroonInterceptor};

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::{Channel, ClientTlsConfig};
use tonic::{Request, Status};
use tracing::info;

use crate::config::Config;

use super::proto::lnrpc::{
    ChanInfoRequest, ChannelAcceptRequest, ChannelAcceptResponse, ChannelEdge,
    ChannelEventSubscription, ChannelEventUpdate, GetInfoRequest, GetInfoResponse,
    NodeInfo, NodeInfoRequest,
};
use super::proto::routerrpc::{
    ForwardHtlcInterceptRequest, ForwardHtlcInterceptResponse, HtlcEvent,
    SubscribeHtlcEventsRequest,
};
use super::{
    ChannelAcceptor, Connector, Duplex, EventStream, HtlcInterceptor, NodeClient, NodeError,
};

const GET_INFO: &str = "/lnrpc.Lightning/GetInfo";
const GET_NODE_INFO: &str = "/lnrpc.Lightning/GetNodeInfo";
const GET_CHAN_INFO: &str = "/lnrpc.Lightning/GetChanInfo";
const CHANNEL_ACCEPTOR: &str = "/lnrpc.Lightning/ChannelAcceptor";
const SUBSCRIBE_CHANNEL_EVENTS: &str = "/lnrpc.Lightning/SubscribeChannelEvents";
const HTLC_INTERCEPTOR: &str = "/routerrpc.Router/HtlcInterceptor";
const SUBSCRIBE_HTLC_EVENTS: &str = "/routerrpc.Router/SubscribeHtlcEvents";

/// Outbound buffer of each interceptor stream.
const RESPONSE_BUFFER: usize = 64;

type AuthedChannel = InterceptedService<Channel, MacaroonInterceptor>;

/// LND client over a single authenticated channel.
#[derive(Clone)]
pub struct LndClient {
    grpc: Grpc<AuthedChannel>,
    rpc_timeout: Duration,
}

impl LndClient {
    pub fn new(channel: Channel, macaroon: MacaroonInterceptor, rpc_timeout: Duration) -> Self {
        LndClient {
            grpc: Grpc::new(InterceptedService::new(channel, macaroon)),
            rpc_timeout,
        }
    }

    async fn ready(&self) -> Result<Grpc<AuthedChannel>, Status> {
        let mut grpc = self.grpc.clone();
        grpc.ready()
            .await
            .map_err(|e| Status::unknown(format!("service was not ready: {}", e)))?;
        Ok(grpc)
    }

    async fn unary<Req, Resp>(&self, request: Req, path: &'static str) -> Result<Resp, NodeError>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let call = async {
            let mut grpc = self.ready().await?;
            let codec: ProstCodec<Req, Resp> = ProstCodec::default();
            grpc.unary(Request::new(request), PathAndQuery::from_static(path), codec)
                .await
                .map(|response| response.into_inner())
        };

        match tokio::time::timeout(self.rpc_timeout, call).await {
            Ok(result) => result.map_err(NodeError::from),
            Err(_) => Err(NodeError::Timeout(self.rpc_timeout)),
        }
    }

    async fn server_streaming<Req, Resp>(
        &self,
        request: Req,
        path: &'static str,
    ) -> Result<EventStream<Resp>, NodeError>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = self.ready().await?;
        let codec: ProstCodec<Req, Resp> = ProstCodec::default();
        let response = grpc
            .server_streaming(Request::new(request), PathAndQuery::from_static(path), codec)
            .await?;

        Ok(response
            .into_inner()
            .map(|item| item.map_err(NodeError::from))
            .boxed())
    }

    /// Open a bidirectional stream sending `Out` and receiving `In`.
    ///
    /// LND only sends response headers with its first message, so this
    /// resolves once the first request arrives.
    async fn bidi<Out, In>(&self, path: &'static str) -> Result<Duplex<In, Out>, NodeError>
    where
        Out: prost::Message + Send + Sync + 'static,
        In: prost::Message + Default + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::channel::<Out>(RESPONSE_BUFFER);
        let mut grpc = self.ready().await?;
        let codec: ProstCodec<Out, In> = ProstCodec::default();
        let response = grpc
            .streaming(
                Request::new(ReceiverStream::new(rx)),
                PathAndQuery::from_static(path),
                codec,
            )
            .await?;

        Ok(Duplex {
            requests: response
                .into_inner()
                .map(|item| item.map_err(NodeError::from))
                .boxed(),
            responses: tx,
        })
    }
}

#[async_trait]
impl NodeClient for LndClient {
    async fn get_info(&self) -> Result<GetInfoResponse, NodeError> {
        self.unary(GetInfoRequest {}, GET_INFO).await
    }

    async fn get_node_info(&self, pubkey: &str) -> Result<NodeInfo, NodeError> {
        let request = NodeInfoRequest {
            pub_key: pubkey.to_string(),
            include_channels: false,
        };
        self.unary(request, GET_NODE_INFO).await
    }

    async fn get_chan_info(&self, chan_id: u64) -> Result<ChannelEdge, NodeError> {
        self.unary(ChanInfoRequest { chan_id }, GET_CHAN_INFO).await
    }

    async fn channel_acceptor(&self) -> Result<ChannelAcceptor, NodeError> {
        self.bidi::<ChannelAcceptResponse, ChannelAcceptRequest>(CHANNEL_ACCEPTOR)
            .await
    }

    async fn htlc_interceptor(&self) -> Result<HtlcInterceptor, NodeError> {
        self.bidi::<ForwardHtlcInterceptResponse, ForwardHtlcInterceptRequest>(HTLC_INTERCEPTOR)
            .await
    }

    async fn subscribe_channel_events(&self) -> Result<EventStream<ChannelEventUpdate>, NodeError> {
        self.server_streaming(ChannelEventSubscription {}, SUBSCRIBE_CHANNEL_EVENTS)
            .await
    }

    async fn subscribe_htlc_events(&self) -> Result<EventStream<HtlcEvent>, NodeError> {
        self.server_streaming(SubscribeHtlcEventsRequest {}, SUBSCRIBE_HTLC_EVENTS)
            .await
    }
}

/// Dials LND with credentials loaded once at startup.
#[derive(Debug, Clone)]
pub struct LndConnector {
    endpoint: String,
    tls: ClientTlsConfig,
    macaroon: MacaroonInterceptor,
    rpc_timeout: Duration,
}

impl LndConnector {
    /// Load TLS certificate and macaroon. Fails when either is unreadable.
    pub fn from_config(config: &Config) -> Result<Self, NodeError> {
        let tls = load_tls_config(&config.tls_cert_path, &config.tls_domain)?;
        let macaroon = load_macaroon(&config.macaroon_path)?;

        Ok(LndConnector {
            endpoint: endpoint_url(&config.host),
            tls,
            macaroon,
            rpc_timeout: config.rpc_timeout(),
        })
    }
}

#[async_trait]
impl Connector for LndConnector {
    async fn connect(&self) -> Result<Arc<dyn NodeClient>, NodeError> {
        let channel = Channel::from_shared(self.endpoint.clone())
            .map_err(|e| NodeError::Credentials(format!("invalid host {}: {}", self.endpoint, e)))?
            .tls_config(self.tls.clone())?
            .connect()
            .await?;

        info!(endpoint = %self.endpoint, "Connected to node");

        Ok(Arc::new(LndClient::new(
            channel,
            self.macaroon.clone(),
            self.rpc_timeout,
        )))
    }
}

/// `host:port` as an https URL; explicit schemes are kept.
fn endpoint_url(host: &str) -> String {
    if host.starts_with("https://") || host.starts_with("http://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}
