use futures::StreamExt;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::domain::{ChannelAcceptEvent, Decision, FirewallEvent, FirewallPolicy, Verdict};
use crate::node::proto::lnrpc::{ChannelAcceptRequest, ChannelAcceptResponse};
use crate::node::{trim_pubkey, NodeError};
use crate::policy::decide_single;

use super::{cancelled, InterceptorContext};

/// Answer channel open requests one at a time until the stream fails or
/// the session is cancelled.
pub async fn run_channel_acceptor(
    ctx: InterceptorContext,
    mut cancel: watch::Receiver<bool>,
) -> Result<(), NodeError> {
    let mut acceptor = tokio::select! {
        acceptor = ctx.node.channel_acceptor() => acceptor?,
        _ = cancelled(&mut cancel) => return Ok(()),
    };

    info!("Listening for incoming channel requests");

    loop {
        let request = tokio::select! {
            next = acceptor.requests.next() => match next {
                Some(request) => request?,
                None => return Err(NodeError::StreamClosed),
            },
            _ = cancelled(&mut cancel) => return Ok(()),
        };

        let response = handle_channel_request(&ctx, &request).await;
        acceptor.send(response).await?;
    }
}

/// Decide on one channel request.
pub async fn handle_channel_request(
    ctx: &InterceptorContext,
    request: &ChannelAcceptRequest,
) -> ChannelAcceptResponse {
    let policy = ctx.policy();
    let pubkey = hex::encode(&request.node_pubkey);

    let stats = ctx.node_stats(&pubkey).await;
    let reputation = ctx.enricher.lookup(&policy.rules, &pubkey).await;
    let event = ChannelAcceptEvent::new(request, stats, reputation);

    let verdict = Verdict::new(
        decide_single(policy.channel_mode, policy.channel_list(), &event.pubkey),
        ctx.rules
            .apply(&policy.rules, &FirewallEvent::ChannelAccept(&event)),
    );
    let decision = verdict.decision();

    let alias = if event.alias.is_empty() {
        trim_pubkey(&event.pubkey)
    } else {
        event.alias.clone()
    };

    info!(
        decision = %decision,
        mode = %policy.channel_mode,
        list = verdict.list,
        script = verdict.script,
        alias = %alias,
        pubkey = %event.pubkey,
        funding_amt = event.funding_amt,
        private = event.private,
        pending_chan_id = %event.pending_chan_id,
        "Channel request {}",
        if decision.is_allowed() { "accepted" } else { "rejected" }
    );
    debug!(
        total_capacity = event.total_capacity,
        num_channels = event.num_channels,
        push_amt = event.push_amt,
        amboss_contact = event.reputation.amboss.socials.info.has_contact(),
        oneml_availability = event.reputation.oneml.noderank.availability,
        "Channel requester"
    );

    channel_response(request, decision, &policy)
}

/// Protocol response for `decision`, echoing the proposed parameters on accept.
pub fn channel_response(
    request: &ChannelAcceptRequest,
    decision: Decision,
    policy: &FirewallPolicy,
) -> ChannelAcceptResponse {
    match decision {
        Decision::Allow => ChannelAcceptResponse {
            accept: true,
            pending_chan_id: request.pending_chan_id.clone(),
            csv_delay: request.csv_delay,
            max_htlc_count: request.max_accepted_htlcs,
            reserve_sat: request.channel_reserve,
            in_flight_max_msat: request.max_value_in_flight,
            min_htlc_in: request.min_htlc,
            ..Default::default()
        },
        Decision::Deny => ChannelAcceptResponse {
            accept: false,
            pending_chan_id: request.pending_chan_id.clone(),
            error: policy.channel_reject_message.clone(),
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{context, OWN};
    use super::*;
    use crate::domain::PolicyMode;
    use crate::node::MockNode;
    use std::time::Duration;

    const PEER: [u8; 33] = [0x03; 33];

    fn request() -> ChannelAcceptRequest {
        ChannelAcceptRequest {
            node_pubkey: PEER.to_vec(),
            pending_chan_id: vec![0xaa; 32],
            funding_amt: 1_000_000,
            csv_delay: 144,
            max_accepted_htlcs: 483,
            channel_reserve: 10_000,
            max_value_in_flight: 990_000_000,
            min_htlc: 1,
            channel_flags: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_allow_wildcard_accepts() {
        let (node, _handles) = MockNode::new(OWN);
        let policy = FirewallPolicy {
            channel_mode: PolicyMode::Allowlist,
            channel_allowlist: vec!["*".to_string()],
            ..Default::default()
        };
        let (ctx, _policy) = context(node, policy);

        let response = handle_channel_request(&ctx, &request()).await;

        assert!(response.accept);
        assert_eq!(response.pending_chan_id, vec![0xaa; 32]);
        assert_eq!(response.csv_delay, 144);
        assert_eq!(response.max_htlc_count, 483);
        assert_eq!(response.reserve_sat, 10_000);
        assert_eq!(response.in_flight_max_msat, 990_000_000);
        assert_eq!(response.min_htlc_in, 1);
        assert!(response.error.is_empty());
    }

    #[tokio::test]
    async fn test_denied_pubkey_rejected_with_message() {
        let (node, _handles) = MockNode::new(OWN);
        let policy = FirewallPolicy {
            channel_mode: PolicyMode::Denylist,
            channel_denylist: vec![hex::encode(PEER)],
            channel_reject_message: "Contact me on telegram".to_string(),
            ..Default::default()
        };
        let (ctx, _policy) = context(node, policy);

        let response = handle_channel_request(&ctx, &request()).await;

        assert!(!response.accept);
        assert_eq!(response.error, "Contact me on telegram");
        assert_eq!(response.pending_chan_id, vec![0xaa; 32]);
    }

    #[tokio::test]
    async fn test_failing_rules_reject() {
        let (node, _handles) = MockNode::new(OWN);
        let mut policy = FirewallPolicy::default();
        policy.rules.apply = true;
        let (ctx, _policy) = context(node, policy);

        // Scripts directory does not exist, so evaluation fails closed.
        let response = handle_channel_request(&ctx, &request()).await;
        assert!(!response.accept);
    }

    #[tokio::test]
    async fn test_acceptor_loop_answers_in_order() {
        let (node, mut handles) = MockNode::new(OWN);
        node.add_node(&hex::encode(PEER), "alias-peer", 1234, 2);
        let policy = FirewallPolicy {
            channel_mode: PolicyMode::Allowlist,
            channel_allowlist: vec![hex::encode(PEER)],
            ..Default::default()
        };
        let (ctx, _policy) = context(node, policy);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let task = tokio::spawn(run_channel_acceptor(ctx, cancel_rx));

        let mut stranger = request();
        stranger.node_pubkey = vec![0x02; 33];
        stranger.pending_chan_id = vec![0xbb; 32];

        handles.channel_requests.send(Ok(request())).await.unwrap();
        handles.channel_requests.send(Ok(stranger)).await.unwrap();

        let first = handles.channel_responses.recv().await.unwrap();
        let second = handles.channel_responses.recv().await.unwrap();
        assert!(first.accept);
        assert!(!second.accept);
        assert_eq!(second.pending_chan_id, vec![0xbb; 32]);

        cancel_tx.send(true).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_acceptor_loop_ends_on_stream_error() {
        let (node, handles) = MockNode::new(OWN);
        let (ctx, _policy) = context(node, FirewallPolicy::default());
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        let task = tokio::spawn(run_channel_acceptor(ctx, cancel_rx));
        handles
            .channel_requests
            .send(Err(NodeError::StreamClosed))
            .await
            .unwrap();

        let result = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(NodeError::StreamClosed)));
    }
}
