use futures::stream::FuturesUnordered;
use futures::StreamExt;
use std::future::Future;
use tokio::sync::{oneshot, watch};
use tracing::{error, info, warn};

use crate::domain::{Decision, FirewallEvent, FirewallPolicy, HtlcForwardEvent, Verdict};
use crate::node::proto::routerrpc::{
    CircuitKey, ForwardHtlcInterceptRequest, ForwardHtlcInterceptResponse,
};
use crate::node::NodeError;
use crate::policy::decide_pair;

use super::{cancelled, InterceptorContext};

/// Answer held HTLCs, one decision task per HTLC, until the stream fails or
/// the session is cancelled. Responses go out as decisions complete.
pub async fn run_htlc_interceptor(
    ctx: InterceptorContext,
    mut cancel: watch::Receiver<bool>,
) -> Result<(), NodeError> {
    let mut interceptor = tokio::select! {
        interceptor = ctx.node.htlc_interceptor() => interceptor?,
        _ = cancelled(&mut cancel) => return Ok(()),
    };

    info!("Listening for incoming HTLCs");

    let mut pending = FuturesUnordered::new();

    loop {
        tokio::select! {
            next = interceptor.requests.next() => {
                let request = match next {
                    Some(request) => request?,
                    None => return Err(NodeError::StreamClosed),
                };
                pending.push(dispatch(&ctx, request));
            }
            Some((key, decision)) = pending.next(), if !pending.is_empty() => {
                interceptor.send(forward_response(key, decision)).await?;
            }
            _ = cancelled(&mut cancel) => return Ok(()),
        }
    }
}

/// Spawn the decision task for one HTLC and return a future yielding its
/// circuit key and decision. A task that dies without reporting yields deny.
fn dispatch(
    ctx: &InterceptorContext,
    request: ForwardHtlcInterceptRequest,
) -> impl Future<Output = (CircuitKey, Decision)> {
    let key = request.incoming_circuit_key.unwrap_or_default();
    if request.incoming_circuit_key.is_none() {
        warn!("HTLC intercept request without circuit key");
    }

    let policy = ctx.policy();
    let ctx = ctx.clone();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let decision = decide_forward(&ctx, &policy, &request).await;
        let _ = tx.send(decision);
    });

    async move {
        match rx.await {
            Ok(decision) => (key, decision),
            Err(_) => {
                error!(
                    in_chan_id = key.chan_id,
                    htlc_id = key.htlc_id,
                    "HTLC decision task died, failing HTLC"
                );
                (key, Decision::Deny)
            }
        }
    }
}

/// Decide on one HTLC against a fixed policy snapshot.
pub async fn decide_forward(
    ctx: &InterceptorContext,
    policy: &FirewallPolicy,
    request: &ForwardHtlcInterceptRequest,
) -> Decision {
    let key = request.incoming_circuit_key.unwrap_or_default();
    let (from, to) = tokio::join!(
        ctx.resolve_peer(key.chan_id),
        ctx.resolve_peer(request.outgoing_requested_chan_id)
    );
    let event = HtlcForwardEvent::new(request, from, to);

    let verdict = Verdict::new(
        decide_pair(
            policy.forward_mode,
            policy.forward_list(),
            &event.incoming_channel,
            &event.outgoing_channel,
        ),
        ctx.rules
            .apply(&policy.rules, &FirewallEvent::HtlcForward(&event)),
    );
    let decision = verdict.decision();

    info!(
        decision = %decision,
        mode = %policy.forward_mode,
        list = verdict.list,
        script = verdict.script,
        in_chan_id = %event.incoming_channel,
        out_chan_id = %event.outgoing_channel,
        htlc_id = event.htlc_id,
        from = %event.from.alias,
        to = %event.to.alias,
        amount_msat = event.outgoing_amount_msat,
        fee_msat = event.fee_msat(),
        "HTLC forward {}",
        if decision.is_allowed() { "resumed" } else { "failed" }
    );

    decision
}

pub fn forward_response(key: CircuitKey, decision: Decision) -> ForwardHtlcInterceptResponse {
    ForwardHtlcInterceptResponse {
        incoming_circuit_key: Some(key),
        action: decision.forward_action() as i32,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{context, OWN};
    use super::*;
    use crate::domain::PolicyMode;
    use crate::node::proto::routerrpc::ResolveHoldForwardAction;
    use crate::node::{MockHandles, MockNode};
    use crate::rules::{Evaluator, RuleEngine, RuleError};
    use std::sync::Arc;
    use std::time::Duration;

    const IN_CHAN: u64 = 770495967390531585;
    const OUT_CHAN: u64 = 759495353533530113;
    const SLOW_CHAN: u64 = 800_000 << 40;

    /// Allows everything except one HTLC, on which it panics.
    #[derive(Debug)]
    struct PanicOnHtlc(u64);

    impl Evaluator for PanicOnHtlc {
        fn name(&self) -> &str {
            "panic-on-htlc"
        }

        fn evaluate(&self, event: &FirewallEvent<'_>) -> Result<bool, RuleError> {
            if let FirewallEvent::HtlcForward(htlc) = event {
                if htlc.htlc_id == self.0 {
                    panic!("rule backend crashed on htlc {}", htlc.htlc_id);
                }
            }
            Ok(true)
        }
    }

    async fn next_response(handles: &mut MockHandles) -> (u64, i32) {
        let response = tokio::time::timeout(Duration::from_secs(1), handles.htlc_responses.recv())
            .await
            .unwrap()
            .unwrap();
        (response.incoming_circuit_key.unwrap().htlc_id, response.action)
    }

    fn request(incoming: u64, outgoing: u64, htlc_id: u64) -> ForwardHtlcInterceptRequest {
        ForwardHtlcInterceptRequest {
            incoming_circuit_key: Some(CircuitKey {
                chan_id: incoming,
                htlc_id,
            }),
            outgoing_requested_chan_id: outgoing,
            incoming_amount_msat: 1_001_000,
            outgoing_amount_msat: 1_000_000,
            payment_hash: vec![0x11; 32],
            ..Default::default()
        }
    }

    fn node() -> (Arc<MockNode>, MockHandles) {
        let (node, handles) = MockNode::new(OWN);
        node.add_node("03alice", "alias-alice", 1234, 2);
        node.add_node("03bob", "alias-bob", 1234, 2);
        node.add_channel(IN_CHAN, "03alice");
        node.add_channel(OUT_CHAN, "03bob");
        (node, handles)
    }

    fn deny_pair() -> FirewallPolicy {
        FirewallPolicy {
            forward_mode: PolicyMode::Denylist,
            forward_denylist: vec!["700762x1327x1->690757x1005x1".to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_denied_pair_fails() {
        let (node, _handles) = node();
        let policy = deny_pair();
        let (ctx, _policy) = context(node, policy.clone());

        let decision = decide_forward(&ctx, &policy, &request(IN_CHAN, OUT_CHAN, 0)).await;
        assert_eq!(decision, Decision::Deny);
    }

    #[tokio::test]
    async fn test_other_pair_resumes() {
        let (node, _handles) = node();
        let policy = deny_pair();
        let (ctx, _policy) = context(node, policy.clone());

        let decision = decide_forward(&ctx, &policy, &request(OUT_CHAN, IN_CHAN, 0)).await;
        assert_eq!(decision, Decision::Allow);
    }

    #[tokio::test]
    async fn test_allowlisted_pair_resumes() {
        let (node, _handles) = node();
        let policy = FirewallPolicy {
            forward_mode: PolicyMode::Allowlist,
            forward_allowlist: vec!["700762x1327x1->690757x1005x1".to_string()],
            ..Default::default()
        };
        let (ctx, _policy) = context(node, policy.clone());

        assert_eq!(
            decide_forward(&ctx, &policy, &request(IN_CHAN, OUT_CHAN, 0)).await,
            Decision::Allow
        );
        assert_eq!(
            decide_forward(&ctx, &policy, &request(OUT_CHAN, IN_CHAN, 0)).await,
            Decision::Deny
        );
    }

    #[tokio::test]
    async fn test_unknown_channels_still_decided() {
        let (node, _handles) = MockNode::new(OWN);
        let policy = deny_pair();
        let (ctx, _policy) = context(node, policy.clone());

        let decision = decide_forward(&ctx, &policy, &request(IN_CHAN, OUT_CHAN, 0)).await;
        assert_eq!(decision, Decision::Deny);
    }

    #[test]
    fn test_forward_response() {
        let key = CircuitKey {
            chan_id: IN_CHAN,
            htlc_id: 9,
        };

        let resume = forward_response(key, Decision::Allow);
        assert_eq!(resume.incoming_circuit_key, Some(key));
        assert_eq!(resume.action, ResolveHoldForwardAction::Resume as i32);

        let fail = forward_response(key, Decision::Deny);
        assert_eq!(fail.action, ResolveHoldForwardAction::Fail as i32);
    }

    #[tokio::test]
    async fn test_interceptor_loop_answers_every_htlc() {
        let (node, mut handles) = node();
        let (ctx, _policy) = context(node, deny_pair());
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let task = tokio::spawn(run_htlc_interceptor(ctx, cancel_rx));

        handles
            .htlc_requests
            .send(Ok(request(IN_CHAN, OUT_CHAN, 1)))
            .await
            .unwrap();
        handles
            .htlc_requests
            .send(Ok(request(OUT_CHAN, IN_CHAN, 2)))
            .await
            .unwrap();

        let mut actions = Vec::new();
        for _ in 0..2 {
            let response = tokio::time::timeout(Duration::from_secs(1), handles.htlc_responses.recv())
                .await
                .unwrap()
                .unwrap();
            let key = response.incoming_circuit_key.unwrap();
            actions.push((key.htlc_id, response.action));
        }
        actions.sort();

        assert_eq!(
            actions,
            vec![
                (1, ResolveHoldForwardAction::Fail as i32),
                (2, ResolveHoldForwardAction::Resume as i32),
            ]
        );

        cancel_tx.send(true).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_dead_decision_task_fails_htlc() {
        let (node, mut handles) = node();
        let mut policy = FirewallPolicy::default();
        policy.rules.apply = true;
        let (mut ctx, _policy) = context(node, policy);
        ctx.rules = Arc::new(RuleEngine::new(Arc::new(PanicOnHtlc(1))));
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let task = tokio::spawn(run_htlc_interceptor(ctx, cancel_rx));

        handles
            .htlc_requests
            .send(Ok(request(IN_CHAN, OUT_CHAN, 1)))
            .await
            .unwrap();
        handles
            .htlc_requests
            .send(Ok(request(IN_CHAN, OUT_CHAN, 2)))
            .await
            .unwrap();

        let mut actions = vec![
            next_response(&mut handles).await,
            next_response(&mut handles).await,
        ];
        actions.sort();

        assert_eq!(
            actions,
            vec![
                (1, ResolveHoldForwardAction::Fail as i32),
                (2, ResolveHoldForwardAction::Resume as i32),
            ]
        );

        cancel_tx.send(true).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_slow_decision_does_not_hold_back_later_htlcs() {
        let (node, mut handles) = node();
        node.add_node("03carol", "alias-carol", 1234, 2);
        node.add_channel(SLOW_CHAN, "03carol");
        let gate = node.hold_channel(SLOW_CHAN);
        let (ctx, _policy) = context(node, deny_pair());
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let task = tokio::spawn(run_htlc_interceptor(ctx, cancel_rx));

        handles
            .htlc_requests
            .send(Ok(request(SLOW_CHAN, OUT_CHAN, 1)))
            .await
            .unwrap();
        handles
            .htlc_requests
            .send(Ok(request(IN_CHAN, OUT_CHAN, 2)))
            .await
            .unwrap();

        // HTLC 2 is answered while HTLC 1 is still resolving its peer.
        assert_eq!(
            next_response(&mut handles).await,
            (2, ResolveHoldForwardAction::Fail as i32)
        );
        let early = tokio::time::timeout(Duration::from_millis(50), handles.htlc_responses.recv()).await;
        assert!(early.is_err());

        gate.notify_one();
        assert_eq!(
            next_response(&mut handles).await,
            (1, ResolveHoldForwardAction::Resume as i32)
        );

        cancel_tx.send(true).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_interceptor_loop_ends_when_stream_closes() {
        let (node, handles) = node();
        let (ctx, _policy) = context(node, FirewallPolicy::default());
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        let task = tokio::spawn(run_htlc_interceptor(ctx, cancel_rx));
        drop(handles);

        let result = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(NodeError::StreamClosed)));
    }
}
