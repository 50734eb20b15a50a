//! Prediction notifier: concurrent fan-out of one push payload to many
//! subscriptions, with per-attempt isolation.
//!
//! Every subscription attempt is independent: one delivery failing (or
//! the store mutation it triggers) never cancels or blocks a sibling.
//! The aggregate settles only once every attempt has settled, and it
//! reports counts rather than erroring on partial failure. A transport
//! response of 404/410 marks the endpoint terminally invalid and the
//! subscription is pruned from the store; a prune that affects zero rows
//! means a concurrent dispatch already handled it.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use sqlx::PgPool;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db;
use crate::models::PushSubscription;
use crate::severity::PredictionTier;

// ---

/// Notification content sent to every targeted subscription.
#[derive(Debug, Clone, Serialize)]
pub struct PushPayload {
    // ---
    pub title: String,
    pub body: String,
    pub icon: &'static str,
    pub severity: PredictionTier,
    pub hours_until: i64,
    pub states: Vec<String>,
}

impl PushPayload {
    /// Classify a prediction into its presentation payload. The icon is
    /// content only; routing never looks at it.
    pub fn classify(
        tier: PredictionTier,
        title: String,
        body: String,
        hours_until: i64,
        states: Vec<String>,
    ) -> PushPayload {
        // ---
        PushPayload {
            title,
            body,
            icon: tier.icon(),
            severity: tier,
            hours_until,
            states,
        }
    }
}

/// Why one delivery attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The transport reported the endpoint permanently undeliverable
    /// (stale/unregistered); the subscription should be pruned.
    Gone,
    /// Any other failure; the subscription stays for a future attempt.
    Failed(String),
}

/// Seam to the notification transport, so fan-out behavior is testable
/// without a live push gateway.
pub trait PushTransport: Clone + Send + Sync + 'static {
    fn deliver(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Transport that relays payloads through the configured push gateway.
#[derive(Clone)]
pub struct HttpPushTransport {
    // ---
    client: reqwest::Client,
    gateway_url: String,
}

impl HttpPushTransport {
    pub fn new(client: reqwest::Client, gateway_url: String) -> Self {
        Self { client, gateway_url }
    }
}

impl PushTransport for HttpPushTransport {
    async fn deliver(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
    ) -> Result<(), DeliveryError> {
        // ---
        let body = serde_json::json!({
            "endpoint": subscription.endpoint,
            "keys": {
                "p256dh": subscription.p256dh,
                "auth": subscription.auth,
            },
            "payload": payload,
        });

        let response = self
            .client
            .post(&self.gateway_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::Failed(e.to_string()))?;

        match response.status().as_u16() {
            404 | 410 => Err(DeliveryError::Gone),
            s if response.status().is_success() => {
                debug!("delivered push to subscription {} ({})", subscription.id, s);
                Ok(())
            }
            s => Err(DeliveryError::Failed(format!("gateway returned status {s}"))),
        }
    }
}

// ---

/// Seam to the subscription rows this service may prune, mirroring the
/// transport seam so the terminal-invalid path is testable without a
/// live store.
pub trait SubscriptionStore: Send + Sync {
    /// Delete one subscription. `Ok(false)` means the row was already
    /// gone — a concurrent dispatch handled it, not an error.
    fn delete_subscription(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

impl SubscriptionStore for PgPool {
    async fn delete_subscription(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        db::delete_subscription(self, id).await
    }
}

// ---

/// One settled delivery attempt.
#[derive(Debug)]
pub struct DispatchOutcome {
    // ---
    pub subscription: PushSubscription,
    pub result: Result<(), DeliveryError>,
}

/// Aggregate result of one dispatch; never an error on partial failure.
#[derive(Debug, Serialize)]
pub struct DispatchStats {
    // ---
    pub total: usize,
    pub delivered: usize,
    pub pruned: usize,
}

/// Attempt delivery to every subscription concurrently and wait for all
/// attempts to settle. A slow attempt delays the aggregate but is bounded
/// by `per_attempt_timeout`; a timed-out attempt counts as a non-terminal
/// failure.
pub async fn fan_out<T: PushTransport>(
    transport: &T,
    subscriptions: Vec<PushSubscription>,
    payload: PushPayload,
    per_attempt_timeout: Duration,
) -> Vec<DispatchOutcome> {
    // ---
    let mut attempts = JoinSet::new();

    for subscription in subscriptions {
        let transport = transport.clone();
        let payload = payload.clone();
        attempts.spawn(async move {
            let result =
                match tokio::time::timeout(per_attempt_timeout, transport.deliver(&subscription, &payload))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(DeliveryError::Failed("delivery attempt timed out".into())),
                };
            DispatchOutcome { subscription, result }
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = attempts.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            // A panicked attempt settles as a loss for that subscription
            // only; siblings are unaffected.
            Err(e) => warn!("dispatch attempt task failed to settle cleanly: {}", e),
        }
    }
    outcomes
}

/// Fan out, prune terminally-invalid subscriptions, and roll up counts.
pub async fn dispatch<S: SubscriptionStore, T: PushTransport>(
    store: &S,
    transport: &T,
    subscriptions: Vec<PushSubscription>,
    payload: PushPayload,
    per_attempt_timeout: Duration,
) -> DispatchStats {
    // ---
    let total = subscriptions.len();
    let outcomes = fan_out(transport, subscriptions, payload, per_attempt_timeout).await;

    let mut delivered = 0;
    let mut pruned = 0;
    for outcome in outcomes {
        match outcome.result {
            Ok(()) => delivered += 1,
            Err(DeliveryError::Gone) => {
                match store.delete_subscription(outcome.subscription.id).await {
                    Ok(true) => {
                        pruned += 1;
                        debug!("pruned stale subscription {}", outcome.subscription.id);
                    }
                    // Zero rows: a concurrent dispatch already pruned it.
                    Ok(false) => pruned += 1,
                    Err(e) => warn!(
                        "failed to prune stale subscription {}: {}",
                        outcome.subscription.id, e
                    ),
                }
            }
            Err(DeliveryError::Failed(reason)) => {
                warn!(
                    "push delivery to subscription {} failed: {}",
                    outcome.subscription.id, reason
                );
            }
        }
    }

    DispatchStats { total, delivered, pruned }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use uuid::Uuid;

    fn subscription(endpoint: &str) -> PushSubscription {
        // ---
        PushSubscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            endpoint: endpoint.to_string(),
            p256dh: "key".into(),
            auth: "secret".into(),
        }
    }

    fn payload() -> PushPayload {
        // ---
        PushPayload::classify(
            PredictionTier::Enhanced,
            "Storm inbound".into(),
            "Large hail possible within 48 hours".into(),
            48,
            vec!["TX".into()],
        )
    }

    /// Transport scripted by endpoint name: "gone-*" is terminally
    /// invalid, "fail-*" errors, "slow-*" sleeps past any test timeout.
    #[derive(Clone)]
    struct StubTransport;

    impl PushTransport for StubTransport {
        async fn deliver(
            &self,
            subscription: &PushSubscription,
            _payload: &PushPayload,
        ) -> Result<(), DeliveryError> {
            // ---
            if subscription.endpoint.starts_with("gone-") {
                Err(DeliveryError::Gone)
            } else if subscription.endpoint.starts_with("fail-") {
                Err(DeliveryError::Failed("boom".into()))
            } else if subscription.endpoint.starts_with("slow-") {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(())
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn partial_failure_never_blocks_siblings() {
        // ---
        let subs = vec![
            subscription("ok-1"),
            subscription("gone-2"),
            subscription("ok-3"),
            subscription("gone-4"),
            subscription("ok-5"),
        ];

        let outcomes = fan_out(&StubTransport, subs, payload(), Duration::from_secs(1)).await;
        assert_eq!(outcomes.len(), 5, "every attempt must settle");

        let delivered = outcomes.iter().filter(|o| o.result.is_ok()).count();
        let gone = outcomes
            .iter()
            .filter(|o| o.result == Err(DeliveryError::Gone))
            .count();
        assert_eq!(delivered, 3);
        assert_eq!(gone, 2);

        // Exactly the gone-* endpoints are marked terminal
        for o in &outcomes {
            assert_eq!(
                o.result == Err(DeliveryError::Gone),
                o.subscription.endpoint.starts_with("gone-")
            );
        }
    }

    #[tokio::test]
    async fn non_terminal_failures_are_reported_not_terminal() {
        // ---
        let subs = vec![subscription("fail-1"), subscription("ok-2")];
        let outcomes = fan_out(&StubTransport, subs, payload(), Duration::from_secs(1)).await;

        let failed: Vec<_> = outcomes
            .iter()
            .filter(|o| matches!(o.result, Err(DeliveryError::Failed(_))))
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].subscription.endpoint, "fail-1");
    }

    #[tokio::test]
    async fn slow_attempts_time_out_as_non_terminal_failures() {
        // ---
        let subs = vec![subscription("slow-1"), subscription("ok-2")];
        let outcomes = fan_out(&StubTransport, subs, payload(), Duration::from_millis(20)).await;

        assert_eq!(outcomes.len(), 2);
        let slow = outcomes
            .iter()
            .find(|o| o.subscription.endpoint == "slow-1")
            .unwrap();
        assert!(matches!(slow.result, Err(DeliveryError::Failed(_))));
        let ok = outcomes
            .iter()
            .find(|o| o.subscription.endpoint == "ok-2")
            .unwrap();
        assert!(ok.result.is_ok());
    }

    /// Store that records deletions instead of touching Postgres. With
    /// `rows_already_gone` set it answers `Ok(false)`, the shape a
    /// concurrent dispatch leaves behind.
    #[derive(Default)]
    struct RecordingStore {
        deleted: std::sync::Mutex<Vec<Uuid>>,
        rows_already_gone: bool,
    }

    impl SubscriptionStore for RecordingStore {
        async fn delete_subscription(&self, id: Uuid) -> Result<bool, sqlx::Error> {
            // ---
            self.deleted.lock().unwrap().push(id);
            Ok(!self.rows_already_gone)
        }
    }

    #[tokio::test]
    async fn terminal_invalid_subscriptions_are_pruned_exactly() {
        // ---
        let subs = vec![
            subscription("ok-1"),
            subscription("gone-2"),
            subscription("ok-3"),
            subscription("gone-4"),
            subscription("ok-5"),
        ];
        let gone_ids: Vec<Uuid> = subs
            .iter()
            .filter(|s| s.endpoint.starts_with("gone-"))
            .map(|s| s.id)
            .collect();

        let store = RecordingStore::default();
        let stats = dispatch(
            &store,
            &StubTransport,
            subs.clone(),
            payload(),
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(stats.total, 5);
        assert_eq!(stats.delivered, 3);
        assert_eq!(stats.pruned, 2);

        // Exactly the two terminal-invalid subscriptions are removed
        let mut deleted = store.deleted.lock().unwrap().clone();
        deleted.sort();
        let mut expected = gone_ids.clone();
        expected.sort();
        assert_eq!(deleted, expected);

        // A second dispatch over the survivors reaches only the three
        let survivors: Vec<PushSubscription> = subs
            .into_iter()
            .filter(|s| !gone_ids.contains(&s.id))
            .collect();
        let again = dispatch(
            &store,
            &StubTransport,
            survivors,
            payload(),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(again.total, 3);
        assert_eq!(again.delivered, 3);
        assert_eq!(again.pruned, 0);
    }

    #[tokio::test]
    async fn duplicate_delete_counts_as_already_handled() {
        // ---
        let store = RecordingStore {
            rows_already_gone: true,
            ..Default::default()
        };

        let stats = dispatch(
            &store,
            &StubTransport,
            vec![subscription("gone-1")],
            payload(),
            Duration::from_secs(1),
        )
        .await;

        // Zero rows affected is not a dispatch failure
        assert_eq!(stats.pruned, 1);
        assert_eq!(stats.delivered, 0);
        assert_eq!(stats.total, 1);
    }

    #[tokio::test]
    async fn empty_target_set_settles_immediately() {
        // ---
        let outcomes = fan_out(&StubTransport, vec![], payload(), Duration::from_secs(1)).await;
        assert!(outcomes.is_empty());
    }

    #[test]
    fn classify_maps_tier_to_icon_only() {
        // ---
        let p = payload();
        assert_eq!(p.icon, PredictionTier::Enhanced.icon());
        assert_eq!(p.severity, PredictionTier::Enhanced);
    }
}
