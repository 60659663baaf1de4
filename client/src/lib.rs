//! SDK for the stakebook hosted store.
//!
//! [`StoreClient`] implements the engine's [`stakebook_engine::PointsStore`]
//! seam over the store's REST surface and WebSocket change feed, so the
//! spin, claim, and diary state machines run unchanged against a live
//! deployment, the dev store, or an in-memory mock.

pub mod http;
pub mod recovery;
mod updates;

pub use http::StoreClient;
pub use recovery::{Recovery, RecoveryPolicy};

use thiserror::Error;

/// Error type for client construction and SDK-level operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("failed: {0}")]
    Failed(reqwest::StatusCode),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use stakebook_engine::mocks::MemoryStore;
    use stakebook_engine::{record_entry, BalanceListener, ClaimDesk, PointsStore, SpinEngine};
    use stakebook_simulator::Api;
    use stakebook_types::constants::{DIARY_ENTRY_BONUS, INITIAL_POINTS, SPIN_COST};
    use stakebook_types::{
        reward::CATALOG, ChangeKind, ClaimRecord, DiaryEntry, EntryKind, SpinDistribution,
        StoreError, UserId,
    };
    use tokio::time::{sleep, timeout};

    struct TestContext {
        store: Arc<MemoryStore>,
        base_url: String,
        server_handle: tokio::task::JoinHandle<()>,
    }

    impl TestContext {
        async fn new() -> Self {
            let api = Api::new(Arc::new(MemoryStore::new()));
            let store = api.store();

            // Start server on a random port.
            let addr = SocketAddr::from(([127, 0, 0, 1], 0));
            let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
            let actual_addr = listener.local_addr().unwrap();
            let base_url = format!("http://{actual_addr}");
            let router = api.router();

            let server_handle = tokio::spawn(async move {
                axum::serve(listener, router).await.unwrap();
            });

            // Give the server time to start.
            sleep(Duration::from_millis(50)).await;

            Self {
                store,
                base_url,
                server_handle,
            }
        }

        fn create_client(&self) -> StoreClient {
            StoreClient::new(&self.base_url).unwrap()
        }
    }

    impl Drop for TestContext {
        fn drop(&mut self) {
            self.server_handle.abort();
        }
    }

    #[tokio::test]
    async fn probe_reaches_a_live_store() {
        let ctx = TestContext::new().await;
        let client = ctx.create_client();
        client.probe().await.unwrap();
    }

    #[tokio::test]
    async fn balance_crud_round_trip() {
        let ctx = TestContext::new().await;
        let client = ctx.create_client();
        let user = UserId::random();

        // Missing row is the benign NotFound, not a failure.
        assert_eq!(
            client.get_balance(user).await.unwrap_err(),
            StoreError::NotFound
        );

        // Explicit creation, idempotent.
        assert_eq!(
            client.ensure_balance(user, INITIAL_POINTS).await.unwrap(),
            INITIAL_POINTS
        );
        assert_eq!(
            client.ensure_balance(user, 999).await.unwrap(),
            INITIAL_POINTS
        );

        assert_eq!(client.adjust_balance(user, 150).await.unwrap(), 200);
        assert_eq!(client.get_balance(user).await.unwrap(), 200);

        client.set_balance(user, 75).await.unwrap();
        assert_eq!(client.get_balance(user).await.unwrap(), 75);
    }

    #[tokio::test]
    async fn adjust_on_missing_row_is_not_found() {
        let ctx = TestContext::new().await;
        let client = ctx.create_client();
        assert_eq!(
            client.adjust_balance(UserId::random(), 10).await.unwrap_err(),
            StoreError::NotFound
        );
    }

    #[tokio::test]
    async fn claims_round_trip() {
        let ctx = TestContext::new().await;
        let client = ctx.create_client();
        let user = UserId::random();

        assert!(client.claims_for(user).await.unwrap().is_empty());
        let record = ClaimRecord {
            user_id: user,
            reward_name: "Virtual Trophy".into(),
            cost: 200,
            claimed_at: 1_700_000_000_000,
        };
        client.append_claim(record.clone()).await.unwrap();
        assert_eq!(client.claims_for(user).await.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn diary_entry_awards_the_bonus_over_http() {
        let ctx = TestContext::new().await;
        let client = ctx.create_client();
        let user = UserId::random();
        client.ensure_balance(user, INITIAL_POINTS).await.unwrap();

        let entry = DiaryEntry::new(
            user,
            "2025-12-24".into(),
            EntryKind::Poker,
            -40,
            "home game".into(),
        );
        let balance = record_entry(&client, entry).await.unwrap();
        assert_eq!(balance, INITIAL_POINTS + DIARY_ENTRY_BONUS);
    }

    #[tokio::test]
    async fn spin_settles_end_to_end_over_http() {
        let ctx = TestContext::new().await;
        let client = Arc::new(ctx.create_client());
        let user = UserId::random();
        client.ensure_balance(user, 400).await.unwrap();

        let engine = SpinEngine::new(client.clone());
        let report = engine
            .spin(user, &SpinDistribution::standard())
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.balance, 400 - SPIN_COST + report.total_delta);
        assert_eq!(client.get_balance(user).await.unwrap(), report.balance);
        assert_eq!(report.animation.stops.len(), 3);
    }

    #[tokio::test]
    async fn claim_settles_end_to_end_over_http() {
        let ctx = TestContext::new().await;
        let client = Arc::new(ctx.create_client());
        let user = UserId::random();
        client.ensure_balance(user, 500).await.unwrap();

        let desk = ClaimDesk::new(client.clone());
        let receipt = desk.claim(user, &CATALOG[3]).await.unwrap();
        assert_eq!(receipt.balance, 400);
        assert_eq!(client.claims_for(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn second_session_observes_a_write_through_the_feed() {
        let ctx = TestContext::new().await;
        let writer = ctx.create_client();
        let observer = Arc::new(ctx.create_client());
        let user = UserId::random();
        writer.ensure_balance(user, 100).await.unwrap();

        // Observer subscribes before the write, like a second open tab.
        let mut listener = BalanceListener::subscribe(observer, user, 100)
            .await
            .unwrap();

        writer.set_balance(user, 500).await.unwrap();

        let observed = timeout(Duration::from_secs(2), listener.changed())
            .await
            .expect("change event within the window")
            .unwrap();
        assert_eq!(observed, 500);
    }

    #[tokio::test]
    async fn row_deletion_reconciles_subscribers_to_zero() {
        let ctx = TestContext::new().await;
        let client = Arc::new(ctx.create_client());
        let user = UserId::random();
        client.ensure_balance(user, 80).await.unwrap();

        let mut feed = client.subscribe(user).await.unwrap();
        ctx.store.delete_balance(user).await;

        let event = timeout(Duration::from_secs(2), feed.recv())
            .await
            .expect("delete event within the window")
            .unwrap();
        assert_eq!(event.kind, ChangeKind::Delete);
        assert_eq!(event.effective_points(), 0);
    }

    /// Accepts connections but never writes a byte, so requests only ever
    /// end by deadline.
    async fn silent_listener() -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                if let Ok((socket, _)) = listener.accept().await {
                    held.push(socket);
                }
            }
        });
        (addr, handle)
    }

    #[tokio::test]
    async fn elapsed_deadline_maps_to_timeout() {
        let (addr, listener) = silent_listener().await;
        let client = StoreClient::with_timeouts(
            &format!("http://{addr}"),
            Duration::from_millis(100),
            Duration::from_millis(100),
        )
        .unwrap();

        let err = client.get_balance(UserId::random()).await.unwrap_err();
        assert_eq!(err, StoreError::Timeout);
        listener.abort();
    }

    #[tokio::test]
    async fn probe_gives_up_at_its_deadline() {
        let (addr, listener) = silent_listener().await;
        let client = StoreClient::with_timeouts(
            &format!("http://{addr}"),
            Duration::from_millis(100),
            Duration::from_millis(100),
        )
        .unwrap();

        let err = client.probe().await.unwrap_err();
        assert!(matches!(&err, Error::Reqwest(e) if e.is_timeout()), "got {err:?}");
        listener.abort();
    }

    #[tokio::test]
    async fn unreachable_store_maps_to_a_transport_failure() {
        // Nothing listens on this port; the failure must land in the
        // recovery-triggering bucket, not NotFound.
        let client = StoreClient::new("http://127.0.0.1:9").unwrap();
        let err = client.get_balance(UserId::random()).await.unwrap_err();
        assert!(err.needs_recovery(), "got {err:?}");
    }

    #[tokio::test]
    async fn non_http_scheme_is_rejected_at_construction() {
        let err = StoreClient::new("ftp://store.example").unwrap_err();
        assert!(matches!(err, Error::InvalidScheme(scheme) if scheme == "ftp"));
    }
}
