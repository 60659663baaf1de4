//! HTTP adapter implementing [`PointsStore`] against the hosted store's
//! REST surface, plus the WebSocket change-feed subscription.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use stakebook_engine::{BalanceFeed, PointsStore};
use stakebook_types::api::{AdjustBalanceRequest, EnsureBalanceRequest, SetBalanceRequest};
use stakebook_types::constants::{PROBE_TIMEOUT_MS, STORE_CALL_TIMEOUT_MS};
use stakebook_types::{Balance, ClaimRecord, DiaryEntry, StoreError, UserId};

use crate::{updates, Error, Result};

/// Client for one hosted store deployment.
///
/// Every call carries the store deadline (5 s by default); a hit deadline
/// surfaces as `StoreError::Timeout`, which the recovery policy treats like
/// any other network failure.
#[derive(Debug)]
pub struct StoreClient {
    base: Url,
    http: reqwest::Client,
    probe_timeout: Duration,
}

impl StoreClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeouts(
            base_url,
            Duration::from_millis(STORE_CALL_TIMEOUT_MS),
            Duration::from_millis(PROBE_TIMEOUT_MS),
        )
    }

    /// Client with custom call and probe deadlines.
    pub fn with_timeouts(base_url: &str, call: Duration, probe: Duration) -> Result<Self> {
        let base = Url::parse(base_url)?;
        match base.scheme() {
            "http" | "https" => {}
            other => return Err(Error::InvalidScheme(other.to_string())),
        }
        let http = reqwest::Client::builder().timeout(call).build()?;
        Ok(Self {
            base,
            http,
            probe_timeout: probe,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    /// WebSocket endpoint for the user's change feed.
    fn feed_url(&self, user: UserId) -> Result<Url> {
        let mut url = self.endpoint(&format!("ws/balance/{user}"))?;
        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| Error::InvalidScheme(scheme.to_string()))?;
        Ok(url)
    }

    /// Lightweight connectivity check with the short probe deadline.
    pub async fn probe(&self) -> Result<()> {
        let url = self.endpoint("healthz")?;
        let response = self
            .http
            .get(url)
            .timeout(self.probe_timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Failed(response.status()));
        }
        Ok(())
    }

    /// Maps a transport-level failure onto the store taxonomy.
    fn transport(err: reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::Timeout
        } else {
            StoreError::Transport(err.to_string())
        }
    }

    /// Folds non-2xx statuses into the store taxonomy. 404 is the benign
    /// no-row case; everything else is a rejection.
    async fn expect_ok(response: reqwest::Response) -> std::result::Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected(format!("{status}: {body}")));
        }
        Ok(response)
    }

    async fn balance_request(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<i64, StoreError> {
        let response = request.send().await.map_err(Self::transport)?;
        let response = Self::expect_ok(response).await?;
        let row: Balance = response.json().await.map_err(Self::transport)?;
        Ok(row.points)
    }

    fn bad_url(err: Error) -> StoreError {
        StoreError::Rejected(err.to_string())
    }
}

#[async_trait]
impl PointsStore for StoreClient {
    async fn get_balance(&self, user: UserId) -> std::result::Result<i64, StoreError> {
        let url = self.endpoint(&format!("balance/{user}")).map_err(Self::bad_url)?;
        self.balance_request(self.http.get(url)).await
    }

    async fn set_balance(&self, user: UserId, points: i64) -> std::result::Result<(), StoreError> {
        let url = self.endpoint(&format!("balance/{user}")).map_err(Self::bad_url)?;
        let response = self
            .http
            .put(url)
            .json(&SetBalanceRequest { points })
            .send()
            .await
            .map_err(Self::transport)?;
        Self::expect_ok(response).await?;
        Ok(())
    }

    async fn ensure_balance(
        &self,
        user: UserId,
        initial: i64,
    ) -> std::result::Result<i64, StoreError> {
        let url = self
            .endpoint(&format!("balance/{user}/ensure"))
            .map_err(Self::bad_url)?;
        self.balance_request(self.http.post(url).json(&EnsureBalanceRequest { initial }))
            .await
    }

    async fn adjust_balance(
        &self,
        user: UserId,
        delta: i64,
    ) -> std::result::Result<i64, StoreError> {
        let url = self
            .endpoint(&format!("balance/{user}/adjust"))
            .map_err(Self::bad_url)?;
        self.balance_request(self.http.post(url).json(&AdjustBalanceRequest { delta }))
            .await
    }

    async fn append_claim(&self, record: ClaimRecord) -> std::result::Result<(), StoreError> {
        let url = self.endpoint("claims").map_err(Self::bad_url)?;
        let response = self
            .http
            .post(url)
            .json(&record)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::expect_ok(response).await?;
        Ok(())
    }

    async fn claims_for(&self, user: UserId) -> std::result::Result<Vec<ClaimRecord>, StoreError> {
        let url = self.endpoint(&format!("claims/{user}")).map_err(Self::bad_url)?;
        let response = self.http.get(url).send().await.map_err(Self::transport)?;
        let response = Self::expect_ok(response).await?;
        response.json().await.map_err(Self::transport)
    }

    async fn insert_entry(&self, entry: DiaryEntry) -> std::result::Result<(), StoreError> {
        let url = self.endpoint("entries").map_err(Self::bad_url)?;
        let response = self
            .http
            .post(url)
            .json(&entry)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::expect_ok(response).await?;
        Ok(())
    }

    async fn subscribe(&self, user: UserId) -> std::result::Result<BalanceFeed, StoreError> {
        let url = self.feed_url(user).map_err(Self::bad_url)?;
        updates::connect(url).await
    }
}
