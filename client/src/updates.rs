//! Change-feed subscription over WebSocket.
//!
//! The connection is wrapped in a reader task that decodes JSON
//! [`ChangeEvent`]s into the feed channel; dropping the returned
//! [`BalanceFeed`] aborts the reader, closing the subscription.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, trace, warn};
use url::Url;

use stakebook_engine::BalanceFeed;
use stakebook_types::constants::STORE_CALL_TIMEOUT_MS;
use stakebook_types::{ChangeEvent, StoreError};

const FEED_CHANNEL_CAPACITY: usize = 256;

/// Dials the feed endpoint and spawns the reader task.
pub(crate) async fn connect(url: Url) -> Result<BalanceFeed, StoreError> {
    let dial = connect_async(url.as_str());
    let (ws, _response) = timeout(Duration::from_millis(STORE_CALL_TIMEOUT_MS), dial)
        .await
        .map_err(|_| StoreError::Timeout)?
        .map_err(|err| StoreError::Transport(err.to_string()))?;

    let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
    let handle = tokio::spawn(async move {
        let mut ws = ws;
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Text(payload)) => {
                    trace!(len = payload.len(), "change feed message");
                    match serde_json::from_str::<ChangeEvent>(&payload) {
                        Ok(event) => {
                            if tx.send(event).await.is_err() {
                                break; // Receiver dropped.
                            }
                        }
                        Err(err) => {
                            warn!(error = %err, "failed to decode change event");
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("change feed closed by the store");
                    break;
                }
                Ok(_) => {} // Ignore ping/pong/binary.
                Err(err) => {
                    warn!(error = %err, "change feed socket error");
                    break;
                }
            }
        }
    });

    Ok(BalanceFeed::new(rx, handle))
}
