//! Turns an alert post into one outbound call per eligible phone.

use std::collections::HashSet;
use std::sync::Arc;

use alarmcall_persistence::{CallWindowStore, PersistenceError};
use alarmcall_zvonok::{ZvonokClient, ZvonokError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::Value;
use tracing::{info, warn};

/// Something that can place a call to a phone.
#[async_trait]
pub trait CallDispatcher: Send + Sync {
    async fn create_call(&self, phone: &str) -> Result<Value, ZvonokError>;
}

#[async_trait]
impl CallDispatcher for ZvonokClient {
    async fn create_call(&self, phone: &str) -> Result<Value, ZvonokError> {
        ZvonokClient::create_call(self, phone).await
    }
}

/// Outcome of handling one channel post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerReport {
    /// False when the post came from a channel outside the allow-list.
    pub dispatched: bool,
    pub succeeded: Vec<String>,
    /// Phone and error message for each call the provider did not accept.
    pub failed: Vec<(String, String)>,
}

impl TriggerReport {
    pub fn ignored() -> Self {
        Self::default()
    }

    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Reacts to posts in alert channels by calling every eligible phone.
pub struct CallTrigger {
    windows: CallWindowStore,
    dispatcher: Arc<dyn CallDispatcher>,
    alert_channels: HashSet<i64>,
}

impl CallTrigger {
    pub fn new(
        windows: CallWindowStore,
        dispatcher: Arc<dyn CallDispatcher>,
        alert_channels: HashSet<i64>,
    ) -> Self {
        Self {
            windows,
            dispatcher,
            alert_channels,
        }
    }

    pub fn is_alert_channel(&self, channel_id: i64) -> bool {
        self.alert_channels.contains(&channel_id)
    }

    /// Handle a new post in `channel_id` observed at `now`.
    ///
    /// Calls are placed concurrently and independently: one failed call
    /// never prevents the others. Only a storage failure aborts the batch,
    /// and it does so before any call is placed.
    pub async fn on_channel_post(
        &self,
        channel_id: i64,
        now: DateTime<Utc>,
    ) -> Result<TriggerReport, PersistenceError> {
        if !self.is_alert_channel(channel_id) {
            info!(channel_id, "Post in a channel without alerts, ignoring");
            return Ok(TriggerReport::ignored());
        }

        let phones = self.windows.phones_eligible_at(now)?;
        info!(channel_id, count = phones.len(), phones = ?phones, "Setting calls for phones");

        let results = join_all(phones.iter().map(|phone| async move {
            (phone, self.dispatcher.create_call(phone).await)
        }))
        .await;

        let mut report = TriggerReport {
            dispatched: true,
            ..TriggerReport::default()
        };
        for (phone, result) in results {
            match result {
                Ok(_) => {
                    info!(phone = %phone, "Call created");
                    report.succeeded.push(phone.clone());
                }
                Err(e) => {
                    warn!(phone = %phone, error = %e, "Failed to create call");
                    report.failed.push((phone.clone(), e.to_string()));
                }
            }
        }
        Ok(report)
    }
}
