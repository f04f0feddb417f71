// Copyright (c) 2026 hydrolog contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/hydrolog/hydrolog-rs

//! Data publisher - POSTs each cycle's record to an EnviroDIY-style portal
//!
//! One JSON object per cycle: the sampling-feature UUID, the record
//! timestamp, then a `channel-uuid: value` pair per observation. The
//! registration token rides in a header. Publish failures are reported to
//! the logger, which logs and counts them; a failed upload never aborts a
//! cycle, the record is already on the card.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::sensors::Observation;

/// Publish failure taxonomy.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The portal answered with a non-success status
    #[error("portal rejected record: HTTP {0}")]
    Rejected(u16),
    /// The request never completed
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Publishing capability the logger depends on.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish one cycle's observations.
    async fn publish(
        &self,
        timestamp: DateTime<FixedOffset>,
        observations: &[Observation],
    ) -> Result<(), PublishError>;
}

/// Publisher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Whether publishing is wired up at all
    pub enabled: bool,
    /// POST endpoint
    pub endpoint: String,
    /// Device registration token issued by the portal
    pub registration_token: String,
    /// Sampling feature UUID the channels belong to
    pub sampling_feature: Uuid,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://data.envirodiy.org/api/data-stream/".to_string(),
            registration_token: String::new(),
            sampling_feature: Uuid::nil(),
            timeout_secs: 30,
        }
    }
}

/// HTTP POST publisher.
pub struct HttpPublisher {
    client: reqwest::Client,
    config: PublishConfig,
}

impl HttpPublisher {
    /// Build a publisher from config. Fails only if the HTTP client cannot
    /// be constructed.
    pub fn new(config: PublishConfig) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn payload(
        &self,
        timestamp: DateTime<FixedOffset>,
        observations: &[Observation],
    ) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert(
            "sampling_feature".to_string(),
            serde_json::json!(self.config.sampling_feature),
        );
        map.insert(
            "timestamp".to_string(),
            serde_json::json!(timestamp.to_rfc3339()),
        );
        for obs in observations {
            map.insert(obs.channel.to_string(), serde_json::json!(obs.value));
        }
        serde_json::Value::Object(map)
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish(
        &self,
        timestamp: DateTime<FixedOffset>,
        observations: &[Observation],
    ) -> Result<(), PublishError> {
        let payload = self.payload(timestamp, observations);
        debug!(endpoint = %self.config.endpoint, "posting record");

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("TOKEN", &self.config.registration_token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Rejected(status.as_u16()));
        }
        info!(channels = observations.len(), status = status.as_u16(), "record published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn observation(channel: Uuid, value: f64) -> Observation {
        Observation {
            channel,
            code: "Atlas_Temp".into(),
            value,
            unit: "degreeCelsius".into(),
            resolution: 3,
        }
    }

    #[test]
    fn payload_maps_channel_uuids_to_values() {
        let feature = Uuid::new_v4();
        let publisher = HttpPublisher::new(PublishConfig {
            sampling_feature: feature,
            ..PublishConfig::default()
        })
        .unwrap();

        let ch = Uuid::new_v4();
        let stamp = FixedOffset::west_opt(6 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 14, 10, 30, 0)
            .unwrap();
        let payload = publisher.payload(stamp, &[observation(ch, 14.125)]);

        assert_eq!(payload["sampling_feature"], serde_json::json!(feature));
        assert_eq!(payload[ch.to_string()], serde_json::json!(14.125));
        assert!(payload["timestamp"]
            .as_str()
            .unwrap()
            .starts_with("2026-03-14T10:30:00"));
    }
}
