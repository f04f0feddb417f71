// Copyright (c) 2026 hydrolog contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/hydrolog/hydrolog-rs

//! Clock sanity checks and network time synchronization
//!
//! The station stamps records in local standard time but keeps its internal
//! clock in UTC. Synchronization happens at boot when the battery is in the
//! Normal band, or unconditionally when the clock reads outside the
//! plausible deployment window (a dead RTC coin cell resets to 2000).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use tracing::{info, warn};

// Plausible deployment window: 2020-01-01 .. 2035-01-01 UTC.
const SANE_MIN: i64 = 1_577_836_800;
const SANE_MAX: i64 = 2_051_222_400;

/// Timekeeping capability the logger depends on.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current UTC time, corrections applied.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Whether the clock reads inside the plausible deployment window.
    fn is_sane(&self) -> bool;

    /// Synchronize against a network time reference.
    async fn sync(&mut self) -> Result<()>;
}

/// System clock with a measured network correction.
pub struct SystemClock {
    offset: Duration,
    time_url: String,
}

impl SystemClock {
    /// Clock syncing against the default NIST endpoint.
    pub fn new() -> Self {
        Self::with_endpoint("https://time.nist.gov")
    }

    /// Clock syncing against a custom HTTPS endpoint. Any server that sets
    /// a well-formed `Date` header works.
    pub fn with_endpoint(time_url: &str) -> Self {
        Self {
            offset: Duration::zero(),
            time_url: time_url.to_string(),
        }
    }

    /// Correction currently applied, in whole seconds.
    pub fn correction_secs(&self) -> i64 {
        self.offset.num_seconds()
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now() + self.offset
    }

    fn is_sane(&self) -> bool {
        let ts = self.now_utc().timestamp();
        (SANE_MIN..SANE_MAX).contains(&ts)
    }

    async fn sync(&mut self) -> Result<()> {
        let response = reqwest::Client::new()
            .head(&self.time_url)
            .send()
            .await
            .with_context(|| format!("reaching time reference {}", self.time_url))?;

        let date = response
            .headers()
            .get(reqwest::header::DATE)
            .context("time reference sent no Date header")?
            .to_str()
            .context("unreadable Date header")?;
        let reference = DateTime::parse_from_rfc2822(date)
            .with_context(|| format!("unparsable Date header {date:?}"))?;

        let measured = reference.with_timezone(&Utc) - Utc::now();
        if measured.num_seconds().abs() > 2 {
            warn!(drift_secs = measured.num_seconds(), "clock drift corrected");
        }
        self.offset = measured;
        info!(correction_secs = self.offset.num_seconds(), "clock synchronized");
        Ok(())
    }
}

/// Timezone for record timestamps, from a whole-hour offset.
///
/// Standard time only; daylight saving is never applied to field records.
pub fn record_timezone(offset_hours: i8) -> Result<FixedOffset> {
    FixedOffset::east_opt(offset_hours as i32 * 3600)
        .with_context(|| format!("timezone offset {offset_hours} out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_sane_today() {
        let clock = SystemClock::new();
        assert!(clock.is_sane());
    }

    #[test]
    fn huge_correction_breaks_sanity() {
        let mut clock = SystemClock::new();
        // Pretend the reference said we are decades ahead.
        clock.offset = Duration::days(20 * 365);
        assert!(!clock.is_sane());
    }

    #[test]
    fn record_timezone_range() {
        assert!(record_timezone(-6).is_ok());
        assert!(record_timezone(0).is_ok());
        assert!(record_timezone(100).is_err());
    }
}
