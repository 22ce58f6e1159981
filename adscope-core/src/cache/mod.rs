//! Time-bounded cache of campaign rows in the `api_cache` table

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::facebook::CampaignRow;
use crate::storage::{Store, StoreResult};

/// Request descriptor for one account, campaign type and period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightsQuery {
    pub ad_account_id: String,
    pub campaign_type: String,
    pub since: NaiveDate,
    pub until: NaiveDate,
}

impl InsightsQuery {
    pub fn new(
        ad_account_id: impl Into<String>,
        campaign_type: impl Into<String>,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Self {
        Self {
            ad_account_id: ad_account_id.into(),
            campaign_type: campaign_type.into(),
            since,
            until,
        }
    }

    /// `YYYY-MM` of the period start
    pub fn date_period(&self) -> String {
        self.since.format("%Y-%m").to_string()
    }

    /// Hex SHA-256 of the canonical descriptor.
    ///
    /// `serde_json` object keys serialize in sorted order, so the text is stable.
    pub fn query_hash(&self) -> String {
        let canonical = json!({
            "account": self.ad_account_id,
            "campaign_type": self.campaign_type,
            "since": self.since.format("%Y-%m-%d").to_string(),
            "until": self.until.format("%Y-%m-%d").to_string(),
        })
        .to_string();
        let digest = Sha256::digest(canonical.as_bytes());
        digest.iter().map(|byte| format!("{byte:02x}")).collect()
    }
}

#[derive(Clone)]
pub struct AdsCache {
    store: Store,
    clock: Arc<dyn Clock>,
    /// `None` when the window is too large to represent; entries then never expire
    expiration: Option<Duration>,
}

impl AdsCache {
    pub fn new(store: Store, clock: Arc<dyn Clock>, expiration_hours: i64) -> Self {
        Self {
            store,
            clock,
            expiration: Duration::try_hours(expiration_hours.max(0)),
        }
    }

    fn is_expired(&self, created_at: DateTime<Utc>) -> bool {
        self.expiration
            .and_then(|window| created_at.checked_add_signed(window))
            .is_some_and(|expires_at| expires_at <= self.clock.now())
    }

    /// Cached rows if a fresh entry exists. Storage and decode failures count as misses.
    pub fn get(&self, query: &InsightsQuery) -> Option<Vec<CampaignRow>> {
        let hash = query.query_hash();
        let entry = match self
            .store
            .find_cache_entry(&query.ad_account_id, &query.date_period(), &hash)
        {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!(account = %query.ad_account_id, period = %query.date_period(), "cache miss");
                return None;
            }
            Err(error) => {
                warn!(%error, "cache lookup failed");
                return None;
            }
        };

        if self.is_expired(entry.created_at) {
            debug!(
                account = %query.ad_account_id,
                period = %query.date_period(),
                "cache entry expired"
            );
            return None;
        }

        match serde_json::from_str::<Vec<CampaignRow>>(&entry.result_json) {
            Ok(rows) => {
                info!(
                    account = %query.ad_account_id,
                    period = %query.date_period(),
                    rows = rows.len(),
                    "using cached campaign data"
                );
                Some(rows)
            }
            Err(error) => {
                warn!(%error, id = entry.id, "discarding undecodable cache entry");
                None
            }
        }
    }

    /// Store rows for the query. Empty results are never cached.
    pub fn put(&self, query: &InsightsQuery, rows: &[CampaignRow]) -> StoreResult<bool> {
        if rows.is_empty() {
            return Ok(false);
        }
        let payload = serde_json::to_string(rows)?;
        self.store.replace_cache_entry(
            &query.ad_account_id,
            &query.date_period(),
            &query.query_hash(),
            &payload,
            self.clock.now(),
        )?;
        info!(
            account = %query.ad_account_id,
            period = %query.date_period(),
            rows = rows.len(),
            "cached campaign data"
        );
        Ok(true)
    }

    /// Remove entries past their expiration
    pub fn purge_expired(&self) -> StoreResult<usize> {
        let Some(cutoff) = self
            .expiration
            .and_then(|window| self.clock.now().checked_sub_signed(window))
        else {
            return Ok(0);
        };
        let removed = self.store.purge_cache_older_than(cutoff)?;
        if removed > 0 {
            info!(removed, "purged expired cache entries");
        }
        Ok(removed)
    }
}
