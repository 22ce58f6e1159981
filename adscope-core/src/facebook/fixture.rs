use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::facebook::{AdsInsightsSource, CampaignRow, FacebookError};

type PeriodKey = (String, NaiveDate, NaiveDate);

/// In-memory insights keyed by account and exact period.
///
/// Unknown periods return no rows. Every call is recorded so callers can
/// check whether a cache served the request instead.
#[derive(Default)]
pub struct FixtureInsightsSource {
    rows: Mutex<HashMap<PeriodKey, Vec<CampaignRow>>>,
    failures: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<PeriodKey>>,
}

impl FixtureInsightsSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        ad_account_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        rows: Vec<CampaignRow>,
    ) {
        self.rows
            .lock()
            .insert((ad_account_id.to_string(), start, end), rows);
    }

    /// Make every request for the account fail
    pub fn fail_account(&self, ad_account_id: &str, message: &str) {
        self.failures
            .lock()
            .insert(ad_account_id.to_string(), message.to_string());
    }

    pub fn calls(&self) -> Vec<(String, NaiveDate, NaiveDate)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl AdsInsightsSource for FixtureInsightsSource {
    async fn campaign_rows(
        &self,
        ad_account_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CampaignRow>, FacebookError> {
        let key = (ad_account_id.to_string(), start, end);
        self.calls.lock().push(key.clone());

        if let Some(message) = self.failures.lock().get(ad_account_id) {
            return Err(FacebookError::Api {
                status: 500,
                code: None,
                message: message.clone(),
            });
        }

        Ok(self.rows.lock().get(&key).cloned().unwrap_or_default())
    }
}
