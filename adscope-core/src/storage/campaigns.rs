use chrono::NaiveDate;
use rusqlite::{Row, params};

use crate::storage::store::{date_column, date_text, json_column, now_text, timestamp_column};
use crate::storage::{CampaignPerformance, NewCampaignPerformance, Store, StoreResult};

const CAMPAIGN_COLUMNS: &str = "id, ad_account_id, campaign_id, campaign_name, date, metrics, \
     facebook_account_id, created_at";

impl Store {
    /// Insert a batch of snapshots in one transaction
    pub fn insert_campaign_performance(
        &self,
        records: &[NewCampaignPerformance],
    ) -> StoreResult<usize> {
        self.with_connection("insert_campaign_performance", |connection| {
            let transaction = connection.transaction()?;
            {
                let mut statement = transaction.prepare(
                    "INSERT INTO campaign_performance_data
                        (ad_account_id, campaign_id, campaign_name, date, metrics,
                         facebook_account_id, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )?;
                let now = now_text();
                for record in records {
                    statement.execute(params![
                        record.ad_account_id,
                        record.campaign_id,
                        record.campaign_name,
                        date_text(record.date),
                        record.metrics.to_string(),
                        record.facebook_account_id,
                        now
                    ])?;
                }
            }
            transaction.commit()?;
            Ok(records.len())
        })
    }

    /// Snapshots for an account with `from <= date <= to`, by date then campaign
    pub fn list_campaign_performance(
        &self,
        ad_account_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<CampaignPerformance>> {
        self.with_connection("list_campaign_performance", |connection| {
            let mut statement = connection.prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaign_performance_data
                 WHERE ad_account_id = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date, campaign_id, id"
            ))?;
            let rows = statement.query_map(
                params![ad_account_id, date_text(from), date_text(to)],
                campaign_from_row,
            )?;
            rows.collect()
        })
    }
}

fn campaign_from_row(row: &Row<'_>) -> rusqlite::Result<CampaignPerformance> {
    Ok(CampaignPerformance {
        id: row.get(0)?,
        ad_account_id: row.get(1)?,
        campaign_id: row.get(2)?,
        campaign_name: row.get(3)?,
        date: date_column(row, 4)?,
        metrics: json_column(row, 5)?.unwrap_or_default(),
        facebook_account_id: row.get(6)?,
        created_at: timestamp_column(row, 7)?,
    })
}
