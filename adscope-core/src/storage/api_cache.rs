use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};

use crate::storage::store::{timestamp_column, timestamp_text};
use crate::storage::{CacheEntry, Store, StoreResult};

impl Store {
    /// Most recent entry for the key, regardless of age
    pub fn find_cache_entry(
        &self,
        ad_account_id: &str,
        date_period: &str,
        query_hash: &str,
    ) -> StoreResult<Option<CacheEntry>> {
        self.with_connection("find_cache_entry", |connection| {
            connection
                .query_row(
                    "SELECT id, ad_account_id, date_period, query_hash, result_json, created_at
                     FROM api_cache
                     WHERE ad_account_id = ?1 AND date_period = ?2 AND query_hash = ?3
                     ORDER BY created_at DESC, id DESC
                     LIMIT 1",
                    params![ad_account_id, date_period, query_hash],
                    cache_entry_from_row,
                )
                .optional()
        })
    }

    /// Store a payload under the key, dropping any previous entries for it
    pub fn replace_cache_entry(
        &self,
        ad_account_id: &str,
        date_period: &str,
        query_hash: &str,
        result_json: &str,
        created_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.with_connection("replace_cache_entry", |connection| {
            let transaction = connection.transaction()?;
            transaction.execute(
                "DELETE FROM api_cache
                 WHERE ad_account_id = ?1 AND date_period = ?2 AND query_hash = ?3",
                params![ad_account_id, date_period, query_hash],
            )?;
            transaction.execute(
                "INSERT INTO api_cache (ad_account_id, date_period, query_hash, result_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    ad_account_id,
                    date_period,
                    query_hash,
                    result_json,
                    timestamp_text(created_at)
                ],
            )?;
            transaction.commit()
        })
    }

    /// Delete entries created before `cutoff`; returns how many were removed
    pub fn purge_cache_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        self.with_connection("purge_cache_older_than", |connection| {
            connection.execute(
                "DELETE FROM api_cache WHERE created_at < ?1",
                [timestamp_text(cutoff)],
            )
        })
    }

    pub fn count_cache_entries(&self) -> StoreResult<i64> {
        self.with_connection("count_cache_entries", |connection| {
            connection.query_row("SELECT COUNT(*) FROM api_cache", [], |row| row.get(0))
        })
    }
}

fn cache_entry_from_row(row: &Row<'_>) -> rusqlite::Result<CacheEntry> {
    Ok(CacheEntry {
        id: row.get(0)?,
        ad_account_id: row.get(1)?,
        date_period: row.get(2)?,
        query_hash: row.get(3)?,
        result_json: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.migrate_to_latest().unwrap();
        store
    }

    #[test]
    fn replace_keeps_a_single_row_per_key() {
        let store = store();
        let now = Utc::now();
        store
            .replace_cache_entry("act_1", "2024-05", "abc", "[1]", now - Duration::hours(3))
            .unwrap();
        store
            .replace_cache_entry("act_1", "2024-05", "abc", "[2]", now)
            .unwrap();
        store
            .replace_cache_entry("act_1", "2024-04", "abc", "[3]", now)
            .unwrap();

        assert_eq!(store.count_cache_entries().unwrap(), 2);
        let entry = store.find_cache_entry("act_1", "2024-05", "abc").unwrap().unwrap();
        assert_eq!(entry.result_json, "[2]");
        assert!(store.find_cache_entry("act_2", "2024-05", "abc").unwrap().is_none());
    }

    #[test]
    fn purge_removes_only_older_rows() {
        let store = store();
        let now = Utc::now();
        store
            .replace_cache_entry("act_1", "2024-05", "old", "[]", now - Duration::hours(5))
            .unwrap();
        store
            .replace_cache_entry("act_1", "2024-05", "new", "[]", now)
            .unwrap();

        let removed = store.purge_cache_older_than(now - Duration::hours(1)).unwrap();
        assert_eq!(removed, 1);
        assert!(store.find_cache_entry("act_1", "2024-05", "new").unwrap().is_some());
    }
}
