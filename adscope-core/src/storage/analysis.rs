use rusqlite::{Row, params};

use crate::storage::store::{json_column, json_text, now_text, timestamp_column};
use crate::storage::{AnalysisResult, NewAnalysisResult, Store, StoreResult};

const ANALYSIS_COLUMNS: &str = "id, user_id, session_id, analysis_type, facebook_account_id, \
     result_text, analysis_metadata, created_at";

impl Store {
    pub fn insert_analysis_result(
        &self,
        result: &NewAnalysisResult,
    ) -> StoreResult<AnalysisResult> {
        self.with_connection("insert_analysis_result", |connection| {
            connection.execute(
                "INSERT INTO analysis_results
                    (user_id, session_id, analysis_type, facebook_account_id,
                     result_text, analysis_metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    result.user_id,
                    result.session_id,
                    result.analysis_type,
                    result.facebook_account_id,
                    result.result_text,
                    json_text(result.analysis_metadata.as_ref()),
                    now_text()
                ],
            )?;
            let id = connection.last_insert_rowid();
            connection.query_row(
                &format!("SELECT {ANALYSIS_COLUMNS} FROM analysis_results WHERE id = ?1"),
                [id],
                analysis_from_row,
            )
        })
    }

    /// Results for a user, newest first
    pub fn list_analysis_results(&self, user_id: i64) -> StoreResult<Vec<AnalysisResult>> {
        self.with_connection("list_analysis_results", |connection| {
            let mut statement = connection.prepare(&format!(
                "SELECT {ANALYSIS_COLUMNS} FROM analysis_results
                 WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = statement.query_map([user_id], analysis_from_row)?;
            rows.collect()
        })
    }
}

fn analysis_from_row(row: &Row<'_>) -> rusqlite::Result<AnalysisResult> {
    Ok(AnalysisResult {
        id: row.get(0)?,
        user_id: row.get(1)?,
        session_id: row.get(2)?,
        analysis_type: row.get(3)?,
        facebook_account_id: row.get(4)?,
        result_text: row.get(5)?,
        analysis_metadata: json_column(row, 6)?,
        created_at: timestamp_column(row, 7)?,
    })
}
