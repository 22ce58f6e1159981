use chrono::NaiveDate;
use rusqlite::{OptionalExtension, Row, params};

use crate::storage::store::{date_column, date_text, now_text, timestamp_column};
use crate::storage::{ModelPricing, NewModelPricing, Store, StoreResult};

const PRICING_COLUMNS: &str = "id, model_name, input_cost_per_1k_tokens, \
     output_cost_per_1k_tokens, effective_date, created_at, updated_at";

impl Store {
    pub fn insert_model_pricing(&self, pricing: &NewModelPricing) -> StoreResult<ModelPricing> {
        self.with_connection("insert_model_pricing", |connection| {
            let now = now_text();
            connection.execute(
                "INSERT INTO model_pricing
                    (model_name, input_cost_per_1k_tokens, output_cost_per_1k_tokens,
                     effective_date, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![
                    pricing.model_name,
                    pricing.input_cost_per_1k_tokens,
                    pricing.output_cost_per_1k_tokens,
                    date_text(pricing.effective_date),
                    now
                ],
            )?;
            let id = connection.last_insert_rowid();
            connection.query_row(
                &format!("SELECT {PRICING_COLUMNS} FROM model_pricing WHERE id = ?1"),
                [id],
                pricing_from_row,
            )
        })
    }

    /// Latest pricing row for the model that is already in effect on `on_date`
    pub fn pricing_for(
        &self,
        model_name: &str,
        on_date: NaiveDate,
    ) -> StoreResult<Option<ModelPricing>> {
        self.with_connection("pricing_for", |connection| {
            connection
                .query_row(
                    &format!(
                        "SELECT {PRICING_COLUMNS} FROM model_pricing
                         WHERE model_name = ?1 AND effective_date <= ?2
                         ORDER BY effective_date DESC, id DESC
                         LIMIT 1"
                    ),
                    params![model_name, date_text(on_date)],
                    pricing_from_row,
                )
                .optional()
        })
    }
}

fn pricing_from_row(row: &Row<'_>) -> rusqlite::Result<ModelPricing> {
    Ok(ModelPricing {
        id: row.get(0)?,
        model_name: row.get(1)?,
        input_cost_per_1k_tokens: row.get(2)?,
        output_cost_per_1k_tokens: row.get(3)?,
        effective_date: date_column(row, 4)?,
        created_at: timestamp_column(row, 5)?,
        updated_at: timestamp_column(row, 6)?,
    })
}
