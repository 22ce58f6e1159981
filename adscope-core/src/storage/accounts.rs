use rusqlite::{OptionalExtension, Row, params};

use crate::storage::store::{bool_to_sqlite, now_text, timestamp_column};
use crate::storage::{FacebookAccount, NewFacebookAccount, Store, StoreResult};

const ACCOUNT_COLUMNS: &str =
    "fa.id, fa.ad_account_id, fa.account_name, fa.key_vault_secret_name, fa.created_at";

impl Store {
    pub fn create_facebook_account(
        &self,
        account: &NewFacebookAccount,
    ) -> StoreResult<FacebookAccount> {
        self.with_connection("create_facebook_account", |connection| {
            connection.execute(
                "INSERT INTO facebook_accounts (ad_account_id, account_name, key_vault_secret_name, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    account.ad_account_id.trim(),
                    account.account_name,
                    account.key_vault_secret_name,
                    now_text()
                ],
            )?;
            let id = connection.last_insert_rowid();
            connection.query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM facebook_accounts fa WHERE fa.id = ?1"),
                [id],
                account_from_row,
            )
        })
    }

    pub fn find_account_by_ad_account_id(
        &self,
        ad_account_id: &str,
    ) -> StoreResult<Option<FacebookAccount>> {
        self.with_connection("find_account_by_ad_account_id", |connection| {
            connection
                .query_row(
                    &format!(
                        "SELECT {ACCOUNT_COLUMNS} FROM facebook_accounts fa WHERE fa.ad_account_id = ?1"
                    ),
                    [ad_account_id.trim()],
                    account_from_row,
                )
                .optional()
        })
    }

    /// Grant a user access to an account. Re-assigning reactivates an old assignment.
    pub fn assign_account_to_user(
        &self,
        user_id: i64,
        facebook_account_id: i64,
        assigned_by: Option<i64>,
        notes: Option<&str>,
    ) -> StoreResult<()> {
        self.with_connection("assign_account_to_user", |connection| {
            connection.execute(
                "INSERT INTO user_facebook_accounts
                    (user_id, facebook_account_id, assigned_at, assigned_by, is_active, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (user_id, facebook_account_id) DO UPDATE SET
                    is_active = excluded.is_active,
                    assigned_at = excluded.assigned_at,
                    assigned_by = excluded.assigned_by,
                    notes = excluded.notes",
                params![
                    user_id,
                    facebook_account_id,
                    now_text(),
                    assigned_by,
                    bool_to_sqlite(true),
                    notes
                ],
            )?;
            Ok(())
        })
    }

    pub fn revoke_account_from_user(
        &self,
        user_id: i64,
        facebook_account_id: i64,
    ) -> StoreResult<bool> {
        self.with_connection("revoke_account_from_user", |connection| {
            let changed = connection.execute(
                "UPDATE user_facebook_accounts SET is_active = 0
                 WHERE user_id = ?1 AND facebook_account_id = ?2 AND is_active = 1",
                params![user_id, facebook_account_id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Accounts with an active assignment for the user, ordered by account name
    pub fn list_accounts_for_user(&self, user_id: i64) -> StoreResult<Vec<FacebookAccount>> {
        self.with_connection("list_accounts_for_user", |connection| {
            let mut statement = connection.prepare(&format!(
                "SELECT {ACCOUNT_COLUMNS}
                 FROM facebook_accounts fa
                 JOIN user_facebook_accounts ufa ON ufa.facebook_account_id = fa.id
                 WHERE ufa.user_id = ?1 AND ufa.is_active = 1
                 ORDER BY fa.account_name IS NULL, fa.account_name, fa.ad_account_id"
            ))?;
            let rows = statement.query_map([user_id], account_from_row)?;
            rows.collect()
        })
    }
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<FacebookAccount> {
    Ok(FacebookAccount {
        id: row.get(0)?,
        ad_account_id: row.get(1)?,
        account_name: row.get(2)?,
        key_vault_secret_name: row.get(3)?,
        created_at: timestamp_column(row, 4)?,
    })
}
