use rusqlite::{OptionalExtension, Row, params};

use crate::storage::store::{bool_to_sqlite, now_text, sqlite_to_bool, timestamp_column};
use crate::storage::{PromptVersion, Store, StoreError, StoreResult};

const PROMPT_COLUMNS: &str = "id, prompt_name, version, prompt_text, is_active, created_at";

impl Store {
    pub fn create_prompt_version(
        &self,
        prompt_name: &str,
        version: &str,
        prompt_text: &str,
        activate: bool,
    ) -> StoreResult<PromptVersion> {
        let created = self.with_connection("create_prompt_version", |connection| {
            connection.execute(
                "INSERT INTO prompt_versions (prompt_name, version, prompt_text, is_active, created_at)
                 VALUES (?1, ?2, ?3, 0, ?4)",
                params![prompt_name, version, prompt_text, now_text()],
            )?;
            let id = connection.last_insert_rowid();
            connection.query_row(
                &format!("SELECT {PROMPT_COLUMNS} FROM prompt_versions WHERE id = ?1"),
                [id],
                prompt_from_row,
            )
        })?;

        if activate {
            self.activate_prompt_version(prompt_name, version)?;
            return Ok(PromptVersion {
                is_active: true,
                ..created
            });
        }
        Ok(created)
    }

    /// Active version of a prompt; the newest wins if several are flagged
    pub fn active_prompt(&self, prompt_name: &str) -> StoreResult<Option<PromptVersion>> {
        self.with_connection("active_prompt", |connection| {
            connection
                .query_row(
                    &format!(
                        "SELECT {PROMPT_COLUMNS} FROM prompt_versions
                         WHERE prompt_name = ?1 AND is_active = 1
                         ORDER BY created_at DESC, id DESC
                         LIMIT 1"
                    ),
                    [prompt_name],
                    prompt_from_row,
                )
                .optional()
        })
    }

    /// Make one version active and every other version of the same prompt inactive
    pub fn activate_prompt_version(&self, prompt_name: &str, version: &str) -> StoreResult<()> {
        let found = self.with_connection("activate_prompt_version", |connection| {
            let transaction = connection.transaction()?;
            transaction.execute(
                "UPDATE prompt_versions SET is_active = 0 WHERE prompt_name = ?1",
                [prompt_name],
            )?;
            let changed = transaction.execute(
                "UPDATE prompt_versions SET is_active = ?1 WHERE prompt_name = ?2 AND version = ?3",
                params![bool_to_sqlite(true), prompt_name, version],
            )?;
            if changed == 0 {
                // Leave the previous activation untouched.
                transaction.rollback()?;
                return Ok(false);
            }
            transaction.commit()?;
            Ok(true)
        })?;

        if found {
            Ok(())
        } else {
            Err(StoreError::not_found(format!(
                "prompt '{prompt_name}' version '{version}'"
            )))
        }
    }

    pub fn list_prompt_versions(&self, prompt_name: &str) -> StoreResult<Vec<PromptVersion>> {
        self.with_connection("list_prompt_versions", |connection| {
            let mut statement = connection.prepare(&format!(
                "SELECT {PROMPT_COLUMNS} FROM prompt_versions
                 WHERE prompt_name = ?1 ORDER BY created_at, id"
            ))?;
            let rows = statement.query_map([prompt_name], prompt_from_row)?;
            rows.collect()
        })
    }
}

fn prompt_from_row(row: &Row<'_>) -> rusqlite::Result<PromptVersion> {
    Ok(PromptVersion {
        id: row.get(0)?,
        prompt_name: row.get(1)?,
        version: row.get(2)?,
        prompt_text: row.get(3)?,
        is_active: sqlite_to_bool(row.get(4)?),
        created_at: timestamp_column(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.migrate_to_latest().unwrap();
        store
    }

    #[test]
    fn activation_is_exclusive_per_prompt_name() {
        let store = store();
        store.create_prompt_version("system", "v1", "first", true).unwrap();
        store.create_prompt_version("system", "v2", "second", true).unwrap();
        store.create_prompt_version("report", "v1", "report", true).unwrap();

        let active = store.active_prompt("system").unwrap().unwrap();
        assert_eq!(active.version, "v2");
        let flags: Vec<_> = store
            .list_prompt_versions("system")
            .unwrap()
            .into_iter()
            .map(|p| p.is_active)
            .collect();
        assert_eq!(flags, vec![false, true]);
        assert!(store.active_prompt("report").unwrap().unwrap().is_active);
    }

    #[test]
    fn activating_a_missing_version_keeps_the_current_one() {
        let store = store();
        store.create_prompt_version("system", "v1", "first", true).unwrap();
        let err = store.activate_prompt_version("system", "v9").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(store.active_prompt("system").unwrap().unwrap().version, "v1");
    }

    #[test]
    fn inactive_prompts_are_not_returned() {
        let store = store();
        store.create_prompt_version("system", "v1", "draft", false).unwrap();
        assert!(store.active_prompt("system").unwrap().is_none());
    }

    #[test]
    fn name_and_version_are_unique() {
        let store = store();
        store.create_prompt_version("system", "v1", "a", false).unwrap();
        assert!(
            store
                .create_prompt_version("system", "v1", "b", false)
                .unwrap_err()
                .is_conflict()
        );
    }
}
