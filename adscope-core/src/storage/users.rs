use rusqlite::{OptionalExtension, Row, params};

use crate::storage::store::{
    bool_to_sqlite, now_text, sqlite_to_bool, timestamp_column,
};
use crate::storage::{NewUser, Store, StoreResult, User};

const USER_COLUMNS: &str = "id, email, name, password, is_active, created_at, updated_at";

impl Store {
    pub fn create_user(&self, user: &NewUser) -> StoreResult<User> {
        self.with_connection("create_user", |connection| {
            let now = now_text();
            connection.execute(
                "INSERT INTO users (email, name, password, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![
                    user.email.trim().to_lowercase(),
                    user.name,
                    user.password_hash,
                    bool_to_sqlite(true),
                    now
                ],
            )?;
            let id = connection.last_insert_rowid();
            connection.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id],
                user_from_row,
            )
        })
    }

    /// Emails are compared case-insensitively
    pub fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.with_connection("find_user_by_email", |connection| {
            connection
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                    [email.trim().to_lowercase()],
                    user_from_row,
                )
                .optional()
        })
    }

    pub fn get_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        self.with_connection("get_user", |connection| {
            connection
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                    [user_id],
                    user_from_row,
                )
                .optional()
        })
    }

    pub fn set_user_active(&self, user_id: i64, active: bool) -> StoreResult<bool> {
        self.with_connection("set_user_active", |connection| {
            let changed = connection.execute(
                "UPDATE users SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
                params![bool_to_sqlite(active), now_text(), user_id],
            )?;
            Ok(changed > 0)
        })
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        password_hash: row.get(3)?,
        is_active: sqlite_to_bool(row.get(4)?),
        created_at: timestamp_column(row, 5)?,
        updated_at: timestamp_column(row, 6)?,
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

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: "Ana".to_string(),
            password_hash: "$argon2id$stub".to_string(),
        }
    }

    #[test]
    fn creates_and_finds_users_case_insensitively() {
        let store = store();
        let created = store.create_user(&new_user("Ana@Example.com")).unwrap();
        assert_eq!(created.email, "ana@example.com");
        assert!(created.is_active);

        let found = store.find_user_by_email("ANA@example.COM").unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(store.get_user(created.id).unwrap().unwrap().name, "Ana");
        assert!(store.get_user(created.id + 100).unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let store = store();
        store.create_user(&new_user("dup@example.com")).unwrap();
        let err = store.create_user(&new_user("dup@example.com")).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn deactivation_is_persisted() {
        let store = store();
        let user = store.create_user(&new_user("off@example.com")).unwrap();
        assert!(store.set_user_active(user.id, false).unwrap());
        assert!(!store.get_user(user.id).unwrap().unwrap().is_active);
    }
}
