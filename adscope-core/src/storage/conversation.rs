use rusqlite::{Row, params};

use crate::storage::store::{json_column, json_text, now_text, timestamp_column};
use crate::storage::{ConversationTurn, NewConversationTurn, Store, StoreResult};

const TURN_COLUMNS: &str = "id, session_id, user_id, user_prompt, full_prompt_sent, llm_response, \
     llm_params, tokens_used, estimated_cost_usd, timestamp";

impl Store {
    pub fn insert_turn(&self, turn: &NewConversationTurn) -> StoreResult<ConversationTurn> {
        self.with_connection("insert_turn", |connection| {
            connection.execute(
                "INSERT INTO conversation_history
                    (session_id, user_id, user_prompt, full_prompt_sent, llm_response,
                     llm_params, tokens_used, estimated_cost_usd, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    turn.session_id,
                    turn.user_id,
                    turn.user_prompt,
                    turn.full_prompt_sent,
                    turn.llm_response,
                    json_text(turn.llm_params.as_ref()),
                    turn.tokens_used,
                    turn.estimated_cost_usd,
                    now_text()
                ],
            )?;
            let id = connection.last_insert_rowid();
            connection.query_row(
                &format!("SELECT {TURN_COLUMNS} FROM conversation_history WHERE id = ?1"),
                [id],
                turn_from_row,
            )
        })
    }

    /// Turns of one session, oldest first
    pub fn list_turns(&self, user_id: i64, session_id: &str) -> StoreResult<Vec<ConversationTurn>> {
        self.with_connection("list_turns", |connection| {
            let mut statement = connection.prepare(&format!(
                "SELECT {TURN_COLUMNS} FROM conversation_history
                 WHERE user_id = ?1 AND session_id = ?2
                 ORDER BY timestamp ASC, id ASC"
            ))?;
            let rows = statement.query_map(params![user_id, session_id], turn_from_row)?;
            rows.collect()
        })
    }

    pub fn count_session_turns(&self, user_id: i64, session_id: &str) -> StoreResult<i64> {
        self.with_connection("count_session_turns", |connection| {
            connection.query_row(
                "SELECT COUNT(*) FROM conversation_history WHERE user_id = ?1 AND session_id = ?2",
                params![user_id, session_id],
                |row| row.get(0),
            )
        })
    }

    pub fn delete_session_turns(&self, user_id: i64, session_id: &str) -> StoreResult<usize> {
        self.with_connection("delete_session_turns", |connection| {
            connection.execute(
                "DELETE FROM conversation_history WHERE user_id = ?1 AND session_id = ?2",
                params![user_id, session_id],
            )
        })
    }
}

fn turn_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationTurn> {
    Ok(ConversationTurn {
        id: row.get(0)?,
        session_id: row.get(1)?,
        user_id: row.get(2)?,
        user_prompt: row.get(3)?,
        full_prompt_sent: row.get(4)?,
        llm_response: row.get(5)?,
        llm_params: json_column(row, 6)?,
        tokens_used: row.get(7)?,
        estimated_cost_usd: row.get(8)?,
        timestamp: timestamp_column(row, 9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NewUser;
    use serde_json::json;

    fn store_with_user() -> (Store, i64) {
        let store = Store::open_in_memory().unwrap();
        store.migrate_to_latest().unwrap();
        let user = store
            .create_user(&NewUser {
                email: "ana@example.com".to_string(),
                name: "Ana".to_string(),
                password_hash: "x".to_string(),
            })
            .unwrap();
        (store, user.id)
    }

    fn turn(user_id: i64, session: &str, prompt: &str) -> NewConversationTurn {
        NewConversationTurn {
            session_id: session.to_string(),
            user_id,
            user_prompt: prompt.to_string(),
            full_prompt_sent: format!("system\n{prompt}"),
            llm_response: format!("re: {prompt}"),
            llm_params: Some(json!({"model_name": "gpt-4o", "temperature": 0.7})),
            tokens_used: Some(42),
            estimated_cost_usd: None,
        }
    }

    #[test]
    fn turns_come_back_in_insertion_order_per_session() {
        let (store, user_id) = store_with_user();
        for prompt in ["one", "two", "three"] {
            store.insert_turn(&turn(user_id, "s1", prompt)).unwrap();
        }
        store.insert_turn(&turn(user_id, "s2", "other")).unwrap();

        let turns = store.list_turns(user_id, "s1").unwrap();
        let prompts: Vec<_> = turns.iter().map(|t| t.user_prompt.as_str()).collect();
        assert_eq!(prompts, vec!["one", "two", "three"]);
        assert_eq!(turns[0].llm_params.as_ref().unwrap()["model_name"], "gpt-4o");
        assert_eq!(turns[0].estimated_cost_usd, None);
        assert_eq!(store.count_session_turns(user_id, "s2").unwrap(), 1);
    }

    #[test]
    fn deleting_a_session_leaves_others() {
        let (store, user_id) = store_with_user();
        store.insert_turn(&turn(user_id, "s1", "a")).unwrap();
        store.insert_turn(&turn(user_id, "s2", "b")).unwrap();

        assert_eq!(store.delete_session_turns(user_id, "s1").unwrap(), 1);
        assert!(store.list_turns(user_id, "s1").unwrap().is_empty());
        assert_eq!(store.count_session_turns(user_id, "s2").unwrap(), 1);
    }

    #[test]
    fn turns_require_an_existing_user() {
        let (store, user_id) = store_with_user();
        let err = store.insert_turn(&turn(user_id + 1, "s1", "a")).unwrap_err();
        assert!(err.is_conflict());
    }
}
