use async_trait::async_trait;
use serde_json::{Value, json};
use std::fmt::Write as _;
use tracing::info;

use crate::config::constants::tools;
use crate::storage::{Store, User};
use crate::tools::{Tool, ToolError};

/// Lists the Facebook ad accounts assigned to a user
pub struct ListAvailableClientsTool {
    store: Store,
}

impl ListAvailableClientsTool {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Numeric ids resolve by primary key, anything else by email
    fn resolve_user(&self, user_ref: &str) -> Result<Option<User>, ToolError> {
        let user = match user_ref.parse::<i64>() {
            Ok(id) => self.store.get_user(id)?,
            Err(_) => self.store.find_user_by_email(user_ref)?,
        };
        Ok(user)
    }
}

fn user_reference(args: &Value) -> Option<String> {
    match args.get("user_id")? {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[async_trait]
impl Tool for ListAvailableClientsTool {
    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let user_ref = user_reference(&args)
            .ok_or_else(|| ToolError::invalid_arguments(self.name(), "user_id is required"))?;

        let accounts = match self.resolve_user(&user_ref)? {
            Some(user) => self.store.list_accounts_for_user(user.id)?,
            None => Vec::new(),
        };

        if accounts.is_empty() {
            return Ok(format!(
                "No Facebook advertising accounts found for user: {user_ref}"
            ));
        }

        let mut response = format!("Available Facebook advertising accounts for {user_ref}:\n\n");
        for (position, account) in accounts.iter().enumerate() {
            let name = account.account_name.as_deref().unwrap_or("Unnamed Account");
            let _ = writeln!(
                response,
                "{}. {name} (ID: {})",
                position + 1,
                account.ad_account_id
            );
        }

        info!(user = %user_ref, accounts = accounts.len(), "listed accounts");
        Ok(response)
    }

    fn name(&self) -> &'static str {
        tools::LIST_AVAILABLE_CLIENTS
    }

    fn description(&self) -> &'static str {
        "List all Facebook advertising accounts available to the user. Use this to discover which accounts can be analyzed."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_id": {
                    "type": "string",
                    "description": "User id or email to list the available accounts for"
                }
            },
            "required": ["user_id"]
        })
    }
}
