#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SqliteMigration {
    pub version: i64,
    pub name: &'static str,
    pub up_sql: &'static str,
    pub down_sql: &'static str,
}

const MIGRATION_0001: SqliteMigration = SqliteMigration {
    version: 1,
    name: "initial_schema",
    up_sql: r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    password TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_email ON users (email);
CREATE INDEX IF NOT EXISTS idx_users_active ON users (is_active);

CREATE TABLE IF NOT EXISTS facebook_accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ad_account_id TEXT NOT NULL UNIQUE,
    account_name TEXT,
    key_vault_secret_name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_facebook_accounts_ad_account_id
    ON facebook_accounts (ad_account_id);

CREATE TABLE IF NOT EXISTS user_facebook_accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    facebook_account_id INTEGER NOT NULL REFERENCES facebook_accounts (id) ON DELETE CASCADE,
    assigned_at TEXT NOT NULL,
    assigned_by INTEGER REFERENCES users (id),
    is_active INTEGER NOT NULL DEFAULT 1,
    notes TEXT,
    UNIQUE (user_id, facebook_account_id)
);

CREATE INDEX IF NOT EXISTS idx_user_facebook_accounts_user_id
    ON user_facebook_accounts (user_id);
CREATE INDEX IF NOT EXISTS idx_user_facebook_accounts_facebook_id
    ON user_facebook_accounts (facebook_account_id);

CREATE TABLE IF NOT EXISTS api_cache (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ad_account_id TEXT NOT NULL,
    date_period TEXT NOT NULL,
    query_hash TEXT NOT NULL,
    result_json TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_api_cache_account_period
    ON api_cache (ad_account_id, date_period);
CREATE INDEX IF NOT EXISTS idx_api_cache_hash ON api_cache (query_hash);

CREATE TABLE IF NOT EXISTS conversation_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    user_prompt TEXT NOT NULL,
    full_prompt_sent TEXT NOT NULL,
    llm_response TEXT NOT NULL,
    llm_params TEXT,
    tokens_used INTEGER,
    estimated_cost_usd REAL,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conversation_user_session
    ON conversation_history (user_id, session_id);
CREATE INDEX IF NOT EXISTS idx_conversation_timestamp
    ON conversation_history (timestamp);

CREATE TABLE IF NOT EXISTS prompt_versions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    prompt_name TEXT NOT NULL,
    version TEXT NOT NULL,
    prompt_text TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    UNIQUE (prompt_name, version)
);

CREATE INDEX IF NOT EXISTS idx_prompt_name_version
    ON prompt_versions (prompt_name, version);
CREATE INDEX IF NOT EXISTS idx_prompt_active ON prompt_versions (is_active);

CREATE TABLE IF NOT EXISTS campaign_performance_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ad_account_id TEXT NOT NULL,
    campaign_id TEXT NOT NULL,
    campaign_name TEXT,
    date TEXT NOT NULL,
    metrics TEXT NOT NULL,
    facebook_account_id INTEGER REFERENCES facebook_accounts (id) ON DELETE SET NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_campaign_account_date
    ON campaign_performance_data (ad_account_id, date);
CREATE INDEX IF NOT EXISTS idx_campaign_id_date
    ON campaign_performance_data (campaign_id, date);

CREATE TABLE IF NOT EXISTS model_pricing (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    model_name TEXT NOT NULL,
    input_cost_per_1k_tokens REAL NOT NULL,
    output_cost_per_1k_tokens REAL NOT NULL,
    effective_date TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_model_pricing_model_date
    ON model_pricing (model_name, effective_date);

CREATE TABLE IF NOT EXISTS analysis_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER REFERENCES users (id) ON DELETE SET NULL,
    session_id TEXT,
    analysis_type TEXT NOT NULL,
    facebook_account_id INTEGER REFERENCES facebook_accounts (id) ON DELETE SET NULL,
    result_text TEXT NOT NULL,
    analysis_metadata TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_analysis_results_user_id ON analysis_results (user_id);
CREATE INDEX IF NOT EXISTS idx_analysis_results_type ON analysis_results (analysis_type);
"#,
    down_sql: r#"
DROP TABLE IF EXISTS analysis_results;
DROP TABLE IF EXISTS model_pricing;
DROP TABLE IF EXISTS campaign_performance_data;
DROP TABLE IF EXISTS prompt_versions;
DROP TABLE IF EXISTS conversation_history;
DROP TABLE IF EXISTS api_cache;
DROP TABLE IF EXISTS user_facebook_accounts;
DROP TABLE IF EXISTS facebook_accounts;
DROP TABLE IF EXISTS users;
"#,
};

const MIGRATIONS: [SqliteMigration; 1] = [MIGRATION_0001];

pub fn migrations() -> &'static [SqliteMigration] {
    &MIGRATIONS
}

pub fn migration(version: i64) -> Option<&'static SqliteMigration> {
    MIGRATIONS.iter().find(|entry| entry.version == version)
}

pub fn current_schema_version() -> i64 {
    MIGRATIONS.last().map(|entry| entry.version).unwrap_or(0)
}

/// Index names created by the schema, used by the schema checks
pub const EXPECTED_INDEXES: &[&str] = &[
    "idx_users_email",
    "idx_users_active",
    "idx_facebook_accounts_ad_account_id",
    "idx_user_facebook_accounts_user_id",
    "idx_user_facebook_accounts_facebook_id",
    "idx_api_cache_account_period",
    "idx_api_cache_hash",
    "idx_conversation_user_session",
    "idx_conversation_timestamp",
    "idx_prompt_name_version",
    "idx_prompt_active",
    "idx_campaign_account_date",
    "idx_campaign_id_date",
    "idx_model_pricing_model_date",
    "idx_analysis_results_user_id",
    "idx_analysis_results_type",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_are_contiguous_from_one() {
        for (index, entry) in migrations().iter().enumerate() {
            assert_eq!(entry.version, index as i64 + 1);
        }
        assert_eq!(current_schema_version(), migrations().len() as i64);
    }

    #[test]
    fn every_expected_index_is_created() {
        let up_sql: String = migrations().iter().map(|m| m.up_sql).collect();
        for index in EXPECTED_INDEXES {
            assert!(
                up_sql.contains(&format!("INDEX IF NOT EXISTS {index}")),
                "missing {index}"
            );
        }
    }
}
