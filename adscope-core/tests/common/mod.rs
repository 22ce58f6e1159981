#![allow(dead_code)]

use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;

use adscope_core::agent::AgentContext;
use adscope_core::clock::FixedClock;
use adscope_core::config::constants::prompts;
use adscope_core::config::{AgentConfig, MemoryConfig, PromptConfig, PromptSource};
use adscope_core::facebook::{CampaignRow, FixtureInsightsSource};
use adscope_core::llm::ScriptedProvider;
use adscope_core::storage::{NewFacebookAccount, NewModelPricing, NewUser, Store};

pub const SYSTEM_PROMPT: &str = "Eres un analista de campañas de Facebook Ads.";

/// In-memory store with one user, one assigned account and a seeded prompt,
/// a scripted model, canned insights and a clock frozen on 2024-05-15.
pub struct Harness {
    pub store: Store,
    pub llm: Arc<ScriptedProvider>,
    pub insights: Arc<FixtureInsightsSource>,
    pub clock: Arc<FixedClock>,
    pub user_id: i64,
    pub facebook_account_id: i64,
}

impl Harness {
    pub fn new() -> Self {
        let store = Store::open_in_memory().unwrap();
        store.migrate_to_latest().unwrap();
        let user = store
            .create_user(&NewUser {
                email: "ana@example.com".to_string(),
                name: "Ana".to_string(),
                password_hash: "unused".to_string(),
            })
            .unwrap();
        let account = store
            .create_facebook_account(&NewFacebookAccount {
                ad_account_id: "act_111".to_string(),
                account_name: Some("Inmobiliaria Canquén".to_string()),
                key_vault_secret_name: "fb-token-111".to_string(),
            })
            .unwrap();
        store
            .assign_account_to_user(user.id, account.id, None, None)
            .unwrap();
        store
            .create_prompt_version(prompts::SYSTEM_PROMPT_NAME, "v1", SYSTEM_PROMPT, true)
            .unwrap();

        Self {
            store,
            llm: Arc::new(ScriptedProvider::new("gpt-4o")),
            insights: Arc::new(FixtureInsightsSource::new()),
            clock: Arc::new(FixedClock::new(
                Utc.with_ymd_and_hms(2024, 5, 15, 10, 0, 0).unwrap(),
            )),
            user_id: user.id,
            facebook_account_id: account.id,
        }
    }

    pub fn context(&self) -> AgentContext {
        self.context_with(AgentConfig::default())
    }

    pub fn context_with(&self, agent: AgentConfig) -> AgentContext {
        AgentContext {
            store: self.store.clone(),
            llm: self.llm.clone(),
            insights: self.insights.clone(),
            clock: self.clock.clone(),
            agent,
            memory: MemoryConfig::default(),
            prompt: PromptConfig {
                source: PromptSource::Database,
                default_prompt_file: "/nonexistent/prompt.txt".to_string(),
            },
            cache_expiration_hours: 1,
        }
    }

    pub fn price_default_model(&self) {
        self.store
            .insert_model_pricing(&NewModelPricing {
                model_name: "default".to_string(),
                input_cost_per_1k_tokens: 0.01,
                output_cost_per_1k_tokens: 0.03,
                effective_date: date(2024, 1, 1),
            })
            .unwrap();
    }

    /// Lead form rows for April (last month) and March (previous month)
    pub fn seed_two_months(&self) {
        let (start, end) = (date(2024, 4, 1), date(2024, 4, 30));
        self.insights.insert(
            "act_111",
            start,
            end,
            vec![
                row("101", "Canquén 5 _Lead Form", 120000.0, 40, start, end),
                row("102", "Canquén 6 _Lead Form", 80000.0, 20, start, end),
            ],
        );
        let (start, end) = (date(2024, 3, 1), date(2024, 3, 31));
        self.insights.insert(
            "act_111",
            start,
            end,
            vec![row("101", "Canquén 5 _Lead Form", 100000.0, 25, start, end)],
        );
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn row(
    id: &str,
    name: &str,
    spend: f64,
    results: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> CampaignRow {
    serde_json::from_value(json!({
        "ID Campaña": id,
        "Inicio del informe": start,
        "Fin del informe": end,
        "Nombre de la campaña": name,
        "Objective": "OUTCOME_LEADS",
        "Resultados": results,
        "Indicador de resultado": "actions:onsite_conversion.lead_grouped",
        "Importe gastado (CLP)": spend,
        "CTR (porcentaje de clics en el enlace)": 1.25
    }))
    .unwrap()
}
