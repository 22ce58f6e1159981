/// Defaults shared by the configuration loader
pub mod defaults {
    pub const CONFIG_FILE_NAME: &str = "adscope.toml";
    pub const BIND_ADDRESS: &str = "127.0.0.1:8000";
    pub const MAX_LIVE_SESSIONS: usize = 256;
    pub const DATABASE_PATH: &str = "adscope.db";
    pub const LOG_LEVEL: &str = "info";
    pub const LOG_FILE: &str = "logs/app.log";

    pub const MEMORY_TEMPERATURE: f32 = 0.1;
    pub const MEMORY_MAX_TOKEN_LIMIT: usize = 2000;

    pub const AGENT_TEMPERATURE: f32 = 0.7;
    pub const AGENT_MAX_TOKENS: u32 = 2000;
    pub const AGENT_MAX_ITERATIONS: usize = 5;

    pub const CACHE_EXPIRATION_HOURS: i64 = 1;
    /// One year
    pub const MAX_CACHE_EXPIRATION_HOURS: i64 = 24 * 366;

    pub const SYSTEM_PROMPT_SOURCE: &str = "database";
    pub const DEFAULT_PROMPT_FILE: &str = "prompts/default_system_prompt.txt";

    pub const REPORT_OUTPUT_DIR: &str = "reports";
}

/// Azure OpenAI endpoint settings
pub mod azure {
    pub const API_VERSION: &str = "2024-12-01-preview";
    pub const PROVIDER_NAME: &str = "azure_openai";
}

/// Facebook Graph API settings
pub mod graph_api {
    pub const BASE_URL: &str = "https://graph.facebook.com";
    pub const VERSION: &str = "v19.0";
    pub const PAGE_LIMIT: u32 = 100;

    pub const CAMPAIGN_FIELDS: &[&str] = &[
        "id",
        "account_id",
        "name",
        "objective",
        "status",
        "effective_status",
        "buying_type",
        "start_time",
        "stop_time",
        "created_time",
        "daily_budget",
        "lifetime_budget",
        "budget_remaining",
        "special_ad_categories",
    ];

    pub const INSIGHT_FIELDS: &[&str] = &[
        "spend",
        "impressions",
        "reach",
        "frequency",
        "actions",
        "cost_per_action_type",
        "action_values",
        "cpm",
        "inline_link_clicks",
        "cost_per_inline_link_click",
        "inline_link_click_ctr",
        "clicks",
        "cpc",
        "ctr",
    ];
}

/// Result indicators and the Graph API action types that can satisfy them
pub mod indicators {
    pub const CONVERSION: &str = "conversions:submit_application_website";
    pub const LEAD_FORM: &str = "actions:onsite_conversion.lead_grouped";
    pub const LINK_CLICK: &str = "actions:link_click";
    pub const NOT_AVAILABLE: &str = "N/A";
    pub const FALLBACK_PREFIX: &str = "fallback:";

    pub const ACTION_MAP: &[(&str, &[&str])] = &[
        (
            CONVERSION,
            &[
                "offsite_conversion.fb_pixel_custom",
                "submit_application_website",
                "offsite_conversion.fb_pixel_submit_application",
                "onsite_web_app_submit_application",
            ],
        ),
        (
            LEAD_FORM,
            &[
                "onsite_conversion.lead_grouped",
                "leadgen_grouped",
                "lead",
                "onsite_conversion.lead",
            ],
        ),
        (LINK_CLICK, &["link_click"]),
    ];

    pub fn action_candidates(indicator: &str) -> &'static [&'static str] {
        ACTION_MAP
            .iter()
            .find(|(name, _)| *name == indicator)
            .map(|(_, candidates)| *candidates)
            .unwrap_or(&[])
    }
}

/// Campaign type identifiers accepted by the analysis tool
pub mod campaign_types {
    pub const LEAD_FORM: &str = "lead_form";
    pub const TRAFFIC: &str = "traffic";
    pub const CONVERSION: &str = "conversion";
}

/// Tool names exposed to the model
pub mod tools {
    pub const LIST_AVAILABLE_CLIENTS: &str = "list_available_clients";
    pub const FACEBOOK_ADS_ANALYSIS: &str = "facebook_ads_analysis";
}

/// Prompt names and built-in texts
pub mod prompts {
    pub const SYSTEM_PROMPT_NAME: &str = "system";

    pub const FALLBACK_SYSTEM_PROMPT: &str = "You are a Digital Marketing expert and Facebook Ads campaign data analyst. \
Help the user analyze the performance of their advertising campaigns and provide valuable insights.";

    pub const SUMMARY_SYSTEM_PROMPT: &str = "You maintain a running summary of a conversation between a user and a \
digital marketing assistant. Keep account ids, periods, figures and decisions. Answer with the summary only.";

    pub const INVALID_MESSAGE_REPLY: &str = "Lo siento, el mensaje no es válido.";
    pub const EMPTY_ANSWER_REPLY: &str = "Lo siento, no pude procesar tu solicitud.";
    pub const ERROR_REPLY_PREFIX: &str = "Lo siento, ocurrió un error al procesar tu solicitud";
    pub const NO_SUMMARY_YET: &str = "No conversation summary available yet.";

    pub const REPORT_SYSTEM_PROMPT: &str =
        "Eres un experto en Marketing Digital y análisis de datos de campañas de Facebook Ads.";
}

/// Message role strings used on the wire
pub mod message_roles {
    pub const SYSTEM: &str = "system";
    pub const USER: &str = "user";
    pub const ASSISTANT: &str = "assistant";
    pub const TOOL: &str = "tool";
}

/// Storage identifiers
pub mod storage {
    pub const MIGRATIONS_TABLE: &str = "adscope_schema_migrations";
    pub const DEFAULT_PRICING_MODEL: &str = "default";
    pub const MONTHLY_COMPARISON: &str = "monthly_comparison";
}
