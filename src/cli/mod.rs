//! Command handlers

mod args;

pub use args::{Cli, Commands};

use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use adscope_core::analysis::{MonthlyComparison, ReportOutcome};
use adscope_core::cache::AdsCache;
use adscope_core::clock::{Clock, SystemClock};
use adscope_core::config::constants::defaults;
use adscope_core::config::{AdscopeConfig, ConfigManager, load_dotenv};
use adscope_core::facebook::{GraphApiClient, normalize_account_id};
use adscope_core::llm::AzureOpenAIProvider;
use adscope_core::storage::password::hash_password;
use adscope_core::storage::{NewFacebookAccount, NewUser, Store};

use crate::logging::init_logging;
use crate::server::{self, AppState};

pub async fn run(cli: Cli) -> Result<()> {
    load_dotenv()?;
    let manager = match &cli.config {
        Some(path) => ConfigManager::load_from_file(path)?,
        None => ConfigManager::load()?,
    };
    let config_path = manager.config_path().map(Path::to_path_buf);
    let config = manager.into_config();
    init_logging(&config.logging, cli.log_level.as_deref())?;
    match &config_path {
        Some(path) => info!(path = %path.display(), "loaded configuration"),
        None => info!("no configuration file found, using defaults and environment"),
    }

    match cli.command {
        Commands::Serve { bind } => serve(config, bind).await,
        Commands::Migrate => migrate(&config),
        Commands::Report {
            account,
            user_id,
            output_dir,
        } => report(&config, account, user_id, output_dir).await,
        Commands::SeedPrompt {
            version,
            file,
            name,
            activate,
        } => seed_prompt(&config, &name, &version, &file, activate),
        Commands::CreateUser {
            email,
            name,
            password,
        } => create_user(&config, &email, &name, &password),
        Commands::AddAccount {
            user_id,
            ad_account_id,
            name,
            secret_name,
            assigned_by,
        } => add_account(&config, user_id, &ad_account_id, name, &secret_name, assigned_by),
    }
}

/// Open the configured database and bring its schema up to date
pub fn open_store(config: &AdscopeConfig) -> Result<Store> {
    let store = Store::open(&config.database.path)
        .with_context(|| format!("Failed to open database {}", config.database.path))?;
    store
        .migrate_to_latest()
        .context("Failed to migrate database")?;
    Ok(store)
}

async fn serve(config: AdscopeConfig, bind: Option<String>) -> Result<()> {
    let store = open_store(&config)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let llm = Arc::new(
        AzureOpenAIProvider::new(&config.azure_openai)
            .context("Azure OpenAI is not configured")?,
    );
    let insights = Arc::new(
        GraphApiClient::new(&config.facebook).context("Facebook API is not configured")?,
    );

    let purged = AdsCache::new(store.clone(), clock.clone(), config.cache.expiration_hours)
        .purge_expired()
        .context("Failed to purge expired cache entries")?;
    info!(purged, "cache ready");

    let bind_address = bind.unwrap_or_else(|| config.server.bind_address.clone());
    let state = AppState::new(config, store, llm, insights, clock);
    server::serve(state, &bind_address).await
}

fn migrate(config: &AdscopeConfig) -> Result<()> {
    let store = Store::open(&config.database.path)
        .with_context(|| format!("Failed to open database {}", config.database.path))?;
    let before = store.current_version()?;
    for migration in store.planned_migrations(before) {
        println!("applying migration {} ({})", migration.version, migration.name);
    }
    store.migrate_to_latest()?;
    println!(
        "database {} is at schema version {}",
        config.database.path,
        store.current_version()?
    );
    Ok(())
}

async fn report(
    config: &AdscopeConfig,
    account: Option<String>,
    user_id: Option<i64>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let account = account
        .or_else(|| config.facebook.default_ad_account_id.clone())
        .ok_or_else(|| anyhow!("Pass --account or set FACEBOOK_AD_ACCOUNT_ID"))?;
    let store = open_store(config)?;
    let llm = Arc::new(
        AzureOpenAIProvider::new(&config.azure_openai)
            .context("Azure OpenAI is not configured")?,
    );
    let insights = Arc::new(
        GraphApiClient::new(&config.facebook).context("Facebook API is not configured")?,
    );
    let comparison = MonthlyComparison::new(
        insights,
        llm,
        store,
        Arc::new(SystemClock),
        config.agent.clone(),
        output_dir.unwrap_or_else(|| PathBuf::from(defaults::REPORT_OUTPUT_DIR)),
    );

    match comparison.run(&account, user_id).await? {
        ReportOutcome::Generated(report) => {
            println!("{}\n", report.conclusion);
            println!("report saved to {}", report.path.display());
        }
        ReportOutcome::Skipped {
            last_month_rows,
            previous_month_rows,
        } => {
            println!(
                "no analysis generated: lead form data is missing for one or both months \
                 (last month: {last_month_rows} campaigns, previous month: {previous_month_rows} campaigns)"
            );
        }
    }
    Ok(())
}

fn seed_prompt(
    config: &AdscopeConfig,
    name: &str,
    version: &str,
    file: &Path,
    activate: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read prompt file {}", file.display()))?;
    let text = text.trim();
    if text.is_empty() {
        return Err(anyhow!("Prompt file {} is empty", file.display()));
    }

    let store = open_store(config)?;
    let prompt = store.create_prompt_version(name, version, text, activate)?;
    println!(
        "stored prompt '{}' version {} ({} chars, active: {})",
        prompt.prompt_name,
        prompt.version,
        prompt.prompt_text.len(),
        prompt.is_active
    );
    Ok(())
}

fn create_user(config: &AdscopeConfig, email: &str, name: &str, password: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(anyhow!("Password must be at least 8 characters"));
    }
    let store = open_store(config)?;
    let user = store.create_user(&NewUser {
        email: email.to_string(),
        name: name.to_string(),
        password_hash: hash_password(password)?,
    })?;
    println!("created user {} <{}>", user.id, user.email);
    Ok(())
}

fn add_account(
    config: &AdscopeConfig,
    user_id: i64,
    ad_account_id: &str,
    name: Option<String>,
    secret_name: &str,
    assigned_by: Option<i64>,
) -> Result<()> {
    let store = open_store(config)?;
    store
        .get_user(user_id)?
        .ok_or_else(|| anyhow!("User {user_id} not found"))?;

    let ad_account_id = normalize_account_id(ad_account_id);
    let account = match store.find_account_by_ad_account_id(&ad_account_id)? {
        Some(account) => account,
        None => store.create_facebook_account(&NewFacebookAccount {
            ad_account_id: ad_account_id.clone(),
            account_name: name,
            key_vault_secret_name: secret_name.to_string(),
        })?,
    };
    store.assign_account_to_user(user_id, account.id, assigned_by, None)?;
    println!("assigned {} to user {user_id}", account.ad_account_id);
    Ok(())
}
