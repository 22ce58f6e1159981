//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "adscope",
    version,
    about = "Conversational analysis of Facebook Ads campaigns backed by an LLM agent"
)]
pub struct Cli {
    /// Configuration file path; defaults to ./adscope.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); overrides the configuration
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to bind, e.g. 0.0.0.0:8000
        #[arg(long)]
        bind: Option<String>,
    },

    /// Apply pending database migrations
    Migrate,

    /// Compare the last two months of lead form campaigns for an account
    Report {
        /// Ad account id, e.g. act_123456
        #[arg(long)]
        account: Option<String>,

        /// User the analysis is recorded for
        #[arg(long)]
        user_id: Option<i64>,

        /// Directory for the report file
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Store a system prompt version
    SeedPrompt {
        /// Version label, e.g. v2
        #[arg(long)]
        version: String,

        /// File holding the prompt text
        #[arg(long)]
        file: PathBuf,

        /// Prompt name
        #[arg(long, default_value = "system")]
        name: String,

        /// Make this the active version
        #[arg(long)]
        activate: bool,
    },

    /// Create a user with an argon2-hashed password
    CreateUser {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        password: String,
    },

    /// Register an ad account and assign it to a user
    AddAccount {
        #[arg(long)]
        user_id: i64,

        #[arg(long)]
        ad_account_id: String,

        #[arg(long)]
        name: Option<String>,

        /// Name of the secret holding the account's access token
        #[arg(long)]
        secret_name: String,

        /// Id of the user granting access
        #[arg(long)]
        assigned_by: Option<i64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_report_arguments() {
        let cli = Cli::try_parse_from([
            "adscope",
            "--log-level",
            "debug",
            "report",
            "--account",
            "act_1",
            "--user-id",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Report {
                account, user_id, ..
            } => {
                assert_eq!(account.as_deref(), Some("act_1"));
                assert_eq!(user_id, Some(3));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
