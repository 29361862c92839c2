//! Command-line argument parsing for SQL Explorer.

use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;
use crate::present::OutputFormat;
use crate::shell::Command;

/// Explore a SQLite database with SQL or plain-language questions.
///
/// With --query or --ask the steps run once and the program exits; otherwise
/// an interactive shell reads commands from stdin.
#[derive(Parser, Debug)]
#[command(name = "sql-explorer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// SQLite database to upload (.db, .sqlite, .sqlite3)
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// SQL script to import (.sql)
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// SQL query to run once
    #[arg(long, value_name = "SQL")]
    pub query: Option<String>,

    /// Question for the chat assistant
    #[arg(long, value_name = "QUESTION")]
    pub ask: Option<String>,

    /// Export the last result as CSV (default: query_results.csv in the workspace)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    pub export: Option<Option<PathBuf>>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// LLM provider: openai, anthropic or mock
    #[arg(long, value_name = "PROVIDER")]
    pub llm: Option<String>,

    /// LLM model name
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Directory uploaded files and exports are written to
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Disable the chat assistant
    #[arg(long)]
    pub no_chat: bool,

    /// Let generated SQL modify the database
    #[arg(long)]
    pub allow_writes: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// True when the run should not start the interactive shell.
    pub fn is_one_shot(&self) -> bool {
        self.query.is_some() || self.ask.is_some() || self.export.is_some()
    }

    /// True when this run may send prompts to the chat assistant.
    pub fn wants_chat(&self) -> bool {
        !self.no_chat && (self.ask.is_some() || !self.is_one_shot())
    }

    /// Loads the config file and applies command-line overrides.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_from_file(&self.config_path())?;
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut Config) {
        if let Some(provider) = &self.llm {
            config.llm.provider = provider.clone();
            if self.model.is_none() {
                // A model configured for another provider does not carry over.
                config.llm.model = None;
            }
        }
        if let Some(model) = &self.model {
            config.llm.model = Some(model.clone());
        }
        if let Some(workspace) = &self.workspace {
            config.session.workspace = workspace.clone();
        }
        if self.no_chat {
            config.chat.enabled = false;
        }
        if self.allow_writes {
            config.chat.allow_writes = true;
        }
    }

    /// Uploads named on the command line, in the order they apply.
    pub fn setup_commands(&self) -> Vec<Command> {
        let mut commands = Vec::new();
        if let Some(db) = &self.db {
            commands.push(Command::Open(db.display().to_string()));
        }
        if let Some(script) = &self.script {
            commands.push(Command::Open(script.display().to_string()));
        }
        commands
    }

    /// The one-shot steps after setup: query, question, export.
    pub fn one_shot_commands(&self) -> Vec<Command> {
        let mut commands = Vec::new();
        if let Some(query) = &self.query {
            commands.push(Command::Sql(query.clone()));
        }
        if let Some(question) = &self.ask {
            commands.push(Command::Chat(question.trim().to_string()));
        }
        if let Some(path) = &self.export {
            commands.push(Command::Export(
                path.as_ref().map(|p| p.display().to_string()),
            ));
        }
        commands
    }
}
