//! SQL Explorer - upload a SQLite database or SQL script and explore it.

use std::io::IsTerminal;

use sql_explorer::agent::{QueryAgent, SqlChain};
use sql_explorer::cli::Cli;
use sql_explorer::config::Config;
use sql_explorer::error::Result;
use sql_explorer::llm::create_client;
use sql_explorer::logging;
use sql_explorer::secrets::{mask_secret, SecretStore};
use sql_explorer::session::Session;
use sql_explorer::shell::{self, ShellOptions};
use tokio::io::BufReader;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse_args();

    if cli.is_one_shot() {
        logging::init_stderr_logging();
    } else {
        logging::init_file_logging();
    }

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{}: {}", e.category(), e);
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

/// Starts up and drives the session. Startup failures are `Err`; the exit
/// code reports whether one-shot steps succeeded.
async fn run(cli: Cli) -> Result<i32> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = cli.load_config()?;
    let agent = build_agent(&cli, &config)?;

    let mut session = Session::new(config, agent);
    let outcome = drive(&cli, &mut session).await;
    let closed = session.close().await;
    let code = outcome?;
    closed?;
    Ok(code)
}

async fn drive(cli: &Cli, session: &mut Session) -> Result<i32> {
    let mut stdout = tokio::io::stdout();
    let mut stderr = tokio::io::stderr();

    let setup_ok = shell::run_commands(
        session,
        cli.setup_commands(),
        &mut stdout,
        &mut stderr,
        cli.format,
    )
    .await?;

    if cli.is_one_shot() {
        if !setup_ok {
            return Ok(1);
        }
        let ok = shell::run_commands(
            session,
            cli.one_shot_commands(),
            &mut stdout,
            &mut stderr,
            cli.format,
        )
        .await?;
        return Ok(if ok { 0 } else { 1 });
    }

    let options = ShellOptions {
        format: cli.format,
        interactive: std::io::stdin().is_terminal(),
    };
    let stdin = BufReader::new(tokio::io::stdin());
    shell::run(session, stdin, &mut stdout, options).await?;
    Ok(0)
}

/// Creates the chat agent when this run may use it. A provider that needs an
/// API key fails startup when none can be found.
fn build_agent(cli: &Cli, config: &Config) -> Result<Option<Box<dyn QueryAgent>>> {
    if !config.chat.enabled || !cli.wants_chat() {
        info!("Chat assistant disabled for this run");
        return Ok(None);
    }

    let provider = config.llm.provider()?;
    let store = SecretStore::new(vec![config.session.workspace.clone(), Config::default_dir()]);
    let api_key = store.resolve(provider)?;
    if let Some(key) = &api_key {
        info!(
            %provider,
            source = %key.source,
            key = %mask_secret(&key.value),
            "Using LLM API key"
        );
    }

    let llm = create_client(&config.llm, api_key.map(|key| key.value))?;
    let chain = SqlChain::new(llm).with_allow_writes(config.chat.allow_writes);
    Ok(Some(Box::new(chain)))
}
