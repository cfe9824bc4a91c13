use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use calmate::agent::system_prompt::{build_system_prompt, load_operator_prompt};
use calmate::agent::{
    DispatchLoop, DispatchSettings, GenaiConversation, ModelConversation, ToolExecutor,
    ToolRegistry,
};
use calmate::auth::{AuthorizationFlow, FlowSettings, OAuthClientConfig};
use calmate::calendar::GoogleCalendar;
use calmate::cli::{Cli, Commands};
use calmate::config::{self, AppConfig};
use calmate::mcp::McpServer;

const PROMPT: &str = "calmate> ";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the conversation.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = config::load_config(&cli)?;
    tracing::info!(model = %config.model, "Config loaded");

    match cli.command {
        Commands::Tools { .. } => {
            print!("{}", ToolRegistry::builtin()?.describe());
            Ok(())
        }
        Commands::Run { .. } => run(config).await,
        Commands::Mcp { .. } => serve_mcp(config).await,
    }
}

async fn serve_mcp(config: AppConfig) -> anyhow::Result<()> {
    let server = McpServer::bind(SocketAddr::from(([0, 0, 0, 0], config.mcp_port))).await?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    server
        .run(cancel, Duration::from_secs(config.shutdown_timeout_secs))
        .await?;
    Ok(())
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    config::check_api_key(&config.model)?;

    let client = OAuthClientConfig::from_file(&config.credentials_path)?;
    let mut settings = FlowSettings::for_port(config.redirect_port);
    settings.redirect_timeout = Some(Duration::from_secs(config.redirect_timeout_secs));
    settings.shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);

    let mut flow = AuthorizationFlow::new(client, settings);
    let token = flow
        .run(|url| {
            println!("Open the following URL in your browser to authorize calmate:\n\n{url}\n");
        })
        .await
        .context("Authorization failed")?;
    tracing::info!("Authorization complete");

    let calendar = GoogleCalendar::new(
        &config.calendar_api_base,
        token.access_token,
        Duration::from_secs(config.calendar_timeout_secs),
    )?;
    let executor = ToolExecutor::new(Arc::new(calendar), config.time_zone.clone());

    let registry = ToolRegistry::builtin()?;
    let operator_prompt = match &config.system_prompt_path {
        Some(path) => Some(load_operator_prompt(path).await?),
        None => None,
    };
    let system_prompt =
        build_system_prompt(&registry, &config.time_zone, operator_prompt.as_deref());
    let model = GenaiConversation::new(&config.model, system_prompt, registry.to_genai_tools());

    let dispatch_settings = DispatchSettings {
        max_tool_rounds: config.max_tool_rounds,
        unknown_tool_policy: config.unknown_tool_policy,
        model_timeout: Duration::from_secs(config.model_timeout_secs),
        model_retries: config.model_retries,
        ..Default::default()
    };
    let mut dispatch = DispatchLoop::new(model, registry, executor, dispatch_settings);

    let result = chat(&mut dispatch).await;
    println!("Session ended");
    result
}

/// Read prompts from stdin until EOF, Ctrl-C, or a fatal dispatch error.
async fn chat<M: ModelConversation>(dispatch: &mut DispatchLoop<M>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{PROMPT}");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(());
            }
        };
        let Some(line) = line else {
            println!();
            return Ok(());
        };

        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }

        let turn = tokio::select! {
            turn = dispatch.run_turn(prompt) => turn,
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(());
            }
        };

        match turn {
            Ok(outcome) => {
                tracing::debug!(rounds = outcome.rounds, "Turn complete");
            }
            Err(e) if e.is_fatal() => {
                return Err(e).context("Conversation aborted");
            }
            Err(e) => {
                eprintln!("{e}");
            }
        }
    }
}
