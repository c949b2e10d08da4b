use std::io;
use std::sync::Arc;

use color_eyre::Result;
use datachat::adapters::ReqwestHttpClient;
use datachat::backend::BackendClient;
use datachat::cli::{
    parse_args, run_ask, run_delete, run_health, run_list, run_show, usage, version_string,
    CliCommand,
};
use datachat::config::ClientConfig;
use datachat::session::{ChannelObserver, QuerySessionController};

fn init_tracing() {
    // stdout carries the answer; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

async fn run(command: CliCommand, config: ClientConfig) -> Result<()> {
    let http = ReqwestHttpClient::with_timeout(config.request_timeout())?;
    let backend = BackendClient::new(http, &config);
    let (observer, mut notices) = ChannelObserver::channel();
    let mut controller =
        QuerySessionController::new(backend, &config).with_observer(Arc::new(observer));
    let mut out = io::stdout();

    match command {
        CliCommand::Ask {
            question,
            conversation,
        } => {
            let conversation_id = run_ask(
                &mut controller,
                &mut notices,
                &question,
                conversation.as_deref(),
                &mut out,
            )
            .await?;
            eprintln!("(conversation {})", conversation_id);
            Ok(())
        }
        CliCommand::List => run_list(&mut controller, &mut out).await,
        CliCommand::Show(id) => run_show(&mut controller, &id, &mut out).await,
        CliCommand::Delete(id) => run_delete(&mut controller, &id, &mut out).await,
        CliCommand::Health => run_health(&controller, &mut out).await,
        CliCommand::Version | CliCommand::Help | CliCommand::Invalid(_) => Ok(()),
    }
}

fn main() -> Result<()> {
    let command = parse_args(std::env::args());
    match &command {
        CliCommand::Version => {
            println!("{}", version_string());
            return Ok(());
        }
        CliCommand::Help => {
            println!("{}", usage());
            return Ok(());
        }
        CliCommand::Invalid(reason) => {
            eprintln!("Error: {}\n", reason);
            eprintln!("{}", usage());
            std::process::exit(2);
        }
        _ => {}
    }

    color_eyre::install()?;
    init_tracing();

    let config = ClientConfig::from_env()?;
    tracing::debug!(base_url = %config.base_url, "Configuration loaded");

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(command, config))
}
