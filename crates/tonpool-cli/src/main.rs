//! Tonpool console entry point

use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use tonpool_cli::config::{CliOptions, Settings};
use tonpool_cli::keys::{KeyDbFile, KeyRegistry, KeyStore, MemoryKeyStore};
use tonpool_cli::logging::init_tracing;
use tonpool_cli::node::JsonNodeClient;
use tonpool_cli::relay::TcpRelay;
use tonpool_cli::terminal::{spawn_stdin_reader, StdoutTerminal};
use tonpool_cli::{event_loop, CliErrorHandler, Session};
use tonpool_contracts::{AddressDeriver, TemplateSet};

/// Exit status for start-up failures, same as a usage error
const STARTUP_FAILURE: i32 = 2;

fn main() {
    let options = CliOptions::parse();
    let error_handler = CliErrorHandler::new(options.verbosity.unwrap_or(0) >= 4, options.json_logs);

    let code = match run(options) {
        Ok(code) => code,
        Err(err) => {
            error_handler.handle_error(&err);
            STARTUP_FAILURE
        }
    };
    process::exit(code);
}

fn run(options: CliOptions) -> Result<i32> {
    options.validate()?;
    init_tracing(options.log_level(), Some(options.json_logs))?;

    let mut settings = Settings::load(options.settings.as_deref()).context("failed to load settings")?;
    settings.apply(&options);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    let code = runtime.block_on(serve(options, settings));
    // The stdin reader never finishes on its own.
    runtime.shutdown_background();
    code
}

//-----------------------------------------------------------------------------
// Session Wiring
//-----------------------------------------------------------------------------

async fn serve(options: CliOptions, settings: Settings) -> Result<i32> {
    let store: Box<dyn KeyStore> = if options.in_memory {
        Box::new(MemoryKeyStore::default())
    } else {
        fs_err::create_dir_all(&settings.key_dir)?;
        Box::new(KeyDbFile::new(&settings.key_dir))
    };
    let keys = KeyRegistry::load(store)?;

    let templates = TemplateSet::load(&settings.templates).context("failed to load contract templates")?;
    let deriver = AddressDeriver::new(templates, settings.pool.params, settings.default_wallet_id);

    let (events, queue) = mpsc::unbounded_channel();
    let client = JsonNodeClient::connect(&settings.node.endpoint, events.clone()).await?;
    let init_options = settings.init_options(&options)?;

    let mut session = Session::new(keys, deriver, Box::new(StdoutTerminal))
        .with_client(Box::new(client), init_options)
        .with_events(events.clone())
        .with_pool_request_amount(settings.pool.request_amount()?);
    if let Some(endpoint) = &settings.relay.endpoint {
        info!(endpoint = %endpoint, "relaying lite-server queries");
        session = session.with_relay(Arc::new(TcpRelay::new(endpoint.clone())), settings.relay.timeout());
    }

    match options.execute {
        Some(command) => session = session.one_shot(command),
        None => {
            spawn_stdin_reader(events);
            session.attach_input();
        }
    }

    Ok(event_loop::run(session, queue).await)
}
