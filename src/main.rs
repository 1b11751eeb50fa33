use adeypay_engine::application::engine::{ApprovalEngine, HostCapabilities};
use adeypay_engine::application::notify::Callbacks;
use adeypay_engine::application::withdraw::PayoutEngine;
use adeypay_engine::config::EngineConfig;
use adeypay_engine::domain::amount::RawAmount;
use adeypay_engine::domain::request::{PayloadSource, PaymentPayload};
use adeypay_engine::domain::session::SessionStatus;
use adeypay_engine::error::EngineError;
use adeypay_engine::infrastructure::http::HttpPaymentGateway;
use adeypay_engine::infrastructure::in_memory::InMemoryMessageBus;
use adeypay_engine::interfaces::terminal::{TerminalInput, TerminalWindowHost};
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API key sent to the payment service
    #[arg(long, global = true, env = "ADEYPAY_API_KEY")]
    api_key: Option<String>,

    /// Base URL of the payment service API
    #[arg(long, global = true)]
    api_base_url: Option<String>,

    /// Smallest accepted amount
    #[arg(long, global = true)]
    min_amount: Option<Decimal>,

    /// Largest accepted amount
    #[arg(long, global = true)]
    max_amount: Option<Decimal>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a payment and wait for it to be approved
    Pay {
        #[arg(long)]
        amount: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Send a payout
    Withdraw {
        #[arg(long)]
        amount: String,
        #[arg(long)]
        recipient: String,
        #[arg(long)]
        note: Option<String>,
    },
}

impl Cli {
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path).into_diagnostic()?,
            None => EngineConfig::default(),
        };
        if let Some(api_key) = &self.api_key {
            config.api_key = Some(api_key.clone());
        }
        if let Some(base) = &self.api_base_url {
            config.api_base_url = base.clone();
        }
        if let Some(min) = self.min_amount {
            config.min_amount = min;
        }
        if let Some(max) = self.max_amount {
            config.max_amount = Some(max);
        }
        config.validate().into_diagnostic()?;
        Ok(config)
    }
}

fn payload(amount: String, recipient: String, note: Option<String>) -> PayloadSource {
    let mut payload = PaymentPayload::new(RawAmount::Text(amount), recipient);
    payload.note = note;
    PayloadSource::Fixed(payload)
}

/// Prints outcomes to stdout and remembers whether an error was reported.
fn printing_callbacks(failed: Arc<AtomicBool>) -> Callbacks {
    Callbacks::new()
        .on_created(|id, amount| println!("created {id} {amount}"))
        .on_approved(|id, amount| println!("approved {id} {amount}"))
        .on_error(move |e| {
            eprintln!("error: {e}");
            // A blocked popup can still be approved through the poller.
            if !matches!(e, EngineError::PopupBlocked { .. }) {
                failed.store(true, Ordering::SeqCst);
            }
        })
}

async fn withdraw(config: &EngineConfig, source: PayloadSource) -> Result<bool> {
    let failed = Arc::new(AtomicBool::new(false));
    let gateway = HttpPaymentGateway::new(config).into_diagnostic()?;
    let engine = PayoutEngine::new(
        config,
        Box::new(gateway),
        source,
        printing_callbacks(failed.clone()),
    );
    engine.withdraw().await;
    Ok(!failed.load(Ordering::SeqCst))
}

async fn pay(config: &EngineConfig, source: PayloadSource) -> Result<bool> {
    let failed = Arc::new(AtomicBool::new(false));
    let gateway = HttpPaymentGateway::new(config).into_diagnostic()?;
    let bus = Arc::new(InMemoryMessageBus::new());
    let engine = ApprovalEngine::new(
        config,
        Box::new(gateway),
        HostCapabilities {
            windows: Arc::new(TerminalWindowHost::new(std::io::stdout())),
            messages: bus.clone(),
        },
        source,
        printing_callbacks(failed.clone()),
    );

    engine.start_payment().await;
    if engine.status() != SessionStatus::Created {
        return Ok(!failed.load(Ordering::SeqCst));
    }

    let reporter = engine.status_reporter();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while engine.status() == SessionStatus::Created {
        let Some(line) = lines.next_line().await.into_diagnostic()? else {
            engine.teardown();
            return Err(miette!("input closed before the payment was resolved"));
        };
        match TerminalInput::parse(&line) {
            Some(TerminalInput::Message(message)) => bus.dispatch(message),
            Some(TerminalInput::Poll { poll }) => reporter.report(&poll.id, poll.status),
            None => {}
        }
    }
    Ok(engine.status() == SessionStatus::Approved)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.engine_config()?;

    let succeeded = match cli.command {
        Command::Pay {
            amount,
            email,
            note,
        } => pay(&config, payload(amount, email, note)).await?,
        Command::Withdraw {
            amount,
            recipient,
            note,
        } => withdraw(&config, payload(amount, recipient, note)).await?,
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}
