mod account_cmd;
mod analyze_cmd;
mod history_cmd;
mod services;
mod status_cmd;
mod terminal_output;

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use oracare_config::{config_dir, config_file_path, load_and_prepare, OraCareConfig};
use oracare_gateway::{start_server, GatewayState};
use oracare_logging::redact_sensitive_data;
use oracare_workflow::SessionContext;

use account_cmd::Credentials;
use terminal_output::note_error;

#[derive(Parser)]
#[command(name = "oracare")]
#[command(about = "OraCare: oral cavity image analysis")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.oracare/config.yaml)
    #[arg(long, global = true, env = "ORACARE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the analysis gateway HTTP server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create an account
    Signup {
        #[command(flatten)]
        creds: Credentials,
    },
    /// Send a password reset email
    ResetPassword {
        #[arg(long, env = "ORACARE_EMAIL")]
        email: String,
    },
    /// Upload an image, analyze it, and save the result
    Analyze {
        /// JPEG/PNG/... image of the oral cavity
        image: PathBuf,
        #[command(flatten)]
        creds: Credentials,
    },
    /// List your past analyses, newest first
    History {
        #[command(flatten)]
        creds: Credentials,
    },
    /// Delete one analysis by id
    Delete {
        id: String,
        #[command(flatten)]
        creds: Credentials,
    },
    /// Check whether a gateway is running
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        note_error(&redact_sensitive_data(&format!("{e:#}")));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_file_path(&config_dir()));
    let (config, report) = load_and_prepare(&path).await?;

    let logging = config.logging.clone().unwrap_or_default();
    oracare_logging::init_logger(
        logging.level.as_deref().unwrap_or("info"),
        logging.dir.as_deref().map(Path::new),
    );
    info!(path = %path.display(), "Configuration loaded");
    report.log();

    match cli.command {
        Commands::Serve { port } => serve(&config, port).await,
        Commands::Status => status_cmd::run(&config).await,
        Commands::Signup { creds } => {
            let ctx = SessionContext::new(services::build_identity(&config)?);
            let outcome = account_cmd::signup(&ctx, &creds).await;
            ctx.shutdown();
            outcome
        }
        Commands::ResetPassword { email } => {
            let ctx = SessionContext::new(services::build_identity(&config)?);
            let outcome = account_cmd::reset_password(&ctx, &email).await;
            ctx.shutdown();
            outcome
        }
        Commands::Analyze { image, creds } => {
            let options = services::workflow_options(&config);
            with_session(&config, &creds, |svc, session| async move {
                analyze_cmd::run(svc, options, &session, &image).await
            })
            .await
        }
        Commands::History { creds } => {
            with_session(&config, &creds, |svc, session| async move {
                history_cmd::list(svc, &session).await
            })
            .await
        }
        Commands::Delete { id, creds } => {
            with_session(&config, &creds, |svc, session| async move {
                history_cmd::delete(svc, &session, &id).await
            })
            .await
        }
    }
}

/// Sign in, run `f`, then sign out and tear the session context down.
async fn with_session<F, Fut>(config: &OraCareConfig, creds: &Credentials, f: F) -> Result<()>
where
    F: FnOnce(oracare_workflow::Services, oracare_core::Session) -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    let services = services::build_services(config)?;
    let ctx = SessionContext::new(services.identity.clone());

    let outcome = match account_cmd::login(&ctx, config.backend(), creds).await {
        Ok(session) => f(services, session).await,
        Err(e) => Err(e),
    };

    if let Err(e) = ctx.sign_out().await {
        tracing::warn!(error = %e, "Sign-out failed");
    }
    ctx.shutdown();
    outcome
}

async fn serve(config: &OraCareConfig, port: Option<u16>) -> Result<()> {
    let server = config.server.clone().unwrap_or_default();
    let bind: IpAddr = server
        .bind
        .as_deref()
        .unwrap_or("127.0.0.1")
        .parse()
        .context("server.bind is not an IP address")?;
    let addr = SocketAddr::new(bind, port.or(server.port).unwrap_or(3000));

    let analyzer = services::build_analyzer(config)?;
    info!(addr = %addr, gateway = %analyzer.gateway_name(), "Starting OraCare gateway");
    start_server(addr, GatewayState::new(Arc::new(analyzer))).await
}
