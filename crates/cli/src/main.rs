mod args;
mod metrics;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use provisioner_core::build::CircleCiClient;
use provisioner_core::review::GitHubChangeReview;
use provisioner_core::ticket::ServiceNowTicketStore;
use provisioner_core::vcs::{GitCli, GitConfig};
use provisioner_core::{
    generate, load_config, request_summary, validate_config, Catalog, Collaborators, Config,
    ProvisioningWorkflow, RunMode, SanitizedConfig, ShutdownSignal, Ticket,
};

use args::Args;

/// Config file picked up from the working directory when none is given.
const DEFAULT_CONFIG_FILE: &str = "provisioner.toml";

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.log_json);

    let result = run(&args).await;

    if let Some(path) = &args.metrics_file {
        if let Err(e) = metrics::write_metrics_file(path) {
            warn!(path = %path.display(), error = %e, "Failed to write metrics file");
        }
    }

    if let Err(e) = result {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn run(args: &Args) -> anyhow::Result<()> {
    args.check().map_err(anyhow::Error::msg)?;
    let mode = RunMode::from(args.format);

    let config_path = config_path(args.config.as_deref());
    let config = load_config(config_path.as_deref())?;
    validate_config(&config, mode)?;

    info!(
        "Loaded configuration: {}",
        serde_json::to_string_pretty(&SanitizedConfig::from(&config))?
    );

    let catalog = match &config.generator.catalog_path {
        Some(path) => Catalog::from_file(path)?,
        None => Catalog::builtin(),
    };

    let ticket = Ticket::from_file(&args.request)
        .with_context(|| format!("reading request {}", args.request.display()))?;
    info!(ticket = %ticket.number, engine = %ticket.engine, size = %ticket.size, "Loaded request");

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    match mode {
        RunMode::Json => {
            let outfile = required_outfile(args)?;
            let summary = request_summary(&ticket, &catalog, &config.generator, &mut rng)?;
            std::fs::write(outfile, serde_json::to_string_pretty(&summary)?)
                .with_context(|| format!("writing {}", outfile.display()))?;
            info!(path = %outfile.display(), "Request summary written");
        }
        RunMode::Generate => {
            let outfile = required_outfile(args)?;
            let document = generate(&ticket, &catalog, &config.generator, &mut rng)?;
            document.write_to(outfile)?;
            info!(path = %outfile.display(), "Terraform document written");
        }
        RunMode::Terraform => {
            let repo = args.repo.as_deref().unwrap_or_default();
            provision(config, catalog, &ticket, repo, rng).await?;
        }
    }

    Ok(())
}

/// Run the full workflow against the real services.
async fn provision(
    config: Config,
    catalog: Catalog,
    ticket: &Ticket,
    repo: &str,
    rng: StdRng,
) -> anyhow::Result<()> {
    let circleci = Arc::new(CircleCiClient::new(config.circleci.clone())?);
    let services = Collaborators {
        vcs: Arc::new(GitCli::new(GitConfig {
            git_path: None,
            token: config.github.token.clone(),
            work_root: config.workflow.work_root.clone(),
        })),
        review: Arc::new(GitHubChangeReview::new(config.github.clone())?),
        builds: circleci.clone(),
        secrets: circleci,
        tickets: Arc::new(ServiceNowTicketStore::new(config.servicenow.clone())?),
    };

    let (shutdown_tx, mut shutdown) = ShutdownSignal::channel();
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(());
    });

    let workflow = ProvisioningWorkflow::new(config, catalog, services, rng);
    let outcome = workflow.run_and_report(ticket, repo, &mut shutdown).await?;
    info!(
        ticket = %outcome.ticket_number,
        change = %outcome.change,
        build = outcome.deployment.build_num,
        "Database provisioned"
    );
    Ok(())
}

fn config_path(flag: Option<&Path>) -> Option<PathBuf> {
    match flag {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.exists().then_some(default)
        }
    }
}

fn required_outfile(args: &Args) -> anyhow::Result<&Path> {
    args.outfile
        .as_deref()
        .context("outfile must be set for this format")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Shutdown signal received, abandoning the run");
}
