use anyhow::{Context, Result};
use clamp_policy_sync::background_jobs::jobs::PolicySyncJob;
use clamp_policy_sync::background_jobs::JobScheduler;
use clamp_policy_sync::config::{AppConfig, CliConfig, FileConfig};
use clamp_policy_sync::loop_graph::{ChainPainter, LoopGraphBuilder, MicroService};
use clamp_policy_sync::policy_engine::{
    HttpPolicyEngineGateway, PolicyFetcher, RetryInterrupter, RetrySettings,
};
use clamp_policy_sync::policy_models::{
    ModelCatalog, PolicyModelId, PolicyModelStore, SqlitePolicyModelStore,
};
use clamp_policy_sync::sync::{PolicySynchronizer, SyncReport};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How long the runtime waits for in-flight blocking work when `run` stops.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(version, about = "Synchronize CLAMP policy models with the policy engine")]
struct CliArgs {
    /// Path to a TOML config file. Its values override the CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite policy model database file.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Base URL of the policy engine API.
    #[clap(long)]
    pub policy_url: Option<String>,

    /// User for HTTP basic auth against the policy engine.
    #[clap(long)]
    pub policy_user: Option<String>,

    /// Password for HTTP basic auth against the policy engine.
    #[clap(long)]
    pub policy_password: Option<String>,

    /// Timeout in seconds for each policy engine request.
    #[clap(long, default_value_t = 30)]
    pub policy_timeout_sec: u64,

    /// Wait between two attempts of the same request, in milliseconds.
    #[clap(long, default_value_t = 0)]
    pub retry_interval_ms: u64,

    /// Total attempts per policy engine request.
    #[clap(long, default_value_t = 1)]
    pub retry_limit: u32,

    /// Interval in seconds between two synchronization passes of `run`.
    #[clap(long, default_value_t = 3600)]
    pub sync_interval_secs: u64,

    /// Number of worker threads processing policy types in parallel.
    #[clap(long, default_value_t = 4)]
    pub workers: usize,

    /// Do not store models whose download failed.
    #[clap(long)]
    pub skip_failed_fetches: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one synchronization pass and exit.
    Sync,
    /// Synchronize at startup, then periodically until interrupted.
    Run,
    /// Download one policy model and store it if absent.
    Fetch {
        /// Policy type name, e.g. onap.policies.monitoring.tcagen2
        #[clap(long)]
        policy_type: String,
        /// Policy type version, e.g. 1.0.0
        #[clap(long)]
        version: String,
    },
    /// List the stored policy models.
    List {
        /// Print the models, definitions included, as JSON.
        #[clap(long)]
        json: bool,
    },
    /// Print the chain of a control loop.
    Graph {
        #[clap(long)]
        collector: Option<String>,
        /// Microservice name, repeat in chain order.
        #[clap(long = "micro-service")]
        micro_services: Vec<String>,
        #[clap(long)]
        policy: Option<String>,
    },
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_path: self.db_path.clone(),
            policy_url: self.policy_url.clone(),
            policy_user: self.policy_user.clone(),
            policy_password: self.policy_password.clone(),
            policy_timeout_sec: self.policy_timeout_sec,
            retry_interval_ms: self.retry_interval_ms,
            retry_limit: self.retry_limit,
            sync_interval_secs: self.sync_interval_secs,
            worker_threads: self.workers,
            record_failed_fetches: !self.skip_failed_fetches,
        }
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    // Painting a loop needs neither the database nor the policy engine
    if let Command::Graph {
        collector,
        micro_services,
        policy,
    } = &cli_args.command
    {
        return print_graph(collector.as_deref(), micro_services, policy.as_deref());
    }

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Opening SQLite policy model database at {:?}...", config.db_path);
    let store: Arc<dyn PolicyModelStore> = Arc::new(SqlitePolicyModelStore::new(&config.db_path)?);

    match cli_args.command {
        Command::List { json } => list_models(store.as_ref(), json),
        Command::Sync => {
            let synchronizer = build_synchronizer(&config, store)?;
            let report = synchronizer.synchronize_all();
            print_report(&report);
            Ok(())
        }
        Command::Run => {
            let synchronizer = Arc::new(build_synchronizer(&config, store)?);
            // Held here so the blocking HTTP client is released after the runtime
            run_periodic_sync(Arc::clone(&synchronizer), config.sync.interval_secs)
        }
        Command::Fetch {
            policy_type,
            version,
        } => {
            let synchronizer = build_synchronizer(&config, store)?;
            let report = synchronizer.synchronize_one(&policy_type, &version);
            for id in &report.inserted {
                println!("{} inserted", id);
            }
            for id in &report.already_present {
                println!("{} already present", id);
            }
            for failure in &report.failures {
                warn!("{}:{} {}", policy_type, version, failure.reason);
            }
            if report.processed() == 0 {
                println!("{} not recorded", PolicyModelId::new(&policy_type, &version));
            }
            Ok(())
        }
        Command::Graph { .. } => Ok(()),
    }
}

/// Wire gateway, fetcher and catalog together.
///
/// Must run outside the tokio runtime, see [`HttpPolicyEngineGateway::new`].
fn build_synchronizer(
    config: &AppConfig,
    store: Arc<dyn PolicyModelStore>,
) -> Result<PolicySynchronizer> {
    let url = config.policy_url()?;
    info!("Policy engine configured at {}", url);

    let gateway = HttpPolicyEngineGateway::new(url, &config.policy_engine)
        .context("Failed to create policy engine client")?;
    let fetcher = PolicyFetcher::new(
        Arc::new(gateway),
        RetrySettings::new(&config.policy_engine),
    )
    .with_interrupter(RetryInterrupter::new());

    PolicySynchronizer::new(fetcher, ModelCatalog::new(store), &config.sync)
}

fn run_periodic_sync(synchronizer: Arc<PolicySynchronizer>, interval_secs: u64) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;

    let shutdown_token = CancellationToken::new();
    let interrupter = synchronizer.fetcher().interrupter().clone();

    let mut scheduler = JobScheduler::new(shutdown_token.clone());
    scheduler.register_job(Arc::new(PolicySyncJob::new(
        synchronizer,
        Duration::from_secs(interval_secs),
    )));

    runtime.block_on(async {
        let ctrl_c_token = shutdown_token.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl-C, shutting down...");
                    interrupter.interrupt();
                    ctrl_c_token.cancel();
                }
                Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
            }
        });

        scheduler.run().await;
    });

    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    Ok(())
}

fn list_models(store: &dyn PolicyModelStore, json: bool) -> Result<()> {
    let models = store.list()?;

    if json {
        let values: Vec<serde_json::Value> = models.iter().map(|m| m.to_json()).collect();
        println!("{}", serde_json::to_string_pretty(&values)?);
        return Ok(());
    }

    for stored in &models {
        println!(
            "{}\t{}\t{} bytes",
            stored.model.id(),
            stored.created_at.to_rfc3339(),
            stored.model.definition.len()
        );
    }
    println!("{} policy model(s)", models.len());
    Ok(())
}

fn print_report(report: &SyncReport) {
    if let Some(reason) = &report.skipped_reason {
        println!("Nothing to synchronize: {}", reason);
        return;
    }
    for id in &report.inserted {
        println!("inserted\t{}", id);
    }
    for failure in &report.failures {
        let name = match (&failure.policy_type, &failure.version) {
            (Some(policy_type), Some(version)) => format!("{}:{}", policy_type, version),
            (Some(policy_type), None) => policy_type.clone(),
            _ => format!("entry #{}", failure.index),
        };
        println!("failed\t{}\t{}", name, failure.reason);
    }
    println!(
        "{} inserted, {} already present, {} failed",
        report.inserted.len(),
        report.already_present.len(),
        report.failures.len()
    );
}

fn print_graph(collector: Option<&str>, micro_services: &[String], policy: Option<&str>) -> Result<()> {
    let mut builder = LoopGraphBuilder::new(ChainPainter);
    if let Some(collector) = collector {
        builder = builder.collector(collector);
    }
    let mut input_from = String::new();
    for name in micro_services {
        builder = builder.add_micro_service(MicroService::new(name.as_str(), "", input_from.as_str()));
        input_from = name.clone();
    }
    if let Some(policy) = policy {
        builder = builder.policy(policy);
    }

    println!("{}", builder.build()?);
    Ok(())
}
