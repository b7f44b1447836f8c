use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use repo_monitor::api::{HealthResponse, JobStatusView};
use repo_monitor::app::App;
use repo_monitor::config::{
    GithubConfig, HealthConfig, JobConfig, PollConfig, ServerConfig, SummarizerConfig,
};
use repo_monitor::client::MonitorClient;
use repo_monitor::error::ClientError;
use repo_monitor::scheduler::RepositoryRef;
use repo_monitor::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "repo-monitor")]
#[command(version)]
#[command(about = "Repository monitor with weekly commit summaries and health checks")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the repo-monitor HTTP server
    Server(ServerArgs),

    /// Weekly summary commands
    Summary {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: SummaryCommands,
    },

    /// Show dependency health
    Health {
        #[command(flatten)]
        client: ClientArgs,

        /// Check a single service instead of all of them
        #[arg(long)]
        service: Option<String>,
    },
}

// =============================================================================
// Server Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServerArgs {
    /// Address to bind the HTTP server to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "8000")]
    port: u16,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    github_api_url: String,

    /// GitHub token used for commit fetches
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Timeout for GitHub requests, in seconds
    #[arg(long, env = "TIMEOUT_SECONDS", default_value = "10")]
    github_timeout_secs: u64,

    /// Per-probe health check timeout, in milliseconds
    #[arg(long, env = "PROBE_TIMEOUT_MS", default_value = "5000")]
    probe_timeout_ms: u64,

    /// Commit lookback for weekly summaries, in days
    #[arg(long, env = "LOOKBACK_DAYS", default_value = "7")]
    lookback_days: u32,

    /// Hours to keep finished jobs before pruning them
    #[arg(long, env = "JOB_RETENTION_HOURS", default_value = "24")]
    job_retention_hours: u64,

    /// Maximum number of repositories tracked by the job store
    #[arg(long, env = "MAX_JOBS", default_value = "10000")]
    max_jobs: usize,

    /// Version reported by /health
    #[arg(long, env = "APP_VERSION", default_value = env!("CARGO_PKG_VERSION"))]
    app_version: String,
}

// =============================================================================
// Client Arguments (shared by summary and health commands)
// =============================================================================

#[derive(Parser, Debug)]
struct ClientArgs {
    /// Server address
    #[arg(
        long,
        short = 'a',
        env = "REPO_MONITOR_ADDR",
        default_value = "http://127.0.0.1:8000"
    )]
    addr: String,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(clap::Subcommand, Debug)]
enum SummaryCommands {
    /// Start weekly summary generation for a repository
    Generate {
        /// Repository as owner/name
        repository: String,

        /// Poll until the job finishes
        #[arg(long)]
        wait: bool,

        /// Seconds between status checks
        #[arg(long, default_value = "5")]
        poll_interval_secs: u64,

        /// Status checks before giving up
        #[arg(long, default_value = "60")]
        max_attempts: u32,
    },
    /// Show the latest summary job for a repository
    Status {
        /// Repository as owner/name
        repository: String,
    },
}

// =============================================================================
// Output Helpers
// =============================================================================

fn print_job_status(
    view: &JobStatusView,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(view)?),
        OutputFormat::Table => {
            println!("Job ID:     {}", view.job_id);
            println!("Repository: {}", view.repository);
            println!("Status:     {:?}", view.status);
            println!("Message:    {}", view.message);
            if let Some(count) = view.commit_count {
                println!("Commits:    {}", count);
            }
            if let Some(result) = view.result {
                println!("Summary ID: {}", result);
            }
        }
    }
    Ok(())
}

fn print_health(
    health: &HealthResponse,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(health)?),
        OutputFormat::Table => {
            println!(
                "Status: {}  Version: {}  Uptime: {:.0}s",
                health.status, health.version, health.uptime
            );
            println!("{:<20} {:<10} {:>10}", "SERVICE", "STATUS", "TIME(ms)");
            for (name, service) in &health.services {
                println!(
                    "{:<20} {:<10} {:>10.1}",
                    name,
                    service.status.to_string(),
                    service.response_time
                );
                if let Some(error) = service.details.get("error") {
                    println!("    error: {}", error);
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// Server Implementation
// =============================================================================

async fn run_server(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let listen_addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;

    let config = ServerConfig {
        listen_addr,
        github: GithubConfig {
            api_url: args.github_api_url,
            token: args.github_token,
            timeout: Duration::from_secs(args.github_timeout_secs),
            ..GithubConfig::default()
        },
        summarizer: SummarizerConfig::default(),
        health: HealthConfig {
            probe_timeout: Duration::from_millis(args.probe_timeout_ms),
            version: args.app_version,
        },
        jobs: JobConfig {
            lookback_days: args.lookback_days,
            max_jobs: args.max_jobs,
            retention: Duration::from_secs(args.job_retention_hours * 60 * 60),
            ..JobConfig::default()
        },
    };

    tracing::info!(
        listen_addr = %config.listen_addr,
        github_api_url = %config.github.api_url,
        github_authenticated = config.github.token.is_some(),
        lookback_days = config.jobs.lookback_days,
        "Starting repo-monitor"
    );

    let shutdown = install_shutdown_handler()?;
    let app = App::new(config)?;
    app.run(shutdown).await?;

    Ok(())
}

// =============================================================================
// Client Command Handlers
// =============================================================================

async fn handle_summary(
    client: &MonitorClient,
    command: SummaryCommands,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        SummaryCommands::Generate {
            repository,
            wait,
            poll_interval_secs,
            max_attempts,
        } => {
            let repository: RepositoryRef = repository.parse()?;
            let response = client.generate_weekly(&repository).await?;
            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
                OutputFormat::Table => {
                    if response.accepted {
                        println!("Weekly summary generation started");
                    } else {
                        println!("A summary job is already running for {}", repository);
                    }
                    println!("Job ID: {}", response.job_id);
                }
            }

            if wait {
                let poll = PollConfig {
                    interval: Duration::from_secs(poll_interval_secs),
                    max_attempts,
                };
                if matches!(output, OutputFormat::Table) {
                    eprintln!("Waiting up to {:?} for the job to finish", poll.ceiling());
                }
                let result = client
                    .wait_for_completion(&repository, &poll, |view| {
                        if matches!(output, OutputFormat::Table) {
                            eprintln!("  ... {}", view.message);
                        }
                    })
                    .await;
                match result {
                    Ok(view) => print_job_status(&view, output)?,
                    Err(ClientError::PollTimeout { attempts }) => {
                        eprintln!(
                            "Gave up after {} checks; the job is still running on the server. \
                             Run `repo-monitor summary status {}` later.",
                            attempts, repository
                        );
                        std::process::exit(2);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        SummaryCommands::Status { repository } => {
            let repository: RepositoryRef = repository.parse()?;
            let view = client.weekly_status(&repository).await?;
            print_job_status(&view, output)?;
        }
    }
    Ok(())
}

async fn handle_health(
    client: &MonitorClient,
    service: Option<String>,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match service {
        Some(service) => {
            let report = client.service_health(&service).await?;
            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Table => {
                    println!(
                        "{}: {} ({:.1} ms)",
                        report.service, report.health.status, report.health.response_time
                    );
                    for (key, value) in &report.health.details {
                        println!("    {}: {}", key, value);
                    }
                }
            }
        }
        None => {
            let health = client.health().await?;
            print_health(&health, output)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    match args.command {
        Commands::Server(server_args) => {
            run_server(server_args).await?;
        }
        Commands::Summary { client, command } => {
            let monitor = MonitorClient::new(&client.addr);
            handle_summary(&monitor, command, &client.output).await?;
        }
        Commands::Health { client, service } => {
            let monitor = MonitorClient::new(&client.addr);
            handle_health(&monitor, service, &client.output).await?;
        }
    }

    Ok(())
}
