use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use overseer::error::Result;
use overseer::instance::StandardInstanceLauncher;
use overseer::shutdown::wait_for_shutdown_signal;
use overseer::spec::{JobSpec, CONFIG_COMMAND, CONFIG_INTERVAL_SECS};

#[derive(Parser, Debug)]
#[command(name = "overseer")]
#[command(version)]
#[command(about = "Embeddable job-orchestration control plane")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Launch a single job and wait for its result
    Run(RunArgs),

    /// Run a recurring catalog job until interrupted
    Serve(ServeArgs),
}

// =============================================================================
// Run Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct RunArgs {
    /// Job spec URI
    #[arg(long, default_value = "overseer:job/adhoc")]
    uri: String,

    /// Shell command the job runs (a no-op success when omitted)
    #[arg(long)]
    command: Option<String>,

    /// Instance name used in logs
    #[arg(long, default_value = "overseer-cli")]
    name: String,

    /// Seconds to wait for the job result
    #[arg(long, default_value = "30")]
    timeout_secs: u64,
}

// =============================================================================
// Serve Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Job spec URI
    #[arg(long, default_value = "overseer:job/recurring")]
    uri: String,

    /// Shell command the job runs on each tick
    #[arg(long)]
    command: Option<String>,

    /// Instance name used in logs
    #[arg(long, default_value = "overseer-cli")]
    name: String,

    /// Seconds between recurring runs
    #[arg(long, default_value = "60")]
    interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match args.command {
        Commands::Run(run) => run_once(run).await,
        Commands::Serve(serve) => serve_catalog(serve).await,
    }
}

/// Start an instance, launch one job directly, report its outcome, stop.
async fn run_once(args: RunArgs) -> Result<()> {
    let launcher = StandardInstanceLauncher::builder()
        .with_instance_name(&args.name)
        .build();
    launcher.start_async()?;
    launcher.await_running(Duration::from_secs(5)).await?;

    let mut builder = JobSpec::builder(&args.uri);
    if let Some(command) = &args.command {
        builder = builder.with_config_value(CONFIG_COMMAND, command.as_str());
    }
    let spec = builder.build();

    let instance = launcher.driver();
    let driver = instance.job_launcher().launch_job(spec)?;
    driver.start_async()?;
    let result = driver
        .await_result(Duration::from_secs(args.timeout_secs))
        .await?;

    if let Some(output) = result.output() {
        print!("{output}");
    }
    if let Some(error) = result.error() {
        eprint!("{error}");
    }

    let metrics = instance.metrics();
    println!(
        "job {}: {}",
        args.uri,
        if result.is_successful() {
            "succeeded"
        } else {
            "failed"
        }
    );
    println!("  launched:  {}", metrics.num_jobs_launched());
    println!("  completed: {}", metrics.num_jobs_completed());

    launcher.stop_async()?;
    launcher.await_terminated(Duration::from_secs(5)).await?;

    if !result.is_successful() {
        std::process::exit(1);
    }
    Ok(())
}

/// Put a recurring spec into the catalog and serve until SIGINT/SIGTERM.
async fn serve_catalog(args: ServeArgs) -> Result<()> {
    let launcher = StandardInstanceLauncher::builder()
        .with_instance_name(&args.name)
        .build();
    launcher.start_async()?;
    launcher.await_running(Duration::from_secs(5)).await?;

    let mut builder = JobSpec::builder(&args.uri)
        .with_config_value(CONFIG_INTERVAL_SECS, args.interval_secs);
    if let Some(command) = &args.command {
        builder = builder.with_config_value(CONFIG_COMMAND, command.as_str());
    }
    let instance = launcher.driver();
    instance.job_catalog().put(builder.build())?;
    tracing::info!(uri = %args.uri, interval_secs = args.interval_secs, "Serving recurring job");

    wait_for_shutdown_signal().await;

    launcher.stop_async()?;
    launcher.await_terminated(Duration::from_secs(10)).await?;
    Ok(())
}
