use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;
use voyage_core::VesselName;
use voyage_runtime::{run_batch, CancellationToken, Collaborators, Runtime};
use voyage_world::{build_request, load_content};

mod overrides;
mod scenario;
mod summary;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "voyage", about = "Voyage route, compliance, weather and bunker planner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan one voyage and print the report as JSON.
    Plan {
        /// UN/LOCODE of the departure port.
        #[arg(long)]
        origin: String,
        /// UN/LOCODE of the arrival port.
        #[arg(long)]
        destination: String,
        /// Free-text request; keywords decide which analyses run.
        #[arg(long, default_value = "full voyage plan with bunkering")]
        query: String,
        /// Vessel name from vessels.json (default: the fleet default).
        #[arg(long)]
        vessel: Option<String>,
        #[arg(long)]
        speed_knots: Option<f64>,
        /// RFC 3339 departure time (default: now).
        #[arg(long)]
        departure: Option<DateTime<Utc>>,
        #[arg(long, default_value = "./content")]
        content_dir: String,
        /// Skip the stage-order planner and use the fixed order.
        #[arg(long)]
        no_planner: bool,
        /// Print the full session state instead of the report.
        #[arg(long)]
        state: bool,
    },
    /// Run every request in a scenario file concurrently.
    Batch {
        /// Path to the scenario JSON file.
        #[arg(long)]
        scenario: String,
        /// Output directory (default: runs/).
        #[arg(long, default_value = "runs")]
        output_dir: String,
    },
}

/// Cancels `token` on Ctrl-C so running sessions finalize with what they have.
fn cancel_on_interrupt(token: &CancellationToken) {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; finalizing open sessions");
            token.cancel();
        }
    });
}

// ---------------------------------------------------------------------------
// plan
// ---------------------------------------------------------------------------

struct PlanArgs {
    origin: String,
    destination: String,
    query: String,
    vessel: Option<String>,
    speed_knots: Option<f64>,
    departure: Option<DateTime<Utc>>,
    content_dir: String,
    no_planner: bool,
    state: bool,
}

async fn plan(args: PlanArgs) -> Result<()> {
    if args.speed_knots.is_some_and(|s| s <= 0.0) {
        bail!("--speed-knots must be > 0");
    }
    let content = Arc::new(load_content(&args.content_dir)?);
    let mut collaborators = Collaborators::offline(&content);
    if args.no_planner {
        collaborators = collaborators.with_planner(None);
    }
    let runtime = Runtime::new(content, collaborators);

    let departure = args.departure.unwrap_or_else(Utc::now);
    let mut request = build_request(&args.origin, &args.destination, &args.query, departure);
    request.vessel = args.vessel.map(VesselName::new);
    request.speed_knots = args.speed_knots;

    let cancel = CancellationToken::new();
    cancel_on_interrupt(&cancel);
    let outcome = runtime.run_session(request, cancel).await?;

    let json = if args.state {
        serde_json::to_string_pretty(&outcome.state).context("serializing session state")?
    } else {
        serde_json::to_string_pretty(&outcome.report).context("serializing report")?
    };
    println!("{json}");
    Ok(())
}

// ---------------------------------------------------------------------------
// batch
// ---------------------------------------------------------------------------

/// Writes `value` to `path` through a temp file so readers never see a
/// partial file.
fn write_json_atomic(path: &Path, value: &impl serde::Serialize) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("serializing {}", path.display()))?;
    let mut file =
        std::fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    file.write_all(json.as_bytes())
        .with_context(|| format!("writing {}", tmp.display()))?;
    file.sync_all()?;
    std::fs::rename(&tmp, path).with_context(|| format!("renaming {}", tmp.display()))?;
    Ok(())
}

async fn batch(scenario_path: &str, output_dir: &str) -> Result<()> {
    let scenario = scenario::load_scenario(Path::new(scenario_path))?;
    let mut content = load_content(&scenario.content_dir)?;
    overrides::apply_overrides(&mut content.policy, &scenario.overrides)?;
    let requests = scenario.voyage_requests(Utc::now());
    println!(
        "Loading scenario '{}': {} requests",
        scenario.name,
        requests.len()
    );

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let run_dir = PathBuf::from(output_dir).join(format!("{}_{}", scenario.name, timestamp));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("creating output directory: {}", run_dir.display()))?;
    std::fs::copy(scenario_path, run_dir.join("scenario.json")).context("copying scenario file")?;

    let runtime = Arc::new(Runtime::offline(Arc::new(content)));
    let cancel = CancellationToken::new();
    cancel_on_interrupt(&cancel);
    let results = run_batch(Arc::clone(&runtime), requests, &cancel).await;

    let mut reports = Vec::new();
    let mut failed = 0;
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(outcome) => reports.push(outcome.report),
            Err(err) => {
                failed += 1;
                eprintln!("Request {index} failed: {err:#}");
            }
        }
    }
    if reports.is_empty() {
        bail!("all sessions failed");
    }
    info!(memoized_routes = runtime.memo().len(), "batch finished");

    let report_refs: Vec<_> = reports.iter().collect();
    let stats = summary::compute_summary(&report_refs, failed);
    summary::print_summary(&scenario.name, &stats);

    let batch_summary = serde_json::json!({
        "batch_id": Uuid::new_v4().to_string(),
        "scenario_name": scenario.name,
        "overrides": scenario.overrides,
        "policy": runtime.policy(),
        "summary": stats,
    });
    write_json_atomic(&run_dir.join("reports.json"), &reports)?;
    write_json_atomic(&run_dir.join("batch_summary.json"), &batch_summary)?;
    println!("Output written to {}", run_dir.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Plan {
            origin,
            destination,
            query,
            vessel,
            speed_knots,
            departure,
            content_dir,
            no_planner,
            state,
        } => {
            plan(PlanArgs {
                origin,
                destination,
                query,
                vessel,
                speed_knots,
                departure,
                content_dir,
                no_planner,
                state,
            })
            .await?;
        }
        Commands::Batch {
            scenario,
            output_dir,
        } => batch(&scenario, &output_dir).await?,
    }
    Ok(())
}
