//! FiberPlan - optical power budget and validation for fiber diagrams

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fiberplan_engine::power::{compute_power, BudgetReport};
use fiberplan_engine::{samples, validator, EngineConfig};
use fiberplan_types::{Diagram, LossTables, SplitterLoss};

/// FiberPlan - fiber plant power budget tool
#[derive(Parser, Debug)]
#[command(name = "fiberplan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the estimated receive power and margin of every ONU
    Budget {
        /// Diagram JSON file
        diagram: PathBuf,

        /// Engine configuration JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Fiber attenuation in dB/km
        #[arg(long)]
        fiber_loss_per_km: Option<f64>,

        /// Loss per connector in dB
        #[arg(long)]
        connector_loss: Option<f64>,

        /// OLT transmit power in dBm, overriding the diagram setting
        #[arg(long, allow_hyphen_values = true)]
        tx_power: Option<f64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check every stored connection against the connection rules
    Validate {
        /// Diagram JSON file
        diagram: PathBuf,
    },

    /// List the splitter loss table
    Splitters,

    /// Write a sample diagram as JSON
    Sample {
        /// Sample name (worked, fbt, building)
        #[arg(default_value = "worked")]
        name: String,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();
}

fn load_diagram(path: &Path) -> Result<Diagram> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Diagram::from_json(&text).with_context(|| format!("{} is not a valid diagram", path.display()))
}

fn run_budget(
    path: &Path,
    config: Option<&Path>,
    fiber_loss_per_km: Option<f64>,
    connector_loss: Option<f64>,
    tx_power: Option<f64>,
    json: bool,
) -> Result<()> {
    let config = match config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let mut model = config.loss_model;
    if let Some(loss) = fiber_loss_per_km {
        model.fiber_loss_per_km = loss;
    }
    if let Some(loss) = connector_loss {
        model.connector_loss_db = loss;
    }

    let mut diagram = load_diagram(path)?;
    if let Some(tx) = tx_power {
        diagram.settings.olt_tx_power = tx;
    }

    let power = compute_power(&diagram, &LossTables::standard(), &model);
    let report = BudgetReport::build(&diagram, &power, &[]);
    log::debug!("Computed power at {} port(s) of {}", power.len(), diagram.id);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} ({} ONU(s))", diagram.name, report.onus.len());
    println!("{:<24} {:>10} {:>10} {:>9}  STATUS", "ONU", "RX dBm", "SENS dBm", "MARGIN");
    for onu in &report.onus {
        let rx = onu.rx_power.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".to_string());
        let margin = onu.margin.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<24} {:>10} {:>10.1} {:>9}  {}",
            onu.name,
            rx,
            onu.sensitivity,
            margin,
            onu.status.as_str()
        );
    }
    if !power.skipped_connections().is_empty() {
        println!(
            "Skipped {} connection(s) feeding already-reached ports",
            power.skipped_connections().len()
        );
    }
    Ok(())
}

/// Returns the number of problems found
fn run_validate(path: &Path) -> Result<usize> {
    let diagram = load_diagram(path)?;
    let issues = validator::audit(&diagram);
    let orphans = diagram.orphaned_connections();

    for issue in &issues {
        println!("{}: {}", issue.connection_id, issue.rejection);
    }
    for connection in &orphans {
        println!("{}: orphaned ({} -> {})", connection.id, connection.from, connection.to);
    }

    let problems = issues.len() + orphans.len();
    if problems == 0 {
        println!("{}: {} connection(s) OK", diagram.name, diagram.connections.len());
    }
    Ok(problems)
}

fn run_splitters() {
    let tables = LossTables::standard();
    println!("{:<8} {:<8} {:>7}  LOSS dB", "TYPE", "CATEGORY", "OUTPUTS");
    for spec in tables.iter() {
        let loss = match &spec.loss {
            SplitterLoss::Uniform(loss) => format!("{:.1}", loss),
            SplitterLoss::PerPort(losses) => losses
                .iter()
                .map(|l| format!("{:.1}", l))
                .collect::<Vec<_>>()
                .join(" / "),
        };
        println!("{:<8} {:<8} {:>7}  {}", spec.key, spec.category, spec.output_ports, loss);
    }
}

fn run_sample(name: &str, out: Option<&Path>) -> Result<()> {
    let diagram = samples::load_sample(name).with_context(|| {
        let known: Vec<_> = samples::list_samples().into_iter().map(|(n, _)| n).collect();
        format!("Unknown sample '{}', expected one of: {}", name, known.join(", "))
    })?;
    let json = diagram.to_json()?;

    match out {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Wrote sample '{}' to {}", name, path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Budget {
            diagram,
            config,
            fiber_loss_per_km,
            connector_loss,
            tx_power,
            json,
        } => run_budget(
            &diagram,
            config.as_deref(),
            fiber_loss_per_km,
            connector_loss,
            tx_power,
            json,
        )?,
        Command::Validate { diagram } => {
            if run_validate(&diagram)? > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Splitters => run_splitters(),
        Command::Sample { name, out } => run_sample(&name, out.as_deref())?,
    }

    Ok(ExitCode::SUCCESS)
}
