//! DSC Engine CLI
//!
//! Command-line interface for configuring, querying and simulating the DSC
//! engine.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::{style, Term};

use dsc::cli::{OutputFormat, OutputFormatter, Script, Simulator};
use dsc::core::config::EngineConfig;
use dsc::protocol::DscEngine;
use dsc::storage::EngineSnapshot;
use dsc::utils::constants::PRECISION_DECIMALS;
use dsc::utils::math::{format_health_factor, format_units, parse_units};

/// DSC Engine CLI - Over-collateralized synthetic USD
#[derive(Parser)]
#[command(name = "dsc")]
#[command(author = "DSC Team")]
#[command(version = dsc::VERSION)]
#[command(about = "Command-line interface for the DSC engine", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the engine configuration
    #[arg(short, long, env = "DSC_CONFIG", default_value = "dsc.json")]
    config: PathBuf,

    /// Output format (text, json, json-pretty)
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default engine configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration, environment overrides applied
    Config,

    /// Compute a health factor from debt and collateral value
    Health {
        /// Outstanding debt in DSC
        #[arg(short, long)]
        debt: String,
        /// Collateral value in USD
        #[arg(short, long)]
        value: String,
    },

    /// USD value of an amount of collateral at its configured price
    UsdValue {
        /// Collateral symbol
        asset: String,
        /// Token amount
        amount: String,
    },

    /// Collateral worth a USD amount at its configured price
    TokenAmount {
        /// Collateral symbol
        asset: String,
        /// USD amount
        usd: String,
    },

    /// Collateral seized for covering debt at the configured price
    Quote {
        /// Collateral symbol
        asset: String,
        /// Debt to cover in DSC
        debt: String,
    },

    /// Replay a JSON script against an in-memory engine
    Simulate {
        /// Script to run
        script: PathBuf,
        /// Write a snapshot of the final engine state
        #[arg(short, long)]
        dump: Option<PathBuf>,
    },

    /// Summarize a saved engine snapshot
    Inspect {
        /// Snapshot file
        snapshot: PathBuf,
    },
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let term = Term::stdout();

    if let Err(e) = run_command(&cli, &term) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run_command(cli: &Cli, term: &Term) -> anyhow::Result<()> {
    let output = formatter(cli);
    match &cli.command {
        Commands::Init { force } => cmd_init(cli, *force, term),
        Commands::Config => {
            let config = load_config(&cli.config)?;
            term.write_line(&output.json(&config)?)?;
            Ok(())
        }
        Commands::Health { debt, value } => cmd_health(debt, value, &output, term),
        Commands::UsdValue { asset, amount } => {
            let simulator = Simulator::new(load_config(&cli.config)?)?;
            let asset = simulator.asset(asset)?;
            let value = simulator
                .engine()
                .usd_value(&asset, parse_units(amount, PRECISION_DECIMALS)?)?;
            print_pairs(
                &output,
                term,
                &[("usd_value", format_units(value, PRECISION_DECIMALS))],
            )
        }
        Commands::TokenAmount { asset, usd } => {
            let simulator = Simulator::new(load_config(&cli.config)?)?;
            let asset = simulator.asset(asset)?;
            let amount = simulator
                .engine()
                .token_amount_from_usd(&asset, parse_units(usd, PRECISION_DECIMALS)?)?;
            print_pairs(
                &output,
                term,
                &[("token_amount", format_units(amount, PRECISION_DECIMALS))],
            )
        }
        Commands::Quote { asset, debt } => {
            let simulator = Simulator::new(load_config(&cli.config)?)?;
            let asset = simulator.asset(asset)?;
            let quote = simulator
                .engine()
                .liquidation_quote(&asset, parse_units(debt, PRECISION_DECIMALS)?)?;
            print_pairs(
                &output,
                term,
                &[
                    ("debt_to_cover", format_units(quote.debt_to_cover, PRECISION_DECIMALS)),
                    ("token_amount", format_units(quote.token_amount, PRECISION_DECIMALS)),
                    ("bonus", format_units(quote.bonus, PRECISION_DECIMALS)),
                    ("total_seized", format_units(quote.total_seized, PRECISION_DECIMALS)),
                ],
            )
        }
        Commands::Simulate { script, dump } => {
            cmd_simulate(cli, script, dump.as_deref(), &output, term)
        }
        Commands::Inspect { snapshot } => cmd_inspect(snapshot, &output, term),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND HANDLERS
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_init(cli: &Cli, force: bool, term: &Term) -> anyhow::Result<()> {
    term.write_line(&format!(
        "{} Initializing DSC engine configuration...",
        style("→").cyan()
    ))?;

    if cli.config.exists() && !force {
        anyhow::bail!(
            "Configuration already exists: {}. Use --force to overwrite.",
            cli.config.display()
        );
    }

    let config = EngineConfig::default();
    config.save(&cli.config)?;

    term.write_line(&format!(
        "{} Configuration created at: {}",
        style("✓").green(),
        cli.config.display()
    ))?;
    term.write_line(&format!(
        "{} Engine address: {}",
        style("✓").green(),
        style(config.engine).yellow()
    ))?;
    for collateral in &config.collateral {
        term.write_line(&format!(
            "  {} {} (feed {})",
            style("•").dim(),
            collateral.symbol,
            collateral.price_feed
        ))?;
    }
    Ok(())
}

fn cmd_health(
    debt: &str,
    value: &str,
    output: &OutputFormatter,
    term: &Term,
) -> anyhow::Result<()> {
    let debt = parse_units(debt, PRECISION_DECIMALS)?;
    let value = parse_units(value, PRECISION_DECIMALS)?;
    let health_factor = DscEngine::calculate_health_factor(debt, value);
    print_pairs(
        output,
        term,
        &[("health_factor", format_health_factor(health_factor))],
    )
}

fn cmd_simulate(
    cli: &Cli,
    script: &Path,
    dump: Option<&Path>,
    output: &OutputFormatter,
    term: &Term,
) -> anyhow::Result<()> {
    let script = Script::load(script)?;
    let mut simulator = Simulator::new(load_config(&cli.config)?)?;
    let report = simulator.run(&script)?;
    term.write_line(&output.report(&report)?)?;

    if let Some(path) = dump {
        let snapshot = simulator.engine().snapshot()?;
        snapshot.save(path)?;
        if !output.is_json() {
            term.write_line(&format!(
                "{} Snapshot written to {} (state {})",
                style("✓").green(),
                path.display(),
                hex::encode(&snapshot.state_hash()[..8])
            ))?;
        }
    }
    Ok(())
}

fn cmd_inspect(path: &Path, output: &OutputFormatter, term: &Term) -> anyhow::Result<()> {
    let snapshot = EngineSnapshot::load(path)?;
    snapshot.verify_invariants()?;

    let accounts = &snapshot.state.accounts;
    let custody: Vec<(String, String)> = snapshot
        .assets
        .iter()
        .map(|asset| {
            (
                format!("custody {}", asset.address().short()),
                format_units(accounts.total_collateral(asset), PRECISION_DECIMALS),
            )
        })
        .collect();

    let mut pairs = vec![
        ("version", snapshot.version.to_string()),
        ("taken_at", taken_at(snapshot.taken_at)),
        ("engine", snapshot.engine.to_hex()),
        ("synthetic_asset", snapshot.synthetic_asset.to_hex()),
        ("accounts", accounts.len().to_string()),
        ("events", snapshot.state.events.len().to_string()),
        (
            "total_debt",
            format_units(accounts.total_debt(), PRECISION_DECIMALS),
        ),
        ("state_hash", hex::encode(snapshot.state_hash())),
    ];
    pairs.extend(custody.iter().map(|(k, v)| (k.as_str(), v.clone())));

    print_pairs(output, term, &pairs)
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

fn formatter(cli: &Cli) -> OutputFormatter {
    let formatter = OutputFormatter::new(cli.format);
    if cli.no_color {
        formatter.without_color()
    } else {
        formatter
    }
}

fn load_config(path: &Path) -> anyhow::Result<EngineConfig> {
    let config = if path.exists() {
        EngineConfig::load(path)?
    } else {
        tracing::debug!(path = %path.display(), "no configuration file, using defaults");
        EngineConfig::default()
    };
    Ok(config.with_env()?)
}

fn print_pairs(output: &OutputFormatter, term: &Term, pairs: &[(&str, String)]) -> anyhow::Result<()> {
    term.write_line(&output.key_values(pairs)?)?;
    Ok(())
}

fn taken_at(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| timestamp.to_string())
}
