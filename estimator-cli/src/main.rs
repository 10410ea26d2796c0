use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use estimator_cli::app::{self, Stores};
use estimator_cli::logging;
use estimator_cli::terminal::Terminal;
use estimator_core::ProductVariant;
use estimator_core::analytics::TracingAnalytics;
use estimator_core::config::EstimatorConfig;
use estimator_core::wizard::{StepRegistry, WizardSession};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Home-services estimate request wizard.
///
/// Settings come from the environment (and a `.env` file when present);
/// the flags below override them for one run.
#[derive(Debug, Parser)]
#[command(name = "estimator", version, about)]
struct Cli {
    /// Estimator to run: `fence` or `shower`. Overrides ESTIMATOR_VARIANT.
    #[arg(long, global = true)]
    variant: Option<String>,

    /// Comma-separated step order. Overrides FORM_STEP_ORDER.
    #[arg(long, global = true)]
    step_order: Option<String>,

    /// Read settings from this file instead of `./.env`.
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Skip the secondary store's table check before inserting.
    #[arg(long, global = true)]
    no_preflight: bool,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Also append log records to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Walk through the wizard in the terminal (default).
    Run,
    /// Print the step order this configuration produces.
    Steps {
        /// Show a named preset order instead.
        #[arg(long)]
        preset: Option<String>,
    },
    /// Validate and submit answers read from a TOML file.
    Submit {
        /// Answer file; keys match the wizard's field names (e.g. `fullName`).
        #[arg(long)]
        answers: PathBuf,
    },
    /// Check that the configured stores and their table are reachable.
    Doctor,
}

// ─── configuration ───────────────────────────────────────────────────────────

/// Loads `.env` (or `--env-file`) into the process environment.
fn load_env_file(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to read env file: {}", path.display()))?;
        }
        None => {
            if let Err(e) = dotenvy::dotenv() {
                if !e.not_found() {
                    return Err(e).context("Failed to read .env");
                }
            }
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<EstimatorConfig> {
    let mut config = EstimatorConfig::from_env()?;

    if let Some(raw) = &cli.variant {
        config.variant = ProductVariant::parse(raw)
            .with_context(|| format!("--variant must be 'fence' or 'shower', got '{raw}'"))?;
    }
    if let Some(order) = &cli.step_order {
        config.step_order = Some(order.clone());
    }

    debug!(
        variant = %config.variant,
        step_order = config.step_order.as_deref().unwrap_or("default"),
        primary = config.database_url.is_some(),
        secondary = config.rest.is_some(),
        "configuration loaded"
    );
    Ok(config)
}

// ─── commands ────────────────────────────────────────────────────────────────

async fn run_wizard(
    config: &EstimatorConfig,
    preflight: bool,
) -> Result<()> {
    let stores = Stores::open(config).await?;
    let pipeline = stores.pipeline(config, preflight);
    let mut session = WizardSession::new(config, pipeline, Arc::new(TracingAnalytics));

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut terminal = Terminal::new(input, std::io::stdout());
    let summary = terminal.run(&mut session).await?;

    info!(
        submitted = summary.submitted,
        succeeded = summary.succeeded,
        "wizard closed"
    );
    Ok(())
}

fn print_steps(
    config: &EstimatorConfig,
    preset: Option<&str>,
) -> Result<()> {
    let registry = StepRegistry::new(config.variant);
    let sequence = match preset {
        Some(name) => registry.preset(name).with_context(|| {
            format!(
                "unknown preset '{name}'; available: {}",
                registry.preset_names().join(", ")
            )
        })?,
        None => registry.resolve(config.step_order.as_deref()),
    };

    println!("{} ({})", config.variant, config.variant.form_name());
    for (index, step) in sequence.as_slice().iter().enumerate() {
        println!("{:>3}. {:<18} {}", index + 1, step.as_str(), registry.title(*step));
    }

    if preset.is_none() {
        if let Some(raw) = &config.step_order {
            if let Err(e) = registry.parse_order(raw) {
                println!("\nConfigured order '{raw}' was rejected ({e}); showing the default.");
            }
        }
    }
    println!("\nPresets: {}", registry.preset_names().join(", "));
    Ok(())
}

async fn submit_answers(
    config: &EstimatorConfig,
    answers: &Path,
    preflight: bool,
) -> Result<()> {
    let record = app::load_answers(answers)?;
    let sequence = StepRegistry::new(config.variant).resolve(config.step_order.as_deref());

    let errors = app::validate_all(config.variant, &sequence, &record);
    if !errors.is_empty() {
        for (step, error) in &errors {
            eprintln!("{step}: {}: {}", error.field, error.message);
        }
        bail!("{} answer(s) failed validation", errors.len());
    }

    let stores = Stores::open(config).await?;
    let result = stores.pipeline(config, preflight).submit(&record).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        bail!("submission failed: {}", result.message);
    }
    Ok(())
}

async fn doctor(config: &EstimatorConfig) -> Result<()> {
    println!("variant     {}", config.variant);
    println!("table       {}", config.table);
    if config.auto_reset_enabled {
        println!("auto-reset  after {} ms", config.reset_timeout.as_millis());
    } else {
        println!("auto-reset  off");
    }
    println!();

    let checks = Stores::open(config).await?.check().await;
    for check in &checks {
        println!("{}", check.describe());
    }

    let failed = checks.iter().filter(|c| !c.is_healthy()).count();
    if failed > 0 {
        bail!("{failed} store(s) failed their check");
    }
    Ok(())
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    load_env_file(cli.env_file.as_deref())?;
    logging::init_logging(&cli.log_level, cli.log_file.as_deref())?;

    let config = load_config(&cli)?;
    let preflight = !cli.no_preflight;

    match &cli.command {
        None | Some(Command::Run) => run_wizard(&config, preflight).await,
        Some(Command::Steps { preset }) => print_steps(&config, preset.as_deref()),
        Some(Command::Submit { answers }) => submit_answers(&config, answers, preflight).await,
        Some(Command::Doctor) => doctor(&config).await,
    }
}
