//! formulactl - command-line client for formulad

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use formula_shared::{FormulaRequest, PatternTable, DEFAULT_DAEMON_URL, VERSION};
use formulactl::display;
use formulactl::FormuladClient;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "formulactl")]
#[command(about = "Turn plain-language descriptions into spreadsheet formulas", long_about = None)]
#[command(version = VERSION)]
struct Cli {
    /// Daemon base URL
    #[arg(long, global = true, env = "FORMULAD_URL", default_value = DEFAULT_DAEMON_URL)]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the daemon for a formula
    Generate {
        /// What the formula should compute
        description: String,

        /// Target range, e.g. A2:A10
        #[arg(long)]
        range: String,

        /// Sample values from the range, comma separated
        #[arg(long, value_delimiter = ',')]
        sample: Vec<f64>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Show daemon health
    Health {
        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Resolve a description with the built-in patterns only, no daemon
    Offline {
        description: String,

        #[arg(long)]
        range: String,
    },

    /// Check a formula against the safety rules
    Validate { formula: String },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            description,
            range,
            sample,
            json,
        } => {
            let client = FormuladClient::new(&cli.url)?;
            let mut request = FormulaRequest::new(range, description);
            if !sample.is_empty() {
                request = request.with_sample_data(sample);
            }

            let spinner = (!json && std::io::stdout().is_terminal()).then(thinking_spinner);
            let response = client.generate(&request).await;
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            let response = response?;

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                display::print_formula(
                    &response.formula,
                    response.source,
                    response.error_message.as_deref(),
                );
            }
        }

        Commands::Health { json } => {
            let health = FormuladClient::new(&cli.url)?.health().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&health)?);
            } else {
                display::print_health(&health);
            }
        }

        Commands::Offline { description, range } => {
            let table = PatternTable::builtin().context("Invalid built-in pattern table")?;
            println!("{}", table.resolve(&description, &range));
        }

        Commands::Validate { formula } => {
            let result = formula_shared::check(&formula);
            display::print_validation(&formula, &result);
            if result.is_err() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template("{spinner:.magenta} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.set_message("generating formula...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
