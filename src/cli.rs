//! Command line interface

use crate::session::{Dashboard, RenderedView};
use crate::settings::AppConfig;
use anyhow::{Context, Result};
use brent_forecast::data::DocumentSource;
use brent_forecast::models::{save_artifact, AutoArimaProvider};
use brent_forecast::{ModelProvider, SeriesLoader};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "brent_dashboard")]
#[command(about = "Brent crude (FOB) price forecasting dashboard", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Render the dashboard once
    Show {
        /// Days to forecast (defaults to the configured default)
        #[arg(long, allow_negative_numbers = true)]
        horizon: Option<i64>,

        /// Output directory for charts
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Also export the forecast table as CSV
        #[arg(long)]
        csv: bool,
    },

    /// Read horizons from stdin and re-render after each one
    Interactive {
        /// Output directory for charts
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Fit a model on the current series and save it as an artifact
    TrainArtifact {
        /// Artifact file to write
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Run a parsed command line
pub fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Show {
            horizon,
            out_dir,
            csv,
        } => {
            let dashboard = Dashboard::from_config(config)?;
            let out_dir = out_dir.unwrap_or_else(|| dashboard.config().output.dir.clone());
            let days = match horizon {
                Some(days) => days,
                None => i64::from(dashboard.default_horizon()?.days()),
            };
            let rendered = show(&dashboard, days, &out_dir, csv)?;
            print_rendered(&rendered);
        }
        Commands::Interactive { out_dir } => {
            let dashboard = Dashboard::from_config(config)?;
            let out_dir = out_dir.unwrap_or_else(|| dashboard.config().output.dir.clone());
            let stdin = io::stdin();
            interactive(&dashboard, &out_dir, stdin.lock(), io::stdout())?;
        }
        Commands::TrainArtifact { output } => {
            let loader = SeriesLoader::from_config(&config.forecast.source)?;
            train_artifact(&loader, &config, &output)?;
        }
    }
    Ok(())
}

/// Build and render the view for `days`
pub fn show<S: DocumentSource>(
    dashboard: &Dashboard<S>,
    days: i64,
    out_dir: &Path,
    csv: bool,
) -> Result<RenderedView> {
    let view = dashboard
        .view(days)
        .with_context(|| format!("cannot build the dashboard for {} days", days))?;
    let rendered = dashboard.render(&view, out_dir, csv)?;
    Ok(rendered)
}

/// One line of interactive input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Horizon(i64),
    Refresh,
    Quit,
    Unknown(String),
}

impl Input {
    pub fn parse(line: &str) -> Option<Input> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        Some(match line {
            "refresh" => Input::Refresh,
            "quit" | "exit" => Input::Quit,
            _ => match line.parse::<i64>() {
                Ok(days) => Input::Horizon(days),
                Err(_) => Input::Unknown(line.to_string()),
            },
        })
    }
}

/// Serve horizons read from `input` until it ends or `quit` is entered
///
/// Failures are reported and the loop waits for the next line.
pub fn interactive<S, R, W>(
    dashboard: &Dashboard<S>,
    out_dir: &Path,
    input: R,
    mut output: W,
) -> Result<()>
where
    S: DocumentSource,
    R: BufRead,
    W: Write,
{
    let bounds = dashboard.config().forecast.horizon;
    writeln!(
        output,
        "Enter a horizon in days ({}-{}), 'refresh' or 'quit'.",
        bounds.min, bounds.max
    )?;

    let initial = i64::from(dashboard.default_horizon()?.days());
    report(&mut output, show(dashboard, initial, out_dir, false))?;

    for line in input.lines() {
        match Input::parse(&line?) {
            None => continue,
            Some(Input::Quit) => break,
            Some(Input::Refresh) => {
                dashboard.refresh();
                writeln!(output, "Series cache cleared.")?;
            }
            Some(Input::Horizon(days)) => {
                report(&mut output, show(dashboard, days, out_dir, false))?;
            }
            Some(Input::Unknown(text)) => {
                writeln!(output, "Unrecognised input '{}'.", text)?;
            }
        }
    }
    Ok(())
}

fn report<W: Write>(output: &mut W, rendered: Result<RenderedView>) -> Result<()> {
    match rendered {
        Ok(rendered) => {
            write!(output, "{}", rendered.table)?;
            writeln!(
                output,
                "Charts: {} {}",
                rendered.history_chart.display(),
                rendered.zoom_chart.display()
            )?;
        }
        Err(err) => {
            error!("{:#}", err);
            writeln!(output, "Error: {:#}", err)?;
        }
    }
    Ok(())
}

fn print_rendered(rendered: &RenderedView) {
    print!("{}", rendered.table);
    println!("History chart: {}", rendered.history_chart.display());
    println!("Zoom chart: {}", rendered.zoom_chart.display());
    if let Some(csv) = &rendered.csv {
        println!("CSV: {}", csv.display());
    }
}

/// Fit a model on the loaded series and persist it
pub fn train_artifact<S: DocumentSource>(
    loader: &SeriesLoader<S>,
    config: &AppConfig,
    output: &Path,
) -> Result<()> {
    let series = loader.load_series().context("cannot load the series")?;
    let provider = AutoArimaProvider::from_config(&config.forecast.model);
    let model = provider.obtain_model(&series)?;
    save_artifact(&model, output)
        .with_context(|| format!("cannot write {}", output.display()))?;

    info!(path = %output.display(), model = %model.name(), "Artifact ready");
    Ok(())
}
