use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use dcfboard::cli::{self, Cli};
use dcfboard::export::{CsvSurface, JsonSurface};
use dcfboard::progress::{ProgressState, Stage, run_with_spinner};
use dcfboard::report::HtmlSurface;
use dcfboard::summary::{SummaryPaths, TerminalSurface};
use dcfboard::{Dataset, Surface, assemble};
use std::io;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let mut cli = Cli::parse();
    colored::control::set_override(!cli.no_color);

    if let Some(command) = cli.command.take() {
        cli::handle_command(command)?;
        return Ok(());
    }

    let Cli {
        data,
        save_html,
        save_csv,
        save_json,
        archive_csv,
        full_output,
        no_progress,
        no_color,
        ..
    } = cli;

    let run_started_at = Local::now();
    let dataset = load_dataset(data.as_deref())?;

    let progress = ProgressState::new(!no_progress, !no_color);
    let dashboard = run_with_spinner(&progress, Stage::Assemble, &dataset.company.name, || {
        assemble(&dataset)
    })?;

    run_with_spinner(&progress, Stage::Render, "outputs", || -> Result<()> {
        if let Some(path) = save_html.as_deref() {
            HtmlSurface::new(path, run_started_at).render(&dashboard)?;
        }
        if let Some(dir) = save_csv.as_deref() {
            let mut surface = CsvSurface::new(dir, archive_csv);
            surface.render(&dashboard)?;
            info!(files = surface.written().len(), "saved CSV exports");
        }
        if let Some(path) = save_json.as_deref() {
            JsonSurface::new(path).render(&dashboard)?;
        }
        Ok(())
    })?;
    progress.clear();

    let stdout = io::stdout().lock();
    TerminalSurface::new(
        stdout,
        run_started_at,
        full_output,
        SummaryPaths {
            html: save_html.as_deref(),
            csv: save_csv.as_deref(),
            json: save_json.as_deref(),
        },
    )
    .render(&dashboard)
}

fn load_dataset(path: Option<&Path>) -> Result<Dataset> {
    let Some(path) = path else {
        info!("using embedded dataset");
        return Ok(Dataset::titan());
    };
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let dataset = Dataset::from_json(&bytes)
        .with_context(|| format!("failed to load dataset from {}", path.display()))?;
    info!(path = %path.display(), company = %dataset.company.name, "loaded dataset");
    Ok(dataset)
}
