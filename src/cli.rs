use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate, generate_to};

use crate::dataset::Dataset;
use crate::export::{to_json_bytes, write_json};

pub const DEFAULT_HTML_PATH: &str = "data/output/report.html";
pub const DEFAULT_CSV_DIR: &str = "data/output/tables";
pub const DEFAULT_JSON_PATH: &str = "data/output/dashboard.json";

pub const DATA_HELP: &str = "Load the valuation dataset from a JSON file instead of the embedded one (see the dump-data subcommand for the expected shape).";
pub const SAVE_HTML_HELP: &str = "Save the HTML report to the given file (defaults to data/output/report.html when no path is provided).";
pub const SAVE_CSV_HELP: &str = "Save every table and chart series as CSV into the given directory (defaults to data/output/tables when no path is provided). Use --archive-csv to store .gz files instead.";
pub const SAVE_JSON_HELP: &str = "Save the assembled dashboard as JSON (defaults to data/output/dashboard.json when no path is provided).";
pub const ARCHIVE_CSV_HELP: &str = "Archive saved CSV outputs into .gz files.";

#[derive(Debug, Parser)]
#[command(
    name = "dcfboard",
    about = "Render a discounted-cash-flow valuation dashboard as a terminal summary, HTML report, CSV and JSON.",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    #[arg(long, value_name = "FILE", help = DATA_HELP)]
    pub data: Option<PathBuf>,
    #[arg(
        long,
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = DEFAULT_HTML_PATH,
        help = SAVE_HTML_HELP
    )]
    pub save_html: Option<PathBuf>,
    #[arg(
        long,
        value_name = "DIR",
        num_args = 0..=1,
        default_missing_value = DEFAULT_CSV_DIR,
        help = SAVE_CSV_HELP
    )]
    pub save_csv: Option<PathBuf>,
    #[arg(
        long,
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = DEFAULT_JSON_PATH,
        help = SAVE_JSON_HELP
    )]
    pub save_json: Option<PathBuf>,
    #[arg(long, help = ARCHIVE_CSV_HELP)]
    pub archive_csv: bool,
    #[arg(
        long,
        help = "Print every year of each chart series instead of the abbreviated summary."
    )]
    pub full_output: bool,
    #[arg(long, help = "Disable progress spinner output.")]
    pub no_progress: bool,
    #[arg(long, help = "Disable colored terminal output.")]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate shell completion scripts, optionally installing them for the current user.
    Completions {
        #[arg(value_enum, help = "Shell to generate completions for.")]
        shell: Shell,
        #[arg(
            long,
            value_name = "DIR",
            help = "Directory to write the completion script to."
        )]
        output_dir: Option<PathBuf>,
        #[arg(
            long,
            help = "Install the completion script into the default location for the selected shell."
        )]
        install: bool,
    },
    /// Print the embedded dataset as JSON, a starting point for --data.
    DumpData {
        #[arg(long, value_name = "FILE", help = "Write to a file instead of stdout.")]
        output: Option<PathBuf>,
    },
}

pub fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Completions {
            shell,
            output_dir,
            install,
        } => generate_completions(shell, output_dir, install),
        Commands::DumpData { output } => dump_data(output),
    }
}

fn dump_data(output: Option<PathBuf>) -> Result<()> {
    let dataset = Dataset::titan();
    match output {
        Some(path) => {
            write_json(&path, &dataset)?;
            println!("Wrote dataset to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(&to_json_bytes(&dataset)?)
                .context("failed to write dataset JSON")?;
            stdout.flush().context("failed to flush dataset JSON")?;
        }
    }
    Ok(())
}

fn generate_completions(shell: Shell, output_dir: Option<PathBuf>, install: bool) -> Result<()> {
    let mut command = Cli::command();
    let bin_name = command.get_name().to_string();

    let target_dir = match output_dir {
        Some(dir) => Some(dir),
        None if install => Some(user_completion_dir(shell)?),
        None => None,
    };

    let Some(dir) = target_dir else {
        let mut stdout = io::stdout().lock();
        generate(shell, &mut command, bin_name, &mut stdout);
        return stdout
            .flush()
            .context("failed to flush completion output");
    };

    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create completion directory {}", dir.display()))?;
    let path = generate_to(shell, &mut command, bin_name, &dir)
        .context("failed to write completion file")?;
    println!("Installed {shell:?} completions to {}", path.display());
    Ok(())
}

fn user_completion_dir(shell: Shell) -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .ok_or_else(|| anyhow!("HOME is not set; pass --output-dir instead of --install"))?;
    completion_dir_under(Path::new(&home), shell)
        .ok_or_else(|| anyhow!("{shell:?} has no per-user completion directory; pass --output-dir"))
}

fn completion_dir_under(home: &Path, shell: Shell) -> Option<PathBuf> {
    let relative = match shell {
        Shell::Bash => ".local/share/bash-completion/completions",
        Shell::Elvish => ".elvish/lib/completions",
        Shell::Fish => ".config/fish/completions",
        Shell::PowerShell => ".local/share/powershell/Scripts",
        Shell::Zsh => ".local/share/zsh/site-functions",
        _ => return None,
    };
    Some(home.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn save_flags_fall_back_to_defaults() {
        let cli = Cli::try_parse_from(["dcfboard", "--save-html", "--save-csv", "--archive-csv"])
            .unwrap();
        assert_eq!(cli.save_html, Some(PathBuf::from(DEFAULT_HTML_PATH)));
        assert_eq!(cli.save_csv, Some(PathBuf::from(DEFAULT_CSV_DIR)));
        assert!(cli.archive_csv);
        assert!(cli.save_json.is_none());
    }

    #[test]
    fn completion_dirs_live_under_home() {
        let home = Path::new("/home/analyst");
        assert_eq!(
            completion_dir_under(home, Shell::Zsh),
            Some(PathBuf::from("/home/analyst/.local/share/zsh/site-functions"))
        );
        assert_eq!(
            completion_dir_under(home, Shell::Fish),
            Some(PathBuf::from("/home/analyst/.config/fish/completions"))
        );
    }

    #[test]
    fn parses_dump_data_subcommand() {
        let cli = Cli::try_parse_from(["dcfboard", "dump-data", "--output", "x.json"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::DumpData { output: Some(_) })
        ));
    }
}
