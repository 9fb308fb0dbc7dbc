use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

use claude_stats::display::{export_json, print_json, print_summary};
use claude_stats::logging::init_logging;
use claude_stats::{collect_stats, Config};

#[derive(Parser)]
#[command(name = "cs", about = "Claude Stats: usage analytics for a Claude Code data folder")]
struct Cli {
    /// Path to the .claude folder (default: ~/.claude)
    claude_folder: Option<PathBuf>,

    /// Print the stats document as JSON
    #[arg(long)]
    json: bool,

    /// Write stats.json into this directory
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Suppress the console summary
    #[arg(long, short)]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long)]
    log_format: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<(Config, bool, bool)> {
        let mut config = Config::from_env();
        if let Some(folder) = self.claude_folder {
            config.claude_home = folder;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(dir) = self.output {
            config.output_dir = Some(dir);
        }
        config.validate()?;
        Ok((config, self.json, self.quiet))
    }
}

fn run(config: &Config, json: bool, quiet: bool) -> Result<()> {
    let stats = collect_stats(&config.claude_home)?;

    if let Some(dir) = &config.output_dir {
        let path = export_json(&stats, dir)?;
        if !quiet && !json {
            println!("Wrote {}", path.display().to_string().bold());
        }
    }

    if json {
        print_json(&stats)?;
    } else if !quiet {
        print_summary(&stats);
    }
    Ok(())
}

fn main() -> ExitCode {
    let (config, json, quiet) = match Cli::parse().into_config() {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.log_level, &config.log_format);

    match run(&config, json, quiet) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
