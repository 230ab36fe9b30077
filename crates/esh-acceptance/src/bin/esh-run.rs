//! Run acceptance scenarios against a shell.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use esh_acceptance::{ALL, Definitions, Runner, Scenario, StdoutReporter};
use tracing_subscriber::EnvFilter;

/// esh-run -- drive a shell through its acceptance scenarios.
#[derive(Parser, Debug)]
#[command(name = "esh-run", version, about)]
struct Cli {
    /// Definitions file (TOML) naming the shell under test
    #[arg(required_unless_present = "list")]
    definitions: Option<PathBuf>,

    /// Plugin directory passed to the shell as `-p <dir>`
    plugin_dir: Option<PathBuf>,

    /// Run only the named scenario (repeatable; default: all)
    #[arg(long = "scenario", short = 's', value_name = "NAME")]
    scenarios: Vec<String>,

    /// List the available scenarios and exit
    #[arg(long)]
    list: bool,
}

fn select(names: &[String]) -> Result<Vec<&'static Scenario>, String> {
    if names.is_empty() {
        return Ok(ALL.iter().collect());
    }
    names
        .iter()
        .map(|name| esh_acceptance::scenarios::find(name).ok_or_else(|| format!("unknown scenario `{name}`")))
        .collect()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the report
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if cli.list {
        for scenario in ALL {
            println!("{:<10} {}", scenario.name(), scenario.description());
        }
        return ExitCode::SUCCESS;
    }

    let selected = match select(&cli.scenarios) {
        Ok(selected) => selected,
        Err(message) => {
            eprintln!("esh-run: {message}");
            return ExitCode::from(2);
        }
    };

    let Some(path) = cli.definitions else {
        eprintln!("esh-run: no definitions file given");
        return ExitCode::from(2);
    };
    let mut definitions = match Definitions::load(&path) {
        Ok(definitions) => definitions,
        Err(e) => {
            eprintln!("esh-run: {e}");
            return ExitCode::from(2);
        }
    };
    if let Some(dir) = cli.plugin_dir {
        definitions.plugin_dir = dir;
    }

    let mut runner = Runner::new(definitions, StdoutReporter);
    match runner.run_all(selected).await {
        Ok(()) => ExitCode::SUCCESS,
        Err((name, e)) => {
            eprintln!("{name}: FAILED ({}): {e}", e.kind());
            ExitCode::FAILURE
        }
    }
}
