mod activity_log;
mod config;
mod launcher;
mod operator;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use console::style;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

use config::LauncherConfig;
use launcher::{diagnose, Diagnosis, Launcher, SystemRunner};
use operator::ConsoleOperator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Sets up the EmoVoice Python environment and starts its web interface
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Project directory containing main.py [default: config file value, else .]
    #[arg(short, long)]
    project_dir: Option<PathBuf>,

    /// Launcher config file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base Python interpreter used to create the virtual environment
    #[arg(long)]
    python: Option<String>,

    /// Do not wait for confirmation after creating .env
    #[arg(long)]
    no_pause: bool,

    /// Report what the next launch would have to do, then exit
    #[arg(long)]
    check: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Save the effective configuration to <project>/launcher.json and exit
    #[arg(long)]
    write_config: bool,

    /// Console log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Also write JSON logs to this directory (rotated daily)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { args.log_level.filter() };
    activity_log::init_logging(log_level, args.log_dir.as_deref())?;

    let config = load_config(&args)?;

    if args.print_config {
        let json = serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
        println!("{}", json);
        return Ok(ExitCode::SUCCESS);
    }

    if args.write_config {
        let path = config.project_dir.join(config::CONFIG_FILE_NAME);
        config.save(&path)?;
        println!("Wrote {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let runner = Arc::new(SystemRunner::new());

    if args.check {
        let diagnosis = diagnose(runner.as_ref(), &config).await;
        print_diagnosis(&diagnosis);
        return Ok(if diagnosis.ready() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    info!("EmoVoice launcher starting in {:?}", config.project_dir);
    let operator = Arc::new(ConsoleOperator::new(config.pause_on_seed));
    let report = Launcher::new(config, runner, operator)
        .run()
        .await
        .context("Launch failed")?;

    debug!(
        "Sandbox {:?}, dependencies {:?}, secrets {:?}, {} key(s) unset",
        report.sandbox,
        report.dependencies,
        report.secrets,
        report.key_issues.len()
    );
    let exit = report.app_exit.map(|e| e.exit_code()).unwrap_or(0);
    println!(
        "\n{} {} after {:.1}s (exit code {})",
        style("==>").cyan().bold(),
        report.state,
        report.duration_ms() as f64 / 1000.0,
        exit
    );

    let status = report.app_exit.map(|e| e.process_status()).unwrap_or(0);
    Ok(ExitCode::from(status))
}

/// Config file (if any) with command line overrides applied
fn load_config(args: &Args) -> Result<LauncherConfig> {
    let search_dir = args.project_dir.as_deref().unwrap_or(Path::new("."));
    let mut config = match LauncherConfig::locate(args.config.as_deref(), search_dir) {
        Some(path) => {
            debug!("Loading config from {:?}", path);
            LauncherConfig::load(&path)?
        }
        None => LauncherConfig::default(),
    };

    if let Some(ref project_dir) = args.project_dir {
        config.project_dir = project_dir.clone();
    }
    // Children run with the project as cwd; every derived path must not depend on ours
    config.project_dir = std::path::absolute(&config.project_dir)
        .with_context(|| format!("Failed to resolve project directory {:?}", config.project_dir))?;
    if let Some(ref python) = args.python {
        config.interpreter = Some(python.clone());
    }
    if args.no_pause {
        config.pause_on_seed = false;
    }

    Ok(config)
}

fn print_diagnosis(diagnosis: &Diagnosis) {
    println!("EmoVoice launch check:\n");

    for item in &diagnosis.items {
        let marker = if item.ok {
            style("ok").green()
        } else if item.blocking {
            style("missing").red()
        } else {
            style("absent").dim()
        };
        println!("  [{}] {:<20} {}", marker, item.name, item.detail);
    }
    for issue in &diagnosis.key_issues {
        println!("  [{}] {:<20} {}", style("unset").yellow(), issue.key, issue.problem);
    }

    let blockers = diagnosis.blockers();
    if diagnosis.ready() {
        println!("\nReady to launch.");
    } else if !blockers.is_empty() {
        let names: Vec<&str> = blockers.iter().map(|item| item.name).collect();
        println!("\nThe next launch will fail: fix {} first.", names.join(", "));
    } else {
        println!("\nThe next launch will set up what is missing.");
    }
}
